//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::{Float, FloatConst};

/// Linearly interpolate between `a` and `b`, where `frac` is 0 at `a` and 1 at `b`.
pub fn lerp<T>(a: T, b: T, frac: T) -> T
where
    T: Float
{
    a + (b - a) * frac
}

/// Apply a deadband to a value.
///
/// Any value whose magnitude is strictly below `threshold` is mapped to exactly zero, anything
/// else passes through unscaled.
pub fn deadband<T>(value: T, threshold: T) -> T
where
    T: Float
{
    if value.abs() < threshold {
        T::zero()
    }
    else {
        value
    }
}

/// Wrap an angle into the range (-pi, pi].
pub fn wrap_pi<T>(angle: T) -> T
where
    T: Float + FloatConst
{
    let tau = T::TAU();
    let wrapped = rem_euclid(angle + T::PI(), tau) - T::PI();

    // rem_euclid maps pi onto -pi, keep pi on the positive side of the range
    if wrapped <= -T::PI() {
        wrapped + tau
    }
    else {
        wrapped
    }
}

/// Get the signed shortest angular distance from `a` to `b`, in the range (-pi, pi].
pub fn ang_dist<T>(a: T, b: T) -> T
where
    T: Float + FloatConst
{
    wrap_pi(b - a)
}

/// Compute the circular mean of a set of angles.
///
/// Returns `None` if there are no angles, or if the mean is undefined (the unit vectors sum to
/// zero).
pub fn circular_mean<T, I>(angles: I) -> Option<T>
where
    T: Float,
    I: IntoIterator<Item = T>
{
    let (sin_sum, cos_sum) = angles
        .into_iter()
        .fold((T::zero(), T::zero()), |(s, c), a| (s + a.sin(), c + a.cos()));

    if sin_sum == T::zero() && cos_sum == T::zero() {
        None
    }
    else {
        Some(sin_sum.atan2(cos_sum))
    }
}

/// Calculates the least nonnegative remainder of `lhs (mod rhs)`.
///
/// This function is taken from the std library as num is missing it.
pub fn rem_euclid<T>(lhs: T, rhs: T) -> T
where
    T: Float
{
    let r = lhs % rhs;
    if r < T::zero() { r + rhs.abs() } else { r }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_wrap_pi() {
        assert_eq!(wrap_pi(0f64), 0f64);
        assert_eq!(wrap_pi(PI), PI);
        assert_eq!(wrap_pi(-PI), PI);
        assert!((wrap_pi(3.0 * PI / 2.0) + PI / 2.0).abs() < 1e-12);
        assert!((wrap_pi(-3.0 * PI / 2.0) - PI / 2.0).abs() < 1e-12);
        assert!((wrap_pi(4.0 * PI + 0.1) - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_ang_dist() {
        assert!((ang_dist(0.1f64, -0.1) + 0.2).abs() < 1e-12);
        assert!((ang_dist(PI - 0.1, -PI + 0.1) - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_deadband() {
        assert_eq!(deadband(0.049f64, 0.05), 0.0);
        assert_eq!(deadband(-0.049f64, 0.05), 0.0);
        assert_eq!(deadband(0.05f64, 0.05), 0.05);
        assert_eq!(deadband(-0.05f64, 0.05), -0.05);
        assert_eq!(deadband(0.8f64, 0.05), 0.8);
    }

    #[test]
    fn test_circular_mean() {
        let m = circular_mean(vec![PI - 0.1, -PI + 0.1]).unwrap();
        assert!((m.abs() - PI).abs() < 1e-9);

        assert!(circular_mean(Vec::<f64>::new()).is_none());
        assert!((circular_mean(vec![0.2f64, 0.4]).unwrap() - 0.3).abs() < 1e-12);
    }

    #[test]
    fn test_lerp() {
        assert_eq!(lerp(1f64, 3f64, 0.5), 2f64);
    }
}
