//! # Planar geometry
//!
//! Poses on the field plane. The field (FD) frame has X along the field and Y to the left, all
//! angles are CCW positive about Z+. A [`Pose2d`] gives the position and heading of one frame
//! in another, so composing poses moves between frames:
//!
//! - `a + b` is `b` (expressed in `a`'s frame) moved out into the frame `a` is expressed in.
//! - `a.in_frame_of_reference_of(&b)` is `a` re-expressed in `b`'s frame.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::ops::Add;

use nalgebra::{Rotation2, Vector2};
use serde::{Deserialize, Serialize};
use util::maths::wrap_pi;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Position and heading of a frame in a parent frame.
#[derive(Debug, Copy, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose2d {
    /// Position in the parent frame
    ///
    /// Units: meters
    pub position_m: Vector2<f64>,

    /// Heading (angle to the parent +X axis), kept in (-pi, pi]
    ///
    /// Units: radians
    pub heading_rad: f64,
}

/// A pose as written in parameter files, with the heading in degrees.
#[derive(Debug, Copy, Clone, Default, Deserialize)]
pub struct PoseParam {
    pub x_m: f64,
    pub y_m: f64,
    #[serde(default)]
    pub heading_deg: f64,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Pose2d {
    /// Create a new pose, wrapping the heading.
    pub fn new(x_m: f64, y_m: f64, heading_rad: f64) -> Self {
        Self::from_position(Vector2::new(x_m, y_m), heading_rad)
    }

    /// Create a new pose from a position vector, wrapping the heading.
    pub fn from_position(position_m: Vector2<f64>, heading_rad: f64) -> Self {
        Self {
            position_m,
            heading_rad: wrap_pi(heading_rad),
        }
    }

    /// The rotation from this frame into the parent frame.
    pub fn rotation(&self) -> Rotation2<f64> {
        Rotation2::new(self.heading_rad)
    }

    /// Unit vector pointing along this pose's heading, in the parent frame.
    pub fn forward(&self) -> Vector2<f64> {
        Vector2::new(self.heading_rad.cos(), self.heading_rad.sin())
    }

    /// Apply `other`, which is expressed in this pose's frame, returning it in the parent frame.
    pub fn transform_by(&self, other: &Pose2d) -> Pose2d {
        Pose2d::from_position(
            self.position_m + self.rotation() * other.position_m,
            self.heading_rad + other.heading_rad,
        )
    }

    /// The pose of the parent frame expressed in this pose's frame.
    pub fn inverse(&self) -> Pose2d {
        let inv_rot = self.rotation().inverse();
        Pose2d::from_position(inv_rot * -self.position_m, -self.heading_rad)
    }

    /// Express this pose relative to `frame`, where both are in the same parent frame.
    pub fn in_frame_of_reference_of(&self, frame: &Pose2d) -> Pose2d {
        frame.inverse().transform_by(self)
    }

    /// Euclidean distance between the positions of two poses.
    pub fn distance_to(&self, other: &Pose2d) -> f64 {
        (self.position_m - other.position_m).norm()
    }
}

impl Add for Pose2d {
    type Output = Pose2d;

    fn add(self, rhs: Pose2d) -> Pose2d {
        self.transform_by(&rhs)
    }
}

impl From<PoseParam> for Pose2d {
    fn from(p: PoseParam) -> Self {
        Pose2d::new(p.x_m, p.y_m, p.heading_deg.to_radians())
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Build a translation from polar coordinates.
pub fn polar(distance_m: f64, angle_rad: f64) -> Vector2<f64> {
    Vector2::new(distance_m * angle_rad.cos(), distance_m * angle_rad.sin())
}

/// The bearing of a vector, the angle from +X, in (-pi, pi].
pub fn bearing(v: &Vector2<f64>) -> f64 {
    v[1].atan2(v[0])
}

#[cfg(test)]
mod test {
    use super::*;
    use std::f64::consts::{FRAC_PI_2, PI};

    fn assert_pose_eq(a: &Pose2d, b: &Pose2d) {
        assert!(
            (a.position_m - b.position_m).norm() < 1e-9
                && util::maths::ang_dist(a.heading_rad, b.heading_rad).abs() < 1e-9,
            "{:?} != {:?}", a, b
        );
    }

    #[test]
    fn test_transform_by() {
        let robot = Pose2d::new(1.0, 2.0, FRAC_PI_2);
        let cam = Pose2d::new(0.5, 0.0, 0.0);

        // Half a meter forward of a robot facing +Y
        assert_pose_eq(&(robot + cam), &Pose2d::new(1.0, 2.5, FRAC_PI_2));
    }

    #[test]
    fn test_associative() {
        let a = Pose2d::new(1.0, -2.0, 0.3);
        let b = Pose2d::new(-0.4, 0.7, 2.9);
        let c = Pose2d::new(3.0, 1.0, -1.2);

        assert_pose_eq(&((a + b) + c), &(a + (b + c)));
    }

    #[test]
    fn test_in_frame_of_reference_of() {
        let robot = Pose2d::new(2.0, 1.0, PI);
        let target = Pose2d::new(0.0, 1.0, 0.0);

        // Target is 2 m dead ahead of the robot, facing back at it
        let rel = target.in_frame_of_reference_of(&robot);
        assert_pose_eq(&rel, &Pose2d::new(2.0, 0.0, PI));

        // Going back out again recovers the field pose
        assert_pose_eq(&(robot + rel), &target);
        assert_pose_eq(&(robot + robot.inverse()), &Pose2d::default());
    }

    #[test]
    fn test_heading_wrapped() {
        let p = Pose2d::new(0.0, 0.0, 3.0 * PI);
        assert!((p.heading_rad - PI).abs() < 1e-9);

        let q = Pose2d::new(0.0, 0.0, 0.75 * PI) + Pose2d::new(0.0, 0.0, 0.5 * PI);
        assert!((q.heading_rad + 0.75 * PI).abs() < 1e-9);
    }

    #[test]
    fn test_polar_bearing() {
        let v = polar(2.0, (30f64).to_radians());
        assert!((v.norm() - 2.0).abs() < 1e-12);
        assert!((bearing(&v) - (30f64).to_radians()).abs() < 1e-12);
    }
}
