//! # Localisation module
//!
//! This module provides the robot's pose history, allowing vision samples captured in the past to
//! be registered against the pose the robot had when the frame was taken.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::collections::VecDeque;

use log::warn;
use util::maths::{ang_dist, lerp};

use crate::geom::Pose2d;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A source of past robot poses.
pub trait PoseLookup {
    /// The field pose of the robot at time `time_s`, or `None` if nothing is known.
    fn pose_at(&self, time_s: f64) -> Option<Pose2d>;
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A bounded, time ordered buffer of robot poses.
#[derive(Debug, Clone)]
pub struct PoseHistory {
    /// Maximum age of a pose relative to the newest one before it is discarded
    max_age_s: f64,

    entries: VecDeque<(f64, Pose2d)>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PoseHistory {
    pub fn new(max_age_s: f64) -> Self {
        Self {
            max_age_s,
            entries: VecDeque::new(),
        }
    }

    /// Record the pose at the given time.
    ///
    /// Times must be strictly increasing, out of order poses are discarded.
    pub fn push(&mut self, time_s: f64, pose: Pose2d) {
        if let Some((last_s, _)) = self.entries.back() {
            if time_s <= *last_s {
                warn!(
                    "Discarding out of order pose at {:.3} s (latest is {:.3} s)",
                    time_s, last_s
                );
                return;
            }
        }

        self.entries.push_back((time_s, pose));

        while let Some((t, _)) = self.entries.front() {
            if time_s - t > self.max_age_s {
                self.entries.pop_front();
            }
            else {
                break;
            }
        }
    }

    /// The most recent pose.
    pub fn latest(&self) -> Option<Pose2d> {
        self.entries.back().map(|(_, p)| *p)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl PoseLookup for PoseHistory {
    /// Interpolate the pose at `time_s`. Times outside the buffer are clamped to its ends.
    fn pose_at(&self, time_s: f64) -> Option<Pose2d> {
        let (first_s, first) = *self.entries.front()?;
        let (last_s, last) = *self.entries.back()?;

        if time_s <= first_s {
            return Some(first);
        }
        if time_s >= last_s {
            return Some(last);
        }

        // Index of the first entry after time_s, guaranteed to be in 1..len by the checks above
        let idx = self.entries.partition_point(|(t, _)| *t <= time_s);
        let (t0, p0) = self.entries[idx - 1];
        let (t1, p1) = self.entries[idx];

        let frac = (time_s - t0) / (t1 - t0);

        Some(Pose2d::from_position(
            p0.position_m.lerp(&p1.position_m, frac),
            lerp(0.0, ang_dist(p0.heading_rad, p1.heading_rad), frac) + p0.heading_rad,
        ))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_interpolation() {
        let mut hist = PoseHistory::new(10.0);
        assert!(hist.is_empty());
        assert!(hist.pose_at(0.0).is_none());

        hist.push(1.0, Pose2d::new(0.0, 0.0, PI - 0.1));
        hist.push(2.0, Pose2d::new(2.0, 4.0, -PI + 0.1));

        let mid = hist.pose_at(1.5).unwrap();
        assert!((mid.position_m[0] - 1.0).abs() < 1e-12);
        assert!((mid.position_m[1] - 2.0).abs() < 1e-12);

        // Heading interpolates the short way round, through pi
        assert!((mid.heading_rad.abs() - PI).abs() < 1e-9);

        // Clamped at the ends
        assert_eq!(hist.pose_at(0.0).unwrap(), Pose2d::new(0.0, 0.0, PI - 0.1));
        assert_eq!(hist.pose_at(5.0), hist.latest());
    }

    #[test]
    fn test_ageing_and_ordering() {
        let mut hist = PoseHistory::new(1.0);

        for i in 0..30 {
            hist.push(i as f64 * 0.1, Pose2d::new(i as f64, 0.0, 0.0));
        }
        // Out of order push is ignored
        hist.push(0.5, Pose2d::default());

        assert_eq!(hist.latest().unwrap().position_m[0], 29.0);
        assert!(hist.len() <= 11);
        assert!(hist.pose_at(0.0).unwrap().position_m[0] >= 19.0);
    }
}
