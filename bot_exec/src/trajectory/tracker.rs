//! # Trajectory trackers
//!
//! A tracker owns the trajectory currently being followed and, given the robot's pose each cycle,
//! produces the nominal drive output for that cycle.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::eqpt::drive::DriveOutput;
use log::debug;

use super::{TimedState, Trajectory};
use crate::geom::Pose2d;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Slack allowed when comparing the tracker clock to the trajectory duration.
const END_TIME_TOLERANCE_S: f64 = 1e-9;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// Black-box trajectory follower.
pub trait TrajectoryTracker {
    /// Load a new trajectory and restart tracking from its beginning.
    fn reset(&mut self, trajectory: Trajectory);

    /// Produce the nominal output for the current cycle.
    fn next_state(&mut self, current_pose: &Pose2d) -> DriveOutput;

    /// True once the end of the trajectory has been reached.
    fn is_finished(&self) -> bool;

    /// The point on the trajectory the tracker is currently following.
    fn reference_point(&self) -> Option<TimedState>;
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Open loop tracker replaying the trajectory's own velocities.
///
/// Time advances by one fixed cycle period on every call to `next_state`, the current pose is
/// ignored.
#[derive(Debug, Clone)]
pub struct FeedforwardTracker {
    cycle_period_s: f64,

    trajectory: Option<Trajectory>,

    /// Number of samples issued since the last reset
    num_cycles: u64,

    reference: Option<TimedState>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl FeedforwardTracker {
    pub fn new(cycle_period_s: f64) -> Self {
        Self {
            cycle_period_s,
            trajectory: None,
            num_cycles: 0,
            reference: None,
        }
    }

    /// Time into the trajectory of the next sample.
    ///
    /// Computed from the cycle count rather than accumulated, so it lands exactly on state times
    /// sampled at the same period.
    fn time_s(&self) -> f64 {
        self.num_cycles as f64 * self.cycle_period_s
    }
}

impl TrajectoryTracker for FeedforwardTracker {
    fn reset(&mut self, trajectory: Trajectory) {
        debug!(
            "FeedforwardTracker reset with {} states over {:.2} s",
            trajectory.states().len(),
            trajectory.duration_s()
        );
        self.trajectory = Some(trajectory);
        self.num_cycles = 0;
        self.reference = None;
    }

    fn next_state(&mut self, _current_pose: &Pose2d) -> DriveOutput {
        let traj = match self.trajectory {
            Some(ref t) => t,
            None => return DriveOutput::default(),
        };

        let state = traj.sample(self.time_s());
        self.reference = Some(state);
        self.num_cycles += 1;

        DriveOutput {
            linear_velocity_ms: state.velocity_ms,
            linear_accel_mss: state.accel_mss,
            angular_velocity_rads: state.velocity_ms * state.curvature_m,
            angular_accel_radss: state.accel_mss * state.curvature_m,
        }
    }

    fn is_finished(&self) -> bool {
        match self.trajectory {
            Some(ref t) => self.time_s() > t.duration_s() + END_TIME_TOLERANCE_S,
            None => true,
        }
    }

    fn reference_point(&self) -> Option<TimedState> {
        self.reference
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use nalgebra::Vector2;

    #[test]
    fn test_feedforward_tracker() {
        let mut tracker = FeedforwardTracker::new(0.1);
        assert!(tracker.is_finished());
        assert!(tracker.reference_point().is_none());

        let traj = Trajectory::from_waypoints(
            &[Vector2::new(0.0, 0.0), Vector2::new(0.5, 0.0)],
            1.0,
            0.1,
            false,
        ).unwrap();
        tracker.reset(traj);
        assert!(!tracker.is_finished());

        let mut cycles = 0;
        while !tracker.is_finished() {
            let out = tracker.next_state(&Pose2d::default());
            assert!(out.linear_velocity_ms >= 0.0);
            assert_eq!(out.angular_velocity_rads, 0.0);
            cycles += 1;
            assert!(cycles < 100);
        }

        // 0.5 s of trajectory at 0.1 s per cycle, including the final stationary state
        assert_eq!(cycles, 6);
        let reference = tracker.reference_point().unwrap();
        assert_eq!(reference.velocity_ms, 0.0);
        assert!((reference.pose.position_m[0] - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_final_state_issued_at_control_period() {
        let traj = Trajectory::from_waypoints(
            &[Vector2::new(0.0, 0.0), Vector2::new(1.0, 0.0), Vector2::new(2.0, 0.0)],
            1.0,
            0.02,
            false,
        ).unwrap();
        let last = *traj.last_state();
        let num_states = traj.states().len();

        let mut tracker = FeedforwardTracker::new(0.02);
        tracker.reset(traj);

        let mut cycles = 0;
        while !tracker.is_finished() {
            tracker.next_state(&Pose2d::default());
            cycles += 1;
            assert!(cycles < 1000);
        }

        // One sample per state, ending on the stationary end state
        assert_eq!(cycles, num_states);
        assert_eq!(tracker.reference_point(), Some(last));

        // Resetting restarts the clock
        tracker.reset(Trajectory::new(vec![last], false).unwrap());
        assert!(!tracker.is_finished());
        tracker.next_state(&Pose2d::default());
        assert!(tracker.is_finished());
    }
}
