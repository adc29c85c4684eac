//! # Trajectory module
//!
//! A trajectory is a precomputed, time-indexed sequence of states the robot should pass through.
//! Trajectories are immutable once built, and are consumed by a [`TrajectoryTracker`] which turns
//! the current pose into the next velocity demand.
//!
//! Generating smooth trajectories is not the job of this crate. [`Trajectory::from_waypoints`]
//! only builds a constant speed polyline, which is enough to drive the simulator and the tests.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod tracker;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::{convert::TryFrom, path::Path};

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};
use util::maths::{ang_dist, lerp};

use crate::geom::{bearing, Pose2d};
pub use tracker::*;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A single sample of a trajectory.
#[derive(Debug, Copy, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TimedState {
    /// Time since the start of the trajectory
    ///
    /// Units: seconds
    pub t_s: f64,

    /// Pose of the robot in the field frame
    pub pose: Pose2d,

    /// Path curvature, positive turning left (CCW)
    ///
    /// Units: 1/meters
    pub curvature_m: f64,

    /// Signed velocity along the robot's X axis, negative when reversing
    ///
    /// Units: meters/second
    pub velocity_ms: f64,

    /// Units: meters/second^2
    pub accel_mss: f64,
}

/// An immutable, time-indexed trajectory.
///
/// Deserialisation goes through [`Trajectory::new`], so a deserialised trajectory is always valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TrajectoryFile")]
pub struct Trajectory {
    states: Vec<TimedState>,

    /// True if the robot drives this trajectory backwards
    reversed: bool,
}

/// Unvalidated trajectory as stored on disk.
#[derive(Deserialize)]
struct TrajectoryFile {
    states: Vec<TimedState>,

    #[serde(default)]
    reversed: bool,
}

/// A provider of a trajectory, invoked once when the consuming command initialises.
pub type TrajectorySource = Box<dyn Fn() -> Trajectory>;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum TrajectoryError {
    #[error("Attempted to create a trajectory with no states")]
    Empty,

    #[error("Trajectory state times must be strictly increasing (state {0})")]
    NonMonotonicTime(usize),

    #[error("At least two waypoints are required, found {0}")]
    TooFewWaypoints(usize),

    #[error("Speed and time step must be positive")]
    InvalidProfile,

    #[error("Could not read the trajectory file: {0}")]
    FileError(std::io::Error),

    #[error("Could not parse the trajectory file: {0}")]
    ParseError(serde_json::Error),

    #[error("Could not serialise the trajectory: {0}")]
    SerialiseError(serde_json::Error),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl TryFrom<TrajectoryFile> for Trajectory {
    type Error = TrajectoryError;

    fn try_from(file: TrajectoryFile) -> Result<Self, Self::Error> {
        Self::new(file.states, file.reversed)
    }
}

impl Trajectory {
    /// Create a trajectory from a sequence of states.
    pub fn new(states: Vec<TimedState>, reversed: bool) -> Result<Self, TrajectoryError> {
        let traj = Self { states, reversed };
        traj.validate()?;
        Ok(traj)
    }

    /// Build a constant speed trajectory through the given waypoints.
    ///
    /// States are spaced `dt_s` apart. Heading follows the direction of travel (rotated by pi
    /// when `reversed`) and the curvature of each state spreads the turn to the next one over
    /// one time step. The final state is stationary.
    pub fn from_waypoints(
        waypoints_m: &[Vector2<f64>],
        speed_ms: f64,
        dt_s: f64,
        reversed: bool,
    ) -> Result<Self, TrajectoryError> {
        if waypoints_m.len() < 2 {
            return Err(TrajectoryError::TooFewWaypoints(waypoints_m.len()));
        }
        if speed_ms <= 0.0 || dt_s <= 0.0 {
            return Err(TrajectoryError::InvalidProfile);
        }

        let step_m = speed_ms * dt_s;
        let heading_offset = if reversed { std::f64::consts::PI } else { 0.0 };
        let velocity_ms = if reversed { -speed_ms } else { speed_ms };

        // Sample positions and headings along the polyline
        let mut samples: Vec<(Vector2<f64>, f64)> = Vec::new();
        for seg in waypoints_m.windows(2) {
            let diff = seg[1] - seg[0];
            let length_m = diff.norm();
            if length_m == 0.0 {
                continue;
            }
            let heading = bearing(&diff) + heading_offset;

            let num_steps = (length_m / step_m).ceil() as usize;
            for i in 0..num_steps {
                let frac = (i as f64 * step_m) / length_m;
                samples.push((seg[0] + diff * frac, heading));
            }
        }

        // Close with the final waypoint, keeping the last heading
        let last_heading = samples
            .last()
            .map(|(_, h)| *h)
            .ok_or(TrajectoryError::TooFewWaypoints(1))?;
        samples.push((waypoints_m[waypoints_m.len() - 1], last_heading));

        let num_samples = samples.len();
        let states = samples
            .iter()
            .enumerate()
            .map(|(i, (pos, heading))| {
                let is_last = i + 1 == num_samples;
                let curvature_m = if is_last {
                    0.0
                }
                else {
                    ang_dist(*heading, samples[i + 1].1) / (velocity_ms * dt_s)
                };

                TimedState {
                    t_s: i as f64 * dt_s,
                    pose: Pose2d::from_position(*pos, *heading),
                    curvature_m,
                    velocity_ms: if is_last { 0.0 } else { velocity_ms },
                    accel_mss: 0.0,
                }
            })
            .collect();

        Self::new(states, reversed)
    }

    /// Load a trajectory from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, TrajectoryError> {
        let s = std::fs::read_to_string(path).map_err(TrajectoryError::FileError)?;
        serde_json::from_str(&s).map_err(TrajectoryError::ParseError)
    }

    /// Save the trajectory to a JSON file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), TrajectoryError> {
        let s = serde_json::to_string_pretty(self).map_err(TrajectoryError::SerialiseError)?;
        std::fs::write(path, s).map_err(TrajectoryError::FileError)
    }

    pub fn reversed(&self) -> bool {
        self.reversed
    }

    pub fn states(&self) -> &[TimedState] {
        &self.states
    }

    pub fn first_state(&self) -> &TimedState {
        &self.states[0]
    }

    pub fn last_state(&self) -> &TimedState {
        &self.states[self.states.len() - 1]
    }

    /// Total duration of the trajectory.
    pub fn duration_s(&self) -> f64 {
        self.last_state().t_s - self.first_state().t_s
    }

    /// Sample the trajectory at `t_s` seconds from its start, interpolating between states.
    ///
    /// Times outside the trajectory are clamped to its ends.
    pub fn sample(&self, t_s: f64) -> TimedState {
        let t_s = t_s + self.first_state().t_s;

        if t_s <= self.first_state().t_s {
            return *self.first_state();
        }
        if t_s >= self.last_state().t_s {
            return *self.last_state();
        }

        let idx = self.states.partition_point(|s| s.t_s <= t_s);
        let s0 = &self.states[idx - 1];
        let s1 = &self.states[idx];
        let frac = (t_s - s0.t_s) / (s1.t_s - s0.t_s);

        TimedState {
            t_s,
            pose: Pose2d::from_position(
                s0.pose.position_m.lerp(&s1.pose.position_m, frac),
                s0.pose.heading_rad + lerp(0.0, ang_dist(s0.pose.heading_rad, s1.pose.heading_rad), frac),
            ),
            curvature_m: lerp(s0.curvature_m, s1.curvature_m, frac),
            velocity_ms: lerp(s0.velocity_ms, s1.velocity_ms, frac),
            accel_mss: lerp(s0.accel_mss, s1.accel_mss, frac),
        }
    }

    fn validate(&self) -> Result<(), TrajectoryError> {
        if self.states.is_empty() {
            return Err(TrajectoryError::Empty);
        }

        for (i, w) in self.states.windows(2).enumerate() {
            if w[1].t_s <= w[0].t_s {
                return Err(TrajectoryError::NonMonotonicTime(i + 1));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_from_waypoints() {
        let traj = Trajectory::from_waypoints(
            &[Vector2::new(0.0, 0.0), Vector2::new(1.0, 0.0), Vector2::new(1.0, 1.0)],
            1.0,
            0.1,
            false,
        ).unwrap();

        assert!(!traj.reversed());
        assert_eq!(traj.first_state().pose, Pose2d::new(0.0, 0.0, 0.0));
        assert_eq!(traj.last_state().pose.position_m, Vector2::new(1.0, 1.0));
        assert_eq!(traj.last_state().velocity_ms, 0.0);
        assert!((traj.duration_s() - 2.0).abs() < 1e-9);

        // All of the turn happens on the state before the corner
        let total_turn: f64 = traj.states()
            .iter()
            .map(|s| s.curvature_m * s.velocity_ms * 0.1)
            .sum();
        assert!((total_turn - FRAC_PI_2).abs() < 1e-9);
    }

    #[test]
    fn test_reversed_heading() {
        let traj = Trajectory::from_waypoints(
            &[Vector2::new(0.0, 0.0), Vector2::new(-1.0, 0.0)],
            0.5,
            0.1,
            true,
        ).unwrap();

        // Driving towards -X backwards means facing +X
        assert!(traj.first_state().pose.heading_rad.abs() < 1e-9);
        assert!(traj.first_state().velocity_ms < 0.0);
    }

    #[test]
    fn test_sample() {
        let traj = Trajectory::from_waypoints(
            &[Vector2::new(0.0, 0.0), Vector2::new(2.0, 0.0)],
            1.0,
            0.5,
            false,
        ).unwrap();

        let s = traj.sample(0.75);
        assert!((s.pose.position_m[0] - 0.75).abs() < 1e-9);
        assert_eq!(s.velocity_ms, 1.0);

        assert_eq!(traj.sample(-1.0), *traj.first_state());
        assert_eq!(traj.sample(100.0), *traj.last_state());
    }

    #[test]
    fn test_invalid() {
        assert!(matches!(Trajectory::new(vec![], false), Err(TrajectoryError::Empty)));
        assert!(matches!(
            Trajectory::new(vec![TimedState::default(), TimedState::default()], false),
            Err(TrajectoryError::NonMonotonicTime(1))
        ));
        assert!(matches!(
            Trajectory::from_waypoints(&[Vector2::new(0.0, 0.0)], 1.0, 0.1, false),
            Err(TrajectoryError::TooFewWaypoints(1))
        ));
    }

    #[test]
    fn test_deserialise_validates() {
        let empty = r#"{"states": [], "reversed": false}"#;
        let err = serde_json::from_str::<Trajectory>(empty).unwrap_err();
        assert!(err.to_string().contains("no states"));

        let state = r#"{"t_s": 0.0, "pose": {"position_m": [0.0, 0.0], "heading_rad": 0.0},
            "curvature_m": 0.0, "velocity_ms": 0.0, "accel_mss": 0.0}"#;
        let repeated = format!(r#"{{"states": [{0}, {0}]}}"#, state);
        assert!(serde_json::from_str::<Trajectory>(&repeated).is_err());

        let single = format!(r#"{{"states": [{}]}}"#, state);
        let traj: Trajectory = serde_json::from_str(&single).unwrap();
        assert!(!traj.reversed());
        assert_eq!(traj.duration_s(), 0.0);
    }

    #[test]
    fn test_save_and_load() {
        let path = std::env::temp_dir().join(format!("bot_traj_test_{}.json", std::process::id()));
        let traj = Trajectory::from_waypoints(
            &[Vector2::new(0.0, 0.0), Vector2::new(1.0, 0.5)],
            1.0,
            0.1,
            true
        ).unwrap();

        traj.save(&path).unwrap();
        let loaded = Trajectory::load(&path).unwrap();
        assert_eq!(loaded.states().len(), traj.states().len());
        assert!(loaded.reversed());
        assert!((loaded.duration_s() - traj.duration_s()).abs() < 1e-12);

        std::fs::remove_file(&path).ok();
        assert!(matches!(Trajectory::load(&path), Err(TrajectoryError::FileError(_))));
    }
}
