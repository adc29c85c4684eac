//! # Robot Executable Parameters
//!
//! This module provides parameters for the robot executable.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use nalgebra::Vector2;
use serde::Deserialize;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct BotExecParams {
    /// Target period of one control cycle
    ///
    /// Units: seconds
    pub cycle_period_s: f64,

    /// Number of consecutive cycle overruns after which the exec stops
    pub max_consec_overruns: u64,

    /// Cameras publish a frame every this many cycles
    pub vision_period_cycles: u64,

    /// The autonomous trajectory driven in `auto` mode
    pub auto_trajectory: AutoTrajectoryParams,
}

/// A waypoint trajectory for the autonomous segment.
#[derive(Debug, Clone, Deserialize)]
pub struct AutoTrajectoryParams {
    /// Waypoints in the field frame, `[x, y]` in meters
    pub waypoints_m: Vec<[f64; 2]>,

    /// Units: meters/second
    pub speed_ms: f64,

    /// Drive the trajectory backwards
    #[serde(default)]
    pub reversed: bool,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl AutoTrajectoryParams {
    pub fn waypoints(&self) -> Vec<Vector2<f64>> {
        self.waypoints_m
            .iter()
            .map(|w| Vector2::new(w[0], w[1]))
            .collect()
    }
}
