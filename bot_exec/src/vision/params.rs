//! Vision processing parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

use crate::geom::PoseParam;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for vision processing
#[derive(Deserialize, Debug, Clone)]
pub struct Params {
    /// Length of the robot's footprint along its X axis, detections inside the footprint are the
    /// robot's own features.
    ///
    /// Units: meters
    pub robot_length_m: f64,

    /// Width of the robot's footprint along its Y axis.
    ///
    /// Units: meters
    pub robot_width_m: f64,

    /// Mount pose of the front (elevator carriage) camera in the robot frame
    pub front_mount: PoseParam,

    /// Mount pose of the drivetrain camera in the robot frame
    pub drivetrain_mount: PoseParam,

    /// Mount pose of the rear camera in the robot frame
    pub back_mount: PoseParam,

    /// Lower bound of the elevator blocking band. While the elevator is inside the band the front
    /// camera's view is blocked, outside it the drivetrain camera's is.
    ///
    /// Units: meters
    pub elevator_block_min_m: f64,

    /// Highest elevator height of the blocking band.
    ///
    /// Units: meters
    pub elevator_block_max_m: f64,

    /// Target tracker parameters
    pub tracker: TrackerParams,
}

/// Parameters for the target tracker
#[derive(Deserialize, Debug, Clone, Copy)]
pub struct TrackerParams {
    /// Samples closer than this to a track's averaged position join that track
    ///
    /// Units: meters
    pub association_tolerance_m: f64,

    /// Samples older than this are forgotten
    ///
    /// Units: seconds
    pub max_lifetime_s: f64,

    /// Number of samples a track must have held at once before it is reported
    pub min_samples: usize,
}

impl Default for TrackerParams {
    fn default() -> Self {
        Self {
            association_tolerance_m: 0.4064,
            max_lifetime_s: 0.5,
            min_samples: 2,
        }
    }
}
