//! Command parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Deserialize;

use crate::geom::PoseParam;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the vision corrected trajectory command
#[derive(Deserialize, Debug, Clone)]
pub struct TrajVisionParams {
    /// Pose of the intake in the robot frame. Vision steering aims this point, not the robot
    /// centre, at the target.
    pub intake_offset: PoseParam,

    /// Field frame Y offset applied to the trajectory's end point when checking whether the
    /// robot is close enough to start looking for the target.
    ///
    /// Units: meters
    pub end_point_y_offset_m: f64,

    /// Pose of the forward intake relative to the robot centre, applied to the trajectory's end
    /// pose to predict where an absolute target will be.
    pub centre_to_intake: PoseParam,

    /// Vision is only used once the intake is closer than this to the trajectory end point
    ///
    /// Units: meters
    pub vision_radius_m: f64,

    /// Heading controller proportional gain
    pub k_p: f64,

    /// Heading controller derivative gain, applied to the per-cycle change in error
    pub k_d: f64,

    /// How targets are looked up in the tracker
    #[serde(default)]
    pub target_mode: TargetMode,

    /// Whether the tracker keeps being queried once a target has been locked
    #[serde(default)]
    pub lock_policy: VisionLockPolicy,
}

/// Parameters for the teleop drive command
#[derive(Deserialize, Debug, Clone, Copy)]
pub struct TeleopParams {
    /// Axis values with a smaller magnitude than this are treated as zero
    pub deadband: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// How the command looks up its target in the tracker.
#[derive(Deserialize, Debug, Copy, Clone, PartialEq, Eq)]
pub enum TargetMode {
    /// Nearest live target on the side of the robot the trajectory drives towards
    Relative,

    /// Live target near the expected intake position at the end of the trajectory
    Absolute,
}

/// Behaviour of the target lock once a target has been seen.
#[derive(Deserialize, Debug, Copy, Clone, PartialEq, Eq)]
pub enum VisionLockPolicy {
    /// Keep querying the tracker every cycle inside the vision radius, newer fixes replace the
    /// remembered one.
    Persistent,

    /// Stop querying once a fix is held, the first fix is used until the command ends.
    OneShot,
}

impl Default for TargetMode {
    fn default() -> Self {
        TargetMode::Relative
    }
}

impl Default for VisionLockPolicy {
    fn default() -> Self {
        VisionLockPolicy::Persistent
    }
}

impl Default for TeleopParams {
    fn default() -> Self {
        Self { deadband: 0.05 }
    }
}
