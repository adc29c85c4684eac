//! # Drivetrain Equipment Demands

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Serialize, Deserialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Velocity-level demand issued to the drivetrain every cycle while following a trajectory.
///
/// Angular quantities follow the right hand rule about the robot's Z+ (upwards) axis, so a
/// positive angular velocity turns the robot to the left.
#[derive(Debug, Default, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriveOutput {
    /// Units: meters/second
    pub linear_velocity_ms: f64,

    /// Units: meters/second^2
    pub linear_accel_mss: f64,

    /// Units: radians/second
    pub angular_velocity_rads: f64,

    /// Units: radians/second^2
    pub angular_accel_radss: f64,
}

/// Open loop curvature-drive demand, as produced by the teleop command.
#[derive(Debug, Default, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurvatureDems {
    /// Normalised forward demand between -1 and +1
    pub linear: f64,

    /// Normalised curvature demand between -1 and +1. Positive curvature turns right, matching
    /// the driver stick X axis.
    pub curvature: f64,

    /// Rotate in place, ignoring the linear demand scaling of curvature
    pub quick_turn: bool,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// The demand currently applied to the drivetrain.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub enum DriveDems {
    /// All outputs zeroed, the drivetrain coasts to a stop
    Zero,

    /// Closed loop velocity demand
    Velocity(DriveOutput),

    /// Open loop curvature drive
    Curvature(CurvatureDems),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Default for DriveDems {
    fn default() -> Self {
        DriveDems::Zero
    }
}

impl DriveOutput {
    /// Build an output with the given linear velocity and turn rate and zero accelerations.
    pub fn from_velocities(linear_velocity_ms: f64, angular_velocity_rads: f64) -> Self {
        Self {
            linear_velocity_ms,
            angular_velocity_rads,
            ..Default::default()
        }
    }
}
