//! # Drive module
//!
//! Defines the interface to the drivetrain and the open loop curvature drive mixer.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod sim;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::eqpt::drive::{CurvatureDems, DriveDems, DriveOutput};

use crate::geom::Pose2d;
pub use sim::*;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// Actuation and odometry interface of the drivetrain.
pub trait Drivetrain {
    /// Command a closed loop velocity output.
    fn set_output(&mut self, output: DriveOutput);

    /// Zero all outputs.
    fn zero_outputs(&mut self);

    /// Command an open loop curvature drive.
    fn curvature_drive(&mut self, linear: f64, curvature: f64, quick_turn: bool);

    /// The current estimated field pose of the robot centre.
    fn robot_position(&self) -> Pose2d;

    /// The demand currently applied.
    fn dems(&self) -> DriveDems;
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Mix a curvature drive demand into normalised `(left, right)` wheel outputs.
///
/// Outside quick turn the curvature is scaled by the linear demand, so the robot only turns
/// while moving. Outputs are scaled down together if either side exceeds 1.
pub fn curvature_mix(dems: &CurvatureDems) -> (f64, f64) {
    let turn = if dems.quick_turn {
        dems.curvature
    }
    else {
        dems.linear.abs() * dems.curvature
    };

    let mut left = dems.linear + turn;
    let mut right = dems.linear - turn;

    let max_magn = left.abs().max(right.abs());
    if max_magn > 1.0 {
        left /= max_magn;
        right /= max_magn;
    }

    (left, right)
}
