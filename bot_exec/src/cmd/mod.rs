//! # Commands
//!
//! Commands are the units of work run on the control loop. Each implements
//! [`util::module::Command`] and is driven by a [`CommandRunner`], which owns the lifecycle:
//!
//! - [`TrajVisionCmd`] follows a trajectory and steers onto a vision target near its end.
//! - [`TeleopCmd`] maps driver input onto a curvature drive.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod controllers;
pub mod params;
pub mod runner;
pub mod teleop;
pub mod traj_vision;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

pub use controllers::{heading_error, HeadingController, ASSUMED_CYCLE_PERIOD_S};
pub use params::{TargetMode, TeleopParams, TrajVisionParams, VisionLockPolicy};
pub use runner::{CommandRunner, RunnerState, Termination};
pub use teleop::TeleopCmd;
pub use traj_vision::{StatusReport, TrajVisionCmd, TrajVisionMode};

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors raised by commands during processing.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("The command was executed while not running, initialise it first")]
    NotRunning,
}
