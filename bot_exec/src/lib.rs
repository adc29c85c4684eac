//! # Robot library.
//!
//! This library allows other crates in the workspace, and the robot executable itself, to access
//! items defined inside the robot crate.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Commands - the trajectory following and teleop commands, and the runner driving them
pub mod cmd;

/// Drive module - drivetrain interface and simulated drivetrain
pub mod drive;

/// Planar poses and frame transforms
pub mod geom;

/// Driver input sources
pub mod input;

/// Localisation module - robot pose history
pub mod loc;

/// Executable parameters
pub mod params;

/// Simulation client - simulated cameras publishing vision payloads
pub mod sim_client;

/// Telemetry sinks and the dashboard
pub mod tm;

/// Trajectories and trajectory trackers
pub mod trajectory;

/// Vision module - detection processing and target tracking
pub mod vision;
