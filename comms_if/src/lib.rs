//! # Communications interface crate.
//!
//! Provides all common communications interfaces for the software: the payloads produced by the
//! vision coprocessor and the demands sent to the drivetrain.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Demand and payload definitions for equipment (drivetrain, cameras)
pub mod eqpt;
