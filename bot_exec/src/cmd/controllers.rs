//! # Heading controller
//!
//! Turns the bearing from the intake to the locked target into a turn rate demand.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::f64::consts::PI;

use serde::Serialize;
use util::maths::wrap_pi;

use crate::geom::{bearing, Pose2d};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Control cycle period the derivative gain is tuned for.
///
/// The derivative term uses the raw per-cycle change in error, so running the loop at a different
/// period scales the effective derivative gain.
pub const ASSUMED_CYCLE_PERIOD_S: f64 = 0.02;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A PD controller on heading error.
#[derive(Debug, Serialize, Clone)]
pub struct HeadingController {
    /// Proportional gain
    k_p: f64,

    /// Derivative gain
    k_d: f64,

    /// Error passed in on the previous cycle
    prev_error: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl HeadingController {
    pub fn new(k_p: f64, k_d: f64) -> Self {
        Self {
            k_p,
            k_d,
            prev_error: 0.0,
        }
    }

    /// Get the turn rate demand for the given heading error.
    pub fn get(&mut self, error_rad: f64) -> f64 {
        let out = self.k_p * error_rad + self.k_d * (error_rad - self.prev_error);
        self.prev_error = error_rad;
        out
    }

    /// Forget the previous error.
    pub fn reset(&mut self) {
        self.prev_error = 0.0;
    }

    pub fn prev_error(&self) -> f64 {
        self.prev_error
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Heading error from `frame` to `target`, both in the field frame.
///
/// The error is the bearing of the target seen from `frame`, CCW positive. When `reversed` the
/// robot's back is the side that has to face the target so the error is shifted by pi.
pub fn heading_error(frame: &Pose2d, target: &Pose2d, reversed: bool) -> f64 {
    let rel = target.in_frame_of_reference_of(frame);
    let offset = if reversed { PI } else { 0.0 };

    wrap_pi(bearing(&rel.position_m) + offset)
}
