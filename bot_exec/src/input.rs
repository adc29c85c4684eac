//! # Driver input
//!
//! Axis and button sources polled once per cycle by the teleop command. Any closure returning the
//! right type is a source, which lets the executable bind them to a joystick, a recording, or a
//! fixed value in tests.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::path::Path;

use serde::Deserialize;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// An analogue input, normally between -1 and +1.
pub trait AxisSource {
    fn value(&self) -> f64;
}

/// A digital input.
pub trait ButtonSource {
    fn pressed(&self) -> bool;
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// One cycle's worth of recorded driver input.
///
/// Stick Y is positive when pulled back, as reported by gamepads.
#[derive(Debug, Default, Copy, Clone, PartialEq, Deserialize)]
pub struct InputFrame {
    pub speed_y: f64,

    pub rotation_x: f64,

    #[serde(default)]
    pub quick_turn: bool,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("Could not open the input recording: {0}")]
    OpenError(csv::Error),

    #[error("Could not read row {0} of the input recording: {1}")]
    RowError(usize, csv::Error),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<F: Fn() -> f64> AxisSource for F {
    fn value(&self) -> f64 {
        self()
    }
}

impl<F: Fn() -> bool> ButtonSource for F {
    fn pressed(&self) -> bool {
        self()
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Load a recording of driver inputs from a CSV file with `speed_y,rotation_x,quick_turn`
/// columns.
pub fn load_recording<P: AsRef<Path>>(path: P) -> Result<Vec<InputFrame>, InputError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(InputError::OpenError)?;

    reader
        .deserialize::<InputFrame>()
        .enumerate()
        .map(|(i, r)| r.map_err(|e| InputError::RowError(i, e)))
        .collect()
}
