//! # Telemetry
//!
//! Commands publish a handful of named values for the driver station dashboard. Publishing is
//! fire-and-forget, a sink must never fail back into the control loop.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use serde::Serialize;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// True while a trajectory is being followed
pub const KEY_PATH_FOLLOWING: &str = "isFollowingPath";

/// X position of the trajectory reference point, meters
pub const KEY_PATH_X: &str = "pathX";

/// Y position of the trajectory reference point, meters
pub const KEY_PATH_Y: &str = "pathY";

/// Heading of the trajectory reference point, radians
pub const KEY_PATH_HEADING: &str = "pathHeading";

/// True while vision correction is steering the robot
pub const KEY_VISION_ACTIVE: &str = "visionActive";

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A destination for telemetry values.
pub trait TelemetrySink {
    fn put_bool(&mut self, key: &str, value: bool);

    fn put_number(&mut self, key: &str, value: f64);
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// In-memory dashboard holding the latest value of every key.
#[derive(Debug, Default, Clone, Serialize)]
pub struct Dashboard {
    values: BTreeMap<String, TmValue>,

    /// Number of values published since creation
    num_updates: u64,
}

/// A sink which discards everything.
#[derive(Debug, Default, Copy, Clone)]
pub struct NullSink;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Copy, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TmValue {
    Bool(bool),
    Number(f64),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Dashboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<TmValue> {
        self.values.get(key).copied()
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.get(key) {
            Some(TmValue::Bool(b)) => Some(b),
            _ => None,
        }
    }

    pub fn get_number(&self, key: &str) -> Option<f64> {
        match self.get(key) {
            Some(TmValue::Number(n)) => Some(n),
            _ => None,
        }
    }

    pub fn num_updates(&self) -> u64 {
        self.num_updates
    }
}

impl TelemetrySink for Dashboard {
    fn put_bool(&mut self, key: &str, value: bool) {
        self.values.insert(key.to_string(), TmValue::Bool(value));
        self.num_updates += 1;
    }

    fn put_number(&mut self, key: &str, value: f64) {
        self.values.insert(key.to_string(), TmValue::Number(value));
        self.num_updates += 1;
    }
}

/// A dashboard shared between the executable and the commands publishing to it.
impl<T: TelemetrySink> TelemetrySink for Rc<RefCell<T>> {
    fn put_bool(&mut self, key: &str, value: bool) {
        self.borrow_mut().put_bool(key, value)
    }

    fn put_number(&mut self, key: &str, value: f64) {
        self.borrow_mut().put_number(key, value)
    }
}

impl TelemetrySink for NullSink {
    fn put_bool(&mut self, _key: &str, _value: bool) {}

    fn put_number(&mut self, _key: &str, _value: f64) {}
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_dashboard() {
        let dash = Rc::new(RefCell::new(Dashboard::new()));
        let mut sink: Box<dyn TelemetrySink> = Box::new(dash.clone());

        sink.put_bool(KEY_VISION_ACTIVE, true);
        sink.put_number(KEY_PATH_X, 1.5);
        sink.put_bool(KEY_VISION_ACTIVE, false);

        let d = dash.borrow();
        assert_eq!(d.get_bool(KEY_VISION_ACTIVE), Some(false));
        assert_eq!(d.get_number(KEY_PATH_X), Some(1.5));
        assert_eq!(d.get_number(KEY_VISION_ACTIVE), None);
        assert_eq!(d.num_updates(), 3);

        let json = serde_json::to_string(&*d).unwrap();
        assert!(json.contains(r#""pathX":1.5"#));
    }
}
