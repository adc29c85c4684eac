//! # Vision Equipment Communications Module
//!
//! The vision coprocessor publishes one JSON batch per camera per frame:
//!
//! ```json
//! { "timestamp": 12.34, "isFront": true, "isDrivetrain": false,
//!   "targets": [ { "angle": -4.2, "rotation": 1.5, "distance": 61.0 } ] }
//! ```

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Serialize, Deserialize};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Metres per inch, the coprocessor reports distances in inches.
pub const METERS_PER_INCH: f64 = 0.0254;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A batch of detections from one camera captured at one instant.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VisionData {
    /// Capture time in seconds, on the same clock as the localisation history
    pub timestamp: f64,

    /// Set by the front-facing cameras
    pub is_front: bool,

    /// Set by the camera mounted on the drivetrain (below the elevator)
    pub is_drivetrain: bool,

    /// The raw detections in this frame
    #[serde(default)]
    pub targets: Vec<RawTarget>,
}

/// A single raw detection, expressed in the camera frame.
#[derive(Debug, Serialize, Deserialize, Copy, Clone, PartialEq)]
pub struct RawTarget {
    /// Bearing of the target from the camera axis, degrees, CCW positive
    #[serde(rename = "angle")]
    pub angle_deg: f64,

    /// Rotation of the target face as seen by the camera, degrees
    #[serde(rename = "rotation")]
    pub rotation_deg: f64,

    /// Range to the target, inches
    #[serde(rename = "distance")]
    pub distance_in: f64,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Cameras available on the robot
#[derive(Debug, Serialize, Deserialize, Copy, Clone, Hash, Eq, PartialEq)]
pub enum CamId {
    /// Front camera mounted on the elevator carriage
    Front,

    /// Front camera mounted on the drivetrain, looking under the elevator
    Drivetrain,

    /// Rear camera
    Back,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl VisionData {
    /// Parse a batch from the coprocessor's JSON.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    /// Serialise the batch into the coprocessor's JSON format.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// The camera which produced this batch.
    pub fn camera(&self) -> CamId {
        match (self.is_front, self.is_drivetrain) {
            (true, false) => CamId::Front,
            (true, true) => CamId::Drivetrain,
            _ => CamId::Back,
        }
    }
}

impl CamId {
    /// Flags used on the wire for this camera, as `(is_front, is_drivetrain)`.
    pub fn flags(&self) -> (bool, bool) {
        match self {
            CamId::Front => (true, false),
            CamId::Drivetrain => (true, true),
            CamId::Back => (false, false),
        }
    }
}

impl RawTarget {
    /// Range to the target in metres.
    pub fn distance_m(&self) -> f64 {
        self.distance_in * METERS_PER_INCH
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_batch() {
        let json = r#"{"timestamp": 1.5, "isFront": true, "isDrivetrain": false,
            "targets": [{"angle": 10.0, "rotation": -2.0, "distance": 100.0}]}"#;

        let data = VisionData::from_json(json).unwrap();
        assert_eq!(data.timestamp, 1.5);
        assert_eq!(data.camera(), CamId::Front);
        assert_eq!(data.targets.len(), 1);
        assert_eq!(data.targets[0].angle_deg, 10.0);
        assert_eq!(data.targets[0].rotation_deg, -2.0);
        assert!((data.targets[0].distance_m() - 2.54).abs() < 1e-12);
    }

    #[test]
    fn test_camera_selection() {
        for cam in [CamId::Front, CamId::Drivetrain, CamId::Back].iter() {
            let (is_front, is_drivetrain) = cam.flags();
            let data = VisionData {
                timestamp: 0.0,
                is_front,
                is_drivetrain,
                targets: vec![],
            };
            assert_eq!(data.camera(), *cam);
        }

        // The drivetrain flag alone is not a front camera
        let data = VisionData::from_json(
            r#"{"timestamp": 0.0, "isFront": false, "isDrivetrain": true}"#
        ).unwrap();
        assert_eq!(data.camera(), CamId::Back);
        assert!(data.targets.is_empty());
    }

    #[test]
    fn test_malformed_batch() {
        assert!(VisionData::from_json(r#"{"timestamp": "soon"}"#).is_err());
    }
}
