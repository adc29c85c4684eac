//! # Vision module
//!
//! Vision turns the detections published by the vision coprocessor into tracked targets on the
//! field. The flow for each camera batch is:
//!
//! 1. The JSON payload is received on the [`VisionInbox`] and parsed, malformed payloads are
//!    logged and discarded.
//! 2. [`VisionProcessor::process_data`] drops batches from cameras blocked by the elevator,
//!    converts each detection into a robot-frame candidate, rejects candidates inside the
//!    robot's footprint and registers the rest against the robot pose at capture time.
//! 3. The resulting field-frame samples are added to the [`TargetTracker`], which averages them
//!    over time into live targets.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod params;
pub mod processing;
pub mod target_tracker;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::sync::mpsc::{Receiver, TryRecvError};

use comms_if::eqpt::vision::VisionData;
use log::warn;

pub use params::{Params, TrackerParams};
pub use processing::*;
pub use target_tracker::*;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Receiving end of the vision payload channel.
///
/// Payloads are produced by whatever talks to the coprocessor, possibly on another thread, and
/// drained without blocking at the start of each control cycle.
pub struct VisionInbox {
    rx: Receiver<String>,

    /// Set once the sending side has hung up
    disconnected: bool,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum VisionError {
    #[error("Could not parse vision payload: {0}")]
    ParseError(serde_json::Error),

    #[error("No robot pose is available at t = {0:.3} s")]
    NoPoseAt(f64),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl VisionInbox {
    pub fn new(rx: Receiver<String>) -> Self {
        Self {
            rx,
            disconnected: false,
        }
    }

    /// True once the sender has been dropped and every payload has been drained.
    pub fn is_disconnected(&self) -> bool {
        self.disconnected
    }

    /// Take every payload currently waiting, parsing each into a batch.
    pub fn drain(&mut self) -> Vec<VisionData> {
        let mut batches = Vec::new();

        loop {
            match self.rx.try_recv() {
                Ok(s) => match parse_payload(&s) {
                    Ok(d) => batches.push(d),
                    Err(e) => warn!("Discarding vision payload: {}", e),
                },
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    if !self.disconnected {
                        warn!("Vision payload channel disconnected");
                    }
                    self.disconnected = true;
                    break;
                }
            }
        }

        batches
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Parse a single JSON payload from the coprocessor.
pub fn parse_payload(s: &str) -> Result<VisionData, VisionError> {
    VisionData::from_json(s).map_err(VisionError::ParseError)
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::mpsc::channel;

    #[test]
    fn test_inbox_drain() {
        let (tx, rx) = channel();
        let mut inbox = VisionInbox::new(rx);

        assert!(inbox.drain().is_empty());

        tx.send(String::from(
            r#"{"timestamp": 0.1, "isFront": false, "isDrivetrain": false, "targets": []}"#
        )).unwrap();
        tx.send(String::from("not json")).unwrap();
        tx.send(String::from(
            r#"{"timestamp": 0.2, "isFront": true, "isDrivetrain": true,
                "targets": [{"angle": 1.0, "rotation": 2.0, "distance": 40.0}]}"#
        )).unwrap();

        // The malformed payload is dropped, the others arrive in order
        let batches = inbox.drain();
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].timestamp, 0.1);
        assert_eq!(batches[1].targets.len(), 1);
        assert!(!inbox.is_disconnected());

        drop(tx);
        assert!(inbox.drain().is_empty());
        assert!(inbox.is_disconnected());
    }
}
