//! # Simulated vision
//!
//! Stands in for the vision coprocessor when running without hardware. A [`SimCamera`] produces
//! the raw detections a real camera would report for a set of ground truth targets, and the
//! [`SimVisionServer`] runs the cameras on a background thread, publishing JSON payloads exactly
//! as the coprocessor does.
//!
//! The control loop sends the true robot pose to the server each cycle. Payloads come back on the
//! vision channel and are picked up by the [`VisionInbox`](crate::vision::VisionInbox).

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc::{self, Receiver, RecvTimeoutError, Sender},
        Arc,
    },
    thread::{self, JoinHandle},
    time::Duration,
};

use comms_if::eqpt::vision::{CamId, RawTarget, VisionData, METERS_PER_INCH};
use log::{debug, warn};
use serde::Deserialize;
use util::maths::wrap_pi;

use crate::{
    drive::SimDriveParams,
    geom::{bearing, Pose2d, PoseParam},
};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// How long the server thread waits for a pose before checking whether it should stop.
const POSE_RECV_TIMEOUT: Duration = Duration::from_millis(50);

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Parameters of the simulation
#[derive(Debug, Clone, Deserialize)]
pub struct SimParams {
    /// Simulated drivetrain parameters
    pub drive: SimDriveParams,

    /// Field poses of the ground truth targets
    pub targets: Vec<PoseParam>,

    /// Fixed height of the elevator
    ///
    /// Units: meters
    pub elevator_height_m: f64,

    /// Maximum range at which a camera detects a target
    ///
    /// Units: meters
    pub camera_max_range_m: f64,

    /// Full horizontal field of view of the cameras
    ///
    /// Units: degrees
    pub camera_fov_deg: f64,
}

/// A simulated camera.
#[derive(Debug, Clone, Copy)]
pub struct SimCamera {
    id: CamId,

    mount: Pose2d,

    max_range_m: f64,

    half_fov_rad: f64,
}

/// Background thread generating vision payloads.
pub struct SimVisionServer {
    bg_jh: Option<JoinHandle<()>>,
    bg_run: Arc<AtomicBool>,
    pose_tx: Option<Sender<(f64, Pose2d)>>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SimCamera {
    pub fn new(id: CamId, mount: Pose2d, max_range_m: f64, fov_deg: f64) -> Self {
        Self {
            id,
            mount,
            max_range_m,
            half_fov_rad: 0.5 * fov_deg.to_radians(),
        }
    }

    /// The raw detection this camera reports for a target, if it can see it.
    pub fn detect(&self, robot_pose: &Pose2d, target: &Pose2d) -> Option<RawTarget> {
        let cam_pose = *robot_pose + self.mount;
        let local = target.in_frame_of_reference_of(&cam_pose);

        let distance_m = local.position_m.norm();
        let angle_rad = bearing(&local.position_m);

        if distance_m > self.max_range_m || angle_rad.abs() > self.half_fov_rad {
            return None;
        }

        // Inverse of the heading convention used when processing detections
        let rotation_rad = wrap_pi(angle_rad + std::f64::consts::PI - local.heading_rad);

        Some(RawTarget {
            angle_deg: angle_rad.to_degrees(),
            rotation_deg: rotation_rad.to_degrees(),
            distance_in: distance_m / METERS_PER_INCH,
        })
    }

    /// The batch this camera would publish at `timestamp_s`.
    pub fn observe(&self, timestamp_s: f64, robot_pose: &Pose2d, targets: &[Pose2d]) -> VisionData {
        let (is_front, is_drivetrain) = self.id.flags();

        VisionData {
            timestamp: timestamp_s,
            is_front,
            is_drivetrain,
            targets: targets
                .iter()
                .filter_map(|t| self.detect(robot_pose, t))
                .collect(),
        }
    }
}

impl SimVisionServer {
    /// Start the server, publishing payloads into `vision_tx`.
    pub fn start(
        cameras: Vec<SimCamera>,
        targets: Vec<Pose2d>,
        vision_tx: Sender<String>,
    ) -> Self {
        let bg_run = Arc::new(AtomicBool::new(true));
        let (pose_tx, pose_rx) = mpsc::channel();

        let bg_run_clone = bg_run.clone();
        let bg_jh = Some(thread::spawn(move || {
            bg_thread(cameras, targets, pose_rx, vision_tx, bg_run_clone)
        }));

        debug!("SimVisionServer started");

        Self {
            bg_jh,
            bg_run,
            pose_tx: Some(pose_tx),
        }
    }

    /// Send the true robot pose at `timestamp_s`, triggering one frame from every camera.
    pub fn send_pose(&self, timestamp_s: f64, robot_pose: Pose2d) {
        if let Some(ref tx) = self.pose_tx {
            if tx.send((timestamp_s, robot_pose)).is_err() {
                warn!("SimVisionServer thread has stopped, pose not sent");
            }
        }
    }

    /// Stop the background thread and wait for it to exit.
    pub fn stop(&mut self) {
        self.bg_run.store(false, Ordering::Relaxed);
        self.pose_tx = None;

        if let Some(jh) = self.bg_jh.take() {
            if jh.join().is_err() {
                warn!("SimVisionServer thread panicked");
            }
        }
    }
}

impl Drop for SimVisionServer {
    fn drop(&mut self) {
        self.stop();
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn bg_thread(
    cameras: Vec<SimCamera>,
    targets: Vec<Pose2d>,
    pose_rx: Receiver<(f64, Pose2d)>,
    vision_tx: Sender<String>,
    bg_run: Arc<AtomicBool>,
) {
    while bg_run.load(Ordering::Relaxed) {
        let (timestamp_s, robot_pose) = match pose_rx.recv_timeout(POSE_RECV_TIMEOUT) {
            Ok(p) => p,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        };

        for cam in cameras.iter() {
            let data = cam.observe(timestamp_s, &robot_pose, &targets);

            let payload = match data.to_json() {
                Ok(s) => s,
                Err(e) => {
                    warn!("Could not serialise simulated vision payload: {}", e);
                    continue;
                }
            };

            // The receiver going away means the exec is shutting down
            if vision_tx.send(payload).is_err() {
                return;
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::vision::{parse_payload, process_detection};
    use util::maths::ang_dist;

    #[test]
    fn test_detect_inverts_processing() {
        let mount = Pose2d::new(0.3, -0.1, 0.2);
        let cam = SimCamera::new(CamId::Front, mount, 10.0, 120.0);
        let robot = Pose2d::new(1.0, 2.0, 0.7);
        let target = Pose2d::new(3.0, 3.5, -2.5);

        let raw = cam.detect(&robot, &target).unwrap();
        let field = robot + process_detection(&raw, &mount);

        assert!(field.distance_to(&target) < 1e-9);
        assert!(ang_dist(field.heading_rad, target.heading_rad).abs() < 1e-9);
    }

    #[test]
    fn test_detection_limits() {
        let cam = SimCamera::new(CamId::Back, Pose2d::new(-0.3, 0.0, std::f64::consts::PI), 3.0, 60.0);
        let robot = Pose2d::default();

        assert!(cam.detect(&robot, &Pose2d::new(-2.0, 0.0, 0.0)).is_some());
        assert!(cam.detect(&robot, &Pose2d::new(-5.0, 0.0, 0.0)).is_none());
        assert!(cam.detect(&robot, &Pose2d::new(2.0, 0.0, 0.0)).is_none());
        assert!(cam.detect(&robot, &Pose2d::new(-1.0, 1.5, 0.0)).is_none());
    }

    #[test]
    fn test_server_publishes_payloads() {
        let (tx, rx) = mpsc::channel();
        let cameras = vec![
            SimCamera::new(CamId::Front, Pose2d::new(0.3, 0.0, 0.0), 5.0, 90.0),
            SimCamera::new(CamId::Back, Pose2d::new(-0.3, 0.0, std::f64::consts::PI), 5.0, 90.0),
        ];
        let mut server = SimVisionServer::start(cameras, vec![Pose2d::new(2.0, 0.0, 0.0)], tx);

        server.send_pose(0.25, Pose2d::default());

        let front = parse_payload(&rx.recv_timeout(Duration::from_secs(5)).unwrap()).unwrap();
        let back = parse_payload(&rx.recv_timeout(Duration::from_secs(5)).unwrap()).unwrap();
        assert_eq!(front.camera(), CamId::Front);
        assert_eq!(front.timestamp, 0.25);
        assert_eq!(front.targets.len(), 1);
        assert_eq!(back.camera(), CamId::Back);
        assert!(back.targets.is_empty());

        server.stop();
        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());
    }
}
