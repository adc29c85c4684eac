//! Vision sample processing
//!
//! Converts the raw detections of one camera batch into field-frame target samples and submits
//! them to the target tracker.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::eqpt::vision::{CamId, RawTarget, VisionData};
use log::trace;

use super::{params::Params, target_tracker::TargetTracker, VisionError};
use crate::{
    geom::{polar, Pose2d},
    loc::PoseLookup,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Stateless processor applying the robot's camera and footprint geometry to vision batches.
#[derive(Debug, Clone)]
pub struct VisionProcessor {
    params: Params,
}

/// Outcome of processing one batch.
#[derive(Debug, Default, Copy, Clone, PartialEq)]
pub struct ProcessReport {
    /// The batch was dropped because the camera's view is blocked by the elevator
    pub occluded: bool,

    /// Number of detections rejected as parts of the robot itself
    pub num_self_detections: usize,

    /// Number of samples submitted to the tracker
    pub num_submitted: usize,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl VisionProcessor {
    pub fn new(params: Params) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// The mount pose of a camera in the robot frame.
    pub fn mount(&self, cam: CamId) -> Pose2d {
        match cam {
            CamId::Front => self.params.front_mount.into(),
            CamId::Drivetrain => self.params.drivetrain_mount.into(),
            CamId::Back => self.params.back_mount.into(),
        }
    }

    /// Returns true if the camera cannot see past the elevator at the given height.
    pub fn is_occluded(&self, cam: CamId, elevator_height_m: f64) -> bool {
        let in_band = elevator_height_m >= self.params.elevator_block_min_m
            && elevator_height_m <= self.params.elevator_block_max_m;

        match cam {
            CamId::Front => in_band,
            CamId::Drivetrain => !in_band,
            CamId::Back => false,
        }
    }

    /// Returns true if a robot-frame candidate lies within the robot's own footprint.
    pub fn is_self_detection(&self, candidate: &Pose2d) -> bool {
        candidate.position_m[0].abs() <= 0.5 * self.params.robot_length_m
            && candidate.position_m[1].abs() <= 0.5 * self.params.robot_width_m
    }

    /// Process one batch from the vision coprocessor.
    ///
    /// The batch is registered against the robot pose at its capture time, taken from `loc`. All
    /// surviving samples are submitted to `tracker` as a single timestamped batch.
    ///
    /// Occluded batches are silently dropped, this is not an error.
    pub fn process_data(
        &self,
        data: &VisionData,
        loc: &dyn PoseLookup,
        elevator_height_m: f64,
        tracker: &mut dyn TargetTracker,
    ) -> Result<ProcessReport, VisionError> {
        let mut report = ProcessReport::default();
        let cam = data.camera();

        if self.is_occluded(cam, elevator_height_m) {
            trace!(
                "{:?} batch at {:.3} s occluded (elevator at {:.3} m)",
                cam, data.timestamp, elevator_height_m
            );
            report.occluded = true;
            return Ok(report);
        }

        let robot_pose = loc
            .pose_at(data.timestamp)
            .ok_or(VisionError::NoPoseAt(data.timestamp))?;
        let mount = self.mount(cam);

        let mut samples = Vec::with_capacity(data.targets.len());
        for raw in data.targets.iter() {
            let candidate = process_detection(raw, &mount);

            if self.is_self_detection(&candidate) {
                report.num_self_detections += 1;
                continue;
            }

            samples.push(robot_pose + candidate);
        }

        report.num_submitted = samples.len();
        if !samples.is_empty() {
            tracker.add_samples(data.timestamp, samples);
        }

        trace!("{:?} batch at {:.3} s: {:?}", cam, data.timestamp, report);

        Ok(report)
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Convert a raw detection into a candidate pose in the robot frame.
///
/// The target lies at `distance` along the camera bearing `angle`. The detection's `rotation` is
/// the angle of the target face seen from the camera, so the target's heading in the camera
/// frame is `angle - rotation + 180 deg`, meaning a target squarely facing the camera has a
/// heading pointing back at it.
pub fn process_detection(raw: &RawTarget, mount: &Pose2d) -> Pose2d {
    let angle_rad = raw.angle_deg.to_radians();
    let heading_rad = (-raw.rotation_deg + raw.angle_deg + 180.0).to_radians();

    *mount + Pose2d::from_position(polar(raw.distance_m(), angle_rad), heading_rad)
}
