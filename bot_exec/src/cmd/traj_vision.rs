//! # Vision corrected trajectory command
//!
//! Follows a trajectory with the trajectory tracker, and once the intake gets close to the end of
//! the trajectory steers it at a vision target instead.
//!
//! Every cycle the nominal output for the current pose is taken from the trajectory tracker. When
//! the intake is within `vision_radius_m` of the trajectory's end point the target tracker is
//! queried and any live target replaces the remembered one. While a target is remembered the
//! command keeps the nominal linear velocity but replaces the turn rate with the output of a PD
//! controller on the bearing from the intake to the target. Without a target the nominal output
//! is used unchanged.
//!
//! The remembered target is only cleared when the command is initialised, so losing sight of the
//! target (or leaving the radius) keeps steering at its last known position.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::cell::RefCell;
use std::rc::Rc;

use comms_if::eqpt::drive::DriveOutput;
use log::{debug, info, trace};
use nalgebra::Vector2;
use serde::Serialize;
use util::module::Command;

use super::{
    controllers::{heading_error, HeadingController, ASSUMED_CYCLE_PERIOD_S},
    params::{TargetMode, TrajVisionParams, VisionLockPolicy},
    CommandError,
};
use crate::{
    drive::Drivetrain,
    geom::Pose2d,
    tm::{self, TelemetrySink},
    trajectory::{TrajectorySource, TrajectoryTracker},
    vision::TargetTracker,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Drive along a trajectory, finishing on a vision target.
pub struct TrajVisionCmd {
    params: TrajVisionParams,

    source: TrajectorySource,

    drive: Rc<RefCell<dyn Drivetrain>>,

    tracker: Box<dyn TrajectoryTracker>,

    targets: Box<dyn TargetTracker>,

    tm: Box<dyn TelemetrySink>,

    controller: HeadingController,

    mode: TrajVisionMode,

    /// End pose and direction of the loaded trajectory
    end_pose: Pose2d,
    reversed: bool,

    trajectory_finished: bool,

    last_known_target: Option<Pose2d>,

    vision_active: bool,

    report: StatusReport,

    /// Number of cycles executed since initialisation
    num_cycles: u64,

    /// Number of cycles in which the output was vision corrected, over the command's lifetime
    num_corrected_cycles: u64,
}

/// Per-cycle status of the command.
#[derive(Debug, Default, Copy, Clone, Serialize)]
pub struct StatusReport {
    /// Time since the command was initialised, counted in assumed cycle periods
    ///
    /// Units: seconds
    pub time_s: f64,

    /// The intake was within the vision radius of the trajectory end
    pub within_radius: bool,

    /// A live target was found in the tracker this cycle
    pub target_found: bool,

    /// The output was steered at a target this cycle
    pub vision_active: bool,

    /// Heading error to the target, zero when not steering
    pub heading_error_rad: f64,

    /// Turn rate demand sent to the drivetrain
    pub turn_rate_rads: f64,

    /// Linear velocity demand sent to the drivetrain
    pub linear_velocity_ms: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TrajVisionMode {
    Idle,
    Running,
    Terminated,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl TrajVisionCmd {
    pub fn new(
        params: TrajVisionParams,
        source: TrajectorySource,
        drive: Rc<RefCell<dyn Drivetrain>>,
        tracker: Box<dyn TrajectoryTracker>,
        targets: Box<dyn TargetTracker>,
        tm: Box<dyn TelemetrySink>,
    ) -> Self {
        let controller = HeadingController::new(params.k_p, params.k_d);

        Self {
            params,
            source,
            drive,
            tracker,
            targets,
            tm,
            controller,
            mode: TrajVisionMode::Idle,
            end_pose: Pose2d::default(),
            reversed: false,
            trajectory_finished: false,
            last_known_target: None,
            vision_active: false,
            report: StatusReport::default(),
            num_cycles: 0,
            num_corrected_cycles: 0,
        }
    }

    pub fn mode(&self) -> TrajVisionMode {
        self.mode
    }

    /// True while the output is being steered at a vision target.
    pub fn is_vision_active(&self) -> bool {
        self.vision_active
    }

    /// The target position currently steered at, if any.
    pub fn last_known_target(&self) -> Option<Pose2d> {
        self.last_known_target
    }

    pub fn report(&self) -> StatusReport {
        self.report
    }

    pub fn num_corrected_cycles(&self) -> u64 {
        self.num_corrected_cycles
    }

    /// The point near which the target is looked for.
    fn vision_centre(&self) -> Vector2<f64> {
        self.end_pose.position_m + Vector2::new(0.0, self.params.end_point_y_offset_m)
    }

    /// Query the target tracker, remembering any live target found.
    fn acquire_target(&mut self) {
        let target = match self.params.target_mode {
            TargetMode::Relative => self.targets.best_target(!self.reversed),
            TargetMode::Absolute => {
                let expected = self.end_pose + Pose2d::from(self.params.centre_to_intake);
                self.targets.absolute_target(&expected.position_m)
            }
        };

        if let Some(pose) = target.and_then(|t| t.averaged_pose) {
            if self.last_known_target.is_none() {
                info!("Vision target acquired at {:?}", pose.position_m);
            }
            self.report.target_found = true;
            self.last_known_target = Some(pose);
        }
    }
}

impl Command for TrajVisionCmd {
    type Error = CommandError;

    fn initialize(&mut self) -> Result<(), CommandError> {
        let trajectory = (self.source)();

        self.end_pose = trajectory.last_state().pose;
        self.reversed = trajectory.reversed();
        debug!(
            "TrajVisionCmd loaded a {:.2} s trajectory ending at {:?} (reversed: {})",
            trajectory.duration_s(), self.end_pose, self.reversed
        );
        self.tracker.reset(trajectory);

        self.controller.reset();
        self.trajectory_finished = false;
        self.last_known_target = None;
        self.vision_active = false;
        self.report = StatusReport::default();
        self.num_cycles = 0;

        self.tm.put_bool(tm::KEY_PATH_FOLLOWING, true);
        self.mode = TrajVisionMode::Running;

        Ok(())
    }

    fn execute(&mut self) -> Result<(), CommandError> {
        if self.mode != TrajVisionMode::Running {
            return Err(CommandError::NotRunning);
        }

        self.report = StatusReport {
            time_s: self.num_cycles as f64 * ASSUMED_CYCLE_PERIOD_S,
            ..Default::default()
        };
        self.num_cycles += 1;

        let robot_pose = self.drive.borrow().robot_position();
        let offset_pose = robot_pose + Pose2d::from(self.params.intake_offset);
        let nominal = self.tracker.next_state(&robot_pose);

        let centre = self.vision_centre();
        self.report.within_radius =
            (offset_pose.position_m - centre).norm() < self.params.vision_radius_m;

        let may_query = match self.params.lock_policy {
            VisionLockPolicy::Persistent => true,
            VisionLockPolicy::OneShot => self.last_known_target.is_none(),
        };
        if self.report.within_radius && may_query {
            self.acquire_target();
        }

        let output = match self.last_known_target {
            Some(target) => {
                let error = heading_error(&offset_pose, &target, self.reversed);
                let turn = self.controller.get(error);

                self.report.heading_error_rad = error;
                self.num_corrected_cycles += 1;

                trace!("Vision steering: error {:.4} rad, turn {:.4} rad/s", error, turn);

                DriveOutput::from_velocities(nominal.linear_velocity_ms, turn)
            }
            None => nominal,
        };

        if self.vision_active != self.last_known_target.is_some() {
            self.vision_active = self.last_known_target.is_some();
            self.tm.put_bool(tm::KEY_VISION_ACTIVE, self.vision_active);
        }

        self.report.vision_active = self.vision_active;
        self.report.turn_rate_rads = output.angular_velocity_rads;
        self.report.linear_velocity_ms = output.linear_velocity_ms;

        self.drive.borrow_mut().set_output(output);

        if let Some(reference) = self.tracker.reference_point() {
            self.tm.put_number(tm::KEY_PATH_X, reference.pose.position_m[0]);
            self.tm.put_number(tm::KEY_PATH_Y, reference.pose.position_m[1]);
            self.tm.put_number(tm::KEY_PATH_HEADING, reference.pose.heading_rad);
        }

        self.trajectory_finished = self.tracker.is_finished();

        Ok(())
    }

    fn is_finished(&self) -> bool {
        self.trajectory_finished
    }

    fn dispose(&mut self) {
        self.drive.borrow_mut().zero_outputs();
        self.tm.put_bool(tm::KEY_PATH_FOLLOWING, false);
        self.tm.put_bool(tm::KEY_VISION_ACTIVE, false);
        self.vision_active = false;
        self.mode = TrajVisionMode::Terminated;

        info!(
            "TrajVisionCmd ended, {} vision corrected cycles",
            self.num_corrected_cycles
        );
    }
}
