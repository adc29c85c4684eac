//! Simulated drivetrain
//!
//! Integrates a differential drive (unicycle) model from whatever demand was last applied, and
//! keeps the pose history used to register vision samples.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::eqpt::drive::{CurvatureDems, DriveDems, DriveOutput};
use log::trace;
use serde::{Deserialize, Serialize};
use util::{
    archive::{ArchiveError, Archived, Archiver},
    session::Session,
};

use super::{curvature_mix, Drivetrain};
use crate::{
    geom::{Pose2d, PoseParam},
    loc::{PoseHistory, PoseLookup},
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the simulated drivetrain
#[derive(Debug, Clone, Deserialize)]
pub struct SimDriveParams {
    /// Wheel speed at a normalised output of 1
    ///
    /// Units: meters/second
    pub max_speed_ms: f64,

    /// Distance between the left and right wheels
    ///
    /// Units: meters
    pub track_width_m: f64,

    /// How long poses are kept for vision registration
    ///
    /// Units: seconds
    pub history_max_age_s: f64,

    /// Starting pose of the robot
    pub start_pose: PoseParam,
}

/// Simulated drivetrain.
pub struct SimDrivetrain {
    params: SimDriveParams,

    pose: Pose2d,

    dems: DriveDems,

    time_s: f64,

    history: PoseHistory,

    arch: Archiver,
}

/// One row of the drive archive.
#[derive(Debug, Serialize)]
struct DriveRecord {
    time_s: f64,
    x_m: f64,
    y_m: f64,
    heading_rad: f64,

    /// `zero`, `velocity` or `curvature`
    dems_kind: &'static str,

    /// Linear velocity (m/s) or normalised linear demand, depending on the kind
    dems_linear: f64,

    /// Angular velocity (rad/s) or normalised curvature demand, depending on the kind
    dems_turn: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SimDrivetrain {
    pub fn new(params: SimDriveParams) -> Self {
        let pose = Pose2d::from(params.start_pose);
        let mut history = PoseHistory::new(params.history_max_age_s);
        history.push(0.0, pose);

        Self {
            params,
            pose,
            dems: DriveDems::Zero,
            time_s: 0.0,
            history,
            arch: Archiver::default(),
        }
    }

    /// Start archiving the drivetrain state into the session.
    pub fn init_archive(&mut self, session: &Session) -> Result<(), ArchiveError> {
        self.arch = Archiver::from_path(session, "drive.csv")?;
        Ok(())
    }

    /// Advance the simulation by `dt_s` seconds under the current demand.
    pub fn step(&mut self, dt_s: f64) {
        let (v_ms, w_rads) = self.body_rates();

        // Integrate about the mid-step heading
        let mid_heading = self.pose.heading_rad + 0.5 * w_rads * dt_s;
        let mut position_m = self.pose.position_m;
        position_m[0] += v_ms * mid_heading.cos() * dt_s;
        position_m[1] += v_ms * mid_heading.sin() * dt_s;

        self.pose = Pose2d::from_position(position_m, self.pose.heading_rad + w_rads * dt_s);
        self.time_s += dt_s;
        self.history.push(self.time_s, self.pose);

        trace!("SimDrivetrain t = {:.3} s, pose {:?}", self.time_s, self.pose);
    }

    /// Simulation time.
    pub fn time_s(&self) -> f64 {
        self.time_s
    }

    /// Linear and angular body rates produced by the current demand.
    fn body_rates(&self) -> (f64, f64) {
        match self.dems {
            DriveDems::Zero => (0.0, 0.0),
            DriveDems::Velocity(o) => (o.linear_velocity_ms, o.angular_velocity_rads),
            DriveDems::Curvature(c) => {
                let (left, right) = curvature_mix(&c);
                (
                    0.5 * (left + right) * self.params.max_speed_ms,
                    (right - left) * self.params.max_speed_ms / self.params.track_width_m,
                )
            }
        }
    }
}

impl Drivetrain for SimDrivetrain {
    fn set_output(&mut self, output: DriveOutput) {
        self.dems = DriveDems::Velocity(output);
    }

    fn zero_outputs(&mut self) {
        self.dems = DriveDems::Zero;
    }

    fn curvature_drive(&mut self, linear: f64, curvature: f64, quick_turn: bool) {
        self.dems = DriveDems::Curvature(CurvatureDems {
            linear,
            curvature,
            quick_turn,
        });
    }

    fn robot_position(&self) -> Pose2d {
        self.pose
    }

    fn dems(&self) -> DriveDems {
        self.dems
    }
}

impl Archived for SimDrivetrain {
    fn write(&mut self) -> Result<(), ArchiveError> {
        let (dems_kind, dems_linear, dems_turn) = match self.dems {
            DriveDems::Zero => ("zero", 0.0, 0.0),
            DriveDems::Velocity(o) => ("velocity", o.linear_velocity_ms, o.angular_velocity_rads),
            DriveDems::Curvature(c) => ("curvature", c.linear, c.curvature),
        };

        self.arch.serialise(DriveRecord {
            time_s: self.time_s,
            x_m: self.pose.position_m[0],
            y_m: self.pose.position_m[1],
            heading_rad: self.pose.heading_rad,
            dems_kind,
            dems_linear,
            dems_turn,
        })
    }
}

impl PoseLookup for SimDrivetrain {
    fn pose_at(&self, time_s: f64) -> Option<Pose2d> {
        self.history.pose_at(time_s)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    fn params() -> SimDriveParams {
        SimDriveParams {
            max_speed_ms: 2.0,
            track_width_m: 0.5,
            history_max_age_s: 5.0,
            start_pose: PoseParam { x_m: 1.0, y_m: 0.0, heading_deg: 90.0 },
        }
    }

    #[test]
    fn test_velocity_integration() {
        let mut sim = SimDrivetrain::new(params());
        sim.set_output(DriveOutput::from_velocities(1.0, 0.0));

        for _ in 0..10 {
            sim.step(0.1);
        }

        let pose = sim.robot_position();
        assert!((pose.position_m[0] - 1.0).abs() < 1e-9);
        assert!((pose.position_m[1] - 1.0).abs() < 1e-9);
        assert!((pose.heading_rad - FRAC_PI_2).abs() < 1e-9);

        // History covers the whole run
        let half = sim.pose_at(0.5).unwrap();
        assert!((half.position_m[1] - 0.5).abs() < 1e-9);

        sim.zero_outputs();
        sim.step(0.1);
        assert_eq!(sim.robot_position(), pose);
        assert_eq!(sim.dems(), DriveDems::Zero);
    }

    #[test]
    fn test_quick_turn() {
        let mut sim = SimDrivetrain::new(params());
        sim.curvature_drive(0.0, 0.25, true);
        sim.step(0.1);

        // Positive curvature turns right (clockwise), in place
        let pose = sim.robot_position();
        assert!(pose.heading_rad < FRAC_PI_2);
        assert!((pose.position_m[0] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_archive_not_initialised() {
        let mut sim = SimDrivetrain::new(params());
        assert!(matches!(sim.write(), Err(ArchiveError::NotInit)));
    }
}
