//! # Teleop drive command
//!
//! Maps the driver's sticks onto a curvature drive demand. Pushing the speed stick forward gives
//! a negative axis value, so it is negated to drive forwards.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::cell::RefCell;
use std::rc::Rc;

use log::trace;
use util::{maths::deadband, module::Command};

use super::{params::TeleopParams, CommandError};
use crate::{
    drive::Drivetrain,
    input::{AxisSource, ButtonSource},
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Open loop driver control of the drivetrain. Never finishes on its own.
pub struct TeleopCmd {
    params: TeleopParams,

    drive: Rc<RefCell<dyn Drivetrain>>,

    speed: Box<dyn AxisSource>,

    rotation: Box<dyn AxisSource>,

    quick_turn: Box<dyn ButtonSource>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl TeleopCmd {
    pub fn new(
        params: TeleopParams,
        drive: Rc<RefCell<dyn Drivetrain>>,
        speed: Box<dyn AxisSource>,
        rotation: Box<dyn AxisSource>,
        quick_turn: Box<dyn ButtonSource>,
    ) -> Self {
        Self {
            params,
            drive,
            speed,
            rotation,
            quick_turn,
        }
    }
}

impl Command for TeleopCmd {
    type Error = CommandError;

    fn initialize(&mut self) -> Result<(), CommandError> {
        Ok(())
    }

    fn execute(&mut self) -> Result<(), CommandError> {
        let linear = -deadband(self.speed.value(), self.params.deadband);
        let curvature = deadband(self.rotation.value(), self.params.deadband);
        let quick_turn = self.quick_turn.pressed();

        trace!("Teleop: linear {:.3}, curvature {:.3}, quick turn {}", linear, curvature, quick_turn);

        self.drive.borrow_mut().curvature_drive(linear, curvature, quick_turn);

        Ok(())
    }

    fn is_finished(&self) -> bool {
        false
    }

    fn dispose(&mut self) {
        self.drive.borrow_mut().zero_outputs();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        cmd::runner::CommandRunner,
        drive::{SimDriveParams, SimDrivetrain},
        geom::PoseParam,
        input::InputFrame,
    };
    use comms_if::eqpt::drive::{CurvatureDems, DriveDems};
    use std::cell::Cell;

    fn build() -> (CommandRunner<TeleopCmd>, Rc<RefCell<SimDrivetrain>>, Rc<Cell<InputFrame>>) {
        let drive = Rc::new(RefCell::new(SimDrivetrain::new(SimDriveParams {
            max_speed_ms: 3.0,
            track_width_m: 0.6,
            history_max_age_s: 1.0,
            start_pose: PoseParam::default(),
        })));
        let frame = Rc::new(Cell::new(InputFrame::default()));

        let (f0, f1, f2) = (frame.clone(), frame.clone(), frame.clone());
        let cmd = TeleopCmd::new(
            TeleopParams::default(),
            drive.clone(),
            Box::new(move || f0.get().speed_y),
            Box::new(move || f1.get().rotation_x),
            Box::new(move || f2.get().quick_turn),
        );

        (CommandRunner::new("TeleopCmd", cmd), drive, frame)
    }

    fn curvature_dems(drive: &Rc<RefCell<SimDrivetrain>>) -> CurvatureDems {
        match drive.borrow().dems() {
            DriveDems::Curvature(c) => c,
            d => panic!("Unexpected demand {:?}", d),
        }
    }

    #[test]
    fn test_axis_mapping() {
        let (mut runner, drive, frame) = build();

        frame.set(InputFrame { speed_y: -0.6, rotation_x: 0.25, quick_turn: true });
        runner.step().unwrap();
        assert_eq!(
            curvature_dems(&drive),
            CurvatureDems { linear: 0.6, curvature: 0.25, quick_turn: true }
        );
    }

    #[test]
    fn test_deadband_boundary() {
        let (mut runner, drive, frame) = build();

        frame.set(InputFrame { speed_y: 0.049, rotation_x: -0.049, quick_turn: false });
        runner.step().unwrap();
        let c = curvature_dems(&drive);
        assert_eq!(c.linear, 0.0);
        assert_eq!(c.curvature, 0.0);

        frame.set(InputFrame { speed_y: 0.05, rotation_x: -0.05, quick_turn: false });
        runner.step().unwrap();
        let c = curvature_dems(&drive);
        assert_eq!(c.linear, -0.05);
        assert_eq!(c.curvature, -0.05);
    }

    #[test]
    fn test_never_finishes_and_stops_on_cancel() {
        let (mut runner, drive, frame) = build();

        frame.set(InputFrame { speed_y: -1.0, rotation_x: 0.0, quick_turn: false });
        for _ in 0..50 {
            runner.step().unwrap();
            assert!(!runner.is_terminated());
        }

        runner.cancel();
        assert_eq!(drive.borrow().dems(), DriveDems::Zero);
    }
}
