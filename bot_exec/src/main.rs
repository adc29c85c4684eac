//! Main robot-side executable entry point.
//!
//! # Architecture
//!
//! The executable runs one command on a fixed-period control loop against the simulated
//! drivetrain:
//!
//!     - `auto`: follow a trajectory with vision correction. Each cycle:
//!         - Vision input: drain the payload channel, process each batch into the target tracker
//!         - Target tracker update against the current robot pose
//!         - Command processing
//!         - Archives
//!         - Simulation step, and a camera frame request every `vision_period_cycles`
//!     - `teleop <recording>`: replay recorded driver inputs through the teleop command, one row
//!       per cycle.
//!
//! On exit the final dashboard values are saved into the session as `dashboard.json`.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use std::cell::{Cell, RefCell};
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use color_eyre::{eyre::WrapErr, Report};
use comms_if::eqpt::vision::CamId;
use log::{debug, error, info, trace, warn};
use structopt::StructOpt;

// Internal
use bot_lib::{
    cmd::{
        CommandRunner, TeleopCmd, TeleopParams, TrajVisionCmd, TrajVisionParams,
        ASSUMED_CYCLE_PERIOD_S,
    },
    drive::{Drivetrain, SimDrivetrain},
    geom::Pose2d,
    input::{self, InputFrame},
    params::BotExecParams,
    sim_client::{SimCamera, SimParams, SimVisionServer},
    tm::{Dashboard, TelemetrySink},
    trajectory::{FeedforwardTracker, Trajectory, TrajectorySource},
    vision::{self, SharedTargetTracker, TargetTracker, VisionInbox, VisionProcessor},
};
use util::{
    archive::{Archived, Archiver},
    logger::{logger_init, LevelFilter},
    session::Session,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Robot executable
#[derive(Debug, StructOpt)]
#[structopt(name = "bot_exec")]
struct Opt {
    #[structopt(subcommand)]
    mode: Mode,
}

/// Tracks the timing of the control loop.
struct CycleTimer {
    period: Duration,
    num_consec_overruns: u64,
    max_consec_overruns: u64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, StructOpt)]
enum Mode {
    /// Follow the autonomous trajectory, steering onto simulated vision targets.
    #[structopt(name = "auto")]
    Auto {
        /// Load the trajectory from a JSON file instead of the waypoints in `bot_exec.toml`
        #[structopt(long, parse(from_os_str))]
        trajectory: Option<PathBuf>,
    },

    /// Replay recorded driver inputs through the teleop command.
    #[structopt(name = "teleop")]
    Teleop {
        /// CSV file with `speed_y,rotation_x,quick_turn` columns, one row per cycle
        #[structopt(parse(from_os_str))]
        recording: PathBuf,
    },
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    let opt = Opt::from_args();

    // ---- EARLY INITIALISATION ----

    let session = Session::new("bot_exec", "sessions")
        .wrap_err("Failed to create the session")?;

    logger_init(LevelFilter::Debug, &session)
        .wrap_err("Failed to initialise logging")?;

    info!("Robot Executable\n");
    info!("Session directory: {:?}\n", session.session_root);
    debug!("CLI options: {:?}", opt);

    // ---- LOAD PARAMETERS ----

    let exec_params: BotExecParams = util::params::load("bot_exec.toml")
        .wrap_err("Could not load exec params")?;
    let sim_params: SimParams = util::params::load("sim.toml")
        .wrap_err("Could not load sim params")?;

    if (exec_params.cycle_period_s - ASSUMED_CYCLE_PERIOD_S).abs() > 1e-9 {
        warn!(
            "Cycle period is {} s but the heading controller is tuned for {} s",
            exec_params.cycle_period_s, ASSUMED_CYCLE_PERIOD_S
        );
    }

    info!("Exec parameters loaded");

    // ---- INITIALISE SHARED EQUIPMENT ----

    let dashboard = Rc::new(RefCell::new(Dashboard::new()));

    let drive = Rc::new(RefCell::new(SimDrivetrain::new(sim_params.drive.clone())));
    drive
        .borrow_mut()
        .init_archive(&session)
        .wrap_err("Failed to initialise the drive archive")?;

    // ---- RUN ----

    let result = match opt.mode {
        Mode::Auto { trajectory } => run_auto(
            &session, &exec_params, &sim_params, trajectory, &drive, &dashboard,
        ),
        Mode::Teleop { recording } => run_teleop(
            &exec_params, recording, &drive, &dashboard,
        ),
    };

    // ---- SHUTDOWN ----

    session.save_or_warn("dashboard.json", &*dashboard.borrow());

    match result {
        Ok(()) => info!("End of execution"),
        Err(ref e) => error!("Execution stopped on error: {:#}", e),
    }

    result
}

/// Run the vision corrected trajectory command until it finishes.
fn run_auto(
    session: &Session,
    exec_params: &BotExecParams,
    sim_params: &SimParams,
    trajectory_path: Option<PathBuf>,
    drive: &Rc<RefCell<SimDrivetrain>>,
    dashboard: &Rc<RefCell<Dashboard>>,
) -> Result<(), Report> {
    // ---- PARAMETERS ----

    let vision_params: vision::Params = util::params::load("vision.toml")
        .wrap_err("Could not load vision params")?;
    let cmd_params: TrajVisionParams = util::params::load("traj_vision.toml")
        .wrap_err("Could not load TrajVisionCmd params")?;

    // ---- TRAJECTORY ----

    let trajectory = match trajectory_path {
        Some(p) => {
            info!("Loading trajectory from {:?}", p);
            Trajectory::load(&p).wrap_err("Could not load the trajectory file")?
        }
        None => Trajectory::from_waypoints(
            &exec_params.auto_trajectory.waypoints(),
            exec_params.auto_trajectory.speed_ms,
            exec_params.cycle_period_s,
            exec_params.auto_trajectory.reversed,
        ).wrap_err("Could not build the auto trajectory")?,
    };
    info!(
        "Trajectory lasts {:.2} s over {} states",
        trajectory.duration_s(),
        trajectory.states().len()
    );
    session.save_or_warn("trajectory.json", &trajectory);

    let source: TrajectorySource = Box::new(move || trajectory.clone());

    // ---- VISION ----

    let processor = VisionProcessor::new(vision_params.clone());
    let mut targets = SharedTargetTracker::new(vision_params.tracker);

    let (vision_tx, vision_rx) = mpsc::channel();
    let mut inbox = VisionInbox::new(vision_rx);

    let cameras = [CamId::Front, CamId::Drivetrain, CamId::Back]
        .iter()
        .map(|c| SimCamera::new(
            *c,
            processor.mount(*c),
            sim_params.camera_max_range_m,
            sim_params.camera_fov_deg,
        ))
        .collect();
    let target_poses = sim_params.targets.iter().map(|t| Pose2d::from(*t)).collect();
    let mut sim_server = SimVisionServer::start(cameras, target_poses, vision_tx);
    info!("SimVisionServer initialised");

    // ---- COMMAND ----

    let cmd = TrajVisionCmd::new(
        cmd_params,
        source,
        drive.clone(),
        Box::new(FeedforwardTracker::new(exec_params.cycle_period_s)),
        Box::new(targets.clone()),
        Box::new(dashboard.clone()),
    );
    let mut runner = CommandRunner::new("TrajVisionCmd", cmd);

    let mut cmd_arch = Archiver::from_path(session, "traj_vision.csv")
        .wrap_err("Failed to initialise the TrajVisionCmd archive")?;

    // ---- MAIN LOOP ----

    info!("Begining main loop\n");

    let mut timer = CycleTimer::new(exec_params);
    let mut num_cycles: u64 = 0;

    while !runner.is_terminated() {
        let cycle_start = Instant::now();
        let now_s = drive.borrow().time_s();

        // ---- VISION INPUT ----

        for batch in inbox.drain() {
            let result = processor.process_data(
                &batch,
                &*drive.borrow(),
                sim_params.elevator_height_m,
                &mut targets,
            );
            match result {
                Ok(r) => trace!("Vision batch processed: {:?}", r),
                Err(e) => warn!("Could not process vision batch: {}", e),
            }
        }

        let robot_pose = drive.borrow().robot_position();
        targets.update(now_s, &robot_pose);

        // ---- COMMAND PROCESSING ----

        runner.step().wrap_err("TrajVisionCmd failed")?;

        // ---- WRITE ARCHIVES ----

        if let Err(e) = cmd_arch.serialise(runner.command().report()) {
            warn!("Could not write TrajVisionCmd archive: {}", e);
        }
        if let Err(e) = drive.borrow_mut().write() {
            warn!("Could not write drive archive: {}", e);
        }

        // ---- SIMULATION ----

        drive.borrow_mut().step(exec_params.cycle_period_s);

        if num_cycles % exec_params.vision_period_cycles.max(1) == 0 {
            let d = drive.borrow();
            sim_server.send_pose(d.time_s(), d.robot_position());
        }

        // ---- CYCLE MANAGEMENT ----

        timer.wait(cycle_start)?;
        num_cycles += 1;
    }

    sim_server.stop();

    info!(
        "TrajVisionCmd complete after {} cycles, {} vision corrected",
        num_cycles,
        runner.command().num_corrected_cycles()
    );

    Ok(())
}

/// Replay a driver input recording through the teleop command.
fn run_teleop(
    exec_params: &BotExecParams,
    recording: PathBuf,
    drive: &Rc<RefCell<SimDrivetrain>>,
    dashboard: &Rc<RefCell<Dashboard>>,
) -> Result<(), Report> {
    let teleop_params: TeleopParams = util::params::load("teleop.toml")
        .wrap_err("Could not load teleop params")?;

    let frames = input::load_recording(&recording)
        .wrap_err("Could not load the input recording")?;
    info!("Loaded {} input frames from {:?}", frames.len(), recording);

    // Bind the sources to the frame currently being replayed
    let frame = Rc::new(Cell::new(InputFrame::default()));
    let (f_speed, f_rot, f_qt) = (frame.clone(), frame.clone(), frame.clone());

    let cmd = TeleopCmd::new(
        teleop_params,
        drive.clone(),
        Box::new(move || f_speed.get().speed_y),
        Box::new(move || f_rot.get().rotation_x),
        Box::new(move || f_qt.get().quick_turn),
    );
    let mut runner = CommandRunner::new("TeleopCmd", cmd);

    info!("Begining main loop\n");

    let mut timer = CycleTimer::new(exec_params);

    for f in frames {
        let cycle_start = Instant::now();

        frame.set(f);
        runner.step().wrap_err("TeleopCmd failed")?;

        if let Err(e) = drive.borrow_mut().write() {
            warn!("Could not write drive archive: {}", e);
        }
        drive.borrow_mut().step(exec_params.cycle_period_s);

        timer.wait(cycle_start)?;
    }

    info!("End of recording reached, stopping");
    runner.cancel();

    let end = drive.borrow().robot_position();
    let mut dash = dashboard.borrow_mut();
    dash.put_number("endX", end.position_m[0]);
    dash.put_number("endY", end.position_m[1]);
    dash.put_number("endHeading", end.heading_rad);

    Ok(())
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl CycleTimer {
    fn new(params: &BotExecParams) -> Self {
        Self {
            period: Duration::from_secs_f64(params.cycle_period_s),
            num_consec_overruns: 0,
            max_consec_overruns: params.max_consec_overruns,
        }
    }

    /// Sleep until the end of the cycle which started at `cycle_start`.
    fn wait(&mut self, cycle_start: Instant) -> Result<(), Report> {
        let cycle_dur = Instant::now() - cycle_start;

        match self.period.checked_sub(cycle_dur) {
            Some(d) => {
                self.num_consec_overruns = 0;
                thread::sleep(d);
            }
            None => {
                warn!(
                    "Cycle overran by {:.06} s",
                    cycle_dur.as_secs_f64() - self.period.as_secs_f64()
                );
                self.num_consec_overruns += 1;

                if self.num_consec_overruns > self.max_consec_overruns {
                    return Err(color_eyre::eyre::eyre!(
                        "More than {} consecutive cycle overruns",
                        self.max_consec_overruns
                    ));
                }
            }
        }

        Ok(())
    }
}
