//! # Command runner
//!
//! Drives a single [`Command`] through its lifecycle on the control loop, and guarantees that the
//! command is disposed of exactly once however it terminates.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::{debug, info, warn};
use util::module::Command;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Lifecycle owner for a command.
///
/// The command is initialised on the first call to [`CommandRunner::step`] and executed in the
/// same cycle. Once the command finishes, fails, or is cancelled it is disposed of. Dropping the
/// runner while the command is running, including while unwinding from a panic, also disposes
/// of it.
pub struct CommandRunner<C: Command> {
    name: String,

    command: C,

    state: RunnerState,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RunnerState {
    /// Not yet initialised
    Idle,

    /// Initialised and being executed every cycle
    Running,

    /// Disposed of, no further processing will occur
    Terminated(Termination),
}

/// The reason a command stopped.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Termination {
    Finished,
    Cancelled,
    Failed,
    Dropped,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<C: Command> CommandRunner<C> {
    pub fn new(name: &str, command: C) -> Self {
        Self {
            name: name.to_string(),
            command,
            state: RunnerState::Idle,
        }
    }

    pub fn state(&self) -> RunnerState {
        self.state
    }

    pub fn is_terminated(&self) -> bool {
        matches!(self.state, RunnerState::Terminated(_))
    }

    pub fn command(&self) -> &C {
        &self.command
    }

    pub fn command_mut(&mut self) -> &mut C {
        &mut self.command
    }

    /// Run one cycle of the command.
    ///
    /// Errors from the command are returned after the command has been disposed of. Stepping a
    /// terminated runner does nothing.
    pub fn step(&mut self) -> Result<RunnerState, C::Error> {
        if self.state == RunnerState::Idle {
            info!("Starting {}", self.name);
            if let Err(e) = self.command.initialize() {
                self.terminate(Termination::Failed);
                return Err(e);
            }
            self.state = RunnerState::Running;
        }

        if self.state != RunnerState::Running {
            return Ok(self.state);
        }

        if let Err(e) = self.command.execute() {
            self.terminate(Termination::Failed);
            return Err(e);
        }

        if self.command.is_finished() {
            self.terminate(Termination::Finished);
        }

        Ok(self.state)
    }

    /// Cancel the command.
    ///
    /// A command that was never initialised is not disposed of, as it holds nothing to release.
    pub fn cancel(&mut self) {
        match self.state {
            RunnerState::Idle => {
                debug!("{} cancelled before starting", self.name);
                self.state = RunnerState::Terminated(Termination::Cancelled);
            }
            RunnerState::Running => self.terminate(Termination::Cancelled),
            RunnerState::Terminated(_) => (),
        }
    }

    fn terminate(&mut self, reason: Termination) {
        match reason {
            Termination::Finished => info!("{} finished", self.name),
            Termination::Failed => warn!("{} failed, disposing", self.name),
            Termination::Cancelled | Termination::Dropped => {
                warn!("{} interrupted ({:?})", self.name, reason)
            }
        }

        self.command.dispose();
        self.state = RunnerState::Terminated(reason);
    }
}

impl<C: Command> Drop for CommandRunner<C> {
    fn drop(&mut self) {
        if self.state == RunnerState::Running {
            self.terminate(Termination::Dropped);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    /// Counts calls to each lifecycle function, fails execute on a chosen cycle.
    struct CountingCmd {
        calls: Rc<CallCounts>,
        fail_init: bool,
        fail_on: Option<u32>,
        finish_after: u32,
    }

    #[derive(Default)]
    struct CallCounts {
        init: Cell<u32>,
        exec: Cell<u32>,
        dispose: Cell<u32>,
    }

    impl Command for CountingCmd {
        type Error = String;

        fn initialize(&mut self) -> Result<(), String> {
            self.calls.init.set(self.calls.init.get() + 1);
            if self.fail_init {
                return Err("init".into());
            }
            Ok(())
        }

        fn execute(&mut self) -> Result<(), String> {
            self.calls.exec.set(self.calls.exec.get() + 1);
            if Some(self.calls.exec.get()) == self.fail_on {
                return Err("exec".into());
            }
            Ok(())
        }

        fn is_finished(&self) -> bool {
            self.calls.exec.get() >= self.finish_after
        }

        fn dispose(&mut self) {
            self.calls.dispose.set(self.calls.dispose.get() + 1);
        }
    }

    fn cmd(fail_init: bool, fail_on: Option<u32>, finish_after: u32) -> (CountingCmd, Rc<CallCounts>) {
        let calls = Rc::new(CallCounts::default());
        (
            CountingCmd { calls: calls.clone(), fail_init, fail_on, finish_after },
            calls,
        )
    }

    #[test]
    fn test_normal_completion() {
        let (c, calls) = cmd(false, None, 3);
        let mut runner = CommandRunner::new("test", c);

        assert_eq!(runner.step(), Ok(RunnerState::Running));
        assert_eq!(runner.step(), Ok(RunnerState::Running));
        assert_eq!(runner.step(), Ok(RunnerState::Terminated(Termination::Finished)));

        // Further steps and drop do nothing
        assert_eq!(runner.step(), Ok(RunnerState::Terminated(Termination::Finished)));
        runner.cancel();
        drop(runner);

        assert_eq!(calls.init.get(), 1);
        assert_eq!(calls.exec.get(), 3);
        assert_eq!(calls.dispose.get(), 1);
    }

    #[test]
    fn test_cancel_mid_run() {
        let (c, calls) = cmd(false, None, 100);
        let mut runner = CommandRunner::new("test", c);

        runner.step().unwrap();
        runner.step().unwrap();
        runner.cancel();
        runner.cancel();

        assert_eq!(runner.state(), RunnerState::Terminated(Termination::Cancelled));
        drop(runner);
        assert_eq!(calls.exec.get(), 2);
        assert_eq!(calls.dispose.get(), 1);
    }

    #[test]
    fn test_execute_error() {
        let (c, calls) = cmd(false, Some(2), 100);
        let mut runner = CommandRunner::new("test", c);

        assert!(runner.step().is_ok());
        assert_eq!(runner.step(), Err(String::from("exec")));
        assert_eq!(runner.state(), RunnerState::Terminated(Termination::Failed));
        assert!(runner.step().is_ok());

        drop(runner);
        assert_eq!(calls.exec.get(), 2);
        assert_eq!(calls.dispose.get(), 1);
    }

    #[test]
    fn test_init_error() {
        let (c, calls) = cmd(true, None, 100);
        let mut runner = CommandRunner::new("test", c);

        assert!(runner.step().is_err());
        assert!(runner.is_terminated());
        drop(runner);
        assert_eq!(calls.exec.get(), 0);
        assert_eq!(calls.dispose.get(), 1);
    }

    #[test]
    fn test_drop_while_running() {
        let (c, calls) = cmd(false, None, 100);
        {
            let mut runner = CommandRunner::new("test", c);
            runner.step().unwrap();
        }
        assert_eq!(calls.dispose.get(), 1);

        // Never started, nothing to dispose
        let (c, calls) = cmd(false, None, 100);
        drop(CommandRunner::new("test", c));
        assert_eq!(calls.init.get(), 0);
        assert_eq!(calls.dispose.get(), 0);
    }

    #[test]
    fn test_dispose_on_panic() {
        let (c, calls) = cmd(false, None, 100);

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let mut runner = CommandRunner::new("test", c);
            runner.step().unwrap();
            panic!("control loop fault");
        }));

        assert!(result.is_err());
        assert_eq!(calls.dispose.get(), 1);
    }
}
