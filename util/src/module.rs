//! Command interfaces
//!
//! Every command run by the executable's scheduler shall implement the [`Command`] trait. The
//! scheduler calls `initialize` once, then `execute` once per control cycle until `is_finished`
//! returns true or the command is cancelled, and finally `dispose` exactly once.

// ---------------------------------------------------------------------------
// COMMAND
// ---------------------------------------------------------------------------

/// A unit of work run on the fixed-period control loop.
pub trait Command {
    /// An error which can occur during initialisation or cyclic processing.
    type Error;

    /// Prepare the command to run. Called once before the first `execute`.
    ///
    /// # Outputs
    /// - On success `Ok(())`.
    /// - On error an `Error` instance, in which case `execute` is never called but `dispose`
    ///   still is.
    fn initialize(&mut self) -> Result<(), Self::Error>;

    /// Main cyclic processing function, called once per control cycle.
    ///
    /// Must not block, all work has to complete within the cycle period.
    fn execute(&mut self) -> Result<(), Self::Error>;

    /// Returns `true` once the command has nothing left to do.
    fn is_finished(&self) -> bool;

    /// Release any resources and leave actuators in a safe state.
    ///
    /// Called exactly once on every termination path, including cancellation and errors.
    fn dispose(&mut self);
}
