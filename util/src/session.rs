//! Session management
//!
//! A session is one run of an executable. It owns a timestamped directory holding the log file,
//! the CSV archives and any JSON snapshots saved during the run.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use chrono::{DateTime, Utc};
use conquer_once::OnceCell;
use log::warn;
use serde::Serialize;
use std::fs;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use thiserror::Error;

// Internal imports
use crate::time;

// ---------------------------------------------------------------------------
// STATICS
// ---------------------------------------------------------------------------

static SESSION_EPOCH: OnceCell<DateTime<Utc>> = OnceCell::uninit();

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// A chrono format string which diplays a timestamp. See
/// https://docs.rs/chrono/0.4.11/chrono/format/strftime/index.html for more
/// information.
const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A struct storing information about the current session
#[derive(Clone, Debug)]
pub struct Session {
    /// The root directory for this session
    pub session_root: PathBuf,

    /// The root directory for this session's archives
    pub arch_root: PathBuf,

    /// The path to the session's log file
    pub log_file_path: PathBuf,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors associated with the session module.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("The software root environment variable (BOT_SW_ROOT) is not set")]
    SwRootNotSet,

    #[error("Cannot create the session directory: {0}")]
    CannotCreateDir(std::io::Error),

    #[error(
        "Cannot initialise the session epoch, have you already initialised the \
         session? (conquer_once error: {0})"
    )]
    CannotInitEpoch(conquer_once::TryInitError),

    #[error("Cannot get the epoch time, did you forget to initialise the session?")]
    CannotGetEpoch,

    #[error("Cannot write session file {0:?}: {1}")]
    WriteError(PathBuf, std::io::Error),

    #[error("Cannot serialise data for session file {0:?}: {1}")]
    SerialiseError(PathBuf, serde_json::Error),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Session {
    /// Start a new session within the given directory.
    ///
    /// This will create a new session directory named `{exec_name}_{timestamp}` inside
    /// `$BOT_SW_ROOT/{sessions_dir}`.
    pub fn new(exec_name: &str, sessions_dir: &str) -> Result<Self, SessionError> {
        let root = crate::host::get_sw_root().map_err(|_| SessionError::SwRootNotSet)?;

        Self::new_in(root.join(sessions_dir), exec_name)
    }

    /// Start a new session inside an explicit parent directory.
    pub fn new_in<P: AsRef<Path>>(parent: P, exec_name: &str) -> Result<Self, SessionError> {
        // Set the session epoch
        SESSION_EPOCH
            .try_init_once(Utc::now)
            .map_err(SessionError::CannotInitEpoch)?;

        // Format the session epoch as a timestamp
        let timestamp = SESSION_EPOCH
            .get()
            .ok_or(SessionError::CannotGetEpoch)?
            .format(TIMESTAMP_FORMAT);

        let path = parent.as_ref().join(format!("{}_{}", exec_name, timestamp));
        let arch_path = path.join("arch");

        // Creating the archive dir creates the session root too
        fs::create_dir_all(&arch_path).map_err(SessionError::CannotCreateDir)?;

        let log_file_path = path.join(format!("{}.log", exec_name));

        Ok(Session {
            session_root: path,
            arch_root: arch_path,
            log_file_path,
        })
    }

    /// Saves the given data as pretty JSON to the given session-relative path.
    ///
    /// Parent directories are created as required.
    pub fn save<P: AsRef<Path>, T: Serialize>(&self, path: P, data: &T) -> Result<(), SessionError> {
        let full_path = self.session_root.join(path);

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| SessionError::WriteError(full_path.clone(), e))?;
        }

        let file = OpenOptions::new()
            .write(true)
            .truncate(true)
            .create(true)
            .open(&full_path)
            .map_err(|e| SessionError::WriteError(full_path.clone(), e))?;

        serde_json::to_writer_pretty(&file, data)
            .map_err(|e| SessionError::SerialiseError(full_path.clone(), e))
    }

    /// Save data without propagating errors, a warning is logged instead.
    pub fn save_or_warn<P: AsRef<Path>, T: Serialize>(&self, path: P, data: &T) {
        if let Err(e) = self.save(path.as_ref(), data) {
            warn!("Could not save {:?}: {}", path.as_ref(), e);
        }
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Get the number of seconds elapsed since the start of the session.
///
/// Returns `0.0` if no session has been started yet, so that code which timestamps records can
/// run in unit tests without a session.
pub fn get_elapsed_seconds() -> f64 {
    match SESSION_EPOCH.get() {
        Some(e) => time::duration_to_seconds(Utc::now() - *e).unwrap_or(std::f64::NAN),
        None => 0.0,
    }
}

/// Return a reference to the session's epoch.
///
/// # Panics
/// - This function will panic if the session epoch has not been
///   initialised, which is performed on creating a new Session instance.
pub fn get_epoch() -> &'static DateTime<Utc> {
    match SESSION_EPOCH.get() {
        Some(e) => e,
        None => panic!("Cannot get the session epoch!"),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::archive::Archiver;

    #[derive(Serialize)]
    struct Row {
        time_s: f64,
        value: u32,
    }

    // The epoch can only be set once per process, so this is the only test creating a session.
    #[test]
    fn test_session_save_and_archive() {
        let parent = std::env::temp_dir().join(format!("bot_session_test_{}", std::process::id()));
        let session = Session::new_in(&parent, "test_exec").unwrap();

        assert!(session.arch_root.is_dir());
        assert!(session.arch_root.starts_with(&session.session_root));
        assert!(get_elapsed_seconds() >= 0.0);

        session.save("snap/data.json", &vec![1, 2, 3]).unwrap();
        let s = fs::read_to_string(session.session_root.join("snap/data.json")).unwrap();
        let v: Vec<u32> = serde_json::from_str(&s).unwrap();
        assert_eq!(v, vec![1, 2, 3]);

        let mut arch = Archiver::from_path(&session, "rows.csv").unwrap();
        arch.serialise(Row { time_s: 0.5, value: 7 }).unwrap();
        let csv = fs::read_to_string(session.arch_root.join("rows.csv")).unwrap();
        assert_eq!(csv, "time_s,value\n0.5,7\n");

        // A second session in the same process is refused
        assert!(matches!(
            Session::new_in(&parent, "test_exec"),
            Err(SessionError::CannotInitEpoch(_))
        ));

        fs::remove_dir_all(&parent).ok();
    }
}
