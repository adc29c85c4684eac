//! # Logger
//!
//! Sets up the `log` facade for an executable. Records go to stdout with coloured level tags and
//! to the session's log file with plain tags, both stamped with the seconds elapsed since the
//! session epoch.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use colored::{ColoredString, Colorize};
use log::{info, Level, Record};
use thiserror::Error;

use crate::session::{self, Session};

pub use log::LevelFilter;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum LoggerInitError {
    #[error("The minimum log level must include INFO, found `{0}`")]
    InvalidMinLogLevel(LevelFilter),

    #[error("Could not open the session log file: {0}")]
    LogFileInitError(std::io::Error),

    #[error("A logger has already been set: {0}")]
    FernInitError(log::SetLoggerError),
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Initialise the logger for this execution.
///
/// `min_level` must include `Info`. Only the first call in a process succeeds.
pub fn logger_init(min_level: LevelFilter, session: &Session) -> Result<(), LoggerInitError> {
    if min_level < Level::Info {
        return Err(LoggerInitError::InvalidMinLogLevel(min_level));
    }

    let log_file = fern::log_file(&session.log_file_path)
        .map_err(LoggerInitError::LogFileInitError)?;

    let stdout = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{}",
                format_record(session::get_elapsed_seconds(), level_tag(record.level()), record, message)
            ))
        })
        .chain(std::io::stdout());

    let file = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{}",
                format_record(session::get_elapsed_seconds(), plain_level_tag(record.level()), record, message)
            ))
        })
        .chain(log_file);

    fern::Dispatch::new()
        .level(min_level)
        // Per-cycle command traces are only wanted when explicitly asked for
        .level_for("bot_lib::cmd", min_level.min(LevelFilter::Debug))
        .chain(stdout)
        .chain(file)
        .apply()
        .map_err(LoggerInitError::FernInitError)?;

    info!("Logging initialised");
    info!("    Session epoch: {}", session::get_epoch());
    info!("    Log level: {:?}", min_level);
    info!("    Log file path: {:?}", session.log_file_path);

    Ok(())
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Build one log line. Debug and trace records also name their target module.
fn format_record<T: std::fmt::Display>(
    elapsed_s: f64,
    tag: T,
    record: &Record,
    message: &std::fmt::Arguments,
) -> String {
    if record.level() > Level::Info {
        format!("[{:10.6} {}] {}: {}", elapsed_s, tag, record.target(), message)
    }
    else {
        format!("[{:10.6} {}] {}", elapsed_s, tag, message)
    }
}

fn plain_level_tag(level: Level) -> &'static str {
    match level {
        Level::Trace => "TRC",
        Level::Debug => "DBG",
        Level::Info => "INF",
        Level::Warn => "WRN",
        Level::Error => "ERR",
    }
}

fn level_tag(level: Level) -> ColoredString {
    let tag = plain_level_tag(level);
    match level {
        Level::Trace => tag.dimmed().italic(),
        Level::Debug => tag.dimmed(),
        Level::Info => tag.normal(),
        Level::Warn => tag.yellow(),
        Level::Error => tag.red().bold(),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_format_record() {
        let info = Record::builder()
            .level(Level::Info)
            .target("bot_lib::cmd::traj_vision")
            .build();
        let line = format_record(1.5, plain_level_tag(Level::Info), &info, &format_args!("Vision target acquired"));
        assert_eq!(line, "[  1.500000 INF] Vision target acquired");

        let trace = Record::builder()
            .level(Level::Trace)
            .target("bot_lib::cmd::traj_vision")
            .build();
        let line = format_record(0.02, plain_level_tag(Level::Trace), &trace, &format_args!("turn {}", 1));
        assert_eq!(line, "[  0.020000 TRC] bot_lib::cmd::traj_vision: turn 1");
    }

    #[test]
    fn test_level_tags() {
        for level in [Level::Error, Level::Warn, Level::Info, Level::Debug, Level::Trace].iter() {
            assert_eq!(plain_level_tag(*level).len(), 3);
            assert!(level_tag(*level).to_string().contains(plain_level_tag(*level)));
        }
    }
}
