//! Generic logger utility functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use colored::{ColoredString, Colorize};
use fern;
use log::{self, info};
use std::collections::BTreeMap;
use std::str::FromStr;
use thiserror::Error;

// Internal imports
use crate::session;

// Re-exports
pub use log::LevelFilter;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors associated with initialising the logger.
#[derive(Debug, Error)]
pub enum LoggerInitError {
    #[error("Expected a log level at least as verbose as `INFO`, found `{0}`")]
    InvalidMinLogLevel(log::LevelFilter),

    #[error("Error initialising the log file: {0}")]
    LogFileInitError(std::io::Error),

    #[error("An error occured while setting up the logger: {0}")]
    FernInitError(log::SetLoggerError),

    #[error("Invalid log level `{level}` for target `{target}`")]
    InvalidTargetLevel { target: String, level: String },
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Initialise the logger for this execution.
///
/// Log lines are written both to stdout and to the session's log file. Lines
/// at debug and trace level also include the record's target so that the
/// module producing the message can be identified.
///
/// `target_levels` override `min_level` for individual targets (module paths), so that noisy
/// threads such as the solver worker can be quietened without losing the rest of the log.
///
/// # Notes
///
/// - `min_level` must be at least as verbose as `log::Level::Info`.
///
/// # Safety
///
/// - This function must only be called once to prevent corrupting logs.
pub fn logger_init(
    min_level: self::LevelFilter,
    target_levels: &[(String, LevelFilter)],
    session: &session::Session,
) -> Result<(), LoggerInitError> {
    if min_level < log::Level::Info {
        return Err(LoggerInitError::InvalidMinLogLevel(min_level));
    }

    let log_file = fern::log_file(session.log_file_path.clone())
        .map_err(LoggerInitError::LogFileInitError)?;

    // Setup the logger using fern's builder pattern
    let mut dispatch = fern::Dispatch::new()
        .format(|out, message, record| {
            // If debug or trace include the target, otherwise don't include it
            if record.level() > log::Level::Info {
                out.finish(format_args!(
                    "[{:10.6} {}] {}: {}",
                    session::get_elapsed_seconds(),
                    level_to_str(record.level()),
                    record.target(),
                    message
                ))
            } else {
                out.finish(format_args!(
                    "[{:10.6} {}] {}",
                    session::get_elapsed_seconds(),
                    level_to_str(record.level()),
                    message
                ))
            }
        })
        .level(min_level);

    for (target, level) in target_levels {
        dispatch = dispatch.level_for(target.clone(), *level);
    }

    dispatch
        .chain(std::io::stdout())
        .chain(log_file)
        .apply()
        .map_err(LoggerInitError::FernInitError)?;

    info!("Logging initialised");
    info!("    Session epoch: {}", session::get_epoch());
    info!("    Log level: {:?}", min_level);
    info!("    Log file path: {:?}", session.log_file_path);
    for (target, level) in target_levels {
        info!("    Log level for {}: {:?}", target, level);
    }

    Ok(())
}

/// Parse per-target level overrides from a parameter table, for example
/// `"plan_lib::solver::worker" = "info"`.
pub fn parse_target_levels(
    levels: &BTreeMap<String, String>,
) -> Result<Vec<(String, LevelFilter)>, LoggerInitError> {
    levels
        .iter()
        .map(|(target, level)| {
            LevelFilter::from_str(level)
                .map(|l| (target.clone(), l))
                .map_err(|_| LoggerInitError::InvalidTargetLevel {
                    target: target.clone(),
                    level: level.clone(),
                })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Get the string representation of a log level
fn level_to_str(level: log::Level) -> ColoredString {
    match level {
        log::Level::Trace => "TRC".dimmed().italic(),
        log::Level::Debug => "DBG".dimmed(),
        log::Level::Info => "INF".normal(),
        log::Level::Warn => "WRN".yellow(),
        log::Level::Error => "ERR".red().bold(),
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_target_levels() {
        let mut levels = BTreeMap::new();
        levels.insert("plan_lib::solver::worker".to_string(), "info".to_string());
        levels.insert("plan_lib::env::watch".to_string(), "WARN".to_string());

        let parsed = parse_target_levels(&levels).unwrap();
        assert_eq!(
            parsed,
            vec![
                ("plan_lib::env::watch".to_string(), LevelFilter::Warn),
                ("plan_lib::solver::worker".to_string(), LevelFilter::Info),
            ]
        );

        levels.insert("plan_lib::coord".to_string(), "loud".to_string());
        assert!(matches!(
            parse_target_levels(&levels),
            Err(LoggerInitError::InvalidTargetLevel { target, .. }) if target == "plan_lib::coord"
        ));
    }
}
