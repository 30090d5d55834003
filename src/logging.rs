//! Structured logging setup, adapted from the teacher's `fern` dispatcher:
//! colored level names on stdout, a plain per-day log file, and a
//! `LOG_LEVEL` environment variable instead of a numeric verbosity count.

use colored::*;
use log::{Level, LevelFilter};
use std::fs;

/// Reads `LOG_LEVEL` (`debug|info|warn|error`); an unset or unrecognized
/// value defaults to `info` with a single warning once logging starts.
pub fn level_from_env() -> (LevelFilter, Option<String>) {
    match std::env::var("LOG_LEVEL") {
        Ok(raw) => match raw.to_ascii_lowercase().as_str() {
            "debug" => (LevelFilter::Debug, None),
            "info" => (LevelFilter::Info, None),
            "warn" => (LevelFilter::Warn, None),
            "error" => (LevelFilter::Error, None),
            _ => (
                LevelFilter::Info,
                Some(format!("unrecognized LOG_LEVEL {raw:?}, defaulting to info")),
            ),
        },
        Err(_) => (LevelFilter::Info, None),
    }
}

pub fn init_logger(app_name: impl AsRef<str>, log_root: impl AsRef<str>) -> Result<(), fern::InitError> {
    let (level, warning) = level_from_env();
    let log_root = log_root.as_ref().to_string();

    fs::create_dir_all(&log_root).expect("failed to create log directory");

    let stdout_dispatch = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{} [{}] [{}] {}",
                chrono::Utc::now().format("%Y-%m-%d %H:%M:%S"),
                match record.level() {
                    Level::Error => format!("{}", record.level()).red(),
                    Level::Warn => format!("{}", record.level()).yellow(),
                    Level::Info => format!("{}", record.level()).cyan(),
                    Level::Debug => format!("{}", record.level()).purple(),
                    Level::Trace => format!("{}", record.level()).normal(),
                },
                record.target(),
                message
            ))
        })
        .level(level)
        .level_for(app_name.as_ref().to_string(), level)
        .chain(std::io::stdout());

    let file_path = format!(
        "{}/{}.{}.log",
        log_root,
        app_name.as_ref(),
        chrono::Utc::now().format("%Y_%m_%d")
    );

    let file_dispatch = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{} [{}] [{}] {}",
                chrono::Utc::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.target(),
                message
            ))
        })
        .level(level)
        .chain(fern::log_file(file_path)?);

    fern::Dispatch::new()
        .chain(stdout_dispatch)
        .chain(file_dispatch)
        .apply()?;

    if let Some(warning) = warning {
        log::warn!("{warning}");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_level_defaults_to_info_with_warning() {
        std::env::set_var("LOG_LEVEL", "verbose");
        let (level, warning) = level_from_env();
        assert_eq!(level, LevelFilter::Info);
        assert!(warning.is_some());
        std::env::remove_var("LOG_LEVEL");
    }

    #[test]
    fn known_level_is_honored() {
        std::env::set_var("LOG_LEVEL", "debug");
        let (level, warning) = level_from_env();
        assert_eq!(level, LevelFilter::Debug);
        assert!(warning.is_none());
        std::env::remove_var("LOG_LEVEL");
    }
}
