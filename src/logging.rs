//! Tracing subscriber setup shared by both binaries.

use crate::config::{LogFormat, LoggingConfig};
use crate::error::{AppError, AppResult};
use std::fs::{File, OpenOptions};
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// Build the filter: `RUST_LOG` when set, otherwise the configured level.
pub fn env_filter(config: &LoggingConfig) -> AppResult<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(&config.level)
            .map_err(|e| AppError::Logging(format!("invalid level '{}': {e}", config.level))),
    }
}

fn open_log_file(config: &LoggingConfig) -> AppResult<Option<File>> {
    let Some(path) = &config.file else {
        return Ok(None);
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    Ok(Some(file))
}

/// Install the global subscriber, writing to the configured file or stderr.
pub fn init(config: &LoggingConfig) -> AppResult<()> {
    let filter = env_filter(config)?;
    match open_log_file(config)? {
        Some(file) => install(config.format, filter, Mutex::new(file), false),
        None => install(config.format, filter, std::io::stderr, true),
    }
}

/// Install a subscriber only when a log file is configured.
///
/// Used by the TUI, where anything written to stderr would corrupt the screen.
pub fn init_file_only(config: &LoggingConfig) -> AppResult<bool> {
    match open_log_file(config)? {
        Some(file) => {
            install(config.format, env_filter(config)?, Mutex::new(file), false)?;
            Ok(true)
        }
        None => Ok(false),
    }
}

fn install<W>(format: LogFormat, filter: EnvFilter, writer: W, ansi: bool) -> AppResult<()>
where
    W: for<'w> tracing_subscriber::fmt::MakeWriter<'w> + Send + Sync + 'static,
{
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(ansi)
        .with_thread_names(true);

    let result = match format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Compact => builder.compact().try_init(),
    };
    result.map_err(|e| AppError::Logging(e.to_string()))
}
