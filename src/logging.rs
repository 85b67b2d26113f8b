//! Logging setup and configuration.

use tracing_appender::rolling::RollingFileAppender;
use tracing_appender::rolling::Rotation;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::LogConfig;
use crate::error::AppError;

/// Stream that receives console log output.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Console {
    Stdout,
    /// Leaves stdout to the program's own output, as `send-alerts` prints JSON there.
    Stderr,
}

/// Sets up logging with console output and daily rolling files in `config.path`.
pub fn setup_logging(config: &LogConfig, console: Console) -> Result<(), AppError> {
    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("deadline-alerts")
        .filename_suffix("log")
        .max_log_files(config.retention_days.max(1))
        .build(&config.path)
        .map_err(|e| AppError::ConfigurationError {
            msg: format!(
                "Failed to initialize rolling file appender at '{}': {}",
                config.path.to_string_lossy(),
                e
            ),
        })?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // Keep the writer alive for the whole process
    std::mem::forget(guard);

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directives(config.level)))
        .map_err(|e| AppError::ConfigurationError {
            msg: format!("Invalid log filter: {e}"),
        })?;

    let (console_writer, ansi) = match console {
        Console::Stdout => (BoxMakeWriter::new(std::io::stdout), true),
        Console::Stderr => (BoxMakeWriter::new(std::io::stderr), false),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(console_writer).with_ansi(ansi))
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .try_init()
        .map_err(|e| AppError::ConfigurationError {
            msg: format!("Failed to install tracing subscriber: {e}"),
        })?;

    Ok(())
}

/// Filter used when `RUST_LOG` is unset. Covers this crate and its binaries at
/// `level` and keeps sqlx at warn.
fn default_directives(level: LevelFilter) -> String {
    format!("deadline_alerts={level},send_alerts={level},sqlx=warn")
}
