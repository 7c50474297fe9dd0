use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{InitError, RollingFileAppender, Rotation};
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Persistent daemon log, kept next to the dated daily log folders.
pub const LOG_FILE_NAME: &str = "system.log";

#[derive(Debug, thiserror::Error)]
pub enum LoggingError {
    #[error("failed to open system.log: {0}")]
    Appender(#[from] InitError),
    #[error("failed to install tracing subscriber: {0}")]
    Init(#[from] TryInitError),
}

/// Append-only `system.log` under `log_dir`. The directory is created if missing.
pub fn log_file_appender(log_dir: &Path) -> Result<RollingFileAppender, LoggingError> {
    let appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(LOG_FILE_NAME)
        .build(log_dir)?;
    Ok(appender)
}

/// Install the global subscriber: console output plus `log_dir/system.log`.
///
/// `RUST_LOG` overrides `level`. The returned guard flushes the file writer
/// on drop, so hold it for the life of the process.
pub fn init(log_dir: &Path, level: &str) -> Result<WorkerGuard, LoggingError> {
    let (file_writer, guard) = tracing_appender::non_blocking(log_file_appender(log_dir)?);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer())
        .with(fmt::layer().with_writer(file_writer).with_ansi(false))
        .try_init()?;
    Ok(guard)
}
