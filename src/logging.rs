//! Tracing subscriber setup shared by the binaries.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

use crate::error::ConfigError;

/// Install the global subscriber: stderr always, plus a daily rolling file
/// under `log_dir` when given. `RUST_LOG` overrides `default_filter`.
///
/// Keep the returned guard alive for the life of the process; dropping it
/// flushes and stops the file writer.
pub fn init(default_filter: &str, log_dir: Option<&Path>) -> Result<Option<WorkerGuard>, ConfigError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let stderr = fmt::layer().with_target(false).with_writer(std::io::stderr);

    let Some(dir) = log_dir else {
        tracing_subscriber::registry().with(filter).with(stderr).init();
        return Ok(None);
    };

    let appender = file_appender(dir)?;
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let file = fmt::layer()
        .with_target(false)
        .with_ansi(false)
        .with_writer(writer);

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr)
        .with(file)
        .init();
    Ok(Some(guard))
}

fn file_appender(dir: &Path) -> Result<RollingFileAppender, ConfigError> {
    std::fs::create_dir_all(dir)?;
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("registration-bot")
        .filename_suffix("log")
        .build(dir)
        .map_err(|e| ConfigError::InvalidValue {
            key: "REGBOT_LOG_DIR".into(),
            message: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_appender_creates_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("logs");
        file_appender(&dir).unwrap();
        assert!(dir.is_dir());
    }

    #[test]
    fn file_appender_rejects_a_file_path() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let err = file_appender(tmp.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
