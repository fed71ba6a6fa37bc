//! Error types for the registration bot.

use std::time::Duration;

use crate::registration::step::{AnswerKey, Step};

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Primary store and session store errors.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection pool error: {0}")]
    Pool(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Operation {operation} timed out after {timeout:?}")]
    Timeout {
        operation: &'static str,
        timeout: Duration,
    },
}

/// Channel-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("Channel {name} failed to start: {reason}")]
    StartupFailed { name: String, reason: String },

    #[error("Failed to send response on channel {name}: {reason}")]
    SendFailed { name: String, reason: String },

    #[error("Invalid message format: {0}")]
    InvalidMessage(String),
}

/// Secondary tabular store (spreadsheet mirror) errors.
#[derive(Debug, thiserror::Error)]
pub enum MirrorError {
    #[error("Spreadsheet request failed: {0}")]
    Http(String),

    #[error("Spreadsheet API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("Invalid spreadsheet response: {0}")]
    InvalidResponse(String),

    #[error("Spreadsheet unavailable: {0}")]
    Unavailable(String),

    #[error("Spreadsheet operation timed out after {0:?}")]
    Timeout(Duration),
}

/// A registration record could not be assembled from a session.
///
/// These indicate a defect in the step graph rather than bad user input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BuildError {
    #[error("Session is at step {step}, not the terminal step")]
    NotTerminal { step: Step },

    #[error("Required answer {key} is missing")]
    MissingAnswer { key: AnswerKey },

    #[error("Answer {key} has an unexpected value")]
    InvalidAnswer { key: AnswerKey },

    #[error("Flag {flag} is set but {year} is absent")]
    YearMismatch { flag: AnswerKey, year: AnswerKey },
}
