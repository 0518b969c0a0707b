use std::path::PathBuf;
use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },

    #[error("{field} must be an integer >= 0, got {value}")]
    Negative { field: &'static str, value: i64 },

    #[error("minimum wait time {min} exceeds maximum {max}")]
    WaitTimeRange { min: u64, max: u64 },

    #[error("unknown log level {0:?}")]
    UnknownLevel(String),

    #[error("unknown llm provider {0:?}")]
    UnknownProvider(String),

    #[error("{field} is not a valid http(s) url: {reason}")]
    InvalidUrl { field: &'static str, reason: String },

    #[error("malformed {what}: {reason}")]
    Malformed { what: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConflictError {
    #[error("robot {0} does not exist")]
    RobotNotFound(usize),

    #[error("robot {robot_index} has no user {phone}")]
    RecipientNotFound { robot_index: usize, phone: String },

    #[error("user {phone} of robot {robot_index} has no keyword {keyword:?}")]
    KeywordNotFound {
        robot_index: usize,
        phone: String,
        keyword: String,
    },

    #[error("robot {robot_index} already has user {phone}")]
    DuplicatePhone { robot_index: usize, phone: String },

    #[error("user {phone} of robot {robot_index} already has keyword {keyword:?}")]
    DuplicateKeyword {
        robot_index: usize,
        phone: String,
        keyword: String,
    },
}

/// The durable write of an already validated state failed.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("failed to encode configuration: {0}")]
    Encode(#[from] toml::ser::Error),

    #[error("failed to {action} {}: {source}", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("storage did not respond within {0:?}")]
    TimedOut(Duration),

    #[error("writer task aborted: {0}")]
    Aborted(String),
}

/// Failure of one Update Service operation. Nothing was written.
#[derive(Debug, Error)]
pub enum UpdateError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Conflict(#[from] ConflictError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    Validation,
    Conflict,
    Persistence,
}

impl UpdateError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            UpdateError::Validation(_) => ErrorKind::Validation,
            UpdateError::Conflict(_) => ErrorKind::Conflict,
            UpdateError::Persistence(_) => ErrorKind::Persistence,
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("{} is inconsistent: {reason}", path.display())]
    Invalid { path: PathBuf, reason: String },

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}
