//! Error types for ical2vdir.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that abort a sync run.
#[derive(Error, Debug)]
pub enum VdirError {
    #[error("ICS parse error: {0}")]
    IcsParse(String),

    #[error("Item has no UID")]
    MissingUid,

    #[error("UID cannot be used as a filename: {0:?}")]
    InvalidUid(String),

    #[error("RECURRENCE-ID is not a date or date-time: {0}")]
    InvalidRecurrenceId(String),

    #[error("Not a regular file: {}", .0.display())]
    NotAFile(PathBuf),

    #[error("Failed to move staged item to {}: {}", .path.display(), .source)]
    Persist {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for ical2vdir operations.
pub type VdirResult<T> = Result<T, VdirError>;
