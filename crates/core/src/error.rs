//! Job monitor error model.

use thiserror::Error;

use crate::id::JobHistoryId;

/// Result type used across the monitor's query and retry paths.
pub type MonitorResult<T> = Result<T, MonitorError>;

/// Monitor-level error.
///
/// Tracking writes never surface these to the job being tracked; they are
/// returned only from the query/retry path, where the transport maps each
/// variant to a structured response.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MonitorError {
    /// The requested history record does not exist.
    #[error("job history not found: {0}")]
    NotFound(JobHistoryId),

    /// The stored job class has no registered decoder.
    #[error("Job class not found: {0}")]
    JobClassNotFound(String),

    /// The record is not in a state that allows the requested action.
    #[error("{0}")]
    InvalidState(String),

    /// Decoding or re-submitting a stored job failed.
    #[error("Failed to retry job: {0}")]
    RetryFailed(String),

    /// The history store could not complete the operation.
    #[error("storage error: {0}")]
    Storage(String),

    /// An identifier could not be parsed.
    #[error("invalid identifier: {0}")]
    InvalidId(String),
}

impl MonitorError {
    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    pub fn retry_failed(msg: impl Into<String>) -> Self {
        Self::RetryFailed(msg.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }
}
