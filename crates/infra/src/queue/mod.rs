//! Queue submission seam used by retry.
//!
//! The monitor never executes jobs. It only hands a decoded job back to the
//! queue system, which assigns it a fresh identifier and runs it as a new
//! execution (with a new history row once a worker picks it up).

pub mod in_memory;
pub mod postgres;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

pub use in_memory::InMemoryJobQueue;
pub use postgres::PostgresJobQueue;

/// A job ready to be handed to the queue system.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmittedJob {
    pub job_class: String,
    pub queue: String,
    pub command: Value,
}

impl SubmittedJob {
    pub fn new(job_class: impl Into<String>, queue: impl Into<String>, command: Value) -> Self {
        Self {
            job_class: job_class.into(),
            queue: queue.into(),
            command,
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum QueueError {
    #[error("queue unavailable: {0}")]
    Unavailable(String),

    #[error("queue rejected job: {0}")]
    Rejected(String),
}

/// Something that accepts jobs for background execution.
#[async_trait::async_trait]
pub trait JobQueue: Send + Sync {
    /// Submit `job` and return the identifier the queue assigned to it.
    async fn submit(&self, job: SubmittedJob) -> Result<String, QueueError>;
}
