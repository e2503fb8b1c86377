//! Lifecycle signals emitted by the queue system.

use serde::{Deserialize, Serialize};

/// A phase of one job execution, as reported by the queue system.
///
/// `job_id` is optional throughout: some drivers do not expose an identifier,
/// and the monitor treats a missing one as "cannot correlate".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JobLifecycleEvent {
    /// A worker picked the job up and is about to run it.
    ProcessingStarted {
        job_id: Option<String>,
        display_name: String,
        queue: String,
        attempts: Option<u32>,
        payload: serde_json::Value,
    },
    /// The job finished without error.
    Processed { job_id: Option<String> },
    /// The job raised an error.
    Failed {
        job_id: Option<String>,
        exception_message: String,
    },
}

impl JobLifecycleEvent {
    pub fn processing_started(
        job_id: impl Into<String>,
        display_name: impl Into<String>,
        queue: impl Into<String>,
        attempts: u32,
        payload: serde_json::Value,
    ) -> Self {
        Self::ProcessingStarted {
            job_id: Some(job_id.into()),
            display_name: display_name.into(),
            queue: queue.into(),
            attempts: Some(attempts),
            payload,
        }
    }

    pub fn processed(job_id: impl Into<String>) -> Self {
        Self::Processed {
            job_id: Some(job_id.into()),
        }
    }

    pub fn failed(job_id: impl Into<String>, exception_message: impl Into<String>) -> Self {
        Self::Failed {
            job_id: Some(job_id.into()),
            exception_message: exception_message.into(),
        }
    }

    pub fn job_id(&self) -> Option<&str> {
        match self {
            JobLifecycleEvent::ProcessingStarted { job_id, .. }
            | JobLifecycleEvent::Processed { job_id }
            | JobLifecycleEvent::Failed { job_id, .. } => job_id.as_deref(),
        }
    }

    /// Short name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            JobLifecycleEvent::ProcessingStarted { .. } => "processing_started",
            JobLifecycleEvent::Processed { .. } => "processed",
            JobLifecycleEvent::Failed { .. } => "failed",
        }
    }
}
