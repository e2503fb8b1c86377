//! Job history record and its state transitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::id::JobHistoryId;
use crate::progress::Progress;
use crate::status::JobStatus;

/// One tracked job execution attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobHistoryRecord {
    pub id: JobHistoryId,
    /// Queue-assigned job identifier; the correlation key for updates.
    pub job_id: Option<String>,
    pub job_class: String,
    pub queue: String,
    pub status: JobStatus,
    pub progress: Progress,
    pub attempt: u32,
    pub payload: Option<serde_json::Value>,
    pub error_message: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insert request for a new history row (the store assigns `id` and audit timestamps).
#[derive(Debug, Clone, PartialEq)]
pub struct NewJobHistory {
    pub job_id: Option<String>,
    pub job_class: String,
    pub queue: String,
    pub status: JobStatus,
    pub progress: Progress,
    pub attempt: u32,
    pub payload: Option<serde_json::Value>,
    pub started_at: Option<DateTime<Utc>>,
}

impl NewJobHistory {
    /// A row for a job a worker just started executing.
    ///
    /// `attempt` of zero is treated as unknown and stored as 1.
    pub fn processing(
        job_id: Option<String>,
        job_class: impl Into<String>,
        queue: impl Into<String>,
        attempt: u32,
        payload: Option<serde_json::Value>,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            job_id,
            job_class: job_class.into(),
            queue: queue.into(),
            status: JobStatus::Processing,
            progress: Progress::ZERO,
            attempt: attempt.max(1),
            payload,
            started_at: Some(started_at),
        }
    }

    /// Materialize the row as the store would persist it.
    pub fn into_record(self, id: JobHistoryId, now: DateTime<Utc>) -> JobHistoryRecord {
        JobHistoryRecord {
            id,
            job_id: self.job_id,
            job_class: self.job_class,
            queue: self.queue,
            status: self.status,
            progress: self.progress,
            attempt: self.attempt.max(1),
            payload: self.payload,
            error_message: None,
            started_at: self.started_at,
            finished_at: if self.status.is_finished() { Some(now) } else { None },
            created_at: now,
            updated_at: now,
        }
    }
}

impl JobHistoryRecord {
    /// Mark the execution as finished successfully.
    pub fn mark_completed(&mut self, now: DateTime<Utc>) {
        self.status = JobStatus::Completed;
        self.progress = Progress::COMPLETE;
        self.error_message = None;
        self.finished_at = Some(now);
        self.updated_at = now;
    }

    /// Mark the execution as failed with the given message.
    pub fn mark_failed(&mut self, error_message: impl Into<String>, now: DateTime<Utc>) {
        self.status = JobStatus::Failed;
        self.error_message = Some(error_message.into());
        self.finished_at = Some(now);
        self.updated_at = now;
    }

    pub fn set_progress(&mut self, progress: Progress, now: DateTime<Utc>) {
        self.progress = progress;
        self.updated_at = now;
    }

    /// Whole seconds between start and finish, when both are known.
    pub fn runtime_seconds(&self) -> Option<i64> {
        match (self.started_at, self.finished_at) {
            (Some(started), Some(finished)) => Some((finished - started).num_seconds()),
            _ => None,
        }
    }

    /// Whether this row is the live target for updates to `job_id`.
    pub fn is_live_for(&self, job_id: &str) -> bool {
        self.status == JobStatus::Processing && self.job_id.as_deref() == Some(job_id)
    }
}
