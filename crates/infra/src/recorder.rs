//! History recorder: turns lifecycle signals into history rows.
//!
//! Handlers never fail and never panic. Each one delegates to a
//! `Result`-returning operation and logs the error branch, so a storage
//! outage shows up in the logs and never in the job being tracked.

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, error, warn};

use jobwatch_core::{JobHistoryId, JobHistoryRecord, JobPayload, NewJobHistory, Progress};
use jobwatch_events::JobLifecycleEvent;

use crate::filter::TrackingFilter;
use crate::progress;
use crate::store::{HistoryUpdate, JobHistoryStore, StoreError};

/// Records job executions into a [`JobHistoryStore`].
///
/// Cheap to clone; clones share the store.
#[derive(Clone)]
pub struct HistoryRecorder {
    store: Arc<dyn JobHistoryStore>,
    filter: TrackingFilter,
}

impl core::fmt::Debug for HistoryRecorder {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("HistoryRecorder")
            .field("filter", &self.filter)
            .finish_non_exhaustive()
    }
}

impl HistoryRecorder {
    pub fn new(store: Arc<dyn JobHistoryStore>, filter: TrackingFilter) -> Self {
        Self { store, filter }
    }

    pub fn filter(&self) -> &TrackingFilter {
        &self.filter
    }

    /// Dispatch a lifecycle signal to the matching handler.
    pub async fn handle(&self, event: JobLifecycleEvent) {
        match event {
            JobLifecycleEvent::ProcessingStarted {
                job_id,
                display_name,
                queue,
                attempts,
                payload,
            } => {
                self.on_processing_started(job_id, &display_name, &queue, attempts, Some(payload))
                    .await
            }
            JobLifecycleEvent::Processed { job_id } => self.on_processed(job_id.as_deref()).await,
            JobLifecycleEvent::Failed {
                job_id,
                exception_message,
            } => self.on_failed(job_id.as_deref(), &exception_message).await,
        }
    }

    /// A worker started executing a job.
    ///
    /// A blank payload (`null`, `{}`, `[]`) is stored as no payload.
    pub async fn on_processing_started(
        &self,
        job_id: Option<String>,
        job_class: &str,
        queue: &str,
        attempt: Option<u32>,
        payload: Option<Value>,
    ) {
        if !self.filter.should_track(job_class, queue) {
            debug!(job_class, queue, "job not tracked");
            return;
        }

        let payload = payload.filter(|p| !JobPayload::is_blank(p));
        let new = NewJobHistory::processing(
            job_id,
            job_class,
            queue,
            attempt.unwrap_or(1),
            payload,
            Utc::now(),
        );

        match self.record_start(new).await {
            Ok(record) => {
                debug!(id = %record.id, job_id = ?record.job_id, job_class, queue, "job history started")
            }
            Err(err) => error!(job_class, queue, error = %err, "failed to record job start"),
        }
    }

    /// The job finished without error.
    pub async fn on_processed(&self, job_id: Option<&str>) {
        let Some(job_id) = job_id else {
            debug!("processed signal without job id ignored");
            return;
        };

        let update = HistoryUpdate::Completed { at: Utc::now() };
        match self.apply(job_id, update).await {
            Ok(Some(id)) => debug!(%id, job_id, "job history completed"),
            Ok(None) => debug!(job_id, "no live history row for completed job"),
            Err(err) => error!(job_id, error = %err, "failed to record job completion"),
        }
    }

    /// The job raised an error.
    pub async fn on_failed(&self, job_id: Option<&str>, error_message: &str) {
        let Some(job_id) = job_id else {
            debug!("failed signal without job id ignored");
            return;
        };

        let update = HistoryUpdate::Failed {
            error_message: error_message.to_string(),
            at: Utc::now(),
        };
        match self.apply(job_id, update).await {
            Ok(Some(id)) => debug!(%id, job_id, "job history failed"),
            Ok(None) => debug!(job_id, "no live history row for failed job"),
            Err(err) => error!(job_id, error = %err, "failed to record job failure"),
        }
    }

    /// Report progress for the job executing on the current task.
    ///
    /// The percentage is clamped to `0..=100`. Outside a
    /// [`progress::scope`] this does nothing.
    pub async fn update_progress(&self, percentage: i64) {
        let Some(job_id) = progress::current_job_id() else {
            debug!(percentage, "progress reported outside a job context");
            return;
        };

        let update = HistoryUpdate::Progress(Progress::clamped(percentage));
        match self.apply(&job_id, update).await {
            Ok(_) => {}
            Err(err) => warn!(job_id, percentage, error = %err, "failed to record job progress"),
        }
    }

    /// Alias of [`update_progress`](Self::update_progress) for job bodies.
    pub async fn queue_progress(&self, percentage: i64) {
        self.update_progress(percentage).await
    }

    async fn record_start(&self, new: NewJobHistory) -> Result<JobHistoryRecord, StoreError> {
        self.store.insert(new).await
    }

    async fn apply(
        &self,
        job_id: &str,
        update: HistoryUpdate,
    ) -> Result<Option<JobHistoryId>, StoreError> {
        self.store.update_live(job_id, update).await
    }
}
