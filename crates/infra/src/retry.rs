//! Re-submission of failed jobs.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use jobwatch_core::{JobHistoryId, JobPayload, JobStatus, MonitorError, MonitorResult};

use crate::queue::JobQueue;
use crate::registry::{DecodeError, JobRegistry};
use crate::store::JobHistoryStore;

/// Successful retry acknowledgement.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RetryAck {
    pub success: bool,
    pub message: String,
    /// Identifier the queue assigned to the new submission.
    pub queue_job_id: String,
}

/// Re-submits failed jobs through the registry and queue.
///
/// A retry never touches the failed row and never creates one; the new
/// execution is recorded once a worker picks it up.
#[derive(Clone)]
pub struct RetryService {
    store: Arc<dyn JobHistoryStore>,
    registry: Arc<JobRegistry>,
    queue: Arc<dyn JobQueue>,
}

impl core::fmt::Debug for RetryService {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RetryService")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

impl RetryService {
    pub fn new(
        store: Arc<dyn JobHistoryStore>,
        registry: Arc<JobRegistry>,
        queue: Arc<dyn JobQueue>,
    ) -> Self {
        Self {
            store,
            registry,
            queue,
        }
    }

    pub async fn retry(&self, id: JobHistoryId) -> MonitorResult<RetryAck> {
        let record = self
            .store
            .get(id)
            .await?
            .ok_or(MonitorError::NotFound(id))?;

        if record.status != JobStatus::Failed {
            return Err(MonitorError::invalid_state("Only failed jobs can be retried"));
        }
        let Some(payload) = record.payload.as_ref().filter(|p| !JobPayload::is_blank(p)) else {
            return Err(MonitorError::invalid_state("Job payload not available for retry"));
        };
        if !self.registry.contains(&record.job_class) {
            return Err(MonitorError::JobClassNotFound(record.job_class));
        }

        let submitted = JobPayload::command_of(payload)
            .ok_or(DecodeError::MissingCommand)
            .and_then(|command| {
                self.registry
                    .decode(&record.job_class, command, &record.queue)
                    .unwrap_or_else(|| Err(DecodeError::Rejected("decoder vanished".into())))
            })
            .map_err(|err| {
                warn!(%id, job_class = %record.job_class, error = %err, "retry decode failed");
                MonitorError::retry_failed(err.to_string())
            })?;

        let queue_job_id = self.queue.submit(submitted).await.map_err(|err| {
            warn!(%id, job_class = %record.job_class, error = %err, "retry submission failed");
            MonitorError::retry_failed(err.to_string())
        })?;

        info!(%id, job_class = %record.job_class, queue = %record.queue, queue_job_id, "job re-queued");
        Ok(RetryAck {
            success: true,
            message: "Job successfully re-queued".to_string(),
            queue_job_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::InMemoryJobQueue;
    use crate::registry::TrackedJob;
    use crate::store::{HistoryUpdate, InMemoryHistoryStore};
    use chrono::Utc;
    use jobwatch_core::{JobHistoryRecord, NewJobHistory};
    use serde::Deserialize;
    use serde_json::{Value, json};

    #[derive(Debug, Serialize, Deserialize)]
    struct SendInvoice {
        invoice_id: u64,
    }

    impl TrackedJob for SendInvoice {
        const JOB_CLASS: &'static str = "SendInvoice";
    }

    struct Fixture {
        store: Arc<InMemoryHistoryStore>,
        queue: Arc<InMemoryJobQueue>,
        service: RetryService,
    }

    fn fixture() -> Fixture {
        let store = InMemoryHistoryStore::arc();
        let queue = Arc::new(InMemoryJobQueue::new());
        let mut registry = JobRegistry::new();
        registry.register::<SendInvoice>();
        let service = RetryService::new(store.clone(), Arc::new(registry), queue.clone());
        Fixture {
            store,
            queue,
            service,
        }
    }

    async fn failed_row(
        store: &InMemoryHistoryStore,
        job_class: &str,
        payload: Option<Value>,
    ) -> JobHistoryRecord {
        let row = store
            .insert(NewJobHistory::processing(
                Some("j1".into()),
                job_class,
                "mail",
                1,
                payload,
                Utc::now(),
            ))
            .await
            .unwrap();
        store
            .update_live(
                "j1",
                HistoryUpdate::Failed {
                    error_message: "boom".into(),
                    at: Utc::now(),
                },
            )
            .await
            .unwrap();
        row
    }

    #[tokio::test]
    async fn failed_job_is_submitted_exactly_once() {
        let f = fixture();
        let payload = JobPayload::new("SendInvoice", json!({"invoice_id": 7})).to_value();
        let row = failed_row(&f.store, "SendInvoice", Some(payload)).await;

        let ack = f.service.retry(row.id).await.unwrap();
        assert!(ack.success);
        assert_eq!(ack.message, "Job successfully re-queued");

        let submitted = f.queue.submitted();
        assert_eq!(submitted.len(), 1);
        assert_eq!(submitted[0].0, ack.queue_job_id);
        assert_eq!(submitted[0].1.job_class, "SendInvoice");
        assert_eq!(submitted[0].1.queue, "mail");
        assert_eq!(submitted[0].1.command, json!({"invoice_id": 7}));
        assert_eq!(f.store.len(), 1);
    }

    #[tokio::test]
    async fn completed_job_is_invalid_state_and_untouched() {
        let f = fixture();
        let payload = JobPayload::new("SendInvoice", json!({"invoice_id": 7})).to_value();
        let row = f
            .store
            .insert(NewJobHistory::processing(Some("j1".into()), "SendInvoice", "mail", 1, Some(payload), Utc::now()))
            .await
            .unwrap();
        f.store
            .update_live("j1", HistoryUpdate::Completed { at: Utc::now() })
            .await
            .unwrap();
        let before = f.store.get(row.id).await.unwrap();

        let err = f.service.retry(row.id).await.unwrap_err();
        assert_eq!(err, MonitorError::invalid_state("Only failed jobs can be retried"));
        assert_eq!(f.store.get(row.id).await.unwrap(), before);
        assert!(f.queue.submitted().is_empty());
    }

    #[tokio::test]
    async fn missing_record_payload_and_class() {
        let f = fixture();
        assert_eq!(
            f.service.retry(JobHistoryId::new(99)).await.unwrap_err(),
            MonitorError::NotFound(JobHistoryId::new(99))
        );

        let no_payload = failed_row(&f.store, "SendInvoice", None).await;
        assert_eq!(
            f.service.retry(no_payload.id).await.unwrap_err(),
            MonitorError::invalid_state("Job payload not available for retry")
        );

        let empty = failed_row(&f.store, "SendInvoice", Some(json!({}))).await;
        assert_eq!(
            f.service.retry(empty.id).await.unwrap_err(),
            MonitorError::invalid_state("Job payload not available for retry")
        );

        let unknown = failed_row(&f.store, "Unknown", Some(json!({"data": {"command": {}}}))).await;
        assert_eq!(
            f.service.retry(unknown.id).await.unwrap_err(),
            MonitorError::JobClassNotFound("Unknown".into())
        );
        assert!(f.queue.submitted().is_empty());
    }

    #[tokio::test]
    async fn decode_and_submit_failures_are_retry_failed() {
        let f = fixture();
        let bad = failed_row(&f.store, "SendInvoice", Some(json!({"data": {"command": {"invoice_id": "x"}}}))).await;
        assert!(matches!(
            f.service.retry(bad.id).await,
            Err(MonitorError::RetryFailed(_))
        ));

        let no_command = failed_row(&f.store, "SendInvoice", Some(json!({"display_name": "SendInvoice"}))).await;
        assert!(matches!(
            f.service.retry(no_command.id).await,
            Err(MonitorError::RetryFailed(_))
        ));

        let payload = JobPayload::new("SendInvoice", json!({"invoice_id": 1})).to_value();
        let good = failed_row(&f.store, "SendInvoice", Some(payload)).await;
        f.queue.reject_with(Some("queue full".into()));
        let err = f.service.retry(good.id).await.unwrap_err();
        assert_eq!(err.to_string(), "Failed to retry job: queue rejected job: queue full");
    }
}
