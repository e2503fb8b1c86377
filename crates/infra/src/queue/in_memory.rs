//! In-memory queue for tests/dev.

use std::sync::Mutex;

use uuid::Uuid;

use super::{JobQueue, QueueError, SubmittedJob};

/// Records every submission; nothing is executed.
#[derive(Debug, Default)]
pub struct InMemoryJobQueue {
    submitted: Mutex<Vec<(String, SubmittedJob)>>,
    reject_with: Mutex<Option<String>>,
}

impl InMemoryJobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following submission fail with `reason` (`None` to accept again).
    pub fn reject_with(&self, reason: Option<String>) {
        if let Ok(mut guard) = self.reject_with.lock() {
            *guard = reason;
        }
    }

    /// Submitted jobs with their assigned ids, oldest first.
    pub fn submitted(&self) -> Vec<(String, SubmittedJob)> {
        self.submitted
            .lock()
            .map(|s| s.clone())
            .unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl JobQueue for InMemoryJobQueue {
    async fn submit(&self, job: SubmittedJob) -> Result<String, QueueError> {
        if let Some(reason) = self
            .reject_with
            .lock()
            .map_err(|_| QueueError::Unavailable("queue lock poisoned".into()))?
            .clone()
        {
            return Err(QueueError::Rejected(reason));
        }

        let id = Uuid::now_v7().to_string();
        self.submitted
            .lock()
            .map_err(|_| QueueError::Unavailable("queue lock poisoned".into()))?
            .push((id.clone(), job));
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn records_submissions_with_unique_ids() {
        let queue = InMemoryJobQueue::new();
        let a = queue
            .submit(SubmittedJob::new("A", "default", json!({})))
            .await
            .unwrap();
        let b = queue
            .submit(SubmittedJob::new("B", "high", json!({"x": 1})))
            .await
            .unwrap();

        assert_ne!(a, b);
        let submitted = queue.submitted();
        assert_eq!(submitted.len(), 2);
        assert_eq!(submitted[1].1.queue, "high");
    }

    #[tokio::test]
    async fn rejection_is_reported() {
        let queue = InMemoryJobQueue::new();
        queue.reject_with(Some("queue full".into()));
        let err = queue
            .submit(SubmittedJob::new("A", "default", json!({})))
            .await
            .unwrap_err();
        assert!(matches!(err, QueueError::Rejected(ref r) if r == "queue full"));
        assert!(queue.submitted().is_empty());
    }
}
