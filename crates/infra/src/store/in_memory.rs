//! In-memory history store for tests/dev.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use chrono::Utc;

use jobwatch_core::{JobHistoryId, JobHistoryRecord, JobStatus, NewJobHistory};

use super::{
    HistoryFilter, HistoryStats, HistoryUpdate, JobHistoryStore, Page, PageRequest, StoreError,
};

#[derive(Debug, Default)]
struct Rows {
    last_id: i64,
    by_id: BTreeMap<JobHistoryId, JobHistoryRecord>,
}

/// In-memory history table.
///
/// Ids are assigned sequentially from 1. `set_unavailable(true)` makes every
/// operation fail, which is how tests simulate a storage outage.
#[derive(Debug, Default)]
pub struct InMemoryHistoryStore {
    rows: RwLock<Rows>,
    unavailable: AtomicBool,
}

impl InMemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Simulate a storage outage (or recovery).
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of rows currently stored.
    pub fn len(&self) -> usize {
        self.rows.read().map(|r| r.by_id.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of every row in id order.
    pub fn all(&self) -> Vec<JobHistoryRecord> {
        self.rows
            .read()
            .map(|r| r.by_id.values().cloned().collect())
            .unwrap_or_default()
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("in-memory store marked unavailable".into()));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl JobHistoryStore for InMemoryHistoryStore {
    async fn insert(&self, new: NewJobHistory) -> Result<JobHistoryRecord, StoreError> {
        self.check_available()?;
        let mut rows = self.rows.write().map_err(|_| StoreError::Poisoned)?;

        rows.last_id += 1;
        let id = JobHistoryId::new(rows.last_id);
        let record = new.into_record(id, Utc::now());
        rows.by_id.insert(id, record.clone());
        Ok(record)
    }

    async fn update_live(
        &self,
        job_id: &str,
        update: HistoryUpdate,
    ) -> Result<Option<JobHistoryId>, StoreError> {
        self.check_available()?;
        let mut rows = self.rows.write().map_err(|_| StoreError::Poisoned)?;

        // Highest id wins when several rows are live for the same identifier.
        let live = rows
            .by_id
            .values_mut()
            .rev()
            .find(|r| r.is_live_for(job_id));

        match live {
            Some(record) => {
                update.apply(record, Utc::now());
                Ok(Some(record.id))
            }
            None => Ok(None),
        }
    }

    async fn get(&self, id: JobHistoryId) -> Result<Option<JobHistoryRecord>, StoreError> {
        self.check_available()?;
        let rows = self.rows.read().map_err(|_| StoreError::Poisoned)?;
        Ok(rows.by_id.get(&id).cloned())
    }

    async fn list(
        &self,
        filter: &HistoryFilter,
        page: PageRequest,
    ) -> Result<Page<JobHistoryRecord>, StoreError> {
        self.check_available()?;
        let rows = self.rows.read().map_err(|_| StoreError::Poisoned)?;

        let mut matching: Vec<&JobHistoryRecord> =
            rows.by_id.values().filter(|r| filter.matches(r)).collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let total = matching.len() as u64;
        let data = matching
            .into_iter()
            .skip(usize::try_from(page.offset()).unwrap_or(usize::MAX))
            .take(page.per_page as usize)
            .cloned()
            .collect();

        Ok(Page::new(data, total, page))
    }

    async fn stats(&self) -> Result<HistoryStats, StoreError> {
        self.check_available()?;
        let rows = self.rows.read().map_err(|_| StoreError::Poisoned)?;

        let mut stats = HistoryStats::default();
        let mut runtime_sum = 0i64;
        let mut timed_rows = 0u64;

        for record in rows.by_id.values() {
            stats.total_jobs += 1;
            match record.status {
                JobStatus::Pending => stats.pending_jobs += 1,
                JobStatus::Completed => stats.completed_jobs += 1,
                JobStatus::Failed => stats.failed_jobs += 1,
                JobStatus::Processing => {}
            }
            if let Some(secs) = record.runtime_seconds() {
                runtime_sum += secs;
                timed_rows += 1;
            }
        }

        Ok(stats.with_runtimes(runtime_sum, timed_rows))
    }
}
