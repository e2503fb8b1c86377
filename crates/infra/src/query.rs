//! Read side of the monitor: list, get, stats.

use std::sync::Arc;

use tracing::debug;

use jobwatch_core::{JobHistoryId, JobHistoryRecord, MonitorError, MonitorResult};

use crate::store::{HistoryFilter, HistoryStats, JobHistoryStore, Page, PageRequest};

#[derive(Clone)]
pub struct HistoryQuery {
    store: Arc<dyn JobHistoryStore>,
    default_per_page: u32,
}

impl core::fmt::Debug for HistoryQuery {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("HistoryQuery")
            .field("default_per_page", &self.default_per_page)
            .finish_non_exhaustive()
    }
}

impl HistoryQuery {
    pub fn new(store: Arc<dyn JobHistoryStore>, default_per_page: u32) -> Self {
        Self {
            store,
            default_per_page,
        }
    }

    /// Build a page request, falling back to the configured page size.
    pub fn page_request(&self, page: Option<u32>, per_page: Option<u32>) -> PageRequest {
        PageRequest::new(page, per_page, self.default_per_page)
    }

    pub async fn list(
        &self,
        filter: &HistoryFilter,
        page: PageRequest,
    ) -> MonitorResult<Page<JobHistoryRecord>> {
        let page = self.store.list(filter, page).await?;
        debug!(total = page.total, returned = page.data.len(), "listed job histories");
        Ok(page)
    }

    pub async fn get(&self, id: JobHistoryId) -> MonitorResult<JobHistoryRecord> {
        self.store
            .get(id)
            .await?
            .ok_or(MonitorError::NotFound(id))
    }

    pub async fn stats(&self) -> MonitorResult<HistoryStats> {
        Ok(self.store.stats().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryHistoryStore;
    use chrono::Utc;
    use jobwatch_core::NewJobHistory;

    #[tokio::test]
    async fn get_missing_is_not_found() {
        let query = HistoryQuery::new(InMemoryHistoryStore::arc(), 25);
        let err = query.get(JobHistoryId::new(42)).await.unwrap_err();
        assert_eq!(err, MonitorError::NotFound(JobHistoryId::new(42)));
    }

    #[tokio::test]
    async fn empty_stats_are_zero() {
        let query = HistoryQuery::new(InMemoryHistoryStore::arc(), 25);
        assert_eq!(query.stats().await.unwrap(), HistoryStats::default());
    }

    #[tokio::test]
    async fn list_uses_default_page_size() {
        let store = InMemoryHistoryStore::arc();
        for i in 0..4 {
            store
                .insert(NewJobHistory::processing(Some(format!("j{i}")), "Job", "q", 1, None, Utc::now()))
                .await
                .unwrap();
        }
        let query = HistoryQuery::new(store, 3);
        let page = query
            .list(&HistoryFilter::default(), query.page_request(None, None))
            .await
            .unwrap();
        assert_eq!(page.per_page, 3);
        assert_eq!(page.data.len(), 3);
        assert_eq!(page.last_page, 2);
    }

    #[tokio::test]
    async fn storage_failure_maps_to_storage_error() {
        let store = InMemoryHistoryStore::arc();
        store.set_unavailable(true);
        let query = HistoryQuery::new(store, 25);
        assert!(matches!(query.stats().await, Err(MonitorError::Storage(_))));
    }
}
