//! History storage abstraction.
//!
//! The store is a plain table with single-row inserts and single-row updates.
//! Every update targets the *live* row for a job identifier: the most
//! recently inserted row with that identifier that is still `processing`.
//! Rows that are already finished are never touched by lifecycle updates.

pub mod in_memory;
pub mod postgres;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use jobwatch_core::{
    JobHistoryId, JobHistoryRecord, JobStatus, MonitorError, NewJobHistory, Progress,
};

pub use in_memory::InMemoryHistoryStore;
pub use postgres::PostgresHistoryStore;

/// Hard upper bound on page size.
pub const MAX_PER_PAGE: u32 = 1000;

/// History store error.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    #[error("corrupt history row {id}: {reason}")]
    CorruptRow { id: i64, reason: String },
    #[error("store lock poisoned")]
    Poisoned,
}

impl From<StoreError> for MonitorError {
    fn from(err: StoreError) -> Self {
        MonitorError::storage(err.to_string())
    }
}

/// In-place mutation applied to the live row for a job identifier.
#[derive(Debug, Clone, PartialEq)]
pub enum HistoryUpdate {
    Completed { at: DateTime<Utc> },
    Failed { error_message: String, at: DateTime<Utc> },
    Progress(Progress),
}

impl HistoryUpdate {
    pub fn apply(&self, record: &mut JobHistoryRecord, now: DateTime<Utc>) {
        match self {
            HistoryUpdate::Completed { at } => record.mark_completed(*at),
            HistoryUpdate::Failed { error_message, at } => {
                record.mark_failed(error_message.clone(), *at)
            }
            HistoryUpdate::Progress(p) => record.set_progress(*p, now),
        }
    }
}

/// Conjunctive list filter; `None` fields do not constrain.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoryFilter {
    /// Case-insensitive substring of job id, job class, or error message.
    pub search: Option<String>,
    pub status: Option<JobStatus>,
    /// Exact queue name.
    pub queue: Option<String>,
    /// Case-insensitive substring of the job class.
    pub job_type: Option<String>,
    /// Inclusive lower bound on `created_at`.
    pub created_from: Option<DateTime<Utc>>,
    /// Inclusive upper bound on `created_at`.
    pub created_to: Option<DateTime<Utc>>,
}

impl HistoryFilter {
    pub fn matches(&self, record: &JobHistoryRecord) -> bool {
        if let Some(search) = &self.search {
            let needle = search.to_lowercase();
            let hit = [
                record.job_id.as_deref(),
                Some(record.job_class.as_str()),
                record.error_message.as_deref(),
            ]
            .into_iter()
            .flatten()
            .any(|hay| hay.to_lowercase().contains(&needle));
            if !hit {
                return false;
            }
        }
        if self.status.is_some_and(|s| s != record.status) {
            return false;
        }
        if self.queue.as_ref().is_some_and(|q| q != &record.queue) {
            return false;
        }
        if let Some(job_type) = &self.job_type {
            if !record
                .job_class
                .to_lowercase()
                .contains(&job_type.to_lowercase())
            {
                return false;
            }
        }
        if self.created_from.is_some_and(|from| record.created_at < from) {
            return false;
        }
        if self.created_to.is_some_and(|to| record.created_at > to) {
            return false;
        }
        true
    }
}

/// 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageRequest {
    pub page: u32,
    pub per_page: u32,
}

impl PageRequest {
    /// Missing or zero values fall back to page 1 / `default_per_page`;
    /// page size is capped at [`MAX_PER_PAGE`].
    pub fn new(page: Option<u32>, per_page: Option<u32>, default_per_page: u32) -> Self {
        let per_page = per_page
            .filter(|n| *n > 0)
            .unwrap_or(default_per_page)
            .clamp(1, MAX_PER_PAGE);
        Self {
            page: page.filter(|p| *p > 0).unwrap_or(1),
            per_page,
        }
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.per_page)
    }
}

/// One page of results plus paging metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub current_page: u32,
    pub per_page: u32,
    pub total: u64,
    pub last_page: u32,
}

impl<T> Page<T> {
    pub fn new(data: Vec<T>, total: u64, request: PageRequest) -> Self {
        let per_page = u64::from(request.per_page);
        let last_page = total.div_ceil(per_page).max(1);
        Self {
            data,
            current_page: request.page,
            per_page: request.per_page,
            total,
            last_page: u32::try_from(last_page).unwrap_or(u32::MAX),
        }
    }
}

/// Aggregate counts and runtimes over the whole table.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HistoryStats {
    pub total_jobs: u64,
    pub pending_jobs: u64,
    pub completed_jobs: u64,
    pub failed_jobs: u64,
    /// Sum of whole-second runtimes over rows with both timestamps.
    pub total_runtime: i64,
    /// Mean runtime in seconds, rounded to two decimals.
    pub average_runtime: f64,
}

impl HistoryStats {
    /// Derive the average from a runtime sum and the number of timed rows.
    pub fn with_runtimes(mut self, total_runtime: i64, timed_rows: u64) -> Self {
        self.total_runtime = total_runtime;
        self.average_runtime = if timed_rows == 0 {
            0.0
        } else {
            round2(total_runtime as f64 / timed_rows as f64)
        };
        self
    }
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// History store abstraction.
#[async_trait::async_trait]
pub trait JobHistoryStore: Send + Sync {
    /// Insert a new row and return it with its assigned id.
    async fn insert(&self, new: NewJobHistory) -> Result<JobHistoryRecord, StoreError>;

    /// Apply `update` to the live row for `job_id`.
    ///
    /// Returns the id of the updated row, or `None` when no row is live for
    /// that identifier.
    async fn update_live(
        &self,
        job_id: &str,
        update: HistoryUpdate,
    ) -> Result<Option<JobHistoryId>, StoreError>;

    /// Get a row by primary key.
    async fn get(&self, id: JobHistoryId) -> Result<Option<JobHistoryRecord>, StoreError>;

    /// List rows matching `filter`, newest first.
    async fn list(
        &self,
        filter: &HistoryFilter,
        page: PageRequest,
    ) -> Result<Page<JobHistoryRecord>, StoreError>;

    /// Aggregate statistics.
    async fn stats(&self) -> Result<HistoryStats, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn record(job_id: &str, class: &str, queue: &str) -> JobHistoryRecord {
        let now = Utc::now();
        NewJobHistory::processing(Some(job_id.into()), class, queue, 1, None, now)
            .into_record(JobHistoryId::new(1), now)
    }

    #[test]
    fn empty_filter_matches_everything() {
        assert!(HistoryFilter::default().matches(&record("a", "B", "c")));
    }

    #[test]
    fn search_covers_id_class_and_error_case_insensitively() {
        let mut failed = record("uuid-123", "App\\Jobs\\SendMail", "default");
        failed.mark_failed("SMTP Timeout", Utc::now());

        for needle in ["UUID-1", "sendmail", "smtp timeout"] {
            let f = HistoryFilter {
                search: Some(needle.into()),
                ..Default::default()
            };
            assert!(f.matches(&failed), "{needle} should match");
        }

        let miss = HistoryFilter {
            search: Some("nothing".into()),
            ..Default::default()
        };
        assert!(!miss.matches(&failed));
    }

    #[test]
    fn filters_are_conjunctive() {
        let r = record("j", "App\\Jobs\\Export", "reports");
        let f = HistoryFilter {
            queue: Some("reports".into()),
            job_type: Some("export".into()),
            status: Some(JobStatus::Processing),
            ..Default::default()
        };
        assert!(f.matches(&r));

        let wrong_status = HistoryFilter {
            status: Some(JobStatus::Failed),
            ..f.clone()
        };
        assert!(!wrong_status.matches(&r));

        let wrong_queue = HistoryFilter {
            queue: Some("Reports".into()),
            ..f
        };
        assert!(!wrong_queue.matches(&r));
    }

    #[test]
    fn date_bounds_are_inclusive() {
        let r = record("j", "Job", "q");
        let at = r.created_at;
        let f = HistoryFilter {
            created_from: Some(at),
            created_to: Some(at),
            ..Default::default()
        };
        assert!(f.matches(&r));

        let later = HistoryFilter {
            created_from: Some(at + Duration::seconds(1)),
            ..Default::default()
        };
        assert!(!later.matches(&r));
    }

    #[test]
    fn page_request_defaults_and_caps() {
        assert_eq!(PageRequest::new(None, None, 25), PageRequest { page: 1, per_page: 25 });
        assert_eq!(PageRequest::new(Some(0), Some(0), 25), PageRequest { page: 1, per_page: 25 });
        assert_eq!(PageRequest::new(Some(3), Some(5000), 25).per_page, MAX_PER_PAGE);
        assert_eq!(PageRequest::new(Some(3), Some(10), 25).offset(), 20);
    }

    #[test]
    fn page_metadata() {
        let req = PageRequest::new(Some(2), Some(10), 25);
        let page = Page::new(vec![1, 2, 3], 23, req);
        assert_eq!(page.last_page, 3);
        assert_eq!(page.current_page, 2);

        let empty: Page<i32> = Page::new(vec![], 0, req);
        assert_eq!(empty.last_page, 1);
    }

    #[test]
    fn stats_average_rounds_to_two_decimals() {
        let stats = HistoryStats::default().with_runtimes(10, 3);
        assert_eq!(stats.total_runtime, 10);
        assert_eq!(stats.average_runtime, 3.33);

        let none = HistoryStats::default().with_runtimes(0, 0);
        assert_eq!(none.average_runtime, 0.0);
    }
}
