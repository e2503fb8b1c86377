//! Infrastructure layer: history storage, lifecycle recording, retry, config.
//!
//! ```text
//! queue worker ──▶ EventBus ──▶ RecorderWorker ──▶ HistoryRecorder ──▶ JobHistoryStore
//!                                                                          ▲
//! HTTP API ──▶ HistoryQuery / RetryService ──▶ JobRegistry ──▶ JobQueue ───┘ (reads)
//! ```

pub mod config;
pub mod filter;
pub mod progress;
pub mod query;
pub mod queue;
pub mod recorder;
pub mod registry;
pub mod retry;
pub mod store;
pub mod workers;

pub use config::{ConfigError, MonitorConfig, RouteConfig, TableName};
pub use filter::TrackingFilter;
pub use query::HistoryQuery;
pub use queue::{InMemoryJobQueue, JobQueue, PostgresJobQueue, QueueError, SubmittedJob};
pub use recorder::HistoryRecorder;
pub use registry::{DecodeError, JobRegistry, TrackedJob};
pub use retry::{RetryAck, RetryService};
pub use store::{
    HistoryFilter, HistoryStats, HistoryUpdate, InMemoryHistoryStore, JobHistoryStore, Page,
    PageRequest, PostgresHistoryStore, StoreError,
};
pub use workers::{RecorderWorker, WorkerHandle};
