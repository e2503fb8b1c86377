//! `jobwatch-core`: job history domain types.
//!
//! This crate contains **pure domain** primitives (no storage, no transport).

pub mod error;
pub mod id;
pub mod payload;
pub mod progress;
pub mod record;
pub mod status;

pub use error::{MonitorError, MonitorResult};
pub use id::JobHistoryId;
pub use payload::{JobPayload, JobPayloadData};
pub use progress::Progress;
pub use record::{JobHistoryRecord, NewJobHistory};
pub use status::{JobStatus, UnknownStatus};
