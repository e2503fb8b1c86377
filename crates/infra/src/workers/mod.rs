//! Background workers.

pub mod recorder_worker;

pub use recorder_worker::{RecorderWorker, WorkerHandle};
