//! Execution context for progress reporting.
//!
//! A queue worker wraps each job body in [`scope`]; inside it,
//! [`current_job_id`] resolves the job being executed so that
//! `HistoryRecorder::update_progress` needs no identifier argument.
//! Outside a scope there is no current job and progress updates are no-ops.

use std::future::Future;

tokio::task_local! {
    static CURRENT_JOB: String;
}

/// Run `fut` with `job_id` as the current job.
pub async fn scope<F>(job_id: impl Into<String>, fut: F) -> F::Output
where
    F: Future,
{
    CURRENT_JOB.scope(job_id.into(), fut).await
}

/// Identifier of the job executing on this task, if any.
pub fn current_job_id() -> Option<String> {
    CURRENT_JOB.try_with(Clone::clone).ok()
}
