use axum::{
    Router,
    routing::{get, post},
};

pub mod jobs;
pub mod system;

/// Router for the monitor endpoints (mounted under the configured prefix).
pub fn router() -> Router {
    Router::new()
        .route("/jobs", get(jobs::list_jobs))
        .route("/jobs/stats", get(jobs::stats))
        .route("/jobs/:id", get(jobs::get_job))
        .route("/jobs/:id/retry", post(jobs::retry_job))
}
