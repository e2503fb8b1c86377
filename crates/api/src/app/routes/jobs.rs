use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Path, Query},
    response::IntoResponse,
};

use jobwatch_core::JobHistoryId;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub async fn list_jobs(
    Extension(services): Extension<Arc<AppServices>>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> axum::response::Response {
    let query = dto::ListJobsQuery::from_pairs(pairs);
    let filter = query.filter();
    let page = services.query.page_request(query.page(), query.per_page());

    match services.query.list(&filter, page).await {
        Ok(page) => Json(page).into_response(),
        Err(e) => errors::monitor_error_to_response(e),
    }
}

pub async fn stats(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    match services.query.stats().await {
        Ok(stats) => Json(stats).into_response(),
        Err(e) => errors::monitor_error_to_response(e),
    }
}

pub async fn get_job(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: JobHistoryId = match id.parse() {
        Ok(id) => id,
        Err(e) => return errors::monitor_error_to_response(e),
    };

    match services.query.get(id).await {
        Ok(record) => Json(record).into_response(),
        Err(e) => errors::monitor_error_to_response(e),
    }
}

pub async fn retry_job(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: JobHistoryId = match id.parse() {
        Ok(id) => id,
        Err(e) => return errors::retry_error_to_response(e),
    };

    match services.retry.retry(id).await {
        Ok(ack) => Json(ack).into_response(),
        Err(e) => errors::retry_error_to_response(e),
    }
}
