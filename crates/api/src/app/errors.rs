use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use jobwatch_core::MonitorError;

fn status_of(err: &MonitorError) -> StatusCode {
    match err {
        MonitorError::NotFound(_) | MonitorError::JobClassNotFound(_) | MonitorError::InvalidId(_) => {
            StatusCode::NOT_FOUND
        }
        MonitorError::InvalidState(_) => StatusCode::BAD_REQUEST,
        MonitorError::RetryFailed(_) | MonitorError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn code_of(err: &MonitorError) -> &'static str {
    match err {
        MonitorError::NotFound(_) | MonitorError::InvalidId(_) => "not_found",
        MonitorError::JobClassNotFound(_) => "job_class_not_found",
        MonitorError::InvalidState(_) => "invalid_state",
        MonitorError::RetryFailed(_) => "retry_failed",
        MonitorError::Storage(_) => "storage_error",
    }
}

/// Error response for the read endpoints: `{error, message}`.
pub fn monitor_error_to_response(err: MonitorError) -> axum::response::Response {
    if matches!(err, MonitorError::Storage(_)) {
        tracing::error!(error = %err, "job monitor query failed");
    }
    json_error(status_of(&err), code_of(&err), err.to_string())
}

/// Error response for retry: `{success: false, message}`.
pub fn retry_error_to_response(err: MonitorError) -> axum::response::Response {
    let status = status_of(&err);
    if status.is_server_error() {
        tracing::error!(error = %err, "job retry failed");
    }
    (
        status,
        axum::Json(json!({
            "success": false,
            "message": err.to_string(),
        })),
    )
        .into_response()
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
