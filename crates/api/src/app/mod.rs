//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: store/queue/recorder wiring (in-memory or Postgres)
//! - `routes/`: HTTP routes + handlers
//! - `dto.rs`: query-string DTOs and their mapping to store filters
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router, routing::get};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use jobwatch_infra::MonitorConfig;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

use services::AppServices;

/// Build the full HTTP router (public entrypoint used by `main.rs`).
///
/// `/health` is always served. The monitor routes are mounted under the
/// configured prefix with the configured middleware, or left out entirely
/// when routes are disabled.
pub fn build_app(config: &MonitorConfig, services: Arc<AppServices>) -> Router {
    let app = Router::new().route("/health", get(routes::system::health));

    if !config.route.enabled {
        info!("job monitor routes disabled");
        return app.layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()));
    }

    let mut api = routes::router().layer(Extension(services));

    for name in &config.route.middleware {
        match name.as_str() {
            "api" => {}
            "auth" => match &config.route.api_token {
                Some(token) => {
                    api = api.layer(axum::middleware::from_fn_with_state(
                        middleware::AuthState::new(token.as_str()),
                        middleware::auth_middleware,
                    ));
                }
                None => warn!("auth middleware requested but no API token configured; skipping"),
            },
            other => warn!(middleware = other, "unknown route middleware ignored"),
        }
    }

    let mount = config.route.mount_path();
    info!(prefix = %mount, "job monitor routes mounted");

    // `nest` rejects the root path; an empty prefix mounts the routes as-is.
    let app = if mount.is_empty() {
        app.merge(api)
    } else {
        app.nest(&mount, api)
    };

    app.layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
}
