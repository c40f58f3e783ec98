//! Router configuration.
//!
//! This module creates the Axum router exposing the cached records.

use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    let records = Router::new()
        .route("/passwd.json", get(handlers::passwd_json))
        .route("/passwd", get(handlers::passwd_flat))
        .route("/group.json", get(handlers::group_json))
        .route("/group", get(handlers::group_flat))
        .route("/shadow.json", get(handlers::shadow_json))
        .route("/shadow", get(handlers::shadow_flat));

    let health = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/health/live", get(handlers::liveness_check))
        .route("/health/ready", get(handlers::readiness_check));

    Router::new()
        .merge(records)
        .merge(health)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
