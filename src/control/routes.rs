//! Router configuration for the control server.

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;

use super::handlers;
use super::AppState;

/// Create the control router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/status", get(handlers::status))
        .route("/logs", get(handlers::logs))
        // Manual stage triggers
        .route("/run-now", post(handlers::run_now))
        .route("/process-ai", post(handlers::process_ai))
        .route("/auto-prepare", post(handlers::auto_prepare))
        .route("/auto-publish", post(handlers::auto_publish))
        .route("/curate", post(handlers::curate))
        .route("/restart", post(handlers::restart))
        .route("/stop", post(handlers::stop))
        // Runtime configuration
        .route(
            "/config",
            get(handlers::get_config).put(handlers::put_config),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}
