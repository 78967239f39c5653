use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::handlers::{deliver_derivative, health};
use crate::services::DerivativeCoordinator;

/// Application state shared by the handlers
#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<DerivativeCoordinator>,
}

/// Create the delivery router: `/health` plus the catch-all derivative route
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/{*path}", get(deliver_derivative))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
