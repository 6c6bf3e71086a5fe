pub mod jobs;
pub mod panels;
pub mod workflows;

use std::sync::Arc;

use axum::{Router, routing::get};

use crate::AppState;

/// Build all routes served to the dashboard frontend
pub fn build_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health))
        .merge(jobs::routes())
        .merge(panels::routes())
        .merge(workflows::routes())
}

async fn health() -> &'static str {
    "ok"
}
