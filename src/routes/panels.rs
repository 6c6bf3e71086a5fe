//! Read-only status/metrics panels (/status, /panels/*)

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::AppState;
use crate::display;
use crate::models::JobStats;
use crate::services::poll::Poller;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/status", get(status_view))
        .route("/panels/settings", get(settings_view).post(update_settings))
        .route("/panels/{panel}", get(panel_view))
}

/// GET /status - connection health and the latest bot-status snapshot
async fn status_view(State(state): State<Arc<AppState>>) -> Json<Value> {
    let snapshot = state.status.snapshot().await;
    match snapshot.data {
        Some(status) => Json(json!({
            "running": status.running,
            "stats": status.stats,
            "jobCount": status.jobs.len(),
            "lastRun": status.last_run,
            "lastRunLabel": status.last_run.as_deref().map(display::relative_label),
            "uptime": status.uptime,
            "error": snapshot.error,
            "lastFetch": snapshot.last_fetch,
        })),
        // never polled successfully: placeholder instead of a blank panel
        None => Json(json!({
            "running": false,
            "stats": JobStats::default(),
            "jobCount": 0,
            "lastRun": null,
            "lastRunLabel": null,
            "uptime": null,
            "error": snapshot.error,
            "lastFetch": snapshot.last_fetch,
            "fallback": true,
        })),
    }
}

#[derive(Deserialize)]
struct PanelQuery {
    #[serde(default)]
    refresh: bool,
}

/// GET /panels/:panel - latest snapshot for posts/metrics/topics/engagement.
/// `?refresh=true` nudges the poller without disturbing its cadence.
async fn panel_view(
    State(state): State<Arc<AppState>>,
    Path(panel): Path<String>,
    Query(query): Query<PanelQuery>,
) -> Result<Json<Value>, StatusCode> {
    let poller: &Poller<Value> = match panel.as_str() {
        "posts" => &state.panels.posts,
        "metrics" => &state.panels.metrics,
        "topics" => &state.panels.topics,
        "engagement" => &state.panels.engagement,
        _ => return Err(StatusCode::NOT_FOUND),
    };

    if query.refresh {
        poller.refetch();
    }

    let snapshot = poller.snapshot().await;
    let (data, fallback) = match snapshot.data {
        Some(data) => (data, false),
        None => (display::fallback_panel(&panel), true),
    };
    let data = if panel == "metrics" {
        display::decorate_metrics(&data)
    } else {
        data
    };

    Ok(Json(json!({
        "data": data,
        "error": snapshot.error,
        "lastFetch": snapshot.last_fetch,
        "fallback": fallback,
    })))
}

/// GET /panels/settings - read through to the upstream, fall back to the
/// upstream's own defaults when it is unreachable
async fn settings_view(State(state): State<Arc<AppState>>) -> Json<Value> {
    match state.backend.fetch_panel("settings").await {
        Ok(settings) => Json(json!({ "data": settings, "fallback": false })),
        Err(e) => {
            eprintln!("[panels] settings fetch failed: {}", e);
            Json(json!({
                "data": display::fallback_panel("settings"),
                "error": e.to_string(),
                "fallback": true,
            }))
        }
    }
}

/// POST /panels/settings - opaque write-through
async fn update_settings(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Value>,
) -> Json<Value> {
    match state.backend.update_settings(&body).await {
        Ok(result) => Json(result),
        Err(e) => {
            eprintln!("[panels] settings update failed: {}", e);
            Json(json!({ "success": false, "error": e.to_string() }))
        }
    }
}
