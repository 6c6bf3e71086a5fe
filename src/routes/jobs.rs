//! Job registry endpoints (/jobs/*)

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::AppState;
use crate::display;
use crate::models::{BotJob, JobSettings, JobType};
use crate::services::backend::JobAction;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/jobs", get(list_jobs).post(create_job))
        .route("/jobs/dismiss-error", post(dismiss_error))
        .route("/jobs/{id}/start", post(start_job))
        .route("/jobs/{id}/stop", post(stop_job))
        .route("/jobs/{id}/pause", post(pause_job))
        .route("/jobs/{id}/rename", post(rename_job))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JobsResponse {
    jobs: Vec<BotJob>,
    /// "{jobId}-{action}" keys; only these rows show a spinner
    pending: Vec<String>,
    error: Option<String>,
    last_sync: Option<DateTime<Utc>>,
    last_sync_label: Option<String>,
}

/// GET /jobs - the registry projection plus sync/error state
async fn list_jobs(State(state): State<Arc<AppState>>) -> Json<JobsResponse> {
    let snapshot = state.status.snapshot().await;
    let registry = state.registry.read().await;

    // action failures take precedence over a stale-poll banner
    let error = registry
        .error()
        .map(str::to_string)
        .or_else(|| snapshot.error.clone());

    Json(JobsResponse {
        jobs: registry.jobs().to_vec(),
        pending: registry.pending_keys(),
        error,
        last_sync: snapshot.last_fetch,
        last_sync_label: snapshot
            .last_fetch
            .map(|t| display::relative_from(t, Utc::now())),
    })
}

#[derive(Deserialize)]
struct CreateJobRequest {
    #[serde(rename = "type")]
    job_type: JobType,
    name: Option<String>,
    #[serde(default)]
    settings: JobSettings,
}

/// POST /jobs - create a job directly. Only simplified reply jobs take this
/// path; posting jobs come out of the content approval workflow.
async fn create_job(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateJobRequest>,
) -> Result<Json<Value>, StatusCode> {
    if req.job_type == JobType::Posting {
        return Ok(Json(json!({
            "success": false,
            "error": "posting jobs are created through the content workflow"
        })));
    }

    let name = match req.name.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => state.registry.read().await.next_job_name(),
    };

    match state.backend.create_reply_job(&name, &req.settings).await {
        Ok(job) => {
            println!("[jobs] created reply job {} ({})", job.id, name);
            state.schedule_registry_refresh();
            Ok(Json(json!({ "success": true, "job": job })))
        }
        Err(e) => {
            eprintln!("[jobs] create failed: {}", e);
            Ok(Json(json!({ "success": false, "error": e.to_string() })))
        }
    }
}

/// POST /jobs/:id/start
async fn start_job(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
) -> Json<Value> {
    run_job_action(state, job_id, JobAction::Start).await
}

/// POST /jobs/:id/stop
async fn stop_job(State(state): State<Arc<AppState>>, Path(job_id): Path<String>) -> Json<Value> {
    run_job_action(state, job_id, JobAction::Stop).await
}

/// POST /jobs/:id/pause
async fn pause_job(State(state): State<Arc<AppState>>, Path(job_id): Path<String>) -> Json<Value> {
    run_job_action(state, job_id, JobAction::Pause).await
}

async fn run_job_action(state: Arc<AppState>, job_id: String, action: JobAction) -> Json<Value> {
    let began = state
        .registry
        .write()
        .await
        .begin_action(&job_id, action.as_str());
    if !began {
        return Json(json!({
            "success": false,
            "error": format!("{} already in progress for this job", action.as_str())
        }));
    }

    let result = state.backend.job_action(&job_id, action).await;

    {
        let mut registry = state.registry.write().await;
        registry.finish_action(&job_id, action.as_str());
        if let Err(e) = &result {
            registry.set_error(format!("could not {} job: {}", action.as_str(), e));
        }
    }

    match result {
        Ok(()) => {
            state.schedule_registry_refresh();
            Json(json!({ "success": true }))
        }
        Err(e) => {
            eprintln!("[jobs] {} {} failed: {}", action.as_str(), job_id, e);
            Json(json!({ "success": false, "error": e.to_string() }))
        }
    }
}

#[derive(Deserialize)]
struct RenameRequest {
    name: String,
}

/// POST /jobs/:id/rename - on success the local row is patched immediately
/// instead of waiting for the next snapshot
async fn rename_job(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
    Json(req): Json<RenameRequest>,
) -> Json<Value> {
    let name = req.name.trim().to_string();
    if name.is_empty() {
        return Json(json!({ "success": false, "error": "job name cannot be empty" }));
    }

    let began = state.registry.write().await.begin_action(&job_id, "rename");
    if !began {
        return Json(json!({ "success": false, "error": "rename already in progress" }));
    }

    let result = state.backend.rename_job(&job_id, &name).await;

    let mut registry = state.registry.write().await;
    registry.finish_action(&job_id, "rename");
    match result {
        Ok(()) => {
            registry.patch_name(&job_id, &name);
            Json(json!({ "success": true }))
        }
        Err(e) => {
            eprintln!("[jobs] rename {} failed: {}", job_id, e);
            registry.set_error(format!("could not rename job: {}", e));
            Json(json!({ "success": false, "error": e.to_string() }))
        }
    }
}

/// POST /jobs/dismiss-error
async fn dismiss_error(State(state): State<Arc<AppState>>) -> StatusCode {
    state.registry.write().await.dismiss_error();
    StatusCode::NO_CONTENT
}
