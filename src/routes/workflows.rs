//! Content generation & approval workflow endpoints (/workflows/*)

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::models::{BotJob, JobSettings, JobType, SourceTweet};
use crate::workflow::commit::{
    all_replies_failed, approved_posts, approved_replies, commit_posting_batch, commit_summary,
    post_approved_replies,
};
use crate::workflow::generate::{
    pick_different_source, pick_different_topic, regenerate_post, regenerate_reply,
    run_posting_generation, run_reply_generation,
};
use crate::workflow::{
    Approval, ItemDetail, Phase, PostedReply, WorkflowError, WorkflowSession,
};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/workflows", post(start_workflow))
        .route("/workflows/{id}", get(get_workflow).delete(discard_workflow))
        .route("/workflows/{id}/commit", post(commit_workflow))
        .route("/workflows/{id}/items/{item_id}/approve", post(approve_item))
        .route(
            "/workflows/{id}/items/{item_id}/regenerate",
            post(regenerate_same),
        )
        .route(
            "/workflows/{id}/items/{item_id}/regenerate-different",
            post(regenerate_different),
        )
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ItemView {
    id: String,
    #[serde(rename = "type")]
    kind: &'static str,
    content: String,
    approval: Approval,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    // posting candidates
    #[serde(skip_serializing_if = "Option::is_none")]
    topic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    scheduled_time: Option<NaiveDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    hashtags: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    engagement_score: Option<f64>,
    // reply candidates
    #[serde(skip_serializing_if = "Option::is_none")]
    tweet_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tweet_author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    original_tweet: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    original_tweet_url: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionView {
    id: String,
    #[serde(rename = "type")]
    kind: JobType,
    phase: Phase,
    job_name: String,
    items: Vec<ItemView>,
    approved_count: usize,
    busy: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    posted: Vec<PostedReply>,
    failed_posts: usize,
}

#[derive(Serialize)]
struct WorkflowResponse {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    workflow: Option<SessionView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    job: Option<BotJob>,
}

impl WorkflowResponse {
    fn ok(session: &WorkflowSession) -> Self {
        Self {
            success: true,
            error: None,
            workflow: Some(session_view(session)),
            summary: None,
            job: None,
        }
    }

    fn err(message: String, session: Option<&WorkflowSession>) -> Self {
        Self {
            success: false,
            error: Some(message),
            workflow: session.map(session_view),
            summary: None,
            job: None,
        }
    }
}

fn session_view(session: &WorkflowSession) -> SessionView {
    let items = session
        .items
        .iter()
        .map(|item| {
            let mut view = ItemView {
                id: item.id.clone(),
                kind: "post",
                content: item.content.clone(),
                approval: item.approval,
                error: item.error.clone(),
                topic: None,
                scheduled_time: None,
                hashtags: None,
                engagement_score: None,
                tweet_id: None,
                tweet_author: None,
                original_tweet: None,
                original_tweet_url: None,
            };
            match &item.detail {
                ItemDetail::Post {
                    topic,
                    scheduled_time,
                    hashtags,
                    engagement_score,
                } => {
                    view.topic = Some(topic.clone());
                    view.scheduled_time = Some(*scheduled_time);
                    view.hashtags = Some(hashtags.clone());
                    view.engagement_score = *engagement_score;
                }
                ItemDetail::Reply { source } => {
                    view.kind = "reply";
                    view.tweet_id = Some(source.id.clone());
                    view.tweet_author = Some(source.author.clone());
                    view.original_tweet = Some(source.text.clone());
                    view.original_tweet_url = Some(source.url());
                }
            }
            view
        })
        .collect();

    let mut busy: Vec<String> = session.busy.iter().cloned().collect();
    busy.sort();

    SessionView {
        id: session.id.clone(),
        kind: session.kind,
        phase: session.phase,
        job_name: session.job_name.clone(),
        items,
        approved_count: session.approved_count(),
        busy,
        error: session.error.clone(),
        posted: session.posted.clone(),
        failed_posts: session.failed_posts,
    }
}

#[derive(Deserialize)]
struct StartWorkflowRequest {
    #[serde(rename = "type")]
    job_type: JobType,
    name: Option<String>,
    #[serde(default)]
    settings: JobSettings,
}

/// POST /workflows - generate a new candidate batch. Only one generation
/// loop runs at a time; a second request while one is in flight gets 409.
async fn start_workflow(
    State(state): State<Arc<AppState>>,
    Json(req): Json<StartWorkflowRequest>,
) -> Result<Json<WorkflowResponse>, StatusCode> {
    let session_id = {
        let mut store = state.workflows.lock().unwrap();
        if !store.try_begin_generation() {
            return Err(StatusCode::CONFLICT);
        }
        store.allocate_id()
    };

    let job_name = match req.name.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => state.registry.read().await.next_job_name(),
    };

    println!(
        "[workflow] {} generating {} batch for {:?}",
        session_id,
        req.job_type.as_str(),
        job_name
    );

    let generation = match req.job_type {
        JobType::Posting => run_posting_generation(&state.backend, &req.settings)
            .await
            .map(|items| (items, Vec::new())),
        JobType::Replying => run_reply_generation(&state.backend, &req.settings).await,
    };

    match generation {
        Ok((items, pool)) => {
            println!("[workflow] {} generated {} items", session_id, items.len());
            let mut session =
                WorkflowSession::new(session_id, req.job_type, job_name, req.settings);
            session.begin_review(items, pool);
            let response = WorkflowResponse::ok(&session);

            let mut store = state.workflows.lock().unwrap();
            store.insert(session);
            store.end_generation();
            Ok(Json(response))
        }
        Err(e) => {
            // the batch is discarded; nothing was created anywhere
            eprintln!("[workflow] {} generation aborted: {}", session_id, e);
            state.workflows.lock().unwrap().end_generation();
            Ok(Json(WorkflowResponse::err(e.to_string(), None)))
        }
    }
}

/// GET /workflows/:id
async fn get_workflow(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<WorkflowResponse>, StatusCode> {
    let store = state.workflows.lock().unwrap();
    let session = store.get(&id).ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(WorkflowResponse::ok(session)))
}

/// DELETE /workflows/:id - discard the batch, no side effects
async fn discard_workflow(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, StatusCode> {
    let removed = state.workflows.lock().unwrap().remove(&id);
    match removed {
        Some(session) => {
            println!("[workflow] {} discarded in {:?} phase", id, session.phase);
            Ok(StatusCode::NO_CONTENT)
        }
        None => Err(StatusCode::NOT_FOUND),
    }
}

/// POST /workflows/:id/items/:item_id/approve - idempotent
async fn approve_item(
    State(state): State<Arc<AppState>>,
    Path((id, item_id)): Path<(String, String)>,
) -> Result<Json<WorkflowResponse>, StatusCode> {
    let mut store = state.workflows.lock().unwrap();
    let session = store.get_mut(&id).ok_or(StatusCode::NOT_FOUND)?;
    match session.approve(&item_id) {
        Ok(()) => Ok(Json(WorkflowResponse::ok(session))),
        Err(e) => Ok(Json(WorkflowResponse::err(e.to_string(), Some(session)))),
    }
}

/// POST /workflows/:id/items/:item_id/regenerate - same topic / same tweet
async fn regenerate_same(
    State(state): State<Arc<AppState>>,
    Path((id, item_id)): Path<(String, String)>,
) -> Result<Json<WorkflowResponse>, StatusCode> {
    run_regenerate(state, id, item_id, false).await
}

/// POST /workflows/:id/items/:item_id/regenerate-different - switch context
async fn regenerate_different(
    State(state): State<Arc<AppState>>,
    Path((id, item_id)): Path<(String, String)>,
) -> Result<Json<WorkflowResponse>, StatusCode> {
    run_regenerate(state, id, item_id, true).await
}

enum RegenPlan {
    Post { topic: String, switched: bool },
    Reply { source: SourceTweet, switched: bool },
}

fn plan_regeneration(
    session: &WorkflowSession,
    item_id: &str,
    different: bool,
) -> Result<RegenPlan, WorkflowError> {
    let item = session.item(item_id)?;
    match &item.detail {
        ItemDetail::Post { topic, .. } => {
            if different {
                let next = {
                    let mut rng = rand::rng();
                    pick_different_topic(&session.settings.topics, topic, &mut rng).to_string()
                };
                let switched = next != *topic;
                Ok(RegenPlan::Post {
                    topic: next,
                    switched,
                })
            } else {
                Ok(RegenPlan::Post {
                    topic: topic.clone(),
                    switched: false,
                })
            }
        }
        ItemDetail::Reply { source } => {
            if different {
                let next = {
                    let mut rng = rand::rng();
                    pick_different_source(&session.pool, &source.id, &mut rng)?.clone()
                };
                Ok(RegenPlan::Reply {
                    source: next,
                    switched: true,
                })
            } else {
                Ok(RegenPlan::Reply {
                    source: source.clone(),
                    switched: false,
                })
            }
        }
    }
}

async fn run_regenerate(
    state: Arc<AppState>,
    id: String,
    item_id: String,
    different: bool,
) -> Result<Json<WorkflowResponse>, StatusCode> {
    let action: &'static str = if different {
        "regenerate-different"
    } else {
        "regenerate"
    };

    // Pick the context and mark the item busy under the lock, then drop it
    // before any network call so other items stay interactive.
    let (ticket, plan) = {
        let mut store = state.workflows.lock().unwrap();
        let session = store.get_mut(&id).ok_or(StatusCode::NOT_FOUND)?;
        let plan = match plan_regeneration(session, &item_id, different) {
            Ok(plan) => plan,
            Err(e) => return Ok(Json(WorkflowResponse::err(e.to_string(), Some(session)))),
        };
        let ticket = match session.begin_regenerate(&item_id, action) {
            Ok(ticket) => ticket,
            Err(e) => return Ok(Json(WorkflowResponse::err(e.to_string(), Some(session)))),
        };
        (ticket, plan)
    };

    let outcome = match plan {
        RegenPlan::Post { topic, switched } => {
            regenerate_post(&state.backend, topic, switched).await
        }
        RegenPlan::Reply { source, switched } => {
            regenerate_reply(&state.backend, source, switched).await
        }
    };

    let mut store = state.workflows.lock().unwrap();
    // the session may have been discarded while the call was in flight; the
    // late result is simply dropped
    let session = store.get_mut(&id).ok_or(StatusCode::NOT_FOUND)?;
    let error = outcome.as_ref().err().cloned();
    session.finish_regenerate(ticket, outcome);
    match error {
        None => Ok(Json(WorkflowResponse::ok(session))),
        Some(message) => Ok(Json(WorkflowResponse::err(message, Some(session)))),
    }
}

enum CommitPlan {
    Posting {
        name: String,
        settings: JobSettings,
        posts: Vec<crate::services::backend::ScheduledPost>,
    },
    Replies(Vec<crate::workflow::commit::ApprovedReply>),
}

/// POST /workflows/:id/commit
async fn commit_workflow(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<WorkflowResponse>, StatusCode> {
    let plan = {
        let mut store = state.workflows.lock().unwrap();
        let session = store.get_mut(&id).ok_or(StatusCode::NOT_FOUND)?;
        if let Err(e) = session.begin_commit() {
            return Ok(Json(WorkflowResponse::err(e.to_string(), Some(session))));
        }
        match session.kind {
            JobType::Posting => CommitPlan::Posting {
                name: session.job_name.clone(),
                settings: session.settings.clone(),
                posts: approved_posts(session),
            },
            JobType::Replying => CommitPlan::Replies(approved_replies(session)),
        }
    };

    match plan {
        CommitPlan::Posting {
            name,
            settings,
            posts,
        } => {
            let count = posts.len();
            let result = commit_posting_batch(&state.backend, &name, &settings, &posts).await;

            let mut store = state.workflows.lock().unwrap();
            let session = store.get_mut(&id).ok_or(StatusCode::NOT_FOUND)?;
            match result {
                Ok(job) => {
                    println!("[workflow] {} committed {} posts as job {}", id, count, job.id);
                    session.complete_posting();
                    state.schedule_registry_refresh();
                    let mut response = WorkflowResponse::ok(session);
                    response.job = Some(job);
                    Ok(Json(response))
                }
                Err(e) => {
                    eprintln!("[workflow] {} commit failed: {}", id, e);
                    session.commit_failed(e.to_string());
                    Ok(Json(WorkflowResponse::err(e.to_string(), Some(session))))
                }
            }
        }
        CommitPlan::Replies(approved) => {
            let attempted = approved.len();
            let (posted, failed) = post_approved_replies(&state.backend, approved).await;

            let mut store = state.workflows.lock().unwrap();
            let session = store.get_mut(&id).ok_or(StatusCode::NOT_FOUND)?;
            if let Some(e) = all_replies_failed(&posted, attempted) {
                eprintln!("[workflow] {} commit failed: {}", id, e);
                session.commit_failed(e.to_string());
                return Ok(Json(WorkflowResponse::err(e.to_string(), Some(session))));
            }

            let summary = commit_summary(posted.len(), failed);
            println!("[workflow] {} replies committed: {}", id, summary);
            session.complete_replies(posted, failed);
            state.schedule_registry_refresh();
            let mut response = WorkflowResponse::ok(session);
            response.summary = Some(summary);
            Ok(Json(response))
        }
    }
}
