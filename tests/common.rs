//! In-process fake of the upstream bot runtime, bound on 127.0.0.1:0.
//! Tests point a real `BotBackend` (or a full `AppState`) at it and flip the
//! failure switches to exercise the error paths.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};
use serde_json::{Value, json};

#[derive(Default)]
pub struct FakeUpstream {
    /// Per-endpoint call counters
    pub counts: HashMap<String, usize>,
    /// Bodies received by create/job endpoints, keyed by endpoint name
    pub received: Vec<(String, Value)>,
    /// Tweets served by /api/fetch-tweets-from-sheets
    pub pool: Vec<Value>,
    /// Jobs served by /api/bot-status
    pub jobs: Vec<Value>,
    /// When true, /api/bot-status answers 500
    pub fail_status: bool,
    /// 1-based generate-content calls that fail
    pub fail_generate_calls: Vec<usize>,
    /// 1-based generate-reply calls that fail
    pub fail_reply_calls: Vec<usize>,
    /// 1-based post-reply calls that fail
    pub fail_post_calls: Vec<usize>,
}

pub type Shared = Arc<Mutex<FakeUpstream>>;

pub fn shared(fake: FakeUpstream) -> Shared {
    Arc::new(Mutex::new(fake))
}

pub fn tweet(id: &str, text: &str, author: &str) -> Value {
    json!({ "id": id, "text": text, "author": author })
}

pub fn job(id: &str, name: &str, status: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "type": "posting",
        "status": status,
        "settings": {},
        "lastRun": null,
        "nextRun": null
    })
}

pub fn count(shared: &Shared, endpoint: &str) -> usize {
    shared
        .lock()
        .unwrap()
        .counts
        .get(endpoint)
        .copied()
        .unwrap_or(0)
}

fn bump(fake: &mut FakeUpstream, endpoint: &str) -> usize {
    let n = fake.counts.entry(endpoint.to_string()).or_insert(0);
    *n += 1;
    *n
}

/// Serve the fake upstream; returns its base URL
pub async fn spawn_upstream(shared: Shared) -> String {
    let app = Router::new()
        .route("/api/bot-status", get(bot_status))
        .route("/api/generate-content", post(generate_content))
        .route("/api/fetch-tweets-from-sheets", get(tweet_pool))
        .route("/api/generate-reply", post(generate_reply))
        .route("/api/post-reply-with-tracking", post(post_reply))
        .route("/api/bot-job/create-posting-job", post(create_posting_job))
        .route("/api/bot-job/create-reply-job", post(create_reply_job))
        .route("/api/bot-job/{id}/{action}", post(job_command))
        .with_state(shared);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind fake upstream");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("fake upstream");
    });
    format!("http://{}", addr)
}

async fn bot_status(State(shared): State<Shared>) -> Result<Json<Value>, StatusCode> {
    let mut fake = shared.lock().unwrap();
    bump(&mut fake, "bot-status");
    if fake.fail_status {
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }
    let running = fake
        .jobs
        .iter()
        .any(|j| j["status"].as_str() == Some("running"));
    Ok(Json(json!({
        "running": running,
        "jobs": fake.jobs.clone(),
        "lastRun": null,
        "stats": { "postsToday": 0, "repliesToday": 0, "successRate": 100.0 }
    })))
}

async fn generate_content(State(shared): State<Shared>, Json(body): Json<Value>) -> Json<Value> {
    let mut fake = shared.lock().unwrap();
    let n = bump(&mut fake, "generate-content");
    if fake.fail_generate_calls.contains(&n) {
        return Json(json!({ "success": false, "error": "generation failed" }));
    }
    let topic = body["topic"].as_str().unwrap_or("Pokemon").to_string();
    Json(json!({
        "success": true,
        "content": {
            "content": format!("Post {} about {} #PokemonTCG #TradeUp", n, topic),
            "hashtags": ["PokemonTCG", "TradeUp"],
            "engagement_score": 7.5
        }
    }))
}

async fn tweet_pool(State(shared): State<Shared>) -> Json<Value> {
    let mut fake = shared.lock().unwrap();
    bump(&mut fake, "fetch-tweets");
    Json(json!({ "success": true, "tweets": fake.pool.clone() }))
}

async fn generate_reply(State(shared): State<Shared>, Json(body): Json<Value>) -> Json<Value> {
    let mut fake = shared.lock().unwrap();
    let n = bump(&mut fake, "generate-reply");
    if fake.fail_reply_calls.contains(&n) {
        return Json(json!({ "success": false, "error": "reply generation failed" }));
    }
    let author = body["tweet_author"].as_str().unwrap_or("someone").to_string();
    Json(json!({
        "success": true,
        "reply": format!("Great pull, @{}! What set is it from?", author)
    }))
}

async fn post_reply(State(shared): State<Shared>, Json(body): Json<Value>) -> Json<Value> {
    let mut fake = shared.lock().unwrap();
    let n = bump(&mut fake, "post-reply");
    fake.received.push(("post-reply".to_string(), body));
    if fake.fail_post_calls.contains(&n) {
        return Json(json!({ "success": false, "error": "Too Many Requests" }));
    }
    Json(json!({
        "success": true,
        "tweet_id": format!("90000{}", n),
        "tweet_url": format!("https://twitter.com/tradeup/status/90000{}", n)
    }))
}

async fn create_posting_job(
    State(shared): State<Shared>,
    Json(body): Json<Value>,
) -> Json<Value> {
    let mut fake = shared.lock().unwrap();
    bump(&mut fake, "create-posting-job");
    fake.received.push(("create-posting-job".to_string(), body.clone()));
    Json(json!({
        "success": true,
        "job": {
            "id": "posting-1754500000",
            "name": body["name"],
            "type": "posting",
            "status": "stopped",
            "settings": body["settings"],
            "lastRun": null,
            "nextRun": null
        }
    }))
}

async fn create_reply_job(State(shared): State<Shared>, Json(body): Json<Value>) -> Json<Value> {
    let mut fake = shared.lock().unwrap();
    bump(&mut fake, "create-reply-job");
    fake.received.push(("create-reply-job".to_string(), body.clone()));
    Json(json!({
        "success": true,
        "job": {
            "id": "replying-1754500001",
            "name": body["name"],
            "type": "replying",
            "status": "stopped",
            "settings": body["settings"],
            "lastRun": null,
            "nextRun": null
        }
    }))
}

async fn job_command(
    State(shared): State<Shared>,
    Path((id, action)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Json<Value> {
    let mut fake = shared.lock().unwrap();
    bump(&mut fake, &format!("job/{}", action));
    fake.received.push((format!("job/{}/{}", id, action), body));
    Json(json!({ "success": true }))
}
