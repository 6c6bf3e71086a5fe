//! HTTP client for the upstream bot runtime.
//!
//! Every call the dashboard makes against the bot backend goes through
//! `BotBackend`. Non-2xx responses become `BackendError::Status`, HTTP 429
//! becomes the distinguished `RateLimited` variant, and `success: false`
//! envelopes become `BackendError::Api` with the upstream's message.

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::{BotJob, BotStatusSnapshot, JobSettings, JobType, SourceTweet};

#[derive(Debug)]
pub enum BackendError {
    Http(reqwest::Error),
    Status { status: StatusCode, body: String },
    RateLimited,
    Api(String),
}

impl From<reqwest::Error> for BackendError {
    fn from(e: reqwest::Error) -> Self {
        BackendError::Http(e)
    }
}

impl std::fmt::Display for BackendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendError::Http(e) => write!(f, "backend unreachable: {}", e),
            BackendError::Status { status, body } => {
                write!(f, "backend returned {}: {}", status, body)
            }
            BackendError::RateLimited => {
                write!(f, "the posting API is rate limited right now, please wait a bit")
            }
            BackendError::Api(msg) => write!(f, "backend error: {}", msg),
        }
    }
}

impl std::error::Error for BackendError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobAction {
    Start,
    Stop,
    Pause,
}

impl JobAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobAction::Start => "start",
            JobAction::Stop => "stop",
            JobAction::Pause => "pause",
        }
    }
}

/// One generated post candidate as returned by `/api/generate-content`
#[derive(Debug, Clone, Deserialize)]
pub struct GeneratedPost {
    pub content: String,
    #[serde(default)]
    pub hashtags: Vec<String>,
    #[serde(default)]
    pub engagement_score: Option<f64>,
    #[serde(default)]
    pub mentions_tradeup: Option<bool>,
}

/// An approved post carried into the create-posting-job call
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledPost {
    pub content: String,
    pub topic: String,
    pub scheduled_time: chrono::NaiveDateTime,
    pub hashtags: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostReplyRequest {
    pub content: String,
    pub reply_to_tweet_id: String,
    pub original_tweet_author: String,
    pub original_tweet_content: String,
}

/// Result of a successful reply post
#[derive(Debug, Clone)]
pub struct PostedTweet {
    pub tweet_id: String,
    pub tweet_url: String,
}

#[derive(Clone)]
pub struct BotBackend {
    base_url: String,
    http: Client,
}

impl BotBackend {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http: Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/{}", self.base_url, path)
    }

    /// GET /api/bot-status
    pub async fn bot_status(&self) -> Result<BotStatusSnapshot, BackendError> {
        let resp = self.http.get(self.url("bot-status")).send().await?;
        let resp = check_status(resp).await?;
        Ok(resp.json().await?)
    }

    /// POST /api/bot-job/create-posting-job
    pub async fn create_posting_job(
        &self,
        name: &str,
        settings: &JobSettings,
        posts: &[ScheduledPost],
    ) -> Result<BotJob, BackendError> {
        let body = serde_json::json!({
            "type": JobType::Posting,
            "name": name,
            "settings": settings,
            "posts": posts,
        });
        let resp = self
            .http
            .post(self.url("bot-job/create-posting-job"))
            .json(&body)
            .send()
            .await?;
        let wrapper: JobWrapper = check_status(resp).await?.json().await?;
        wrapper.into_job()
    }

    /// POST /api/bot-job/create-reply-job
    pub async fn create_reply_job(
        &self,
        name: &str,
        settings: &JobSettings,
    ) -> Result<BotJob, BackendError> {
        let body = serde_json::json!({
            "type": JobType::Replying,
            "name": name,
            "settings": settings,
        });
        let resp = self
            .http
            .post(self.url("bot-job/create-reply-job"))
            .json(&body)
            .send()
            .await?;
        let wrapper: JobWrapper = check_status(resp).await?.json().await?;
        wrapper.into_job()
    }

    /// POST /api/bot-job/{id}/{start|stop|pause}
    pub async fn job_action(&self, job_id: &str, action: JobAction) -> Result<(), BackendError> {
        let resp = self
            .http
            .post(self.url(&format!("bot-job/{}/{}", job_id, action.as_str())))
            .json(&serde_json::json!({}))
            .send()
            .await?;
        let wrapper: AckWrapper = check_status(resp).await?.json().await?;
        wrapper.into_unit()
    }

    /// POST /api/bot-job/{id}/rename
    pub async fn rename_job(&self, job_id: &str, name: &str) -> Result<(), BackendError> {
        let resp = self
            .http
            .post(self.url(&format!("bot-job/{}/rename", job_id)))
            .json(&serde_json::json!({ "name": name }))
            .send()
            .await?;
        let wrapper: AckWrapper = check_status(resp).await?.json().await?;
        wrapper.into_unit()
    }

    /// POST /api/generate-content, one candidate for one topic
    pub async fn generate_content(&self, topic: &str) -> Result<GeneratedPost, BackendError> {
        let resp = self
            .http
            .post(self.url("generate-content"))
            .json(&serde_json::json!({ "topic": topic, "count": 1 }))
            .send()
            .await?;
        let wrapper: ContentWrapper = check_status(resp).await?.json().await?;
        if !wrapper.success {
            return Err(BackendError::Api(error_message(wrapper.error)));
        }
        wrapper
            .content
            .ok_or_else(|| BackendError::Api("no content in response".to_string()))
    }

    /// GET /api/fetch-tweets-from-sheets, the reply candidate pool
    pub async fn fetch_tweet_pool(&self) -> Result<Vec<SourceTweet>, BackendError> {
        let resp = self
            .http
            .get(self.url("fetch-tweets-from-sheets"))
            .send()
            .await?;
        let wrapper: TweetPoolWrapper = check_status(resp).await?.json().await?;
        if !wrapper.success {
            return Err(BackendError::Api(error_message(wrapper.error)));
        }
        Ok(wrapper.tweets)
    }

    /// POST /api/generate-reply, one reply for one source tweet
    pub async fn generate_reply(
        &self,
        tweet_text: &str,
        tweet_author: &str,
    ) -> Result<String, BackendError> {
        let resp = self
            .http
            .post(self.url("generate-reply"))
            .json(&serde_json::json!({
                "tweet_text": tweet_text,
                "tweet_author": tweet_author,
            }))
            .send()
            .await?;
        let wrapper: ReplyWrapper = check_status(resp).await?.json().await?;
        if !wrapper.success {
            return Err(BackendError::Api(error_message(wrapper.error)));
        }
        wrapper
            .reply
            .ok_or_else(|| BackendError::Api("no reply in response".to_string()))
    }

    /// POST /api/post-reply-with-tracking, immediately posts one reply
    pub async fn post_reply(&self, req: &PostReplyRequest) -> Result<PostedTweet, BackendError> {
        let resp = self
            .http
            .post(self.url("post-reply-with-tracking"))
            .json(req)
            .send()
            .await?;
        let wrapper: PostedWrapper = check_status(resp).await?.json().await?;
        if !wrapper.success {
            return Err(BackendError::Api(error_message(wrapper.error)));
        }
        match (wrapper.tweet_id, wrapper.tweet_url) {
            (Some(tweet_id), Some(tweet_url)) => Ok(PostedTweet { tweet_id, tweet_url }),
            _ => Err(BackendError::Api("no tweet id in response".to_string())),
        }
    }

    /// GET /api/{posts|metrics|topics|engagement|settings}, opaque panel reads
    pub async fn fetch_panel(&self, panel: &str) -> Result<Value, BackendError> {
        let resp = self.http.get(self.url(panel)).send().await?;
        let resp = check_status(resp).await?;
        Ok(resp.json().await?)
    }

    /// POST /api/settings, opaque settings write
    pub async fn update_settings(&self, settings: &Value) -> Result<Value, BackendError> {
        let resp = self
            .http
            .post(self.url("settings"))
            .json(settings)
            .send()
            .await?;
        let resp = check_status(resp).await?;
        Ok(resp.json().await?)
    }
}

/// Map transport-level failures before anyone looks at a body
async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, BackendError> {
    let status = resp.status();
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(BackendError::RateLimited);
    }
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(BackendError::Status { status, body });
    }
    Ok(resp)
}

fn error_message(error: Option<String>) -> String {
    error.unwrap_or_else(|| "unknown backend error".to_string())
}

#[derive(Deserialize)]
struct JobWrapper {
    success: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    job: Option<BotJob>,
}

impl JobWrapper {
    fn into_job(self) -> Result<BotJob, BackendError> {
        if !self.success {
            return Err(BackendError::Api(error_message(self.error)));
        }
        self.job
            .ok_or_else(|| BackendError::Api("no job in response".to_string()))
    }
}

#[derive(Deserialize)]
struct AckWrapper {
    success: bool,
    #[serde(default)]
    error: Option<String>,
}

impl AckWrapper {
    fn into_unit(self) -> Result<(), BackendError> {
        if self.success {
            Ok(())
        } else {
            Err(BackendError::Api(error_message(self.error)))
        }
    }
}

#[derive(Deserialize)]
struct ContentWrapper {
    success: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    content: Option<GeneratedPost>,
}

#[derive(Deserialize)]
struct TweetPoolWrapper {
    success: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    tweets: Vec<SourceTweet>,
}

#[derive(Deserialize)]
struct ReplyWrapper {
    success: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    reply: Option<String>,
}

#[derive(Deserialize)]
struct PostedWrapper {
    success: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    tweet_id: Option<String>,
    #[serde(default)]
    tweet_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_wrapper_decodes_partial_metadata() {
        let json = r#"{
            "success": true,
            "content": {
                "content": "Just pulled a holo Charizard! #PokemonTCG #TradeUp",
                "hashtags": ["PokemonTCG", "TradeUp"],
                "engagement_score": 8.4
            }
        }"#;
        let wrapper: ContentWrapper = serde_json::from_str(json).expect("decode wrapper");
        assert!(wrapper.success);
        let content = wrapper.content.expect("content present");
        assert_eq!(content.hashtags.len(), 2);
        assert_eq!(content.engagement_score, Some(8.4));
        assert_eq!(content.mentions_tradeup, None);
    }

    #[test]
    fn failure_envelope_carries_message() {
        let json = r#"{"success": false, "error": "Failed to generate content"}"#;
        let wrapper: ContentWrapper = serde_json::from_str(json).expect("decode wrapper");
        assert!(!wrapper.success);
        assert_eq!(wrapper.error.as_deref(), Some("Failed to generate content"));
    }

    #[test]
    fn rate_limit_message_tells_the_user_to_wait() {
        let message = BackendError::RateLimited.to_string();
        assert!(message.contains("please wait"));
    }
}
