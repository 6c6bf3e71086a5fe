//! Shared data models used across modules. Field names follow the upstream
//! bot runtime's wire shape (camelCase JSON).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_REPLY_BATCH, TWEET_URL_BASE};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobType {
    Posting,
    Replying,
}

impl JobType {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobType::Posting => "posting",
            JobType::Replying => "replying",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Running,
    Stopped,
    Paused,
}

/// Per-job counters maintained by the upstream bot runtime
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JobStats {
    pub posts_today: i64,
    pub replies_today: i64,
    pub success_rate: f64,
}

impl Default for JobStats {
    fn default() -> Self {
        Self {
            posts_today: 0,
            replies_today: 0,
            success_rate: 100.0,
        }
    }
}

/// One bot job as reported by the upstream job list. Timestamps are kept as
/// the upstream's opaque ISO strings; the dashboard only formats them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BotJob {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub job_type: JobType,
    pub status: JobStatus,
    #[serde(default)]
    pub settings: JobSettings,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub last_run: Option<String>,
    #[serde(default)]
    pub next_run: Option<String>,
    #[serde(default)]
    pub stats: Option<JobStats>,
}

/// Configuration blob shared by both job types. Posting jobs use the
/// schedule/topics half, reply jobs the reply half.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct JobSettings {
    pub posts_per_day: u32,
    pub topics: Vec<String>,
    /// "HH:MM", start of the daily posting window
    pub posting_time_start: String,
    /// "HH:MM", end of the daily posting window; must be after the start
    pub posting_time_end: String,
    /// "YYYY-MM-DD"; empty means today
    pub posting_date: String,
    pub content_types: BTreeMap<String, bool>,
    pub max_replies_per_hour: u32,
    /// How many reply candidates one batch generates
    pub reply_count: u32,
}

impl Default for JobSettings {
    fn default() -> Self {
        let content_types = [
            ("cardPulls", true),
            ("deckBuilding", true),
            ("marketAnalysis", true),
            ("tournaments", true),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        Self {
            posts_per_day: 12,
            topics: Vec::new(),
            posting_time_start: "09:00".to_string(),
            posting_time_end: "21:00".to_string(),
            posting_date: String::new(),
            content_types,
            max_replies_per_hour: 10,
            reply_count: DEFAULT_REPLY_BATCH,
        }
    }
}

/// A candidate source tweet from the sheet-backed pool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceTweet {
    pub id: String,
    pub text: String,
    pub author: String,
}

impl SourceTweet {
    pub fn url(&self) -> String {
        format!("{}/{}/status/{}", TWEET_URL_BASE, self.author, self.id)
    }
}

/// The full bot-status snapshot returned by one successful poll
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BotStatusSnapshot {
    #[serde(default)]
    pub running: bool,
    #[serde(default)]
    pub jobs: Vec<BotJob>,
    #[serde(default)]
    pub last_run: Option<String>,
    #[serde(default)]
    pub uptime: Option<String>,
    #[serde(default)]
    pub stats: Option<JobStats>,
}
