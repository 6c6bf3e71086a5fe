//! Content generation & approval workflow.
//!
//! One `WorkflowSession` per batch, moving through
//! `Generating -> Reviewing -> Committing -> Done`; closing the session at
//! any point before commit discards the batch with no side effects. All
//! transitions here are synchronous and pure; the async drivers that talk to
//! the backend live in `generate` and `commit`.

pub mod commit;
pub mod generate;

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;

use crate::models::{JobSettings, JobType, SourceTweet};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Generating,
    Reviewing,
    Committing,
    Done,
}

/// Review state of one candidate. `Regenerating` is transient: the item is
/// being overwritten and comes back as `Pending` (or unchanged on failure).
/// There is no durable "rejected" state; rejection always regenerates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Approval {
    Pending,
    Approved,
    Regenerating,
}

#[derive(Debug, Clone)]
pub enum ItemDetail {
    Post {
        topic: String,
        scheduled_time: NaiveDateTime,
        hashtags: Vec<String>,
        engagement_score: Option<f64>,
    },
    Reply {
        source: SourceTweet,
    },
}

#[derive(Debug, Clone)]
pub struct ReviewItem {
    pub id: String,
    pub approval: Approval,
    pub content: String,
    /// Scoped to the last failed action on this item; cleared on success
    pub error: Option<String>,
    pub detail: ItemDetail,
}

/// Display record for one reply posted during commit
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostedReply {
    pub id: String,
    pub content: String,
    pub original_tweet: String,
    pub tweet_author: String,
    pub reply_url: String,
    pub original_tweet_url: String,
    pub posted_at: DateTime<Utc>,
}

#[derive(Debug)]
pub enum WorkflowError {
    InvalidSettings(String),
    Backend(String),
    EmptyPool,
    NoRepliesGenerated,
    ItemNotFound(String),
    ItemBusy(String),
    NothingApproved,
    NoOtherCandidate,
    WrongPhase,
}

impl std::fmt::Display for WorkflowError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkflowError::InvalidSettings(msg) => write!(f, "{}", msg),
            WorkflowError::Backend(msg) => write!(f, "{}", msg),
            WorkflowError::EmptyPool => {
                write!(f, "no candidate tweets available to reply to")
            }
            WorkflowError::NoRepliesGenerated => {
                write!(f, "could not generate any replies for this batch")
            }
            WorkflowError::ItemNotFound(id) => write!(f, "unknown item {}", id),
            WorkflowError::ItemBusy(id) => write!(f, "item {} is still regenerating", id),
            WorkflowError::NothingApproved => {
                write!(f, "approve at least one item before committing")
            }
            WorkflowError::NoOtherCandidate => {
                write!(f, "no other candidate tweet available for this reply")
            }
            WorkflowError::WrongPhase => write!(f, "this batch cannot be changed right now"),
        }
    }
}

impl std::error::Error for WorkflowError {}

/// Handed out by `begin_regenerate`; carries what `finish_regenerate` needs
/// to either apply the new content or roll the item back untouched.
#[derive(Debug)]
pub struct RegenerateTicket {
    pub item_id: String,
    pub action: &'static str,
    prev: Approval,
}

/// New content produced by a regeneration call. A `Some` topic/source means
/// the item switched context ("regenerate for different").
#[derive(Debug)]
pub enum RegeneratedContent {
    Post {
        content: String,
        topic: Option<String>,
        hashtags: Vec<String>,
        engagement_score: Option<f64>,
    },
    Reply {
        content: String,
        source: Option<SourceTweet>,
    },
}

#[derive(Debug)]
pub struct WorkflowSession {
    pub id: String,
    pub kind: JobType,
    pub job_name: String,
    pub settings: JobSettings,
    pub phase: Phase,
    pub items: Vec<ReviewItem>,
    /// Reply flow only: the candidate pool the batch was drawn from
    pub pool: Vec<SourceTweet>,
    pub posted: Vec<PostedReply>,
    pub failed_posts: usize,
    /// "{itemId}-{action}" keys with a regeneration in flight
    pub busy: HashSet<String>,
    /// Batch-scoped error (commit failures land here)
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl WorkflowSession {
    pub fn new(id: String, kind: JobType, job_name: String, settings: JobSettings) -> Self {
        Self {
            id,
            kind,
            job_name,
            settings,
            phase: Phase::Generating,
            items: Vec::new(),
            pool: Vec::new(),
            posted: Vec::new(),
            failed_posts: 0,
            busy: HashSet::new(),
            error: None,
            created_at: Utc::now(),
        }
    }

    /// Generation finished (possibly partially): enter review.
    pub fn begin_review(&mut self, items: Vec<ReviewItem>, pool: Vec<SourceTweet>) {
        self.items = items;
        self.pool = pool;
        self.phase = Phase::Reviewing;
    }

    pub fn item(&self, item_id: &str) -> Result<&ReviewItem, WorkflowError> {
        self.items
            .iter()
            .find(|i| i.id == item_id)
            .ok_or_else(|| WorkflowError::ItemNotFound(item_id.to_string()))
    }

    fn item_mut(&mut self, item_id: &str) -> Result<&mut ReviewItem, WorkflowError> {
        self.items
            .iter_mut()
            .find(|i| i.id == item_id)
            .ok_or_else(|| WorkflowError::ItemNotFound(item_id.to_string()))
    }

    /// Approve a candidate. Idempotent: approving an approved item is a
    /// no-op. An item mid-regeneration cannot be approved.
    pub fn approve(&mut self, item_id: &str) -> Result<(), WorkflowError> {
        if self.phase != Phase::Reviewing {
            return Err(WorkflowError::WrongPhase);
        }
        let item = self.item_mut(item_id)?;
        match item.approval {
            Approval::Approved => Ok(()),
            Approval::Regenerating => Err(WorkflowError::ItemBusy(item_id.to_string())),
            Approval::Pending => {
                item.approval = Approval::Approved;
                item.error = None;
                Ok(())
            }
        }
    }

    pub fn approved_count(&self) -> usize {
        self.items
            .iter()
            .filter(|i| i.approval == Approval::Approved)
            .count()
    }

    /// Mark an item as regenerating and remember its previous state so a
    /// failed call can leave it exactly as it was.
    pub fn begin_regenerate(
        &mut self,
        item_id: &str,
        action: &'static str,
    ) -> Result<RegenerateTicket, WorkflowError> {
        if self.phase != Phase::Reviewing {
            return Err(WorkflowError::WrongPhase);
        }
        let item = self.item_mut(item_id)?;
        if item.approval == Approval::Regenerating {
            return Err(WorkflowError::ItemBusy(item_id.to_string()));
        }
        let prev = item.approval;
        item.approval = Approval::Regenerating;
        self.busy.insert(format!("{}-{}", item_id, action));
        Ok(RegenerateTicket {
            item_id: item_id.to_string(),
            action,
            prev,
        })
    }

    /// Apply the result of a regeneration call. Success replaces content and
    /// metadata and sends the item back to pending review; failure restores
    /// the previous approval and stores an item-scoped error.
    pub fn finish_regenerate(
        &mut self,
        ticket: RegenerateTicket,
        outcome: Result<RegeneratedContent, String>,
    ) {
        self.busy
            .remove(&format!("{}-{}", ticket.item_id, ticket.action));
        let Ok(item) = self.item_mut(&ticket.item_id) else {
            return;
        };
        match outcome {
            Ok(RegeneratedContent::Post {
                content,
                topic,
                hashtags,
                engagement_score,
            }) => {
                item.content = content;
                item.error = None;
                item.approval = Approval::Pending;
                if let ItemDetail::Post {
                    topic: item_topic,
                    hashtags: item_hashtags,
                    engagement_score: item_score,
                    ..
                } = &mut item.detail
                {
                    if let Some(topic) = topic {
                        *item_topic = topic;
                    }
                    *item_hashtags = hashtags;
                    *item_score = engagement_score;
                }
            }
            Ok(RegeneratedContent::Reply { content, source }) => {
                item.content = content;
                item.error = None;
                item.approval = Approval::Pending;
                if let (ItemDetail::Reply { source: item_source }, Some(source)) =
                    (&mut item.detail, source)
                {
                    *item_source = source;
                }
            }
            Err(message) => {
                item.approval = ticket.prev;
                item.error = Some(message);
            }
        }
    }

    /// Commit guard: refuse with a validation error before any network call
    /// unless at least one item is approved.
    pub fn begin_commit(&mut self) -> Result<(), WorkflowError> {
        if self.phase != Phase::Reviewing {
            return Err(WorkflowError::WrongPhase);
        }
        if self.approved_count() == 0 {
            return Err(WorkflowError::NothingApproved);
        }
        self.phase = Phase::Committing;
        self.error = None;
        Ok(())
    }

    /// Commit failed outright: back to review with approvals intact so the
    /// user can retry without re-approving anything.
    pub fn commit_failed(&mut self, message: String) {
        self.phase = Phase::Reviewing;
        self.error = Some(message);
    }

    pub fn complete_posting(&mut self) {
        self.phase = Phase::Done;
    }

    pub fn complete_replies(&mut self, posted: Vec<PostedReply>, failed: usize) {
        self.posted = posted;
        self.failed_posts = failed;
        self.phase = Phase::Done;
    }
}

/// All live workflow sessions, plus the flag that blocks a second
/// batch-generation loop while one is running.
#[derive(Default)]
pub struct WorkflowStore {
    sessions: HashMap<String, WorkflowSession>,
    next_id: u64,
    generating: bool,
}

impl WorkflowStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate_id(&mut self) -> String {
        self.next_id += 1;
        format!("wf-{}", self.next_id)
    }

    pub fn insert(&mut self, session: WorkflowSession) {
        self.sessions.insert(session.id.clone(), session);
    }

    pub fn get(&self, id: &str) -> Option<&WorkflowSession> {
        self.sessions.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut WorkflowSession> {
        self.sessions.get_mut(id)
    }

    /// Discard a batch entirely; no side effects beyond forgetting it
    pub fn remove(&mut self, id: &str) -> Option<WorkflowSession> {
        self.sessions.remove(id)
    }

    pub fn try_begin_generation(&mut self) -> bool {
        if self.generating {
            false
        } else {
            self.generating = true;
            true
        }
    }

    pub fn end_generation(&mut self) {
        self.generating = false;
    }
}
