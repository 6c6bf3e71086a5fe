//! Commit drivers. The two flows are asymmetric: a posting batch is
//! registered upstream as one scheduled job, while a reply batch posts each
//! approved reply immediately, one sequential call per item.

use chrono::Utc;

use crate::models::BotJob;
use crate::services::backend::{
    BackendError, BotBackend, PostReplyRequest, ScheduledPost,
};
use crate::workflow::{
    Approval, ItemDetail, PostedReply, WorkflowError, WorkflowSession,
};

/// An approved reply lifted out of the session for the posting loop
#[derive(Debug, Clone)]
pub struct ApprovedReply {
    pub item_id: String,
    pub content: String,
    pub source: crate::models::SourceTweet,
}

/// Collect the approved posting items with their topics and assigned slots
pub fn approved_posts(session: &WorkflowSession) -> Vec<ScheduledPost> {
    session
        .items
        .iter()
        .filter(|item| item.approval == Approval::Approved)
        .filter_map(|item| match &item.detail {
            ItemDetail::Post {
                topic,
                scheduled_time,
                hashtags,
                ..
            } => Some(ScheduledPost {
                content: item.content.clone(),
                topic: topic.clone(),
                scheduled_time: *scheduled_time,
                hashtags: hashtags.clone(),
            }),
            ItemDetail::Reply { .. } => None,
        })
        .collect()
}

/// Collect the approved reply items with their source tweets
pub fn approved_replies(session: &WorkflowSession) -> Vec<ApprovedReply> {
    session
        .items
        .iter()
        .filter(|item| item.approval == Approval::Approved)
        .filter_map(|item| match &item.detail {
            ItemDetail::Reply { source } => Some(ApprovedReply {
                item_id: item.id.clone(),
                content: item.content.clone(),
                source: source.clone(),
            }),
            ItemDetail::Post { .. } => None,
        })
        .collect()
}

/// Package the whole approved posting batch into one create-job call
pub async fn commit_posting_batch(
    backend: &BotBackend,
    name: &str,
    session_settings: &crate::models::JobSettings,
    posts: &[ScheduledPost],
) -> Result<BotJob, BackendError> {
    backend
        .create_posting_job(name, session_settings, posts)
        .await
}

/// Post every approved reply in order, capturing a per-item `Result` instead
/// of aborting the loop on the first failure. Returns the display records
/// for the successes plus how many items failed.
pub async fn post_approved_replies(
    backend: &BotBackend,
    approved: Vec<ApprovedReply>,
) -> (Vec<PostedReply>, usize) {
    let mut results: Vec<Result<PostedReply, String>> = Vec::with_capacity(approved.len());
    for reply in &approved {
        let request = PostReplyRequest {
            content: reply.content.clone(),
            reply_to_tweet_id: reply.source.id.clone(),
            original_tweet_author: reply.source.author.clone(),
            original_tweet_content: reply.source.text.clone(),
        };
        let outcome = backend
            .post_reply(&request)
            .await
            .map(|posted| PostedReply {
                id: posted.tweet_id,
                content: reply.content.clone(),
                original_tweet: reply.source.text.clone(),
                tweet_author: reply.source.author.clone(),
                reply_url: posted.tweet_url,
                original_tweet_url: reply.source.url(),
                posted_at: Utc::now(),
            })
            .map_err(|e| e.to_string());
        if let Err(e) = &outcome {
            eprintln!(
                "[workflow] posting reply to tweet {} failed: {}",
                reply.source.id, e
            );
        }
        results.push(outcome);
    }

    let failed = results.iter().filter(|r| r.is_err()).count();
    let posted = results.into_iter().filter_map(Result::ok).collect();
    (posted, failed)
}

/// Summary line for the results view ("4 posted, 1 failed")
pub fn commit_summary(posted: usize, failed: usize) -> String {
    if failed == 0 {
        format!("{} posted", posted)
    } else {
        format!("{} posted, {} failed", posted, failed)
    }
}

/// Zero successes is a hard failure for the whole commit
pub fn all_replies_failed(posted: &[PostedReply], attempted: usize) -> Option<WorkflowError> {
    if posted.is_empty() && attempted > 0 {
        Some(WorkflowError::Backend(format!(
            "none of the {} approved replies could be posted",
            attempted
        )))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{JobSettings, JobType, SourceTweet};
    use crate::workflow::ReviewItem;

    fn reply_session() -> WorkflowSession {
        let mut session = WorkflowSession::new(
            "wf-1".to_string(),
            JobType::Replying,
            "Job #1".to_string(),
            JobSettings::default(),
        );
        let items = (1..=3)
            .map(|i| ReviewItem {
                id: format!("item-{}", i),
                approval: Approval::Pending,
                content: format!("reply {}", i),
                error: None,
                detail: ItemDetail::Reply {
                    source: SourceTweet {
                        id: format!("{}", 100 + i),
                        text: format!("original {}", i),
                        author: "collector".to_string(),
                    },
                },
            })
            .collect();
        session.begin_review(items, Vec::new());
        session
    }

    #[test]
    fn only_approved_items_are_collected() {
        let mut session = reply_session();
        session.approve("item-1").unwrap();
        session.approve("item-3").unwrap();

        let approved = approved_replies(&session);
        let ids: Vec<&str> = approved.iter().map(|r| r.item_id.as_str()).collect();
        assert_eq!(ids, vec!["item-1", "item-3"]);
        assert_eq!(approved[1].source.id, "103");
    }

    #[test]
    fn summary_reports_partial_failures() {
        assert_eq!(commit_summary(4, 0), "4 posted");
        assert_eq!(commit_summary(4, 1), "4 posted, 1 failed");
    }

    #[test]
    fn zero_successes_is_a_hard_error() {
        assert!(all_replies_failed(&[], 5).is_some());
        let one = PostedReply {
            id: "9".to_string(),
            content: "r".to_string(),
            original_tweet: "o".to_string(),
            tweet_author: "a".to_string(),
            reply_url: "u".to_string(),
            original_tweet_url: "ou".to_string(),
            posted_at: Utc::now(),
        };
        assert!(all_replies_failed(&[one], 5).is_none());
    }
}
