//! Batch generation drivers and the pure helpers behind them.
//!
//! Generation is sequential: each call is awaited before the next begins, so
//! item order is deterministic and a source tweet always lines up with its
//! generated reply.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rand::Rng;

use crate::constants::{MAX_POSTS_PER_DAY, MAX_REPLY_BATCH, MIN_POSTS_PER_DAY};
use crate::models::{JobSettings, SourceTweet};
use crate::services::backend::BotBackend;
use crate::workflow::{Approval, ItemDetail, RegeneratedContent, ReviewItem, WorkflowError};

/// Validate and unpack the posting schedule settings
pub fn parse_window(settings: &JobSettings) -> Result<(NaiveTime, NaiveTime, NaiveDate), WorkflowError> {
    if settings.posts_per_day < MIN_POSTS_PER_DAY || settings.posts_per_day > MAX_POSTS_PER_DAY {
        return Err(WorkflowError::InvalidSettings(format!(
            "posts per day must be between {} and {}",
            MIN_POSTS_PER_DAY, MAX_POSTS_PER_DAY
        )));
    }
    if settings.topics.is_empty() {
        return Err(WorkflowError::InvalidSettings(
            "pick at least one topic".to_string(),
        ));
    }
    let start = NaiveTime::parse_from_str(&settings.posting_time_start, "%H:%M").map_err(|_| {
        WorkflowError::InvalidSettings(format!(
            "invalid start time {:?}",
            settings.posting_time_start
        ))
    })?;
    let end = NaiveTime::parse_from_str(&settings.posting_time_end, "%H:%M").map_err(|_| {
        WorkflowError::InvalidSettings(format!("invalid end time {:?}", settings.posting_time_end))
    })?;
    if end <= start {
        return Err(WorkflowError::InvalidSettings(
            "posting window must end after it starts".to_string(),
        ));
    }
    let date = if settings.posting_date.is_empty() {
        Utc::now().date_naive()
    } else {
        NaiveDate::parse_from_str(&settings.posting_date, "%Y-%m-%d").map_err(|_| {
            WorkflowError::InvalidSettings(format!("invalid date {:?}", settings.posting_date))
        })?
    };
    Ok((start, end, date))
}

/// Divide the window into `count` equal slots; slot width is floor-divided
/// minutes so the last slot never spills past the window end.
pub fn schedule_slots(start: NaiveTime, end: NaiveTime, count: u32) -> Vec<NaiveTime> {
    let window_minutes = (end - start).num_minutes();
    let slot_width = window_minutes / count as i64;
    (0..count as i64)
        .map(|i| start + chrono::TimeDelta::minutes(i * slot_width))
        .collect()
}

pub fn pick_topic<'a>(topics: &'a [String], rng: &mut impl Rng) -> &'a str {
    &topics[rng.random_range(0..topics.len())]
}

/// Pick a topic other than `current`. With a single-topic configuration
/// there is nothing else to pick, so same-topic regeneration is the
/// fallback rather than an error.
pub fn pick_different_topic<'a>(
    topics: &'a [String],
    current: &str,
    rng: &mut impl Rng,
) -> &'a str {
    let others: Vec<&String> = topics.iter().filter(|t| t.as_str() != current).collect();
    if others.is_empty() {
        return current_or_first(topics, current);
    }
    others[rng.random_range(0..others.len())]
}

fn current_or_first<'a>(topics: &'a [String], current: &str) -> &'a str {
    topics
        .iter()
        .find(|t| t.as_str() == current)
        .unwrap_or(&topics[0])
}

/// Pick a source tweet other than the current one. Unlike topics, reusing
/// the same tweet silently would be misleading, so an exhausted pool is an
/// error the user sees.
pub fn pick_different_source<'a>(
    pool: &'a [SourceTweet],
    current_id: &str,
    rng: &mut impl Rng,
) -> Result<&'a SourceTweet, WorkflowError> {
    let others: Vec<&SourceTweet> = pool.iter().filter(|t| t.id != current_id).collect();
    if others.is_empty() {
        return Err(WorkflowError::NoOtherCandidate);
    }
    Ok(others[rng.random_range(0..others.len())])
}

/// Generate one posting batch: `posts_per_day` sequential generation calls,
/// one uniform-random topic each (repetition allowed). A failed call only
/// loses its own slot; the batch proceeds with whatever succeeded.
pub async fn run_posting_generation(
    backend: &BotBackend,
    settings: &JobSettings,
) -> Result<Vec<ReviewItem>, WorkflowError> {
    let (start, end, date) = parse_window(settings)?;
    let slots = schedule_slots(start, end, settings.posts_per_day);

    // topics are drawn up front so the rng never crosses an await
    let picks: Vec<String> = {
        let mut rng = rand::rng();
        (0..settings.posts_per_day)
            .map(|_| pick_topic(&settings.topics, &mut rng).to_string())
            .collect()
    };

    let mut items = Vec::new();
    for (i, topic) in picks.iter().enumerate() {
        match backend.generate_content(topic).await {
            Ok(post) => items.push(post_item(
                format!("item-{}", i + 1),
                topic.clone(),
                date.and_time(slots[i]),
                post.content,
                post.hashtags,
                post.engagement_score,
            )),
            Err(e) => {
                eprintln!("[workflow] slot {} ({}) generation failed: {}", i + 1, topic, e);
            }
        }
    }
    Ok(items)
}

/// Generate one reply batch. The pool is fetched first and an empty pool
/// aborts before any generation call; a batch where every generation call
/// failed aborts too. Partial success proceeds with the successful subset.
pub async fn run_reply_generation(
    backend: &BotBackend,
    settings: &JobSettings,
) -> Result<(Vec<ReviewItem>, Vec<SourceTweet>), WorkflowError> {
    let pool = backend
        .fetch_tweet_pool()
        .await
        .map_err(|e| WorkflowError::Backend(e.to_string()))?;
    if pool.is_empty() {
        return Err(WorkflowError::EmptyPool);
    }

    let count = settings.reply_count.clamp(1, MAX_REPLY_BATCH) as usize;
    let mut items = Vec::new();
    for (i, tweet) in pool.iter().take(count).enumerate() {
        match backend.generate_reply(&tweet.text, &tweet.author).await {
            Ok(reply) => items.push(reply_item(format!("item-{}", i + 1), reply, tweet.clone())),
            Err(e) => {
                eprintln!("[workflow] reply for tweet {} failed: {}", tweet.id, e);
            }
        }
    }
    if items.is_empty() {
        return Err(WorkflowError::NoRepliesGenerated);
    }
    Ok((items, pool))
}

/// Regenerate a post candidate. `topic_switched` records whether this was a
/// "different topic" action so the item's metadata follows the switch.
pub async fn regenerate_post(
    backend: &BotBackend,
    topic: String,
    topic_switched: bool,
) -> Result<RegeneratedContent, String> {
    let post = backend
        .generate_content(&topic)
        .await
        .map_err(|e| e.to_string())?;
    Ok(RegeneratedContent::Post {
        content: post.content,
        topic: topic_switched.then_some(topic),
        hashtags: post.hashtags,
        engagement_score: post.engagement_score,
    })
}

/// Regenerate a reply candidate against `source`, which is the item's own
/// source for a same-context action or a different pool entry otherwise.
pub async fn regenerate_reply(
    backend: &BotBackend,
    source: SourceTweet,
    source_switched: bool,
) -> Result<RegeneratedContent, String> {
    let reply = backend
        .generate_reply(&source.text, &source.author)
        .await
        .map_err(|e| e.to_string())?;
    Ok(RegeneratedContent::Reply {
        content: reply,
        source: source_switched.then_some(source),
    })
}

fn post_item(
    id: String,
    topic: String,
    scheduled_time: NaiveDateTime,
    content: String,
    hashtags: Vec<String>,
    engagement_score: Option<f64>,
) -> ReviewItem {
    ReviewItem {
        id,
        approval: Approval::Pending,
        content,
        error: None,
        detail: ItemDetail::Post {
            topic,
            scheduled_time,
            hashtags,
            engagement_score,
        },
    }
}

fn reply_item(id: String, content: String, source: SourceTweet) -> ReviewItem {
    ReviewItem {
        id,
        approval: Approval::Pending,
        content,
        error: None,
        detail: ItemDetail::Reply { source },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn settings(posts_per_day: u32, start: &str, end: &str) -> JobSettings {
        JobSettings {
            posts_per_day,
            topics: vec!["Charizard".to_string()],
            posting_time_start: start.to_string(),
            posting_time_end: end.to_string(),
            posting_date: "2026-08-07".to_string(),
            ..JobSettings::default()
        }
    }

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn four_slots_across_an_eight_hour_window() {
        let slots = schedule_slots(t(9, 0), t(17, 0), 4);
        assert_eq!(slots, vec![t(9, 0), t(11, 0), t(13, 0), t(15, 0)]);
    }

    #[test]
    fn uneven_windows_floor_divide_and_never_overflow() {
        // 480 minutes / 7 posts = 68 minute slots
        let slots = schedule_slots(t(9, 0), t(17, 0), 7);
        assert_eq!(slots.len(), 7);
        assert_eq!(slots[1] - slots[0], chrono::TimeDelta::minutes(68));
        assert!(*slots.last().unwrap() < t(17, 0));
        assert_eq!(*slots.last().unwrap(), t(15, 48));
    }

    #[test]
    fn window_must_end_after_start() {
        let bad = settings(4, "17:00", "09:00");
        assert!(matches!(
            parse_window(&bad),
            Err(WorkflowError::InvalidSettings(_))
        ));
        let degenerate = settings(4, "09:00", "09:00");
        assert!(parse_window(&degenerate).is_err());
    }

    #[test]
    fn posts_per_day_is_bounded() {
        assert!(parse_window(&settings(0, "09:00", "17:00")).is_err());
        assert!(parse_window(&settings(21, "09:00", "17:00")).is_err());
        assert!(parse_window(&settings(20, "09:00", "17:00")).is_ok());
    }

    #[test]
    fn different_topic_falls_back_to_same_when_alone() {
        let topics = vec!["Charizard".to_string()];
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(
            pick_different_topic(&topics, "Charizard", &mut rng),
            "Charizard"
        );
    }

    #[test]
    fn different_topic_never_repeats_the_current_one() {
        let topics = vec![
            "Charizard".to_string(),
            "Pikachu".to_string(),
            "Booster Packs".to_string(),
        ];
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            assert_ne!(pick_different_topic(&topics, "Pikachu", &mut rng), "Pikachu");
        }
    }

    #[test]
    fn different_source_errors_when_pool_is_exhausted() {
        let pool = vec![SourceTweet {
            id: "42".to_string(),
            text: "nice pull".to_string(),
            author: "collector".to_string(),
        }];
        let mut rng = StdRng::seed_from_u64(7);
        assert!(matches!(
            pick_different_source(&pool, "42", &mut rng),
            Err(WorkflowError::NoOtherCandidate)
        ));
    }

    #[test]
    fn different_source_skips_the_current_tweet() {
        let pool: Vec<SourceTweet> = (0..3)
            .map(|i| SourceTweet {
                id: i.to_string(),
                text: format!("tweet {}", i),
                author: "collector".to_string(),
            })
            .collect();
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let picked = pick_different_source(&pool, "1", &mut rng).unwrap();
            assert_ne!(picked.id, "1");
        }
    }
}
