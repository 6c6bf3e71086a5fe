//! Engine-level workflow tests against the in-process fake upstream.

mod common;

use botops::models::{JobSettings, JobType};
use botops::services::backend::BotBackend;
use botops::workflow::commit::{
    all_replies_failed, approved_posts, approved_replies, commit_posting_batch,
    post_approved_replies,
};
use botops::workflow::generate::{run_posting_generation, run_reply_generation};
use botops::workflow::{ItemDetail, Phase, WorkflowError, WorkflowSession};

use common::{FakeUpstream, count, shared, spawn_upstream, tweet};

fn posting_settings() -> JobSettings {
    JobSettings {
        posts_per_day: 4,
        topics: vec!["Charizard".to_string(), "Pikachu".to_string()],
        posting_time_start: "09:00".to_string(),
        posting_time_end: "17:00".to_string(),
        posting_date: "2026-08-07".to_string(),
        ..JobSettings::default()
    }
}

fn five_tweets() -> Vec<serde_json::Value> {
    (1..=5)
        .map(|i| {
            tweet(
                &format!("10{}", i),
                &format!("Check out pull number {}", i),
                &format!("collector{}", i),
            )
        })
        .collect()
}

#[tokio::test]
async fn empty_pool_aborts_before_any_generation_call() {
    let fake = shared(FakeUpstream::default());
    let base = spawn_upstream(fake.clone()).await;
    let backend = BotBackend::new(&base);

    let result = run_reply_generation(&backend, &JobSettings::default()).await;
    assert!(matches!(result, Err(WorkflowError::EmptyPool)));
    assert_eq!(count(&fake, "generate-reply"), 0, "no generation attempted");
}

#[tokio::test]
async fn reply_generation_proceeds_with_the_successful_subset() {
    let fake = shared(FakeUpstream {
        pool: five_tweets(),
        fail_reply_calls: vec![2],
        ..FakeUpstream::default()
    });
    let base = spawn_upstream(fake.clone()).await;
    let backend = BotBackend::new(&base);

    let (items, pool) = run_reply_generation(&backend, &JobSettings::default())
        .await
        .expect("partial batch succeeds");

    assert_eq!(pool.len(), 5);
    let ids: Vec<&str> = items.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, vec!["item-1", "item-3", "item-4", "item-5"]);
    // each surviving reply still lines up with its own source tweet
    for item in &items {
        let ItemDetail::Reply { source } = &item.detail else {
            panic!("reply item expected");
        };
        assert!(item.content.contains(&source.author));
    }
}

#[tokio::test]
async fn reply_generation_with_zero_successes_aborts() {
    let fake = shared(FakeUpstream {
        pool: five_tweets(),
        fail_reply_calls: vec![1, 2, 3, 4, 5],
        ..FakeUpstream::default()
    });
    let base = spawn_upstream(fake.clone()).await;
    let backend = BotBackend::new(&base);

    let result = run_reply_generation(&backend, &JobSettings::default()).await;
    assert!(matches!(result, Err(WorkflowError::NoRepliesGenerated)));
}

#[tokio::test]
async fn partial_reply_commit_keeps_the_successes() {
    let fake = shared(FakeUpstream {
        pool: five_tweets(),
        fail_post_calls: vec![3],
        ..FakeUpstream::default()
    });
    let base = spawn_upstream(fake.clone()).await;
    let backend = BotBackend::new(&base);

    let settings = JobSettings::default();
    let (items, pool) = run_reply_generation(&backend, &settings).await.unwrap();

    let mut session = WorkflowSession::new(
        "wf-1".to_string(),
        JobType::Replying,
        "Job #1".to_string(),
        settings,
    );
    session.begin_review(items, pool);
    for item_id in ["item-1", "item-2", "item-3", "item-4", "item-5"] {
        session.approve(item_id).unwrap();
    }
    session.begin_commit().unwrap();

    let approved = approved_replies(&session);
    assert_eq!(approved.len(), 5);

    let attempted = approved.len();
    let (posted, failed) = post_approved_replies(&backend, approved).await;

    assert_eq!(posted.len(), 4, "the four successes are not reverted");
    assert_eq!(failed, 1);
    assert!(all_replies_failed(&posted, attempted).is_none());

    // call #3 was consumed by the failing item
    let reply_ids: Vec<&str> = posted.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(reply_ids, vec!["900001", "900002", "900004", "900005"]);

    // records link both directions
    assert_eq!(
        posted[0].original_tweet_url,
        "https://twitter.com/collector1/status/101"
    );
    assert!(posted[0].reply_url.contains("twitter.com/tradeup/status/"));

    session.complete_replies(posted, failed);
    assert_eq!(session.phase, Phase::Done);
    assert_eq!(session.failed_posts, 1);
}

#[tokio::test]
async fn posting_generation_assigns_slots_and_omits_failed_ones() {
    let fake = shared(FakeUpstream {
        fail_generate_calls: vec![2],
        ..FakeUpstream::default()
    });
    let base = spawn_upstream(fake.clone()).await;
    let backend = BotBackend::new(&base);

    let items = run_posting_generation(&backend, &posting_settings())
        .await
        .expect("partial batch succeeds");

    let ids: Vec<&str> = items.iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ids, vec!["item-1", "item-3", "item-4"]);

    let times: Vec<String> = items
        .iter()
        .map(|item| {
            let ItemDetail::Post { scheduled_time, .. } = &item.detail else {
                panic!("post item expected");
            };
            scheduled_time.format("%H:%M").to_string()
        })
        .collect();
    // the 11:00 slot left with its failed generation call
    assert_eq!(times, vec!["09:00", "13:00", "15:00"]);
    assert_eq!(count(&fake, "generate-content"), 4);
}

#[tokio::test]
async fn posting_commit_packages_only_approved_items() {
    let fake = shared(FakeUpstream::default());
    let base = spawn_upstream(fake.clone()).await;
    let backend = BotBackend::new(&base);

    let settings = posting_settings();
    let items = run_posting_generation(&backend, &settings).await.unwrap();
    assert_eq!(items.len(), 4);

    let mut session = WorkflowSession::new(
        "wf-1".to_string(),
        JobType::Posting,
        "Morning batch".to_string(),
        settings.clone(),
    );
    session.begin_review(items, Vec::new());
    session.approve("item-1").unwrap();
    session.approve("item-3").unwrap();
    session.begin_commit().unwrap();

    let posts = approved_posts(&session);
    assert_eq!(posts.len(), 2);

    let job = commit_posting_batch(&backend, &session.job_name, &settings, &posts)
        .await
        .expect("create posting job");
    assert_eq!(job.id, "posting-1754500000");
    session.complete_posting();
    assert_eq!(session.phase, Phase::Done);

    let received = {
        let fake = fake.lock().unwrap();
        fake.received
            .iter()
            .find(|(name, _)| name == "create-posting-job")
            .map(|(_, body)| body.clone())
            .expect("create call received")
    };
    assert_eq!(received["name"], "Morning batch");
    let sent_posts = received["posts"].as_array().unwrap();
    assert_eq!(sent_posts.len(), 2);
    assert_eq!(sent_posts[0]["scheduledTime"], "2026-08-07T09:00:00");
    assert_eq!(sent_posts[1]["scheduledTime"], "2026-08-07T13:00:00");
    assert!(sent_posts[0]["content"].as_str().unwrap().contains("#TradeUp"));
}
