//! Generic polling data client.
//!
//! A `Poller<T>` owns one upstream JSON resource: it fetches on start,
//! refetches on a fixed cadence, and exposes the latest snapshot through a
//! shared lock. Failed fetches surface an error message but never clear the
//! stale data already held; the frontend prefers stale-but-present data over
//! a blanked panel.

use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{Notify, RwLock};
use tokio::task::JoinHandle;

use crate::services::backend::BackendError;

#[derive(Debug, Clone)]
pub struct PollConfig {
    pub interval: std::time::Duration,
    pub auto_refresh: bool,
    pub fetch_on_start: bool,
}

impl PollConfig {
    pub fn every(interval: std::time::Duration) -> Self {
        Self {
            interval,
            auto_refresh: true,
            fetch_on_start: true,
        }
    }

    /// Only fetch when nudged via `refetch()`
    pub fn manual() -> Self {
        Self {
            interval: std::time::Duration::from_secs(0),
            auto_refresh: false,
            fetch_on_start: false,
        }
    }
}

/// The latest known state of one polled resource
#[derive(Debug, Clone)]
pub struct PollSnapshot<T> {
    pub data: Option<T>,
    pub error: Option<String>,
    pub last_fetch: Option<DateTime<Utc>>,
    pub refreshing: bool,
}

impl<T> Default for PollSnapshot<T> {
    fn default() -> Self {
        Self {
            data: None,
            error: None,
            last_fetch: None,
            refreshing: false,
        }
    }
}

/// Merge one fetch result into the snapshot. On failure the stale `data`
/// stays; `last_fetch` advances either way so "next refresh" displays stay
/// accurate.
pub fn apply_fetch_result<T>(snapshot: &mut PollSnapshot<T>, result: Result<T, BackendError>) {
    snapshot.refreshing = false;
    snapshot.last_fetch = Some(Utc::now());
    match result {
        Ok(data) => {
            snapshot.data = Some(data);
            snapshot.error = None;
        }
        Err(e) => {
            snapshot.error = Some(e.to_string());
        }
    }
}

pub struct Poller<T> {
    state: Arc<RwLock<PollSnapshot<T>>>,
    wake: Arc<Notify>,
    task: JoinHandle<()>,
}

impl<T: Send + Sync + 'static> Poller<T> {
    /// Spawn the poll task. `fetch` runs single-flight: one fetch is awaited
    /// at a time, so a slow response can never overwrite a newer one within
    /// the same poller.
    pub fn spawn<F, Fut>(config: PollConfig, label: &'static str, fetch: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, BackendError>> + Send + 'static,
    {
        let state: Arc<RwLock<PollSnapshot<T>>> = Arc::new(RwLock::new(PollSnapshot::default()));
        let wake = Arc::new(Notify::new());

        let task_state = state.clone();
        let task_wake = wake.clone();
        let task = tokio::spawn(async move {
            if config.fetch_on_start {
                run_fetch(&task_state, label, &fetch).await;
            }
            loop {
                if config.auto_refresh {
                    tokio::select! {
                        _ = tokio::time::sleep(config.interval) => {}
                        _ = task_wake.notified() => {}
                    }
                } else {
                    task_wake.notified().await;
                }
                run_fetch(&task_state, label, &fetch).await;
            }
        });

        Self { state, wake, task }
    }

    /// Nudge the poll task to fetch now. Safe to call at any time; does not
    /// disturb the repeating cadence.
    pub fn refetch(&self) {
        self.wake.notify_one();
    }

    pub async fn snapshot(&self) -> PollSnapshot<T>
    where
        T: Clone,
    {
        self.state.read().await.clone()
    }
}

impl<T> Drop for Poller<T> {
    fn drop(&mut self) {
        // A response already in flight finishes against a task that is gone;
        // nothing observes it.
        self.task.abort();
    }
}

async fn run_fetch<T, F, Fut>(state: &RwLock<PollSnapshot<T>>, label: &str, fetch: &F)
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, BackendError>>,
{
    state.write().await.refreshing = true;
    let result = fetch().await;
    if let Err(e) = &result {
        eprintln!("[poll] {} fetch failed: {}", label, e);
    }
    apply_fetch_result(&mut *state.write().await, result);
}
