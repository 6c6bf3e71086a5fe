//! Job registry: a local projection of the upstream job list.
//!
//! The source of truth is the latest successful bot-status snapshot. The
//! projection is replaced wholesale on every successful poll (never merged
//! field by field), with one exception: a successful rename patches the
//! single job's name immediately so the row does not flicker while the next
//! snapshot is in flight.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::config::Config;
use crate::constants::{DEMO_JOB_MARKER, JOB_NAME_PREFIX};
use crate::models::{BotJob, BotStatusSnapshot};
use crate::services::backend::BotBackend;
use crate::services::poll::{PollConfig, Poller};

/// Server-seeded placeholder jobs never reach the display
pub fn is_demo_job(id: &str) -> bool {
    id.contains(DEMO_JOB_MARKER)
}

/// Derive the next auto-assigned job name from the names currently visible.
/// Scans for `Job #<N>` and returns max+1, so the numbering stays correct
/// across reconnects and refreshes without a client-held counter.
pub fn next_numbered_name<'a>(names: impl Iterator<Item = &'a str>) -> String {
    let max = names
        .filter_map(|name| name.strip_prefix(JOB_NAME_PREFIX))
        .filter_map(|rest| rest.trim().parse::<u32>().ok())
        .max()
        .unwrap_or(0);
    format!("{}{}", JOB_NAME_PREFIX, max + 1)
}

#[derive(Default)]
pub struct JobRegistry {
    jobs: Vec<BotJob>,
    /// "{jobId}-{action}" keys for rows with a command in flight
    pending: HashSet<String>,
    error: Option<String>,
}

impl JobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the projection with a fresh snapshot, dropping demo entries.
    pub fn apply_snapshot(&mut self, jobs: Vec<BotJob>) {
        self.jobs = jobs.into_iter().filter(|j| !is_demo_job(&j.id)).collect();
    }

    pub fn jobs(&self) -> &[BotJob] {
        &self.jobs
    }

    pub fn pending_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.pending.iter().cloned().collect();
        keys.sort();
        keys
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Mark a row action as in flight. Returns false if that exact action is
    /// already pending on that job, so a double click cannot fire twice.
    pub fn begin_action(&mut self, job_id: &str, action: &str) -> bool {
        self.pending.insert(format!("{}-{}", job_id, action))
    }

    pub fn finish_action(&mut self, job_id: &str, action: &str) {
        self.pending.remove(&format!("{}-{}", job_id, action));
    }

    /// Optimistic local patch after a successful rename
    pub fn patch_name(&mut self, job_id: &str, name: &str) {
        if let Some(job) = self.jobs.iter_mut().find(|j| j.id == job_id) {
            job.name = name.to_string();
        }
    }

    pub fn set_error(&mut self, message: String) {
        self.error = Some(message);
    }

    pub fn dismiss_error(&mut self) {
        self.error = None;
    }

    pub fn next_job_name(&self) -> String {
        next_numbered_name(self.jobs.iter().map(|j| j.name.as_str()))
    }
}

/// Spawn the bot-status poller and wire its successful snapshots into the
/// registry projection. Poll failures leave the projection untouched; the
/// stale jobs stay on screen with an error banner.
pub fn spawn_status_poller(
    config: &Config,
    backend: BotBackend,
    registry: Arc<RwLock<JobRegistry>>,
) -> Poller<BotStatusSnapshot> {
    Poller::spawn(
        PollConfig::every(config.refresh_interval),
        "bot-status",
        move || {
            let backend = backend.clone();
            let registry = registry.clone();
            async move {
                let snapshot = backend.bot_status().await?;
                registry.write().await.apply_snapshot(snapshot.jobs.clone());
                Ok(snapshot)
            }
        },
    )
}
