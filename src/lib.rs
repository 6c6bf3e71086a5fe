//! Operations dashboard service for the TradeUp Pokemon TCG content bot.
//!
//! The dashboard frontend is a thin single-page app; everything it renders is
//! owned here: the job registry projection, the content-approval workflow
//! sessions, and the polled status/metrics snapshots. The upstream bot
//! runtime (content generation, posting, storage) is consumed over REST and
//! treated as the source of truth that this service reflects.

pub mod config;
pub mod constants;
pub mod display;
pub mod models;
pub mod registry;
pub mod routes;
pub mod services;
pub mod workflow;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::Value;
use tokio::sync::RwLock;

use crate::config::Config;
use crate::models::BotStatusSnapshot;
use crate::registry::{JobRegistry, spawn_status_poller};
use crate::services::backend::BotBackend;
use crate::services::poll::{PollConfig, Poller};
use crate::workflow::WorkflowStore;

/// One poller per read-only panel. Posts and engagement proxy the Twitter
/// API upstream, so they run on the longer cadence.
pub struct PanelPollers {
    pub posts: Poller<Value>,
    pub metrics: Poller<Value>,
    pub topics: Poller<Value>,
    pub engagement: Poller<Value>,
}

pub struct AppState {
    pub config: Config,
    pub backend: BotBackend,
    pub registry: Arc<RwLock<JobRegistry>>,
    pub status: Poller<BotStatusSnapshot>,
    pub panels: PanelPollers,
    pub workflows: Mutex<WorkflowStore>,
}

impl AppState {
    pub fn new(config: Config) -> Arc<Self> {
        let backend = BotBackend::new(&config.backend_base_url);
        let registry = Arc::new(RwLock::new(JobRegistry::new()));
        let status = spawn_status_poller(&config, backend.clone(), registry.clone());
        let panels = PanelPollers {
            posts: spawn_panel_poller(&backend, "posts", config.twitter_refresh_interval),
            metrics: spawn_panel_poller(&backend, "metrics", config.refresh_interval),
            topics: spawn_panel_poller(&backend, "topics", config.refresh_interval),
            engagement: spawn_panel_poller(&backend, "engagement", config.twitter_refresh_interval),
        };
        Arc::new(Self {
            config,
            backend,
            registry,
            status,
            panels,
            workflows: Mutex::new(WorkflowStore::new()),
        })
    }

    /// Give the upstream job list a moment to settle after a command, then
    /// refetch the registry.
    pub fn schedule_registry_refresh(self: &Arc<Self>) {
        let state = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(state.config.action_settle).await;
            state.status.refetch();
        });
    }
}

fn spawn_panel_poller(
    backend: &BotBackend,
    panel: &'static str,
    interval: Duration,
) -> Poller<Value> {
    let backend = backend.clone();
    Poller::spawn(PollConfig::every(interval), panel, move || {
        let backend = backend.clone();
        async move { backend.fetch_panel(panel).await }
    })
}
