//! Runtime configuration, built once in `main` and passed into every
//! component. Nothing in this crate reads the environment after startup.

use std::time::Duration;

use crate::constants::{
    DEFAULT_ACTION_SETTLE_MS, DEFAULT_REFRESH_SECS, DEFAULT_TWITTER_REFRESH_SECS,
};

#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the upstream bot runtime, no trailing slash
    pub backend_base_url: String,
    /// Port the dashboard service binds to
    pub port: u16,
    /// Poll cadence for plain backend resources (bot status, metrics, topics)
    pub refresh_interval: Duration,
    /// Poll cadence for resources that proxy the Twitter API (posts, engagement)
    pub twitter_refresh_interval: Duration,
    /// Wait after a job command before refetching the registry, to let the
    /// upstream job list catch up
    pub action_settle: Duration,
}

impl Config {
    pub fn from_env() -> Self {
        let backend_base_url = std::env::var("BOT_BACKEND_URL")
            .unwrap_or_else(|_| "http://localhost:8000".to_string());
        let port = std::env::var("PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(3000);
        let refresh_secs = std::env::var("REFRESH_INTERVAL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_REFRESH_SECS);
        let twitter_refresh_secs = std::env::var("TWITTER_REFRESH_INTERVAL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_TWITTER_REFRESH_SECS);

        Self::new(backend_base_url)
            .with_port(port)
            .with_intervals(
                Duration::from_secs(refresh_secs),
                Duration::from_secs(twitter_refresh_secs),
            )
    }

    /// Defaults for everything except the upstream URL. Tests build their
    /// config through this and override cadences as needed.
    pub fn new(backend_base_url: impl Into<String>) -> Self {
        Self {
            backend_base_url: backend_base_url.into().trim_end_matches('/').to_string(),
            port: 3000,
            refresh_interval: Duration::from_secs(DEFAULT_REFRESH_SECS),
            twitter_refresh_interval: Duration::from_secs(DEFAULT_TWITTER_REFRESH_SECS),
            action_settle: Duration::from_millis(DEFAULT_ACTION_SETTLE_MS),
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_intervals(mut self, refresh: Duration, twitter_refresh: Duration) -> Self {
        self.refresh_interval = refresh;
        self.twitter_refresh_interval = twitter_refresh;
        self
    }

    pub fn with_action_settle(mut self, settle: Duration) -> Self {
        self.action_settle = settle;
        self
    }
}
