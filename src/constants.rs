//! Application constants

/// Marker embedded in the id of server-seeded placeholder jobs. Jobs whose id
/// contains this marker are excluded from the displayed registry.
pub const DEMO_JOB_MARKER: &str = "demo";

/// Default cadence for polling plain backend resources (20 minutes)
pub const DEFAULT_REFRESH_SECS: u64 = 20 * 60;

/// Default cadence for resources that proxy the Twitter API (60 minutes).
/// Longer than the plain cadence so the dashboard cannot exhaust the posting
/// API's rate limit on its own.
pub const DEFAULT_TWITTER_REFRESH_SECS: u64 = 60 * 60;

/// Delay between a job command completing and the registry refetch (ms)
pub const DEFAULT_ACTION_SETTLE_MS: u64 = 1500;

/// Bounds for posts per day in a posting job
pub const MIN_POSTS_PER_DAY: u32 = 1;
pub const MAX_POSTS_PER_DAY: u32 = 20;

/// Bounds for one reply batch
pub const DEFAULT_REPLY_BATCH: u32 = 5;
pub const MAX_REPLY_BATCH: u32 = 10;

/// Base URL used to build links to tweets
pub const TWEET_URL_BASE: &str = "https://twitter.com";

/// Prefix for auto-assigned job names ("Job #1", "Job #2", ...)
pub const JOB_NAME_PREFIX: &str = "Job #";
