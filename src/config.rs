// Runtime configuration.
// Built once (usually from the environment) and handed to the client, fetchers and manager.

use std::path::PathBuf;
use std::time::Duration;

use directories::ProjectDirs;

pub const DEFAULT_API_BASE: &str = "https://api.github.com";
pub const DEFAULT_GRAPHQL_URL: &str = "https://api.github.com/graphql";

/// Default cache lifetime before a metric file is refetched: 24 hours.
pub const DEFAULT_REFRESH_THRESHOLD: Duration = Duration::from_secs(24 * 60 * 60);

const ENV_TOKEN: &str = "GITHUB_TOKEN";
const ENV_USE_GRAPHQL: &str = "GHPULSE_USE_GRAPHQL";
const ENV_DATA_DIR: &str = "GHPULSE_DATA_DIR";
const ENV_REFRESH_HOURS: &str = "GHPULSE_REFRESH_HOURS";

/// Bounded retry behaviour for rate-limited requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of requests made before giving up (including the first).
    pub max_attempts: u32,
    /// First backoff wait when the server gives no reset time.
    pub initial_backoff: Duration,
    /// Ceiling for the exponential backoff.
    pub max_backoff: Duration,
    /// Ceiling for waits derived from `X-RateLimit-Reset`.
    pub max_reset_wait: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_secs(2),
            max_backoff: Duration::from_secs(5),
            max_reset_wait: Duration::from_secs(10),
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Optional API token. Without one, requests are unauthenticated.
    pub token: Option<String>,
    /// Use the GraphQL API for stars, forks, pull requests and issues.
    pub use_graphql: bool,
    /// Root directory for persisted metric files.
    pub data_dir: PathBuf,
    /// Maximum age of a metric file before it is considered stale.
    pub refresh_threshold: Duration,
    pub per_page: u32,
    pub max_pages: u32,
    pub request_timeout: Duration,
    pub api_base: String,
    pub graphql_url: String,
    pub retry: RetryPolicy,
    /// Delay between polls while commit statistics are still being computed.
    pub stats_poll_delay: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            token: None,
            use_graphql: false,
            data_dir: default_data_dir(),
            refresh_threshold: DEFAULT_REFRESH_THRESHOLD,
            per_page: 100,
            max_pages: 1000,
            request_timeout: Duration::from_secs(30),
            api_base: DEFAULT_API_BASE.to_string(),
            graphql_url: DEFAULT_GRAPHQL_URL.to_string(),
            retry: RetryPolicy::default(),
            stats_poll_delay: Duration::from_secs(2),
        }
    }
}

impl Config {
    /// Build a configuration from process environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        config.token = lookup(ENV_TOKEN).filter(|t| !t.trim().is_empty());
        config.use_graphql = lookup(ENV_USE_GRAPHQL).is_some_and(|v| v.trim() == "1");

        if let Some(dir) = lookup(ENV_DATA_DIR).filter(|d| !d.is_empty()) {
            config.data_dir = PathBuf::from(dir);
        }

        if let Some(hours) = lookup(ENV_REFRESH_HOURS) {
            let threshold = hours
                .trim()
                .parse::<f64>()
                .ok()
                .and_then(|h| Duration::try_from_secs_f64(h * 3600.0).ok());
            match threshold {
                Some(threshold) => config.refresh_threshold = threshold,
                None => log::warn!("ignoring invalid {ENV_REFRESH_HOURS} value {hours:?}"),
            }
        }

        config
    }

    /// Point both REST and GraphQL endpoints at another server.
    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        let base = base.into().trim_end_matches('/').to_string();
        self.graphql_url = format!("{}/graphql", base);
        self.api_base = base;
        self
    }

    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }
}

/// Default data directory (~/.local/share/ghpulse on Linux), or ./data if unavailable.
pub fn default_data_dir() -> PathBuf {
    ProjectDirs::from("", "", "ghpulse")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("data"))
}
