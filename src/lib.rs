// ghpulse: daily GitHub repository activity metrics with an on-disk cache.
// Fetch layer (github + fetch), persistence (cache), and orchestration (manager).

pub mod cache;
pub mod config;
pub mod error;
pub mod fetch;
pub mod github;
pub mod manager;
pub mod metrics;
pub mod repo;

pub use config::{Config, RetryPolicy};
pub use error::{PulseError, Result};
pub use fetch::{FetcherRegistry, MetricFetcher};
pub use manager::{DataFileInfo, DataManager};
pub use metrics::{DailyCount, MetricKind, MetricSeries};
pub use repo::RepoId;
