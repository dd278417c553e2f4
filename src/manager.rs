// Metric orchestration.
// Decides per metric whether to trust the on-disk cache or refetch, merges and persists results.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use chrono::NaiveDate;

use crate::cache::{self, paths};
use crate::config::Config;
use crate::error::{PulseError, Result};
use crate::fetch::FetcherRegistry;
use crate::github::GitHubClient;
use crate::metrics::{MetricKind, MetricSeries};
use crate::repo::RepoId;

const LOG_TARGET: &str = "ghpulse::cache";

/// Snapshot of one persisted metric file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataFileInfo {
    pub path: PathBuf,
    pub exists: bool,
    pub age: Option<Duration>,
    pub stale: bool,
}

/// Serves metric series from the cache, refetching when stale.
///
/// None of the retrieval methods fail: fetch and persistence errors are logged
/// and the best available data (cached rows, else an empty series) is returned.
pub struct DataManager {
    config: Config,
    fetchers: FetcherRegistry,
    client: Option<Arc<GitHubClient>>,
}

impl DataManager {
    /// Create a manager backed by the GitHub fetchers.
    pub fn new(config: Config) -> Result<Self> {
        let client = Arc::new(GitHubClient::new(&config)?);
        let fetchers = FetcherRegistry::github(&config, Arc::clone(&client));
        Ok(Self {
            config,
            fetchers,
            client: Some(client),
        })
    }

    /// Create a manager with a custom set of fetchers.
    pub fn with_fetchers(config: Config, fetchers: FetcherRegistry) -> Self {
        Self {
            config,
            fetchers,
            client: None,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The shared GitHub client, when built with [`DataManager::new`].
    pub fn client(&self) -> Option<&GitHubClient> {
        self.client.as_deref()
    }

    /// Where the series of `kind` for `repo` is persisted.
    pub fn path_for(&self, repo: &RepoId, kind: MetricKind) -> PathBuf {
        paths::series_path(&self.config.data_dir, repo, kind)
    }

    /// Series of one metric: cached if fresh, otherwise fetched and persisted.
    pub async fn get(&self, repo: &RepoId, kind: MetricKind, force_refresh: bool) -> MetricSeries {
        let path = self.path_for(repo, kind);

        if !force_refresh && !cache::is_stale(&path, self.config.refresh_threshold) {
            match cache::load_series(&path, kind) {
                Ok(Some(series)) => {
                    log::info!(target: LOG_TARGET, "Loading cached data for {} {}", repo, kind);
                    return series;
                }
                Ok(None) => {}
                Err(e) => log::warn!(target: LOG_TARGET, "Ignoring unreadable cache {}: {}", path.display(), e),
            }
        }

        log::info!(
            target: LOG_TARGET,
            "Fetching fresh data for {} {} (force_refresh={})",
            repo,
            kind,
            force_refresh
        );
        self.fetch_and_save(repo, kind).await
    }

    /// Every metric for `repo`.
    pub async fn get_all(
        &self,
        repo: &RepoId,
        force_refresh: bool,
    ) -> BTreeMap<MetricKind, MetricSeries> {
        let mut result = BTreeMap::new();
        for kind in MetricKind::ALL {
            result.insert(kind, self.get(repo, kind, force_refresh).await);
        }
        result
    }

    /// Series of one metric, refetched unless the cache is fresh and spans `[start, end]`.
    ///
    /// A refetch is merged into the cached rows (fresh values win on shared dates)
    /// and the union is persisted.
    pub async fn get_range(
        &self,
        repo: &RepoId,
        kind: MetricKind,
        start: NaiveDate,
        end: NaiveDate,
        force_refresh: bool,
    ) -> MetricSeries {
        let (start, end) = if start <= end { (start, end) } else { (end, start) };
        let path = self.path_for(repo, kind);
        let cached = self.load_cached(&path, kind);

        let need_fetch = force_refresh
            || cached.is_empty()
            || cache::is_stale(&path, self.config.refresh_threshold)
            || !cached.covers(start, end);

        if !need_fetch {
            log::info!(target: LOG_TARGET, "Using cached data for {} {}", repo, kind);
            return cached;
        }

        if !cached.is_empty() && !cached.covers(start, end) {
            log::info!(
                target: LOG_TARGET,
                "Data for {} {} doesn't cover {} to {}, fetching fresh data",
                repo,
                kind,
                start,
                end
            );
        }

        match self.fetch(repo, kind).await {
            Ok(fresh) => {
                let merged = cached.merge(&fresh);
                self.persist(&path, &merged);
                merged
            }
            Err(e) => {
                log::error!(target: LOG_TARGET, "Failed to fetch {} for {}: {}", kind, repo, e);
                cached
            }
        }
    }

    /// Every metric for `repo`, range-aware.
    pub async fn get_all_for_range(
        &self,
        repo: &RepoId,
        start: NaiveDate,
        end: NaiveDate,
        force_refresh: bool,
    ) -> BTreeMap<MetricKind, MetricSeries> {
        let mut result = BTreeMap::new();
        for kind in MetricKind::ALL {
            let series = self.get_range(repo, kind, start, end, force_refresh).await;
            result.insert(kind, series);
        }
        result
    }

    /// Refetch the given metrics regardless of cache age (downloads and commits by default).
    pub async fn force_fetch_real_data(
        &self,
        repo: &RepoId,
        kinds: Option<&[MetricKind]>,
    ) -> BTreeMap<MetricKind, MetricSeries> {
        let kinds = kinds.unwrap_or(&MetricKind::VERIFIABLE);
        let mut result = BTreeMap::new();

        for &kind in kinds {
            log::info!(target: LOG_TARGET, "Force fetching real {} data for {}", kind, repo);
            let series = self.fetch_and_save(repo, kind).await;
            if series.is_empty() {
                log::warn!(target: LOG_TARGET, "No {} data returned from API", kind);
            } else {
                log::info!(target: LOG_TARGET, "Fetched {} rows of {} data", series.len(), kind);
            }
            result.insert(kind, series);
        }

        result
    }

    /// Existence, age and staleness of each metric file for `repo`.
    pub fn data_status(&self, repo: &RepoId) -> BTreeMap<MetricKind, DataFileInfo> {
        let now = SystemTime::now();
        MetricKind::ALL
            .into_iter()
            .map(|kind| {
                let path = self.path_for(repo, kind);
                let info = match cache::modified_at(&path) {
                    Ok(modified) => DataFileInfo {
                        exists: true,
                        age: Some(now.duration_since(modified).unwrap_or(Duration::ZERO)),
                        stale: cache::is_stale_at(modified, now, self.config.refresh_threshold),
                        path,
                    },
                    Err(_) => DataFileInfo {
                        path,
                        exists: false,
                        age: None,
                        stale: true,
                    },
                };
                (kind, info)
            })
            .collect()
    }

    /// Remove one metric file for `repo`, or the whole repository directory.
    pub fn clear_cache(&self, repo: &RepoId, kind: Option<MetricKind>) -> Result<()> {
        match kind {
            Some(kind) => cache::delete(&self.path_for(repo, kind)),
            None => cache::delete_dir(&paths::repo_dir(&self.config.data_dir, repo)),
        }
    }

    async fn fetch(&self, repo: &RepoId, kind: MetricKind) -> Result<MetricSeries> {
        let fetcher = self
            .fetchers
            .get(kind)
            .ok_or_else(|| PulseError::Other(format!("no fetcher registered for {}", kind)))?;

        let series = fetcher.fetch(repo).await?;
        if series.kind() != kind {
            return Err(PulseError::Schema(format!(
                "{} fetcher returned {} data",
                kind,
                series.kind()
            )));
        }
        Ok(series)
    }

    /// Fetch and persist, falling back to the cached series on failure.
    async fn fetch_and_save(&self, repo: &RepoId, kind: MetricKind) -> MetricSeries {
        let path = self.path_for(repo, kind);
        match self.fetch(repo, kind).await {
            Ok(series) => {
                self.persist(&path, &series);
                series
            }
            Err(e) => {
                log::error!(target: LOG_TARGET, "Error fetching {} data for {}: {}", kind, repo, e);
                self.load_cached(&path, kind)
            }
        }
    }

    fn persist(&self, path: &Path, series: &MetricSeries) {
        match cache::save_series(path, series) {
            Ok(()) => log::info!(
                target: LOG_TARGET,
                "Saved {} rows of {} data to {}",
                series.len(),
                series.kind(),
                path.display()
            ),
            Err(e) => log::error!(
                target: LOG_TARGET,
                "Failed to write {} data to {}: {}",
                series.kind(),
                path.display(),
                e
            ),
        }
    }

    /// Cached series, or an empty one when missing or unreadable.
    fn load_cached(&self, path: &Path, kind: MetricKind) -> MetricSeries {
        match cache::load_series(path, kind) {
            Ok(Some(series)) => series,
            Ok(None) => MetricSeries::empty(kind),
            Err(e) => {
                log::warn!(target: LOG_TARGET, "Ignoring unreadable cache {}: {}", path.display(), e);
                MetricSeries::empty(kind)
            }
        }
    }
}
