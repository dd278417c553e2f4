// Per-metric fetchers.
// One MetricFetcher per metric kind, sharing REST page and GraphQL cursor pagination.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;

use crate::config::Config;
use crate::error::{PulseError, Result};
use crate::github::{Connection, GitHubClient};
use crate::metrics::{DailyTally, MetricKind, MetricSeries};
use crate::repo::RepoId;

pub mod commits;
pub mod downloads;
pub mod forks;
pub mod issues;
pub mod pulls;
pub mod stars;

pub use commits::CommitsFetcher;
pub use downloads::DownloadsFetcher;
pub use forks::ForksFetcher;
pub use issues::IssuesFetcher;
pub use pulls::PullRequestsFetcher;
pub use stars::StarsFetcher;

const LOG_TARGET: &str = "ghpulse::fetch";

/// Produces the daily series of one metric for a repository.
///
/// An `Ok` series may be partial when pagination failed after the first page.
/// `Err` means nothing usable was retrieved.
#[async_trait]
pub trait MetricFetcher: Send + Sync {
    fn kind(&self) -> MetricKind;

    async fn fetch(&self, repo: &RepoId) -> Result<MetricSeries>;
}

/// Settings every GitHub-backed fetcher shares.
#[derive(Clone)]
pub struct FetchContext {
    pub client: Arc<GitHubClient>,
    pub per_page: u32,
    pub max_pages: u32,
    pub use_graphql: bool,
    pub stats_poll_delay: Duration,
}

impl FetchContext {
    pub fn new(config: &Config, client: Arc<GitHubClient>) -> Self {
        Self {
            client,
            per_page: config.per_page.max(1),
            max_pages: config.max_pages.max(1),
            use_graphql: config.use_graphql,
            stats_poll_delay: config.stats_poll_delay,
        }
    }

    /// Limits for a REST listing that ends at the first empty page.
    pub(crate) fn until_empty(&self) -> PageLimits {
        PageLimits {
            max_pages: self.max_pages,
            stop_on_short_page: false,
            max_events: None,
        }
    }

    /// Limits for a REST listing that ends at the first short page.
    pub(crate) fn until_short(&self) -> PageLimits {
        PageLimits {
            stop_on_short_page: true,
            ..self.until_empty()
        }
    }

    /// Walk a REST listing page by page, letting `visit` record each item.
    ///
    /// A failure on the first page is returned as an error. A failure on a later
    /// page ends pagination and keeps what was already recorded.
    pub(crate) async fn paginate_rest<T, F>(
        &self,
        kind: MetricKind,
        endpoint: &str,
        extra: &[(&str, &str)],
        accept: Option<&'static str>,
        limits: PageLimits,
        mut visit: F,
    ) -> Result<MetricSeries>
    where
        T: DeserializeOwned + Send,
        F: FnMut(T, &mut DailyTally) + Send,
    {
        let mut tally = DailyTally::new(kind);

        for page in 1..=limits.max_pages.max(1) {
            let mut params: Vec<(&str, String)> = vec![
                ("per_page", self.per_page.to_string()),
                ("page", page.to_string()),
            ];
            params.extend(extra.iter().map(|(k, v)| (*k, v.to_string())));

            let items: Vec<T> = match self.fetch_page(endpoint, &params, accept).await {
                Ok(items) => items,
                Err(e) if page == 1 => return Err(e),
                Err(e) => {
                    log::warn!(
                        target: LOG_TARGET,
                        "{} stopped at page {}: {}; keeping {} events",
                        kind,
                        page,
                        e,
                        tally.events()
                    );
                    break;
                }
            };

            if items.is_empty() {
                break;
            }

            let count = items.len();
            for item in items {
                visit(item, &mut tally);
            }

            if limits.stop_on_short_page && count < self.per_page as usize {
                break;
            }
            if limits.max_events.is_some_and(|max| tally.events() > max) {
                log::debug!(target: LOG_TARGET, "{} reached {} events, stopping", kind, tally.events());
                break;
            }
        }

        Ok(tally.into_series())
    }

    async fn fetch_page<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
        accept: Option<&'static str>,
    ) -> Result<Vec<T>> {
        let response = self.client.request(endpoint, params, accept).await?;
        let status = response.status();
        if status != StatusCode::OK {
            return Err(PulseError::HttpStatus {
                status: status.as_u16(),
                url: response.url().to_string(),
            });
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| PulseError::Schema(format!("{}: {}", endpoint, e)))
    }

    /// Follow a GraphQL connection on `repository` cursor by cursor.
    ///
    /// `query` must accept `$owner`, `$name` and `$cursor` and select `pageInfo`
    /// plus `createdAt` (or `starredAt`) on its nodes or edges.
    pub(crate) async fn paginate_graphql(
        &self,
        kind: MetricKind,
        repo: &RepoId,
        query: &str,
        connection: &str,
        limits: PageLimits,
    ) -> Result<MetricSeries> {
        let mut tally = DailyTally::new(kind);
        let mut cursor: Option<String> = None;

        for page in 1..=limits.max_pages.max(1) {
            let variables = json!({ "owner": repo.owner, "name": repo.name, "cursor": cursor });
            let data = self.client.query(query, variables).await;

            let parsed = data
                .get("repository")
                .and_then(|r| r.get(connection))
                .filter(|v| !v.is_null())
                .map(Connection::deserialize);

            let conn = match parsed {
                Some(Ok(conn)) => conn,
                Some(Err(e)) if page == 1 => {
                    return Err(PulseError::Schema(format!("{} connection: {}", connection, e)));
                }
                None if page == 1 => {
                    return Err(PulseError::NoData(format!("GraphQL {} for {}", connection, repo)));
                }
                _ => {
                    log::warn!(
                        target: LOG_TARGET,
                        "GraphQL {} stopped at page {}; keeping {} events",
                        kind,
                        page,
                        tally.events()
                    );
                    break;
                }
            };

            for timestamp in conn.timestamps() {
                tally.add_timestamp(timestamp);
            }

            let page_info = conn.page_info.unwrap_or_default();
            if !page_info.has_next_page {
                break;
            }
            match page_info.end_cursor {
                Some(next) => cursor = Some(next),
                None => break,
            }
            if limits.max_events.is_some_and(|max| tally.events() > max) {
                break;
            }
        }

        Ok(tally.into_series())
    }
}

/// When to stop paginating.
#[derive(Debug, Clone, Copy)]
pub(crate) struct PageLimits {
    pub max_pages: u32,
    pub stop_on_short_page: bool,
    /// Stop once more than this many events were recorded.
    pub max_events: Option<usize>,
}

/// Maps each metric kind to the fetcher that produces it.
#[derive(Default)]
pub struct FetcherRegistry {
    fetchers: BTreeMap<MetricKind, Box<dyn MetricFetcher>>,
}

impl FetcherRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The six GitHub fetchers sharing one client.
    pub fn github(config: &Config, client: Arc<GitHubClient>) -> Self {
        let ctx = FetchContext::new(config, client);
        Self::new()
            .with(StarsFetcher::new(ctx.clone()))
            .with(ForksFetcher::new(ctx.clone()))
            .with(PullRequestsFetcher::new(ctx.clone()))
            .with(DownloadsFetcher::new(ctx.clone()))
            .with(IssuesFetcher::new(ctx.clone()))
            .with(CommitsFetcher::new(ctx))
    }

    /// Register a fetcher, replacing any previous one for the same kind.
    pub fn with(mut self, fetcher: impl MetricFetcher + 'static) -> Self {
        self.fetchers.insert(fetcher.kind(), Box::new(fetcher));
        self
    }

    pub fn get(&self, kind: MetricKind) -> Option<&dyn MetricFetcher> {
        self.fetchers.get(&kind).map(|f| f.as_ref())
    }
}
