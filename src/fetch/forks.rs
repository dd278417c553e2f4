// Fork fetcher.
// Daily fork creations. Both transports report per-day counts, never a running total.

use async_trait::async_trait;

use crate::error::Result;
use crate::github::Created;
use crate::metrics::{MetricKind, MetricSeries};
use crate::repo::RepoId;

use super::{FetchContext, MetricFetcher, PageLimits};

const FORKS_QUERY: &str = r#"
query($owner: String!, $name: String!, $cursor: String) {
  repository(owner: $owner, name: $name) {
    forks(first: 100, after: $cursor, orderBy: {field: CREATED_AT, direction: ASC}) {
      nodes { createdAt }
      pageInfo { endCursor hasNextPage }
    }
  }
}
"#;

const GRAPHQL_MAX_PAGES: u32 = 200;

pub struct ForksFetcher {
    ctx: FetchContext,
}

impl ForksFetcher {
    pub fn new(ctx: FetchContext) -> Self {
        Self { ctx }
    }

    pub async fn fetch_rest(&self, repo: &RepoId) -> Result<MetricSeries> {
        let endpoint = format!("/repos/{}/{}/forks", repo.owner, repo.name);
        self.ctx
            .paginate_rest(
                MetricKind::Forks,
                &endpoint,
                &[("sort", "newest")],
                None,
                self.ctx.until_empty(),
                |fork: Created, tally| tally.add_timestamp(fork.created_at.as_deref()),
            )
            .await
    }

    pub async fn fetch_graphql(&self, repo: &RepoId) -> Result<MetricSeries> {
        let limits = PageLimits {
            max_pages: GRAPHQL_MAX_PAGES,
            stop_on_short_page: false,
            max_events: None,
        };
        self.ctx
            .paginate_graphql(MetricKind::Forks, repo, FORKS_QUERY, "forks", limits)
            .await
    }
}

#[async_trait]
impl MetricFetcher for ForksFetcher {
    fn kind(&self) -> MetricKind {
        MetricKind::Forks
    }

    async fn fetch(&self, repo: &RepoId) -> Result<MetricSeries> {
        if self.ctx.use_graphql {
            self.fetch_graphql(repo).await
        } else {
            self.fetch_rest(repo).await
        }
    }
}
