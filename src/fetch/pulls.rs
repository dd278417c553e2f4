// Pull request fetcher.
// Daily pull request creations across all states.

use async_trait::async_trait;

use crate::error::Result;
use crate::github::Created;
use crate::metrics::{MetricKind, MetricSeries};
use crate::repo::RepoId;

use super::{FetchContext, MetricFetcher, PageLimits};

const PULL_REQUESTS_QUERY: &str = r#"
query($owner: String!, $name: String!, $cursor: String) {
  repository(owner: $owner, name: $name) {
    pullRequests(first: 100, after: $cursor, orderBy: {field: CREATED_AT, direction: ASC}, states: [OPEN, MERGED, CLOSED]) {
      nodes { createdAt }
      pageInfo { endCursor hasNextPage }
    }
  }
}
"#;

const GRAPHQL_MAX_PAGES: u32 = 200;

pub struct PullRequestsFetcher {
    ctx: FetchContext,
}

impl PullRequestsFetcher {
    pub fn new(ctx: FetchContext) -> Self {
        Self { ctx }
    }

    pub async fn fetch_rest(&self, repo: &RepoId) -> Result<MetricSeries> {
        let endpoint = format!("/repos/{}/{}/pulls", repo.owner, repo.name);
        self.ctx
            .paginate_rest(
                MetricKind::PullRequests,
                &endpoint,
                &[("state", "all"), ("sort", "created"), ("direction", "asc")],
                None,
                self.ctx.until_short(),
                |pr: Created, tally| tally.add_timestamp(pr.created_at.as_deref()),
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
            .paginate_graphql(
                MetricKind::PullRequests,
                repo,
                PULL_REQUESTS_QUERY,
                "pullRequests",
                limits,
            )
            .await
    }
}

#[async_trait]
impl MetricFetcher for PullRequestsFetcher {
    fn kind(&self) -> MetricKind {
        MetricKind::PullRequests
    }

    async fn fetch(&self, repo: &RepoId) -> Result<MetricSeries> {
        if self.ctx.use_graphql {
            self.fetch_graphql(repo).await
        } else {
            self.fetch_rest(repo).await
        }
    }
}
