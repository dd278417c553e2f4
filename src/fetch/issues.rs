// Issue fetcher.
// Daily issue creations across all states, excluding pull requests.
// Both transports cap how much history they walk.

use async_trait::async_trait;

use crate::error::Result;
use crate::github::Issue;
use crate::metrics::{MetricKind, MetricSeries};
use crate::repo::RepoId;

use super::{FetchContext, MetricFetcher, PageLimits};

const ISSUES_QUERY: &str = r#"
query($owner: String!, $name: String!, $cursor: String) {
  repository(owner: $owner, name: $name) {
    issues(first: 100, after: $cursor, orderBy: {field: CREATED_AT, direction: ASC}, states: [OPEN, CLOSED]) {
      nodes { createdAt }
      pageInfo { endCursor hasNextPage }
    }
  }
}
"#;

const REST_MAX_PAGES: u32 = 20;
const REST_MAX_ISSUES: usize = 1000;
const GRAPHQL_MAX_PAGES: u32 = 10;
const GRAPHQL_MAX_ISSUES: usize = 500;

pub struct IssuesFetcher {
    ctx: FetchContext,
}

impl IssuesFetcher {
    pub fn new(ctx: FetchContext) -> Self {
        Self { ctx }
    }

    pub async fn fetch_rest(&self, repo: &RepoId) -> Result<MetricSeries> {
        let endpoint = format!("/repos/{}/{}/issues", repo.owner, repo.name);
        let limits = PageLimits {
            max_pages: REST_MAX_PAGES.min(self.ctx.max_pages),
            stop_on_short_page: true,
            max_events: Some(REST_MAX_ISSUES),
        };
        self.ctx
            .paginate_rest(
                MetricKind::Issues,
                &endpoint,
                &[("state", "all"), ("sort", "created"), ("direction", "asc")],
                None,
                limits,
                |issue: Issue, tally| {
                    if !issue.is_pull_request() {
                        tally.add_timestamp(issue.created_at.as_deref());
                    }
                },
            )
            .await
    }

    pub async fn fetch_graphql(&self, repo: &RepoId) -> Result<MetricSeries> {
        let limits = PageLimits {
            max_pages: GRAPHQL_MAX_PAGES,
            stop_on_short_page: false,
            max_events: Some(GRAPHQL_MAX_ISSUES),
        };
        self.ctx
            .paginate_graphql(MetricKind::Issues, repo, ISSUES_QUERY, "issues", limits)
            .await
    }
}

#[async_trait]
impl MetricFetcher for IssuesFetcher {
    fn kind(&self) -> MetricKind {
        MetricKind::Issues
    }

    async fn fetch(&self, repo: &RepoId) -> Result<MetricSeries> {
        if self.ctx.use_graphql {
            self.fetch_graphql(repo).await
        } else {
            self.fetch_rest(repo).await
        }
    }
}
