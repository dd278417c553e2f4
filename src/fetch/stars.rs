// Stargazer fetcher.
// Daily new stars from the stargazer listing (REST) or the stargazers connection (GraphQL).

use async_trait::async_trait;

use crate::error::Result;
use crate::github::Stargazer;
use crate::metrics::{MetricKind, MetricSeries};
use crate::repo::RepoId;

use super::{FetchContext, MetricFetcher};

/// Media type that adds `starred_at` to each stargazer.
const STAR_MEDIA_TYPE: &str = "application/vnd.github.star+json";

const STARGAZERS_QUERY: &str = r#"
query($owner: String!, $name: String!, $cursor: String) {
  repository(owner: $owner, name: $name) {
    stargazers(first: 100, after: $cursor) {
      pageInfo { hasNextPage endCursor }
      edges { starredAt }
    }
  }
}
"#;

pub struct StarsFetcher {
    ctx: FetchContext,
}

impl StarsFetcher {
    pub fn new(ctx: FetchContext) -> Self {
        Self { ctx }
    }

    pub async fn fetch_rest(&self, repo: &RepoId) -> Result<MetricSeries> {
        let endpoint = format!("/repos/{}/{}/stargazers", repo.owner, repo.name);
        self.ctx
            .paginate_rest(
                MetricKind::Stars,
                &endpoint,
                &[],
                Some(STAR_MEDIA_TYPE),
                self.ctx.until_empty(),
                |star: Stargazer, tally| tally.add_timestamp(star.starred_at.as_deref()),
            )
            .await
    }

    pub async fn fetch_graphql(&self, repo: &RepoId) -> Result<MetricSeries> {
        self.ctx
            .paginate_graphql(
                MetricKind::Stars,
                repo,
                STARGAZERS_QUERY,
                "stargazers",
                self.ctx.until_empty(),
            )
            .await
    }
}

#[async_trait]
impl MetricFetcher for StarsFetcher {
    fn kind(&self) -> MetricKind {
        MetricKind::Stars
    }

    async fn fetch(&self, repo: &RepoId) -> Result<MetricSeries> {
        if self.ctx.use_graphql {
            self.fetch_graphql(repo).await
        } else {
            self.fetch_rest(repo).await
        }
    }
}
