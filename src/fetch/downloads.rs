// Release download fetcher.
// Attributes each asset's download counter to the asset's creation day.

use async_trait::async_trait;

use crate::error::Result;
use crate::github::Release;
use crate::metrics::{DailyTally, MetricKind, MetricSeries, to_date};
use crate::repo::RepoId;

use super::{FetchContext, LOG_TARGET, MetricFetcher};

pub struct DownloadsFetcher {
    ctx: FetchContext,
}

impl DownloadsFetcher {
    pub fn new(ctx: FetchContext) -> Self {
        Self { ctx }
    }
}

/// Add every downloaded asset of `release` to the tally.
fn tally_release(release: Release, tally: &mut DailyTally) {
    let Some(release_date) = release
        .published_at
        .as_deref()
        .or(release.created_at.as_deref())
        .and_then(to_date)
    else {
        log::debug!(
            target: LOG_TARGET,
            "skipping release {} without a usable date",
            release.tag_name.as_deref().unwrap_or("?")
        );
        return;
    };

    for asset in &release.assets {
        let downloads = asset.download_count.unwrap_or(0);
        if downloads == 0 {
            continue;
        }

        let date = match asset.created_at.as_deref().or(asset.updated_at.as_deref()) {
            Some(raw) => to_date(raw),
            None => Some(release_date),
        };
        match date {
            Some(date) => tally.add(date, downloads),
            None => log::debug!(
                target: LOG_TARGET,
                "skipping asset {} with an unreadable date",
                asset.name.as_deref().unwrap_or("?")
            ),
        }
    }
}

#[async_trait]
impl MetricFetcher for DownloadsFetcher {
    fn kind(&self) -> MetricKind {
        MetricKind::Downloads
    }

    async fn fetch(&self, repo: &RepoId) -> Result<MetricSeries> {
        let endpoint = format!("/repos/{}/{}/releases", repo.owner, repo.name);
        self.ctx
            .paginate_rest(
                MetricKind::Downloads,
                &endpoint,
                &[],
                None,
                self.ctx.until_short(),
                tally_release,
            )
            .await
    }
}
