// Commit contribution fetcher.
// Expands weekly commit activity into daily counts, falling back to the recent commit listing.

use async_trait::async_trait;
use chrono::{DateTime, Days};
use reqwest::StatusCode;

use crate::error::Result;
use crate::github::{CommitEntry, WeekActivity};
use crate::metrics::{DailyTally, MetricKind, MetricSeries};
use crate::repo::RepoId;

use super::{FetchContext, LOG_TARGET, MetricFetcher, PageLimits};

/// Requests made while GitHub is still computing the statistics (HTTP 202).
const STATS_ATTEMPTS: u32 = 3;
/// Pages of recent commits read by the fallback.
const FALLBACK_MAX_PAGES: u32 = 10;

pub struct CommitsFetcher {
    ctx: FetchContext,
}

impl CommitsFetcher {
    pub fn new(ctx: FetchContext) -> Self {
        Self { ctx }
    }

    /// Daily commits from the last year of weekly commit activity.
    ///
    /// Returns `None` when the statistics are unavailable or contain no commits.
    pub async fn fetch_stats(&self, repo: &RepoId) -> Option<MetricSeries> {
        let endpoint = format!("/repos/{}/{}/stats/commit_activity", repo.owner, repo.name);

        for attempt in 1..=STATS_ATTEMPTS {
            let response = match self.ctx.client.get(&endpoint).await {
                Ok(response) => response,
                Err(e) => {
                    log::warn!(target: LOG_TARGET, "commit stats request failed: {}", e);
                    return None;
                }
            };

            match response.status() {
                StatusCode::OK => {}
                StatusCode::ACCEPTED if attempt < STATS_ATTEMPTS => {
                    log::debug!(target: LOG_TARGET, "commit stats for {} still generating", repo);
                    tokio::time::sleep(self.ctx.stats_poll_delay).await;
                    continue;
                }
                StatusCode::ACCEPTED => {
                    log::info!(target: LOG_TARGET, "Commit stats still generating after retries");
                    return None;
                }
                status => {
                    log::warn!(target: LOG_TARGET, "Commit stats API non-200: {}", status);
                    return None;
                }
            }

            let weeks: Vec<WeekActivity> = match response.json().await {
                Ok(weeks) => weeks,
                Err(e) => {
                    log::warn!(target: LOG_TARGET, "commit stats not decodable: {}", e);
                    return None;
                }
            };

            let series = weeks_to_series(&weeks);
            return (!series.is_empty()).then_some(series);
        }

        None
    }

    /// Daily commits from the most recent pages of the commit listing.
    pub async fn fetch_commit_list(&self, repo: &RepoId) -> Result<MetricSeries> {
        let endpoint = format!("/repos/{}/{}/commits", repo.owner, repo.name);
        let limits = PageLimits {
            max_pages: FALLBACK_MAX_PAGES.min(self.ctx.max_pages),
            stop_on_short_page: true,
            max_events: None,
        };
        self.ctx
            .paginate_rest(
                MetricKind::Commits,
                &endpoint,
                &[],
                None,
                limits,
                |entry: CommitEntry, tally| tally.add_timestamp(entry.authored_at()),
            )
            .await
    }
}

/// Turn week buckets (Sunday start, seven daily counts) into dated rows, skipping zero days.
pub fn weeks_to_series(weeks: &[WeekActivity]) -> MetricSeries {
    let mut tally = DailyTally::new(MetricKind::Commits);

    for week in weeks {
        let Some(start) = DateTime::from_timestamp(week.week, 0) else {
            continue;
        };
        let start = start.date_naive();

        for (offset, count) in week.days.iter().enumerate() {
            let count = count.unwrap_or(0);
            if count == 0 {
                continue;
            }
            if let Some(date) = start.checked_add_days(Days::new(offset as u64)) {
                tally.add(date, count);
            }
        }
    }

    tally.into_series()
}

#[async_trait]
impl MetricFetcher for CommitsFetcher {
    fn kind(&self) -> MetricKind {
        MetricKind::Commits
    }

    async fn fetch(&self, repo: &RepoId) -> Result<MetricSeries> {
        if let Some(series) = self.fetch_stats(repo).await {
            return Ok(series);
        }
        log::info!(target: LOG_TARGET, "falling back to commit listing for {}", repo);
        self.fetch_commit_list(repo).await
    }
}
