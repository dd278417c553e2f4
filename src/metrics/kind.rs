// Metric kind tags.
// Each kind fixes the value column name and the file stem it is persisted under.

use std::fmt;
use std::str::FromStr;

use crate::error::PulseError;

/// One of the six tracked activity metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MetricKind {
    Stars,
    Forks,
    PullRequests,
    Downloads,
    Issues,
    Commits,
}

impl MetricKind {
    pub const ALL: [MetricKind; 6] = [
        MetricKind::Stars,
        MetricKind::Forks,
        MetricKind::PullRequests,
        MetricKind::Downloads,
        MetricKind::Issues,
        MetricKind::Commits,
    ];

    /// Metrics whose values can be re-verified against release and commit data.
    pub const VERIFIABLE: [MetricKind; 2] = [MetricKind::Downloads, MetricKind::Commits];

    /// Short tag, also used as the cache file stem.
    pub fn tag(&self) -> &'static str {
        match self {
            MetricKind::Stars => "stars",
            MetricKind::Forks => "forks",
            MetricKind::PullRequests => "prs",
            MetricKind::Downloads => "downloads",
            MetricKind::Issues => "issues",
            MetricKind::Commits => "contributions",
        }
    }

    /// Name of the value column next to `date`.
    pub fn value_column(&self) -> &'static str {
        match self {
            MetricKind::Stars => "stars",
            MetricKind::Forks => "forks",
            MetricKind::PullRequests => "pr_count",
            MetricKind::Downloads => "downloads",
            MetricKind::Issues => "issues",
            MetricKind::Commits => "commits",
        }
    }

    /// The two-column schema: `date` followed by the value column.
    pub fn columns(&self) -> [&'static str; 2] {
        ["date", self.value_column()]
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for MetricKind {
    type Err = PulseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stars" => Ok(MetricKind::Stars),
            "forks" => Ok(MetricKind::Forks),
            "prs" | "pulls" | "pull_requests" => Ok(MetricKind::PullRequests),
            "downloads" => Ok(MetricKind::Downloads),
            "issues" => Ok(MetricKind::Issues),
            "contributions" | "commits" => Ok(MetricKind::Commits),
            other => Err(PulseError::Other(format!("unknown metric type: {other}"))),
        }
    }
}
