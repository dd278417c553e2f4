// GitHub API response types.
// Only the fields the metric fetchers read; timestamps stay raw so one bad value skips one event.

use serde::Deserialize;
use serde::de::IgnoredAny;

/// Stargazer entry (requires the `star+json` media type to carry `starred_at`).
#[derive(Debug, Clone, Deserialize)]
pub struct Stargazer {
    #[serde(default)]
    pub starred_at: Option<String>,
}

/// Anything listed with a creation timestamp: forks, pull requests.
#[derive(Debug, Clone, Deserialize)]
pub struct Created {
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Issue as returned by the issues listing, which also includes pull requests.
#[derive(Debug, Clone, Deserialize)]
pub struct Issue {
    #[serde(default)]
    pub created_at: Option<String>,
    /// Present (non-null) only when the issue is actually a pull request.
    #[serde(default)]
    pub pull_request: Option<IgnoredAny>,
}

impl Issue {
    pub fn is_pull_request(&self) -> bool {
        self.pull_request.is_some()
    }
}

/// Entry in the commits listing.
#[derive(Debug, Clone, Deserialize)]
pub struct CommitEntry {
    #[serde(default)]
    pub commit: Option<CommitDetail>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommitDetail {
    #[serde(default)]
    pub author: Option<GitActor>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitActor {
    #[serde(default)]
    pub date: Option<String>,
}

impl CommitEntry {
    pub fn authored_at(&self) -> Option<&str> {
        self.commit
            .as_ref()
            .and_then(|c| c.author.as_ref())
            .and_then(|a| a.date.as_deref())
    }
}

/// One week bucket from the commit activity statistics.
#[derive(Debug, Clone, Deserialize)]
pub struct WeekActivity {
    /// Start of the week (Sunday, 00:00 UTC) as Unix seconds.
    #[serde(default)]
    pub week: i64,
    /// Commit counts for Sunday through Saturday.
    #[serde(default)]
    pub days: Vec<Option<u64>>,
}

/// Release with its downloadable assets.
#[derive(Debug, Clone, Deserialize)]
pub struct Release {
    #[serde(default)]
    pub tag_name: Option<String>,
    #[serde(default)]
    pub published_at: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub assets: Vec<ReleaseAsset>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseAsset {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub download_count: Option<u64>,
}

/// GraphQL connection page with either `nodes` or `edges` populated.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    #[serde(default)]
    pub page_info: Option<PageInfo>,
    #[serde(default)]
    pub nodes: Vec<Option<TimestampNode>>,
    #[serde(default)]
    pub edges: Vec<Option<TimestampNode>>,
}

impl Connection {
    /// Timestamps from whichever list the query selected.
    pub fn timestamps(&self) -> impl Iterator<Item = Option<&str>> + '_ {
        self.nodes
            .iter()
            .chain(self.edges.iter())
            .map(|node| node.as_ref().and_then(|n| n.timestamp.as_deref()))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    #[serde(default)]
    pub has_next_page: bool,
    #[serde(default)]
    pub end_cursor: Option<String>,
}

/// Node or edge carrying the event time (`createdAt`, or `starredAt` on stargazer edges).
#[derive(Debug, Clone, Deserialize)]
pub struct TimestampNode {
    #[serde(rename = "createdAt", alias = "starredAt", default)]
    pub timestamp: Option<String>,
}

/// Rate limit information from response headers.
#[derive(Debug, Clone, Default)]
pub struct RateLimit {
    pub limit: u64,
    pub remaining: u64,
    pub reset: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_pull_request_marker() {
        let items: Vec<Issue> = serde_json::from_str(
            r#"[
                {"created_at": "2024-01-01T00:00:00Z"},
                {"created_at": "2024-01-01T00:00:00Z", "pull_request": null},
                {"created_at": "2024-01-01T00:00:00Z", "pull_request": {"url": "x", "merged_at": null}}
            ]"#,
        )
        .unwrap();
        let flags: Vec<bool> = items.iter().map(Issue::is_pull_request).collect();
        assert_eq!(flags, vec![false, false, true]);
    }

    #[test]
    fn test_connection_reads_nodes_and_edges() {
        let nodes: Connection = serde_json::from_str(
            r#"{"nodes": [{"createdAt": "2024-01-01T00:00:00Z"}, null],
                "pageInfo": {"hasNextPage": true, "endCursor": "abc"}}"#,
        )
        .unwrap();
        assert_eq!(nodes.timestamps().flatten().count(), 1);
        let page = nodes.page_info.unwrap();
        assert!(page.has_next_page);
        assert_eq!(page.end_cursor.as_deref(), Some("abc"));

        let edges: Connection =
            serde_json::from_str(r#"{"edges": [{"starredAt": "2024-01-01T00:00:00Z"}]}"#).unwrap();
        assert_eq!(
            edges.timestamps().collect::<Vec<_>>(),
            vec![Some("2024-01-01T00:00:00Z")]
        );
        assert!(edges.page_info.is_none());
    }

    #[test]
    fn test_commit_entry_author_date() {
        let entry: CommitEntry =
            serde_json::from_str(r#"{"commit": {"author": {"date": "2024-02-03T04:05:06Z"}}}"#)
                .unwrap();
        assert_eq!(entry.authored_at(), Some("2024-02-03T04:05:06Z"));

        let bare: CommitEntry = serde_json::from_str(r#"{"sha": "abc"}"#).unwrap();
        assert_eq!(bare.authored_at(), None);
    }
}
