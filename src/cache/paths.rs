// Cache path utilities.
// Lays metric files out as <data_dir>/<owner>/<repo>/<metric>.csv.

use std::path::{Path, PathBuf};

use crate::metrics::MetricKind;
use crate::repo::RepoId;

/// Path to a repository's directory.
pub fn repo_dir(data_dir: &Path, repo: &RepoId) -> PathBuf {
    data_dir
        .join(sanitize_name(&repo.owner))
        .join(sanitize_name(&repo.name))
}

/// Path to the persisted series of one metric.
pub fn series_path(data_dir: &Path, repo: &RepoId, kind: MetricKind) -> PathBuf {
    repo_dir(data_dir, repo).join(format!("{}.csv", kind.tag()))
}

/// Sanitize a name for use in filesystem paths.
/// Replaces problematic characters with underscores.
fn sanitize_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            _ => c,
        })
        .collect();

    match cleaned.as_str() {
        "." | ".." => cleaned.replace('.', "_"),
        _ => cleaned,
    }
}
