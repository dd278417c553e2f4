// Repository identity.
// The (owner, name) pair that addresses every fetch and cache operation.

use std::fmt;
use std::str::FromStr;

use crate::error::{PulseError, Result};

/// A GitHub repository, e.g. `rust-lang/cargo`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RepoId {
    pub owner: String,
    pub name: String,
}

impl RepoId {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }

    /// Parse `owner/name`.
    pub fn parse(input: &str) -> Result<Self> {
        let trimmed = input.trim().trim_end_matches('/');
        let mut parts = trimmed.split('/');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(owner), Some(name), None) if valid_segment(owner) && valid_segment(name) => {
                Ok(Self::new(owner, name))
            }
            _ => Err(PulseError::InvalidRepo(input.to_string())),
        }
    }

    /// Parse a repository URL such as `https://github.com/owner/name.git`.
    pub fn from_url(url: &str) -> Result<Self> {
        let trimmed = url.trim().trim_end_matches('/');
        let path = trimmed
            .split_once("github.com/")
            .or_else(|| trimmed.split_once("github.com:"))
            .map(|(_, rest)| rest)
            .ok_or_else(|| PulseError::InvalidRepo(url.to_string()))?;

        let mut parts = path.split('/');
        let owner = parts.next().unwrap_or_default();
        let name = parts.next().unwrap_or_default().trim_end_matches(".git");
        if valid_segment(owner) && valid_segment(name) {
            Ok(Self::new(owner, name))
        } else {
            Err(PulseError::InvalidRepo(url.to_string()))
        }
    }
}

fn valid_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

impl FromStr for RepoId {
    type Err = PulseError;

    fn from_str(s: &str) -> Result<Self> {
        if s.contains("github.com") {
            Self::from_url(s)
        } else {
            Self::parse(s)
        }
    }
}
