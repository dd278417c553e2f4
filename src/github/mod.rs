// GitHub API module.
// REST and GraphQL transport plus the payload types the fetchers read.

pub mod client;
pub mod graphql;
pub mod types;

pub use client::GitHubClient;
pub use types::*;
