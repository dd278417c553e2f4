// Error types for ghpulse.
// Covers GitHub transport failures, payload decoding, and cache persistence.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PulseError {
    #[error("GitHub API error: {0}")]
    Api(#[from] reqwest::Error),

    #[error("HTTP {status} from {url}")]
    HttpStatus { status: u16, url: String },

    #[error("No data returned: {0}")]
    NoData(String),

    #[error("Invalid header value")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),

    #[error("Invalid repository identifier: {0}")]
    InvalidRepo(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Unexpected data layout: {0}")]
    Schema(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, PulseError>;
