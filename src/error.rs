//! Error types for a statistics run.

use thiserror::Error;

/// Boxed error returned by a `PullRequestSource`.
pub type SourceError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum StatError {
    /// A required credential or parameter is missing or invalid.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Listing pull requests failed; the whole run is abandoned.
    #[error("failed to list pull requests for {repo} (page {page}): {source}")]
    Transport {
        repo: String,
        page: u32,
        #[source]
        source: SourceError,
    },

    /// The report could not be serialized.
    #[error("failed to encode report: {0}")]
    Encoding(#[from] serde_json::Error),

    /// The GitHub client could not be constructed.
    #[error("failed to build GitHub client: {0}")]
    Client(#[from] octocrab::Error),
}
