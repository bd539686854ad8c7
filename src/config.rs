//! Run configuration and environment variable parsing.
//!
//! Everything the statistics pipeline needs is gathered into a `StatRequest` before any
//! network activity happens. The access token may come from the command line or from the
//! environment (optionally via a `.env` file), and validation failures surface as
//! `StatError::Configuration`.

use crate::error::StatError;
use crate::filter::{BaseBranchFilter, TimeWindow};
use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A unique identifier for a GitHub repository.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoId {
    /// The owner of the repository (e.g., "facebook").
    pub owner: String,
    /// The name of the repository (e.g., "react").
    pub repo: String,
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

/// Which lifecycle event ends a pull request for the purpose of the statistics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum StatMode {
    /// Every closed pull request counts, measured up to `closed_at`.
    #[default]
    #[value(name = "close")]
    CloseBased,
    /// Only merged pull requests count, measured up to `merged_at`.
    #[value(name = "merge")]
    MergeBased,
}

impl fmt::Display for StatMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatMode::CloseBased => f.write_str("close"),
            StatMode::MergeBased => f.write_str("merge"),
        }
    }
}

/// Settings read from the process environment.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct EnvConfig {
    /// GitHub Personal Access Token used when `--token` is not given.
    pub github_access_token: Option<String>,
}

impl EnvConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        envy::from_env()
    }
}

/// Picks the explicit token if one was passed, otherwise the environment's.
///
/// Blank values are treated as missing.
pub fn resolve_token(explicit: Option<&str>, env: &EnvConfig) -> Result<String, StatError> {
    explicit
        .or(env.github_access_token.as_deref())
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .ok_or_else(|| {
            StatError::Configuration(
                "provide a GitHub access token with --token or GITHUB_ACCESS_TOKEN".to_string(),
            )
        })
}

/// Fully validated parameters for a single statistics run.
#[derive(Clone, Debug)]
pub struct StatRequest {
    pub repo: RepoId,
    pub window: TimeWindow,
    pub bases: BaseBranchFilter,
    pub mode: StatMode,

    /// Number of timeline lookups allowed in flight at once. Results keep record order.
    pub timeline_concurrency: usize,

    /// Hard limit on the number of listing pages requested, if any.
    pub max_pages: Option<u32>,
}

impl StatRequest {
    /// Validates raw inputs and assembles a request.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        owner: &str,
        repo: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        include_bases: Vec<String>,
        exclude_bases: Vec<String>,
        mode: StatMode,
        timeline_concurrency: usize,
        max_pages: Option<u32>,
    ) -> Result<Self, StatError> {
        let owner = owner.trim();
        let repo = repo.trim();
        if owner.is_empty() || repo.is_empty() {
            return Err(StatError::Configuration(
                "repository owner and name must not be empty".to_string(),
            ));
        }
        if start >= end {
            return Err(StatError::Configuration(format!(
                "start ({}) must be earlier than end ({})",
                start.to_rfc3339(),
                end.to_rfc3339()
            )));
        }
        if timeline_concurrency == 0 {
            return Err(StatError::Configuration(
                "timeline concurrency must be at least 1".to_string(),
            ));
        }
        if max_pages == Some(0) {
            return Err(StatError::Configuration(
                "max pages must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            repo: RepoId {
                owner: owner.to_string(),
                repo: repo.to_string(),
            },
            window: TimeWindow::new(start, end),
            bases: BaseBranchFilter::new(include_bases, exclude_bases),
            mode,
            timeline_concurrency,
            max_pages,
        })
    }
}
