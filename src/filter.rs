//! Record predicates applied while paging through pull requests.

use chrono::{DateTime, Utc};
use std::collections::HashSet;

/// A half-open time range `[start, end)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.start && at < self.end
    }
}

/// Include/exclude sets over the branch a pull request targets.
///
/// A single include entry is pushed to the listing query (see `server_side_base`); it is
/// still checked locally, which is a no-op against a well-behaved server. Exclusion wins
/// over inclusion.
#[derive(Clone, Debug, Default)]
pub struct BaseBranchFilter {
    include: HashSet<String>,
    exclude: HashSet<String>,
}

impl BaseBranchFilter {
    pub fn new(include: Vec<String>, exclude: Vec<String>) -> Self {
        Self {
            include: clean_names(include),
            exclude: clean_names(exclude),
        }
    }

    /// The base branch to request server-side, when exactly one is included.
    pub fn server_side_base(&self) -> Option<&str> {
        if self.include.len() == 1 {
            self.include.iter().next().map(String::as_str)
        } else {
            None
        }
    }

    pub fn accepts(&self, base: &str) -> bool {
        if !self.include.is_empty() && !self.include.contains(base) {
            return false;
        }
        !self.exclude.contains(base)
    }
}

fn clean_names(names: Vec<String>) -> HashSet<String> {
    names
        .into_iter()
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .collect()
}
