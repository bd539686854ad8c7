use crate::config::StatMode;
use crate::github::ListedPullRequest;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

/// A pull request that passed filtering, with its lifecycle timestamps resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct PullRequestRecord {
    pub number: u64,
    pub title: String,
    pub author: String,
    pub created_at: DateTime<Utc>,
    /// When a draft became ready for review, if it ever was one and the event was found.
    pub ready_for_review_at: Option<DateTime<Utc>>,
    /// Close or merge time, depending on the `StatMode` the record was built under.
    pub terminal_at: DateTime<Utc>,
    pub base_ref: String,
}

impl PullRequestRecord {
    /// Builds a record if the listing carries the terminal timestamp `mode` asks for.
    pub fn from_listing(pr: &ListedPullRequest, mode: StatMode) -> Option<Self> {
        let terminal_at = match mode {
            StatMode::CloseBased => pr.closed_at,
            StatMode::MergeBased => pr.merged_at,
        }?;

        Some(Self {
            number: pr.number,
            title: pr.title.clone(),
            author: pr.author.clone(),
            created_at: pr.created_at,
            ready_for_review_at: None,
            terminal_at,
            base_ref: pr.base_ref.clone(),
        })
    }

    /// The moment the pull request became reviewable.
    pub fn opened_at(&self) -> DateTime<Utc> {
        self.ready_for_review_at.unwrap_or(self.created_at)
    }

    pub fn create_to_terminal(&self) -> Duration {
        self.terminal_at - self.created_at
    }

    pub fn open_to_terminal(&self) -> Duration {
        self.terminal_at - self.opened_at()
    }
}

/// Aggregate statistics over a set of records.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateReport {
    pub count: usize,
    pub average_create_to_terminal: Duration,
    pub average_open_to_terminal: Duration,
    pub count_per_author: HashMap<String, usize>,
}

/// Calculates count, average durations and per-author counts.
///
/// An empty input yields a zero report rather than dividing by zero.
pub fn aggregate(records: &[PullRequestRecord]) -> AggregateReport {
    let mut count_per_author = HashMap::new();
    for record in records {
        *count_per_author.entry(record.author.clone()).or_insert(0) += 1;
    }

    AggregateReport {
        count: records.len(),
        average_create_to_terminal: average(records, PullRequestRecord::create_to_terminal),
        average_open_to_terminal: average(records, PullRequestRecord::open_to_terminal),
        count_per_author,
    }
}

/// Mean at nanosecond resolution, truncated toward zero.
fn average(records: &[PullRequestRecord], span: impl Fn(&PullRequestRecord) -> Duration) -> Duration {
    if records.is_empty() {
        return Duration::zero();
    }

    let total: i128 = records
        .iter()
        .map(|record| nanos(span(record)))
        .sum();
    let mean = total / records.len() as i128;

    Duration::nanoseconds(mean.clamp(i64::MIN as i128, i64::MAX as i128) as i64)
}

// Spans beyond ~292 years don't fit in i64 nanoseconds; fall back to microseconds.
fn nanos(span: Duration) -> i128 {
    match span.num_nanoseconds() {
        Some(n) => n as i128,
        None => span.num_microseconds().unwrap_or(i64::MAX) as i128 * 1_000,
    }
}
