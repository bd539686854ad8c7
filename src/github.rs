use crate::config::RepoId;
use crate::error::{SourceError, StatError};
use chrono::{DateTime, Utc};
use octocrab::models::timelines::TimelineEvent;
use octocrab::models::Event;
use octocrab::Octocrab;

/// Number of items requested per listing or timeline page.
pub const PAGE_SIZE: u8 = 100;

/// A pull request as returned by the closed-PR listing, before filtering.
#[derive(Debug, Clone, PartialEq)]
pub struct ListedPullRequest {
    pub number: u64,
    pub title: String,
    pub author: String,
    pub created_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub merged_at: Option<DateTime<Utc>>,
    pub base_ref: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimelineEventKind {
    ReadyForReview,
    Other,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimelineEntry {
    pub kind: TimelineEventKind,
    pub created_at: Option<DateTime<Utc>>,
}

/// Upstream API the fetcher pages through.
#[allow(async_fn_in_trait)]
pub trait PullRequestSource {
    /// One page (1-based) of closed pull requests, newest-created first.
    async fn list_closed(
        &self,
        repo: &RepoId,
        base: Option<&str>,
        page: u32,
    ) -> Result<Vec<ListedPullRequest>, SourceError>;

    /// The first page of the issue timeline for a pull request.
    async fn timeline(&self, repo: &RepoId, number: u64)
        -> Result<Vec<TimelineEntry>, SourceError>;
}

#[derive(Clone)]
pub struct GitHubClient {
    octocrab: Octocrab,
}

impl GitHubClient {
    pub fn new(token: String) -> Result<Self, StatError> {
        let octocrab = Octocrab::builder().personal_token(token).build()?;
        Ok(Self { octocrab })
    }
}

impl PullRequestSource for GitHubClient {
    async fn list_closed(
        &self,
        repo: &RepoId,
        base: Option<&str>,
        page: u32,
    ) -> Result<Vec<ListedPullRequest>, SourceError> {
        let pulls = self.octocrab.pulls(&repo.owner, &repo.repo);
        let mut request = pulls
            .list()
            .state(octocrab::params::State::Closed)
            .sort(octocrab::params::pulls::Sort::Created)
            .direction(octocrab::params::Direction::Descending)
            .per_page(PAGE_SIZE)
            .page(page);
        if let Some(base) = base {
            request = request.base(base);
        }
        let current_page = request.send().await?;

        let prs = current_page
            .items
            .into_iter()
            .filter_map(|pr| {
                let Some(created_at) = pr.created_at else {
                    tracing::debug!(number = pr.number, "Skipping PR without created_at");
                    return None;
                };

                Some(ListedPullRequest {
                    number: pr.number,
                    title: pr.title.unwrap_or_default(),
                    author: pr.user.map(|user| user.login).unwrap_or_default(),
                    created_at,
                    closed_at: pr.closed_at,
                    merged_at: pr.merged_at,
                    base_ref: pr.base.ref_field,
                })
            })
            .collect();

        Ok(prs)
    }

    async fn timeline(
        &self,
        repo: &RepoId,
        number: u64,
    ) -> Result<Vec<TimelineEntry>, SourceError> {
        let events = self
            .octocrab
            .issues(&repo.owner, &repo.repo)
            .list_timeline_events(number)
            .per_page(PAGE_SIZE)
            .page(1u32)
            .send()
            .await?;

        Ok(events.items.iter().map(timeline_entry).collect())
    }
}

fn timeline_entry(event: &TimelineEvent) -> TimelineEntry {
    let kind = if matches!(event.event, Event::ReadyForReview) {
        TimelineEventKind::ReadyForReview
    } else {
        TimelineEventKind::Other
    };
    TimelineEntry {
        kind,
        created_at: event.created_at,
    }
}
