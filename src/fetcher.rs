//! Paging, filtering and timeline enrichment of closed pull requests.
//!
//! The listing is sorted by creation time while the window applies to the close/merge
//! time, so paging cannot stop at the first out-of-window record. It stops once a page is
//! empty or the oldest PR on it was created before the window start. That bound is a
//! heuristic: a PR created before the window but closed inside it can still sit on a
//! later page and be missed.

use crate::config::{RepoId, StatRequest};
use crate::error::StatError;
use crate::github::{PullRequestSource, TimelineEventKind};
use crate::stats::PullRequestRecord;
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};

/// Pages through closed PRs and keeps those whose terminal time falls in the window.
///
/// Any listing failure aborts the fetch and discards what was collected.
pub async fn fetch_pull_requests<S: PullRequestSource>(
    source: &S,
    request: &StatRequest,
) -> Result<Vec<PullRequestRecord>, StatError> {
    let server_base = request.bases.server_side_base();
    let mut records = Vec::new();
    let mut page = 1;

    loop {
        let listed = source
            .list_closed(&request.repo, server_base, page)
            .await
            .map_err(|source| StatError::Transport {
                repo: request.repo.to_string(),
                page,
                source,
            })?;

        if listed.is_empty() {
            tracing::debug!(page, "Empty page, pagination finished");
            break;
        }

        let before = records.len();
        records.extend(
            listed
                .iter()
                .filter_map(|pr| PullRequestRecord::from_listing(pr, request.mode))
                .filter(|record| request.bases.accepts(&record.base_ref))
                .filter(|record| request.window.contains(record.terminal_at)),
        );
        tracing::debug!(
            page,
            listed = listed.len(),
            kept = records.len() - before,
            "Processed pull request page"
        );

        let oldest_created = listed.iter().map(|pr| pr.created_at).min();
        if oldest_created.is_some_and(|created_at| created_at < request.window.start) {
            break;
        }

        if request.max_pages.is_some_and(|max_pages| page >= max_pages) {
            tracing::warn!(
                "Hit max pages ({}) for repo {} before reaching the window start. Data may be incomplete.",
                page,
                request.repo
            );
            break;
        }

        page += 1;
    }

    Ok(records)
}

/// Finds when a pull request was first marked ready for review.
///
/// Only the first timeline page is inspected. A failed lookup is logged and treated as
/// "no event", so the caller falls back to the creation time.
pub async fn resolve_ready_for_review<S: PullRequestSource>(
    source: &S,
    repo: &RepoId,
    number: u64,
) -> Option<DateTime<Utc>> {
    match source.timeline(repo, number).await {
        Ok(events) => events
            .into_iter()
            .find(|event| event.kind == TimelineEventKind::ReadyForReview)
            .and_then(|event| event.created_at),
        Err(e) => {
            tracing::warn!(repo = %repo, number, "Failed to fetch timeline: {}", e);
            None
        }
    }
}

/// Fills in `ready_for_review_at` for every record, keeping the input order.
pub async fn resolve_ready_times<S: PullRequestSource>(
    source: &S,
    repo: &RepoId,
    records: Vec<PullRequestRecord>,
    concurrency: usize,
) -> Vec<PullRequestRecord> {
    stream::iter(records)
        .map(|mut record| async move {
            record.ready_for_review_at =
                resolve_ready_for_review(source, repo, record.number).await;
            record
        })
        .buffered(concurrency.max(1))
        .collect()
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StatMode;
    use crate::error::SourceError;
    use crate::github::{ListedPullRequest, TimelineEntry};
    use chrono::TimeZone;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeSource {
        pages: Vec<Vec<ListedPullRequest>>,
        timelines: HashMap<u64, Vec<TimelineEntry>>,
        failing_page: Option<u32>,
        requested: Mutex<Vec<(u32, Option<String>)>>,
    }

    impl PullRequestSource for FakeSource {
        async fn list_closed(
            &self,
            _repo: &RepoId,
            base: Option<&str>,
            page: u32,
        ) -> Result<Vec<ListedPullRequest>, SourceError> {
            self.requested
                .lock()
                .unwrap()
                .push((page, base.map(str::to_string)));
            if self.failing_page == Some(page) {
                return Err("connection reset".into());
            }
            Ok(self
                .pages
                .get(page as usize - 1)
                .cloned()
                .unwrap_or_default())
        }

        async fn timeline(
            &self,
            _repo: &RepoId,
            number: u64,
        ) -> Result<Vec<TimelineEntry>, SourceError> {
            self.timelines
                .get(&number)
                .cloned()
                .ok_or_else(|| "timeline unavailable".into())
        }
    }

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, d, 12, 0, 0).unwrap()
    }

    fn listed(number: u64, created: DateTime<Utc>, closed: DateTime<Utc>) -> ListedPullRequest {
        ListedPullRequest {
            number,
            title: format!("PR {number}"),
            author: "octocat".to_string(),
            created_at: created,
            closed_at: Some(closed),
            merged_at: Some(closed),
            base_ref: "main".to_string(),
        }
    }

    fn request(include: &[&str], exclude: &[&str], mode: StatMode) -> StatRequest {
        StatRequest::new(
            "octo",
            "repo",
            day(10),
            day(20),
            include.iter().map(|s| s.to_string()).collect(),
            exclude.iter().map(|s| s.to_string()).collect(),
            mode,
            1,
            None,
        )
        .unwrap()
    }

    fn pages_requested(source: &FakeSource) -> Vec<u32> {
        source
            .requested
            .lock()
            .unwrap()
            .iter()
            .map(|(page, _)| *page)
            .collect()
    }

    #[tokio::test]
    async fn test_window_bounds_are_half_open() {
        let source = FakeSource {
            pages: vec![vec![
                listed(1, day(19), day(20)),
                listed(2, day(12), day(19)),
                listed(3, day(9), day(10)),
                listed(4, day(8), day(9)),
            ]],
            ..Default::default()
        };

        let records = fetch_pull_requests(&source, &request(&[], &[], StatMode::CloseBased))
            .await
            .unwrap();

        let numbers: Vec<u64> = records.iter().map(|r| r.number).collect();
        assert_eq!(numbers, vec![2, 3]);
    }

    #[tokio::test]
    async fn test_stops_after_page_older_than_window() {
        let source = FakeSource {
            pages: vec![
                vec![listed(1, day(18), day(19)), listed(2, day(15), day(16))],
                vec![listed(3, day(11), day(12)), listed(4, day(5), day(11))],
                vec![listed(5, day(4), day(13))],
            ],
            ..Default::default()
        };

        let records = fetch_pull_requests(&source, &request(&[], &[], StatMode::CloseBased))
            .await
            .unwrap();

        assert_eq!(pages_requested(&source), vec![1, 2]);
        let numbers: Vec<u64> = records.iter().map(|r| r.number).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_stops_on_empty_page() {
        let source = FakeSource {
            pages: vec![vec![listed(1, day(18), day(19))]],
            ..Default::default()
        };

        let records = fetch_pull_requests(&source, &request(&[], &[], StatMode::CloseBased))
            .await
            .unwrap();

        assert_eq!(pages_requested(&source), vec![1, 2]);
        assert_eq!(records.len(), 1);
    }

    #[tokio::test]
    async fn test_max_pages_truncates() {
        let source = FakeSource {
            pages: vec![
                vec![listed(1, day(18), day(19))],
                vec![listed(2, day(17), day(18))],
                vec![listed(3, day(16), day(17))],
            ],
            ..Default::default()
        };
        let mut req = request(&[], &[], StatMode::CloseBased);
        req.max_pages = Some(2);

        let records = fetch_pull_requests(&source, &req).await.unwrap();

        assert_eq!(pages_requested(&source), vec![1, 2]);
        assert_eq!(records.len(), 2);
    }

    #[tokio::test]
    async fn test_merge_mode_skips_unmerged() {
        let mut unmerged = listed(2, day(12), day(13));
        unmerged.merged_at = None;
        let source = FakeSource {
            pages: vec![vec![listed(1, day(12), day(14)), unmerged]],
            ..Default::default()
        };

        let merged = fetch_pull_requests(&source, &request(&[], &[], StatMode::MergeBased))
            .await
            .unwrap();
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].number, 1);

        let closed = fetch_pull_requests(&source, &request(&[], &[], StatMode::CloseBased))
            .await
            .unwrap();
        assert_eq!(closed.len(), 2);
    }

    #[tokio::test]
    async fn test_base_filters() {
        let mut develop = listed(2, day(12), day(13));
        develop.base_ref = "develop".to_string();
        let mut release = listed(3, day(12), day(13));
        release.base_ref = "release".to_string();
        let source = FakeSource {
            pages: vec![vec![listed(1, day(12), day(13)), develop, release]],
            ..Default::default()
        };

        let included = fetch_pull_requests(
            &source,
            &request(&["main", "develop"], &["develop"], StatMode::CloseBased),
        )
        .await
        .unwrap();
        let numbers: Vec<u64> = included.iter().map(|r| r.number).collect();
        assert_eq!(numbers, vec![1]);

        let excluded =
            fetch_pull_requests(&source, &request(&[], &["main"], StatMode::CloseBased))
                .await
                .unwrap();
        let numbers: Vec<u64> = excluded.iter().map(|r| r.number).collect();
        assert_eq!(numbers, vec![2, 3]);
    }

    #[tokio::test]
    async fn test_single_include_is_sent_upstream() {
        let source = FakeSource::default();

        fetch_pull_requests(&source, &request(&["main"], &[], StatMode::CloseBased))
            .await
            .unwrap();

        let requested = source.requested.lock().unwrap().clone();
        assert_eq!(requested, vec![(1, Some("main".to_string()))]);
    }

    #[tokio::test]
    async fn test_listing_failure_aborts() {
        let source = FakeSource {
            pages: vec![vec![listed(1, day(18), day(19))]],
            failing_page: Some(2),
            ..Default::default()
        };

        let result = fetch_pull_requests(&source, &request(&[], &[], StatMode::CloseBased)).await;

        assert!(matches!(result, Err(StatError::Transport { page: 2, .. })));
    }

    #[tokio::test]
    async fn test_resolve_ready_for_review_picks_first_event() {
        let ready = day(11);
        let source = FakeSource {
            timelines: HashMap::from([(
                7,
                vec![
                    TimelineEntry {
                        kind: TimelineEventKind::Other,
                        created_at: Some(day(10)),
                    },
                    TimelineEntry {
                        kind: TimelineEventKind::ReadyForReview,
                        created_at: Some(ready),
                    },
                    TimelineEntry {
                        kind: TimelineEventKind::ReadyForReview,
                        created_at: Some(day(12)),
                    },
                ],
            )]),
            ..Default::default()
        };
        let repo = request(&[], &[], StatMode::CloseBased).repo;

        assert_eq!(resolve_ready_for_review(&source, &repo, 7).await, Some(ready));
        assert_eq!(resolve_ready_for_review(&source, &repo, 8).await, None);
    }

    #[tokio::test]
    async fn test_resolve_ready_times_keeps_order() {
        let source = FakeSource {
            timelines: HashMap::from([
                (
                    1,
                    vec![TimelineEntry {
                        kind: TimelineEventKind::ReadyForReview,
                        created_at: Some(day(13)),
                    }],
                ),
                (2, vec![]),
            ]),
            ..Default::default()
        };
        let req = request(&[], &[], StatMode::CloseBased);
        let records: Vec<_> = [1, 2, 3]
            .into_iter()
            .map(|n| {
                PullRequestRecord::from_listing(&listed(n, day(12), day(14)), StatMode::CloseBased)
                    .unwrap()
            })
            .collect();

        let resolved = resolve_ready_times(&source, &req.repo, records, 3).await;

        let numbers: Vec<u64> = resolved.iter().map(|r| r.number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        assert_eq!(resolved[0].ready_for_review_at, Some(day(13)));
        assert_eq!(resolved[0].opened_at(), day(13));
        assert_eq!(resolved[1].ready_for_review_at, None);
        assert_eq!(resolved[2].ready_for_review_at, None);
        assert_eq!(resolved[2].opened_at(), day(12));
    }
}
