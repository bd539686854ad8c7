pub mod config;
pub mod error;
pub mod fetcher;
pub mod filter;
pub mod github;
pub mod report;
pub mod stats;

use config::StatRequest;
use error::StatError;
use github::PullRequestSource;

/// Fetches, enriches and aggregates pull requests, returning the rendered report.
///
/// This separates data retrieval and processing from the command-line layer.
pub async fn run<S: PullRequestSource>(
    source: &S,
    request: &StatRequest,
) -> Result<String, StatError> {
    tracing::info!(
        repo = %request.repo,
        mode = %request.mode,
        start = %request.window.start.to_rfc3339(),
        end = %request.window.end.to_rfc3339(),
        "Fetching closed pull requests"
    );

    let records = fetcher::fetch_pull_requests(source, request).await?;
    tracing::info!(count = records.len(), "Pull requests matched the window");

    let records = fetcher::resolve_ready_times(
        source,
        &request.repo,
        records,
        request.timeline_concurrency,
    )
    .await;
    for record in &records {
        tracing::debug!(
            number = record.number,
            title = %record.title,
            author = %record.author,
            ready_for_review = record.ready_for_review_at.is_some(),
            "Resolved pull request"
        );
    }

    let aggregate = stats::aggregate(&records);
    report::format(&aggregate)
}
