use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::Parser;
use pr_stat::config::{self, EnvConfig, StatMode, StatRequest};
use pr_stat::github::GitHubClient;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "pr-stat")]
#[command(about = "Show pull request statistics for a repository", long_about = None)]
#[command(version)]
struct Cli {
    /// Repository owner
    #[arg(short, long)]
    owner: String,

    /// Repository name
    #[arg(short, long)]
    repository: String,

    /// Start of the window, inclusive (RFC 3339)
    #[arg(short, long, value_parser = parse_timestamp)]
    start: DateTime<Utc>,

    /// End of the window, exclusive (RFC 3339)
    #[arg(short, long, value_parser = parse_timestamp)]
    end: DateTime<Utc>,

    /// GitHub access token (defaults to GITHUB_ACCESS_TOKEN)
    #[arg(short, long)]
    token: Option<String>,

    /// Base branch(es) to include
    #[arg(short, long = "base", value_delimiter = ',')]
    base: Vec<String>,

    /// Base branch(es) to exclude
    #[arg(long, value_delimiter = ',')]
    exclude_base: Vec<String>,

    /// Which event ends a pull request's lifecycle
    #[arg(long, value_enum, default_value_t = StatMode::CloseBased)]
    mode: StatMode,

    /// Number of timeline lookups to run at once
    #[arg(long, default_value_t = 1)]
    timeline_concurrency: usize,

    /// Stop paging after this many listing pages
    #[arg(long)]
    max_pages: Option<u32>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(value)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|e| format!("expected an RFC 3339 timestamp: {e}"))
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries only the report
    let default_filter = if cli.verbose {
        "pr_stat=debug"
    } else {
        "pr_stat=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match execute(cli).await {
        Ok(report) => println!("{report}"),
        Err(e) => {
            tracing::error!("{:#}", e);
            std::process::exit(1);
        }
    }
}

async fn execute(cli: Cli) -> anyhow::Result<String> {
    dotenvy::dotenv().ok();
    let env = EnvConfig::from_env().context("Failed to read environment")?;
    let token = config::resolve_token(cli.token.as_deref(), &env)?;

    let request = StatRequest::new(
        &cli.owner,
        &cli.repository,
        cli.start,
        cli.end,
        cli.base,
        cli.exclude_base,
        cli.mode,
        cli.timeline_concurrency,
        cli.max_pages,
    )?;

    let client = GitHubClient::new(token)?;
    let report = pr_stat::run(&client, &request).await?;
    Ok(report)
}
