// ghpulse binary.
// Refreshes the cached metrics of one repository and prints a per-metric summary.

use std::process::ExitCode;

use clap::Parser;
use ghpulse::{Config, DataManager, MetricKind, RepoId};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Repository as `owner/name` or a GitHub URL
    repo: RepoId,

    /// Refetch even when the cache is fresh
    #[arg(short, long)]
    force: bool,

    /// Metrics to refresh (stars, forks, prs, downloads, issues, contributions); all when omitted
    metrics: Vec<MetricKind>,
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let repo = args.repo;
    let force_refresh = args.force;
    let kinds = if args.metrics.is_empty() {
        MetricKind::ALL.to_vec()
    } else {
        args.metrics
    };

    let config = Config::from_env();
    if config.token.is_none() {
        log::warn!("GITHUB_TOKEN not set, using unauthenticated rate limits");
    }

    let manager = match DataManager::new(config) {
        Ok(manager) => manager,
        Err(e) => {
            eprintln!("failed to initialise GitHub client: {}", e);
            return ExitCode::FAILURE;
        }
    };

    for kind in kinds {
        let series = manager.get(&repo, kind, force_refresh).await;
        let span = match (series.first_date(), series.last_date()) {
            (Some(first), Some(last)) => format!("{} .. {}", first, last),
            _ => "no data".to_string(),
        };
        println!("{:<14} {:>6} days  {}", kind.value_column(), series.len(), span);
    }

    if let Some(client) = manager.client() {
        let rate = client.rate_limit();
        log::info!("rate limit: {}/{} remaining", rate.remaining, rate.limit);
    }

    ExitCode::SUCCESS
}
