mod analyze;
mod chat;
mod query;

use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// Timeout for TEI and chat requests.
const MODEL_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Parser)]
#[command(name = "tagpulse")]
#[command(about = "Hashtag post collection, sentiment and keyword analysis")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Collect and enrich posts for a hashtag, writing raw and final snapshots
    Analyze {
        /// Hashtag to analyze, with or without the leading '#'
        hashtag: String,

        /// Number of posts to collect (20-500)
        #[arg(long, default_value_t = 100, value_parser = clap::value_parser!(u32).range(20..=500))]
        limit: u32,
    },
    /// Search cleaned captions of an analyzed hashtag
    Search {
        hashtag: String,
        term: String,

        #[arg(long)]
        case_sensitive: bool,
    },
    /// Print a markdown report for an analyzed hashtag
    Report {
        hashtag: String,

        /// Number of keywords to list
        #[arg(long, default_value_t = 20)]
        top: usize,

        /// Emit the aggregates as JSON instead of markdown
        #[arg(long)]
        json: bool,
    },
    /// Ask one question about an analyzed hashtag
    Ask { hashtag: String, question: String },
    /// Interactive question loop over an analyzed hashtag
    Chat { hashtag: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = tagpulse_core::load_app_config()?;

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Analyze { hashtag, limit } => analyze::run_analyze(&config, &hashtag, limit).await,
        Commands::Search {
            hashtag,
            term,
            case_sensitive,
        } => query::run_search(&config, &hashtag, &term, case_sensitive),
        Commands::Report { hashtag, top, json } => query::run_report(&config, &hashtag, top, json),
        Commands::Ask { hashtag, question } => chat::run_ask(&config, &hashtag, &question).await,
        Commands::Chat { hashtag } => chat::run_chat(&config, &hashtag).await,
    }
}

#[cfg(test)]
mod tests;
