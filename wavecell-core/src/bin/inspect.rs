//! wavecell-inspect - Operational read-side view of the asset index
//!
//! Loads the configured index document and answers the same queries the
//! service exposes: statistics, listing, search, popular, recent.
//! Output is pretty-printed JSON.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use wavecell_common::Settings;
use wavecell_core::library::AssetStore;

/// Command-line arguments for wavecell-inspect
#[derive(Parser, Debug)]
#[command(name = "wavecell-inspect")]
#[command(about = "Inspect the wavecell audio asset index")]
#[command(version)]
struct Args {
    /// Config file path (falls back to WAVECELL_CONFIG, then defaults)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Aggregate index statistics
    Stats,

    /// List indexed assets in identifier order
    List {
        /// Maximum number of entries to show
        #[arg(short, long, default_value_t = 100)]
        limit: usize,
    },

    /// Search assets by filename substring and tags
    Search {
        /// Case-insensitive filename substring (empty matches all)
        query: String,

        /// Require at least one of these tags
        #[arg(short, long)]
        tag: Vec<String>,

        #[arg(short, long, default_value_t = 100)]
        limit: usize,
    },

    /// Most-accessed assets
    Popular {
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },

    /// Most recently uploaded assets
    Recent {
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wavecell_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let settings = Settings::load(args.config.as_deref()).context("Failed to load settings")?;
    info!("Index document: {}", settings.index_path().display());

    let store = AssetStore::new(&settings).context("Failed to open asset store")?;

    match args.command {
        Command::Stats => print_json(&store.statistics().await)?,
        Command::List { limit } => print_json(&store.search("", &[], limit).await)?,
        Command::Search { query, tag, limit } => {
            print_json(&store.search(&query, &tag, limit).await)?
        }
        Command::Popular { limit } => print_json(&store.popular(limit).await)?,
        Command::Recent { limit } => print_json(&store.recent(limit).await)?,
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
