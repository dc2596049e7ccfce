//! # Hymnal CLI (`hymnal`)
//!
//! The `hymnal` binary serves, queries, inspects, and refreshes a hymn
//! corpus described by a TOML configuration file.
//!
//! ## Usage
//!
//! ```bash
//! hymnal --config ./config/hymnal.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `hymnal serve` | Start the HTTP server |
//! | `hymnal query [TEXT]` | Search and filter hymns |
//! | `hymnal get <REFERENCE>` | Print one hymn by reference |
//! | `hymnal stats` | Summarize the backing document |
//! | `hymnal sources` | List configured refresh sources |
//! | `hymnal refresh` | Merge refresh sources into the artifact |
//!
//! ## Exit status
//!
//! `0` on success, `2` when `refresh` gathered no data at all, `1` for any
//! other failure.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hymnal::config;
use hymnal::error::RefreshError;
use hymnal::query::QueryArgs;
use hymnal::{get, query, refresh, server, sources, stats};

/// Hymnal: normalization and query engine for a scriptural hymn corpus.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/hymnal.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "hymnal",
    about = "Hymnal: normalize, search, and serve a scriptural hymn corpus",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/hymnal.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server on `[server].bind`.
    ///
    /// The corpus is loaded on the first request that needs it.
    Serve,

    /// Search and filter hymns.
    ///
    /// Numeric options are parsed leniently: a malformed value falls back to
    /// its default. `All` for a filter means no filter.
    Query {
        /// Case-insensitive text matched against script, transliteration,
        /// translation, and reference.
        text: Option<String>,

        /// Exact attribution to filter by.
        #[arg(long)]
        attribution: Option<String>,

        /// Exact subject to filter by.
        #[arg(long)]
        subject: Option<String>,

        /// Exact theme to filter by.
        #[arg(long)]
        theme: Option<String>,

        /// Major group number to filter by.
        #[arg(long)]
        major_group: Option<String>,

        /// 1-based page number.
        #[arg(long, allow_hyphen_values = true)]
        page: Option<String>,

        /// Results per page.
        #[arg(long, allow_hyphen_values = true)]
        page_size: Option<String>,

        /// Print the raw JSON page instead of a listing.
        #[arg(long)]
        json: bool,
    },

    /// Print one hymn by its exact reference (e.g. "Rig Veda 1.1").
    Get {
        reference: String,

        /// Print the hymn as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show the detected document shape, counts, and per-group breakdown.
    Stats,

    /// List configured refresh sources.
    Sources,

    /// Fetch every refresh source, merge, back up, and write the artifact.
    ///
    /// Falls back to sampling the backing document when every source fails.
    /// Exits with status 2, writing nothing, when no data was gathered.
    Refresh,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hymnal=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    if let Err(err) = run(cli).await {
        eprintln!("Error: {:#}", err);
        let code = match err.downcast_ref::<RefreshError>() {
            Some(RefreshError::NoData) => 2,
            _ => 1,
        };
        std::process::exit(code);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
        Commands::Query {
            text,
            attribution,
            subject,
            theme,
            major_group,
            page,
            page_size,
            json,
        } => {
            let args = QueryArgs {
                text,
                attribution,
                subject,
                theme,
                major_group,
                page,
                page_size,
            };
            query::run_query(&cfg, &args, json)?;
        }
        Commands::Get { reference, json } => {
            get::run_get(&cfg, &reference, json)?;
        }
        Commands::Stats => {
            stats::run_stats(&cfg)?;
        }
        Commands::Sources => {
            sources::list_sources(&cfg)?;
        }
        Commands::Refresh => {
            refresh::run_refresh(&cfg).await?;
        }
    }

    Ok(())
}
