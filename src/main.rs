//! # trendlens CLI (`trend`)
//!
//! Collects daily catalog snapshots, scores them, and answers ranking
//! queries over the stored history.
//!
//! ## Usage
//!
//! ```bash
//! trend --config ./config/trend.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `trend init` | Create the SQLite database and schema |
//! | `trend collect categories <ID>...` | Catalog-wide popular listing per category |
//! | `trend collect collections` | Recent uploads of every active collection |
//! | `trend rank` | Ranked snapshots for a date |
//! | `trend show <ITEM_ID>` | One item with scores, delta and labels |
//! | `trend label <ITEM_ID> --yes/--no` | Record a review decision |
//! | `trend unlabeled` | Items still awaiting review |
//! | `trend collections list/add/remove/block/unblock` | Manage the watch list |
//! | `trend stats` | Row counts |
//!
//! Exit codes: `0` success, `1` runtime failure, `2` invalid input.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use trendlens::rank::RankArgs;
use trendlens::{collections, config, ingest, labels, migrate, rank, show, stats, telemetry};
use trendlens_core::ValidationError;

/// trendlens: daily trend snapshots with heuristic and composite scoring.
///
/// All commands accept `--config` pointing to a TOML configuration file.
/// See `config/trend.example.toml` for every option.
#[derive(Parser)]
#[command(name = "trend", version, about = "Collect, score and rank catalog trend snapshots")]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/trend.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema. Idempotent.
    Init,

    /// Run a collection pass.
    Collect {
        #[command(subcommand)]
        mode: CollectMode,
    },

    /// Rank snapshots observed on a date.
    Rank(RankCli),

    /// Show one item with its latest scores, 14-day delta and labels.
    Show {
        item_id: String,

        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Record a review label for an item.
    Label {
        item_id: String,

        /// Mark the item as a target.
        #[arg(long, conflicts_with = "no", required_unless_present = "no")]
        yes: bool,

        /// Mark the item as not a target.
        #[arg(long)]
        no: bool,

        /// Reviewer name.
        #[arg(long, default_value = "cli")]
        by: String,

        #[arg(long, default_value = "")]
        notes: String,
    },

    /// List items with no labels, best score first.
    Unlabeled {
        #[arg(long, default_value = "20")]
        limit: usize,
    },

    /// Manage the collection watch list.
    Collections {
        #[command(subcommand)]
        action: CollectionsAction,
    },

    /// Show row counts and the newest observation date.
    Stats,
}

#[derive(Subcommand)]
enum CollectMode {
    /// Popular listing for one or more categories.
    Categories {
        /// Category ids.
        #[arg(required = true)]
        ids: Vec<String>,

        /// Records per category (1..=50).
        #[arg(long)]
        max: Option<usize>,

        /// Observation date (YYYY-MM-DD). Defaults to today (UTC).
        #[arg(long)]
        date: Option<String>,
    },

    /// Recent uploads of every active, non-blacklisted collection.
    Collections {
        /// Records per collection (1..=50).
        #[arg(long)]
        max: Option<usize>,

        /// Only uploads published within this many days.
        #[arg(long)]
        days: Option<u32>,

        /// Skip collections already collected on the run date.
        #[arg(long)]
        skip_collected: bool,

        #[arg(long)]
        date: Option<String>,
    },
}

#[derive(Args)]
struct RankCli {
    /// Observation date (YYYY-MM-DD). Defaults to today (UTC).
    #[arg(long)]
    date: Option<String>,

    /// Minimum heuristic score.
    #[arg(long)]
    threshold: Option<f64>,

    /// Minimum 14-day view delta.
    #[arg(long, allow_negative_numbers = true)]
    min_delta: Option<i64>,

    /// Sort key: `heuristic_score`, `primary_metric` or `delta`.
    #[arg(long)]
    sort: Option<String>,

    /// `asc` or `desc`.
    #[arg(long)]
    order: Option<String>,

    /// Partition filter: `all`, `collection` or `catalog`.
    #[arg(long)]
    source: Option<String>,

    #[arg(long)]
    limit: Option<usize>,

    /// Print JSON instead of a table.
    #[arg(long)]
    json: bool,
}

impl From<RankCli> for RankArgs {
    fn from(c: RankCli) -> Self {
        RankArgs {
            date: c.date,
            threshold: c.threshold,
            min_delta: c.min_delta,
            sort: c.sort,
            order: c.order,
            source: c.source,
            limit: c.limit,
            json: c.json,
        }
    }
}

#[derive(Subcommand)]
enum CollectionsAction {
    /// List registered collections.
    List,

    /// Add a collection to the watch list (or reactivate it).
    Add {
        id: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        popularity: Option<i64>,

        /// Explicit heuristic weight; replaces the lexicon bypass entry.
        #[arg(long, allow_negative_numbers = true)]
        weight: Option<f64>,
    },

    /// Deactivate a collection. Its history is kept.
    Remove { id: String },

    /// Exclude a collection from collection runs.
    Block { id: String },

    /// Undo `block`.
    Unblock { id: String },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("error: {:#}", e);
        let code = if e.downcast_ref::<ValidationError>().is_some() {
            2
        } else {
            1
        };
        std::process::exit(code);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let cfg = config::load_config(&cli.config)?;
    telemetry::init(&cfg.logging)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
        }
        Commands::Collect { mode } => match mode {
            CollectMode::Categories { ids, max, date } => {
                let date = ingest::date_arg(date.as_deref())?;
                ingest::run_collect_categories(&cfg, &ids, max, date).await?;
            }
            CollectMode::Collections {
                max,
                days,
                skip_collected,
                date,
            } => {
                let date = ingest::date_arg(date.as_deref())?;
                ingest::run_collect_collections(&cfg, max, days, skip_collected, date).await?;
            }
        },
        Commands::Rank(args) => {
            rank::run_rank(&cfg, &args.into()).await?;
        }
        Commands::Show { item_id, json } => {
            show::run_show(&cfg, &item_id, json).await?;
        }
        Commands::Label {
            item_id,
            yes,
            no: _,
            by,
            notes,
        } => {
            labels::run_label(&cfg, &item_id, yes, &by, &notes).await?;
        }
        Commands::Unlabeled { limit } => {
            labels::run_unlabeled(&cfg, limit).await?;
        }
        Commands::Collections { action } => match action {
            CollectionsAction::List => collections::run_list(&cfg).await?,
            CollectionsAction::Add {
                id,
                name,
                popularity,
                weight,
            } => collections::run_add(&cfg, &id, name, popularity, weight).await?,
            CollectionsAction::Remove { id } => collections::run_remove(&cfg, &id).await?,
            CollectionsAction::Block { id } => {
                collections::run_set_blacklisted(&cfg, &id, true).await?
            }
            CollectionsAction::Unblock { id } => {
                collections::run_set_blacklisted(&cfg, &id, false).await?
            }
        },
        Commands::Stats => {
            stats::run_stats(&cfg).await?;
        }
    }

    Ok(())
}
