//! `trend collect` entry points.
//!
//! Wires config, the SQLite store and the JSONL providers into a
//! [`Collector`], runs it, archives new records, and prints a summary.

use std::path::PathBuf;

use anyhow::Result;
use chrono::{NaiveDate, Utc};

use trendlens_core::collect::{CollectOptions, CollectReport, Collector};
use trendlens_core::error::parse_date;
use trendlens_core::ValidationError;
use trendlens_core::scoring::{CompositeScorer, HeuristicScorer};

use crate::archive::{self, RunKind};
use crate::catalog_jsonl::{JsonlCatalog, JsonlComments};
use crate::config::Config;
use crate::db;
use crate::sqlite_store::SqliteStore;

/// Run date: `--date` when given, otherwise today (UTC).
pub fn run_date(date: Option<NaiveDate>) -> NaiveDate {
    date.unwrap_or_else(|| Utc::now().date_naive())
}

/// Parse a raw `--date` argument.
pub fn date_arg(raw: Option<&str>) -> Result<Option<NaiveDate>, ValidationError> {
    raw.map(parse_date).transpose()
}

struct Deps {
    store: SqliteStore,
    catalog: JsonlCatalog,
    comments: JsonlComments,
    heuristic: HeuristicScorer,
    composite: CompositeScorer,
}

async fn deps(config: &Config) -> Result<Deps> {
    let lexicon = config.scoring.load_lexicon()?;
    Ok(Deps {
        store: db::open_store(config).await?,
        catalog: JsonlCatalog::new(&config.catalog.root, Utc::now()),
        comments: JsonlComments::new(&config.catalog.root),
        heuristic: HeuristicScorer::new(lexicon),
        composite: CompositeScorer::new(config.scoring.weights),
    })
}

fn collector(deps: &Deps) -> Collector<'_, SqliteStore, JsonlCatalog, JsonlComments> {
    Collector::new(
        &deps.store,
        &deps.catalog,
        &deps.comments,
        deps.heuristic.clone(),
        deps.composite.clone(),
        Utc::now(),
    )
}

pub async fn run_collect_categories(
    config: &Config,
    categories: &[String],
    max_results: Option<usize>,
    date: Option<NaiveDate>,
) -> Result<()> {
    let date = run_date(date);
    let opts = CollectOptions {
        max_results: max_results.unwrap_or(config.collect.max_results),
        recent_days: None,
        skip_collected_today: false,
        fetch_comments: config.collect.fetch_comments,
    };

    let deps = deps(config).await?;
    let report = collector(&deps)
        .collect_categories(categories, date, &opts)
        .await?;

    println!("collect categories {} ({})", categories.join(", "), date);
    finish(config, &deps, &report, date, RunKind::Categories).await
}

pub async fn run_collect_collections(
    config: &Config,
    max_results: Option<usize>,
    recent_days: Option<u32>,
    skip_collected: bool,
    date: Option<NaiveDate>,
) -> Result<()> {
    let date = run_date(date);
    let opts = CollectOptions {
        max_results: max_results.unwrap_or(config.collect.max_results),
        recent_days: Some(recent_days.unwrap_or(config.collect.recent_days)),
        skip_collected_today: skip_collected,
        fetch_comments: config.collect.fetch_comments,
    };

    let deps = deps(config).await?;
    let report = collector(&deps).collect_collections(date, &opts).await?;

    println!("collect collections ({})", date);
    println!("  skipped (already collected): {}", report.stats.skipped);
    finish(config, &deps, &report, date, RunKind::Collections).await
}

async fn finish(
    config: &Config,
    deps: &Deps,
    report: &CollectReport,
    date: NaiveDate,
    kind: RunKind,
) -> Result<()> {
    let stats = &report.stats;
    println!("  fetched: {} items", stats.total);
    println!("  new snapshots: {}", stats.new);
    println!("  duplicates: {}", stats.duplicates);
    println!("  failed: {}", stats.failed);
    for source in &stats.per_source {
        println!(
            "  [{}] fetched {}, new {}, duplicates {}, failed {}",
            source.source, source.fetched, source.new, source.duplicates, source.failed
        );
    }

    let archived = archive_run(config, report, date, kind);
    deps.store.close().await;

    if let Some(path) = archived? {
        println!("  archive: {}", path.display());
    }
    println!("ok");
    Ok(())
}

/// Append the run's new records to the daily archive, when one is configured.
fn archive_run(
    config: &Config,
    report: &CollectReport,
    date: NaiveDate,
    kind: RunKind,
) -> Result<Option<PathBuf>> {
    match &config.collect.archive_dir {
        Some(dir) => archive::append(dir, date, kind, &report.ingested),
        None => Ok(None),
    }
}
