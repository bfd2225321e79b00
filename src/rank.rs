//! `trend rank`: the ranking query as a table or JSON.

use anyhow::Result;
use chrono::NaiveDate;
use serde::Serialize;

use trendlens_core::models::PartitionFilter;
use trendlens_core::rank::{rank, RankQuery, RankedPage, SortKey, SortOrder};

use crate::config::Config;
use crate::db;
use crate::ingest::{date_arg, run_date};

/// Raw CLI arguments; unset values fall back to `[ranking]` config.
#[derive(Debug, Clone, Default)]
pub struct RankArgs {
    pub date: Option<String>,
    pub threshold: Option<f64>,
    pub min_delta: Option<i64>,
    pub sort: Option<String>,
    pub order: Option<String>,
    pub source: Option<String>,
    pub limit: Option<usize>,
    pub json: bool,
}

#[derive(Serialize)]
struct RankOutput<'a> {
    date: NaiveDate,
    query: QueryEcho,
    #[serde(flatten)]
    page: &'a RankedPage,
}

#[derive(Serialize)]
struct QueryEcho {
    threshold: f64,
    min_delta: i64,
    sort: SortKey,
    order: SortOrder,
    source: PartitionFilter,
    limit: usize,
}

/// Resolve CLI arguments against config. Invalid order/source strings are
/// validation errors; unknown sort keys fall back silently.
pub fn build_query(config: &Config, args: &RankArgs) -> Result<RankQuery> {
    let order = match &args.order {
        Some(raw) => raw.parse::<SortOrder>()?,
        None => SortOrder::default(),
    };
    let partition = match &args.source {
        Some(raw) => raw.parse::<PartitionFilter>()?,
        None => PartitionFilter::All,
    };
    let query = RankQuery {
        date: run_date(date_arg(args.date.as_deref())?),
        threshold: args.threshold.unwrap_or(config.ranking.threshold),
        min_delta: args.min_delta.unwrap_or(config.ranking.min_delta),
        sort_key: args
            .sort
            .as_deref()
            .map(SortKey::parse_lenient)
            .unwrap_or_default(),
        order,
        partition,
        limit: args.limit.unwrap_or(config.ranking.limit),
    };
    query.validate()?;
    Ok(query)
}

pub async fn run_rank(config: &Config, args: &RankArgs) -> Result<()> {
    let query = build_query(config, args)?;
    let store = db::open_store(config).await?;
    let page = rank(&store, &query).await?;
    store.close().await;

    if args.json {
        let out = RankOutput {
            date: query.date,
            query: QueryEcho {
                threshold: query.threshold,
                min_delta: query.min_delta,
                sort: query.sort_key,
                order: query.order,
                source: query.partition,
                limit: query.limit,
            },
            page: &page,
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    if page.items.is_empty() {
        println!("No results for {}.", query.date);
        return Ok(());
    }

    println!(
        "{:>4}  {:<14} {:>7} {:>7} {:>12} {:>10}  {}",
        "#", "ITEM", "SCORE", "VIEW", "VIEWS", "DELTA 14D", "TITLE"
    );
    for (i, r) in page.items.iter().enumerate() {
        let composite = r
            .view
            .composite
            .as_ref()
            .map(|c| format!("{:.2}", c.total))
            .unwrap_or_else(|| "-".to_string());
        let delta = if r.has_history {
            format!("{:+}", r.delta)
        } else {
            "n/a".to_string()
        };
        println!(
            "{:>4}  {:<14} {:>7.2} {:>7} {:>12} {:>10}  {}",
            i + 1,
            r.view.snapshot.item_id,
            r.view.heuristic_total(),
            composite,
            r.view.snapshot.counters.views,
            delta,
            r.view.title
        );
    }
    println!();
    println!("{} item(s)", page.count);
    Ok(())
}
