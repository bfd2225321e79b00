//! Ranking / query layer.
//!
//! # Algorithm
//!
//! 1. Fetch snapshots for `date` that pass the partition filter.
//! 2. Compute each item's 14-day view delta; undefined deltas become `0`
//!    here and only here (`has_history` keeps the distinction).
//! 3. Keep rows with `heuristic total >= threshold` and `delta >= min_delta`.
//!    Unscored rows count as heuristic `0`.
//! 4. Sort by the chosen key, tie-breaking on delta in the same direction.
//! 5. Truncate to `limit`.

use std::cmp::Ordering;
use std::str::FromStr;

use anyhow::Result;
use chrono::NaiveDate;
use serde::Serialize;

use crate::delta::{compute_delta, DELTA_WINDOW_DAYS};
use crate::error::ValidationError;
use crate::models::{Metric, PartitionFilter};
use crate::store::{SnapshotView, Store};

/// Allow-listed sort fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    PrimaryMetric,
    #[default]
    HeuristicScore,
    Delta,
}

impl SortKey {
    /// Unknown keys fall back to [`SortKey::HeuristicScore`].
    pub fn parse_lenient(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "primary_metric" | "view_count" | "views" => Self::PrimaryMetric,
            "delta" | "delta_views_14d" => Self::Delta,
            _ => Self::HeuristicScore,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl FromStr for SortOrder {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            _ => Err(ValidationError::UnknownSortOrder(s.to_string())),
        }
    }
}

/// The full presentation-boundary query.
#[derive(Debug, Clone, PartialEq)]
pub struct RankQuery {
    pub date: NaiveDate,
    pub threshold: f64,
    pub min_delta: i64,
    pub sort_key: SortKey,
    pub order: SortOrder,
    pub partition: PartitionFilter,
    pub limit: usize,
}

impl RankQuery {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.limit == 0 {
            return Err(ValidationError::ZeroLimit);
        }
        if !self.threshold.is_finite() {
            return Err(ValidationError::NonFiniteThreshold);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedItem {
    #[serde(flatten)]
    pub view: SnapshotView,
    /// 14-day view delta, `0` when history is insufficient.
    pub delta: i64,
    pub has_history: bool,
}

impl RankedItem {
    fn sort_value(&self, key: SortKey) -> f64 {
        match key {
            SortKey::PrimaryMetric => self.view.snapshot.counters.views as f64,
            SortKey::HeuristicScore => self.view.heuristic_total(),
            SortKey::Delta => self.delta as f64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedPage {
    pub items: Vec<RankedItem>,
    pub count: usize,
}

/// Run a ranking query.
pub async fn rank<S: Store + ?Sized>(store: &S, query: &RankQuery) -> Result<RankedPage> {
    query.validate()?;

    let views = store.snapshots_by_date(query.date, query.partition).await?;
    let mut items = Vec::with_capacity(views.len());
    for view in views {
        let delta = compute_delta(store, &view.snapshot.item_id, Metric::Views, DELTA_WINDOW_DAYS)
            .await?;
        items.push(RankedItem {
            delta: delta.unwrap_or(0),
            has_history: delta.is_some(),
            view,
        });
    }

    items.retain(|r| r.view.heuristic_total() >= query.threshold && r.delta >= query.min_delta);
    sort_ranked(&mut items, query.sort_key, query.order);
    items.truncate(query.limit);

    let count = items.len();
    Ok(RankedPage { items, count })
}

/// Stable sort on `key` with delta as tie-break, both in `order`.
pub fn sort_ranked(items: &mut [RankedItem], key: SortKey, order: SortOrder) {
    items.sort_by(|a, b| {
        let ascending = a
            .sort_value(key)
            .partial_cmp(&b.sort_value(key))
            .unwrap_or(Ordering::Equal)
            .then(a.delta.cmp(&b.delta));
        match order {
            SortOrder::Asc => ascending,
            SortOrder::Desc => ascending.reverse(),
        }
    });
}
