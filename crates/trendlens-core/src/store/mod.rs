//! Storage abstraction for trendlens.
//!
//! The [`Store`] trait covers everything the pipeline, delta engine and
//! ranking layer need: deduplicated snapshot inserts, score attachment,
//! date/partition queries, the collection registry and labels.
//!
//! Implementations must be `Send + Sync` and must enforce uniqueness of the
//! `(item_id, observed_on, partition)` triple themselves; a conflicting
//! insert returns [`InsertOutcome::Duplicate`] rather than an error.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Serialize;

use crate::models::{
    Collection, CollectionInfo, InsertOutcome, Item, Label, NewLabel, NewSnapshot,
    PartitionFilter, Snapshot, SnapshotId, SourcePartition,
};
use crate::scoring::{CompositeScore, HeuristicScore};

/// A snapshot joined with its item's display fields and the latest score
/// record of each kind.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SnapshotView {
    pub snapshot: Snapshot,
    pub title: String,
    pub collection_id: String,
    pub collection_name: String,
    pub thumbnail_url: Option<String>,
    pub published_at: String,
    pub heuristic: Option<HeuristicScore>,
    pub composite: Option<CompositeScore>,
}

impl SnapshotView {
    /// Heuristic total, `0` when the snapshot was never scored.
    pub fn heuristic_total(&self) -> f64 {
        self.heuristic.as_ref().map(|h| h.total).unwrap_or(0.0)
    }
}

/// An item awaiting review, with its best heuristic total.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnlabeledItem {
    pub item: Item,
    pub best_score: f64,
}

/// Row counts and the newest observation date.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct StoreStats {
    pub items: i64,
    pub snapshots: i64,
    pub labels: i64,
    pub latest_date: Option<NaiveDate>,
}

/// Abstract storage backend.
///
/// # Operations
///
/// | Group | Methods |
/// |-------|---------|
/// | Items & snapshots | [`insert_item`](Store::insert_item), [`insert_snapshot`](Store::insert_snapshot), [`get_item`](Store::get_item) |
/// | Scores | [`insert_heuristic_score`](Store::insert_heuristic_score), [`insert_composite_score`](Store::insert_composite_score) |
/// | Queries | [`snapshots_by_date`](Store::snapshots_by_date), [`recent_snapshots`](Store::recent_snapshots), [`latest_observation`](Store::latest_observation), [`find_snapshot`](Store::find_snapshot), [`stats`](Store::stats) |
/// | Collections | [`upsert_collection_on_sight`](Store::upsert_collection_on_sight), [`add_collection`](Store::add_collection), [`remove_collection`](Store::remove_collection), [`set_collection_weight`](Store::set_collection_weight), [`set_blacklisted`](Store::set_blacklisted), [`mark_collected`](Store::mark_collected) |
/// | Labels | [`insert_label`](Store::insert_label), [`labels_for`](Store::labels_for), [`unlabeled_items`](Store::unlabeled_items) |
#[async_trait]
pub trait Store: Send + Sync {
    /// First-write-wins insert. Returns `true` when the item was new; an
    /// existing item is left untouched.
    async fn insert_item(&self, item: &Item) -> Result<bool>;

    /// Deduplicating insert on `(item_id, observed_on, partition)`.
    async fn insert_snapshot(&self, snapshot: &NewSnapshot) -> Result<InsertOutcome>;

    async fn get_item(&self, id: &str) -> Result<Option<Item>>;

    /// Append a heuristic score record. Returns the record id.
    async fn insert_heuristic_score(
        &self,
        snapshot_id: SnapshotId,
        item_id: &str,
        score: &HeuristicScore,
    ) -> Result<i64>;

    /// Append a composite score record. Returns the record id.
    async fn insert_composite_score(
        &self,
        snapshot_id: SnapshotId,
        item_id: &str,
        score: &CompositeScore,
    ) -> Result<i64>;

    /// Snapshots observed on `date` whose partition passes `filter`, joined
    /// with the latest score of each kind. Order is unspecified.
    async fn snapshots_by_date(
        &self,
        date: NaiveDate,
        filter: PartitionFilter,
    ) -> Result<Vec<SnapshotView>>;

    /// Up to `limit` snapshots of one item across all partitions, newest
    /// first (date descending, then snapshot id descending).
    async fn recent_snapshots(&self, item_id: &str, limit: usize) -> Result<Vec<Snapshot>>;

    /// The newest snapshot of an item, joined like [`Store::snapshots_by_date`].
    async fn latest_observation(&self, item_id: &str) -> Result<Option<SnapshotView>>;

    /// The snapshot occupying one `(item_id, observed_on, partition)` slot.
    async fn find_snapshot(
        &self,
        item_id: &str,
        date: NaiveDate,
        partition: &SourcePartition,
    ) -> Result<Option<SnapshotView>>;

    /// Insert a collection or refresh its name and popularity. State, weight,
    /// flags and cursor are never touched. Empty names and unknown popularity
    /// keep the stored values.
    async fn upsert_collection_on_sight(&self, info: &CollectionInfo) -> Result<()>;

    /// Upsert and set the collection [`Active`](crate::models::CollectionState::Active).
    async fn add_collection(&self, info: &CollectionInfo) -> Result<()>;

    /// Soft delete: set the collection inactive. Returns `false` for an unknown id.
    async fn remove_collection(&self, id: &str) -> Result<bool>;

    async fn get_collection(&self, id: &str) -> Result<Option<Collection>>;

    /// All known collections, ordered by id.
    async fn list_collections(&self) -> Result<Vec<Collection>>;

    /// Active, non-blacklisted collections, ordered by id.
    async fn active_collections(&self) -> Result<Vec<Collection>>;

    /// Set or clear the explicit scoring weight. Returns `false` for an unknown id.
    async fn set_collection_weight(&self, id: &str, weight: Option<f64>) -> Result<bool>;

    /// Flip the blacklist flag. Returns `false` for an unknown id.
    async fn set_blacklisted(&self, id: &str, blacklisted: bool) -> Result<bool>;

    /// Move the quota-saving cursor.
    async fn mark_collected(&self, id: &str, date: NaiveDate) -> Result<()>;

    /// Append a label. Returns the label id.
    async fn insert_label(&self, label: &NewLabel) -> Result<i64>;

    /// Labels for one item, oldest first.
    async fn labels_for(&self, item_id: &str) -> Result<Vec<Label>>;

    /// Items with at least one heuristic score and no labels, ordered by
    /// their best heuristic total descending.
    async fn unlabeled_items(&self, limit: usize) -> Result<Vec<UnlabeledItem>>;

    async fn stats(&self) -> Result<StoreStats>;
}
