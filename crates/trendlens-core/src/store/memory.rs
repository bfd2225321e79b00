//! In-memory [`Store`] implementation for tests.
//!
//! Uses `HashMap` and `Vec` behind `std::sync::RwLock`. Ids are assigned
//! from a shared monotonic counter, so "latest" always means "highest id".

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::RwLock;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};

use crate::models::{
    Collection, CollectionInfo, CollectionState, InsertOutcome, Item, Label, NewLabel,
    NewSnapshot, PartitionFilter, Snapshot, SnapshotId, SourcePartition,
};
use crate::scoring::{CompositeScore, HeuristicScore};

use super::{SnapshotView, Store, StoreStats, UnlabeledItem};

struct StoredScore<T> {
    id: i64,
    snapshot_id: SnapshotId,
    item_id: String,
    score: T,
}

/// In-memory store for tests.
pub struct InMemoryStore {
    next_id: AtomicI64,
    items: RwLock<HashMap<String, Item>>,
    snapshots: RwLock<Vec<Snapshot>>,
    heuristic: RwLock<Vec<StoredScore<HeuristicScore>>>,
    composite: RwLock<Vec<StoredScore<CompositeScore>>>,
    collections: RwLock<HashMap<String, Collection>>,
    labels: RwLock<Vec<Label>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            next_id: AtomicI64::new(1),
            items: RwLock::new(HashMap::new()),
            snapshots: RwLock::new(Vec::new()),
            heuristic: RwLock::new(Vec::new()),
            composite: RwLock::new(Vec::new()),
            collections: RwLock::new(HashMap::new()),
            labels: RwLock::new(Vec::new()),
        }
    }

    fn allocate_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    fn latest_for<T: Clone>(scores: &[StoredScore<T>], snapshot_id: SnapshotId) -> Option<T> {
        scores
            .iter()
            .filter(|s| s.snapshot_id == snapshot_id)
            .max_by_key(|s| s.id)
            .map(|s| s.score.clone())
    }

    fn view_of(&self, snapshot: &Snapshot) -> SnapshotView {
        let items = self.items.read().unwrap();
        let item = items.get(&snapshot.item_id);
        let heuristic = self.heuristic.read().unwrap();
        let composite = self.composite.read().unwrap();

        SnapshotView {
            snapshot: snapshot.clone(),
            title: item.map(|i| i.title.clone()).unwrap_or_default(),
            collection_id: item.map(|i| i.collection_id.clone()).unwrap_or_default(),
            collection_name: item.map(|i| i.collection_name.clone()).unwrap_or_default(),
            thumbnail_url: item.and_then(|i| i.thumbnail_url.clone()),
            published_at: item.map(|i| i.published_at.clone()).unwrap_or_default(),
            heuristic: Self::latest_for(&heuristic, snapshot.id),
            composite: Self::latest_for(&composite, snapshot.id),
        }
    }

    fn upsert_collection(&self, info: &CollectionInfo, activate: bool) {
        let mut collections = self.collections.write().unwrap();
        let entry = collections
            .entry(info.id.clone())
            .or_insert_with(|| Collection {
                id: info.id.clone(),
                name: String::new(),
                popularity: None,
                weight: None,
                state: CollectionState::Inactive,
                blacklisted: false,
                last_collected_on: None,
            });
        if !info.name.is_empty() {
            entry.name = info.name.clone();
        }
        if info.popularity.is_some() {
            entry.popularity = info.popularity;
        }
        if activate {
            entry.state = CollectionState::Active;
        }
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn insert_item(&self, item: &Item) -> Result<bool> {
        let mut items = self.items.write().unwrap();
        if items.contains_key(&item.id) {
            return Ok(false);
        }
        items.insert(item.id.clone(), item.clone());
        Ok(true)
    }

    async fn insert_snapshot(&self, new: &NewSnapshot) -> Result<InsertOutcome> {
        let mut snapshots = self.snapshots.write().unwrap();
        let exists = snapshots.iter().any(|s| {
            s.item_id == new.item_id
                && s.observed_on == new.observed_on
                && s.partition == new.partition
        });
        if exists {
            return Ok(InsertOutcome::Duplicate);
        }
        let id = self.allocate_id();
        snapshots.push(Snapshot {
            id,
            item_id: new.item_id.clone(),
            partition: new.partition.clone(),
            observed_on: new.observed_on,
            counters: new.counters,
        });
        Ok(InsertOutcome::Inserted(id))
    }

    async fn get_item(&self, id: &str) -> Result<Option<Item>> {
        Ok(self.items.read().unwrap().get(id).cloned())
    }

    async fn insert_heuristic_score(
        &self,
        snapshot_id: SnapshotId,
        item_id: &str,
        score: &HeuristicScore,
    ) -> Result<i64> {
        let id = self.allocate_id();
        self.heuristic.write().unwrap().push(StoredScore {
            id,
            snapshot_id,
            item_id: item_id.to_string(),
            score: score.clone(),
        });
        Ok(id)
    }

    async fn insert_composite_score(
        &self,
        snapshot_id: SnapshotId,
        item_id: &str,
        score: &CompositeScore,
    ) -> Result<i64> {
        let id = self.allocate_id();
        self.composite.write().unwrap().push(StoredScore {
            id,
            snapshot_id,
            item_id: item_id.to_string(),
            score: score.clone(),
        });
        Ok(id)
    }

    async fn snapshots_by_date(
        &self,
        date: NaiveDate,
        filter: PartitionFilter,
    ) -> Result<Vec<SnapshotView>> {
        let matching: Vec<Snapshot> = self
            .snapshots
            .read()
            .unwrap()
            .iter()
            .filter(|s| s.observed_on == date && filter.matches(&s.partition))
            .cloned()
            .collect();
        Ok(matching.iter().map(|s| self.view_of(s)).collect())
    }

    async fn recent_snapshots(&self, item_id: &str, limit: usize) -> Result<Vec<Snapshot>> {
        let mut rows: Vec<Snapshot> = self
            .snapshots
            .read()
            .unwrap()
            .iter()
            .filter(|s| s.item_id == item_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            b.observed_on
                .cmp(&a.observed_on)
                .then_with(|| b.id.cmp(&a.id))
        });
        rows.truncate(limit);
        Ok(rows)
    }

    async fn latest_observation(&self, item_id: &str) -> Result<Option<SnapshotView>> {
        let newest = self.recent_snapshots(item_id, 1).await?;
        Ok(newest.first().map(|s| self.view_of(s)))
    }

    async fn find_snapshot(
        &self,
        item_id: &str,
        date: NaiveDate,
        partition: &SourcePartition,
    ) -> Result<Option<SnapshotView>> {
        let found = self
            .snapshots
            .read()
            .unwrap()
            .iter()
            .find(|s| s.item_id == item_id && s.observed_on == date && &s.partition == partition)
            .cloned();
        Ok(found.map(|s| self.view_of(&s)))
    }

    async fn upsert_collection_on_sight(&self, info: &CollectionInfo) -> Result<()> {
        self.upsert_collection(info, false);
        Ok(())
    }

    async fn add_collection(&self, info: &CollectionInfo) -> Result<()> {
        self.upsert_collection(info, true);
        Ok(())
    }

    async fn remove_collection(&self, id: &str) -> Result<bool> {
        let mut collections = self.collections.write().unwrap();
        match collections.get_mut(id) {
            Some(c) => {
                c.state = CollectionState::Inactive;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn get_collection(&self, id: &str) -> Result<Option<Collection>> {
        Ok(self.collections.read().unwrap().get(id).cloned())
    }

    async fn list_collections(&self) -> Result<Vec<Collection>> {
        let mut all: Vec<Collection> = self.collections.read().unwrap().values().cloned().collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(all)
    }

    async fn active_collections(&self) -> Result<Vec<Collection>> {
        let mut active = self.list_collections().await?;
        active.retain(|c| c.state == CollectionState::Active && !c.blacklisted);
        Ok(active)
    }

    async fn set_collection_weight(&self, id: &str, weight: Option<f64>) -> Result<bool> {
        match self.collections.write().unwrap().get_mut(id) {
            Some(c) => {
                c.weight = weight;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn set_blacklisted(&self, id: &str, blacklisted: bool) -> Result<bool> {
        match self.collections.write().unwrap().get_mut(id) {
            Some(c) => {
                c.blacklisted = blacklisted;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn mark_collected(&self, id: &str, date: NaiveDate) -> Result<()> {
        if let Some(c) = self.collections.write().unwrap().get_mut(id) {
            c.last_collected_on = Some(date);
        }
        Ok(())
    }

    async fn insert_label(&self, label: &NewLabel) -> Result<i64> {
        let id = self.allocate_id();
        self.labels.write().unwrap().push(Label {
            id,
            item_id: label.item_id.clone(),
            is_target: label.is_target,
            labeled_by: label.labeled_by.clone(),
            notes: label.notes.clone(),
            labeled_at: Utc::now(),
        });
        Ok(id)
    }

    async fn labels_for(&self, item_id: &str) -> Result<Vec<Label>> {
        Ok(self
            .labels
            .read()
            .unwrap()
            .iter()
            .filter(|l| l.item_id == item_id)
            .cloned()
            .collect())
    }

    async fn unlabeled_items(&self, limit: usize) -> Result<Vec<UnlabeledItem>> {
        let labels = self.labels.read().unwrap();
        let items = self.items.read().unwrap();
        let heuristic = self.heuristic.read().unwrap();

        let mut best: HashMap<&str, f64> = HashMap::new();
        for s in heuristic.iter() {
            let entry = best.entry(s.item_id.as_str()).or_insert(f64::NEG_INFINITY);
            *entry = entry.max(s.score.total);
        }

        let mut out: Vec<UnlabeledItem> = best
            .into_iter()
            .filter(|(id, _)| !labels.iter().any(|l| l.item_id == *id))
            .filter_map(|(id, best_score)| {
                items.get(id).map(|item| UnlabeledItem {
                    item: item.clone(),
                    best_score,
                })
            })
            .collect();
        out.sort_by(|a, b| {
            b.best_score
                .partial_cmp(&a.best_score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.item.id.cmp(&b.item.id))
        });
        out.truncate(limit);
        Ok(out)
    }

    async fn stats(&self) -> Result<StoreStats> {
        let snapshots = self.snapshots.read().unwrap();
        Ok(StoreStats {
            items: self.items.read().unwrap().len() as i64,
            snapshots: snapshots.len() as i64,
            labels: self.labels.read().unwrap().len() as i64,
            latest_date: snapshots.iter().map(|s| s.observed_on).max(),
        })
    }
}
