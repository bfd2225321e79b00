//! Collection-run pipeline.
//!
//! A run fetches raw records from a [`CatalogProvider`], refreshes the
//! owning collections, dedup-inserts items and snapshots, and attaches both
//! scores to every newly inserted snapshot.
//!
//! Failures are contained: a failed fetch empties that source, a failed item
//! is logged and counted, and the run moves on. Only caller-input problems
//! ([`ValidationError`]) and registry reads abort a run, and they do so
//! before any provider call.

use std::collections::BTreeSet;

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::ValidationError;
use crate::models::{
    CatalogRecord, CollectionInfo, Counters, InsertOutcome, Item, NewSnapshot, SnapshotId,
    SourcePartition,
};
use crate::provider::{CatalogProvider, CatalogQuery, CatalogScope, CommentProvider};
use crate::scoring::{CompositeScore, CompositeScorer, HeuristicScore, HeuristicScorer};
use crate::store::Store;

/// Upper bound on records per source per run.
pub const MAX_RESULTS_LIMIT: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectOptions {
    pub max_results: usize,
    /// Collection runs only: restrict to items published in this window.
    pub recent_days: Option<u32>,
    /// Collection runs only: skip collections already covered on the run date.
    pub skip_collected_today: bool,
    pub fetch_comments: bool,
}

impl Default for CollectOptions {
    fn default() -> Self {
        Self {
            max_results: MAX_RESULTS_LIMIT,
            recent_days: None,
            skip_collected_today: false,
            fetch_comments: false,
        }
    }
}

impl CollectOptions {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.max_results == 0 || self.max_results > MAX_RESULTS_LIMIT {
            return Err(ValidationError::MaxResultsOutOfRange {
                value: self.max_results,
                max: MAX_RESULTS_LIMIT,
            });
        }
        Ok(())
    }
}

/// Counters for one source (a category or a collection).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SourceStats {
    pub source: String,
    pub fetched: usize,
    pub new: usize,
    pub duplicates: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CollectStats {
    pub total: usize,
    pub new: usize,
    pub duplicates: usize,
    pub failed: usize,
    /// Collections skipped because they were already collected on the run date.
    pub skipped: usize,
    pub per_source: Vec<SourceStats>,
}

impl CollectStats {
    fn absorb(&mut self, source: SourceStats) {
        self.total += source.fetched;
        self.new += source.new;
        self.duplicates += source.duplicates;
        self.failed += source.failed;
        self.per_source.push(source);
    }
}

/// A record that produced a new snapshot, with the scores attached to it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngestedRecord {
    pub record: CatalogRecord,
    pub partition: SourcePartition,
    pub snapshot_id: SnapshotId,
    pub heuristic: HeuristicScore,
    pub composite: CompositeScore,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CollectReport {
    pub stats: CollectStats,
    pub ingested: Vec<IngestedRecord>,
}

/// Drives collection runs against a store and its collaborators.
pub struct Collector<'a, S: ?Sized, C: ?Sized, M: ?Sized> {
    store: &'a S,
    catalog: &'a C,
    comments: &'a M,
    heuristic: HeuristicScorer,
    composite: CompositeScorer,
    now: DateTime<Utc>,
}

impl<'a, S, C, M> Collector<'a, S, C, M>
where
    S: Store + ?Sized,
    C: CatalogProvider + ?Sized,
    M: CommentProvider + ?Sized,
{
    /// `now` is the reference clock for recency scoring.
    pub fn new(
        store: &'a S,
        catalog: &'a C,
        comments: &'a M,
        heuristic: HeuristicScorer,
        composite: CompositeScorer,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            store,
            catalog,
            comments,
            heuristic,
            composite,
            now,
        }
    }

    /// Catalog-wide run over one or more category ids.
    pub async fn collect_categories(
        &self,
        categories: &[String],
        date: NaiveDate,
        opts: &CollectOptions,
    ) -> Result<CollectReport> {
        if categories.is_empty() {
            return Err(ValidationError::EmptySelection.into());
        }
        opts.validate()?;

        let mut report = CollectReport::default();
        for category in categories {
            let partition = SourcePartition::catalog(category.as_str());
            let query = CatalogQuery {
                scope: CatalogScope::Category(category.clone()),
                max_results: opts.max_results,
                recent_days: None,
            };
            let records = self.fetch_or_empty(&query, &partition).await;
            self.ingest_batch(records, partition, date, opts, &mut report)
                .await;
        }

        info!(
            %date,
            total = report.stats.total,
            new = report.stats.new,
            duplicates = report.stats.duplicates,
            failed = report.stats.failed,
            "category collection finished"
        );
        Ok(report)
    }

    /// Run over every active collection in the registry.
    pub async fn collect_collections(
        &self,
        date: NaiveDate,
        opts: &CollectOptions,
    ) -> Result<CollectReport> {
        opts.validate()?;
        let active = self.store.active_collections().await?;
        if active.is_empty() {
            return Err(ValidationError::NoActiveCollections.into());
        }

        let mut report = CollectReport::default();
        for collection in &active {
            if opts.skip_collected_today && collection.last_collected_on == Some(date) {
                debug!(collection_id = %collection.id, %date, "already collected, skipping");
                report.stats.skipped += 1;
                continue;
            }

            let partition = SourcePartition::collection(collection.id.as_str());
            let query = CatalogQuery {
                scope: CatalogScope::Collection(collection.id.clone()),
                max_results: opts.max_results,
                recent_days: opts.recent_days,
            };
            let records = self.fetch_or_empty(&query, &partition).await;
            let fetched_any = !records.is_empty();
            self.ingest_batch(records, partition, date, opts, &mut report)
                .await;

            if fetched_any {
                if let Err(e) = self.store.mark_collected(&collection.id, date).await {
                    warn!(collection_id = %collection.id, error = %e, "failed to move collection cursor");
                }
            }
        }

        info!(
            %date,
            collections = active.len(),
            skipped = report.stats.skipped,
            total = report.stats.total,
            new = report.stats.new,
            duplicates = report.stats.duplicates,
            failed = report.stats.failed,
            "collection run finished"
        );
        Ok(report)
    }

    async fn fetch_or_empty(
        &self,
        query: &CatalogQuery,
        partition: &SourcePartition,
    ) -> Vec<CatalogRecord> {
        match self.catalog.fetch(query).await {
            Ok(records) => {
                info!(%partition, fetched = records.len(), "fetched records");
                records
            }
            Err(e) => {
                warn!(%partition, error = %e, "catalog fetch failed, continuing with no records");
                Vec::new()
            }
        }
    }

    async fn ingest_batch(
        &self,
        records: Vec<CatalogRecord>,
        partition: SourcePartition,
        date: NaiveDate,
        opts: &CollectOptions,
        report: &mut CollectReport,
    ) {
        let mut stats = SourceStats {
            source: partition.key(),
            fetched: records.len(),
            ..SourceStats::default()
        };

        self.refresh_collections(&records).await;

        for record in records {
            match self.ingest_one(&record, &partition, date, opts).await {
                Ok(Some((snapshot_id, heuristic, composite))) => {
                    stats.new += 1;
                    report.ingested.push(IngestedRecord {
                        record,
                        partition: partition.clone(),
                        snapshot_id,
                        heuristic,
                        composite,
                    });
                }
                Ok(None) => {
                    debug!(item_id = %record.id, %partition, %date, "duplicate snapshot");
                    stats.duplicates += 1;
                }
                Err(e) => {
                    warn!(item_id = %record.id, %partition, error = %e, "failed to ingest record");
                    stats.failed += 1;
                }
            }
        }

        report.stats.absorb(stats);
    }

    /// Upsert-on-sight for every owning collection in the batch. Provider
    /// data wins; collections it does not know are registered by name only.
    async fn refresh_collections(&self, records: &[CatalogRecord]) {
        let ids: Vec<String> = records
            .iter()
            .map(|r| r.collection_id.clone())
            .filter(|id| !id.is_empty())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        if ids.is_empty() {
            return;
        }

        let known = match self.catalog.collections(&ids).await {
            Ok(infos) => infos,
            Err(e) => {
                warn!(error = %e, "collection lookup failed, using record names only");
                Vec::new()
            }
        };

        for id in &ids {
            let info = known.iter().find(|i| &i.id == id).cloned().unwrap_or_else(|| {
                let name = records
                    .iter()
                    .find(|r| &r.collection_id == id)
                    .map(|r| r.collection_name.clone())
                    .unwrap_or_default();
                CollectionInfo {
                    id: id.clone(),
                    name,
                    popularity: None,
                }
            });
            if let Err(e) = self.store.upsert_collection_on_sight(&info).await {
                warn!(collection_id = %id, error = %e, "failed to upsert collection");
            }
        }
    }

    /// `Ok(None)` for a duplicate observation. A duplicate whose earlier
    /// insert lost one or both scores gets them backfilled here.
    async fn ingest_one(
        &self,
        record: &CatalogRecord,
        partition: &SourcePartition,
        date: NaiveDate,
        opts: &CollectOptions,
    ) -> Result<Option<(SnapshotId, HeuristicScore, CompositeScore)>> {
        let item = record.to_item();
        self.store.insert_item(&item).await?;

        let counters = record.counters();
        let outcome = self
            .store
            .insert_snapshot(&NewSnapshot {
                item_id: item.id.clone(),
                partition: partition.clone(),
                observed_on: date,
                counters,
            })
            .await?;
        let snapshot_id = match outcome {
            InsertOutcome::Inserted(id) => id,
            InsertOutcome::Duplicate => {
                self.backfill_scores(&item, date, partition, opts).await?;
                return Ok(None);
            }
        };

        let (heuristic, composite) = self.score(&item, &counters, opts).await?;
        self.store
            .insert_heuristic_score(snapshot_id, &item.id, &heuristic)
            .await?;
        self.store
            .insert_composite_score(snapshot_id, &item.id, &composite)
            .await?;

        Ok(Some((snapshot_id, heuristic, composite)))
    }

    /// Score the stored item and counters of an existing snapshot and write
    /// only the score kinds it is missing.
    async fn backfill_scores(
        &self,
        item: &Item,
        date: NaiveDate,
        partition: &SourcePartition,
        opts: &CollectOptions,
    ) -> Result<()> {
        let Some(existing) = self.store.find_snapshot(&item.id, date, partition).await? else {
            return Ok(());
        };
        if existing.heuristic.is_some() && existing.composite.is_some() {
            return Ok(());
        }

        let stored = self.store.get_item(&item.id).await?;
        let item = stored.as_ref().unwrap_or(item);
        let snapshot = &existing.snapshot;
        let (heuristic, composite) = self.score(item, &snapshot.counters, opts).await?;
        if existing.heuristic.is_none() {
            self.store
                .insert_heuristic_score(snapshot.id, &item.id, &heuristic)
                .await?;
        }
        if existing.composite.is_none() {
            self.store
                .insert_composite_score(snapshot.id, &item.id, &composite)
                .await?;
        }
        info!(item_id = %item.id, snapshot_id = snapshot.id, "backfilled missing scores");
        Ok(())
    }

    async fn score(
        &self,
        item: &Item,
        counters: &Counters,
        opts: &CollectOptions,
    ) -> Result<(HeuristicScore, CompositeScore)> {
        let collection = self.store.get_collection(&item.collection_id).await?;
        let comments = if opts.fetch_comments {
            match self.comments.comments(&item.id).await {
                Ok(c) => c,
                Err(e) => {
                    warn!(item_id = %item.id, error = %e, "comment fetch failed, scoring without comments");
                    Vec::new()
                }
            }
        } else {
            Vec::new()
        };

        let heuristic = self
            .heuristic
            .score(item, Some(comments.as_slice()), collection.as_ref());
        let composite = self
            .composite
            .score(item, counters, collection.as_ref(), self.now);
        Ok((heuristic, composite))
    }
}
