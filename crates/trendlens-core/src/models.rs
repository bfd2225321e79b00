//! Core data models used throughout trendlens.
//!
//! Items, snapshots, collections and labels as they flow from a catalog
//! provider through the collection pipeline into the store.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

/// Marker prefix carried by partitions produced by collection-scoped runs.
pub const COLLECTION_PARTITION_PREFIX: &str = "collection:";

/// Store-assigned reference to a persisted snapshot.
pub type SnapshotId = i64;

/// A catalog entity. Created on first sighting and never overwritten.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub title: String,
    pub description: String,
    pub collection_id: String,
    pub collection_name: String,
    pub category: String,
    /// ISO-8601 publish timestamp as delivered by the provider.
    pub published_at: String,
    /// ISO-8601 duration (`PT15M33S`) as delivered by the provider.
    pub duration: String,
    pub thumbnail_url: Option<String>,
    pub tags: Vec<String>,
}

/// Which collection mechanism produced a snapshot.
///
/// Stored as a single string key: the category id for catalog-wide runs,
/// `collection:<id>` for collection-scoped runs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SourcePartition {
    Catalog(String),
    Collection(String),
}

impl SourcePartition {
    pub fn catalog(category: impl Into<String>) -> Self {
        Self::Catalog(category.into())
    }

    pub fn collection(collection_id: impl Into<String>) -> Self {
        Self::Collection(collection_id.into())
    }

    pub fn is_collection_scoped(&self) -> bool {
        matches!(self, Self::Collection(_))
    }

    /// The persisted key for this partition.
    pub fn key(&self) -> String {
        match self {
            Self::Catalog(category) => category.clone(),
            Self::Collection(id) => format!("{}{}", COLLECTION_PARTITION_PREFIX, id),
        }
    }

    /// Parse a persisted key. Never fails: anything without the collection
    /// marker is a catalog partition.
    pub fn from_key(key: &str) -> Self {
        match key.strip_prefix(COLLECTION_PARTITION_PREFIX) {
            Some(id) => Self::Collection(id.to_string()),
            None => Self::Catalog(key.to_string()),
        }
    }
}

impl fmt::Display for SourcePartition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

impl From<String> for SourcePartition {
    fn from(value: String) -> Self {
        Self::from_key(&value)
    }
}

impl From<SourcePartition> for String {
    fn from(value: SourcePartition) -> Self {
        value.key()
    }
}

/// Partition filter accepted by date queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PartitionFilter {
    #[default]
    All,
    CollectionScoped,
    CatalogScoped,
}

impl PartitionFilter {
    pub fn matches(&self, partition: &SourcePartition) -> bool {
        match self {
            Self::All => true,
            Self::CollectionScoped => partition.is_collection_scoped(),
            Self::CatalogScoped => !partition.is_collection_scoped(),
        }
    }
}

impl FromStr for PartitionFilter {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" | "" => Ok(Self::All),
            "collection" | "channel" => Ok(Self::CollectionScoped),
            "catalog" | "category" => Ok(Self::CatalogScoped),
            _ => Err(ValidationError::UnknownPartitionFilter(s.to_string())),
        }
    }
}

/// Point-in-time counters carried by a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Counters {
    /// Primary metric (view count).
    pub views: i64,
    pub likes: i64,
    pub comments: i64,
    /// 1-based position within the collection run.
    pub rank_position: i64,
}

/// A counter that delta computation can run over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Views,
    Likes,
    Comments,
}

impl Metric {
    pub fn value(&self, counters: &Counters) -> i64 {
        match self {
            Self::Views => counters.views,
            Self::Likes => counters.likes,
            Self::Comments => counters.comments,
        }
    }
}

/// A snapshot before the store assigns it a reference.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSnapshot {
    pub item_id: String,
    pub partition: SourcePartition,
    pub observed_on: NaiveDate,
    pub counters: Counters,
}

/// One observation of an item. Immutable once stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub id: SnapshotId,
    pub item_id: String,
    pub partition: SourcePartition,
    pub observed_on: NaiveDate,
    pub counters: Counters,
}

/// Result of a deduplicating snapshot insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted(SnapshotId),
    /// The (item, date, partition) triple already exists.
    Duplicate,
}

/// Watch-list membership of a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionState {
    Active,
    Inactive,
}

impl CollectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
        }
    }

    pub fn from_key(key: &str) -> Self {
        if key == "active" {
            Self::Active
        } else {
            Self::Inactive
        }
    }
}

/// Owning-entity aggregate (a channel, in catalog terms).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Collection {
    pub id: String,
    pub name: String,
    /// Subscriber-like popularity count, when known.
    pub popularity: Option<i64>,
    /// Explicit scoring weight. When set it takes the place of the lexicon's
    /// bypass table for this collection.
    pub weight: Option<f64>,
    pub state: CollectionState,
    /// Excluded from collection runs regardless of state.
    pub blacklisted: bool,
    /// Quota-saving cursor: the last date a collection run covered this collection.
    pub last_collected_on: Option<NaiveDate>,
}

/// Mutable collection fields as observed on a sighting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionInfo {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub popularity: Option<i64>,
}

/// Append-only human annotation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Label {
    pub id: i64,
    pub item_id: String,
    pub is_target: bool,
    pub labeled_by: String,
    pub notes: String,
    pub labeled_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewLabel {
    pub item_id: String,
    pub is_target: bool,
    pub labeled_by: String,
    pub notes: String,
}

/// Raw item + counters record produced by a catalog provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogRecord {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub collection_id: String,
    #[serde(default)]
    pub collection_name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub published_at: String,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub duration: String,
    #[serde(default)]
    pub views: i64,
    #[serde(default)]
    pub likes: i64,
    #[serde(default)]
    pub comments: i64,
    #[serde(default)]
    pub rank_position: i64,
}

impl CatalogRecord {
    pub fn to_item(&self) -> Item {
        Item {
            id: self.id.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            collection_id: self.collection_id.clone(),
            collection_name: self.collection_name.clone(),
            category: self.category.clone(),
            published_at: self.published_at.clone(),
            duration: self.duration.clone(),
            thumbnail_url: self.thumbnail_url.clone(),
            tags: self.tags.clone(),
        }
    }

    pub fn counters(&self) -> Counters {
        Counters {
            views: self.views,
            likes: self.likes,
            comments: self.comments,
            rank_position: self.rank_position,
        }
    }
}

/// A comment returned by the optional comment provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub text: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub like_count: i64,
    #[serde(default)]
    pub published_at: String,
}
