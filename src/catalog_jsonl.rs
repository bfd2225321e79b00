//! JSONL file-backed catalog and comment providers.
//!
//! Layout under `[catalog].root`:
//!
//! ```text
//! categories/<category>.jsonl      one CatalogRecord per line
//! collections/<collection>.jsonl   one CatalogRecord per line
//! collections.jsonl                one CollectionInfo per line
//! comments/<item_id>.jsonl         one Comment per line
//! ```
//!
//! A missing or unreadable file yields an empty sequence. Malformed lines are
//! skipped one by one. Nothing here returns partial records.

use std::path::{Path, PathBuf};

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use trendlens_core::models::{CatalogRecord, CollectionInfo, Comment};
use trendlens_core::normalize::parse_timestamp;
use trendlens_core::provider::{CatalogProvider, CatalogQuery, CatalogScope, CommentProvider};

/// Rejects ids that would escape the catalog directory.
fn safe_file_stem(id: &str) -> Option<&str> {
    let id = id.trim();
    let unsafe_id = id.is_empty()
        || id.contains('/')
        || id.contains('\\')
        || id.contains("..")
        || id.starts_with('.');
    (!unsafe_id).then_some(id)
}

/// Read a JSONL file into `T`s, skipping lines that fail to parse.
async fn read_jsonl<T: DeserializeOwned>(path: &Path) -> Vec<T> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(c) => c,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "catalog file unavailable, treating as empty");
            return Vec::new();
        }
    };

    let mut out = Vec::new();
    for (lineno, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<T>(line) {
            Ok(value) => out.push(value),
            Err(e) => warn!(
                path = %path.display(),
                line = lineno + 1,
                error = %e,
                "skipping malformed catalog line"
            ),
        }
    }
    out
}

/// Catalog provider over a directory of JSONL files.
pub struct JsonlCatalog {
    root: PathBuf,
    now: DateTime<Utc>,
}

impl JsonlCatalog {
    /// `now` anchors the `recent_days` window.
    pub fn new(root: impl Into<PathBuf>, now: DateTime<Utc>) -> Self {
        Self {
            root: root.into(),
            now,
        }
    }

    fn scope_path(&self, scope: &CatalogScope) -> Option<PathBuf> {
        let (dir, id) = match scope {
            CatalogScope::Category(id) => ("categories", id),
            CatalogScope::Collection(id) => ("collections", id),
        };
        let stem = safe_file_stem(id)?;
        Some(self.root.join(dir).join(format!("{}.jsonl", stem)))
    }

    /// Items whose publish time parses and falls before the window are
    /// dropped. Unparsable timestamps are kept.
    fn within_window(&self, record: &CatalogRecord, days: u32) -> bool {
        let cutoff = self.now - Duration::days(i64::from(days));
        match parse_timestamp(&record.published_at) {
            Some(published) => published >= cutoff,
            None => true,
        }
    }
}

#[async_trait]
impl CatalogProvider for JsonlCatalog {
    async fn fetch(&self, query: &CatalogQuery) -> Result<Vec<CatalogRecord>> {
        let Some(path) = self.scope_path(&query.scope) else {
            warn!(scope = ?query.scope, "refusing unsafe catalog id");
            return Ok(Vec::new());
        };

        let mut records: Vec<CatalogRecord> = read_jsonl(&path).await;
        if let Some(days) = query.recent_days {
            records.retain(|r| self.within_window(r, days));
        }
        records.truncate(query.max_results);

        for (i, record) in records.iter_mut().enumerate() {
            if record.rank_position == 0 {
                record.rank_position = i as i64 + 1;
            }
            if let CatalogScope::Category(category) = &query.scope {
                if record.category.is_empty() {
                    record.category = category.clone();
                }
            }
        }

        debug!(path = %path.display(), count = records.len(), "read catalog records");
        Ok(records)
    }

    async fn collections(&self, ids: &[String]) -> Result<Vec<CollectionInfo>> {
        let path = self.root.join("collections.jsonl");
        if !path.exists() {
            return Ok(Vec::new());
        }
        let all: Vec<CollectionInfo> = read_jsonl(&path).await;
        Ok(all.into_iter().filter(|c| ids.contains(&c.id)).collect())
    }
}

/// Comment provider over `comments/<item_id>.jsonl`.
pub struct JsonlComments {
    root: PathBuf,
}

impl JsonlComments {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl CommentProvider for JsonlComments {
    async fn comments(&self, item_id: &str) -> Result<Vec<Comment>> {
        let Some(stem) = safe_file_stem(item_id) else {
            return Ok(Vec::new());
        };
        let path = self.root.join("comments").join(format!("{}.jsonl", stem));
        if !path.exists() {
            debug!(item_id, "no comments on file");
            return Ok(Vec::new());
        }
        Ok(read_jsonl(&path).await)
    }
}
