//! External collaborator contracts.
//!
//! The catalog provider delivers raw item + counter records; the comment
//! provider delivers comment text for the optional comment sub-score. Both
//! degrade to empty sequences: an `Err` from either is reserved for
//! conditions the caller should see (and is still caught per source by the
//! collector).

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{CatalogRecord, CollectionInfo, Comment};

/// What a catalog fetch is scoped to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogScope {
    /// Catalog-wide listing for one category id.
    Category(String),
    /// Recent uploads of one collection.
    Collection(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogQuery {
    pub scope: CatalogScope,
    pub max_results: usize,
    /// Only items published within this many days, when set.
    pub recent_days: Option<u32>,
}

#[async_trait]
pub trait CatalogProvider: Send + Sync {
    /// Records for one query, 1-based `rank_position` assigned.
    async fn fetch(&self, query: &CatalogQuery) -> Result<Vec<CatalogRecord>>;

    /// Current name and popularity for the given collections. Unknown ids are
    /// simply absent from the result.
    async fn collections(&self, _ids: &[String]) -> Result<Vec<CollectionInfo>> {
        Ok(Vec::new())
    }
}

#[async_trait]
pub trait CommentProvider: Send + Sync {
    async fn comments(&self, item_id: &str) -> Result<Vec<Comment>>;
}

/// Comment provider for runs with comment fetching disabled.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoComments;

#[async_trait]
impl CommentProvider for NoComments {
    async fn comments(&self, _item_id: &str) -> Result<Vec<Comment>> {
        Ok(Vec::new())
    }
}
