//! Single-item view for review screens.

use anyhow::Result;
use serde::Serialize;

use crate::delta::{compute_delta, DELTA_WINDOW_DAYS};
use crate::error::ValidationError;
use crate::models::{Item, Label, Metric};
use crate::store::{SnapshotView, Store};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemDetail {
    pub item: Item,
    /// Newest snapshot with its latest scores, if any snapshot exists.
    pub latest: Option<SnapshotView>,
    /// 14-day view delta, `0` when history is insufficient.
    pub delta: i64,
    pub has_history: bool,
    pub labels: Vec<Label>,
}

/// Look up one item. `Ok(None)` when the item is unknown.
pub async fn item_detail<S: Store + ?Sized>(store: &S, item_id: &str) -> Result<Option<ItemDetail>> {
    let item_id = item_id.trim();
    if item_id.is_empty() {
        return Err(ValidationError::EmptyItemId.into());
    }
    let Some(item) = store.get_item(item_id).await? else {
        return Ok(None);
    };

    let latest = store.latest_observation(item_id).await?;
    let delta = compute_delta(store, item_id, Metric::Views, DELTA_WINDOW_DAYS).await?;
    let labels = store.labels_for(item_id).await?;

    Ok(Some(ItemDetail {
        item,
        latest,
        delta: delta.unwrap_or(0),
        has_history: delta.is_some(),
        labels,
    }))
}
