//! Trailing-window metric deltas.
//!
//! A delta is a single endpoint difference: newest value minus the oldest
//! value among the `window_days + 1` most recent snapshots of an item. It is
//! `None` when fewer than two snapshots exist, which callers must treat as
//! "insufficient history" rather than zero. Negative deltas are kept.

use anyhow::Result;

use crate::models::{Metric, Snapshot};
use crate::store::Store;

/// Window used by the ranking layer and item detail.
pub const DELTA_WINDOW_DAYS: usize = 14;

/// Delta over snapshots already ordered newest first.
pub fn delta_over_window(newest_first: &[Snapshot], metric: Metric) -> Option<i64> {
    if newest_first.len() < 2 {
        return None;
    }
    let newest = newest_first.first()?;
    let oldest = newest_first.last()?;
    Some(metric.value(&newest.counters) - metric.value(&oldest.counters))
}

/// Fetch up to `window_days + 1` snapshots of `item_id` and compute the delta.
pub async fn compute_delta<S: Store + ?Sized>(
    store: &S,
    item_id: &str,
    metric: Metric,
    window_days: usize,
) -> Result<Option<i64>> {
    let rows = store.recent_snapshots(item_id, window_days + 1).await?;
    Ok(delta_over_window(&rows, metric))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Counters, NewSnapshot, SourcePartition};
    use crate::store::memory::InMemoryStore;
    use chrono::NaiveDate;

    async fn observe(store: &InMemoryStore, day: u32, views: i64) {
        store
            .insert_snapshot(&NewSnapshot {
                item_id: "v1".into(),
                partition: SourcePartition::catalog("10"),
                observed_on: NaiveDate::from_ymd_opt(2025, 11, day).unwrap(),
                counters: Counters {
                    views,
                    likes: views / 100,
                    ..Counters::default()
                },
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_single_snapshot_is_undefined() {
        let store = InMemoryStore::new();
        observe(&store, 1, 500).await;
        let d = compute_delta(&store, "v1", Metric::Views, DELTA_WINDOW_DAYS).await.unwrap();
        assert_eq!(d, None);
        let none = compute_delta(&store, "ghost", Metric::Views, DELTA_WINDOW_DAYS).await.unwrap();
        assert_eq!(none, None);
    }

    #[tokio::test]
    async fn test_endpoint_difference() {
        let store = InMemoryStore::new();
        observe(&store, 1, 500_000).await;
        observe(&store, 8, 700_000).await;
        observe(&store, 14, 1_000_000).await;
        let d = compute_delta(&store, "v1", Metric::Views, DELTA_WINDOW_DAYS).await.unwrap();
        assert_eq!(d, Some(500_000));
        let likes = compute_delta(&store, "v1", Metric::Likes, DELTA_WINDOW_DAYS).await.unwrap();
        assert_eq!(likes, Some(5_000));
    }

    #[tokio::test]
    async fn test_negative_delta_preserved() {
        let store = InMemoryStore::new();
        observe(&store, 1, 900).await;
        observe(&store, 2, 850).await;
        let d = compute_delta(&store, "v1", Metric::Views, DELTA_WINDOW_DAYS).await.unwrap();
        assert_eq!(d, Some(-50));
    }

    #[tokio::test]
    async fn test_window_caps_history() {
        let store = InMemoryStore::new();
        for day in 1..=20 {
            observe(&store, day, day as i64 * 10).await;
        }
        // 15 rows: days 20 down to 6.
        let d = compute_delta(&store, "v1", Metric::Views, DELTA_WINDOW_DAYS).await.unwrap();
        assert_eq!(d, Some(200 - 60));
    }
}
