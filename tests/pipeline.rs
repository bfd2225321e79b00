//! Collector, delta engine and ranking running against the SQLite store.

use std::fs;
use std::path::Path;

use chrono::{NaiveDate, TimeZone, Utc};
use serde_json::json;
use tempfile::TempDir;

use trendlens::catalog_jsonl::{JsonlCatalog, JsonlComments};
use trendlens::sqlite_store::SqliteStore;
use trendlens::{db, migrate};
use trendlens_core::collect::{CollectOptions, CollectReport, Collector};
use trendlens_core::delta::{compute_delta, DELTA_WINDOW_DAYS};
use trendlens_core::models::{
    CollectionInfo, CollectionState, Counters, InsertOutcome, Item, Metric, NewSnapshot,
    PartitionFilter, SourcePartition,
};
use trendlens_core::rank::{rank, RankQuery, SortKey, SortOrder};
use trendlens_core::scoring::{CompositeScorer, CompositeWeights, HeuristicScorer};
use trendlens_core::store::Store;

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 11, d).unwrap()
}

async fn open_store(tmp: &TempDir) -> SqliteStore {
    let pool = db::open(&tmp.path().join("data/trend.sqlite")).await.unwrap();
    migrate::apply(&pool).await.unwrap();
    SqliteStore::new(pool)
}

fn write_lines(path: &Path, lines: &[serde_json::Value]) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let body: Vec<String> = lines.iter().map(|l| l.to_string()).collect();
    fs::write(path, body.join("\n")).unwrap();
}

fn record(id: &str, title: &str, views: i64) -> serde_json::Value {
    json!({
        "id": id,
        "title": title,
        "collection_id": "c1",
        "collection_name": "Channel One",
        "published_at": "2025-11-01T00:00:00Z",
        "duration": "PT3M",
        "views": views,
        "likes": views / 50,
        "comments": views / 500,
    })
}

fn opts() -> CollectOptions {
    CollectOptions {
        max_results: 50,
        recent_days: None,
        skip_collected_today: false,
        fetch_comments: false,
    }
}

async fn collect(store: &SqliteStore, root: &Path, category: &str, date: NaiveDate) -> CollectReport {
    let now = Utc.with_ymd_and_hms(2025, 11, 16, 0, 0, 0).unwrap();
    let catalog = JsonlCatalog::new(root, now);
    let comments = JsonlComments::new(root);
    let collector = Collector::new(
        store,
        &catalog,
        &comments,
        HeuristicScorer::default(),
        CompositeScorer::new(CompositeWeights::default()),
        now,
    );
    collector
        .collect_categories(&[category.to_string()], date, &opts())
        .await
        .unwrap()
}

#[tokio::test]
async fn test_scores_persist_through_sqlite() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().join("catalog");
    write_lines(
        &root.join("collections.jsonl"),
        &[json!({"id": "c1", "name": "Channel One", "popularity": 5000})],
    );
    write_lines(
        &root.join("categories/10.jsonl"),
        &[record("v1", "건강 무릎 당뇨 이야기", 12_000)],
    );

    let store = open_store(&tmp).await;
    let report = collect(&store, &root, "10", day(15)).await;
    assert_eq!(report.stats.new, 1);
    assert_eq!(report.ingested[0].heuristic.total, 10.3);

    let views = store.snapshots_by_date(day(15), PartitionFilter::All).await.unwrap();
    assert_eq!(views.len(), 1);
    let view = &views[0];
    assert_eq!(view.title, "건강 무릎 당뇨 이야기");
    let heuristic = view.heuristic.as_ref().unwrap();
    assert_eq!(heuristic.total, 10.3);
    assert_eq!(heuristic.keyword, 7.5);
    assert_eq!(heuristic.evidence.keywords.len(), 3);
    let composite = view.composite.as_ref().unwrap();
    assert!(composite.total >= 0.0 && composite.total <= 100.0);
    assert_eq!(view.snapshot.counters.rank_position, 1);

    let collection = store.get_collection("c1").await.unwrap().unwrap();
    assert_eq!(collection.popularity, Some(5000));
    assert_eq!(collection.name, "Channel One");
    assert_eq!(collection.state, CollectionState::Inactive);

    store.close().await;
}

#[tokio::test]
async fn test_rerun_same_day_is_deduplicated() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().join("catalog");
    write_lines(
        &root.join("categories/10.jsonl"),
        &[record("v1", "노래 한곡", 100), record("v2", "다른 노래", 200)],
    );

    let store = open_store(&tmp).await;
    let first = collect(&store, &root, "10", day(15)).await;
    assert_eq!(first.stats.new, 2);

    let second = collect(&store, &root, "10", day(15)).await;
    assert_eq!(second.stats.new, 0);
    assert_eq!(second.stats.duplicates, 2);
    assert!(second.ingested.is_empty());

    let stats = store.stats().await.unwrap();
    assert_eq!(stats.items, 2);
    assert_eq!(stats.snapshots, 2);
    assert_eq!(stats.latest_date, Some(day(15)));

    // Same item, same day, other partition is a separate observation.
    let other = collect(&store, &root, "other", day(15)).await;
    assert_eq!(other.stats.total, 0);
    write_lines(&root.join("categories/22.jsonl"), &[record("v1", "노래 한곡", 100)]);
    let cross = collect(&store, &root, "22", day(15)).await;
    assert_eq!(cross.stats.new, 1);

    store.close().await;
}

#[tokio::test]
async fn test_delta_and_ranking_over_history() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().join("catalog");
    let store = open_store(&tmp).await;

    write_lines(
        &root.join("categories/10.jsonl"),
        &[record("a", "same title", 1_000), record("b", "same title", 1_000)],
    );
    collect(&store, &root, "10", day(1)).await;

    write_lines(
        &root.join("categories/10.jsonl"),
        &[record("a", "same title", 1_200), record("b", "same title", 4_000)],
    );
    collect(&store, &root, "10", day(15)).await;

    let delta_a = compute_delta(&store, "a", Metric::Views, DELTA_WINDOW_DAYS).await.unwrap();
    assert_eq!(delta_a, Some(200));
    let delta_b = compute_delta(&store, "b", Metric::Views, DELTA_WINDOW_DAYS).await.unwrap();
    assert_eq!(delta_b, Some(3_000));

    let query = RankQuery {
        date: day(15),
        threshold: f64::MIN,
        min_delta: 0,
        sort_key: SortKey::HeuristicScore,
        order: SortOrder::Desc,
        partition: PartitionFilter::All,
        limit: 10,
    };
    let page = rank(&store, &query).await.unwrap();
    let ids: Vec<&str> = page.items.iter().map(|r| r.view.snapshot.item_id.as_str()).collect();
    assert_eq!(ids, vec!["b", "a"]);
    assert!(page.items.iter().all(|r| r.has_history));

    let min_delta = RankQuery {
        min_delta: 1_000,
        ..query.clone()
    };
    let page = rank(&store, &min_delta).await.unwrap();
    assert_eq!(page.count, 1);
    assert_eq!(page.items[0].delta, 3_000);

    let collection_only = RankQuery {
        partition: PartitionFilter::CollectionScoped,
        ..query
    };
    assert_eq!(rank(&store, &collection_only).await.unwrap().count, 0);

    store.close().await;
}

#[tokio::test]
async fn test_collection_registry_roundtrip() {
    let tmp = TempDir::new().unwrap();
    let store = open_store(&tmp).await;

    store
        .add_collection(&CollectionInfo {
            id: "c9".into(),
            name: "Nine".into(),
            popularity: Some(120_000),
        })
        .await
        .unwrap();
    store
        .upsert_collection_on_sight(&CollectionInfo {
            id: "c9".into(),
            name: String::new(),
            popularity: None,
        })
        .await
        .unwrap();

    let c9 = store.get_collection("c9").await.unwrap().unwrap();
    assert_eq!(c9.name, "Nine");
    assert_eq!(c9.popularity, Some(120_000));
    assert_eq!(store.active_collections().await.unwrap().len(), 1);

    store.mark_collected("c9", day(3)).await.unwrap();
    let c9 = store.get_collection("c9").await.unwrap().unwrap();
    assert_eq!(c9.last_collected_on, Some(day(3)));

    assert!(store.remove_collection("c9").await.unwrap());
    assert!(store.active_collections().await.unwrap().is_empty());
    assert!(!store.remove_collection("missing").await.unwrap());

    store.close().await;
}

#[tokio::test]
async fn test_collection_weight_and_blacklist_in_sqlite() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().join("catalog");
    write_lines(
        &root.join("collections.jsonl"),
        &[json!({"id": "c1", "name": "Channel One", "popularity": 5000})],
    );
    write_lines(&root.join("categories/10.jsonl"), &[record("v1", "노래 한곡", 100)]);

    let store = open_store(&tmp).await;
    store
        .add_collection(&CollectionInfo {
            id: "c1".into(),
            name: "Channel One".into(),
            popularity: Some(5000),
        })
        .await
        .unwrap();
    assert!(store.set_collection_weight("c1", Some(0.5)).await.unwrap());
    assert!(!store.set_collection_weight("ghost", Some(1.0)).await.unwrap());

    let report = collect(&store, &root, "10", day(15)).await;
    assert_eq!(report.stats.new, 1);
    assert_eq!(report.ingested[0].heuristic.collection, 2.5);

    let c1 = store.get_collection("c1").await.unwrap().unwrap();
    assert_eq!(c1.weight, Some(0.5));

    assert!(store.set_blacklisted("c1", true).await.unwrap());
    assert!(store.active_collections().await.unwrap().is_empty());
    let c1 = store.get_collection("c1").await.unwrap().unwrap();
    assert!(c1.blacklisted);
    assert_eq!(c1.state, CollectionState::Active);

    assert!(store.set_blacklisted("c1", false).await.unwrap());
    assert!(store.set_collection_weight("c1", None).await.unwrap());
    let c1 = store.get_collection("c1").await.unwrap().unwrap();
    assert_eq!(c1.weight, None);
    assert_eq!(store.active_collections().await.unwrap().len(), 1);

    store.close().await;
}

#[tokio::test]
async fn test_unscored_snapshot_is_backfilled_on_rerun() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().join("catalog");
    write_lines(&root.join("categories/10.jsonl"), &[record("v1", "노래 한곡", 100)]);

    let store = open_store(&tmp).await;
    store
        .insert_item(&Item {
            id: "v1".into(),
            title: "노래 한곡".into(),
            description: String::new(),
            collection_id: "c1".into(),
            collection_name: "Channel One".into(),
            category: "10".into(),
            published_at: "2025-11-01T00:00:00Z".into(),
            duration: "PT3M".into(),
            thumbnail_url: None,
            tags: Vec::new(),
        })
        .await
        .unwrap();
    let partition = SourcePartition::catalog("10");
    let outcome = store
        .insert_snapshot(&NewSnapshot {
            item_id: "v1".into(),
            partition: partition.clone(),
            observed_on: day(15),
            counters: Counters {
                views: 100,
                likes: 2,
                comments: 0,
                rank_position: 1,
            },
        })
        .await
        .unwrap();
    assert!(matches!(outcome, InsertOutcome::Inserted(_)));
    let before = store
        .find_snapshot("v1", day(15), &partition)
        .await
        .unwrap()
        .unwrap();
    assert!(before.heuristic.is_none() && before.composite.is_none());

    let report = collect(&store, &root, "10", day(15)).await;
    assert_eq!(report.stats.new, 0);
    assert_eq!(report.stats.duplicates, 1);

    let after = store
        .find_snapshot("v1", day(15), &partition)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(after.snapshot.id, before.snapshot.id);
    assert!(after.heuristic.is_some());
    assert!(after.composite.is_some());

    store.close().await;
}
