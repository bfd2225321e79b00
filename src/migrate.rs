//! Schema creation. Every statement is idempotent, so [`apply`] runs on each
//! store open and `trend init` is safe to repeat.

use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS items (
        id TEXT PRIMARY KEY,
        title TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        collection_id TEXT NOT NULL,
        collection_name TEXT NOT NULL DEFAULT '',
        category TEXT NOT NULL DEFAULT '',
        published_at TEXT NOT NULL DEFAULT '',
        duration TEXT NOT NULL DEFAULT '',
        thumbnail_url TEXT,
        tags_json TEXT NOT NULL DEFAULT '[]',
        first_seen_at INTEGER NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS snapshots (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        item_id TEXT NOT NULL,
        partition_key TEXT NOT NULL,
        observed_on TEXT NOT NULL,
        views INTEGER NOT NULL DEFAULT 0,
        likes INTEGER NOT NULL DEFAULT 0,
        comments INTEGER NOT NULL DEFAULT 0,
        rank_position INTEGER NOT NULL DEFAULT 0,
        UNIQUE(item_id, observed_on, partition_key),
        FOREIGN KEY (item_id) REFERENCES items(id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS heuristic_scores (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        snapshot_id INTEGER NOT NULL,
        item_id TEXT NOT NULL,
        total REAL NOT NULL,
        keyword REAL NOT NULL,
        genre REAL NOT NULL,
        comment REAL NOT NULL,
        collection REAL NOT NULL,
        length REAL NOT NULL,
        penalty REAL NOT NULL,
        evidence_json TEXT NOT NULL,
        created_at INTEGER NOT NULL,
        FOREIGN KEY (snapshot_id) REFERENCES snapshots(id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS composite_scores (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        snapshot_id INTEGER NOT NULL,
        item_id TEXT NOT NULL,
        total REAL NOT NULL,
        view_score REAL NOT NULL,
        popularity REAL NOT NULL,
        recency REAL NOT NULL,
        engagement REAL NOT NULL,
        weights_json TEXT NOT NULL,
        metadata_json TEXT NOT NULL,
        created_at INTEGER NOT NULL,
        FOREIGN KEY (snapshot_id) REFERENCES snapshots(id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS collections (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL DEFAULT '',
        popularity INTEGER,
        weight REAL,
        state TEXT NOT NULL DEFAULT 'inactive',
        blacklisted INTEGER NOT NULL DEFAULT 0,
        last_collected_on TEXT,
        updated_at INTEGER NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS labels (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        item_id TEXT NOT NULL,
        is_target INTEGER NOT NULL,
        labeled_by TEXT NOT NULL DEFAULT '',
        notes TEXT NOT NULL DEFAULT '',
        labeled_at INTEGER NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_snapshots_observed_on ON snapshots(observed_on)",
    "CREATE INDEX IF NOT EXISTS idx_snapshots_item_date ON snapshots(item_id, observed_on DESC)",
    "CREATE INDEX IF NOT EXISTS idx_heuristic_snapshot ON heuristic_scores(snapshot_id)",
    "CREATE INDEX IF NOT EXISTS idx_heuristic_item ON heuristic_scores(item_id)",
    "CREATE INDEX IF NOT EXISTS idx_composite_snapshot ON composite_scores(snapshot_id)",
    "CREATE INDEX IF NOT EXISTS idx_labels_item ON labels(item_id)",
];

/// Create all tables and indexes on an open pool.
pub async fn apply(pool: &SqlitePool) -> Result<()> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}

/// `trend init`: create the database file and schema.
pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    apply(&pool).await?;
    pool.close().await;

    println!("initialized {}", config.db.path.display());
    Ok(())
}
