//! SQLite-backed [`Store`] implementation.
//!
//! The `(item_id, observed_on, partition_key)` uniqueness rule is enforced by
//! a table constraint; inserts use `ON CONFLICT DO NOTHING` and read
//! `rows_affected` to tell a new snapshot from a duplicate. Score records are
//! append-only and "latest" means highest id per snapshot.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use trendlens_core::error;
use trendlens_core::models::{
    Collection, CollectionInfo, CollectionState, Counters, InsertOutcome, Item, Label, NewLabel,
    NewSnapshot, PartitionFilter, Snapshot, SnapshotId, SourcePartition,
    COLLECTION_PARTITION_PREFIX,
};
use trendlens_core::scoring::{CompositeScore, HeuristicScore};
use trendlens_core::store::{SnapshotView, Store, StoreStats, UnlabeledItem};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Snapshot joined with item display fields and the latest score of each kind.
const VIEW_SELECT: &str = r#"
    SELECT
        s.id, s.item_id, s.partition_key, s.observed_on,
        s.views, s.likes, s.comments, s.rank_position,
        COALESCE(i.title, '') AS title,
        COALESCE(i.collection_id, '') AS collection_id,
        COALESCE(i.collection_name, '') AS collection_name,
        i.thumbnail_url,
        COALESCE(i.published_at, '') AS published_at,
        h.id AS h_id, h.total AS h_total, h.keyword AS h_keyword, h.genre AS h_genre,
        h.comment AS h_comment, h.collection AS h_collection, h.length AS h_length,
        h.penalty AS h_penalty, h.evidence_json AS h_evidence,
        c.id AS c_id, c.total AS c_total, c.view_score AS c_view, c.popularity AS c_popularity,
        c.recency AS c_recency, c.engagement AS c_engagement,
        c.weights_json AS c_weights, c.metadata_json AS c_metadata
    FROM snapshots s
    LEFT JOIN items i ON i.id = s.item_id
    LEFT JOIN heuristic_scores h
        ON h.id = (SELECT MAX(id) FROM heuristic_scores WHERE snapshot_id = s.id)
    LEFT JOIN composite_scores c
        ON c.id = (SELECT MAX(id) FROM composite_scores WHERE snapshot_id = s.id)
"#;

const ITEM_COLUMNS: &str = "i.id, i.title, i.description, i.collection_id, i.collection_name, \
     i.category, i.published_at, i.duration, i.thumbnail_url, i.tags_json";

const COLLECTION_SELECT: &str =
    "SELECT id, name, popularity, weight, state, blacklisted, last_collected_on FROM collections";

/// SQLite implementation of the [`Store`] trait.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn upsert_collection_row(&self, info: &CollectionInfo) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO collections (id, name, popularity, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                name = CASE WHEN excluded.name <> '' THEN excluded.name ELSE collections.name END,
                popularity = COALESCE(excluded.popularity, collections.popularity),
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&info.id)
        .bind(&info.name)
        .bind(info.popularity)
        .bind(Utc::now().timestamp())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

/// Stored dates that fail to parse are corruption, not bad input.
fn parse_date(raw: &str) -> Result<NaiveDate> {
    error::parse_date(raw).map_err(|e| anyhow!("Corrupt date in database: {}", e))
}

fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn timestamp_to_utc(ts: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(ts, 0).unwrap_or_default()
}

fn snapshot_from_row(row: &SqliteRow) -> Result<Snapshot> {
    let partition: String = row.get("partition_key");
    let observed_on: String = row.get("observed_on");
    Ok(Snapshot {
        id: row.get("id"),
        item_id: row.get("item_id"),
        partition: SourcePartition::from_key(&partition),
        observed_on: parse_date(&observed_on)?,
        counters: Counters {
            views: row.get("views"),
            likes: row.get("likes"),
            comments: row.get("comments"),
            rank_position: row.get("rank_position"),
        },
    })
}

fn heuristic_from_row(row: &SqliteRow) -> Result<Option<HeuristicScore>> {
    let id: Option<i64> = row.get("h_id");
    if id.is_none() {
        return Ok(None);
    }
    let evidence: String = row.get("h_evidence");
    Ok(Some(HeuristicScore {
        total: row.get("h_total"),
        keyword: row.get("h_keyword"),
        genre: row.get("h_genre"),
        comment: row.get("h_comment"),
        collection: row.get("h_collection"),
        length: row.get("h_length"),
        penalty: row.get("h_penalty"),
        evidence: serde_json::from_str(&evidence).context("Corrupt heuristic evidence")?,
    }))
}

fn composite_from_row(row: &SqliteRow) -> Result<Option<CompositeScore>> {
    let id: Option<i64> = row.get("c_id");
    if id.is_none() {
        return Ok(None);
    }
    let weights: String = row.get("c_weights");
    let metadata: String = row.get("c_metadata");
    Ok(Some(CompositeScore {
        total: row.get("c_total"),
        view: row.get("c_view"),
        popularity: row.get("c_popularity"),
        recency: row.get("c_recency"),
        engagement: row.get("c_engagement"),
        weights: serde_json::from_str(&weights).context("Corrupt composite weights")?,
        metadata: serde_json::from_str(&metadata).context("Corrupt composite metadata")?,
    }))
}

fn view_from_row(row: &SqliteRow) -> Result<SnapshotView> {
    Ok(SnapshotView {
        snapshot: snapshot_from_row(row)?,
        title: row.get("title"),
        collection_id: row.get("collection_id"),
        collection_name: row.get("collection_name"),
        thumbnail_url: row.get("thumbnail_url"),
        published_at: row.get("published_at"),
        heuristic: heuristic_from_row(row)?,
        composite: composite_from_row(row)?,
    })
}

fn item_from_row(row: &SqliteRow) -> Result<Item> {
    let tags: String = row.get("tags_json");
    Ok(Item {
        id: row.get("id"),
        title: row.get("title"),
        description: row.get("description"),
        collection_id: row.get("collection_id"),
        collection_name: row.get("collection_name"),
        category: row.get("category"),
        published_at: row.get("published_at"),
        duration: row.get("duration"),
        thumbnail_url: row.get("thumbnail_url"),
        tags: serde_json::from_str(&tags).context("Corrupt item tags")?,
    })
}

fn collection_from_row(row: &SqliteRow) -> Result<Collection> {
    let state: String = row.get("state");
    let blacklisted: i64 = row.get("blacklisted");
    let last: Option<String> = row.get("last_collected_on");
    Ok(Collection {
        id: row.get("id"),
        name: row.get("name"),
        popularity: row.get("popularity"),
        weight: row.get("weight"),
        state: CollectionState::from_key(&state),
        blacklisted: blacklisted != 0,
        last_collected_on: last.as_deref().map(parse_date).transpose()?,
    })
}

#[async_trait]
impl Store for SqliteStore {
    async fn insert_item(&self, item: &Item) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO items (id, title, description, collection_id, collection_name,
                               category, published_at, duration, thumbnail_url, tags_json,
                               first_seen_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO NOTHING
            "#,
        )
        .bind(&item.id)
        .bind(&item.title)
        .bind(&item.description)
        .bind(&item.collection_id)
        .bind(&item.collection_name)
        .bind(&item.category)
        .bind(&item.published_at)
        .bind(&item.duration)
        .bind(&item.thumbnail_url)
        .bind(serde_json::to_string(&item.tags)?)
        .bind(Utc::now().timestamp())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn insert_snapshot(&self, snapshot: &NewSnapshot) -> Result<InsertOutcome> {
        let c = &snapshot.counters;
        let result = sqlx::query(
            r#"
            INSERT INTO snapshots (item_id, partition_key, observed_on,
                                   views, likes, comments, rank_position)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(item_id, observed_on, partition_key) DO NOTHING
            "#,
        )
        .bind(&snapshot.item_id)
        .bind(snapshot.partition.key())
        .bind(format_date(snapshot.observed_on))
        .bind(c.views)
        .bind(c.likes)
        .bind(c.comments)
        .bind(c.rank_position)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(InsertOutcome::Duplicate);
        }
        Ok(InsertOutcome::Inserted(result.last_insert_rowid()))
    }

    async fn get_item(&self, id: &str) -> Result<Option<Item>> {
        let row = sqlx::query(&format!("SELECT {} FROM items i WHERE i.id = ?", ITEM_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(item_from_row).transpose()
    }

    async fn insert_heuristic_score(
        &self,
        snapshot_id: SnapshotId,
        item_id: &str,
        score: &HeuristicScore,
    ) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO heuristic_scores (snapshot_id, item_id, total, keyword, genre, comment,
                                          collection, length, penalty, evidence_json, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(snapshot_id)
        .bind(item_id)
        .bind(score.total)
        .bind(score.keyword)
        .bind(score.genre)
        .bind(score.comment)
        .bind(score.collection)
        .bind(score.length)
        .bind(score.penalty)
        .bind(serde_json::to_string(&score.evidence)?)
        .bind(Utc::now().timestamp())
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    async fn insert_composite_score(
        &self,
        snapshot_id: SnapshotId,
        item_id: &str,
        score: &CompositeScore,
    ) -> Result<i64> {
        let result = sqlx::query(
            r#"
            INSERT INTO composite_scores (snapshot_id, item_id, total, view_score, popularity, recency,
                                          engagement, weights_json, metadata_json, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(snapshot_id)
        .bind(item_id)
        .bind(score.total)
        .bind(score.view)
        .bind(score.popularity)
        .bind(score.recency)
        .bind(score.engagement)
        .bind(serde_json::to_string(&score.weights)?)
        .bind(serde_json::to_string(&score.metadata)?)
        .bind(Utc::now().timestamp())
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    async fn snapshots_by_date(
        &self,
        date: NaiveDate,
        filter: PartitionFilter,
    ) -> Result<Vec<SnapshotView>> {
        let partition_clause = match filter {
            PartitionFilter::All => "",
            PartitionFilter::CollectionScoped => " AND instr(s.partition_key, ?) = 1",
            PartitionFilter::CatalogScoped => " AND instr(s.partition_key, ?) <> 1",
        };
        let sql = format!("{} WHERE s.observed_on = ?{}", VIEW_SELECT, partition_clause);

        let mut query = sqlx::query(&sql).bind(format_date(date));
        if filter != PartitionFilter::All {
            query = query.bind(COLLECTION_PARTITION_PREFIX);
        }
        let rows = query.fetch_all(&self.pool).await?;
        rows.iter().map(view_from_row).collect()
    }

    async fn recent_snapshots(&self, item_id: &str, limit: usize) -> Result<Vec<Snapshot>> {
        let rows = sqlx::query(
            r#"
            SELECT id, item_id, partition_key, observed_on, views, likes, comments, rank_position
            FROM snapshots
            WHERE item_id = ?
            ORDER BY observed_on DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(item_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(snapshot_from_row).collect()
    }

    async fn latest_observation(&self, item_id: &str) -> Result<Option<SnapshotView>> {
        let sql = format!(
            "{} WHERE s.item_id = ? ORDER BY s.observed_on DESC, s.id DESC LIMIT 1",
            VIEW_SELECT
        );
        let row = sqlx::query(&sql)
            .bind(item_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(view_from_row).transpose()
    }

    async fn find_snapshot(
        &self,
        item_id: &str,
        date: NaiveDate,
        partition: &SourcePartition,
    ) -> Result<Option<SnapshotView>> {
        let sql = format!(
            "{} WHERE s.item_id = ? AND s.observed_on = ? AND s.partition_key = ?",
            VIEW_SELECT
        );
        let row = sqlx::query(&sql)
            .bind(item_id)
            .bind(format_date(date))
            .bind(partition.key())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(view_from_row).transpose()
    }

    async fn upsert_collection_on_sight(&self, info: &CollectionInfo) -> Result<()> {
        self.upsert_collection_row(info).await
    }

    async fn add_collection(&self, info: &CollectionInfo) -> Result<()> {
        self.upsert_collection_row(info).await?;
        sqlx::query("UPDATE collections SET state = ? WHERE id = ?")
            .bind(CollectionState::Active.as_str())
            .bind(&info.id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn remove_collection(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("UPDATE collections SET state = ?, updated_at = ? WHERE id = ?")
            .bind(CollectionState::Inactive.as_str())
            .bind(Utc::now().timestamp())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn get_collection(&self, id: &str) -> Result<Option<Collection>> {
        let row = sqlx::query(&format!("{} WHERE id = ?", COLLECTION_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(collection_from_row).transpose()
    }

    async fn list_collections(&self) -> Result<Vec<Collection>> {
        let rows = sqlx::query(&format!("{} ORDER BY id", COLLECTION_SELECT))
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(collection_from_row).collect()
    }

    async fn active_collections(&self) -> Result<Vec<Collection>> {
        let rows = sqlx::query(&format!(
            "{} WHERE state = ? AND blacklisted = 0 ORDER BY id",
            COLLECTION_SELECT
        ))
        .bind(CollectionState::Active.as_str())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(collection_from_row).collect()
    }

    async fn set_collection_weight(&self, id: &str, weight: Option<f64>) -> Result<bool> {
        let result = sqlx::query("UPDATE collections SET weight = ?, updated_at = ? WHERE id = ?")
            .bind(weight)
            .bind(Utc::now().timestamp())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn set_blacklisted(&self, id: &str, blacklisted: bool) -> Result<bool> {
        let result =
            sqlx::query("UPDATE collections SET blacklisted = ?, updated_at = ? WHERE id = ?")
                .bind(blacklisted)
                .bind(Utc::now().timestamp())
                .bind(id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn mark_collected(&self, id: &str, date: NaiveDate) -> Result<()> {
        sqlx::query("UPDATE collections SET last_collected_on = ?, updated_at = ? WHERE id = ?")
            .bind(format_date(date))
            .bind(Utc::now().timestamp())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn insert_label(&self, label: &NewLabel) -> Result<i64> {
        let result = sqlx::query(
            "INSERT INTO labels (item_id, is_target, labeled_by, notes, labeled_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&label.item_id)
        .bind(label.is_target)
        .bind(&label.labeled_by)
        .bind(&label.notes)
        .bind(Utc::now().timestamp())
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    async fn labels_for(&self, item_id: &str) -> Result<Vec<Label>> {
        let rows = sqlx::query(
            "SELECT id, item_id, is_target, labeled_by, notes, labeled_at FROM labels WHERE item_id = ? ORDER BY id",
        )
        .bind(item_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| Label {
                id: row.get("id"),
                item_id: row.get("item_id"),
                is_target: row.get("is_target"),
                labeled_by: row.get("labeled_by"),
                notes: row.get("notes"),
                labeled_at: timestamp_to_utc(row.get("labeled_at")),
            })
            .collect())
    }

    async fn unlabeled_items(&self, limit: usize) -> Result<Vec<UnlabeledItem>> {
        let sql = format!(
            r#"
            SELECT {}, MAX(h.total) AS best_score
            FROM items i
            JOIN heuristic_scores h ON h.item_id = i.id
            WHERE NOT EXISTS (SELECT 1 FROM labels l WHERE l.item_id = i.id)
            GROUP BY i.id
            ORDER BY best_score DESC, i.id ASC
            LIMIT ?
            "#,
            ITEM_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await?;

        rows.iter()
            .map(|row| {
                Ok(UnlabeledItem {
                    item: item_from_row(row)?,
                    best_score: row.get("best_score"),
                })
            })
            .collect()
    }

    async fn stats(&self) -> Result<StoreStats> {
        let row = sqlx::query(
            r#"
            SELECT
                (SELECT COUNT(*) FROM items) AS items,
                (SELECT COUNT(*) FROM snapshots) AS snapshots,
                (SELECT COUNT(*) FROM labels) AS labels,
                (SELECT MAX(observed_on) FROM snapshots) AS latest_date
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        let latest: Option<String> = row.get("latest_date");
        Ok(StoreStats {
            items: row.get("items"),
            snapshots: row.get("snapshots"),
            labels: row.get("labels"),
            latest_date: latest.as_deref().map(parse_date).transpose()?,
        })
    }
}
