//! JSONL archive of newly ingested records.
//!
//! Each collection run appends one line per new snapshot to
//! `<archive_dir>/<date>/items.jsonl` (category runs) or
//! `<archive_dir>/<date>/items_collections.jsonl` (collection runs).

use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Serialize;

use trendlens_core::collect::IngestedRecord;
use trendlens_core::models::CatalogRecord;
use trendlens_core::scoring::{CompositeScore, HeuristicScore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunKind {
    Categories,
    Collections,
}

impl RunKind {
    fn file_name(&self) -> &'static str {
        match self {
            Self::Categories => "items.jsonl",
            Self::Collections => "items_collections.jsonl",
        }
    }
}

#[derive(Serialize)]
struct ArchiveLine<'a> {
    #[serde(flatten)]
    record: &'a CatalogRecord,
    partition: String,
    observed_on: String,
    snapshot_id: i64,
    heuristic: &'a HeuristicScore,
    composite: &'a CompositeScore,
}

/// Path of the archive file for a run.
pub fn archive_path(dir: &Path, date: NaiveDate, kind: RunKind) -> PathBuf {
    dir.join(date.format("%Y-%m-%d").to_string())
        .join(kind.file_name())
}

/// Append `ingested` to the run's archive file. Returns the file path, or
/// `None` when there was nothing to write.
pub fn append(
    dir: &Path,
    date: NaiveDate,
    kind: RunKind,
    ingested: &[IngestedRecord],
) -> Result<Option<PathBuf>> {
    if ingested.is_empty() {
        return Ok(None);
    }

    let path = archive_path(dir, date, kind);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create archive directory: {}", parent.display()))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Failed to open archive file: {}", path.display()))?;
    let mut writer = BufWriter::new(file);

    let observed_on = date.format("%Y-%m-%d").to_string();
    for entry in ingested {
        let line = ArchiveLine {
            record: &entry.record,
            partition: entry.partition.key(),
            observed_on: observed_on.clone(),
            snapshot_id: entry.snapshot_id,
            heuristic: &entry.heuristic,
            composite: &entry.composite,
        };
        serde_json::to_writer(&mut writer, &line)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;

    Ok(Some(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use trendlens_core::models::{Collection, CollectionState, SourcePartition};
    use trendlens_core::scoring::{CompositeScorer, HeuristicScorer};

    fn ingested(id: &str) -> IngestedRecord {
        let record = CatalogRecord {
            id: id.into(),
            title: "건강 체조".into(),
            description: String::new(),
            collection_id: "c1".into(),
            collection_name: "One".into(),
            category: "10".into(),
            published_at: "2025-11-01T00:00:00Z".into(),
            thumbnail_url: None,
            tags: Vec::new(),
            duration: "PT10M".into(),
            views: 1_000,
            likes: 10,
            comments: 1,
            rank_position: 1,
        };
        let item = record.to_item();
        let collection = Collection {
            id: "c1".into(),
            name: "One".into(),
            popularity: Some(100),
            weight: None,
            state: CollectionState::Active,
            blacklisted: false,
            last_collected_on: None,
        };
        let now = chrono::Utc.with_ymd_and_hms(2025, 11, 5, 0, 0, 0).unwrap();
        IngestedRecord {
            heuristic: HeuristicScorer::default().score(&item, None, Some(&collection)),
            composite: CompositeScorer::default().score(&item, &record.counters(), Some(&collection), now),
            partition: SourcePartition::catalog("10"),
            snapshot_id: 1,
            record,
        }
    }

    #[test]
    fn test_append_writes_one_line_per_record() {
        let tmp = tempfile::TempDir::new().unwrap();
        let date = NaiveDate::from_ymd_opt(2025, 11, 5).unwrap();

        let path = append(tmp.path(), date, RunKind::Categories, &[ingested("a"), ingested("b")])
            .unwrap()
            .unwrap();
        append(tmp.path(), date, RunKind::Categories, &[ingested("c")]).unwrap();
        assert!(path.ends_with("2025-11-05/items.jsonl"));

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<serde_json::Value> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0]["id"], "a");
        assert_eq!(lines[0]["partition"], "10");
        assert_eq!(lines[2]["heuristic"]["keyword"], 3.0);
    }

    #[test]
    fn test_empty_run_writes_nothing() {
        let tmp = tempfile::TempDir::new().unwrap();
        let date = NaiveDate::from_ymd_opt(2025, 11, 5).unwrap();
        assert!(append(tmp.path(), date, RunKind::Collections, &[]).unwrap().is_none());
        assert!(!archive_path(tmp.path(), date, RunKind::Collections).exists());
    }
}
