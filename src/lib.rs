//! # trendlens
//!
//! Snapshot-based trend collection, scoring and ranking for content catalogs.
//!
//! The domain logic (scorers, delta engine, ranking, collection pipeline)
//! lives in `trendlens-core`. This crate supplies the SQLite store, the
//! JSONL catalog provider, configuration and the `trend` CLI.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌──────────────┐   ┌──────────┐
//! │ JSONL       │──▶│  Collector   │──▶│  SQLite  │
//! │ catalog     │   │ score+dedup  │   │  store   │
//! └─────────────┘   └──────────────┘   └────┬─────┘
//!                                           │
//!                                ┌──────────┴─────────┐
//!                                ▼                    ▼
//!                          ┌──────────┐        ┌────────────┐
//!                          │  rank    │        │ show/label │
//!                          └──────────┘        └────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`telemetry`] | `tracing` subscriber setup |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema creation |
//! | [`sqlite_store`] | SQLite implementation of the core `Store` trait |
//! | [`catalog_jsonl`] | File-backed catalog and comment providers |
//! | [`archive`] | Daily JSONL archive of collected records |
//! | [`ingest`] | `collect` commands |
//! | [`rank`] | `rank` command |
//! | [`show`] | `show` command |
//! | [`labels`] | `label` / `unlabeled` commands |
//! | [`collections`] | Watch-list commands |
//! | [`stats`] | `stats` command |

pub mod archive;
pub mod catalog_jsonl;
pub mod collections;
pub mod config;
pub mod db;
pub mod ingest;
pub mod labels;
pub mod migrate;
pub mod rank;
pub mod show;
pub mod sqlite_store;
pub mod stats;
pub mod telemetry;
