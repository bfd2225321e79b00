//! # trendlens core
//!
//! Shared logic for trendlens: the snapshot data model, the two scoring
//! algorithms, the store abstraction, the delta engine, ranking, and the
//! collection-run pipeline.
//!
//! This crate contains no SQL, no filesystem I/O, and no tokio runtime. The
//! application crate supplies a SQLite [`store::Store`] and file-backed
//! [`provider`] implementations; tests use [`store::memory::InMemoryStore`].
//!
//! ## Data flow
//!
//! ```text
//! CatalogProvider ──▶ Collector ──▶ Store (dedup insert)
//!                        │
//!                        ├──▶ HeuristicScorer ──▶ Store
//!                        └──▶ CompositeScorer ──▶ Store
//!
//! Store ──▶ delta::compute_delta ──▶ rank::rank ──▶ CLI
//! ```

pub mod collect;
pub mod delta;
pub mod detail;
pub mod duration;
pub mod error;
pub mod lexicon;
pub mod models;
pub mod normalize;
pub mod provider;
pub mod rank;
pub mod scoring;
pub mod store;

pub use error::ValidationError;
