//! The two independent scorers attached to every new snapshot.
//!
//! - [`heuristic::HeuristicScorer`]: rule-based lexicon composite over item
//!   metadata (keywords, genre, comments, collection tier, length, slang).
//! - [`composite::CompositeScorer`]: weighted mean of four normalized
//!   `[0, 100]` sub-scores from [`crate::normalize`].
//!
//! Both are pure, deterministic and never fail: malformed or missing inputs
//! degrade to documented neutral values.

pub mod composite;
pub mod heuristic;

pub use composite::{CompositeInputs, CompositeScore, CompositeScorer, CompositeWeights};
pub use heuristic::{Evidence, HeuristicScore, HeuristicScorer, LengthBucket};
