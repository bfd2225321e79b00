//! Normalized composite scorer.
//!
//! Weighted arithmetic mean of four `[0, 100]` sub-scores:
//!
//! ```text
//! total = (w_v·view + w_p·popularity + w_r·recency + w_e·engagement)
//!         / (w_v + w_p + w_r + w_e)
//! ```
//!
//! A zero weight sum yields `0`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::models::{Collection, Counters, Item};
use crate::normalize::{self, round2, NEUTRAL_SCORE};

/// Per-sub-score weights. All default to `1.0`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositeWeights {
    pub view: f64,
    pub popularity: f64,
    pub recency: f64,
    pub engagement: f64,
}

impl Default for CompositeWeights {
    fn default() -> Self {
        Self {
            view: 1.0,
            popularity: 1.0,
            recency: 1.0,
            engagement: 1.0,
        }
    }
}

impl CompositeWeights {
    pub fn sum(&self) -> f64 {
        self.view + self.popularity + self.recency + self.engagement
    }
}

/// Unrounded raw inputs kept alongside a score for audit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeInputs {
    pub raw_view_count: i64,
    pub raw_popularity: Option<i64>,
    pub raw_published_at: String,
    pub raw_like_count: i64,
    pub raw_comment_count: i64,
    pub raw_engagement: i64,
    /// `None` when the publish timestamp could not be parsed.
    pub days_old: Option<i64>,
}

/// Output of [`CompositeScorer::score`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompositeScore {
    pub total: f64,
    pub view: f64,
    pub popularity: f64,
    pub recency: f64,
    pub engagement: f64,
    pub weights: CompositeWeights,
    pub metadata: CompositeInputs,
}

#[derive(Debug, Clone, Default)]
pub struct CompositeScorer {
    weights: CompositeWeights,
}

impl CompositeScorer {
    pub fn new(weights: CompositeWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &CompositeWeights {
        &self.weights
    }

    /// Score one observation. `now` is the reference clock for recency.
    pub fn score(
        &self,
        item: &Item,
        counters: &Counters,
        collection: Option<&Collection>,
        now: DateTime<Utc>,
    ) -> CompositeScore {
        let popularity_count = collection.and_then(|c| c.popularity);

        let view = normalize::view_score(counters.views);
        let popularity = normalize::popularity_score(counters.views, popularity_count);
        let days_old = normalize::days_old(&item.published_at, now);
        let recency = match days_old {
            Some(days) => normalize::recency_score(days),
            None => {
                warn!(
                    item_id = %item.id,
                    published_at = %item.published_at,
                    "unparsable publish timestamp, recency set to neutral"
                );
                NEUTRAL_SCORE
            }
        };
        let engagement = normalize::engagement_score(counters.likes, counters.comments);

        let w = self.weights;
        let weight_sum = w.sum();
        let total = if weight_sum == 0.0 {
            0.0
        } else {
            (view * w.view
                + popularity * w.popularity
                + recency * w.recency
                + engagement * w.engagement)
                / weight_sum
        };

        CompositeScore {
            total: round2(total),
            view: round2(view),
            popularity: round2(popularity),
            recency: round2(recency),
            engagement: round2(engagement),
            weights: w,
            metadata: CompositeInputs {
                raw_view_count: counters.views,
                raw_popularity: popularity_count,
                raw_published_at: item.published_at.clone(),
                raw_like_count: counters.likes,
                raw_comment_count: counters.comments,
                raw_engagement: counters.likes.saturating_add(counters.comments),
                days_old,
            },
        }
    }
}
