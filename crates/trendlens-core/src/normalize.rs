//! Normalization curves mapping raw metrics to bounded `[0, 100]` sub-scores.
//!
//! All functions here are pure and total: missing or malformed inputs map to
//! documented neutral values rather than errors.
//!
//! | Curve | Shape | Anchors |
//! |-------|-------|---------|
//! | [`view_score`] | `log10(v) / 8` | 10⁴ → 50, 10⁶ → 75, 10⁸ → 100 |
//! | [`engagement_score`] | `log10(l + c) / 6` | 10³ → 50, 10⁶ → 100 |
//! | [`popularity_score`] | 10-step ratio table | ratio ≥ 100 → 100 |
//! | [`recency_score`] | `100 · e^(-d/30)` | 0 d → 100, 30 d → 36.8 |

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

pub const MAX_SCORE: f64 = 100.0;
/// Returned when an input is present but cannot be judged.
pub const NEUTRAL_SCORE: f64 = 50.0;

const VIEW_LOG_DECADES: f64 = 8.0;
const ENGAGEMENT_LOG_DECADES: f64 = 6.0;
const RECENCY_TIME_CONSTANT_DAYS: f64 = 30.0;
const SECONDS_PER_DAY: i64 = 86_400;

/// Metric-to-popularity ratio steps, checked top-down. Lower bounds inclusive.
const RATIO_STEPS: [(f64, f64); 9] = [
    (100.0, 100.0),
    (50.0, 90.0),
    (20.0, 80.0),
    (10.0, 70.0),
    (5.0, 60.0),
    (2.0, 50.0),
    (1.0, 40.0),
    (0.5, 30.0),
    (0.1, 20.0),
];
const RATIO_FLOOR_SCORE: f64 = 10.0;

fn clamp_score(score: f64) -> f64 {
    score.clamp(0.0, MAX_SCORE)
}

fn log_scale(value: i64, decades: f64) -> f64 {
    if value <= 0 {
        return 0.0;
    }
    clamp_score((value as f64).log10() / decades * MAX_SCORE)
}

/// Log-scale view count: `clamp(log10(views) / 8 * 100)`, `0` for `views <= 0`.
pub fn view_score(views: i64) -> f64 {
    log_scale(views, VIEW_LOG_DECADES)
}

/// Log-scale engagement over `likes + comments`, `0` when the sum is `<= 0`.
pub fn engagement_score(likes: i64, comments: i64) -> f64 {
    log_scale(likes.saturating_add(comments), ENGAGEMENT_LOG_DECADES)
}

/// Underdog bonus: rewards a high metric-to-popularity ratio.
///
/// - Popularity missing or `<= 0` → `100` (absence never suppresses a score).
/// - Primary metric `<= 0` → `50`.
/// - Otherwise the ratio is mapped through a descending step table.
pub fn popularity_score(primary_metric: i64, popularity: Option<i64>) -> f64 {
    let popularity = match popularity {
        Some(p) if p > 0 => p,
        _ => return MAX_SCORE,
    };
    if primary_metric <= 0 {
        return NEUTRAL_SCORE;
    }

    let ratio = primary_metric as f64 / popularity as f64;
    RATIO_STEPS
        .iter()
        .find(|(bound, _)| ratio >= *bound)
        .map(|(_, score)| *score)
        .unwrap_or(RATIO_FLOOR_SCORE)
}

/// Exponential decay `100 · e^(-days/30)`, clamped to `[0, 100]`.
///
/// Future timestamps (negative age) clamp to `100`.
pub fn recency_score(days_old: i64) -> f64 {
    clamp_score(MAX_SCORE * (-(days_old as f64) / RECENCY_TIME_CONSTANT_DAYS).exp())
}

/// Whole days elapsed between `published_at` and `now`, floored.
///
/// Returns `None` when the timestamp cannot be parsed.
pub fn days_old(published_at: &str, now: DateTime<Utc>) -> Option<i64> {
    let published = parse_timestamp(published_at)?;
    Some((now - published).num_seconds().div_euclid(SECONDS_PER_DAY))
}

/// Parse a provider timestamp.
///
/// Accepts RFC 3339 (`2025-11-05T10:00:00Z`, offsets allowed), a naive
/// `YYYY-MM-DDTHH:MM:SS` (read as UTC), or a bare `YYYY-MM-DD` (UTC midnight).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if raw.contains('T') {
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&Utc));
        }
        return NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|naive| naive.and_utc());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Round to two decimal places for output. Internal sums keep full precision.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
