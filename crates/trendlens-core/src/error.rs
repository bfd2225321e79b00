//! Caller-input validation errors.
//!
//! These are raised before any collaborator or store call so front ends can
//! report them as user mistakes rather than internal failures. Everything
//! else flows through `anyhow`.

use chrono::NaiveDate;
use thiserror::Error;

/// Rejected caller input.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("select at least one category to collect")]
    EmptySelection,

    #[error("no active collections registered; add one with `trend collections add <id>`")]
    NoActiveCollections,

    #[error("invalid date '{0}': expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("unknown source filter '{0}': use all, collection, or catalog")]
    UnknownPartitionFilter(String),

    #[error("unknown sort order '{0}': use asc or desc")]
    UnknownSortOrder(String),

    #[error("limit must be >= 1")]
    ZeroLimit,

    #[error("max results must be between 1 and {max}, got {value}")]
    MaxResultsOutOfRange { value: usize, max: usize },

    #[error("threshold must be a finite number")]
    NonFiniteThreshold,

    #[error("item id must not be empty")]
    EmptyItemId,

    #[error("collection weight must be a finite number >= 0, got {0}")]
    InvalidWeight(f64),
}

/// Check an explicit collection weight.
pub fn validate_weight(weight: f64) -> Result<f64, ValidationError> {
    if weight.is_finite() && weight >= 0.0 {
        Ok(weight)
    } else {
        Err(ValidationError::InvalidWeight(weight))
    }
}

/// Parse a `YYYY-MM-DD` observation date.
pub fn parse_date(raw: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|_| ValidationError::InvalidDate(raw.to_string()))
}
