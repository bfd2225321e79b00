//! ISO-8601 duration parsing (`PT15M33S`, `P1DT2H`, `P0D`).
//!
//! Only week/day/hour/minute/second designators are accepted. Year and
//! month designators have no fixed length and are rejected.

use regex::Regex;
use std::sync::LazyLock;

static DURATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^P(?:(\d+(?:\.\d+)?)W)?(?:(\d+(?:\.\d+)?)D)?(?:T(?:(\d+(?:\.\d+)?)H)?(?:(\d+(?:\.\d+)?)M)?(?:(\d+(?:\.\d+)?)S)?)?$",
    )
    .expect("duration pattern is valid")
});

const UNIT_SECONDS: [f64; 5] = [604_800.0, 86_400.0, 3_600.0, 60.0, 1.0];

/// Parse an ISO-8601 duration into total seconds.
///
/// Returns `None` for empty input, a bare `P`/`PT`, or anything the pattern
/// does not accept.
pub fn parse_seconds(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    if raw.ends_with('T') {
        return None;
    }
    let caps = DURATION_RE.captures(raw)?;

    let mut total = 0.0;
    let mut seen = false;
    for (i, unit) in UNIT_SECONDS.iter().enumerate() {
        if let Some(m) = caps.get(i + 1) {
            total += m.as_str().parse::<f64>().ok()? * unit;
            seen = true;
        }
    }
    seen.then_some(total)
}

/// Parse an ISO-8601 duration into minutes.
pub fn parse_minutes(raw: &str) -> Option<f64> {
    parse_seconds(raw).map(|s| s / 60.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minutes_and_seconds() {
        assert_eq!(parse_seconds("PT15M33S"), Some(933.0));
        assert_eq!(parse_seconds("PT59S"), Some(59.0));
        assert_eq!(parse_minutes("PT3M"), Some(3.0));
    }

    #[test]
    fn test_days_hours_weeks() {
        assert_eq!(parse_seconds("P1DT2H"), Some(93_600.0));
        assert_eq!(parse_seconds("P1W"), Some(604_800.0));
        assert_eq!(parse_seconds("P0D"), Some(0.0));
    }

    #[test]
    fn test_fractional_seconds() {
        assert_eq!(parse_seconds("PT1.5S"), Some(1.5));
    }

    #[test]
    fn test_rejects_malformed() {
        assert_eq!(parse_seconds(""), None);
        assert_eq!(parse_seconds("P"), None);
        assert_eq!(parse_seconds("PT"), None);
        assert_eq!(parse_seconds("15:33"), None);
        assert_eq!(parse_seconds("P1Y"), None);
        assert_eq!(parse_seconds("PT5X"), None);
    }
}
