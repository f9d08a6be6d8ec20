//! Interval strings
//!
//! Bucket spans, frequencies and query delays are written as a whole count
//! followed by a unit (`15m`, `1h`, `500ms`).

use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;

static INTERVAL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([0-9]*)\s*(ms|y|M|w|d|h|m|s)$").expect("interval pattern is valid")
});

/// Units the search engine accepts in durations
const ES_UNITS: [&str; 5] = ["ms", "s", "m", "h", "d"];

const MS_PER_SECOND: u64 = 1_000;
const MS_PER_MINUTE: u64 = 60 * MS_PER_SECOND;
const MS_PER_HOUR: u64 = 60 * MS_PER_MINUTE;
const MS_PER_DAY: u64 = 24 * MS_PER_HOUR;

fn unit_ms(unit: &str) -> Option<u64> {
    match unit {
        "ms" => Some(1),
        "s" => Some(MS_PER_SECOND),
        "m" => Some(MS_PER_MINUTE),
        "h" => Some(MS_PER_HOUR),
        "d" => Some(MS_PER_DAY),
        "w" => Some(7 * MS_PER_DAY),
        "M" => Some(30 * MS_PER_DAY),
        "y" => Some(365 * MS_PER_DAY),
        _ => None,
    }
}

/// Parse an interval string
///
/// Returns `None` when the string is not a whole count followed by a known
/// unit, or when `es_units_only` is set and the unit is not one of `ms`, `s`,
/// `m`, `h`, `d`.
///
/// # Examples
/// ```
/// # use mlj_config::interval::parse_interval;
/// # use std::time::Duration;
/// assert_eq!(parse_interval("15m", true), Some(Duration::from_secs(900)));
/// assert_eq!(parse_interval("1w", true), None);
/// assert_eq!(parse_interval("1w", false), Some(Duration::from_secs(7 * 86_400)));
/// ```
#[must_use]
pub fn parse_interval(interval: &str, es_units_only: bool) -> Option<Duration> {
    let caps = INTERVAL_RE.captures(interval.trim())?;
    let count: u64 = caps.get(1)?.as_str().parse().ok()?;
    let unit = caps.get(2)?.as_str();

    if es_units_only && !ES_UNITS.contains(&unit) {
        return None;
    }

    let ms = count.checked_mul(unit_ms(unit)?)?;
    Some(Duration::from_millis(ms))
}

/// Milliseconds of an interval, `None` when unparsable
#[inline]
#[must_use]
pub fn interval_ms(interval: &str, es_units_only: bool) -> Option<u64> {
    parse_interval(interval, es_units_only).and_then(|d| u64::try_from(d.as_millis()).ok())
}
