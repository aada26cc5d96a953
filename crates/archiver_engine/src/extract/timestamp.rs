use std::sync::LazyLock;

use chrono::{DateTime, NaiveDateTime, TimeDelta, Utc};
use regex_lite::Regex;

// `m` is minutes, `M` and `mo` are months.
static RELATIVE_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\b(\d+)\s*(mo|[smhdwMy])\b").ok());

const MINUTE: i64 = 60;
const HOUR: i64 = 60 * MINUTE;
const DAY: i64 = 24 * HOUR;

/// Parse an absolute timestamp: RFC 3339, ISO 8601 with a compact offset,
/// or Unix seconds.
pub fn parse_absolute_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(parsed) = DateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    if raw.len() >= 9 && raw.len() <= 11 && raw.chars().all(|c| c.is_ascii_digit()) {
        let seconds: i64 = raw.parse().ok()?;
        return DateTime::from_timestamp(seconds, 0);
    }
    None
}

/// Resolve compact relative ages such as `"2h"` or `"3w • Edited"` against
/// `now`. Units: `s`, `m` (minutes), `h`, `d`, `w`, `M`/`mo` (30 days),
/// `y` (365 days).
pub fn parse_relative_timestamp(raw: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let pattern = RELATIVE_PATTERN.as_ref()?;
    let captures = pattern.captures(raw)?;
    let magnitude: i64 = captures.get(1)?.as_str().parse().ok()?;
    let unit_seconds = match captures.get(2)?.as_str() {
        "s" => 1,
        "m" => MINUTE,
        "h" => HOUR,
        "d" => DAY,
        "w" => 7 * DAY,
        "M" | "mo" => 30 * DAY,
        "y" => 365 * DAY,
        _ => return None,
    };
    let delta = TimeDelta::try_seconds(magnitude.checked_mul(unit_seconds)?)?;
    now.checked_sub_signed(delta)
}

/// Absolute forms first; relative ages only when `allow_relative` is set.
pub(crate) fn parse_timestamp(
    raw: &str,
    allow_relative: bool,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    parse_absolute_timestamp(raw).or_else(|| {
        if allow_relative {
            parse_relative_timestamp(raw, now)
        } else {
            None
        }
    })
}
