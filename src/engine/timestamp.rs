//! Best-effort parsing of producer-written timestamps.
//!
//! Producers write `updated_at` in whatever shape their runtime emits. A value
//! that matches none of the known shapes yields `None`; callers treat that as
//! "unknown duration", never as an error.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};

/// Naive layouts, interpreted as UTC.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
];

pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    // Python-style isoformat with an explicit offset but a space separator.
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }
    // Unix epoch seconds, possibly fractional.
    if let Ok(secs) = s.parse::<f64>() {
        if secs.is_finite() && secs >= 0.0 {
            let whole = secs.trunc() as i64;
            let nanos = ((secs.fract()) * 1e9) as u32;
            return Utc.timestamp_opt(whole, nanos).single();
        }
    }
    None
}

/// Time elapsed between `raw` and `now`. `None` when `raw` is unparsable.
/// Timestamps in the future count as zero elapsed.
pub fn elapsed_since(raw: &str, now: DateTime<Utc>) -> Option<chrono::Duration> {
    parse_timestamp(raw).map(|then| (now - then).max(chrono::Duration::zero()))
}
