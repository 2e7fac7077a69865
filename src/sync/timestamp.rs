//! Snapshot timestamp normalisation
//!
//! Uploaded snapshots carry a top-level `timestamp` in local time formatted
//! as `YYYY-MM-DD HH:MM:SS`. A falsy top-level value is backfilled from
//! `snapshot.ts`; records without a parsable timestamp are dropped.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde_json::Value;

use crate::models::{is_truthy, Snapshot};

/// Output format of normalised timestamps
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

const OFFSET_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%d %H:%M:%S%.f%z"];

/// Parse a raw timestamp value
///
/// Strings may be RFC 3339, RFC 2822, a naive date-time (local time) or a
/// bare date (UTC midnight). Numbers are epoch milliseconds.
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Local>> {
    match value {
        Value::String(s) => parse_str(s.trim()),
        Value::Number(n) => {
            let millis = n.as_i64().or_else(|| {
                n.as_f64()
                    .filter(|f| f.is_finite())
                    .map(|f| f.trunc() as i64)
            })?;
            Utc.timestamp_millis_opt(millis)
                .single()
                .map(|dt| dt.with_timezone(&Local))
        }
        _ => None,
    }
}

fn parse_str(s: &str) -> Option<DateTime<Local>> {
    if s.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Local));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Local));
    }
    for format in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(s, format) {
            return Some(dt.with_timezone(&Local));
        }
    }
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
            // Nonexistent local times (DST gaps) are unparsable
            return Local.from_local_datetime(&naive).earliest();
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive).with_timezone(&Local))
}

/// Format a timestamp in the upload format
pub fn format_timestamp(dt: &DateTime<Local>) -> String {
    dt.format(TIMESTAMP_FORMAT).to_string()
}

/// Produce a normalised copy of `snapshot`, or `None` if it has no usable timestamp
pub fn normalize_snapshot(snapshot: &Snapshot) -> Option<Snapshot> {
    let raw = snapshot
        .timestamp()
        .filter(|v| is_truthy(v))
        .or_else(|| snapshot.inner_timestamp().filter(|v| is_truthy(v)))?;
    let parsed = parse_timestamp(raw)?;
    Some(snapshot.with_timestamp(format_timestamp(&parsed)))
}

/// Result of normalising a bucket
#[derive(Debug, Clone, Default)]
pub struct Normalized {
    /// Records that survived, in input order
    pub snapshots: Vec<Snapshot>,
    /// Number of records dropped for a missing or unparsable timestamp
    pub dropped: usize,
}

/// Normalise every record of a bucket
pub fn normalize_all(snapshots: &[Snapshot]) -> Normalized {
    let mut out = Normalized::default();
    for snapshot in snapshots {
        match normalize_snapshot(snapshot) {
            Some(normalized) => out.snapshots.push(normalized),
            None => out.dropped += 1,
        }
    }
    out
}
