use chrono::{DateTime, NaiveDateTime, Utc};

use crate::error::ReportError;

/// Naive layouts accepted for resource-log timestamps, tried in order.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S",
];

/// Parse a timestamp as written by `sadf -d`.
///
/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS` with an optional trailing ` UTC`
/// (naive values are taken as UTC) and bare epoch seconds (`sadf -U`).
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, ReportError> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(ReportError::Timestamp("empty value".to_string()));
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }

    let naive = value.strip_suffix("UTC").map(str::trim_end).unwrap_or(value);
    for fmt in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(naive, fmt) {
            return Ok(dt.and_utc());
        }
    }

    if let Ok(secs) = value.parse::<i64>() {
        if let Some(dt) = DateTime::from_timestamp(secs, 0) {
            return Ok(dt);
        }
    }

    Err(ReportError::Timestamp(value.to_string()))
}

/// Convert a JMeter `timeStamp` (milliseconds since the epoch).
pub fn from_epoch_millis(raw: &str) -> Result<DateTime<Utc>, ReportError> {
    let value = raw.trim();
    let millis: i64 = value
        .parse()
        .map_err(|_| ReportError::Timestamp(value.to_string()))?;
    DateTime::from_timestamp_millis(millis).ok_or_else(|| ReportError::Timestamp(value.to_string()))
}
