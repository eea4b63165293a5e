use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::ResourceColumns;
use crate::error::ReportError;
use crate::timestamp::parse_timestamp;

/// `resource_kind` value of the rows that feed the CPU chart.
pub const CPU_KIND: &str = "CPU";

// ---------------------------------------------------------------------------
// ResourceSample
// ---------------------------------------------------------------------------

/// One row of the resource log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ResourceSample {
    pub timestamp: DateTime<Utc>,
    /// e.g. `CPU`, `MEM`, `DISK`.
    pub resource_kind: String,
    /// `None` when the column is absent or not numeric.
    pub user_pct: Option<f64>,
    pub system_pct: Option<f64>,
    pub fallback_pct: Option<f64>,
}

impl ResourceSample {
    /// `%user + %system`, or the fallback column when either half is unusable.
    pub fn cpu_usage(&self) -> Option<f64> {
        match (self.user_pct, self.system_pct) {
            (Some(user), Some(system)) => Some(user + system),
            _ => self.fallback_pct,
        }
    }

    fn uses_fallback(&self) -> bool {
        self.user_pct.is_none() || self.system_pct.is_none()
    }
}

/// A single point of the CPU usage chart.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CpuUsagePoint {
    pub timestamp: DateTime<Utc>,
    pub cpu_usage: f64,
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Read and parse a resource log from disk.
pub fn parse_resource_log(
    path: impl AsRef<Path>,
    columns: &ResourceColumns,
) -> Result<Vec<ResourceSample>, ReportError> {
    let content = std::fs::read_to_string(path.as_ref())?;
    parse_resource_log_str(&content, columns)
}

/// Parse resource log content.
///
/// The first `columns.header_lines` lines are discarded, the rest is split on
/// `columns.delimiter` with every field trimmed. Any row with a missing
/// positional column or an unparseable timestamp fails the whole parse.
pub fn parse_resource_log_str(
    content: &str,
    columns: &ResourceColumns,
) -> Result<Vec<ResourceSample>, ReportError> {
    let delimiter = u8::try_from(columns.delimiter).map_err(|_| {
        ReportError::InvalidValue(format!(
            "delimiter '{}' is not a single-byte character",
            columns.delimiter
        ))
    })?;

    let body = skip_lines(content, columns.header_lines);
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(body.as_bytes());

    let mut samples = Vec::new();
    for result in reader.records() {
        let record = result?;
        let line = record
            .position()
            .map(|p| p.line() as usize + columns.header_lines)
            .unwrap_or(0);

        let raw_timestamp = field(&record, columns.timestamp, "timestamp", line)?;
        let timestamp = parse_timestamp(raw_timestamp)
            .map_err(|_| ReportError::Timestamp(format!("'{raw_timestamp}' on line {line}")))?;
        let resource_kind =
            field(&record, columns.resource_kind, "resource kind", line)?.to_string();

        samples.push(ResourceSample {
            timestamp,
            resource_kind,
            user_pct: parse_percentage(record.get(columns.user_pct)),
            system_pct: parse_percentage(record.get(columns.system_pct)),
            fallback_pct: parse_percentage(record.get(columns.fallback_pct)),
        });
    }

    tracing::debug!(rows = samples.len(), "parsed resource log");
    Ok(samples)
}

/// Keep the `CPU` rows and derive their usage, in file order.
///
/// Fails if a CPU row has neither a usable user/system pair nor a usable
/// fallback column.
pub fn cpu_usage_series(samples: &[ResourceSample]) -> Result<Vec<CpuUsagePoint>, ReportError> {
    let mut degraded = 0usize;
    let mut points = Vec::new();

    for sample in samples.iter().filter(|s| s.resource_kind == CPU_KIND) {
        let cpu_usage = sample.cpu_usage().ok_or_else(|| {
            ReportError::InvalidValue(format!(
                "CPU row at {} has no numeric usage columns",
                sample.timestamp
            ))
        })?;
        if sample.uses_fallback() {
            degraded += 1;
        }
        points.push(CpuUsagePoint {
            timestamp: sample.timestamp,
            cpu_usage,
        });
    }

    if degraded > 0 {
        tracing::warn!(
            rows = degraded,
            "user/system columns unusable, CPU usage estimated from fallback column"
        );
    }
    Ok(points)
}

/// Parse the resource log and reduce it to the CPU usage series.
pub fn load_cpu_usage(
    path: impl AsRef<Path>,
    columns: &ResourceColumns,
) -> Result<Vec<CpuUsagePoint>, ReportError> {
    let samples = parse_resource_log(path, columns)?;
    cpu_usage_series(&samples)
}

fn field<'r>(
    record: &'r csv::StringRecord,
    idx: usize,
    name: &str,
    line: usize,
) -> Result<&'r str, ReportError> {
    record.get(idx).ok_or_else(|| {
        ReportError::MissingColumn(format!("{name} (position {idx}) on line {line}"))
    })
}

fn skip_lines(content: &str, count: usize) -> &str {
    if count == 0 {
        return content;
    }
    content.splitn(count + 1, '\n').nth(count).unwrap_or("")
}

fn parse_percentage(raw: Option<&str>) -> Option<f64> {
    let value = raw?.trim();
    if value.is_empty() {
        return None;
    }
    value
        .parse::<f64>()
        .or_else(|_| value.replace(',', ".").parse::<f64>())
        .ok()
        .filter(|v| v.is_finite())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
