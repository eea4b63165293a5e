use serde::{Deserialize, Serialize};

use crate::error::ReportError;
use crate::load_test::LoadTestSample;

// ---------------------------------------------------------------------------
// Percentile helpers
// ---------------------------------------------------------------------------

/// Linear-interpolation percentile over an ascending slice.
///
/// `p` is in `[0.0, 100.0]`. The rank is `p / 100 * (n - 1)` and the result
/// interpolates between the two neighbouring values. Returns `None` for an
/// empty slice.
pub fn percentile(sorted: &[f64], p: f64) -> Option<f64> {
    let last = sorted.len().checked_sub(1)?;
    let rank = (p.clamp(0.0, 100.0) / 100.0) * last as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

pub fn median(sorted: &[f64]) -> Option<f64> {
    percentile(sorted, 50.0)
}

pub fn p90(sorted: &[f64]) -> Option<f64> {
    percentile(sorted, 90.0)
}

pub fn p95(sorted: &[f64]) -> Option<f64> {
    percentile(sorted, 95.0)
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

// ---------------------------------------------------------------------------
// SummaryStatistics
// ---------------------------------------------------------------------------

/// Aggregate latency figures for a set of load-test samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SummaryStatistics {
    pub samples: u64,
    pub mean_latency: f64,
    pub median_latency: f64,
    pub p90_latency: f64,
    pub p95_latency: f64,
    pub min_latency: f64,
    pub max_latency: f64,
    /// Rows whose `success` column was literally `false`.
    pub error_count: u64,
    /// `error_count / samples`, in `[0, 1]`.
    pub error_rate: f64,
}

impl SummaryStatistics {
    /// Summarise every sample. Fails on an empty slice.
    pub fn from_samples(samples: &[LoadTestSample]) -> Result<Self, ReportError> {
        let latencies: Vec<f64> = samples.iter().map(|s| s.elapsed_ms).collect();
        let error_count = samples.iter().filter(|s| s.is_error()).count() as u64;
        Self::from_latencies(latencies, error_count)
    }

    fn from_latencies(mut latencies: Vec<f64>, error_count: u64) -> Result<Self, ReportError> {
        if latencies.is_empty() {
            return Err(ReportError::NoData(
                "load-test log contains no samples".to_string(),
            ));
        }
        latencies.sort_by(f64::total_cmp);

        let samples = latencies.len() as u64;
        let stat = |value: Option<f64>| value.unwrap_or(0.0);

        Ok(Self {
            samples,
            mean_latency: stat(mean(&latencies)),
            median_latency: stat(median(&latencies)),
            p90_latency: stat(p90(&latencies)),
            p95_latency: stat(p95(&latencies)),
            min_latency: latencies[0],
            max_latency: latencies[latencies.len() - 1],
            error_count,
            error_rate: error_count as f64 / samples as f64,
        })
    }
}

// ---------------------------------------------------------------------------
// LabelSummary
// ---------------------------------------------------------------------------

/// Statistics for one request label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LabelSummary {
    pub label: String,
    pub statistics: SummaryStatistics,
}

/// Group samples by `label` in first-seen order. Unlabelled samples are only
/// counted in the overall summary.
pub fn summarize_by_label(samples: &[LoadTestSample]) -> Vec<LabelSummary> {
    let mut groups: Vec<(&str, Vec<f64>, u64)> = Vec::new();

    for sample in samples {
        let Some(label) = sample.label.as_deref() else {
            continue;
        };
        let idx = match groups.iter().position(|(l, _, _)| *l == label) {
            Some(idx) => idx,
            None => {
                groups.push((label, Vec::new(), 0));
                groups.len() - 1
            }
        };
        let group = &mut groups[idx];
        group.1.push(sample.elapsed_ms);
        if sample.is_error() {
            group.2 += 1;
        }
    }

    groups
        .into_iter()
        .filter_map(|(label, latencies, errors)| {
            SummaryStatistics::from_latencies(latencies, errors)
                .ok()
                .map(|statistics| LabelSummary {
                    label: label.to_string(),
                    statistics,
                })
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
