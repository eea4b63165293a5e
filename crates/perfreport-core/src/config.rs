use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ReportError;

pub const DEFAULT_RESOURCE_LOG: &str = "sar_metrics.csv";
pub const DEFAULT_LOAD_TEST_LOG: &str = "results/jmeter_raw_results.jtl";
pub const DEFAULT_OUTPUT: &str = "combined_report.html";
pub const DEFAULT_TITLE: &str = "Combined Performance Test Report";

// ---------------------------------------------------------------------------
// ResourceColumns
// ---------------------------------------------------------------------------

/// Positional layout of the semicolon-separated resource log.
///
/// The defaults match `sadf -d` output for `sar -u`:
/// `hostname;interval;timestamp;CPU;%user;%nice;%system;%iowait;%steal;%idle`.
/// Positions are trusted as-is; nothing checks them against a header line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct ResourceColumns {
    /// Leading non-tabular lines to discard.
    pub header_lines: usize,
    pub delimiter: char,
    pub timestamp: usize,
    pub resource_kind: usize,
    pub user_pct: usize,
    pub system_pct: usize,
    /// Single percentage column used when the user/system pair is unusable.
    pub fallback_pct: usize,
}

impl Default for ResourceColumns {
    fn default() -> Self {
        Self {
            header_lines: 2,
            delimiter: ';',
            timestamp: 2,
            resource_kind: 3,
            user_pct: 4,
            system_pct: 6,
            fallback_pct: 6,
        }
    }
}

// ---------------------------------------------------------------------------
// ReportConfig
// ---------------------------------------------------------------------------

/// Everything a single report run needs to know.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ReportConfig {
    #[serde(default = "default_resource_log_path")]
    pub resource_log_path: PathBuf,
    #[serde(default = "default_load_test_log_path")]
    pub load_test_log_path: PathBuf,
    #[serde(default = "default_output_path")]
    pub output_path: PathBuf,
    /// Create the load-test log directory and the output directory if absent.
    #[serde(default = "default_true")]
    pub output_directory_precreate: bool,
    #[serde(default)]
    pub resource_columns: ResourceColumns,
    #[serde(default = "default_title")]
    pub title: String,
    /// When set, the summary statistics are also written here as JSON.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary_json_path: Option<PathBuf>,
}

fn default_resource_log_path() -> PathBuf {
    PathBuf::from(DEFAULT_RESOURCE_LOG)
}

fn default_load_test_log_path() -> PathBuf {
    PathBuf::from(DEFAULT_LOAD_TEST_LOG)
}

fn default_output_path() -> PathBuf {
    PathBuf::from(DEFAULT_OUTPUT)
}

fn default_true() -> bool {
    true
}

fn default_title() -> String {
    DEFAULT_TITLE.to_string()
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            resource_log_path: default_resource_log_path(),
            load_test_log_path: default_load_test_log_path(),
            output_path: default_output_path(),
            output_directory_precreate: true,
            resource_columns: ResourceColumns::default(),
            title: default_title(),
            summary_json_path: None,
        }
    }
}

impl ReportConfig {
    /// Read a JSON config file. Missing fields take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ReportError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: ReportConfig = serde_json::from_str(&content)?;
        Ok(config)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
