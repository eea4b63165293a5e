use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::chart::{render_line_chart, ChartSpec};
use crate::config::ReportConfig;
use crate::error::ReportError;
use crate::load_test::parse_load_test_log;
use crate::resource::load_cpu_usage;
use crate::stats::{summarize_by_label, LabelSummary, SummaryStatistics};

pub const BOOTSTRAP_CDN: &str =
    "https://cdn.jsdelivr.net/npm/bootstrap@4.5.3/dist/css/bootstrap.min.css";

// ---------------------------------------------------------------------------
// Outcome types
// ---------------------------------------------------------------------------

/// How one input domain fared during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "message", rename_all = "snake_case")]
pub enum StageStatus {
    Ok,
    /// The domain failed; the report shows this message instead of its data.
    Degraded(String),
}

impl StageStatus {
    pub fn is_ok(&self) -> bool {
        matches!(self, StageStatus::Ok)
    }
}

/// Result of [`generate_report`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ReportOutcome {
    pub output_path: PathBuf,
    pub resource_log: StageStatus,
    pub load_test_log: StageStatus,
}

/// Shape of the optional JSON summary export.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct SummaryExport {
    pub overall: SummaryStatistics,
    #[serde(default)]
    pub by_label: Vec<LabelSummary>,
}

/// Pre-rendered pieces of the final document.
#[derive(Debug, Clone)]
pub struct ReportSections {
    pub title: String,
    pub generated_at: DateTime<Utc>,
    pub summary_html: String,
    pub latency_html: String,
    pub cpu_html: String,
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Run the whole pipeline and write the report.
///
/// Each input domain is isolated: a broken resource log or load-test log is
/// logged and replaced by an inline error message, and the report is written
/// regardless. Only directory creation and the final writes can fail the run.
pub fn generate_report(config: &ReportConfig) -> Result<ReportOutcome, ReportError> {
    if config.output_directory_precreate {
        ensure_parent_dir(&config.load_test_log_path)?;
    }

    tracing::info!(path = %config.resource_log_path.display(), "processing resource log");
    let (cpu_html, resource_status) = match resource_section(config) {
        Ok(html) => (html, StageStatus::Ok),
        Err(e) => {
            tracing::error!("Error processing resource log: {e}");
            (
                error_block("Error processing resource log", &e),
                StageStatus::Degraded(e.to_string()),
            )
        }
    };

    tracing::info!(path = %config.load_test_log_path.display(), "processing load-test log");
    let (summary_html, latency_html, export, load_test_status) = match load_test_section(config)
    {
        Ok(section) => (
            section.summary_html,
            section.latency_html,
            Some(section.export),
            StageStatus::Ok,
        ),
        Err(e) => {
            tracing::error!("Error processing load-test log: {e}");
            (
                "<p class=\"text-danger\">Load-test summary not available.</p>".to_string(),
                error_block("Error processing load-test log", &e),
                None,
                StageStatus::Degraded(e.to_string()),
            )
        }
    };

    let sections = ReportSections {
        title: config.title.clone(),
        generated_at: Utc::now(),
        summary_html,
        latency_html,
        cpu_html,
    };
    let html = assemble_report(&sections);
    write_report(&config.output_path, &html, config.output_directory_precreate)?;
    tracing::info!(path = %config.output_path.display(), "combined HTML report generated");

    if let Some(json_path) = &config.summary_json_path {
        match &export {
            Some(export) => {
                write_summary_json(json_path, export, config.output_directory_precreate)?;
                tracing::info!(path = %json_path.display(), "summary JSON written");
            }
            None => tracing::warn!(
                path = %json_path.display(),
                "load-test log unavailable, summary JSON not written"
            ),
        }
    }

    Ok(ReportOutcome {
        output_path: config.output_path.clone(),
        resource_log: resource_status,
        load_test_log: load_test_status,
    })
}

fn resource_section(config: &ReportConfig) -> Result<String, ReportError> {
    let points = load_cpu_usage(&config.resource_log_path, &config.resource_columns)?;
    if points.is_empty() {
        return Err(ReportError::NoData(
            "resource log contains no CPU rows".to_string(),
        ));
    }
    let series: Vec<_> = points.iter().map(|p| (p.timestamp, p.cpu_usage)).collect();
    Ok(render_line_chart(&series, &ChartSpec::cpu_usage()))
}

struct LoadTestSection {
    summary_html: String,
    latency_html: String,
    export: SummaryExport,
}

fn load_test_section(config: &ReportConfig) -> Result<LoadTestSection, ReportError> {
    let samples = parse_load_test_log(&config.load_test_log_path)?;
    let overall = SummaryStatistics::from_samples(&samples)?;
    let by_label = summarize_by_label(&samples);

    let series: Vec<_> = samples.iter().map(|s| (s.timestamp, s.elapsed_ms)).collect();
    Ok(LoadTestSection {
        summary_html: summary_table_html(&overall, &by_label),
        latency_html: render_line_chart(&series, &ChartSpec::latency()),
        export: SummaryExport { overall, by_label },
    })
}

// ---------------------------------------------------------------------------
// HTML
// ---------------------------------------------------------------------------

/// Render the summary statistics as a Bootstrap table.
///
/// The first row covers every sample; one row per label follows.
pub fn summary_table_html(overall: &SummaryStatistics, by_label: &[LabelSummary]) -> String {
    let mut rows = vec![summary_row("All samples", overall)];
    rows.extend(by_label.iter().map(|l| summary_row(&l.label, &l.statistics)));

    format!(
        r#"<table class="table table-striped">
  <thead>
    <tr>
      <th>Label</th><th>Samples</th><th>Mean (ms)</th><th>Median (ms)</th>
      <th>P90 (ms)</th><th>P95 (ms)</th><th>Min (ms)</th><th>Max (ms)</th>
      <th>Errors</th><th>Error Rate</th>
    </tr>
  </thead>
  <tbody>
{rows}
  </tbody>
</table>"#,
        rows = rows.join("\n"),
    )
}

fn summary_row(label: &str, s: &SummaryStatistics) -> String {
    format!(
        "    <tr><th>{}</th><td>{}</td><td>{:.2}</td><td>{:.2}</td><td>{:.2}</td>\
         <td>{:.2}</td><td>{:.2}</td><td>{:.2}</td><td>{}</td><td>{:.2}%</td></tr>",
        html_escape(label),
        s.samples,
        s.mean_latency,
        s.median_latency,
        s.p90_latency,
        s.p95_latency,
        s.min_latency,
        s.max_latency,
        s.error_count,
        s.error_rate * 100.0,
    )
}

/// Inline replacement for a section whose input could not be processed.
pub fn error_block(heading: &str, err: &ReportError) -> String {
    format!(
        "<div class=\"alert alert-danger\" role=\"alert\">\n  <h4>{}:</h4>\n  <p>{}</p>\n</div>",
        html_escape(heading),
        html_escape(&err.to_string()),
    )
}

/// Build the full document: title, summary table, latency chart, CPU chart.
pub fn assemble_report(sections: &ReportSections) -> String {
    let generated = sections
        .generated_at
        .to_rfc3339_opts(SecondsFormat::Secs, true);

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>{title}</title>
<link rel="stylesheet" href="{bootstrap}">
</head>
<body>
<div class="container">
  <h1 class="mt-4">{title}</h1>
  <p class="text-muted">Generated {generated}</p>

  <hr>

  <h2>Load-Test Summary (JMeter)</h2>
{summary}

  <hr>

  <h2>Response Times (JMeter)</h2>
{latency}

  <hr>

  <h2>Resource Usage (sar)</h2>
  <p>Server monitoring during the test.</p>
{cpu}

</div>
</body>
</html>
"#,
        title = html_escape(&sections.title),
        bootstrap = BOOTSTRAP_CDN,
        generated = generated,
        summary = sections.summary_html,
        latency = sections.latency_html,
        cpu = sections.cpu_html,
    )
}

pub(crate) fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// Write the report, truncating any existing file.
///
/// The file handle lives only for the duration of this call. The write is not
/// atomic: a crash midway can leave a truncated file behind.
pub fn write_report(
    path: impl AsRef<Path>,
    html: &str,
    precreate_parent: bool,
) -> Result<(), ReportError> {
    let path = path.as_ref();
    if precreate_parent {
        ensure_parent_dir(path)?;
    }
    let mut writer = BufWriter::new(File::create(path)?);
    writer.write_all(html.as_bytes())?;
    writer.flush()?;
    Ok(())
}

/// Write the summary statistics as pretty-printed JSON.
pub fn write_summary_json(
    path: impl AsRef<Path>,
    export: &SummaryExport,
    precreate_parent: bool,
) -> Result<(), ReportError> {
    let content = serde_json::to_string_pretty(export)?;
    write_report(path, &content, precreate_parent)
}

fn ensure_parent_dir(path: &Path) -> Result<(), ReportError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            std::fs::create_dir_all(parent)?;
            Ok(())
        }
        _ => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ResourceColumns;

    const SAR_LOG: &str = "Linux 6.1.0 (web-01) \t03/01/2024\n\
                           # hostname;interval;timestamp;CPU;%user;%nice;%system;%iowait;%steal;%idle\n\
                           web-01;1;2024-03-01 10:00:00 UTC;CPU;10.0;0.0;5.0;0.0;0.0;85.0\n\
                           web-01;1;2024-03-01 10:00:01 UTC;CPU;20.0;0.0;5.0;0.0;0.0;75.0\n";

    const JTL_LOG: &str = "timeStamp,elapsed,label,responseCode,success\n\
                           1709287200000,100,Login,200,true\n\
                           1709287200100,200,Home,200,true\n\
                           1709287200200,300,Login,500,false\n\
                           1709287200300,400,Home,200,true\n\
                           1709287200400,500,Home,200,true\n";

    struct Fixture {
        _dir: tempfile::TempDir,
        config: ReportConfig,
    }

    fn fixture(sar: Option<&str>, jtl: Option<&str>) -> Fixture {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let config = ReportConfig {
            resource_log_path: dir.path().join("sar_metrics.csv"),
            load_test_log_path: dir.path().join("results").join("jmeter_raw_results.jtl"),
            output_path: dir.path().join("combined_report.html"),
            output_directory_precreate: true,
            resource_columns: ResourceColumns::default(),
            title: "Nightly Run".to_string(),
            summary_json_path: None,
        };
        if let Some(content) = sar {
            std::fs::write(&config.resource_log_path, content).expect("write sar");
        }
        if let Some(content) = jtl {
            std::fs::create_dir_all(dir.path().join("results")).expect("mkdir results");
            std::fs::write(&config.load_test_log_path, content).expect("write jtl");
        }
        Fixture { _dir: dir, config }
    }

    fn read_output(config: &ReportConfig) -> String {
        std::fs::read_to_string(&config.output_path).expect("report should exist")
    }

    fn stats() -> SummaryStatistics {
        SummaryStatistics {
            samples: 5,
            mean_latency: 300.0,
            median_latency: 300.0,
            p90_latency: 460.0,
            p95_latency: 480.0,
            min_latency: 100.0,
            max_latency: 500.0,
            error_count: 1,
            error_rate: 0.2,
        }
    }

    // -----------------------------------------------------------------------
    // html_escape
    // -----------------------------------------------------------------------

    #[test]
    fn html_escape_combined() {
        assert_eq!(
            html_escape("<a href=\"url\">A & B</a>"),
            "&lt;a href=&quot;url&quot;&gt;A &amp; B&lt;/a&gt;"
        );
    }

    #[test]
    fn html_escape_no_special_chars() {
        assert_eq!(html_escape("plain text"), "plain text");
    }

    // -----------------------------------------------------------------------
    // summary_table_html / error_block / assemble_report
    // -----------------------------------------------------------------------

    #[test]
    fn summary_table_has_bootstrap_classes_and_values() {
        let html = summary_table_html(&stats(), &[]);
        assert!(html.contains("class=\"table table-striped\""));
        assert!(html.contains("All samples"));
        assert!(html.contains("<td>300.00</td>"));
        assert!(html.contains("<td>460.00</td>"));
        assert!(html.contains("<td>480.00</td>"));
        assert!(html.contains("<td>20.00%</td>"));
    }

    #[test]
    fn summary_table_has_one_row_per_label() {
        let by_label = vec![
            LabelSummary {
                label: "Login <POST>".to_string(),
                statistics: stats(),
            },
            LabelSummary {
                label: "Home".to_string(),
                statistics: stats(),
            },
        ];
        let html = summary_table_html(&stats(), &by_label);
        assert_eq!(html.matches("<tr><th>").count(), 3);
        assert!(html.contains("Login &lt;POST&gt;"));
    }

    #[test]
    fn error_block_escapes_message() {
        let err = ReportError::InvalidValue("elapsed = '<script>'".to_string());
        let html = error_block("Error processing load-test log", &err);
        assert!(html.contains("alert-danger"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn assemble_report_keeps_fixed_section_order() {
        let sections = ReportSections {
            title: "T & Co".to_string(),
            generated_at: Utc::now(),
            summary_html: "<!--summary-->".to_string(),
            latency_html: "<!--latency-->".to_string(),
            cpu_html: "<!--cpu-->".to_string(),
        };
        let html = assemble_report(&sections);
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains(BOOTSTRAP_CDN));
        assert!(html.contains("T &amp; Co"));
        let title = html.find("<h1").expect("title");
        let summary = html.find("<!--summary-->").expect("summary");
        let latency = html.find("<!--latency-->").expect("latency");
        let cpu = html.find("<!--cpu-->").expect("cpu");
        assert!(title < summary && summary < latency && latency < cpu);
    }

    // -----------------------------------------------------------------------
    // write_report
    // -----------------------------------------------------------------------

    #[test]
    fn write_report_overwrites_existing_file() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let path = dir.path().join("report.html");
        std::fs::write(&path, "old content that is longer than the new one")
            .expect("write should succeed");
        write_report(&path, "new", false).expect("write_report should succeed");
        assert_eq!(std::fs::read_to_string(&path).expect("readable"), "new");
    }

    #[test]
    fn write_report_creates_parent_when_asked() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let path = dir.path().join("a").join("b").join("report.html");
        write_report(&path, "x", true).expect("write_report should succeed");
        assert!(path.exists());
    }

    #[test]
    fn write_report_without_precreate_fails_on_missing_parent() {
        let dir = tempfile::tempdir().expect("tempdir should be created");
        let path = dir.path().join("missing").join("report.html");
        assert!(matches!(
            write_report(&path, "x", false),
            Err(ReportError::Io(_))
        ));
    }

    // -----------------------------------------------------------------------
    // generate_report
    // -----------------------------------------------------------------------

    #[test]
    fn generate_report_with_valid_inputs() {
        let fx = fixture(Some(SAR_LOG), Some(JTL_LOG));
        let outcome = generate_report(&fx.config).expect("report should be generated");
        assert!(outcome.resource_log.is_ok());
        assert!(outcome.load_test_log.is_ok());

        let html = read_output(&fx.config);
        assert!(html.contains("Nightly Run"));
        assert!(html.contains("table table-striped"));
        assert!(html.contains("latency-chart"));
        assert!(html.contains("cpu-usage-chart"));
        assert!(!html.contains("alert-danger"));
    }

    #[test]
    fn broken_resource_log_degrades_only_cpu_chart() {
        let fx = fixture(None, Some(JTL_LOG));
        let outcome = generate_report(&fx.config).expect("report should be generated");
        assert!(matches!(outcome.resource_log, StageStatus::Degraded(_)));
        assert!(outcome.load_test_log.is_ok());

        let html = read_output(&fx.config);
        assert!(html.contains("Error processing resource log"));
        assert!(!html.contains("cpu-usage-chart"));
        assert!(html.contains("table table-striped"));
        assert!(html.contains("latency-chart"));
    }

    #[test]
    fn broken_load_test_log_degrades_table_and_latency_chart() {
        let fx = fixture(
            Some(SAR_LOG),
            Some("timeStamp,elapsed,success\n1709287200000,fast,true\n"),
        );
        let outcome = generate_report(&fx.config).expect("report should be generated");
        assert!(outcome.resource_log.is_ok());
        assert!(matches!(outcome.load_test_log, StageStatus::Degraded(_)));

        let html = read_output(&fx.config);
        assert!(html.contains("Load-test summary not available."));
        assert!(html.contains("Error processing load-test log"));
        assert!(!html.contains("latency-chart"));
        assert!(!html.contains("table table-striped"));
        assert!(html.contains("cpu-usage-chart"));
    }

    #[test]
    fn both_inputs_missing_still_writes_report() {
        let fx = fixture(None, None);
        let outcome = generate_report(&fx.config).expect("report should be generated");
        assert!(!outcome.resource_log.is_ok());
        assert!(!outcome.load_test_log.is_ok());
        let html = read_output(&fx.config);
        assert_eq!(html.matches("alert-danger").count(), 2);
        // The results directory is created even though the log is absent.
        assert!(fx.config.load_test_log_path.parent().expect("parent").is_dir());
    }

    #[test]
    fn header_only_resource_log_is_reported_not_fatal() {
        let header_only = "Linux 6.1.0 (web-01)\n# hostname;interval;timestamp;CPU;%user\n";
        let fx = fixture(Some(header_only), Some(JTL_LOG));
        let outcome = generate_report(&fx.config).expect("report should be generated");
        match outcome.resource_log {
            StageStatus::Degraded(msg) => assert!(msg.contains("no CPU rows")),
            StageStatus::Ok => panic!("expected degraded resource stage"),
        }
    }

    #[test]
    fn summary_json_is_written_when_configured() {
        let mut fx = fixture(Some(SAR_LOG), Some(JTL_LOG));
        let json_path = fx.config.output_path.with_file_name("summary.json");
        fx.config.summary_json_path = Some(json_path.clone());
        generate_report(&fx.config).expect("report should be generated");

        let content = std::fs::read_to_string(&json_path).expect("summary json should exist");
        let export: SummaryExport = serde_json::from_str(&content).expect("valid json");
        assert_eq!(export.overall.samples, 5);
        assert_eq!(export.overall.error_count, 1);
        assert_eq!(export.by_label.len(), 2);
        assert_eq!(export.by_label[0].label, "Login");
    }

    #[test]
    fn summary_json_skipped_when_load_test_log_fails() {
        let mut fx = fixture(Some(SAR_LOG), None);
        let json_path = fx.config.output_path.with_file_name("summary.json");
        fx.config.summary_json_path = Some(json_path.clone());
        generate_report(&fx.config).expect("report should be generated");
        assert!(!json_path.exists());
    }

    #[test]
    fn stage_status_serializes_with_tag() {
        let json = serde_json::to_string(&StageStatus::Degraded("boom".to_string()))
            .expect("serialize should succeed");
        assert_eq!(json, r#"{"status":"degraded","message":"boom"}"#);
        let ok = serde_json::to_string(&StageStatus::Ok).expect("serialize should succeed");
        assert_eq!(ok, r#"{"status":"ok"}"#);
    }
}
