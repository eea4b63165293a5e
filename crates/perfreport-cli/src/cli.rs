use std::path::PathBuf;

use clap::Parser;
use perfreport_core::ReportConfig;

/// Render a combined sar + JMeter performance report as static HTML.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// JSON config file; flags below override its values
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Resource log written by `sadf -d`
    #[arg(long)]
    pub resource_log: Option<PathBuf>,

    /// JMeter CSV results (.jtl)
    #[arg(long)]
    pub load_test_log: Option<PathBuf>,

    /// Where to write the HTML report
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Also write the summary statistics here as JSON
    #[arg(long)]
    pub summary_json: Option<PathBuf>,

    /// Report heading
    #[arg(long)]
    pub title: Option<String>,

    /// Do not create missing parent directories
    #[arg(long, default_value_t = false)]
    pub no_precreate: bool,

    /// Print the run outcome to stdout as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

impl Args {
    /// Overlay the command-line flags onto a base config.
    pub fn apply(&self, mut config: ReportConfig) -> ReportConfig {
        if let Some(path) = &self.resource_log {
            config.resource_log_path = path.clone();
        }
        if let Some(path) = &self.load_test_log {
            config.load_test_log_path = path.clone();
        }
        if let Some(path) = &self.output {
            config.output_path = path.clone();
        }
        if let Some(path) = &self.summary_json {
            config.summary_json_path = Some(path.clone());
        }
        if let Some(title) = &self.title {
            config.title = title.clone();
        }
        if self.no_precreate {
            config.output_directory_precreate = false;
        }
        config
    }
}
