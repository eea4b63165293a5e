mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use perfreport_core::{generate_report, ReportConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = cli::Args::parse();

    let base = match &args.config {
        Some(path) => ReportConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => ReportConfig::default(),
    };
    let config = args.apply(base);

    let outcome = generate_report(&config)
        .with_context(|| format!("failed to write report {}", config.output_path.display()))?;

    if !outcome.resource_log.is_ok() || !outcome.load_test_log.is_ok() {
        tracing::warn!(
            resource_log = ?outcome.resource_log,
            load_test_log = ?outcome.load_test_log,
            "report generated with degraded sections"
        );
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    }

    Ok(())
}
