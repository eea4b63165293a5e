pub mod chart;
pub mod config;
pub mod error;
pub mod report;
pub mod resource;
pub mod stats;
pub mod timestamp;

pub use config::{ReportConfig, ResourceColumns};
pub use error::ReportError;
pub use report::{generate_report, ReportOutcome, StageStatus};
