//! Audit EC2 instances in every accessible region for token-less instance
//! metadata (IMDSv1) calls.
//!
//! The audit runs in three stages per region:
//!
//! - list all regions visible to the caller (once per run)
//! - drain the paginated instance listing of a region
//! - sum the CloudWatch `MetadataNoToken` metric for every instance
//!
//! and writes one report row per instance: region, instance id and the
//! call count over the queried window.
//!
//! # Example
//!
//! ```ignore
//! use imds_audit::providers::aws;
//! use imds_audit::{AuditConfig, Auditor, CsvSink, MetricWindow};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), imds_audit::AuditError> {
//!     let config = AuditConfig::default();
//!     let clients = aws::connect(&config).await?;
//!     let lister = clients.region_lister();
//!     let window = MetricWindow::ending_now(config.lookback(), config.period());
//!
//!     let mut sink = CsvSink::new(std::fs::File::create(config.output())?)?;
//!     let summary = Auditor::new(&lister, &clients, window).run(&mut sink).await?;
//!     println!("{} rows", summary.rows_emitted());
//!     Ok(())
//! }
//! ```
//!
//! # Failure Handling
//!
//! | Condition | Effect |
//! |-----------|--------|
//! | Region listing fails | Run ends |
//! | Instance listing denied (`UnauthorizedOperation`) | Region skipped |
//! | Any other instance listing failure | Run ends |
//! | Region has no instances | Region skipped |
//! | Metric query fails | Run ends |
//!
//! Rows written for earlier regions are flushed before the next region
//! starts, so a failed run still leaves a usable partial report.

mod aggregator;
mod collector;
mod config;
mod driver;
mod error;
mod inventory;
mod regions;
mod report;
mod window;

pub mod capability;
pub mod providers;

pub use aggregator::aggregate_metrics;
pub use collector::{collect_instances, CollectOutcome};
pub use config::{
    AuditConfig, DEFAULT_BOOTSTRAP_REGION, DEFAULT_LOOKBACK, DEFAULT_OUTPUT, DEFAULT_PERIOD,
    INSTANCE_ID_DIMENSION, METRIC_NAME, METRIC_NAMESPACE,
};
pub use driver::{AuditSummary, Auditor, RegionOutcome};
pub use error::{ApiError, AuditError, PageError, UNAUTHORIZED_CODE};
pub use inventory::{InstanceRecord, RegionInstances};
pub use regions::list_regions;
pub use report::{
    open_sink, rows_for, CsvSink, JsonLinesSink, ReportFormat, ReportRow, ReportSink, CSV_HEADER,
};
pub use window::MetricWindow;
