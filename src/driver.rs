//! The region-at-a-time audit pipeline.

use std::io::{self, Write};

use tracing::info;

use crate::aggregator::aggregate_metrics;
use crate::capability::{RegionLister, RegionalClients};
use crate::collector::{collect_instances, CollectOutcome};
use crate::error::AuditError;
use crate::inventory::RegionInstances;
use crate::regions::list_regions;
use crate::report::{rows_for, ReportSink};
use crate::window::MetricWindow;

/// How processing of one region ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionOutcome {
    /// Rows were written for this many instances.
    Emitted(usize),
    /// The region has no instances.
    SkippedEmpty,
    /// Listing instances was denied.
    SkippedUnauthorized,
}

/// Per-region results of a completed run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditSummary {
    pub regions: Vec<(String, RegionOutcome)>,
}

impl AuditSummary {
    /// Total rows handed to the sink.
    pub fn rows_emitted(&self) -> usize {
        self.regions
            .iter()
            .map(|(_, outcome)| match outcome {
                RegionOutcome::Emitted(n) => *n,
                _ => 0,
            })
            .sum()
    }

    /// Number of regions skipped for lack of permission.
    pub fn unauthorized_regions(&self) -> usize {
        self.regions
            .iter()
            .filter(|(_, o)| *o == RegionOutcome::SkippedUnauthorized)
            .count()
    }
}

/// Runs the audit against a set of capabilities.
///
/// Regions are processed strictly one after another. Operator banners are
/// written to `progress` (stdout by default).
pub struct Auditor<'a> {
    regions: &'a dyn RegionLister,
    clients: &'a dyn RegionalClients,
    window: MetricWindow,
    progress: Box<dyn Write + Send + 'a>,
}

impl<'a> Auditor<'a> {
    pub fn new(
        regions: &'a dyn RegionLister,
        clients: &'a dyn RegionalClients,
        window: MetricWindow,
    ) -> Self {
        Self {
            regions,
            clients,
            window,
            progress: Box::new(io::stdout()),
        }
    }

    /// Send operator banners somewhere other than stdout.
    pub fn with_progress(mut self, progress: impl Write + Send + 'a) -> Self {
        self.progress = Box::new(progress);
        self
    }

    /// Audit every region and write rows to `sink`.
    ///
    /// The sink is flushed after each emitted region, so rows of earlier
    /// regions survive a fatal error in a later one.
    ///
    /// # Errors
    ///
    /// Region discovery failures, non-authorization listing failures, metric
    /// query failures and sink failures end the run.
    pub async fn run(&mut self, sink: &mut dyn ReportSink) -> Result<AuditSummary, AuditError> {
        let regions = list_regions(self.regions).await?;
        let mut summary = AuditSummary::default();

        for region in regions {
            let outcome = self.audit_region(&region, sink).await?;
            summary.regions.push((region, outcome));
        }

        Ok(summary)
    }

    async fn audit_region(
        &mut self,
        region: &str,
        sink: &mut dyn ReportSink,
    ) -> Result<RegionOutcome, AuditError> {
        writeln!(self.progress, "=========== {} ===========", region)?;

        let mut instances = RegionInstances::new(region);
        let mut pager = self.clients.instance_pager(region);
        if let CollectOutcome::Unauthorized(_) =
            collect_instances(&mut instances, pager.as_mut()).await?
        {
            return Ok(RegionOutcome::SkippedUnauthorized);
        }

        if instances.is_empty() {
            info!(region, "no ec2 instances found");
            return Ok(RegionOutcome::SkippedEmpty);
        }

        let metrics = self.clients.metric_source(region);
        aggregate_metrics(&mut instances, metrics.as_ref(), &self.window).await?;

        writeln!(
            self.progress,
            "====================== {} instances with metadatanotoken metric greater than 0 ======================",
            region
        )?;
        for instance in instances.offenders() {
            writeln!(
                self.progress,
                "Instance Id: {} | MetadataNoToken Calls: {}",
                instance.instance_id(),
                instance.no_token_calls()
            )?;
        }

        let mut emitted = 0;
        for row in rows_for(&instances) {
            sink.write_row(&row)?;
            emitted += 1;
        }
        sink.flush()?;

        Ok(RegionOutcome::Emitted(emitted))
    }
}
