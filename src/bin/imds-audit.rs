//! CLI binary for the imds-audit crate.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use imds_audit::providers::aws;
use imds_audit::{
    open_sink, AuditConfig, AuditError, AuditSummary, Auditor, MetricWindow, ReportFormat, ReportSink,
    DEFAULT_BOOTSTRAP_REGION, DEFAULT_OUTPUT,
};

const SECS_PER_DAY: u64 = 24 * 60 * 60;

#[derive(Parser, Debug)]
#[command(name = "imds-audit")]
#[command(
    author,
    version,
    about = "Find EC2 instances still making token-less (IMDSv1) metadata calls"
)]
struct Cli {
    /// Report file, or `-` for stdout
    #[arg(short, long, default_value = DEFAULT_OUTPUT)]
    output: PathBuf,

    /// Report format (csv or json)
    #[arg(short, long, default_value = "csv")]
    format: ReportFormat,

    /// Region used to discover all other regions
    #[arg(short, long, default_value = DEFAULT_BOOTSTRAP_REGION)]
    region: String,

    /// Named profile from the shared AWS config
    #[arg(short, long)]
    profile: Option<String>,

    /// How far back to query the metric, in days
    #[arg(long, default_value_t = 450)]
    lookback_days: u64,

    /// Statistic period in seconds (multiple of 60)
    #[arg(long, default_value_t = 38_880_000)]
    period_secs: u64,

    /// Enable debug logging
    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

impl Cli {
    fn config(&self) -> AuditConfig {
        let config = AuditConfig::default()
            .with_output(self.output.clone())
            .with_format(self.format)
            .with_bootstrap_region(self.region.clone())
            .with_lookback(Duration::from_secs(
                self.lookback_days.saturating_mul(SECS_PER_DAY),
            ))
            .with_period(Duration::from_secs(self.period_secs));
        match &self.profile {
            Some(profile) => config.with_profile(profile.clone()),
            None => config,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(io::stderr)
        .init();

    match run(cli.config()).await {
        Ok(summary) => {
            info!(
                regions = summary.regions.len(),
                unauthorized = summary.unauthorized_regions(),
                rows = summary.rows_emitted(),
                "audit complete"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(config: AuditConfig) -> Result<AuditSummary, AuditError> {
    let clients = aws::connect(&config).await?;
    let lister = clients.region_lister();
    let window = MetricWindow::ending_now(config.lookback(), config.period());

    let writer: Box<dyn Write> = if config.output_is_stdout() {
        Box::new(io::stdout())
    } else {
        Box::new(BufWriter::new(File::create(config.output())?))
    };
    let mut sink = open_sink(config.format(), writer)?;

    let mut auditor = Auditor::new(&lister, &clients, window);
    if config.output_is_stdout() {
        auditor = auditor.with_progress(io::stderr());
    }
    let result = auditor.run(sink.as_mut()).await;

    if let Err(e) = sink.flush() {
        warn!(error = %e, "failed to flush report");
    }

    result
}
