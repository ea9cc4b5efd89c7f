//! Audit configuration and fixed query constants.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::AuditError;
use crate::report::ReportFormat;

/// CloudWatch namespace for EC2 metrics.
pub const METRIC_NAMESPACE: &str = "AWS/EC2";

/// Metric counting metadata-service calls made without a session token.
pub const METRIC_NAME: &str = "MetadataNoToken";

/// Dimension used to scope the metric to a single instance.
pub const INSTANCE_ID_DIMENSION: &str = "InstanceId";

/// Region used for the initial region discovery call.
pub const DEFAULT_BOOTSTRAP_REGION: &str = "us-west-2";

/// Default report file.
pub const DEFAULT_OUTPUT: &str = "instances.csv";

/// Default lookback: 450 days.
pub const DEFAULT_LOOKBACK: Duration = Duration::from_secs(450 * 24 * 60 * 60);

/// Default statistic period in seconds.
pub const DEFAULT_PERIOD: Duration = Duration::from_secs(38_880_000);

/// Settings for one audit run.
#[derive(Debug, Clone)]
pub struct AuditConfig {
    bootstrap_region: String,
    profile: Option<String>,
    output: PathBuf,
    format: ReportFormat,
    lookback: Duration,
    period: Duration,
}

impl AuditConfig {
    /// Set the region used for region discovery.
    pub fn with_bootstrap_region(mut self, region: impl Into<String>) -> Self {
        self.bootstrap_region = region.into();
        self
    }

    /// Use a named profile from the shared AWS config.
    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Some(profile.into());
        self
    }

    /// Set the report destination. `-` means stdout.
    pub fn with_output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = output.into();
        self
    }

    /// Set the report format.
    pub fn with_format(mut self, format: ReportFormat) -> Self {
        self.format = format;
        self
    }

    /// Set the lookback span of the metric window.
    pub fn with_lookback(mut self, lookback: Duration) -> Self {
        self.lookback = lookback;
        self
    }

    /// Set the statistic period.
    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    pub fn bootstrap_region(&self) -> &str {
        &self.bootstrap_region
    }

    pub fn profile(&self) -> Option<&str> {
        self.profile.as_deref()
    }

    pub fn output(&self) -> &PathBuf {
        &self.output
    }

    /// Whether the report goes to stdout instead of a file.
    pub fn output_is_stdout(&self) -> bool {
        self.output.as_os_str() == "-"
    }

    pub fn format(&self) -> ReportFormat {
        self.format
    }

    pub fn lookback(&self) -> Duration {
        self.lookback
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Check values the metrics backend would reject.
    ///
    /// # Errors
    ///
    /// Returns `AuditError::Config` if the lookback is zero, or the period is
    /// zero or not a whole number of minutes.
    pub fn validate(&self) -> Result<(), AuditError> {
        if self.bootstrap_region.is_empty() {
            return Err(AuditError::Config("bootstrap region is empty".to_string()));
        }
        if self.lookback.is_zero() {
            return Err(AuditError::Config("lookback must be positive".to_string()));
        }
        let period = self.period.as_secs();
        if period == 0 || period % 60 != 0 || self.period.subsec_nanos() != 0 {
            return Err(AuditError::Config(format!(
                "period must be a positive multiple of 60 seconds, got {:?}",
                self.period
            )));
        }
        if i32::try_from(period).is_err() {
            return Err(AuditError::Config(format!(
                "period of {} seconds is too large",
                period
            )));
        }
        Ok(())
    }
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            bootstrap_region: DEFAULT_BOOTSTRAP_REGION.to_string(),
            profile: None,
            output: PathBuf::from(DEFAULT_OUTPUT),
            format: ReportFormat::Csv,
            lookback: DEFAULT_LOOKBACK,
            period: DEFAULT_PERIOD,
        }
    }
}
