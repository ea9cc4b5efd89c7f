//! AWS implementations of the audit capabilities (EC2 and CloudWatch).

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_sdk_cloudwatch::primitives::DateTime;
use aws_sdk_cloudwatch::types::{Dimension, Statistic};
use aws_sdk_ec2::error::{DisplayErrorContext, ProvideErrorMetadata};
use tracing::debug;

use crate::capability::{InstancePager, MetricSource, RegionLister, RegionalClients};
use crate::config::{AuditConfig, INSTANCE_ID_DIMENSION};
use crate::error::{ApiError, AuditError, PageError};
use crate::window::MetricWindow;

/// Convert an SDK error into an `ApiError`, keeping the service error code.
fn api_error<E>(err: &E) -> ApiError
where
    E: ProvideErrorMetadata + std::error::Error,
{
    match err.code() {
        Some(code) => ApiError::new(code, err.message().unwrap_or_default()),
        None => ApiError::transport(DisplayErrorContext(err).to_string()),
    }
}

/// Statistic period of `window` in the whole seconds CloudWatch expects.
fn period_secs(window: &MetricWindow) -> Result<i32, ApiError> {
    i32::try_from(window.period().as_secs()).map_err(|_| {
        ApiError::transport(format!(
            "period out of range: {} seconds",
            window.period().as_secs()
        ))
    })
}

/// Load credentials and settings from the standard AWS provider chain.
///
/// The loaded config targets the bootstrap region; regional clients override
/// the region per call.
pub async fn load_sdk_config(config: &AuditConfig) -> SdkConfig {
    let mut loader = aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(config.bootstrap_region().to_string()));
    if let Some(profile) = config.profile() {
        loader = loader.profile_name(profile);
    }
    loader.load().await
}

/// Lists regions with EC2 `DescribeRegions`.
#[derive(Debug, Clone)]
pub struct Ec2RegionLister {
    client: aws_sdk_ec2::Client,
}

impl Ec2RegionLister {
    pub fn new(sdk_config: &SdkConfig) -> Self {
        Self {
            client: aws_sdk_ec2::Client::new(sdk_config),
        }
    }
}

#[async_trait]
impl RegionLister for Ec2RegionLister {
    async fn list_regions(&self) -> Result<Vec<Option<String>>, ApiError> {
        let output = self
            .client
            .describe_regions()
            .send()
            .await
            .map_err(|e| api_error(&e))?;

        Ok(output
            .regions()
            .iter()
            .map(|r| r.region_name().map(str::to_string))
            .collect())
    }
}

/// Pages through EC2 `DescribeInstances` using `NextToken`.
#[derive(Debug)]
pub struct Ec2InstancePager {
    client: aws_sdk_ec2::Client,
    next_token: Option<String>,
    started: bool,
}

impl Ec2InstancePager {
    pub fn new(client: aws_sdk_ec2::Client) -> Self {
        Self {
            client,
            next_token: None,
            started: false,
        }
    }
}

#[async_trait]
impl InstancePager for Ec2InstancePager {
    fn has_more_pages(&self) -> bool {
        !self.started || self.next_token.is_some()
    }

    async fn next_page(&mut self) -> Result<Vec<String>, PageError> {
        let output = self
            .client
            .describe_instances()
            .set_next_token(self.next_token.clone())
            .send()
            .await
            .map_err(|e| PageError::classify(api_error(&e)))?;

        self.started = true;
        self.next_token = output
            .next_token()
            .filter(|t| !t.is_empty())
            .map(str::to_string);

        Ok(output
            .reservations()
            .iter()
            .flat_map(|r| r.instances())
            .filter_map(|i| i.instance_id().map(str::to_string))
            .collect())
    }
}

/// Queries CloudWatch `GetMetricStatistics` with the `Sum` statistic.
#[derive(Debug, Clone)]
pub struct CloudWatchMetricSource {
    client: aws_sdk_cloudwatch::Client,
}

impl CloudWatchMetricSource {
    pub fn new(client: aws_sdk_cloudwatch::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MetricSource for CloudWatchMetricSource {
    async fn sum_statistic(
        &self,
        namespace: &str,
        metric: &str,
        instance_id: &str,
        window: &MetricWindow,
    ) -> Result<Vec<f64>, ApiError> {
        let period = period_secs(window)?;

        let output = self
            .client
            .get_metric_statistics()
            .namespace(namespace)
            .metric_name(metric)
            .dimensions(
                Dimension::builder()
                    .name(INSTANCE_ID_DIMENSION)
                    .value(instance_id)
                    .build(),
            )
            .start_time(DateTime::from(window.start()))
            .end_time(DateTime::from(window.end()))
            .period(period)
            .statistics(Statistic::Sum)
            .send()
            .await
            .map_err(|e| api_error(&e))?;

        debug!(
            instance_id,
            datapoints = output.datapoints().len(),
            "retrieved datapoints"
        );

        Ok(output.datapoints().iter().filter_map(|d| d.sum()).collect())
    }
}

/// Builds EC2 and CloudWatch clients for any region from one loaded config.
#[derive(Debug, Clone)]
pub struct AwsClients {
    sdk_config: SdkConfig,
}

impl AwsClients {
    pub fn new(sdk_config: SdkConfig) -> Self {
        Self { sdk_config }
    }

    /// Region lister bound to the config's own region.
    pub fn region_lister(&self) -> Ec2RegionLister {
        Ec2RegionLister::new(&self.sdk_config)
    }

    fn ec2_client(&self, region: &str) -> aws_sdk_ec2::Client {
        let conf = aws_sdk_ec2::config::Builder::from(&self.sdk_config)
            .region(Region::new(region.to_string()))
            .build();
        aws_sdk_ec2::Client::from_conf(conf)
    }

    fn cloudwatch_client(&self, region: &str) -> aws_sdk_cloudwatch::Client {
        let conf = aws_sdk_cloudwatch::config::Builder::from(&self.sdk_config)
            .region(Region::new(region.to_string()))
            .build();
        aws_sdk_cloudwatch::Client::from_conf(conf)
    }
}

impl RegionalClients for AwsClients {
    fn instance_pager(&self, region: &str) -> Box<dyn InstancePager> {
        Box::new(Ec2InstancePager::new(self.ec2_client(region)))
    }

    fn metric_source(&self, region: &str) -> Box<dyn MetricSource> {
        Box::new(CloudWatchMetricSource::new(self.cloudwatch_client(region)))
    }
}

/// Load the AWS config for `config` and build the clients.
///
/// # Errors
///
/// Returns `AuditError::Config` if `config` fails validation.
pub async fn connect(config: &AuditConfig) -> Result<AwsClients, AuditError> {
    config.validate()?;
    Ok(AwsClients::new(load_sdk_config(config).await))
}


#[cfg(test)]
mod tests {
    use std::time::{Duration, SystemTime};

    use super::*;

    fn window(period: Duration) -> MetricWindow {
        MetricWindow::ending_at(SystemTime::now(), Duration::from_secs(86_400), period)
    }

    #[test]
    fn test_period_secs() {
        assert_eq!(
            period_secs(&window(Duration::from_secs(38_880_000))),
            Ok(38_880_000)
        );
    }

    #[test]
    fn test_period_out_of_range() {
        let err = period_secs(&window(Duration::from_secs(1 << 40))).unwrap_err();
        assert_eq!(err.code, None);
        assert!(err.message.starts_with("period out of range"));
    }
}
