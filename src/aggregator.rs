//! Per-instance metric aggregation.

use tracing::info;

use crate::capability::MetricSource;
use crate::config::{METRIC_NAME, METRIC_NAMESPACE};
use crate::error::AuditError;
use crate::inventory::RegionInstances;
use crate::window::MetricWindow;

/// Query the token-less call metric for every instance in `target` and add
/// the returned datapoint sums to each counter.
///
/// One query is issued per instance, in collection order.
///
/// # Errors
///
/// Any query failure is fatal and returned as `AuditError::QueryMetrics`.
pub async fn aggregate_metrics(
    target: &mut RegionInstances,
    source: &dyn MetricSource,
    window: &MetricWindow,
) -> Result<(), AuditError> {
    let region = target.region().to_string();

    for instance in target.instances_mut() {
        info!(
            region = %region,
            instance_id = instance.instance_id(),
            "retrieving cloudwatch metrics for instance"
        );

        let datapoints = source
            .sum_statistic(METRIC_NAMESPACE, METRIC_NAME, instance.instance_id(), window)
            .await
            .map_err(|source| AuditError::QueryMetrics {
                region: region.clone(),
                instance_id: instance.instance_id().to_string(),
                source,
            })?;

        for sum in datapoints {
            instance.add_calls(sum);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::{Duration, SystemTime};

    use assert_approx_eq::assert_approx_eq;
    use async_trait::async_trait;

    use super::*;
    use crate::error::ApiError;
    use crate::inventory::InstanceRecord;

    #[derive(Default)]
    struct FakeMetrics {
        sums: HashMap<String, Vec<f64>>,
        failing: Option<String>,
        queries: Mutex<Vec<(String, String, String)>>,
    }

    #[async_trait]
    impl MetricSource for FakeMetrics {
        async fn sum_statistic(
            &self,
            namespace: &str,
            metric: &str,
            instance_id: &str,
            _window: &MetricWindow,
        ) -> Result<Vec<f64>, ApiError> {
            self.queries.lock().unwrap().push((
                namespace.to_string(),
                metric.to_string(),
                instance_id.to_string(),
            ));
            if self.failing.as_deref() == Some(instance_id) {
                return Err(ApiError::new("InvalidParameterCombination", "bad period"));
            }
            Ok(self.sums.get(instance_id).cloned().unwrap_or_default())
        }
    }

    fn window() -> MetricWindow {
        MetricWindow::ending_at(
            SystemTime::UNIX_EPOCH + Duration::from_secs(100_000_000),
            Duration::from_secs(86_400),
            Duration::from_secs(86_400),
        )
    }

    fn region(ids: &[&str]) -> RegionInstances {
        let mut ri = RegionInstances::new("us-west-2");
        for id in ids {
            ri.add_instance(InstanceRecord::new(*id));
        }
        ri
    }

    #[tokio::test]
    async fn test_sums_datapoints() {
        let mut metrics = FakeMetrics::default();
        metrics.sums.insert("123".into(), vec![1.0, 1.0]);
        metrics.sums.insert("345".into(), vec![0.1, 0.2, 0.3, 7.25]);
        let mut ri = region(&["123", "234", "345"]);

        aggregate_metrics(&mut ri, &metrics, &window()).await.unwrap();

        assert_approx_eq!(ri.instances()[0].no_token_calls(), 2.0, 1e-9);
        assert_eq!(ri.instances()[1].no_token_calls(), 0.0);
        assert_approx_eq!(ri.instances()[2].no_token_calls(), 7.85, 1e-9);
    }

    #[tokio::test]
    async fn test_sum_is_order_independent() {
        let mut forward = FakeMetrics::default();
        forward.sums.insert("a".into(), vec![0.1, 2.5, 1e3, 0.7]);
        let mut reverse = FakeMetrics::default();
        reverse.sums.insert("a".into(), vec![0.7, 1e3, 2.5, 0.1]);

        let mut left = region(&["a"]);
        let mut right = region(&["a"]);
        aggregate_metrics(&mut left, &forward, &window()).await.unwrap();
        aggregate_metrics(&mut right, &reverse, &window()).await.unwrap();

        assert_approx_eq!(
            left.instances()[0].no_token_calls(),
            right.instances()[0].no_token_calls(),
            1e-9
        );
    }

    #[tokio::test]
    async fn test_queries_fixed_metric_in_order() {
        let metrics = FakeMetrics::default();
        let mut ri = region(&["b", "a"]);

        aggregate_metrics(&mut ri, &metrics, &window()).await.unwrap();

        let queries = metrics.queries.lock().unwrap();
        assert_eq!(
            *queries,
            vec![
                ("AWS/EC2".to_string(), "MetadataNoToken".to_string(), "b".to_string()),
                ("AWS/EC2".to_string(), "MetadataNoToken".to_string(), "a".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_query_failure_is_fatal() {
        let metrics = FakeMetrics {
            failing: Some("234".into()),
            ..Default::default()
        };
        let mut ri = region(&["123", "234", "345"]);

        let result = aggregate_metrics(&mut ri, &metrics, &window()).await;

        match result {
            Err(AuditError::QueryMetrics {
                region,
                instance_id,
                ..
            }) => {
                assert_eq!(region, "us-west-2");
                assert_eq!(instance_id, "234");
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(metrics.queries.lock().unwrap().len(), 2);
    }
}
