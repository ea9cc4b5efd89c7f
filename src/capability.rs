//! Cloud API capabilities consumed by the audit pipeline.
//!
//! The pipeline only talks to the cloud through these traits. The AWS
//! implementations live in `providers::aws`; tests substitute in-memory
//! fakes.

use async_trait::async_trait;

use crate::error::{ApiError, PageError};
use crate::window::MetricWindow;

/// Lists the regions visible to the caller.
#[async_trait]
pub trait RegionLister: Send + Sync {
    /// Return every accessible region, in API order.
    ///
    /// Entries without a name are returned as `None` and skipped by the
    /// caller.
    async fn list_regions(&self) -> Result<Vec<Option<String>>, ApiError>;
}

/// Drains a paginated instance listing one page at a time.
#[async_trait]
pub trait InstancePager: Send {
    /// Whether another page can be fetched.
    fn has_more_pages(&self) -> bool;

    /// Fetch the next page of instance identifiers.
    async fn next_page(&mut self) -> Result<Vec<String>, PageError>;
}

/// Queries a sum statistic for one instance.
#[async_trait]
pub trait MetricSource: Send + Sync {
    /// Return the `Sum` of every datapoint of `metric` in `namespace` for
    /// `instance_id` over `window`.
    async fn sum_statistic(
        &self,
        namespace: &str,
        metric: &str,
        instance_id: &str,
        window: &MetricWindow,
    ) -> Result<Vec<f64>, ApiError>;
}

/// Builds region-scoped clients.
pub trait RegionalClients: Send + Sync {
    /// A fresh pager over all instances in `region`.
    fn instance_pager(&self, region: &str) -> Box<dyn InstancePager>;

    /// A metric source scoped to `region`.
    fn metric_source(&self, region: &str) -> Box<dyn MetricSource>;
}
