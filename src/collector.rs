//! Instance collection for one region.

use tracing::{debug, warn};

use crate::capability::InstancePager;
use crate::error::{ApiError, AuditError, PageError};
use crate::inventory::{InstanceRecord, RegionInstances};

/// Result of draining a region's instance listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectOutcome {
    /// Every page was fetched.
    Drained,
    /// Listing was denied; the region must be skipped.
    Unauthorized(ApiError),
}

/// Drain `pager` into `target`, in page order then API order.
///
/// Stops at the first authorization failure and reports it as
/// `CollectOutcome::Unauthorized`. Records already appended stay in `target`;
/// the caller discards the whole region.
///
/// # Errors
///
/// Any other page failure is fatal and returned as
/// `AuditError::ListInstances`.
pub async fn collect_instances(
    target: &mut RegionInstances,
    pager: &mut dyn InstancePager,
) -> Result<CollectOutcome, AuditError> {
    let mut page_number = 0usize;

    while pager.has_more_pages() {
        page_number += 1;
        let page = match pager.next_page().await {
            Ok(page) => page,
            Err(PageError::Unauthorized(err)) => {
                warn!(
                    region = target.region(),
                    error = %err,
                    "you are not authorized to list instances in this region"
                );
                return Ok(CollectOutcome::Unauthorized(err));
            }
            Err(PageError::Other(err)) => {
                return Err(AuditError::ListInstances {
                    region: target.region().to_string(),
                    source: err,
                });
            }
        };

        debug!(
            region = target.region(),
            page = page_number,
            instances = page.len(),
            "fetched instance page"
        );

        for instance_id in page {
            target.add_instance(InstanceRecord::new(instance_id));
        }
    }

    Ok(CollectOutcome::Drained)
}
