//! Region discovery.

use tracing::debug;

use crate::capability::RegionLister;
use crate::error::AuditError;

/// List all regions the caller can access.
///
/// Unnamed entries are dropped.
///
/// # Errors
///
/// Any API failure is fatal and returned as `AuditError::ListRegions`; a
/// partial region list would silently narrow the audit.
pub async fn list_regions(lister: &dyn RegionLister) -> Result<Vec<String>, AuditError> {
    let regions: Vec<String> = lister
        .list_regions()
        .await
        .map_err(AuditError::ListRegions)?
        .into_iter()
        .flatten()
        .collect();

    debug!(count = regions.len(), "retrieved regions");
    Ok(regions)
}
