//! Per-region instance inventory.

use tracing::warn;

/// One instance and its accumulated token-less call count.
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceRecord {
    instance_id: String,
    no_token_calls: f64,
}

impl InstanceRecord {
    /// A record with a zero counter.
    pub fn new(instance_id: impl Into<String>) -> Self {
        Self {
            instance_id: instance_id.into(),
            no_token_calls: 0.0,
        }
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    pub fn no_token_calls(&self) -> f64 {
        self.no_token_calls
    }

    /// Add a datapoint sum to the counter.
    ///
    /// Negative and NaN values are dropped with a warning; the counter never
    /// decreases.
    pub fn add_calls(&mut self, calls: f64) {
        if calls >= 0.0 {
            self.no_token_calls += calls;
        } else {
            warn!(
                instance_id = %self.instance_id,
                value = calls,
                "dropping invalid datapoint sum"
            );
        }
    }
}

/// Instances collected for a single region, in collection order.
#[derive(Debug, Clone, PartialEq)]
pub struct RegionInstances {
    region: String,
    instances: Vec<InstanceRecord>,
}

impl RegionInstances {
    /// An empty inventory for `region`.
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            instances: Vec::new(),
        }
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    /// Append a record. No deduplication is done.
    pub fn add_instance(&mut self, instance: InstanceRecord) {
        self.instances.push(instance);
    }

    pub fn instances(&self) -> &[InstanceRecord] {
        &self.instances
    }

    pub fn instances_mut(&mut self) -> &mut [InstanceRecord] {
        &mut self.instances
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    /// Instances that made at least one token-less call.
    pub fn offenders(&self) -> impl Iterator<Item = &InstanceRecord> {
        self.instances.iter().filter(|i| i.no_token_calls > 0.0)
    }
}
