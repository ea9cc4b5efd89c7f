//! The historical window queried for every instance.

use std::time::{Duration, SystemTime};

/// Start, end and statistic period of a metric query.
///
/// Computed once per run from an explicit `now` and passed to the
/// aggregator, so every instance in every region is queried over the same
/// span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricWindow {
    start: SystemTime,
    end: SystemTime,
    period: Duration,
}

impl MetricWindow {
    /// A window ending at `now` and reaching `lookback` into the past.
    ///
    /// Saturates at the Unix epoch if `lookback` reaches past it.
    pub fn ending_at(now: SystemTime, lookback: Duration, period: Duration) -> Self {
        let start = now
            .checked_sub(lookback)
            .unwrap_or(SystemTime::UNIX_EPOCH);
        Self {
            start,
            end: now,
            period,
        }
    }

    /// A window ending at the current time.
    pub fn ending_now(lookback: Duration, period: Duration) -> Self {
        Self::ending_at(SystemTime::now(), lookback, period)
    }

    pub fn start(&self) -> SystemTime {
        self.start
    }

    pub fn end(&self) -> SystemTime {
        self.end
    }

    /// Aggregation period of each returned datapoint.
    pub fn period(&self) -> Duration {
        self.period
    }
}
