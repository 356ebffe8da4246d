//! Submission timing statistics exposed on `/stats`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;

#[derive(Debug, Default)]
pub struct RequestStats {
    requests: AtomicU64,
    total_nanos: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsSnapshot {
    pub requests: u64,
    pub average_nanoseconds: u64,
}

impl RequestStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, elapsed: Duration) {
        let nanos = u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX);
        self.total_nanos.fetch_add(nanos, Ordering::Relaxed);
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    /// Count and mean duration. Concurrent `record` calls may be observed
    /// half-applied; the figures are advisory.
    pub fn snapshot(&self) -> StatsSnapshot {
        let requests = self.requests.load(Ordering::Relaxed);
        let total = self.total_nanos.load(Ordering::Relaxed);
        StatsSnapshot {
            requests,
            average_nanoseconds: total.checked_div(requests).unwrap_or(0),
        }
    }
}
