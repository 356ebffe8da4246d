//! HashService: transport-agnostic submission, lookup and shutdown.
//!
//! This service owns:
//! - The ticket store (allocation + result slots)
//! - The completion worker spawning delayed digests
//! - The drain barrier and shutdown coordinator
//! - Submission timing statistics
//!
//! Transports (HTTP today) delegate to this service and never touch the
//! store directly.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use crate::digest::{Digester, Sha512Base64};
use crate::drain::{DrainBarrier, WorkGuard};
use crate::health::Health;
use crate::shutdown::ShutdownCoordinator;
use crate::stats::{RequestStats, StatsSnapshot};
use crate::store::{SlotView, Ticket, TicketStore};
use crate::version::VersionInfo;
use crate::worker::{CompletionWorker, DEFAULT_HASH_DELAY};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SubmitError {
    #[error("missing password")]
    EmptySecret,
    #[error("Server is shutting down")]
    ShuttingDown,
}

/// Snapshot of service health for transports to query.
#[derive(Debug, Clone)]
pub struct HealthSnapshot {
    pub state: Health,
    pub outstanding: usize,
    pub tickets: usize,
    pub version: VersionInfo,
}

pub struct HashService {
    store: Arc<TicketStore>,
    worker: CompletionWorker,
    barrier: DrainBarrier,
    requests: DrainBarrier,
    coordinator: Arc<ShutdownCoordinator>,
    stats: RequestStats,
    version: VersionInfo,
}

impl Default for HashService {
    fn default() -> Self {
        Self::new()
    }
}

impl HashService {
    /// Service with the SHA-512 digest and the default 5 second delay.
    pub fn new() -> Self {
        Self::with_parts(Arc::new(Sha512Base64), DEFAULT_HASH_DELAY)
    }

    fn with_parts(digester: Arc<dyn Digester>, delay: Duration) -> Self {
        let store = Arc::new(TicketStore::new());
        Self {
            worker: CompletionWorker::new(Arc::clone(&store), digester, delay),
            store,
            barrier: DrainBarrier::new(),
            requests: DrainBarrier::new(),
            coordinator: Arc::new(ShutdownCoordinator::new()),
            stats: RequestStats::new(),
            version: VersionInfo::new(),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.worker = CompletionWorker::new(Arc::clone(&self.store), self.worker.digester(), delay);
        self
    }

    pub fn with_digester(mut self, digester: Arc<dyn Digester>) -> Self {
        self.worker = CompletionWorker::new(Arc::clone(&self.store), digester, self.worker.delay());
        self
    }

    pub fn with_version(mut self, version: VersionInfo) -> Self {
        self.version = version;
        self
    }

    /// Accept a secret and return its ticket without waiting for the digest.
    ///
    /// Rejected submissions never consume a ticket.
    pub fn submit(&self, secret: &str) -> Result<Ticket, SubmitError> {
        if secret.is_empty() {
            return Err(SubmitError::EmptySecret);
        }

        // Register before checking the phase: once the coordinator has seen
        // this guard, the drain cannot finish without it.
        let guard = self.barrier.enter();
        if !self.coordinator.is_running() {
            return Err(SubmitError::ShuttingDown);
        }

        let ticket = self.store.allocate();
        self.worker.spawn(ticket, secret.to_owned(), guard);
        info!(%ticket, delay_ms = self.worker.delay().as_millis() as u64, "Accepted submission");
        Ok(ticket)
    }

    /// Current state of a ticket. Never blocks on pending work.
    pub fn lookup(&self, raw: i64) -> SlotView {
        self.store.read_raw(raw)
    }

    /// Idempotent; returns true only for the call that started the stop.
    pub fn request_shutdown(&self) -> bool {
        self.coordinator.request_shutdown()
    }

    /// Register in-flight request handling.
    ///
    /// Request guards live on their own barrier: the listener waits for them
    /// only within its grace window, while accepted work is always drained.
    pub fn track_request(&self) -> WorkGuard {
        self.requests.enter()
    }

    pub fn coordinator(&self) -> &Arc<ShutdownCoordinator> {
        &self.coordinator
    }

    /// Accepted work still waiting to be published.
    pub fn barrier(&self) -> &DrainBarrier {
        &self.barrier
    }

    /// Requests currently being handled.
    pub fn requests(&self) -> &DrainBarrier {
        &self.requests
    }

    pub fn store(&self) -> &Arc<TicketStore> {
        &self.store
    }

    pub fn record_submission_time(&self, elapsed: Duration) {
        self.stats.record(elapsed);
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    pub fn health(&self) -> HealthSnapshot {
        HealthSnapshot {
            state: self.coordinator.phase().into(),
            outstanding: self.barrier.outstanding(),
            tickets: self.store.len(),
            version: self.version.clone(),
        }
    }
}
