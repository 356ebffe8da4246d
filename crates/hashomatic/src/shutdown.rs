//! Shutdown coordination: `Running -> Stopping -> Stopped`.
//!
//! An OS signal and an explicit request race to move the coordinator out of
//! `Running`; only the first one wins. `Stopped` is reached only after the
//! listener has closed and the drain barrier is empty.

use std::fmt;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::drain::DrainBarrier;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownPhase {
    Running,
    Stopping,
    Stopped,
}

/// What asked for the stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownTrigger {
    Signal(&'static str),
    Request,
}

impl fmt::Display for ShutdownTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Signal(name) => write!(f, "signal {name}"),
            Self::Request => f.write_str("shutdown request"),
        }
    }
}

#[derive(Debug)]
pub struct ShutdownCoordinator {
    phase_tx: watch::Sender<ShutdownPhase>,
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        let (phase_tx, _) = watch::channel(ShutdownPhase::Running);
        Self { phase_tx }
    }

    pub fn phase(&self) -> ShutdownPhase {
        *self.phase_tx.borrow()
    }

    pub fn is_running(&self) -> bool {
        self.phase() == ShutdownPhase::Running
    }

    pub fn subscribe(&self) -> watch::Receiver<ShutdownPhase> {
        self.phase_tx.subscribe()
    }

    /// Explicit stop (e.g. `PUT /shutdown`). Returns true only for the winning trigger.
    pub fn request_shutdown(&self) -> bool {
        self.begin_stopping(ShutdownTrigger::Request)
    }

    /// Stop on an OS termination signal. Same semantics as [`Self::request_shutdown`].
    pub fn on_termination_signal(&self, name: &'static str) -> bool {
        self.begin_stopping(ShutdownTrigger::Signal(name))
    }

    fn begin_stopping(&self, trigger: ShutdownTrigger) -> bool {
        let won = self.phase_tx.send_if_modified(|phase| {
            if *phase == ShutdownPhase::Running {
                *phase = ShutdownPhase::Stopping;
                true
            } else {
                false
            }
        });

        if won {
            info!(cause = %trigger, "Shutting down, no longer accepting submissions");
        } else {
            debug!(cause = %trigger, "Shutdown already in progress, ignoring trigger");
        }
        won
    }

    /// Final transition, taken once the listener is closed and work has drained.
    pub fn mark_stopped(&self) -> bool {
        let moved = self.phase_tx.send_if_modified(|phase| {
            if *phase == ShutdownPhase::Stopping {
                *phase = ShutdownPhase::Stopped;
                true
            } else {
                false
            }
        });
        if !moved {
            warn!(phase = ?self.phase(), "Ignoring stop outside of Stopping phase");
        }
        moved
    }

    /// Resolve once the coordinator has left `Running`.
    pub async fn stopping(&self) {
        let mut rx = self.subscribe();
        // The sender lives in `self`, so the channel cannot close here.
        let _ = rx.wait_for(|phase| *phase != ShutdownPhase::Running).await;
    }

    /// Resolve once the coordinator is `Stopped`.
    pub async fn stopped(&self) {
        let mut rx = self.subscribe();
        let _ = rx.wait_for(|phase| *phase == ShutdownPhase::Stopped).await;
    }
}

/// Wait for SIGINT, SIGTERM or an explicit request; the first one wins.
///
/// # Panics
///
/// Panics if the signal handlers cannot be installed, which only happens
/// when the tokio runtime is misconfigured. That is a startup error.
pub async fn wait_for_stop(coordinator: &ShutdownCoordinator) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler - is tokio runtime configured correctly?");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler - is tokio runtime configured correctly?")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            coordinator.on_termination_signal("SIGINT");
        }
        _ = terminate => {
            coordinator.on_termination_signal("SIGTERM");
        }
        _ = coordinator.stopping() => {}
    }
}

/// Block until every accepted unit of work has finished, then mark `Stopped`.
pub async fn drain(coordinator: &ShutdownCoordinator, barrier: &DrainBarrier) {
    let outstanding = barrier.outstanding();
    if outstanding > 0 {
        info!(outstanding, "Waiting for in-flight work to finish");
    }
    barrier.drained().await;
    coordinator.mark_stopped();
    info!("Shutdown complete");
}
