//! hashomatic: ticketed password hashing with a drain-on-shutdown guarantee.
//!
//! A submission is answered immediately with a [`Ticket`]; the digest is
//! published into the [`TicketStore`] by a [`CompletionWorker`] after a fixed
//! delay. Shutdown never drops accepted work: the [`ShutdownCoordinator`]
//! only reaches `Stopped` once the [`DrainBarrier`] is empty.

mod digest;
mod drain;
mod health;
mod stats;
mod store;
mod version;

pub mod service;
pub mod shutdown;
pub mod transport;
pub mod worker;

pub use digest::{DigestError, Digester, Sha512Base64, digest_secret};
pub use drain::{DrainBarrier, WorkGuard};
pub use health::Health;
pub use service::{HashService, HealthSnapshot, SubmitError};
pub use shutdown::{ShutdownCoordinator, ShutdownPhase, ShutdownTrigger};
pub use stats::{RequestStats, StatsSnapshot};
pub use store::{SlotView, StoreError, Ticket, TicketStore};
pub use version::{HASHOMATIC_VERSION, VersionInfo};
pub use worker::CompletionWorker;
