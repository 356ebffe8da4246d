//! Completion worker: one task per accepted submission that waits the fixed
//! delay, computes the digest and publishes it into the store.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, error};

use crate::digest::Digester;
use crate::drain::WorkGuard;
use crate::store::{Ticket, TicketStore};

/// Default artificial delay before a digest is published.
pub const DEFAULT_HASH_DELAY: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub struct CompletionWorker {
    store: Arc<TicketStore>,
    digester: Arc<dyn Digester>,
    delay: Duration,
}

impl CompletionWorker {
    pub fn new(store: Arc<TicketStore>, digester: Arc<dyn Digester>, delay: Duration) -> Self {
        Self {
            store,
            digester,
            delay,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn digester(&self) -> Arc<dyn Digester> {
        Arc::clone(&self.digester)
    }

    /// Start the delayed compute-and-publish for `ticket`.
    ///
    /// `guard` is released when the task ends, however it ends.
    pub fn spawn(&self, ticket: Ticket, secret: String, guard: WorkGuard) -> JoinHandle<()> {
        let worker = self.clone();
        tokio::spawn(async move {
            let _guard = guard;
            worker.run(ticket, secret).await;
        })
    }

    async fn run(&self, ticket: Ticket, secret: String) {
        // The store is not locked while sleeping.
        tokio::time::sleep(self.delay).await;

        let digest = match self.digester.digest(&secret) {
            Ok(digest) => digest,
            Err(e) => {
                error!(%ticket, error = %e, "Digest failed, ticket will stay pending");
                return;
            }
        };

        match self.store.publish(ticket, digest) {
            Ok(()) => debug!(%ticket, "Digest published"),
            Err(e) => error!(%ticket, error = %e, "Failed to publish digest"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::digest::{DigestError, Sha512Base64, digest_secret};
    use crate::drain::DrainBarrier;
    use crate::store::SlotView;

    struct FailingDigester;

    impl Digester for FailingDigester {
        fn digest(&self, _secret: &str) -> Result<String, DigestError> {
            Err(DigestError::Failed("boom".to_string()))
        }
    }

    struct PanickingDigester;

    impl Digester for PanickingDigester {
        fn digest(&self, _secret: &str) -> Result<String, DigestError> {
            panic!("digester panicked");
        }
    }

    fn worker_with(digester: Arc<dyn Digester>) -> (Arc<TicketStore>, CompletionWorker) {
        let store = Arc::new(TicketStore::new());
        let worker = CompletionWorker::new(Arc::clone(&store), digester, DEFAULT_HASH_DELAY);
        (store, worker)
    }

    #[tokio::test(start_paused = true)]
    async fn publishes_after_delay() {
        let (store, worker) = worker_with(Arc::new(Sha512Base64));
        let barrier = DrainBarrier::new();
        let ticket = store.allocate();

        let handle = worker.spawn(ticket, "angryMonkey".to_string(), barrier.enter());

        tokio::time::sleep(Duration::from_secs(4)).await;
        assert_eq!(store.read(ticket), SlotView::Pending);
        assert_eq!(barrier.outstanding(), 1);

        handle.await.unwrap();
        assert_eq!(
            store.read(ticket),
            SlotView::Ready(digest_secret("angryMonkey"))
        );
        assert_eq!(barrier.outstanding(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn digest_failure_is_isolated_to_ticket() {
        let (store, worker) = worker_with(Arc::new(FailingDigester));
        let barrier = DrainBarrier::new();
        let ticket = store.allocate();

        worker
            .spawn(ticket, "secret".to_string(), barrier.enter())
            .await
            .unwrap();

        assert_eq!(store.read(ticket), SlotView::Pending);
        assert_eq!(barrier.outstanding(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn digest_panic_still_releases_guard() {
        let (store, worker) = worker_with(Arc::new(PanickingDigester));
        let barrier = DrainBarrier::new();
        let ticket = store.allocate();

        let result = worker
            .spawn(ticket, "secret".to_string(), barrier.enter())
            .await;

        assert!(result.unwrap_err().is_panic());
        assert_eq!(barrier.outstanding(), 0);
        assert_eq!(store.read(ticket), SlotView::Pending);
    }
}
