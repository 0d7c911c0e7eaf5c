use std::sync::{
    Arc, Mutex, MutexGuard, PoisonError,
    atomic::{AtomicU64, Ordering},
};

use tokio::sync::{Mutex as AsyncMutex, Notify, watch};
use tracing::{debug, info, warn};

use ledger::{
    LedgerGateway,
    error::Result,
    loan::{LoanId, LoanRecord},
};
use platform::error;

use crate::collection::LoanCollection;

/// The local view of all loans on the ledger.
///
/// Refreshes are serialized. A refresh requested while another one runs waits
/// for it and then starts over, so the last requester always observes the
/// ledger state past its request.
///
/// A refresh neither reads nor publishes while any [`Pinned`] guard is alive.
/// Pins are granted at once, even with a refresh waiting, and a refresh that
/// overlaps a pin fetches the loans again.
pub struct LoanRepository<G> {
    gateway: Arc<G>,
    refreshing: AsyncMutex<()>,
    gate: Gate,
    epoch: AtomicU64,
    snapshot: watch::Sender<Arc<LoanCollection>>,
}

/// Keeps refreshes out until dropped.
#[must_use]
pub struct Pinned<'r> {
    gate: &'r Gate,
}

#[derive(Default)]
struct Gate {
    pins: Mutex<Pins>,
    released: Notify,
}

#[derive(Default)]
struct Pins {
    active: usize,
    taken: u64,
}

impl<G> LoanRepository<G>
where
    G: LedgerGateway,
{
    pub fn new(gateway: Arc<G>) -> Self {
        Self {
            gateway,
            refreshing: AsyncMutex::new(()),
            gate: Gate::default(),
            epoch: AtomicU64::new(0),
            snapshot: watch::Sender::new(Arc::new(LoanCollection::empty())),
        }
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Rebuild the collection from the ledger and publish it.
    ///
    /// A failure to read the loan counter leaves the current collection in place.
    /// Records that fail to load are skipped.
    pub async fn refresh(&self) -> Result<Arc<LoanCollection>> {
        let _exclusive = self.refreshing.lock().await;

        loop {
            let taken = self.gate.unpinned().await;
            let epoch = self.epoch.load(Ordering::Acquire);

            let collection = self
                .fetch()
                .await
                .map(Arc::new)
                .inspect_err(error::log("refresh"))?;

            if self.publish_unless_pinned(taken, epoch, &collection) {
                return Ok(collection);
            }
            debug!("the loans were pinned during the refresh, fetching again");
        }
    }

    /// Publish `collection` unless a pin was taken since `taken` was counted.
    fn publish_unless_pinned(
        &self,
        taken: u64,
        epoch: u64,
        collection: &Arc<LoanCollection>,
    ) -> bool {
        let pins = self.gate.pins();
        if pins.taken != taken {
            return false;
        }

        if self.epoch.load(Ordering::Acquire) == epoch {
            info!(
                loans = collection.len(),
                skipped = collection.skipped().len(),
                "loan collection refreshed"
            );
            self.snapshot.send_replace(collection.clone());
        } else {
            debug!("dropping a refresh started before invalidation");
        }
        true
    }

    /// Read a single loan straight from the ledger, bypassing the collection.
    pub async fn get_loan(&self, loan: LoanId) -> Result<Option<LoanRecord>> {
        self.gateway.read_loan(loan).await
    }

    pub fn snapshot(&self) -> Arc<LoanCollection> {
        self.snapshot.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<LoanCollection>> {
        self.snapshot.subscribe()
    }

    /// Drop the collection along with the outcome of any refresh in flight.
    pub fn invalidate(&self) {
        self.epoch.fetch_add(1, Ordering::AcqRel);
        self.snapshot.send_replace(Arc::new(LoanCollection::empty()));
        info!("loan collection invalidated");
    }

    /// Hold refreshes back while the returned guard lives.
    ///
    /// Pins neither exclude each other nor wait for a refresh.
    pub fn pin(&self) -> Pinned<'_> {
        let mut pins = self.gate.pins();
        pins.active += 1;
        pins.taken += 1;
        Pinned { gate: &self.gate }
    }

    async fn fetch(&self) -> Result<LoanCollection> {
        let counter = self.gateway.read_counter().await?;
        debug!(counter, "fetching loans");

        let mut loans = vec![];
        let mut skipped = vec![];
        for id in (1..counter).rev() {
            let Ok(id) = LoanId::try_from(id) else {
                continue;
            };
            match self.gateway.read_loan(id).await {
                Ok(Some(loan)) => loans.push(loan),
                Ok(None) => debug!(loan = %id, "skipping an unpopulated loan"),
                Err(err) => {
                    warn!(loan = %id, error = %err, "skipping a loan that failed to load");
                    skipped.push(id);
                }
            }
        }
        Ok(LoanCollection::new(loans, skipped))
    }
}

impl Gate {
    fn pins(&self) -> MutexGuard<'_, Pins> {
        self.pins.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Wait until no pin is held and return the number of pins taken so far.
    async fn unpinned(&self) -> u64 {
        loop {
            let released = self.released.notified();
            let taken = {
                let pins = self.pins();
                (pins.active == 0).then_some(pins.taken)
            };
            match taken {
                Some(taken) => return taken,
                None => released.await,
            }
        }
    }
}

impl Drop for Pinned<'_> {
    fn drop(&mut self) {
        let mut pins = self.gate.pins();
        pins.active -= 1;
        if pins.active == 0 {
            drop(pins);
            self.gate.released.notify_waiters();
        }
    }
}
