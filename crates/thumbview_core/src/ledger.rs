use std::collections::HashSet;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use thumbview_logging::{thumb_debug, thumb_trace};

use crate::{ItemId, ThumbStatus};

/// Generation counter; every stop starts a new epoch and invalidates older work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Epoch(pub u64);

impl Epoch {
    fn next(self) -> Self {
        Epoch(self.0 + 1)
    }
}

impl fmt::Display for Epoch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "e{}", self.0)
    }
}

/// Everything the producer and consumer sides share, kept behind one lock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerState {
    pub epoch: Epoch,
    pub stopped: bool,
    pub pending: HashSet<ItemId>,
}

impl Default for SchedulerState {
    fn default() -> Self {
        // Nothing has been dispatched yet, so updates start out stopped.
        Self {
            epoch: Epoch::default(),
            stopped: true,
            pending: HashSet::new(),
        }
    }
}

/// Dedup ledger of claimed item ids plus the cancellation epoch.
///
/// An id is pending from a successful [`try_claim`](Self::try_claim) until exactly one
/// [`release`](Self::release) in the same epoch, or until [`stop`](Self::stop) sweeps it.
#[derive(Debug, Default)]
pub struct PendingLedger {
    state: Mutex<SchedulerState>,
}

impl PendingLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, SchedulerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Claims `uid` for generation, returning the epoch the unit must carry.
    ///
    /// Refused when the item is already `Ready` or the id is already pending.
    /// The first successful claim after a stop marks updates as in progress again.
    pub fn try_claim(&self, uid: &str, status: ThumbStatus) -> Option<Epoch> {
        if status == ThumbStatus::Ready {
            return None;
        }
        let mut state = self.lock();
        if state.pending.contains(uid) {
            return None;
        }
        state.pending.insert(uid.to_owned());
        state.stopped = false;
        Some(state.epoch)
    }

    /// Releases a claim made in `epoch`. Returns `true` when the claim was live.
    ///
    /// Claims from older epochs were already swept by `stop`, so releasing them is a
    /// no-op that returns `false`.
    ///
    /// # Panics
    ///
    /// Panics when `uid` is released twice within the current epoch; the ledger
    /// cannot be trusted after that.
    pub fn release(&self, uid: &str, epoch: Epoch) -> bool {
        let mut state = self.lock();
        if state.epoch != epoch {
            thumb_trace!("release of {uid} from {epoch} ignored, now {}", state.epoch);
            return false;
        }
        let removed = state.pending.remove(uid);
        assert!(removed, "pending ledger corrupted: {uid} released twice in {epoch}");
        true
    }

    /// Releases a claim whose unit never reached a worker.
    ///
    /// When nothing else is pending, updates drop back to stopped without a new
    /// epoch, so a refresh that dispatched nothing does not report work in progress.
    pub fn reject(&self, uid: &str, epoch: Epoch) -> bool {
        let mut state = self.lock();
        if state.epoch != epoch {
            return false;
        }
        let removed = state.pending.remove(uid);
        assert!(removed, "pending ledger corrupted: {uid} released twice in {epoch}");
        if state.pending.is_empty() {
            state.stopped = true;
        }
        true
    }

    /// Stops updates: bumps the epoch and drops every outstanding claim.
    /// Returns the new epoch.
    pub fn stop(&self) -> Epoch {
        let mut state = self.lock();
        state.stopped = true;
        state.epoch = state.epoch.next();
        let swept = state.pending.len();
        state.pending.clear();
        thumb_debug!("updates stopped, now {}, swept {swept} claims", state.epoch);
        state.epoch
    }

    /// Re-enables updates without dispatching anything.
    pub fn start(&self) {
        self.lock().stopped = false;
    }

    /// True while work carrying `epoch` may still be observed.
    pub fn is_current(&self, epoch: Epoch) -> bool {
        let state = self.lock();
        !state.stopped && state.epoch == epoch
    }

    pub fn current_epoch(&self) -> Epoch {
        self.lock().epoch
    }

    pub fn is_stopped(&self) -> bool {
        self.lock().stopped
    }

    pub fn is_pending(&self, uid: &str) -> bool {
        self.lock().pending.contains(uid)
    }

    pub fn pending_len(&self) -> usize {
        self.lock().pending.len()
    }

    /// Copy of the shared state, for diagnostics and tests.
    pub fn snapshot(&self) -> SchedulerState {
        self.lock().clone()
    }
}
