use std::mem;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{mpsc, Arc};
use std::time::{Duration, Instant};

use thiserror::Error;
use thumbview_core::{
    compute_required, ConfigError, Epoch, FailureKind, ItemId, ModelPort, Outcome,
    PendingLedger, ReadAhead, SchedulerConfig, ThumbStatus, WindowRequest,
};
use thumbview_logging::{set_log_epoch, thumb_debug, thumb_error, thumb_trace};

use crate::{
    GenerateError, Merge, PoolError, ResultSink, Task, ThumbnailGenerator, UnitStatus,
    WorkResult, WorkerPool,
};

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("invalid scheduler config: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Pool(#[from] PoolError),
}

/// Windowed thumbnail prefetcher.
///
/// Owns the item model and lives on the consumer context (typically the UI
/// thread). `refresh` claims and dispatches the items around the visible range;
/// workers report back over a channel and `pump` merges their results into the
/// model. Nothing but the ledger is shared with the workers.
pub struct ThumbnailScheduler<G, M>
where
    G: ThumbnailGenerator,
    M: ModelPort<Thumbnail = G::Thumbnail>,
{
    // Declared before `pool`: fields drop in order, so queued units observe the
    // stop and abort before the pool joins its workers.
    stop_on_drop: StopOnDrop,
    ledger: Arc<PendingLedger>,
    sink: ResultSink,
    model: M,
    generator: Arc<G>,
    pool: WorkerPool,
    read_ahead: ReadAhead,
    result_tx: mpsc::Sender<WorkResult<G::Thumbnail>>,
    result_rx: mpsc::Receiver<WorkResult<G::Thumbnail>>,
    in_flight: usize,
    rejected: Vec<Merge>,
}

impl<G, M> ThumbnailScheduler<G, M>
where
    G: ThumbnailGenerator,
    M: ModelPort<Thumbnail = G::Thumbnail>,
{
    pub fn new(config: &SchedulerConfig, generator: G, model: M) -> Result<Self, SchedulerError> {
        config.validate()?;
        let ledger = Arc::new(PendingLedger::new());
        let (result_tx, result_rx) = mpsc::channel();
        Ok(Self {
            stop_on_drop: StopOnDrop(ledger.clone()),
            sink: ResultSink::new(ledger.clone()),
            ledger,
            model,
            generator: Arc::new(generator),
            pool: WorkerPool::new(config.max_workers)?,
            read_ahead: config.read_ahead(),
            result_tx,
            result_rx,
            in_flight: 0,
            rejected: Vec::new(),
        })
    }

    /// Dispatches generation for every item in the read-ahead window of `visible`
    /// that is neither `Ready` nor already claimed. Returns the number dispatched.
    pub fn refresh(&mut self, visible: Option<WindowRequest>) -> usize {
        let required = compute_required(visible, self.model.len(), self.read_ahead);
        if required.is_empty() {
            return 0;
        }

        let mut dispatched = 0;
        for index in required {
            let Some(uid) = self.model.uid_at(index) else {
                continue;
            };
            let status = self.model.status(&uid).unwrap_or_default();
            let Some(epoch) = self.ledger.try_claim(&uid, status) else {
                continue;
            };
            if self.dispatch(uid, epoch, status) {
                dispatched += 1;
            }
        }

        if dispatched > 0 {
            set_log_epoch(self.ledger.current_epoch().0);
            thumb_debug!("refresh {visible:?} dispatched {dispatched}, in flight {}", self.in_flight);
        }
        dispatched
    }

    fn dispatch(&mut self, uid: ItemId, epoch: Epoch, previous: ThumbStatus) -> bool {
        let task = unit_of_work(
            self.generator.clone(),
            self.ledger.clone(),
            self.result_tx.clone(),
            uid.clone(),
            epoch,
        );
        match self.pool.submit(task) {
            Ok(()) => {
                self.model.set(&uid, ThumbStatus::Generating, None);
                self.in_flight += 1;
                true
            }
            Err(err) => {
                thumb_error!("rejected {uid}: {err}");
                self.ledger.reject(&uid, epoch);
                self.model.set(&uid, previous, None);
                self.rejected.push(Merge {
                    uid,
                    outcome: Outcome::Failed(FailureKind::PoolShutdown),
                });
                false
            }
        }
    }

    /// Merges every result that has arrived so far, without blocking.
    ///
    /// Units the pool refused since the last pump are reported first, as
    /// `Failed(PoolShutdown)`; their claims were already released.
    pub fn pump(&mut self) -> Vec<Merge> {
        let mut merged = mem::take(&mut self.rejected);
        while let Ok(result) = self.result_rx.try_recv() {
            merged.push(self.merge(result));
        }
        merged
    }

    /// Merges results until every dispatched unit has reported or `timeout` passes.
    pub fn pump_blocking(&mut self, timeout: Duration) -> Vec<Merge> {
        let deadline = Instant::now() + timeout;
        let mut merged = self.pump();
        while self.in_flight > 0 {
            let Some(left) = deadline.checked_duration_since(Instant::now()) else {
                break;
            };
            match self.result_rx.recv_timeout(left) {
                Ok(result) => merged.push(self.merge(result)),
                Err(_) => break,
            }
        }
        merged
    }

    fn merge(&mut self, result: WorkResult<G::Thumbnail>) -> Merge {
        self.in_flight = self.in_flight.saturating_sub(1);
        let uid = result.uid.clone();
        let outcome = self.sink.apply(&mut self.model, result);
        Merge { uid, outcome }
    }

    /// Invalidates all queued and running work and frees every claim.
    ///
    /// Running generators are not interrupted; their results are discarded on merge.
    /// The next `refresh` that claims something resumes updates.
    pub fn stop(&mut self) -> Epoch {
        let epoch = self.ledger.stop();
        set_log_epoch(epoch.0);
        epoch
    }

    /// Resumes updates without dispatching anything.
    pub fn start(&self) {
        self.ledger.start();
    }

    /// Swaps in a new dataset. Outstanding work for the old one is invalidated.
    pub fn replace_model(&mut self, model: M) -> M {
        self.stop();
        mem::replace(&mut self.model, model)
    }

    /// Stops accepting new units; later claims are released immediately.
    pub fn close(&self) {
        self.pool.close();
    }

    /// Stops updates, waits for every worker and returns the model.
    pub fn shutdown(self) -> M {
        let Self {
            ledger,
            sink,
            mut model,
            pool,
            result_rx,
            ..
        } = self;
        ledger.stop();
        pool.shutdown();
        // Everything still queued belongs to a dead epoch; drain it so nothing is left unmerged.
        let stale = result_rx.try_iter().map(|r| sink.apply(&mut model, r)).count();
        thumb_trace!("shutdown drained {stale} stale results");
        model
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn model_mut(&mut self) -> &mut M {
        &mut self.model
    }

    pub fn ledger(&self) -> &Arc<PendingLedger> {
        &self.ledger
    }

    pub fn epoch(&self) -> Epoch {
        self.ledger.current_epoch()
    }

    pub fn pending_len(&self) -> usize {
        self.ledger.pending_len()
    }

    /// Units dispatched whose result has not been merged yet, stale ones included.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn updates_in_progress(&self) -> bool {
        !self.ledger.is_stopped()
    }
}

/// Invalidates outstanding work when a scheduler is dropped without `shutdown`.
struct StopOnDrop(Arc<PendingLedger>);

impl Drop for StopOnDrop {
    fn drop(&mut self) {
        let epoch = self.0.stop();
        thumb_trace!("scheduler dropped, queued units abort in {epoch}");
    }
}

fn unit_of_work<G: ThumbnailGenerator>(
    generator: Arc<G>,
    ledger: Arc<PendingLedger>,
    result_tx: mpsc::Sender<WorkResult<G::Thumbnail>>,
    uid: ItemId,
    epoch: Epoch,
) -> Task {
    Box::new(move || {
        set_log_epoch(epoch.0);
        let status = run_unit(generator.as_ref(), &ledger, &uid, epoch);
        // A closed channel means the scheduler is gone and nothing is left to merge into.
        let _ = result_tx.send(WorkResult { uid, epoch, status });
        thumbview_logging::clear_log_epoch();
    })
}

fn run_unit<G: ThumbnailGenerator>(
    generator: &G,
    ledger: &PendingLedger,
    uid: &str,
    epoch: Epoch,
) -> UnitStatus<G::Thumbnail> {
    if !ledger.is_current(epoch) {
        thumb_trace!("skip {uid}: stopped before generation");
        return UnitStatus::Aborted;
    }

    let err = match panic::catch_unwind(AssertUnwindSafe(|| generator.generate(uid))) {
        Ok(Ok(thumbnail)) => return UnitStatus::Generated(thumbnail),
        Ok(Err(err)) => {
            thumb_debug!("generator gave no thumbnail for {uid}: {err}");
            err
        }
        Err(_) => {
            thumb_error!("generator panicked on {uid}");
            GenerateError::new(FailureKind::Panicked, format!("generator panicked on {uid}"))
        }
    };
    // Free the slot right away so the next refresh can retry this uid.
    ledger.release(uid, epoch);
    UnitStatus::Failed(err)
}
