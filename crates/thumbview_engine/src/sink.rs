use std::sync::Arc;

use thumbview_core::{DiscardReason, ModelPort, Outcome, PendingLedger, ThumbStatus};
use thumbview_logging::{thumb_debug, thumb_trace, thumb_warn};

use crate::{UnitStatus, WorkResult};

/// Merges finished units into the model. Runs only on the consumer context.
#[derive(Debug, Clone)]
pub struct ResultSink {
    ledger: Arc<PendingLedger>,
}

impl ResultSink {
    pub fn new(ledger: Arc<PendingLedger>) -> Self {
        Self { ledger }
    }

    pub fn apply<M: ModelPort>(&self, model: &mut M, result: WorkResult<M::Thumbnail>) -> Outcome {
        let WorkResult { uid, epoch, status } = result;
        match status {
            UnitStatus::Generated(thumbnail) => {
                // Release first: it both frees the slot and tells us whether the epoch is live.
                if !self.ledger.release(&uid, epoch) {
                    thumb_trace!("discard stale thumbnail for {uid} from {epoch}");
                    return Outcome::Discarded(DiscardReason::Stale);
                }
                model.set(&uid, ThumbStatus::Ready, Some(thumbnail));
                thumb_debug!("merged thumbnail for {uid}");
                Outcome::Applied
            }
            UnitStatus::Failed(err) => {
                if self.ledger.current_epoch() != epoch {
                    thumb_trace!("discard stale failure for {uid} from {epoch}");
                    return Outcome::Discarded(DiscardReason::Stale);
                }
                // The worker released before reporting, so a retry may already be
                // running (pending) or may have won (`Ready`). Leave its cell alone.
                let retried = self.ledger.is_pending(&uid);
                if !retried && model.status(&uid) != Some(ThumbStatus::Ready) {
                    model.set(&uid, ThumbStatus::Failed, None);
                }
                thumb_warn!("no thumbnail for {uid}: {err}");
                Outcome::Failed(err.kind)
            }
            UnitStatus::Aborted => {
                thumb_trace!("unit for {uid} from {epoch} aborted before generation");
                Outcome::Discarded(DiscardReason::Aborted)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GenerateError;
    use thumbview_core::{Epoch, FailureKind, VecModel};

    fn failed(uid: &str, epoch: Epoch) -> WorkResult<String> {
        WorkResult {
            uid: uid.to_string(),
            epoch,
            status: UnitStatus::Failed(GenerateError::not_found(uid)),
        }
    }

    fn setup() -> (ResultSink, Arc<PendingLedger>, VecModel<String>) {
        let ledger = Arc::new(PendingLedger::new());
        let model: VecModel<String> = ["a"].into_iter().collect();
        (ResultSink::new(ledger.clone()), ledger, model)
    }

    #[test]
    fn failure_marks_the_cell_failed() {
        let (sink, ledger, mut model) = setup();
        let epoch = ledger.try_claim("a", ThumbStatus::Pending).unwrap();
        model.set("a", ThumbStatus::Generating, None);
        ledger.release("a", epoch);

        let outcome = sink.apply(&mut model, failed("a", epoch));
        assert_eq!(outcome, Outcome::Failed(FailureKind::NotFound));
        assert_eq!(model.status("a"), Some(ThumbStatus::Failed));
    }

    #[test]
    fn late_failure_does_not_clobber_a_running_retry() {
        let (sink, ledger, mut model) = setup();
        let epoch = ledger.try_claim("a", ThumbStatus::Pending).unwrap();
        model.set("a", ThumbStatus::Generating, None);
        // The worker fails and releases; a refresh re-claims before the failure is merged.
        ledger.release("a", epoch);
        assert_eq!(ledger.try_claim("a", ThumbStatus::Generating), Some(epoch));

        let outcome = sink.apply(&mut model, failed("a", epoch));
        assert_eq!(outcome, Outcome::Failed(FailureKind::NotFound));
        assert_eq!(model.status("a"), Some(ThumbStatus::Generating));
        assert!(ledger.is_pending("a"));

        let retry = WorkResult {
            uid: "a".to_string(),
            epoch,
            status: UnitStatus::Generated("thumb".to_string()),
        };
        assert_eq!(sink.apply(&mut model, retry), Outcome::Applied);
        assert_eq!(model.status("a"), Some(ThumbStatus::Ready));
    }

    #[test]
    fn failure_from_an_old_epoch_is_stale() {
        let (sink, ledger, mut model) = setup();
        let epoch = ledger.try_claim("a", ThumbStatus::Pending).unwrap();
        ledger.stop();

        let outcome = sink.apply(&mut model, failed("a", epoch));
        assert_eq!(outcome, Outcome::Discarded(DiscardReason::Stale));
        assert_eq!(model.status("a"), Some(ThumbStatus::Pending));
    }
}
