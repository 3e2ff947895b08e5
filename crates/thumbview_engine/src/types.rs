use thumbview_core::{Epoch, ItemId, Outcome};

use crate::GenerateError;

/// What a worker produced for one unit.
#[derive(Debug)]
pub enum UnitStatus<T> {
    Generated(T),
    /// The claim was already released by the worker.
    Failed(GenerateError),
    /// Cancellation was observed before the generator ran.
    Aborted,
}

/// Message from a worker to the consumer for one dispatched unit.
#[derive(Debug)]
pub struct WorkResult<T> {
    pub uid: ItemId,
    pub epoch: Epoch,
    pub status: UnitStatus<T>,
}

/// One merged result, reported back to the display surface.
///
/// `Applied` entries changed their cell, as did `Failed` ones unless a retry was
/// already running. `Discarded` ones left the model alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Merge {
    pub uid: ItemId,
    pub outcome: Outcome,
}
