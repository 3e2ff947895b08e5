use std::fmt;

/// What the consumer did with one finished unit of work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Thumbnail stored and the item marked `Ready`.
    Applied,
    /// Result dropped without touching the model.
    Discarded(DiscardReason),
    /// Generation produced no thumbnail; the item stays eligible for retry.
    Failed(FailureKind),
}

impl Outcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Outcome::Applied)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscardReason {
    /// The unit finished after a stop; its epoch is no longer current.
    Stale,
    /// The worker saw the stop before generating and skipped the unit.
    Aborted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    NotFound,
    Corrupted,
    Panicked,
    PoolShutdown,
    Other(String),
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::NotFound => write!(f, "source not found"),
            FailureKind::Corrupted => write!(f, "source corrupted"),
            FailureKind::Panicked => write!(f, "generator panicked"),
            FailureKind::PoolShutdown => write!(f, "worker pool shutting down"),
            FailureKind::Other(reason) => write!(f, "generation failed: {reason}"),
        }
    }
}
