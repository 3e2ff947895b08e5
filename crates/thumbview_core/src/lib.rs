//! Thumbview core: window math, the claim ledger and the item model port.
mod config;
mod ledger;
mod model;
mod outcome;
mod window;

pub use config::{ConfigError, SchedulerConfig, DEFAULT_READ_AHEAD_MULTIPLIER};
pub use ledger::{Epoch, PendingLedger, SchedulerState};
pub use model::{ItemId, ModelPort, ThumbStatus, VecModel};
pub use outcome::{DiscardReason, FailureKind, Outcome};
pub use window::{compute_required, ReadAhead, WindowRequest};
