use std::collections::BTreeSet;

use crate::config::DEFAULT_READ_AHEAD_MULTIPLIER;

/// Half-open range `[start, end)` of item indices currently on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowRequest {
    pub start: usize,
    pub end: usize,
}

impl WindowRequest {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn span(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

/// How far past the visible range to prefetch, as a multiple of the visible span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadAhead {
    multiplier: u32,
}

impl ReadAhead {
    /// Multipliers below 2 are raised to 2 so the window never shrinks to the visible range.
    pub fn new(multiplier: u32) -> Self {
        Self {
            multiplier: multiplier.max(DEFAULT_READ_AHEAD_MULTIPLIER),
        }
    }

    pub fn multiplier(&self) -> u32 {
        self.multiplier
    }

    fn half_width(&self, span: usize) -> usize {
        span.saturating_mul(self.multiplier as usize) / 2
    }
}

impl Default for ReadAhead {
    fn default() -> Self {
        Self::new(DEFAULT_READ_AHEAD_MULTIPLIER)
    }
}

/// Indices that should have a thumbnail ready for the given visible range.
///
/// The window is centered one past the visible midpoint, `mid = (start + end) / 2 + 1`,
/// and extends `span * multiplier / 2` items to each side, clipped to `[0, item_count)`.
/// With the default multiplier this is `[mid - span, mid + span)`.
///
/// Returns an empty set when nothing is visible; callers skip dispatch entirely.
pub fn compute_required(
    visible: Option<WindowRequest>,
    item_count: usize,
    read_ahead: ReadAhead,
) -> BTreeSet<usize> {
    let Some(visible) = visible.filter(|v| !v.is_empty()) else {
        return BTreeSet::new();
    };
    if item_count == 0 {
        return BTreeSet::new();
    }

    // Same as `(start + end) / 2 + 1`, without overflowing near `usize::MAX`.
    let mid = visible
        .start
        .saturating_add(visible.span() / 2)
        .saturating_add(1);
    let half = read_ahead.half_width(visible.span());
    let lo = mid.saturating_sub(half);
    let hi = mid.saturating_add(half).min(item_count);

    (lo..hi).collect()
}
