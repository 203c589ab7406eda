//! Frame statistics.
//!
//! The draw-call counter is process-wide and monotonic within a frame; the
//! external driver resets it once per frame (or never, for lifetime totals).

use std::sync::atomic::{AtomicU64, Ordering};

static DRAW_CALLS: AtomicU64 = AtomicU64::new(0);

#[inline]
pub(crate) fn record_draw_call() {
    DRAW_CALLS.fetch_add(1, Ordering::Relaxed);
}

/// Draw calls issued since the last [`reset_draw_calls`].
pub fn draw_calls() -> u64 {
    DRAW_CALLS.load(Ordering::Relaxed)
}

/// Resets the counter. Call at frame start for per-frame profiling, or from
/// tests for isolation.
pub fn reset_draw_calls() {
    DRAW_CALLS.store(0, Ordering::Relaxed);
}
