//! Clocks for the undo coalescing window
//!
//! The coalescing window is the only internal schedule of a session. Rather
//! than running a timer, the session stores a deadline and compares it with
//! the clock whenever an edit, undo or redo comes in, which keeps event
//! handling single-threaded and deterministic.
//!
//! `SystemClock` reads `Instant::now()` and is not available on
//! `wasm32-unknown-unknown`; hosts there supply their own [`Clock`].
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Source of the current time
pub trait Clock {
    fn now(&self) -> Instant;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Manually advanced clock
///
/// Clones share the same elapsed time, so a test can keep one handle and
/// give another to the session.
#[derive(Debug, Clone)]
pub struct ManualClock {
    origin: Instant,
    elapsed_ms: Arc<AtomicU64>,
}

impl ManualClock {
    /// Create a clock frozen at the current instant
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            elapsed_ms: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Move time forward
    pub fn advance(&self, by: Duration) {
        self.elapsed_ms
            .fetch_add(by.as_millis() as u64, Ordering::SeqCst);
    }

    /// Milliseconds elapsed since creation
    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms.load(Ordering::SeqCst)
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + Duration::from_millis(self.elapsed_ms())
    }
}
