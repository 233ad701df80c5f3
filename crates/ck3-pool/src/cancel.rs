//! Cooperative cancellation tokens.
//!
//! Tokens are cheap atomic flags paired with a condvar so that a debounce
//! sleep can be interrupted the moment a newer document version supersedes
//! the task. Cancellation is advisory: running tasks observe it at phase
//! boundaries and between pipeline iterations.

use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

struct TokenInner {
    cancelled: AtomicBool,
    lock: Mutex<()>,
    cvar: Condvar,
}

/// Thread-safe cancellation token with an interruptible sleep.
#[derive(Clone)]
pub struct CancellationToken {
    inner: Arc<TokenInner>,
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancellationToken {
    /// Create a fresh, un-cancelled token.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(TokenInner {
                cancelled: AtomicBool::new(false),
                lock: Mutex::new(()),
                cvar: Condvar::new(),
            }),
        }
    }

    /// Fast atomic check, safe to call in hot loops.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Relaxed)
    }

    /// Mark the token cancelled and wake any sleeper.
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::Release);
        let _guard = self.inner.lock.lock();
        self.inner.cvar.notify_all();
    }

    /// Sleep for `duration` unless cancelled first.
    ///
    /// Returns `true` when the full duration elapsed and `false` when the
    /// token was cancelled before the deadline.
    pub fn sleep(&self, duration: Duration) -> bool {
        if self.is_cancelled() {
            return false;
        }
        let deadline = Instant::now() + duration;
        let mut guard = self.inner.lock.lock();
        while !self.inner.cancelled.load(Ordering::Acquire) {
            if self.inner.cvar.wait_until(&mut guard, deadline).timed_out() {
                return !self.is_cancelled();
            }
        }
        false
    }
}

impl std::fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellationToken").field("cancelled", &self.is_cancelled()).finish()
    }
}
