//! Lock-Timeout Controller.
//!
//! A position update locks a single contended row. Under load it is better
//! for that wait to fail fast and surface the retryable contention signal
//! than to queue for the engine's full default timeout. The controller
//! installs a short lock-wait timeout for the duration of a critical section
//! and withdraws it on every exit path, including errors and panics, via
//! `Drop`.
//!
//! The override is session-scoped: it lives in a thread-local stack of open
//! windows and only affects lock waits on the opening thread. The engine-wide
//! value is never written, so concurrent sessions cannot clobber each other's
//! timeout no matter how their windows interleave.

use std::cell::RefCell;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use super::engine::Engine;
use super::errors::StoreResult;

/// Tight-window timeout used when none is configured.
pub const DEFAULT_TIGHT_WINDOW: Duration = Duration::from_secs(5);

static NEXT_TOKEN: AtomicU64 = AtomicU64::new(1);

thread_local! {
    /// Open windows on this thread, innermost last.
    static OPEN_WINDOWS: RefCell<Vec<(u64, Duration)>> = const { RefCell::new(Vec::new()) };
}

/// Scoped session override of the lock-wait timeout. While one is open, lock
/// waits started on this thread use its timeout instead of the engine-wide
/// default.
#[derive(Debug)]
pub struct LockWindow {
    token: u64,
    timeout: Duration,
}

impl LockWindow {
    /// Open a window installing `timeout` for the current session.
    pub fn tight(timeout: Duration) -> Self {
        let token = NEXT_TOKEN.fetch_add(1, Ordering::Relaxed);
        OPEN_WINDOWS.with(|windows| windows.borrow_mut().push((token, timeout)));
        Self { token, timeout }
    }

    /// The override in force on this thread, if any window is open.
    pub fn active() -> Option<Duration> {
        OPEN_WINDOWS.with(|windows| windows.borrow().last().map(|(_, timeout)| *timeout))
    }

    /// This window's timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Drop for LockWindow {
    fn drop(&mut self) {
        OPEN_WINDOWS.with(|windows| {
            windows.borrow_mut().retain(|(token, _)| *token != self.token);
        });
    }
}

impl Engine {
    /// Timeout for the next lock wait on this thread: the innermost open
    /// window's value, or the engine-wide default.
    pub fn effective_lock_wait_timeout(&self) -> Duration {
        LockWindow::active().unwrap_or_else(|| self.lock_wait_timeout())
    }

    /// Run `f` with the session's lock-wait timeout tightened to `timeout`.
    /// The override is withdrawn whether `f` succeeds, fails, or panics.
    pub fn with_tight_lock_window<T>(
        &self,
        timeout: Duration,
        f: impl FnOnce(&Engine) -> StoreResult<T>,
    ) -> StoreResult<T> {
        let _window = LockWindow::tight(timeout);
        f(self)
    }
}
