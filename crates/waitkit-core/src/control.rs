//! Cancellation for in-flight waits.
//!
//! A `CancelToken` is shared between the code that owns a run and whoever may
//! want to stop it early (a Ctrl-C handler, a test harness tearing down). The
//! engine checks the token before each poll and wakes up from the inter-poll
//! pause when it fires; the async driver also abandons a pending condition
//! future.

use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

#[derive(Default)]
struct Inner {
    token: CancellationToken,
    lock: Mutex<()>,
    cvar: Condvar,
}

/// Cloneable cancellation flag; all clones observe the same state.
#[derive(Clone, Default)]
pub struct CancelToken {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for CancelToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancelToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.inner.token.cancel();
        // Blocking sleepers re-check the flag under this lock.
        let _guard = self.inner.lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.inner.cvar.notify_all();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.token.is_cancelled()
    }

    /// Block the current thread for `d` or until cancelled. Returns false if
    /// the token fired.
    pub fn sleep(&self, d: Duration) -> bool {
        let guard = self.inner.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let _ = self
            .inner
            .cvar
            .wait_timeout_while(guard, d, |_| !self.is_cancelled())
            .unwrap_or_else(PoisonError::into_inner);
        !self.is_cancelled()
    }

    /// Resolves once the token has been cancelled.
    pub async fn cancelled(&self) {
        self.inner.token.cancelled().await
    }
}
