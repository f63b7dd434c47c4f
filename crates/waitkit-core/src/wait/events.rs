//! Run observation: starting, finished and exception-occurred subscribers.
//!
//! Subscribers are side-effect only. An `Err` or a panic from a subscriber is
//! logged and swallowed; the one exception is an [`Abort`] returned by an
//! exception-occurred subscriber, which ends the run.

use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use super::options::Options;
use super::outcome::{Abort, Fault};
use super::status::Status;

/// Data bag handed to starting and finished subscribers.
#[derive(Debug, Clone)]
pub struct RunEvent {
    /// Name of the facade the builder came from.
    pub profile: String,
    /// Caller-supplied tags (`Builder::with_tag`).
    pub tags: BTreeMap<String, String>,
    pub options: Options,
    /// `NONE` on the starting event.
    pub status: Status,
    pub elapsed: Duration,
    pub attempts: u32,
    pub faults: usize,
}

/// Handle returned by the `subscribe_*` methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type RunHook = Arc<dyn Fn(&RunEvent) -> anyhow::Result<()> + Send + Sync>;
type FaultHook = Arc<dyn Fn(&Fault) -> anyhow::Result<()> + Send + Sync>;

/// Multicast subscriber lists shared by every builder of one facade.
#[derive(Default)]
pub struct Events {
    next_id: AtomicU64,
    starting: RwLock<Vec<(SubscriptionId, RunHook)>>,
    finished: RwLock<Vec<(SubscriptionId, RunHook)>>,
    exception: RwLock<Vec<(SubscriptionId, FaultHook)>>,
}

impl std::fmt::Debug for Events {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Events")
            .field("starting", &len(&self.starting))
            .field("finished", &len(&self.finished))
            .field("exception", &len(&self.exception))
            .finish()
    }
}

fn len<H>(list: &RwLock<Vec<(SubscriptionId, H)>>) -> usize {
    list.read().unwrap_or_else(PoisonError::into_inner).len()
}

fn push<H>(list: &RwLock<Vec<(SubscriptionId, H)>>, id: SubscriptionId, hook: H) {
    list.write()
        .unwrap_or_else(PoisonError::into_inner)
        .push((id, hook));
}

fn remove<H>(list: &RwLock<Vec<(SubscriptionId, H)>>, id: SubscriptionId) -> bool {
    let mut guard = list.write().unwrap_or_else(PoisonError::into_inner);
    let before = guard.len();
    guard.retain(|(sid, _)| *sid != id);
    guard.len() != before
}

fn snapshot<H: Clone>(list: &RwLock<Vec<(SubscriptionId, H)>>) -> Vec<H> {
    list.read()
        .unwrap_or_else(PoisonError::into_inner)
        .iter()
        .map(|(_, h)| h.clone())
        .collect()
}

/// Result of calling one subscriber, with panics folded into `Err`.
fn guarded(call: impl FnOnce() -> anyhow::Result<()>) -> anyhow::Result<()> {
    match catch_unwind(AssertUnwindSafe(call)) {
        Ok(r) => r,
        Err(_) => Err(anyhow::anyhow!("subscriber panicked")),
    }
}

impl Events {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_id(&self) -> SubscriptionId {
        SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    pub fn subscribe_starting<F>(&self, hook: F) -> SubscriptionId
    where
        F: Fn(&RunEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let id = self.next_id();
        push(&self.starting, id, Arc::new(hook) as RunHook);
        id
    }

    pub fn subscribe_finished<F>(&self, hook: F) -> SubscriptionId
    where
        F: Fn(&RunEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let id = self.next_id();
        push(&self.finished, id, Arc::new(hook) as RunHook);
        id
    }

    pub fn subscribe_exception<F>(&self, hook: F) -> SubscriptionId
    where
        F: Fn(&Fault) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let id = self.next_id();
        push(&self.exception, id, Arc::new(hook) as FaultHook);
        id
    }

    /// Remove a subscriber from whichever list holds it. Returns false if
    /// the id was unknown.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        remove(&self.starting, id) || remove(&self.finished, id) || remove(&self.exception, id)
    }

    pub(crate) fn emit_starting(&self, event: &RunEvent) {
        for hook in snapshot(&self.starting) {
            if let Err(e) = guarded(|| hook(event)) {
                tracing::warn!(profile = %event.profile, error = %e, "starting subscriber failed");
            }
        }
    }

    pub(crate) fn emit_finished(&self, event: &RunEvent) {
        for hook in snapshot(&self.finished) {
            if let Err(e) = guarded(|| hook(event)) {
                tracing::warn!(profile = %event.profile, error = %e, "finished subscriber failed");
            }
        }
    }

    /// Notify exception subscribers. Returns true when one of them asked for
    /// the run to abort.
    pub(crate) fn emit_exception(&self, fault: &Fault) -> bool {
        let mut abort = false;
        for hook in snapshot(&self.exception) {
            match guarded(|| hook(fault)) {
                Ok(()) => {}
                Err(e) if Abort::is_abort(&e) => abort = true,
                Err(e) => {
                    tracing::warn!(error = %e, "exception subscriber failed");
                }
            }
        }
        abort
    }
}
