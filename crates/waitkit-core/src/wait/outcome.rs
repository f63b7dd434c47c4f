//! What a condition reports back on each poll.

use std::sync::Arc;
use std::time::Duration;

/// A fault raised by a condition and recorded in the run's result.
pub type Fault = Arc<anyhow::Error>;

/// Result of a single poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    /// Nothing usable yet; keep polling.
    Pending,
    /// A usable value; the run succeeds.
    Done(T),
    /// Stop immediately, optionally handing back a value.
    Aborted(Option<T>),
}

/// Conversion from what a condition returns into an [`Outcome`].
///
/// `Option<T>` maps `None` to `Pending`, so `Some(0)` is a real value.
/// `bool` maps `false` to `Pending` and `true` to `Done(true)`.
pub trait IntoOutcome {
    type Value;

    fn into_outcome(self) -> Outcome<Self::Value>;
}

impl<T> IntoOutcome for Outcome<T> {
    type Value = T;

    fn into_outcome(self) -> Outcome<T> {
        self
    }
}

impl<T> IntoOutcome for Option<T> {
    type Value = T;

    fn into_outcome(self) -> Outcome<T> {
        match self {
            Some(v) => Outcome::Done(v),
            None => Outcome::Pending,
        }
    }
}

impl IntoOutcome for bool {
    type Value = bool;

    fn into_outcome(self) -> Outcome<bool> {
        if self {
            Outcome::Done(true)
        } else {
            Outcome::Pending
        }
    }
}

/// Returned as an error to stop a run with `CALLER_ABORTED_WITHOUT_VALUE`.
///
/// Honored from a condition, from an `on_error().call(..)` handler and from
/// an exception-occurred subscriber. It never counts against the fault
/// budget.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("aborted: {message}")]
pub struct Abort {
    pub message: String,
}

impl Abort {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Ready-made `Err` for use as a condition's return value.
    pub fn err<T>(message: impl Into<String>) -> anyhow::Result<T> {
        Err(Self::new(message).into())
    }

    pub(crate) fn is_abort(err: &anyhow::Error) -> bool {
        err.downcast_ref::<Abort>().is_some()
    }
}

/// Snapshot handed to the condition on every poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attempt {
    /// 0 on the first poll.
    pub retry_count: u32,
    pub elapsed: Duration,
    /// Faults recorded before this poll.
    pub faults: usize,
}
