//! What to do when a condition raises a fault: the `on_error()` sub-builder.

use std::future::Future;
use std::pin::Pin;

use super::builder::{Async, Builder};
use super::outcome::{Abort, Fault};

/// Boxed, sendable future used for type-erased async callbacks.
pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

type CallHook = Box<dyn FnMut(&Fault) -> anyhow::Result<()> + Send>;
type AsyncCallHook = Box<dyn FnMut(Fault) -> BoxFuture<anyhow::Result<()>> + Send>;
type ReturnHook<T> = Box<dyn FnMut(&Fault) -> T + Send>;

/// The single fault policy attached to a builder.
pub(crate) enum ErrorPolicy<T> {
    Abort,
    Call(CallHook),
    CallAsync(AsyncCallHook),
    Return(ReturnHook<T>),
}

impl<T> std::fmt::Debug for ErrorPolicy<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorPolicy::Abort => "Abort",
            ErrorPolicy::Call(_) => "Call",
            ErrorPolicy::CallAsync(_) => "CallAsync",
            ErrorPolicy::Return(_) => "Return",
        };
        f.write_str(name)
    }
}

/// Verdict of the policy for one fault.
#[derive(Debug)]
pub(crate) enum Decision<T> {
    Continue,
    Abort,
    Return(T),
}

fn from_handler<T>(outcome: anyhow::Result<()>) -> Decision<T> {
    match outcome {
        Ok(()) => Decision::Continue,
        Err(e) if Abort::is_abort(&e) => Decision::Abort,
        Err(e) => {
            tracing::warn!(error = %e, "error handler failed");
            Decision::Continue
        }
    }
}

pub(crate) fn decide_blocking<T>(policy: Option<&mut ErrorPolicy<T>>, fault: &Fault) -> Decision<T> {
    match policy {
        None => Decision::Continue,
        Some(ErrorPolicy::Abort) => Decision::Abort,
        Some(ErrorPolicy::Call(hook)) => from_handler(hook(fault)),
        Some(ErrorPolicy::Return(hook)) => Decision::Return(hook(fault)),
        Some(ErrorPolicy::CallAsync(_)) => {
            tracing::warn!("async error handler ignored by blocking run");
            Decision::Continue
        }
    }
}

pub(crate) async fn decide_async<T>(
    policy: Option<&mut ErrorPolicy<T>>,
    fault: &Fault,
) -> Decision<T> {
    match policy {
        Some(ErrorPolicy::CallAsync(hook)) => from_handler(hook(fault.clone()).await),
        other => decide_blocking(other, fault),
    }
}

/// Sub-builder returned by `Builder::on_error`. Each method attaches the
/// policy, replacing any earlier one, and hands the builder back.
pub struct OnError<T, C> {
    builder: Builder<T, C>,
}

impl<T, C> OnError<T, C> {
    pub(crate) fn new(builder: Builder<T, C>) -> Self {
        Self { builder }
    }

    /// End the run with `CALLER_ABORTED_WITHOUT_VALUE` on the first fault.
    pub fn abort(self) -> Builder<T, C> {
        self.builder.with_policy(ErrorPolicy::Abort)
    }

    /// Observe each fault and keep polling. Returning [`Abort`] from the
    /// handler ends the run; any other error is logged and ignored.
    pub fn call<H>(self, handler: H) -> Builder<T, C>
    where
        H: FnMut(&Fault) -> anyhow::Result<()> + Send + 'static,
    {
        self.builder.with_policy(ErrorPolicy::Call(Box::new(handler)))
    }

    /// End the run successfully with `value` on the first fault.
    pub fn return_value(self, value: T) -> Builder<T, C>
    where
        T: Clone + Send + 'static,
    {
        self.return_with(move |_| value.clone())
    }

    /// End the run successfully with a value derived from the fault.
    pub fn return_with<G>(self, factory: G) -> Builder<T, C>
    where
        G: FnMut(&Fault) -> T + Send + 'static,
    {
        self.builder.with_policy(ErrorPolicy::Return(Box::new(factory)))
    }
}

impl<T, F> OnError<T, Async<F>> {
    /// Async form of [`OnError::call`].
    pub fn call_async<H, Fut>(self, mut handler: H) -> Builder<T, Async<F>>
    where
        H: FnMut(Fault) -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let hook: AsyncCallHook =
            Box::new(move |fault| -> BoxFuture<anyhow::Result<()>> { Box::pin(handler(fault)) });
        self.builder.with_policy(ErrorPolicy::CallAsync(hook))
    }
}
