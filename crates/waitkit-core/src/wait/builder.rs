//! Fluent configuration of a wait and the `start` entry points.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::control::CancelToken;

use super::engine;
use super::error::WaitFailed;
use super::events::Events;
use super::options::Options;
use super::outcome::{Attempt, IntoOutcome};
use super::policy::{ErrorPolicy, OnError};
use super::result::WaitResult;

/// Marker for a condition evaluated on the calling thread.
pub struct Blocking<F>(pub(crate) F);

/// Marker for a condition that returns a future.
pub struct Async<F>(pub(crate) F);

/// Everything about a wait except the condition.
#[derive(Debug)]
pub(crate) struct Settings<T> {
    pub(crate) profile: String,
    pub(crate) options: Options,
    pub(crate) throw_on_failure: bool,
    pub(crate) message: Option<String>,
    pub(crate) policy: Option<ErrorPolicy<T>>,
    pub(crate) events: Arc<Events>,
    pub(crate) cancel: Option<CancelToken>,
    pub(crate) abandon_at_deadline: bool,
    pub(crate) tags: BTreeMap<String, String>,
}

/// A configured wait, ready to `start`.
///
/// Configuration methods consume and return the builder; `start` borrows it
/// mutably, so one builder can run several times in sequence but never
/// concurrently.
pub struct Builder<T, C> {
    condition: C,
    settings: Settings<T>,
}

impl<T, C> std::fmt::Debug for Builder<T, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Builder")
            .field("profile", &self.settings.profile)
            .field("options", &self.settings.options)
            .field("throw_on_failure", &self.settings.throw_on_failure)
            .field("policy", &self.settings.policy)
            .finish_non_exhaustive()
    }
}

impl<T, C> Builder<T, C> {
    pub(crate) fn new(
        profile: impl Into<String>,
        options: Options,
        events: Arc<Events>,
        condition: C,
    ) -> Self {
        Self {
            condition,
            settings: Settings {
                profile: profile.into(),
                options,
                throw_on_failure: false,
                message: None,
                policy: None,
                events,
                cancel: None,
                abandon_at_deadline: false,
                tags: BTreeMap::new(),
            },
        }
    }

    pub(crate) fn with_policy(mut self, policy: ErrorPolicy<T>) -> Self {
        self.settings.policy = Some(policy);
        self
    }

    /// Options this builder runs with (its own copy).
    pub fn options(&self) -> &Options {
        &self.settings.options
    }

    /// Fail with [`WaitFailed`] when the run ends without a value.
    pub fn throw_on_failure(mut self) -> Self {
        self.settings.throw_on_failure = true;
        self.settings.message = None;
        self
    }

    /// Like [`Builder::throw_on_failure`], with a custom error message.
    pub fn throw_on_failure_with(mut self, message: impl Into<String>) -> Self {
        self.settings.throw_on_failure = true;
        self.settings.message = Some(message.into());
        self
    }

    pub fn not_throw_on_failure(mut self) -> Self {
        self.settings.throw_on_failure = false;
        self.settings.message = None;
        self
    }

    pub fn with_max_exception_count(mut self, max: Option<u32>) -> Self {
        self.settings.options.max_accepted_exceptions = max;
        self
    }

    pub fn with_time_gap(mut self, gap: Duration) -> Self {
        self.settings.options.time_gap = gap;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.settings.options.timeout = Some(timeout);
        self
    }

    pub fn without_timeout(mut self) -> Self {
        self.settings.options.timeout = None;
        self
    }

    pub fn with_max_retry_count(mut self, max: Option<u32>) -> Self {
        self.settings.options.max_retry_count = max;
        self
    }

    /// Arbitrary edit of this builder's options.
    pub fn configure(mut self, edit: impl FnOnce(&mut Options)) -> Self {
        edit(&mut self.settings.options);
        self
    }

    /// Stop the run early when `token` is cancelled.
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.settings.cancel = Some(token);
        self
    }

    /// Let the async driver drop a condition future still pending when the
    /// timeout runs out, ending the run with `TIMED_OUT`. Off by default: a
    /// poll that started in time may finish late and still deliver its
    /// value, as it does on the blocking driver.
    pub fn abandon_at_deadline(mut self) -> Self {
        self.settings.abandon_at_deadline = true;
        self
    }

    /// Attach a key/value pair to the starting and finished events.
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.settings.tags.insert(key.into(), value.into());
        self
    }

    /// Choose how faults raised by the condition are handled.
    pub fn on_error(self) -> OnError<T, C> {
        OnError::new(self)
    }
}

impl<T, F> Builder<T, Blocking<F>> {
    /// Poll on the calling thread until the run ends.
    ///
    /// A condition call that never returns blocks past the timeout; only the
    /// async driver can abandon a pending condition (see
    /// [`Builder::abandon_at_deadline`]).
    pub fn start<O>(&mut self) -> Result<WaitResult<T>, WaitFailed<T>>
    where
        F: FnMut(Attempt) -> anyhow::Result<O>,
        O: IntoOutcome<Value = T>,
    {
        engine::drive_blocking(&mut self.settings, &mut self.condition.0)
    }

    /// Run a blocking condition through the async driver. The pause between
    /// polls no longer blocks the thread; each condition call still does.
    pub async fn start_async<O>(&mut self) -> Result<WaitResult<T>, WaitFailed<T>>
    where
        F: FnMut(Attempt) -> anyhow::Result<O>,
        O: IntoOutcome<Value = T>,
    {
        let condition = &mut self.condition.0;
        let mut ready = |attempt: Attempt| std::future::ready(condition(attempt));
        engine::drive_async(&mut self.settings, &mut ready).await
    }
}

impl<T, F> Builder<T, Async<F>> {
    pub async fn start_async<Fut, O>(&mut self) -> Result<WaitResult<T>, WaitFailed<T>>
    where
        F: FnMut(Attempt) -> Fut,
        Fut: Future<Output = anyhow::Result<O>>,
        O: IntoOutcome<Value = T>,
    {
        engine::drive_async(&mut self.settings, &mut self.condition.0).await
    }
}
