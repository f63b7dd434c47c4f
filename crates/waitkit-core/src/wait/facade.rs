//! Entry points: a facade owns default options and event subscribers and
//! hands out builders.
//!
//! Two process-wide facades exist, [`wait()`] for UI-state synchronization
//! and [`retry()`] for bounded action retries. They are independent of each
//! other. Code that needs isolation (tests, parallel suites) should build its
//! own [`Facade`] and pass it around instead of touching the globals.

use std::future::Future;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use super::builder::{Async, Blocking, Builder};
use super::events::Events;
use super::options::Options;
use super::outcome::{Attempt, IntoOutcome};
use super::policy::BoxFuture;

pub const WAIT_PROFILE: &str = "wait";
pub const RETRY_PROFILE: &str = "retry";

/// Default options plus event subscribers shared by every builder created
/// from it.
#[derive(Debug)]
pub struct Facade {
    name: String,
    defaults: RwLock<Options>,
    events: Arc<Events>,
}

impl Facade {
    pub fn new(name: impl Into<String>, defaults: Options) -> Self {
        Self {
            name: name.into(),
            defaults: RwLock::new(defaults),
            events: Arc::new(Events::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Copy of the current defaults.
    pub fn defaults(&self) -> Options {
        self.defaults
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the defaults. Builders created earlier keep their own copy.
    pub fn set_defaults(&self, options: Options) {
        *self.defaults.write().unwrap_or_else(PoisonError::into_inner) = options;
    }

    pub fn update_defaults(&self, edit: impl FnOnce(&mut Options)) {
        edit(&mut self.defaults.write().unwrap_or_else(PoisonError::into_inner));
    }

    pub fn events(&self) -> &Events {
        &self.events
    }

    fn builder<T, C>(&self, condition: C) -> Builder<T, C> {
        Builder::new(
            self.name.clone(),
            self.defaults(),
            Arc::clone(&self.events),
            condition,
        )
    }

    /// Poll `condition` on the calling thread.
    pub fn until<T, F, O>(&self, condition: F) -> Builder<T, Blocking<F>>
    where
        F: FnMut(Attempt) -> anyhow::Result<O>,
        O: IntoOutcome<Value = T>,
    {
        self.builder(Blocking(condition))
    }

    /// Poll an async `condition`.
    pub fn until_async<T, F, Fut, O>(&self, condition: F) -> Builder<T, Async<F>>
    where
        F: FnMut(Attempt) -> Fut,
        Fut: Future<Output = anyhow::Result<O>>,
        O: IntoOutcome<Value = T>,
    {
        self.builder(Async(condition))
    }

    /// Retry `action` until it returns `Ok(())`; the value is `true`.
    pub fn action<F>(
        &self,
        mut action: F,
    ) -> Builder<bool, Blocking<impl FnMut(Attempt) -> anyhow::Result<bool>>>
    where
        F: FnMut(Attempt) -> anyhow::Result<()>,
    {
        self.until(move |attempt| action(attempt).map(|()| true))
    }

    /// Async form of [`Facade::action`].
    pub fn action_async<F, Fut>(
        &self,
        mut action: F,
    ) -> Builder<bool, Async<impl FnMut(Attempt) -> BoxFuture<anyhow::Result<bool>>>>
    where
        F: FnMut(Attempt) -> Fut,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.until_async(move |attempt| -> BoxFuture<anyhow::Result<bool>> {
            let pending = action(attempt);
            Box::pin(async move { pending.await.map(|()| true) })
        })
    }
}

/// Process-wide facade for short UI-state waits.
pub fn wait() -> &'static Facade {
    static WAIT: OnceLock<Facade> = OnceLock::new();
    WAIT.get_or_init(|| Facade::new(WAIT_PROFILE, Options::wait_profile()))
}

/// Process-wide facade for bounded action retries.
pub fn retry() -> &'static Facade {
    static RETRY: OnceLock<Facade> = OnceLock::new();
    RETRY.get_or_init(|| Facade::new(RETRY_PROFILE, Options::retry_profile()))
}
