//! Poll a condition until it yields a usable value, or give up.
//!
//! A run polls the condition repeatedly and ends on the first of:
//!
//! - the condition produces a value (`Outcome::Done`, `Some(v)`, `true`)
//! - the condition or an error handler aborts (`Outcome::Aborted`, [`Abort`])
//! - the clock bound (`timeout`) or the retry bound (`max_retry_count`) runs out
//! - more faults than `max_accepted_exceptions` were recorded
//! - a [`CancelToken`](crate::control::CancelToken) fires
//!
//! The blocking and async drivers share one state machine, so equivalent
//! conditions end with the same status either way.
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use waitkit_core::wait;
//!
//! let mut ready = wait::wait()
//!     .until(|_| Ok(std::path::Path::new("/tmp/ready").exists()))
//!     .with_timeout(Duration::from_secs(2))
//!     .throw_on_failure();
//! let result = ready.start()?;
//! assert!(result.has_value());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod builder;
mod engine;
mod error;
mod events;
mod facade;
mod options;
mod outcome;
mod policy;
mod result;
mod run;
mod status;

pub use builder::{Async, Blocking, Builder};
pub use error::WaitFailed;
pub use events::{Events, RunEvent, SubscriptionId};
pub use facade::{retry, wait, Facade, RETRY_PROFILE, WAIT_PROFILE};
pub use options::Options;
pub use outcome::{Abort, Attempt, Fault, IntoOutcome, Outcome};
pub use policy::{BoxFuture, OnError};
pub use result::{ResultBuilder, WaitResult};
pub use status::Status;

#[cfg(test)]
mod tests;
