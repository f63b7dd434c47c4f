//! Shared helpers for the engine integration tests.

#![allow(dead_code)]

use std::time::Duration;

use waitkit_core::wait::{Abort, Attempt, Facade, Options, Outcome};

/// Isolated facade so tests never touch the process-wide defaults.
pub fn facade(timeout: Duration, gap: Duration) -> Facade {
    Facade::new(
        "it",
        Options {
            trace_exceptions: true,
            max_accepted_exceptions: None,
            max_retry_count: None,
            timeout: Some(timeout),
            time_gap: gap,
        },
    )
}

/// Deterministic condition behaviours keyed on the retry counter, usable
/// from both drivers.
#[derive(Debug, Clone, Copy)]
pub enum Script {
    /// Pending until the n-th call (1-based), then `Done(n)`.
    ReadyOnCall(u32),
    /// Always pending.
    NeverReady,
    /// Always raises a fault.
    AlwaysFails,
    /// Raises on the first n calls, then `Done(0)`.
    FailsThenReady(u32),
    /// Pending, then aborts with a value on the n-th call.
    AbortsWithValueOnCall(u32),
    /// Returns `Abort` on the first call.
    AbortsImmediately,
}

impl Script {
    pub fn step(self, attempt: Attempt) -> anyhow::Result<Outcome<u32>> {
        let call = attempt.retry_count + 1;
        match self {
            Script::ReadyOnCall(n) if call >= n => Ok(Outcome::Done(n)),
            Script::ReadyOnCall(_) | Script::NeverReady => Ok(Outcome::Pending),
            Script::AlwaysFails => anyhow::bail!("fault on call {call}"),
            Script::FailsThenReady(n) if call <= n => anyhow::bail!("fault on call {call}"),
            Script::FailsThenReady(_) => Ok(Outcome::Done(0)),
            Script::AbortsWithValueOnCall(n) if call >= n => Ok(Outcome::Aborted(Some(call))),
            Script::AbortsWithValueOnCall(_) => Ok(Outcome::Pending),
            Script::AbortsImmediately => Abort::err("stop"),
        }
    }
}
