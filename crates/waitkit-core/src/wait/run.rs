//! Per-run state machine shared by the blocking and async drivers.
//!
//! Every decision about when a run ends lives here; the drivers only call
//! the condition, ask the policy, and pause.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::control::CancelToken;

use super::builder::Settings;
use super::error::{failure_message, WaitFailed};
use super::events::{Events, RunEvent};
use super::options::Options;
use super::outcome::{Abort, Attempt, Fault, IntoOutcome, Outcome};
use super::policy::Decision;
use super::result::{ResultBuilder, WaitResult};
use super::status::Status;

/// What the driver should do after a poll.
#[derive(Debug)]
pub(crate) enum Flow {
    /// Keep polling.
    Continue,
    /// The run has its terminal status.
    Stop,
    /// A fault was recorded; consult the policy, then `settle_fault`.
    Fault(Fault),
}

pub(crate) struct RunContext<T> {
    profile: String,
    tags: BTreeMap<String, String>,
    options: Options,
    throw_on_failure: bool,
    message: Option<String>,
    events: Arc<Events>,
    cancel: Option<CancelToken>,
    started: Instant,
    retry_count: u32,
    calls: u32,
    result: ResultBuilder<T>,
}

impl<T> RunContext<T> {
    /// Snapshot the builder's settings and fire the starting event.
    pub(crate) fn begin(settings: &Settings<T>) -> Self {
        let run = Self {
            profile: settings.profile.clone(),
            tags: settings.tags.clone(),
            options: settings.options.clone(),
            throw_on_failure: settings.throw_on_failure,
            message: settings.message.clone(),
            events: Arc::clone(&settings.events),
            cancel: settings.cancel.clone(),
            started: Instant::now(),
            retry_count: 0,
            calls: 0,
            result: ResultBuilder::new(),
        };
        tracing::debug!(
            profile = %run.profile,
            timeout_ms = ?run.options.timeout_ms(),
            max_retry_count = ?run.options.max_retry_count,
            "wait starting"
        );
        run.events.emit_starting(&run.event(Duration::ZERO));
        run
    }

    fn event(&self, elapsed: Duration) -> RunEvent {
        RunEvent {
            profile: self.profile.clone(),
            tags: self.tags.clone(),
            options: self.options.clone(),
            status: self.result.status(),
            elapsed,
            attempts: self.calls,
            faults: self.result.fault_count(),
        }
    }

    pub(crate) fn time_gap(&self) -> Duration {
        self.options.time_gap
    }

    pub(crate) fn cancel_token(&self) -> Option<&CancelToken> {
        self.cancel.as_ref()
    }

    /// Instant at which the clock bound runs out, if there is one.
    pub(crate) fn deadline(&self) -> Option<Instant> {
        self.options
            .timeout
            .and_then(|t| self.started.checked_add(t))
    }

    /// Loop-continuation check. On `false` the terminal status is set.
    pub(crate) fn poll_allowed(&mut self) -> bool {
        if self.cancel.as_ref().is_some_and(CancelToken::is_cancelled) {
            self.result.with_status(Status::CANCELLED_BY_TOKEN);
            return false;
        }
        let elapsed = self.started.elapsed();
        if self.options.timeout.is_some_and(|t| elapsed >= t) {
            self.result.with_status(Status::TIMED_OUT);
            return false;
        }
        if self
            .options
            .max_retry_count
            .is_some_and(|max| self.retry_count > max)
        {
            self.result.with_status(Status::TOO_MANY_RETRIES);
            return false;
        }
        true
    }

    /// Snapshot for the next condition call; counts the call.
    pub(crate) fn next_attempt(&mut self) -> Attempt {
        self.calls += 1;
        Attempt {
            retry_count: self.retry_count,
            elapsed: self.started.elapsed(),
            faults: self.result.fault_count(),
        }
    }

    /// Interpret what the condition returned.
    pub(crate) fn observe<O>(&mut self, returned: anyhow::Result<O>) -> Flow
    where
        O: IntoOutcome<Value = T>,
    {
        match returned.map(IntoOutcome::into_outcome) {
            Ok(Outcome::Pending) => Flow::Continue,
            Ok(Outcome::Done(value)) => {
                self.result.with_value(value);
                Flow::Stop
            }
            Ok(Outcome::Aborted(None)) => {
                self.result
                    .with_status(Status::CALLER_ABORTED_WITHOUT_VALUE);
                Flow::Stop
            }
            Ok(Outcome::Aborted(Some(value))) => {
                self.result
                    .with_value(value)
                    .with_status(Status::CALLER_ABORTED_WITH_VALUE);
                Flow::Stop
            }
            Err(e) if Abort::is_abort(&e) => {
                tracing::debug!(profile = %self.profile, reason = %e, "condition aborted the wait");
                self.result
                    .with_status(Status::CALLER_ABORTED_WITHOUT_VALUE);
                Flow::Stop
            }
            Err(e) => {
                let fault: Fault = Arc::new(e);
                self.result.with_exception(Arc::clone(&fault));
                if self.options.trace_exceptions {
                    tracing::debug!(
                        profile = %self.profile,
                        retry_count = self.retry_count,
                        error = %fault,
                        "condition raised"
                    );
                }
                if self.events.emit_exception(&fault) {
                    self.result
                        .with_status(Status::CALLER_ABORTED_WITHOUT_VALUE);
                    return Flow::Stop;
                }
                Flow::Fault(fault)
            }
        }
    }

    /// Apply the policy's verdict for the last fault, then the fault budget.
    /// Returns true when the run is over.
    pub(crate) fn settle_fault(&mut self, decision: Decision<T>) -> bool {
        match decision {
            Decision::Abort => {
                self.result
                    .with_status(Status::CALLER_ABORTED_WITHOUT_VALUE);
                return true;
            }
            Decision::Return(value) => {
                self.result.with_value(value);
                return true;
            }
            Decision::Continue => {}
        }
        if let Some(max) = self.options.max_accepted_exceptions {
            if self.result.fault_count() > max as usize {
                self.result.with_status(Status::TOO_MANY_EXCEPTIONS);
                return true;
            }
        }
        false
    }

    /// Count the finished poll.
    pub(crate) fn advance(&mut self) {
        self.retry_count = self.retry_count.saturating_add(1);
    }

    /// The deadline passed while a condition future was pending.
    pub(crate) fn expire(&mut self) {
        self.result.with_status(Status::TIMED_OUT);
    }

    /// The cancel token fired while a condition future was pending.
    pub(crate) fn cancel(&mut self) {
        self.result.with_status(Status::CANCELLED_BY_TOKEN);
    }

    /// Stop the clock, fire the finished event and produce the result.
    pub(crate) fn finish(self) -> Result<WaitResult<T>, WaitFailed<T>> {
        let elapsed = self.started.elapsed();
        let status = self.result.status();
        self.events.emit_finished(&self.event(elapsed));

        let result = self.result.build(elapsed, self.calls);
        if result.has_value() {
            tracing::debug!(
                profile = %self.profile,
                status = %status,
                attempts = result.attempts(),
                elapsed_ms = elapsed.as_millis() as u64,
                "wait finished"
            );
            return Ok(result);
        }

        let message = self
            .message
            .unwrap_or_else(|| failure_message(status, &self.options));
        tracing::warn!(
            profile = %self.profile,
            status = %status,
            attempts = result.attempts(),
            faults = result.faults().len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "wait ended without a value: {}",
            message
        );
        if self.throw_on_failure {
            Err(WaitFailed::new(message, result))
        } else {
            Ok(result)
        }
    }
}
