//! Immutable run outcome and the builder a run fills in as it goes.

use std::time::Duration;

use super::outcome::Fault;
use super::status::Status;

/// Outcome of one run.
#[derive(Debug, Clone)]
pub struct WaitResult<T> {
    status: Status,
    value: Option<T>,
    elapsed: Duration,
    attempts: u32,
    faults: Vec<Fault>,
}

impl<T> WaitResult<T> {
    pub fn status(&self) -> Status {
        self.status
    }

    /// The value, present only when the status carries `VALUE_AVAILABLE`.
    pub fn value(&self) -> Option<&T> {
        self.value.as_ref()
    }

    pub fn into_value(self) -> Option<T> {
        self.value
    }

    pub fn has_value(&self) -> bool {
        self.status.has_value()
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Number of times the condition was invoked.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Every fault recorded during the run, tolerated ones included.
    pub fn faults(&self) -> &[Fault] {
        &self.faults
    }
}

/// Mutable accumulator owned by exactly one run.
#[derive(Debug)]
pub struct ResultBuilder<T> {
    status: Status,
    value: Option<T>,
    faults: Vec<Fault>,
}

impl<T> Default for ResultBuilder<T> {
    fn default() -> Self {
        Self {
            status: Status::NONE,
            value: None,
            faults: Vec::new(),
        }
    }
}

impl<T> ResultBuilder<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a value and mark it available. A later `with_status` can
    /// refine the status.
    pub fn with_value(&mut self, value: T) -> &mut Self {
        self.value = Some(value);
        self.status = Status::SUCCESS;
        self
    }

    /// Set the status; the value is dropped unless the status carries one.
    pub fn with_status(&mut self, status: Status) -> &mut Self {
        self.status = status;
        if !status.has_value() {
            self.value = None;
        }
        self
    }

    /// Append a fault without touching the status.
    pub fn with_exception(&mut self, fault: Fault) -> &mut Self {
        self.faults.push(fault);
        self
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn fault_count(&self) -> usize {
        self.faults.len()
    }

    pub fn build(self, elapsed: Duration, attempts: u32) -> WaitResult<T> {
        let value = if self.status.has_value() {
            self.value
        } else {
            None
        };
        WaitResult {
            status: self.status,
            value,
            elapsed,
            attempts,
            faults: self.faults,
        }
    }
}
