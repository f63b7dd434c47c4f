//! Error raised when a run opted into throw-on-failure and ended without a value.

use std::fmt;

use super::options::Options;
use super::result::WaitResult;
use super::status::Status;

/// A run that ended without a value while throw-on-failure was set.
///
/// Carries the same [`WaitResult`] the run would have returned otherwise.
#[derive(Debug)]
pub struct WaitFailed<T> {
    message: String,
    result: WaitResult<T>,
}

impl<T> WaitFailed<T> {
    pub(crate) fn new(message: String, result: WaitResult<T>) -> Self {
        Self { message, result }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn result(&self) -> &WaitResult<T> {
        &self.result
    }

    pub fn into_result(self) -> WaitResult<T> {
        self.result
    }

    pub fn status(&self) -> Status {
        self.result.status()
    }
}

impl<T> fmt::Display for WaitFailed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl<T: fmt::Debug> std::error::Error for WaitFailed<T> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.result.faults().last().map(|f| {
            let inner: &(dyn std::error::Error + Send + Sync + 'static) = &***f;
            inner as &(dyn std::error::Error + 'static)
        })
    }
}

/// Default message for a failed run with the given status.
pub(crate) fn failure_message(status: Status, options: &Options) -> String {
    if status.is_aborted() {
        "aborted by caller".to_string()
    } else if status == Status::TOO_MANY_RETRIES {
        format!(
            "exceeded {} retries",
            options.max_retry_count.unwrap_or_default()
        )
    } else if status == Status::TIMED_OUT {
        let secs = options.timeout.map(|t| t.as_secs_f64()).unwrap_or_default();
        format!("timed out after {:.2} seconds", secs)
    } else if status == Status::TOO_MANY_EXCEPTIONS {
        format!(
            "exceeded {} accepted exceptions",
            options.max_accepted_exceptions.unwrap_or_default()
        )
    } else if status == Status::CANCELLED_BY_TOKEN {
        "cancelled".to_string()
    } else {
        format!("wait ended without a value ({})", status)
    }
}
