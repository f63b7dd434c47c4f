//! Flag-based outcome of a wait run.

use bitflags::bitflags;
use std::fmt;

bitflags! {
    /// Terminal state of a run. Exactly one named outcome is set once the
    /// run ends; `NONE` means the run is still going.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Status: u8 {
        const NONE = 0;
        /// A usable value exists.
        const VALUE_AVAILABLE = 1 << 0;
        /// The caller asked the run to stop.
        const ABORTED = 1 << 1;
        /// The clock bound was hit.
        const TIMEOUT = 1 << 2;
        /// The retry bound was hit; always paired with `TIMEOUT`.
        const RETRY_LIMIT = 1 << 3;
        /// More faults than the budget allows.
        const EXCEPTION_LIMIT = 1 << 4;
        /// A cancel token fired.
        const CANCELLED = 1 << 5;

        const SUCCESS = Self::VALUE_AVAILABLE.bits();
        const CALLER_ABORTED_WITHOUT_VALUE = Self::ABORTED.bits();
        const CALLER_ABORTED_WITH_VALUE = Self::ABORTED.bits() | Self::VALUE_AVAILABLE.bits();
        const TIMED_OUT = Self::TIMEOUT.bits();
        const TOO_MANY_RETRIES = Self::TIMEOUT.bits() | Self::RETRY_LIMIT.bits();
        const TOO_MANY_EXCEPTIONS = Self::EXCEPTION_LIMIT.bits();
        const CANCELLED_BY_TOKEN = Self::CANCELLED.bits();
    }
}

impl Default for Status {
    fn default() -> Self {
        Status::NONE
    }
}

impl Status {
    pub fn has_value(self) -> bool {
        self.contains(Status::VALUE_AVAILABLE)
    }

    pub fn is_aborted(self) -> bool {
        self.contains(Status::ABORTED)
    }

    /// True for any of the named end states.
    pub fn is_terminal(self) -> bool {
        self.name().is_some()
    }

    fn name(self) -> Option<&'static str> {
        const NAMES: [(Status, &str); 7] = [
            (Status::SUCCESS, "success"),
            (Status::CALLER_ABORTED_WITHOUT_VALUE, "caller aborted without value"),
            (Status::CALLER_ABORTED_WITH_VALUE, "caller aborted with value"),
            (Status::TIMED_OUT, "timeout"),
            (Status::TOO_MANY_RETRIES, "too many retries"),
            (Status::TOO_MANY_EXCEPTIONS, "too many exceptions"),
            (Status::CANCELLED_BY_TOKEN, "cancelled"),
        ];
        NAMES
            .iter()
            .find(|(status, _)| *status == self)
            .map(|(_, name)| *name)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None if self.is_empty() => f.write_str("running"),
            None => write!(f, "{:#x}", self.bits()),
        }
    }
}
