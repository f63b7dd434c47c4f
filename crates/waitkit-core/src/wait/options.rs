use std::time::Duration;

/// Tunable limits for a wait run.
///
/// Every builder clones its options at creation time, so changing a facade's
/// defaults afterwards never reaches builders that already exist. No
/// validation happens on assignment; a zero gap or a zero timeout is taken
/// as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    /// Log every recorded fault at debug level.
    pub trace_exceptions: bool,
    /// Number of faults tolerated before the run ends with
    /// `TOO_MANY_EXCEPTIONS`. `None` = unlimited.
    pub max_accepted_exceptions: Option<u32>,
    /// Highest retry counter value that may still poll. `None` = unlimited.
    pub max_retry_count: Option<u32>,
    /// Clock bound for the run. `None` = unbounded.
    pub timeout: Option<Duration>,
    /// Pause between two polls.
    pub time_gap: Duration,
}

impl Default for Options {
    fn default() -> Self {
        Self::wait_profile()
    }
}

impl Options {
    /// Short, clock-bounded profile for synchronizing against UI state.
    pub fn wait_profile() -> Self {
        Self {
            trace_exceptions: true,
            max_accepted_exceptions: None,
            max_retry_count: None,
            timeout: Some(Duration::from_secs(5)),
            time_gap: Duration::from_millis(100),
        }
    }

    /// Count-bounded profile for retrying idempotent actions.
    pub fn retry_profile() -> Self {
        Self {
            trace_exceptions: true,
            max_accepted_exceptions: None,
            max_retry_count: Some(3),
            timeout: None,
            time_gap: Duration::ZERO,
        }
    }

    pub fn timeout_ms(&self) -> Option<u64> {
        self.timeout.map(saturating_millis)
    }

    pub fn set_timeout_ms(&mut self, ms: Option<u64>) {
        self.timeout = ms.map(Duration::from_millis);
    }

    pub fn time_gap_ms(&self) -> u64 {
        saturating_millis(self.time_gap)
    }

    pub fn set_time_gap_ms(&mut self, ms: u64) {
        self.time_gap = Duration::from_millis(ms);
    }
}

fn saturating_millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
