//! Retry policies for health polling.
//!
//! Startup polling and shutdown confirmation share one mechanism with
//! different constants: a bounded number of attempts at a fixed interval.
//! The executor lives in the runtime crate; this is pure configuration.

use std::time::Duration;

/// A bounded retry budget: at most `max_attempts` attempts, sleeping
/// `interval` between consecutive attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of attempts before giving up.
    pub max_attempts: u32,
    /// Fixed delay between consecutive attempts.
    pub interval: Duration,
}

impl RetryPolicy {
    /// Default budget for startup polling: 30 attempts at 1 s, bounding
    /// the total wait to half a minute.
    pub const STARTUP: Self = Self {
        max_attempts: 30,
        interval: Duration::from_millis(1000),
    };

    /// Default budget for confirming an external backend's shutdown.
    /// Deliberately shorter than startup - the local decision is best
    /// effort either way.
    pub const SHUTDOWN_CONFIRM: Self = Self {
        max_attempts: 10,
        interval: Duration::from_millis(500),
    };

    /// Create a policy from explicit values.
    #[must_use]
    pub const fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts,
            interval,
        }
    }

    /// Upper bound on the total time spent sleeping between attempts.
    #[must_use]
    pub fn max_sleep(&self) -> Duration {
        self.interval * self.max_attempts.saturating_sub(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn startup_budget_bounds_total_wait() {
        let total = RetryPolicy::STARTUP.max_sleep();
        assert_eq!(total, Duration::from_secs(29));
    }

    #[test]
    fn shutdown_budget_is_shorter_than_startup() {
        assert!(RetryPolicy::SHUTDOWN_CONFIRM.max_sleep() < RetryPolicy::STARTUP.max_sleep());
    }

    #[test]
    fn single_attempt_never_sleeps() {
        let policy = RetryPolicy::new(1, Duration::from_secs(10));
        assert_eq!(policy.max_sleep(), Duration::ZERO);
    }
}
