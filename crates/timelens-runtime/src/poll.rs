//! Bounded, cancellable retry primitive.
//!
//! Startup polling and shutdown confirmation are the same loop with
//! different budgets, so both run through [`poll_until`] and are tested
//! against the same mechanism.

use std::future::Future;
use std::time::Duration;

use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;

use timelens_core::RetryPolicy;

/// Result of a bounded polling run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// The condition held on some attempt.
    Satisfied {
        /// 1-based attempt number that succeeded.
        attempts: u32,
    },
    /// Every attempt in the budget failed.
    Exhausted {
        /// Number of attempts made (equals the policy's `max_attempts`).
        attempts: u32,
        /// Total elapsed time across attempts and sleeps.
        waited: Duration,
    },
    /// The cancellation token fired before the condition held.
    Canceled,
}

/// Repeatedly evaluate `attempt` until it returns `true`, the policy's
/// budget is exhausted, or `cancel` fires.
///
/// The first attempt runs immediately; the fixed interval is slept between
/// attempts, never after the last one. Cancellation is observed both
/// before each attempt and during the inter-attempt sleep, so a pending
/// `stop()` never waits out a full interval.
pub async fn poll_until<F, Fut>(
    policy: RetryPolicy,
    cancel: Option<&CancellationToken>,
    mut attempt: F,
) -> PollOutcome
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let started = Instant::now();

    for n in 1..=policy.max_attempts {
        if cancel.is_some_and(CancellationToken::is_cancelled) {
            return PollOutcome::Canceled;
        }

        if attempt().await {
            return PollOutcome::Satisfied { attempts: n };
        }

        if n == policy.max_attempts {
            break;
        }

        match cancel {
            Some(token) => {
                tokio::select! {
                    () = token.cancelled() => return PollOutcome::Canceled,
                    () = sleep(policy.interval) => {}
                }
            }
            None => sleep(policy.interval).await,
        }
    }

    PollOutcome::Exhausted {
        attempts: policy.max_attempts,
        waited: started.elapsed(),
    }
}
