//! Retry governor.
//!
//! Runs one fallible async operation under a fixed attempt budget:
//!
//! 1. cancelled before an attempt → `Cancelled`, operation not invoked
//! 2. success → return
//! 3. error the predicate rejects → `Terminal`
//! 4. final attempt failed → `Exhausted`, wrapping the last error
//! 5. otherwise wait `interval` (woken early by cancellation) and loop

use std::future::Future;
use std::time::Duration;

use thiserror::Error;
use tokio_util::sync::CancellationToken;

use keel_core::Settings;

/// Attempt budget and fixed backoff interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, first call included. Zero is treated as one.
    pub attempts: u32,
    pub interval: Duration,
}

impl RetryPolicy {
    pub fn new(attempts: u32, interval: Duration) -> Self {
        Self { attempts, interval }
    }

    /// Policy for add and update calls.
    pub fn mutate(settings: &Settings) -> Self {
        Self::new(settings.retry_attempts, settings.mutate_interval())
    }

    /// Policy for delete calls.
    pub fn delete(settings: &Settings) -> Self {
        Self::new(settings.retry_attempts, settings.delete_interval())
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::mutate(&Settings::default())
    }
}

/// Why the governor gave up.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RetryError<E> {
    #[error("cancelled")]
    Cancelled,

    #[error("{0}")]
    Terminal(E),

    #[error("retry budget exhausted after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: E },
}

/// Predicate for callers that retry nothing.
pub fn never<E>(_: &E) -> bool {
    false
}

/// Run `operation` until it succeeds, fails terminally, exhausts the budget,
/// or `cancel` fires.
pub async fn attempt<T, E, F, Fut, P>(
    policy: RetryPolicy,
    cancel: &CancellationToken,
    mut operation: F,
    is_retryable: P,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    P: Fn(&E) -> bool,
{
    let budget = policy.attempts.max(1);
    let mut attempt = 0u32;
    loop {
        if cancel.is_cancelled() {
            return Err(RetryError::Cancelled);
        }
        attempt += 1;

        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };
        if !is_retryable(&err) {
            return Err(RetryError::Terminal(err));
        }
        if attempt >= budget {
            return Err(RetryError::Exhausted {
                attempts: attempt,
                last: err,
            });
        }

        tracing::warn!(
            attempt,
            budget,
            wait_secs = policy.interval.as_secs(),
            "retryable failure; backing off",
        );
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(RetryError::Cancelled),
            _ = tokio::time::sleep(policy.interval) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    use tokio::time::Instant;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Fault {
        Busy,
        Invalid,
    }

    fn busy_only(err: &Fault) -> bool {
        *err == Fault::Busy
    }

    fn policy(attempts: u32) -> RetryPolicy {
        RetryPolicy::new(attempts, Duration::from_secs(15))
    }

    #[tokio::test(start_paused = true)]
    async fn success_on_first_attempt_does_not_wait() {
        let cancel = CancellationToken::new();
        let started = Instant::now();
        let calls = AtomicU32::new(0);

        let out: Result<u32, RetryError<Fault>> = attempt(
            policy(10),
            &cancel,
            || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(7)
            },
            busy_only,
        )
        .await;

        assert_eq!(out, Ok(7));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn always_conflict_uses_whole_budget_then_exhausts() {
        let cancel = CancellationToken::new();
        let started = Instant::now();
        let calls = AtomicU32::new(0);

        let out: Result<(), _> = attempt(
            policy(10),
            &cancel,
            || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(Fault::Busy)
            },
            busy_only,
        )
        .await;

        assert_eq!(
            out,
            Err(RetryError::Exhausted {
                attempts: 10,
                last: Fault::Busy,
            })
        );
        assert_eq!(calls.load(Ordering::SeqCst), 10);
        // Nine waits between ten attempts.
        assert_eq!(started.elapsed(), Duration::from_secs(9 * 15));
    }

    #[tokio::test(start_paused = true)]
    async fn terminal_error_stops_after_one_call() {
        let cancel = CancellationToken::new();
        let calls = AtomicU32::new(0);

        let out: Result<(), _> = attempt(
            policy(10),
            &cancel,
            || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(Fault::Invalid)
            },
            busy_only,
        )
        .await;

        assert_eq!(out, Err(RetryError::Terminal(Fault::Invalid)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn conflict_then_success_recovers() {
        let cancel = CancellationToken::new();
        let calls = AtomicU32::new(0);

        let out = attempt(
            policy(10),
            &cancel,
            || async {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err(Fault::Busy)
                } else {
                    Ok(n)
                }
            },
            busy_only,
        )
        .await;

        assert_eq!(out, Ok(2));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_before_first_attempt_never_invokes() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let calls = AtomicU32::new(0);

        let out: Result<(), RetryError<Fault>> = attempt(
            policy(10),
            &cancel,
            || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(())
            },
            busy_only,
        )
        .await;

        assert_eq!(out, Err(RetryError::Cancelled));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_during_backoff_wakes_early() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            trigger.cancel();
        });
        let started = Instant::now();
        let calls = AtomicU32::new(0);

        let out: Result<(), _> = attempt(
            policy(10),
            &cancel,
            || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(Fault::Busy)
            },
            busy_only,
        )
        .await;

        assert_eq!(out, Err(RetryError::Cancelled));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(started.elapsed() < Duration::from_secs(15));
    }

    #[tokio::test(start_paused = true)]
    async fn missing_predicate_treats_everything_as_terminal() {
        let cancel = CancellationToken::new();
        let calls = AtomicU32::new(0);

        let out: Result<(), _> = attempt(
            policy(10),
            &cancel,
            || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(Fault::Busy)
            },
            never,
        )
        .await;

        assert_eq!(out, Err(RetryError::Terminal(Fault::Busy)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_budget_still_makes_one_attempt() {
        let cancel = CancellationToken::new();
        let calls = AtomicU32::new(0);

        let out: Result<(), _> = attempt(
            policy(0),
            &cancel,
            || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(Fault::Busy)
            },
            busy_only,
        )
        .await;

        assert_eq!(
            out,
            Err(RetryError::Exhausted {
                attempts: 1,
                last: Fault::Busy,
            })
        );
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn policies_follow_settings() {
        let settings = Settings::default();
        assert_eq!(
            RetryPolicy::mutate(&settings),
            RetryPolicy::new(10, Duration::from_secs(15))
        );
        assert_eq!(
            RetryPolicy::delete(&settings),
            RetryPolicy::new(10, Duration::from_secs(20))
        );
    }
}
