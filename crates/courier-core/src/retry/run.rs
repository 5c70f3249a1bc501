//! Retry loop: run an async operation until success or the policy says stop.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use super::error::RetryError;
use super::outcome::RetryOutcome;
use super::policy::{RetryDecision, RetryPolicy};

/// One scheduled retry, reported to observers just before the backoff sleep.
#[derive(Debug, Clone, Copy)]
pub struct RetryEvent<'a> {
    /// Call-site name, e.g. "acquire" or "deliver.batch".
    pub operation: &'a str,
    /// 1-based number of the attempt that just failed.
    pub attempt: u32,
    /// Rendered failure message.
    pub error: &'a str,
    /// Backoff about to be waited before the next attempt.
    pub delay: Duration,
}

/// Receives retry events. Errors returned here are logged and dropped; they
/// never change the outcome of the retried operation.
pub trait RetryObserver: Send + Sync {
    fn on_retry(&self, event: &RetryEvent<'_>) -> anyhow::Result<()>;
}

/// Observer that only emits a `tracing` warning per retry.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl RetryObserver for LogObserver {
    fn on_retry(&self, event: &RetryEvent<'_>) -> anyhow::Result<()> {
        tracing::warn!(
            operation = event.operation,
            attempt = event.attempt,
            delay_ms = event.delay.as_millis() as u64,
            "attempt failed, retrying: {}",
            event.error
        );
        Ok(())
    }
}

/// Fan-out to several observers in order; one failing does not skip the rest.
#[derive(Default)]
pub struct ObserverChain<'a> {
    observers: Vec<&'a dyn RetryObserver>,
}

impl<'a> ObserverChain<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, observer: &'a dyn RetryObserver) -> Self {
        self.observers.push(observer);
        self
    }
}

impl RetryObserver for ObserverChain<'_> {
    fn on_retry(&self, event: &RetryEvent<'_>) -> anyhow::Result<()> {
        let mut first_err = None;
        for obs in &self.observers {
            if let Err(e) = obs.on_retry(event) {
                first_err.get_or_insert(e);
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

/// Runs `operation` under `policy` and always returns the outcome (non-throwing form).
///
/// Attempt 1 starts immediately. Each failure is classified from its message:
/// permanent failures return `Aborted` at once, transient ones are retried with
/// exponential backoff until `max_retries + 1` attempts have been made.
pub async fn execute<T, E, F, Fut>(
    operation_name: &str,
    policy: &RetryPolicy,
    observer: &dyn RetryObserver,
    mut operation: F,
) -> RetryOutcome<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    let mut attempt = 1u32;
    loop {
        let err = match operation().await {
            Ok(value) => {
                if attempt > 1 {
                    tracing::info!(operation = operation_name, attempt, "succeeded after retry");
                }
                return RetryOutcome::Succeeded {
                    value,
                    attempts: attempt,
                };
            }
            Err(e) => e,
        };

        let message = err.to_string();
        let disposition = policy.classify(&message);
        match policy.decide(attempt, disposition) {
            RetryDecision::Abort => {
                tracing::warn!(
                    operation = operation_name,
                    attempt,
                    "permanent failure, not retrying: {}",
                    message
                );
                return RetryOutcome::Aborted {
                    last_error: err,
                    attempts: attempt,
                };
            }
            RetryDecision::GiveUp => {
                tracing::warn!(
                    operation = operation_name,
                    attempt,
                    "retries exhausted: {}",
                    message
                );
                return RetryOutcome::Exhausted {
                    last_error: err,
                    attempts: attempt,
                };
            }
            RetryDecision::RetryAfter(delay) => {
                let event = RetryEvent {
                    operation: operation_name,
                    attempt,
                    error: &message,
                    delay,
                };
                if let Err(e) = observer.on_retry(&event) {
                    tracing::debug!(operation = operation_name, "retry observer failed: {:#}", e);
                }
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

/// Throwing form: like [`execute`] but raises the final failure.
pub async fn run_with_retry<T, E, F, Fut>(
    operation_name: &str,
    policy: &RetryPolicy,
    observer: &dyn RetryObserver,
    operation: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display + fmt::Debug,
{
    execute(operation_name, policy, observer, operation)
        .await
        .into_result()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::OpError;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;
    use tokio::time::Instant;

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<(u32, String, Duration)>>,
    }

    impl RetryObserver for Recorder {
        fn on_retry(&self, event: &RetryEvent<'_>) -> anyhow::Result<()> {
            self.events
                .lock()
                .unwrap()
                .push((event.attempt, event.error.to_string(), event.delay));
            Ok(())
        }
    }

    struct Broken;

    impl RetryObserver for Broken {
        fn on_retry(&self, _event: &RetryEvent<'_>) -> anyhow::Result<()> {
            anyhow::bail!("audit disk full")
        }
    }

    fn policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy::new(max_retries, Duration::from_millis(2000), 2.0)
    }

    #[tokio::test(start_paused = true)]
    async fn always_transient_makes_n_plus_one_attempts() {
        for n in 0..4u32 {
            let calls = AtomicU32::new(0);
            let outcome: RetryOutcome<(), OpError> = execute("op", &policy(n), &LogObserver, || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(OpError::other("HTTP 503")) }
            })
            .await;
            assert!(matches!(outcome, RetryOutcome::Exhausted { attempts, .. } if attempts == n + 1));
            assert_eq!(calls.load(Ordering::SeqCst), n + 1);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn permanent_failure_aborts_on_first_attempt() {
        let calls = AtomicU32::new(0);
        let outcome: RetryOutcome<(), OpError> = execute("op", &policy(5), &LogObserver, || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(OpError::other("401 Unauthorized: invalid token")) }
        })
        .await;
        assert!(matches!(outcome, RetryOutcome::Aborted { attempts: 1, .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn observer_sees_exponential_delays_and_time_advances() {
        let rec = Recorder::default();
        let start = Instant::now();
        let outcome: RetryOutcome<(), OpError> = execute("op", &policy(3), &rec, || async {
            Err(OpError::other("connection reset"))
        })
        .await;
        assert_eq!(outcome.attempts(), 4);
        let events = rec.events.lock().unwrap().clone();
        let delays: Vec<u128> = events.iter().map(|(_, _, d)| d.as_millis()).collect();
        assert_eq!(delays, vec![2000, 4000, 8000]);
        let attempts: Vec<u32> = events.iter().map(|(a, _, _)| *a).collect();
        assert_eq!(attempts, vec![1, 2, 3]);
        assert_eq!(events[0].1, "connection reset");
        assert!(start.elapsed() >= Duration::from_millis(14_000));
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let outcome = execute("op", &policy(5), &LogObserver, || {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if n < 3 {
                    Err(OpError::other("timeout"))
                } else {
                    Ok(n * 10)
                }
            }
        })
        .await;
        assert!(matches!(outcome, RetryOutcome::Succeeded { value: 30, attempts: 3 }));
    }

    #[tokio::test(start_paused = true)]
    async fn transient_then_permanent_aborts() {
        let calls = AtomicU32::new(0);
        let outcome: RetryOutcome<(), OpError> = execute("op", &policy(5), &LogObserver, || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err(OpError::other("HTTP 502"))
                } else {
                    Err(OpError::other("HTTP 403: Forbidden"))
                }
            }
        })
        .await;
        assert!(matches!(outcome, RetryOutcome::Aborted { attempts: 2, .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn failing_observer_does_not_change_outcome() {
        let calls = AtomicU32::new(0);
        let outcome = execute("op", &policy(2), &Broken, || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err(OpError::other("ETIMEDOUT"))
                } else {
                    Ok("done")
                }
            }
        })
        .await;
        assert!(matches!(outcome, RetryOutcome::Succeeded { value: "done", attempts: 2 }));
    }

    #[tokio::test(start_paused = true)]
    async fn chain_reports_to_every_observer() {
        let a = Recorder::default();
        let b = Recorder::default();
        let broken = Broken;
        let chain = ObserverChain::new().with(&broken).with(&a).with(&b);
        let _: RetryOutcome<(), OpError> =
            execute("op", &policy(1), &chain, || async { Err(OpError::other("quota")) }).await;
        assert_eq!(a.events.lock().unwrap().len(), 1);
        assert_eq!(b.events.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn throwing_form_raises_final_failure() {
        let err = run_with_retry::<(), _, _, _>("op", &policy(1), &LogObserver, || async {
            Err(OpError::other("HTTP 500"))
        })
        .await
        .unwrap_err();
        assert!(matches!(err, RetryError::Exhausted { attempts: 2, .. }));

        let err = run_with_retry::<(), _, _, _>("op", &policy(1), &LogObserver, || async {
            Err(OpError::other("HTTP 404"))
        })
        .await
        .unwrap_err();
        assert!(matches!(err, RetryError::Aborted { attempts: 1, .. }));
    }
}
