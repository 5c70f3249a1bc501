use std::time::Duration;

use super::classify::{classify_message, Disposition};
use crate::config::RetryConfig;

/// Decision returned by the retry policy after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Permanent failure: stop now, whatever budget remains.
    Abort,
    /// Transient failure but the attempt budget is spent.
    GiveUp,
    /// Retry after the given delay.
    RetryAfter(Duration),
}

/// Exponential backoff policy for one call site.
///
/// `max_retries` counts retries, not attempts: a policy with `max_retries = 3`
/// runs the operation at most four times.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    max_retries: u32,
    initial_delay: Duration,
    backoff_multiplier: f64,
    classify: fn(&str) -> Disposition,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(2000), 2.0)
    }
}

impl RetryPolicy {
    /// Build a policy using the message classifier. A multiplier below 1 (or NaN)
    /// is raised to 1 so delays never shrink.
    pub fn new(max_retries: u32, initial_delay: Duration, backoff_multiplier: f64) -> Self {
        let backoff_multiplier = if backoff_multiplier.is_finite() && backoff_multiplier >= 1.0 {
            backoff_multiplier
        } else {
            1.0
        };
        Self {
            max_retries,
            initial_delay,
            backoff_multiplier,
            classify: classify_message,
        }
    }

    /// Replace the classifier used for this call site.
    pub fn with_classifier(mut self, classify: fn(&str) -> Disposition) -> Self {
        self.classify = classify;
        self
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Upper bound on attempts, including the first.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    pub fn initial_delay(&self) -> Duration {
        self.initial_delay
    }

    pub fn backoff_multiplier(&self) -> f64 {
        self.backoff_multiplier
    }

    pub fn classify(&self, message: &str) -> Disposition {
        (self.classify)(message)
    }

    /// Delay to wait after `completed` failed attempts, before the next one.
    /// `completed` is 1-based: the wait before attempt 2 is `initial_delay`.
    pub fn delay_after(&self, completed: u32) -> Duration {
        let exp = completed.saturating_sub(1).min(i32::MAX as u32) as i32;
        let factor = self.backoff_multiplier.powi(exp);
        let secs = self.initial_delay.as_secs_f64() * factor;
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
    }

    /// Decide what to do after attempt number `attempt` (1-based) failed.
    pub fn decide(&self, attempt: u32, disposition: Disposition) -> RetryDecision {
        match disposition {
            Disposition::Permanent => RetryDecision::Abort,
            Disposition::Transient if attempt >= self.max_attempts() => RetryDecision::GiveUp,
            Disposition::Transient => RetryDecision::RetryAfter(self.delay_after(attempt)),
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(cfg: &RetryConfig) -> Self {
        RetryPolicy::new(
            cfg.max_retries,
            Duration::from_millis(cfg.initial_delay_ms),
            cfg.backoff_multiplier,
        )
    }
}
