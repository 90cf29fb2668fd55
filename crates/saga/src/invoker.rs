//! Step invocation with timeout and retry.
//!
//! Every collaborator call goes through [`invoke`], which turns transient
//! trouble into retries and everything else into a business [`Fault`].
//! Nothing raised by a collaborator escapes as an infrastructure error.

use std::future::Future;
use std::time::Duration;

use domain::{Fault, Outcome};
use thiserror::Error;

/// How a collaborator call went wrong.
#[derive(Debug, Clone, Error)]
pub enum StepError {
    /// The input was refused. Never retried.
    #[error("validation failed: {0}")]
    Validation(Fault),

    /// The collaborator answered with a business failure. Never retried.
    #[error("rejected: {0}")]
    Rejected(Fault),

    /// Transient trouble; the call may succeed if repeated.
    #[error("unavailable: {0}")]
    Unavailable(String),
}

/// Exponential backoff between attempts.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            ..Self::default()
        }
    }

    pub fn no_retry() -> Self {
        Self::new(1)
    }

    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Delay after the given failed attempt (1-based).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1) as i32;
        let delay = self.initial_delay.as_secs_f64() * self.multiplier.powi(exponent);
        Duration::from_secs_f64(delay.min(self.max_delay.as_secs_f64()))
    }

    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }
}

/// Per-collaborator invocation settings.
#[derive(Debug, Clone, PartialEq)]
pub struct StepOptions {
    /// Limit for a single attempt.
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl StepOptions {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

/// Runs `operation` under `options`, retrying transient failures.
///
/// Validation and rejection faults come back as the failure unchanged.
/// Timeouts and unavailability are retried; once attempts run out the
/// failure is a general fault naming `step`.
pub async fn invoke<T, F, Fut>(step: &str, options: &StepOptions, mut operation: F) -> Outcome<T, Fault>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, StepError>>,
{
    let mut attempt = 1;
    loop {
        metrics::counter!("step_attempts_total", "step" => step.to_string()).increment(1);

        let error = match tokio::time::timeout(options.timeout, operation()).await {
            Ok(Ok(value)) => return Outcome::success(value),
            Ok(Err(StepError::Validation(fault))) | Ok(Err(StepError::Rejected(fault))) => {
                tracing::info!(step, attempt, fault = %fault, "step failed");
                return Outcome::failure(fault);
            }
            Ok(Err(StepError::Unavailable(message))) => message,
            Err(_) => format!("timed out after {:?}", options.timeout),
        };

        if !options.retry.should_retry(attempt) {
            tracing::warn!(step, attempt, error = %error, "step attempts exhausted");
            return Outcome::failure(Fault::general(
                format!("Step '{step}' could not be completed"),
                vec![format!("Gave up after {attempt} attempt(s)")],
            ));
        }

        let delay = options.retry.delay_for_attempt(attempt);
        tracing::warn!(step, attempt, ?delay, error = %error, "step attempt failed, retrying");
        metrics::counter!("step_retries_total", "step" => step.to_string()).increment(1);
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}
