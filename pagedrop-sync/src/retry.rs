//! Conflict retry policy.
//!
//! The decision for each attempt is a pure function, [`RetryPolicy::step`],
//! so it can be tested without any clock. [`RetryPolicy::run`] drives it,
//! sleeping through an injected [`Sleeper`] between attempts.
//!
//! Only conflicts are retried. Transport, auth, and structural failures are
//! returned on the first occurrence.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;

use pagedrop_core::RetrySettings;
use pagedrop_store::StoreError;

use crate::error::PublishError;

// ---------------------------------------------------------------------------
// Retryable
// ---------------------------------------------------------------------------

/// Errors that can report whether they are a lost compare-and-swap race.
pub trait Retryable {
    fn is_conflict(&self) -> bool;
}

impl Retryable for StoreError {
    fn is_conflict(&self) -> bool {
        StoreError::is_conflict(self)
    }
}

impl Retryable for PublishError {
    fn is_conflict(&self) -> bool {
        matches!(
            self,
            PublishError::Store {
                source: StoreError::Conflict { .. },
                ..
            }
        )
    }
}

// ---------------------------------------------------------------------------
// Sleeper
// ---------------------------------------------------------------------------

/// Source of delay between attempts.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, delay: Duration);
}

/// Sleeps on the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, delay: Duration) {
        tokio::time::sleep(delay).await;
    }
}

// ---------------------------------------------------------------------------
// Policy
// ---------------------------------------------------------------------------

/// What to do after attempt `n`.
#[derive(Debug, PartialEq, Eq)]
pub enum Step<T, E> {
    Succeed(T),
    Retry(Duration),
    Fail(E),
}

/// A value plus the number of attempts it took.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Retried<T> {
    pub value: T,
    pub attempts: u32,
}

/// Bounded retry with attempt-proportional backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_settings(&RetrySettings::default())
    }
}

impl RetryPolicy {
    /// `max_attempts` is clamped to at least one.
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    pub fn from_settings(settings: &RetrySettings) -> Self {
        Self::new(settings.max_attempts, settings.base_delay())
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay before attempt `attempt + 1`: `base_delay * attempt`.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt)
    }

    /// Decide the next step given the 1-based `attempt` and its result.
    pub fn step<T, E: Retryable>(&self, attempt: u32, result: Result<T, E>) -> Step<T, E> {
        match result {
            Ok(value) => Step::Succeed(value),
            Err(err) if err.is_conflict() && attempt < self.max_attempts => {
                Step::Retry(self.delay_after(attempt))
            }
            Err(err) => Step::Fail(err),
        }
    }

    /// Run `op` until it succeeds, fails terminally, or attempts run out.
    ///
    /// `op` receives the 1-based attempt number. On exhaustion the last
    /// conflict error is returned unchanged.
    pub async fn run<T, E, F, Fut>(
        &self,
        sleeper: &dyn Sleeper,
        label: &str,
        mut op: F,
    ) -> Result<Retried<T>, E>
    where
        E: Retryable + std::fmt::Display,
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut attempt = 1;
        loop {
            tracing::debug!("{label}: attempt {attempt}/{}", self.max_attempts);
            let result = op(attempt).await;
            match self.step(attempt, result) {
                Step::Succeed(value) => return Ok(Retried { value, attempts: attempt }),
                Step::Retry(delay) => {
                    tracing::warn!(
                        "{label}: version conflict on attempt {attempt}, retrying in {}ms",
                        delay.as_millis()
                    );
                    sleeper.sleep(delay).await;
                    attempt += 1;
                }
                Step::Fail(err) => {
                    if err.is_conflict() {
                        tracing::warn!("{label}: giving up after {attempt} conflicting attempts");
                    } else {
                        tracing::debug!("{label}: attempt {attempt} failed without retry: {err}");
                    }
                    return Err(err);
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
