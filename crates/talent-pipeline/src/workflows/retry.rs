//! Bounded exponential backoff for the out-of-process collaborators.
//!
//! Retries wrap the scorer and the mail transport at the adapter layer so the triage
//! engine itself never loops on a failing side effect.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::sleep;
use tracing::{debug, warn};

use super::notifications::{Notification, NotificationDispatcher, NotificationError};
use super::scoring::{ScoreProvider, ScoreReport, ScoreRequest, ScoringError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, initial_backoff: Duration, max_backoff: Duration) -> Self {
        Self {
            max_retries,
            initial_backoff,
            max_backoff: max_backoff.max(initial_backoff),
        }
    }

    /// Delay before retry number `attempt` (zero based), doubling up to the cap.
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.initial_backoff
            .checked_mul(factor)
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff)
    }

    /// Upper bound for a retried call whose attempts each stop after `attempt_timeout`.
    pub fn deadline(&self, attempt_timeout: Duration) -> Duration {
        let attempts = attempt_timeout.saturating_mul(self.max_retries.saturating_add(1));
        (0..self.max_retries)
            .map(|attempt| self.backoff_for(attempt))
            .fold(attempts, Duration::saturating_add)
    }

    /// Run `operation` until it succeeds, fails permanently, or retries run out.
    pub async fn execute<F, Fut, T, E>(
        &self,
        mut operation: F,
        is_transient: impl Fn(&E) -> bool,
    ) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let mut attempt = 0;
        loop {
            match operation().await {
                Ok(value) => {
                    if attempt > 0 {
                        debug!(attempt, "operation succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(err) if attempt < self.max_retries && is_transient(&err) => {
                    let delay = self.backoff_for(attempt);
                    warn!(
                        attempt = attempt + 1,
                        max_retries = self.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "transient failure, retrying"
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

/// Score provider decorator retrying transient scorer failures.
pub struct RetryingScoreProvider<P> {
    inner: P,
    policy: RetryPolicy,
}

impl<P> RetryingScoreProvider<P> {
    pub fn new(inner: P, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl<P> ScoreProvider for RetryingScoreProvider<P>
where
    P: ScoreProvider,
{
    async fn score(&self, request: &ScoreRequest) -> Result<ScoreReport, ScoringError> {
        self.policy
            .execute(|| self.inner.score(request), ScoringError::is_transient)
            .await
    }
}

/// Dispatcher decorator retrying transport failures; malformed addresses fail fast.
pub struct RetryingDispatcher<D> {
    inner: D,
    policy: RetryPolicy,
}

impl<D> RetryingDispatcher<D> {
    pub fn new(inner: D, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl<D> NotificationDispatcher for RetryingDispatcher<D>
where
    D: NotificationDispatcher,
{
    async fn dispatch(&self, notification: &Notification) -> Result<(), NotificationError> {
        self.policy
            .execute(
                || self.inner.dispatch(notification),
                NotificationError::is_transient,
            )
            .await
    }
}
