//! Fixed-delay retry executor
//!
//! Runs a fallible operation up to a configured number of attempts and
//! reports progress through [`RetryEvent`]s. Every failure is retried the
//! same way; [`RetryableError`] only annotates the events.

use crate::config::RetryConfig;
use crate::error::RetryableError;
use std::future::Future;
use std::time::Duration;
use tracing::{error, info, warn};

/// Progress notification emitted by [`RetryExecutor`]
#[derive(Debug)]
pub enum RetryEvent<'a, E> {
    /// About to run attempt `attempt` (1-indexed)
    Attempt { attempt: u32, max_attempts: u32 },
    /// Attempt failed; `retry_in` is `None` when no attempts remain
    Failed {
        attempt: u32,
        max_attempts: u32,
        error: &'a E,
        retry_in: Option<Duration>,
    },
    /// All attempts failed; `error` is returned to the caller
    Exhausted { attempts: u32, error: &'a E },
}

/// Retry executor with a fixed inter-attempt delay
#[derive(Debug, Clone)]
pub struct RetryExecutor {
    max_attempts: u32,
    delay: Duration,
}

impl RetryExecutor {
    /// Create an executor from configuration
    ///
    /// At least one attempt is always made.
    pub fn new(config: &RetryConfig) -> Self {
        Self::from_parts(config.max_attempts, Duration::from_secs(config.delay_secs))
    }

    pub fn from_parts(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Execute `operation`, logging every event with `tracing`
    pub async fn execute<F, Fut, T, E>(&self, operation: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: RetryableError + std::fmt::Display,
    {
        self.execute_with_events(operation, log_event).await
    }

    /// Execute `operation`, passing every event to `on_event`
    ///
    /// Returns the first success, or the last error once `max_attempts`
    /// attempts have failed. Sleeps between attempts, never after the last.
    pub async fn execute_with_events<F, Fut, T, E, S>(
        &self,
        mut operation: F,
        mut on_event: S,
    ) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        S: FnMut(RetryEvent<'_, E>),
    {
        let max_attempts = self.max_attempts;
        let mut attempt = 1u32;

        loop {
            on_event(RetryEvent::Attempt {
                attempt,
                max_attempts,
            });

            match operation().await {
                Ok(result) => return Ok(result),
                Err(err) => {
                    if attempt >= max_attempts {
                        on_event(RetryEvent::Failed {
                            attempt,
                            max_attempts,
                            error: &err,
                            retry_in: None,
                        });
                        on_event(RetryEvent::Exhausted {
                            attempts: attempt,
                            error: &err,
                        });
                        return Err(err);
                    }

                    on_event(RetryEvent::Failed {
                        attempt,
                        max_attempts,
                        error: &err,
                        retry_in: Some(self.delay),
                    });
                    tokio::time::sleep(self.delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

fn log_event<E>(event: RetryEvent<'_, E>)
where
    E: RetryableError + std::fmt::Display,
{
    match event {
        RetryEvent::Attempt {
            attempt,
            max_attempts,
        } => info!(attempt, max_attempts, "Starting attempt"),
        RetryEvent::Failed {
            attempt,
            max_attempts,
            error,
            retry_in,
        } => match retry_in {
            Some(delay) => warn!(
                attempt,
                max_attempts,
                retry_in_secs = delay.as_secs(),
                permanent = !error.is_retryable(),
                error = %error,
                "Attempt failed, retrying"
            ),
            None => warn!(
                attempt,
                max_attempts,
                permanent = !error.is_retryable(),
                error = %error,
                "Attempt failed"
            ),
        },
        RetryEvent::Exhausted { attempts, error } => {
            error!(attempts, error = %error, "Max retries exceeded")
        }
    }
}
