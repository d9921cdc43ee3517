//! Retry utilities with exponential backoff around search fetches.

use std::time::Duration;
use tokio::time::sleep;

use crate::sources::SourceError;

/// Configuration for retry behavior
#[derive(Debug, Clone, Copy)]
pub struct RetryConfig {
    /// Maximum number of attempts (1 disables retrying)
    pub max_attempts: u32,
    /// Initial delay between retries
    pub initial_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
    /// Multiplier for exponential backoff
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 1,
            initial_delay: Duration::from_secs(3),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Set the maximum number of attempts
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Delay before attempt `attempt + 1`, where `attempt` starts at 1
    fn delay_after(&self, attempt: u32) -> Duration {
        let exp = self.initial_delay.as_secs_f64()
            * self.backoff_multiplier.powf(attempt.saturating_sub(1) as f64);
        Duration::from_secs_f64(exp.min(self.max_delay.as_secs_f64()))
    }
}

/// Whether an error is worth another attempt
pub fn is_transient(err: &SourceError) -> bool {
    match err {
        SourceError::Transport(_) => true,
        SourceError::Network { status, .. } => *status == 429 || (500..600).contains(status),
        _ => false,
    }
}

/// Execute an async operation, retrying transient failures with backoff
pub async fn with_retry<T, F, Fut>(config: RetryConfig, mut operation: F) -> Result<T, SourceError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, SourceError>>,
{
    let mut attempts = 0;

    loop {
        attempts += 1;

        match operation().await {
            Ok(result) => {
                if attempts > 1 {
                    tracing::info!(attempts, "Operation succeeded after transient failures");
                }
                return Ok(result);
            }
            Err(error) if is_transient(&error) && attempts < config.max_attempts => {
                let delay = config.delay_after(attempts);
                tracing::warn!(
                    attempt = attempts,
                    max_attempts = config.max_attempts,
                    ?delay,
                    error = %error,
                    "Transient error, retrying"
                );
                sleep(delay).await;
            }
            Err(error) => return Err(error),
        }
    }
}
