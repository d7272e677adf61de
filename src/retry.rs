//! Retry logic with exponential backoff
//!
//! Only transport failures are retried. Protocol, decoding and configuration errors
//! are permanent for the page that produced them. A retried page is fetched again
//! with the same cursor, so retries never change which rows end up in the table.
//! Cancellation interrupts a backoff wait instead of letting it run out.

use crate::config::RetryConfig;
use crate::error::Error;
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Trait for errors that can be classified as retryable or not
pub trait IsRetryable {
    /// Returns true if the error is transient and the operation should be retried
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for Error {
    fn is_retryable(&self) -> bool {
        match self {
            // Server-side trouble and throttling; 4xx other than 408/429 is permanent
            Error::Transport { status, .. } => {
                *status >= 500 || *status == 408 || *status == 429
            }
            Error::Network(e) => e.is_timeout() || e.is_connect(),
            // Local file I/O only happens after collection, never inside a fetch
            Error::Io(_)
            | Error::Config { .. }
            | Error::UnsupportedEncoding(_)
            | Error::Protocol { .. }
            | Error::Decode { .. }
            | Error::Cancelled
            | Error::Csv(_)
            | Error::Serialization(_) => false,
        }
    }
}

/// Execute an async operation with exponential backoff retry logic
///
/// Returns the successful result or the last error after all retry attempts are exhausted.
/// Once `cancel` fires, no further attempt is made and [`Error::Cancelled`] is returned,
/// including from the middle of a backoff wait.
pub async fn fetch_with_retry<F, Fut, T, E>(
    config: &RetryConfig,
    cancel: &CancellationToken,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: IsRetryable + std::fmt::Display + From<Error>,
{
    let mut attempt = 0;
    let mut delay = config.initial_delay;

    loop {
        match operation().await {
            Ok(result) => {
                if attempt > 0 {
                    tracing::info!(attempts = attempt + 1, "Page fetch succeeded after retry");
                }
                return Ok(result);
            }
            Err(e) if e.is_retryable() && attempt < config.max_attempts => {
                attempt += 1;

                tracing::warn!(
                    error = %e,
                    attempt = attempt,
                    max_attempts = config.max_attempts,
                    delay_ms = delay.as_millis(),
                    "Page fetch failed, retrying"
                );

                let jittered_delay = if config.jitter {
                    add_jitter(delay)
                } else {
                    delay
                };

                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        tracing::info!(attempt = attempt, "Retry abandoned, run cancelled");
                        return Err(Error::Cancelled.into());
                    }
                    _ = tokio::time::sleep(jittered_delay) => {}
                }

                let next_delay =
                    Duration::from_secs_f64(delay.as_secs_f64() * config.backoff_multiplier);
                delay = next_delay.min(config.max_delay);
            }
            Err(e) => {
                if e.is_retryable() {
                    tracing::error!(
                        error = %e,
                        attempts = attempt + 1,
                        "Page fetch failed after all retry attempts exhausted"
                    );
                }
                return Err(e);
            }
        }
    }
}

/// Add random jitter to a delay
///
/// The result lies between `delay` and `2 * delay`.
fn add_jitter(delay: Duration) -> Duration {
    let mut rng = rand::thread_rng();
    let jitter_factor: f64 = rng.gen_range(0.0..=1.0);
    Duration::from_secs_f64(delay.as_secs_f64() * (1.0 + jitter_factor))
}
