//! Retry with exponential backoff and jitter for collector requests.
//!
//! Transient failures (429, 5xx, connection-level errors) are retried.
//! Everything else is returned immediately: bad credentials, unexpected
//! statuses and malformed bodies will not fix themselves.

use std::future::Future;
use std::time::Duration;

use crate::error::CollectorError;

/// Upper bound for a single backoff sleep.
const MAX_DELAY_MS: u64 = 60_000;

/// Returns `true` if `err` represents a transient condition that should be
/// retried after a backoff delay.
///
/// Retriable errors:
/// - [`CollectorError::RateLimited`]: HTTP 429.
/// - [`CollectorError::ServerError`]: HTTP 5xx.
/// - [`CollectorError::Http`]: timeouts and connection failures.
pub(crate) fn is_retriable(err: &CollectorError) -> bool {
    match err {
        CollectorError::RateLimited { .. } | CollectorError::ServerError { .. } => true,
        CollectorError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
        CollectorError::Unauthorized { .. }
        | CollectorError::UnexpectedStatus { .. }
        | CollectorError::Deserialize { .. }
        | CollectorError::InvalidBaseUrl { .. } => false,
    }
}

/// Milliseconds to wait before retry number `attempt + 1`.
///
/// The exponential delay is jittered, then raised to the server's
/// `Retry-After` for a 429. Both are capped at [`MAX_DELAY_MS`].
fn backoff_delay_ms(attempt: u32, backoff_base_secs: u64, err: &CollectorError) -> u64 {
    let computed = backoff_base_secs
        .saturating_mul(1000)
        .saturating_mul(1u64 << attempt.min(10))
        .min(MAX_DELAY_MS);
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    let jittered = (computed as f64 * (rand::random::<f64>() * 0.5 + 0.75)) as u64;
    let floor = match err {
        CollectorError::RateLimited { retry_after_secs } => retry_after_secs.saturating_mul(1000),
        _ => 0,
    };
    jittered.max(floor).min(MAX_DELAY_MS)
}

/// Executes `operation` with exponential backoff retries on transient errors.
///
/// The wait before the n-th retry is `backoff_base_secs * 2^(n-1)` seconds,
/// capped at 60 s and scaled by a random factor in `[0.75, 1.25)`. A 429
/// waits at least as long as its `Retry-After` asks. With
/// `max_retries = 3` the operation is attempted at most 4 times total.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_secs: u64,
    mut operation: F,
) -> Result<T, CollectorError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, CollectorError>>,
{
    let mut attempt = 0u32;

    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !is_retriable(&err) || attempt >= max_retries {
                    return Err(err);
                }
                let delay_ms = backoff_delay_ms(attempt, backoff_base_secs, &err);
                tracing::warn!(
                    attempt,
                    max_retries,
                    delay_ms,
                    error = %err,
                    "transient collector error, retrying after backoff"
                );
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                attempt += 1;
            }
        }
    }
}
