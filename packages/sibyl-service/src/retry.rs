use std::time::Duration;

use tracing::warn;

use crate::{BoxFuture, Result};

/// `base_delay * 2^attempt`, capped at `max_delay`. Attempt is 0-indexed.
pub(crate) fn compute_delay(retry: &sibyl_config::Retry, attempt: u32) -> Duration {
	let exp = 2u64.saturating_pow(attempt);
	let raw_ms = retry.base_delay_ms.saturating_mul(exp);

	Duration::from_millis(raw_ms.min(retry.max_delay_ms))
}

/// Runs `op` up to `retry.max_attempts` times, sleeping between attempts.
/// Non-retryable errors short-circuit on the first occurrence.
pub(crate) async fn with_backoff<'a, T>(
	retry: &sibyl_config::Retry,
	stage: &str,
	mut op: impl FnMut() -> BoxFuture<'a, Result<T>>,
) -> Result<T> {
	let mut attempt: u32 = 0;

	loop {
		match op().await {
			Ok(value) => return Ok(value),
			Err(err) if err.is_retryable() && attempt + 1 < retry.max_attempts => {
				warn!(stage, attempt, error = %err, "Stage attempt failed; backing off.");

				tokio::time::sleep(compute_delay(retry, attempt)).await;

				attempt += 1;
			},
			Err(err) => return Err(err),
		}
	}
}
