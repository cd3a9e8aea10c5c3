//! Retry middleware for adapter operations.
//!
//! Adapters never retry internally. Callers that want retries wrap an
//! operation closure with [`with_retry`], which re-runs it with exponential
//! backoff while the returned error reports itself as retryable.

use anchor_types::AdapterResult;
use backoff::{backoff::Backoff, ExponentialBackoff};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Backoff parameters for [`with_retry`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
	/// Retries after the first attempt.
	pub max_retries: u32,
	pub initial_delay_ms: u64,
	pub max_delay_ms: u64,
	pub multiplier: f64,
	/// Stop retrying once this much time has passed since the first attempt.
	pub max_elapsed_ms: Option<u64>,
}

impl Default for RetryPolicy {
	fn default() -> Self {
		Self {
			max_retries: 3,
			initial_delay_ms: 500,
			max_delay_ms: 10_000,
			multiplier: 2.0,
			max_elapsed_ms: Some(30_000),
		}
	}
}

impl RetryPolicy {
	pub fn with_max_retries(mut self, max_retries: u32) -> Self {
		self.max_retries = max_retries;
		self
	}

	pub fn with_initial_delay_ms(mut self, initial_delay_ms: u64) -> Self {
		self.initial_delay_ms = initial_delay_ms;
		self
	}

	fn backoff(&self) -> ExponentialBackoff {
		let mut backoff = ExponentialBackoff {
			initial_interval: Duration::from_millis(self.initial_delay_ms),
			current_interval: Duration::from_millis(self.initial_delay_ms),
			max_interval: Duration::from_millis(self.max_delay_ms),
			multiplier: self.multiplier,
			max_elapsed_time: self.max_elapsed_ms.map(Duration::from_millis),
			..Default::default()
		};
		backoff.reset();
		backoff
	}
}

/// Runs `op`, retrying retryable failures under `policy`.
///
/// Non-retryable errors are returned immediately. The last error is returned
/// once retries or the elapsed-time budget are exhausted.
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, mut op: F) -> AdapterResult<T>
where
	F: FnMut() -> Fut,
	Fut: Future<Output = AdapterResult<T>>,
{
	let mut backoff = policy.backoff();
	let mut attempts = 0;

	loop {
		match op().await {
			Ok(value) => return Ok(value),
			Err(e) if !e.is_retryable() => return Err(e),
			Err(e) => {
				attempts += 1;

				if attempts > policy.max_retries {
					warn!(
						"Operation failed after {} attempts, giving up: {}",
						attempts, e
					);
					return Err(e);
				}

				match backoff.next_backoff() {
					Some(delay) => {
						warn!(
							"Operation failed, attempt {}/{}, retrying in {:?}: {}",
							attempts, policy.max_retries, delay, e
						);
						tokio::time::sleep(delay).await;
					}
					None => {
						warn!(
							"Operation failed, backoff exhausted after {} attempts: {}",
							attempts, e
						);
						return Err(e);
					}
				}
			}
		}
	}
}
