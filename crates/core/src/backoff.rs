//! Capped exponential backoff shared by every retry loop.
//!
//! The delay after failed attempt `k` (0-based) is `min(base * 2^k, cap)`.
//! [`Backoff::retry`] runs at most `max_attempts` attempts and never sleeps
//! after the last one; what exhaustion means is up to the caller.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use crate::shutdown::ShutdownSignal;

/// Retry policy: attempt budget plus doubling delay with a ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
	max_attempts: u32,
	base: Duration,
	cap: Duration,
}

/// Why [`Backoff::retry`] gave up.
#[derive(Debug)]
pub enum RetryError<E> {
	/// Every attempt failed; carries the last failure.
	Exhausted { attempts: u32, last: E },
	/// Shutdown was requested while waiting between attempts.
	Cancelled { attempts: u32 },
}

impl Backoff {
	/// `max_attempts` is clamped to at least one.
	pub const fn new(max_attempts: u32, base: Duration, cap: Duration) -> Self {
		Self {
			max_attempts: if max_attempts == 0 { 1 } else { max_attempts },
			base,
			cap,
		}
	}

	pub fn max_attempts(&self) -> u32 {
		self.max_attempts
	}

	/// Delay following failed attempt `attempt`.
	pub fn delay(&self, attempt: u32) -> Duration {
		self.base.saturating_mul(2u32.saturating_pow(attempt)).min(self.cap)
	}

	/// The delay schedule for attempts `0..max_attempts`.
	pub fn delays(&self) -> impl Iterator<Item = Duration> + '_ {
		(0..self.max_attempts).map(move |k| self.delay(k))
	}

	/// Runs `op(attempt)` until it succeeds or the attempt budget is spent.
	pub async fn retry<T, E, F, Fut>(&self, what: &str, shutdown: &ShutdownSignal, mut op: F) -> Result<T, RetryError<E>>
	where
		E: Display,
		F: FnMut(u32) -> Fut,
		Fut: Future<Output = Result<T, E>>,
	{
		let mut attempt = 0;
		loop {
			match op(attempt).await {
				Ok(value) => {
					if attempt > 0 {
						debug!(target = "statusbulb.backoff", what, attempt = attempt + 1, "succeeded after retry");
					}
					return Ok(value);
				}
				Err(err) => {
					let attempts = attempt + 1;
					if attempts >= self.max_attempts {
						warn!(target = "statusbulb.backoff", what, attempts, error = %err, "giving up");
						return Err(RetryError::Exhausted { attempts, last: err });
					}

					let delay = self.delay(attempt);
					debug!(
						target = "statusbulb.backoff",
						what,
						attempt = attempts,
						max_attempts = self.max_attempts,
						delay_ms = delay.as_millis() as u64,
						error = %err,
						"attempt failed; backing off"
					);
					if !shutdown.sleep(delay).await {
						return Err(RetryError::Cancelled { attempts });
					}
					attempt += 1;
				}
			}
		}
	}
}
