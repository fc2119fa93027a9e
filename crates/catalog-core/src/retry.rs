//! Bounded retries around [`ItemResolver`].

use crate::error::{ErrorKind, FetchError};
use crate::resolver::{CacheMode, ItemResolver};
use crate::Outcome;
use catalog_types::CandidateItem;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

#[derive(Debug, Clone)]
pub struct RetryPolicy {
	/// Retries after the first attempt
	pub max_retries: u32,
	/// Fixed wait between attempts
	pub backoff: Duration,
}

impl Default for RetryPolicy {
	fn default() -> Self {
		Self {
			max_retries: 3,
			backoff: Duration::from_secs(1),
		}
	}
}

/// Retries transient failures with a fixed backoff.
///
/// Terminal failures (inactive or malformed ids, cancellation) are returned
/// on the first occurrence. A payload that fails to decode switches later
/// attempts to [`CacheMode::Bypass`] so a corrupt cache entry is read at most
/// once.
pub struct RetryingResolver {
	resolver: ItemResolver,
	policy: RetryPolicy,
}

impl RetryingResolver {
	pub fn new(resolver: ItemResolver, policy: RetryPolicy) -> Self {
		Self { resolver, policy }
	}

	pub fn policy(&self) -> &RetryPolicy {
		&self.policy
	}

	#[instrument(skip_all, fields(item_id = %item.id))]
	pub async fn resolve_with_retry(&self, cancel: &CancellationToken, item: &CandidateItem) -> Outcome {
		let mut retries = 0;
		let mut mode = CacheMode::ReadThrough;

		loop {
			let err = match self.resolver.resolve(cancel, item, mode).await {
				Ok(product) => return Ok(product),
				Err(err) if err.is_terminal() => return Err(err),
				Err(err) => err,
			};

			if retries >= self.policy.max_retries {
				return Err(FetchError::RetriesExhausted {
					item_id: item.id.clone(),
					retries,
					last: Box::new(err),
				});
			}

			if err.kind() == ErrorKind::MalformedPayload {
				mode = CacheMode::Bypass;
			}
			debug!(attempt = retries + 1, error = %err, "retrying after transient failure");

			tokio::select! {
				biased;
				_ = cancel.cancelled() => return Err(FetchError::canceled(&item.id)),
				_ = tokio::time::sleep(self.policy.backoff) => {}
			}
			retries += 1;
		}
	}
}
