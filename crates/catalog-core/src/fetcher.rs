//! Pipeline entry point.

use crate::dispatcher::Dispatcher;
use crate::error::ShutdownError;
use crate::lifecycle::GracefulShutdown;
use crate::merger::{self, OutcomeStream};
use crate::retry::RetryingResolver;
use async_trait::async_trait;
use catalog_types::CandidateItem;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, instrument, warn};

/// Fetches enriched products for ranked candidates with bounded concurrency.
///
/// Owns every task it spawns. After [`GracefulShutdown::shutdown`] has been
/// called, new runs produce empty streams.
pub struct ProductFetcher {
	resolver: Arc<RetryingResolver>,
	dispatcher: Arc<Dispatcher>,
	tracker: TaskTracker,
	shutdown: CancellationToken,
}

impl ProductFetcher {
	/// `concurrency` bounds resolutions across all runs of this fetcher.
	pub fn new(resolver: RetryingResolver, concurrency: usize) -> Self {
		Self {
			resolver: Arc::new(resolver),
			dispatcher: Arc::new(Dispatcher::new(concurrency)),
			tracker: TaskTracker::new(),
			shutdown: CancellationToken::new(),
		}
	}

	/// Resolves `candidates` in rank order and streams their outcomes.
	///
	/// The stream yields one outcome per candidate, in input order, and ends
	/// once `required` products were resolved, the candidates run out, or
	/// `cancel` fires. Dropping the stream stops all remaining work of the run.
	#[instrument(skip_all, fields(candidates = candidates.len(), required = required))]
	pub fn fetch_top_results(
		&self,
		cancel: &CancellationToken,
		candidates: Vec<CandidateItem>,
		required: usize,
	) -> OutcomeStream {
		if self.is_shutting_down() {
			warn!("Fetcher is shutting down, rejecting run");
			return Box::pin(futures::stream::empty());
		}

		let run_token = cancel.child_token();
		if required > 0 && !candidates.is_empty() {
			let shutdown = self.shutdown.clone();
			let run = run_token.clone();
			self.tracker.spawn(async move {
				tokio::select! {
					_ = shutdown.cancelled() => {
						debug!("Aborting run on forced shutdown");
						run.cancel();
					}
					_ = run.cancelled() => {}
				}
			});
		}

		merger::run(
			&self.tracker,
			self.dispatcher.clone(),
			self.resolver.clone(),
			run_token,
			candidates,
			required,
		)
	}

	/// True once shutdown has started; new runs are rejected from then on.
	pub fn is_shutting_down(&self) -> bool {
		self.tracker.is_closed()
	}

	pub fn concurrency(&self) -> usize {
		self.dispatcher.capacity()
	}

	pub fn in_flight(&self) -> usize {
		self.dispatcher.in_flight()
	}
}

#[async_trait]
impl GracefulShutdown for ProductFetcher {
	fn name(&self) -> String {
		"product-fetcher".to_string()
	}

	async fn shutdown(&self, timeout: Duration) -> Result<(), ShutdownError> {
		self.tracker.close();
		info!(tasks = self.tracker.len(), "Waiting for fetch tasks");

		if tokio::time::timeout(timeout, self.tracker.wait()).await.is_ok() {
			return Ok(());
		}

		warn!(tasks = self.tracker.len(), "Fetch tasks still running, canceling");
		self.shutdown.cancel();
		Err(ShutdownError::Timeout {
			job: self.name(),
			timeout,
		})
	}
}
