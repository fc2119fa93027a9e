//! Ordered, early-terminating fan-in of concurrent resolutions.
//!
//! A launcher task walks the candidates in rank order, takes a dispatcher
//! permit for each and spawns a worker that resolves the item and drops its
//! outcome into a dedicated one-shot slot. The returned stream drains those
//! slots strictly in index order, so completion order never leaks into the
//! output.
//!
//! The run token is shared by the launcher, every worker and the stream. It
//! is cancelled when the stream finishes for any reason (quota met, input
//! drained, caller dropped the stream) or when the caller's own token fires.
//! Workers still in flight at that point abort at their next suspension point
//! and their outcomes are discarded.

use crate::dispatcher::Dispatcher;
use crate::retry::RetryingResolver;
use crate::Outcome;
use catalog_types::CandidateItem;
use futures::Stream;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::debug;

/// Lazily produced outcomes, in candidate order.
pub type OutcomeStream = Pin<Box<dyn Stream<Item = Outcome> + Send>>;

type Slot = oneshot::Sender<Outcome>;

/// Starts a run over `items` and returns its outcome stream.
///
/// The stream ends once `required` successes have been yielded, every
/// launched slot has been drained, or `run_token` is cancelled. All spawned
/// work is registered on `tracker`.
pub fn run(
	tracker: &TaskTracker,
	dispatcher: Arc<Dispatcher>,
	resolver: Arc<RetryingResolver>,
	run_token: CancellationToken,
	items: Vec<CandidateItem>,
	required: usize,
) -> OutcomeStream {
	if required == 0 || items.is_empty() {
		run_token.cancel();
		return Box::pin(futures::stream::empty());
	}

	let (slots, receivers): (Vec<Slot>, Vec<_>) = items.iter().map(|_| oneshot::channel()).unzip();

	tracker.spawn(launch(
		tracker.clone(),
		dispatcher,
		resolver,
		run_token.clone(),
		items,
		slots,
	));

	Box::pin(consume(run_token, receivers, required))
}

async fn launch(
	tracker: TaskTracker,
	dispatcher: Arc<Dispatcher>,
	resolver: Arc<RetryingResolver>,
	run_token: CancellationToken,
	items: Vec<CandidateItem>,
	slots: Vec<Slot>,
) {
	for (index, (item, slot)) in items.into_iter().zip(slots).enumerate() {
		if run_token.is_cancelled() {
			debug!(index, "run stopped, no further launches");
			return;
		}

		let Ok(permit) = dispatcher.admit(&run_token).await else {
			debug!(index, "run stopped while waiting for capacity");
			return;
		};

		let dispatcher = dispatcher.clone();
		let resolver = resolver.clone();
		let token = run_token.clone();
		tracker.spawn(async move {
			let outcome = resolver.resolve_with_retry(&token, &item).await;
			dispatcher.release(permit);
			// The consumer may already be gone
			let _ = slot.send(outcome);
		});
	}
}

fn consume(
	run_token: CancellationToken,
	receivers: Vec<oneshot::Receiver<Outcome>>,
	required: usize,
) -> impl Stream<Item = Outcome> + Send {
	// Held by the stream so that dropping it, even unpolled, stops the run
	let stop_on_exit = run_token.clone().drop_guard();

	async_stream::stream! {
		let _stop_on_exit = stop_on_exit;
		let mut successes = 0;

		for (index, slot) in receivers.into_iter().enumerate() {
			let outcome = tokio::select! {
				biased;
				_ = run_token.cancelled() => {
					debug!(index, "run cancelled while waiting for an outcome");
					break;
				}
				received = slot => match received {
					Ok(outcome) => outcome,
					Err(_) => {
						debug!(index, "result slot closed without an outcome");
						break;
					}
				},
			};

			if outcome.is_ok() {
				successes += 1;
			}
			yield outcome;

			if successes >= required {
				debug!(successes, "success quota reached");
				break;
			}
		}
	}
}
