//! Admission control for concurrent resolutions.

use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Error)]
#[error("admission canceled")]
pub struct AdmissionCanceled;

/// Capacity held by one admitted operation. Dropping it releases the slot.
#[derive(Debug)]
pub struct Permit {
	_permit: OwnedSemaphorePermit,
}

/// Counting semaphore that admits at most `capacity` operations at a time.
#[derive(Debug)]
pub struct Dispatcher {
	semaphore: Arc<Semaphore>,
	capacity: usize,
}

impl Dispatcher {
	/// A capacity of zero is raised to one so admission can always progress.
	pub fn new(capacity: usize) -> Self {
		let capacity = capacity.max(1);
		Self {
			semaphore: Arc::new(Semaphore::new(capacity)),
			capacity,
		}
	}

	/// Waits until fewer than `capacity` operations are admitted.
	///
	/// Returns [`AdmissionCanceled`] if `cancel` fires first, in which case
	/// the caller must not start its work.
	pub async fn admit(&self, cancel: &CancellationToken) -> Result<Permit, AdmissionCanceled> {
		tokio::select! {
			biased;
			_ = cancel.cancelled() => Err(AdmissionCanceled),
			permit = self.semaphore.clone().acquire_owned() => permit
				.map(|permit| Permit { _permit: permit })
				.map_err(|_| AdmissionCanceled),
		}
	}

	pub fn release(&self, permit: Permit) {
		drop(permit);
	}

	pub fn capacity(&self) -> usize {
		self.capacity
	}

	pub fn in_flight(&self) -> usize {
		self.capacity - self.semaphore.available_permits()
	}
}
