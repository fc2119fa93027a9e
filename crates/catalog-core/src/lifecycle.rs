// catalog-core/src/lifecycle.rs

use crate::error::ShutdownError;
use async_trait::async_trait;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

/// A long-running job that can be asked to stop.
#[async_trait]
pub trait GracefulShutdown: Send + Sync {
	fn name(&self) -> String;

	/// Stops the job, giving in-flight work at most `timeout` to finish.
	async fn shutdown(&self, timeout: Duration) -> Result<(), ShutdownError>;
}

/// Jobs to stop when the process terminates.
#[derive(Default)]
pub struct JobRegistry {
	jobs: Vec<Arc<dyn GracefulShutdown>>,
}

impl JobRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn register(&mut self, job: Arc<dyn GracefulShutdown>) {
		info!(job = %job.name(), "Registered job");
		self.jobs.push(job);
	}

	pub fn len(&self) -> usize {
		self.jobs.len()
	}

	pub fn is_empty(&self) -> bool {
		self.jobs.is_empty()
	}

	/// Shuts every job down concurrently.
	///
	/// A job that ignores its own deadline is cut off by an outer timeout.
	/// All failures are collected into [`ShutdownError::Aggregate`].
	pub async fn shutdown_all(&self, timeout: Duration) -> Result<(), ShutdownError> {
		info!(jobs = self.jobs.len(), ?timeout, "Shutting down jobs");

		let results = join_all(self.jobs.iter().map(|job| async move {
			let name = job.name();
			match tokio::time::timeout(timeout, job.shutdown(timeout)).await {
				Ok(Ok(())) => {
					info!(job = %name, "Job stopped");
					Ok(())
				}
				Ok(Err(e)) => Err(e),
				Err(_) => Err(ShutdownError::Timeout { job: name, timeout }),
			}
		}))
		.await;

		let errors: Vec<_> = results.into_iter().filter_map(Result::err).collect();
		if errors.is_empty() {
			return Ok(());
		}
		for e in &errors {
			error!(error = %e, "Job shutdown failed");
		}
		Err(ShutdownError::Aggregate(errors))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::atomic::{AtomicBool, Ordering};

	struct Job {
		name: &'static str,
		stop_after: Duration,
		fail: bool,
		stopped: AtomicBool,
	}

	impl Job {
		fn new(name: &'static str, stop_after: Duration, fail: bool) -> Arc<Self> {
			Arc::new(Self {
				name,
				stop_after,
				fail,
				stopped: AtomicBool::new(false),
			})
		}
	}

	#[async_trait]
	impl GracefulShutdown for Job {
		fn name(&self) -> String {
			self.name.to_string()
		}

		async fn shutdown(&self, _timeout: Duration) -> Result<(), ShutdownError> {
			tokio::time::sleep(self.stop_after).await;
			self.stopped.store(true, Ordering::SeqCst);
			if self.fail {
				return Err(ShutdownError::Failed {
					job: self.name.to_string(),
					reason: "boom".to_string(),
				});
			}
			Ok(())
		}
	}

	#[tokio::test(start_paused = true)]
	async fn test_all_jobs_stop() {
		let a = Job::new("a", Duration::from_millis(10), false);
		let b = Job::new("b", Duration::from_millis(20), false);
		let mut registry = JobRegistry::new();
		registry.register(a.clone());
		registry.register(b.clone());

		registry.shutdown_all(Duration::from_secs(1)).await.unwrap();
		assert!(a.stopped.load(Ordering::SeqCst));
		assert!(b.stopped.load(Ordering::SeqCst));
	}

	#[tokio::test(start_paused = true)]
	async fn test_failures_are_aggregated() {
		let mut registry = JobRegistry::new();
		registry.register(Job::new("ok", Duration::ZERO, false));
		registry.register(Job::new("broken", Duration::ZERO, true));
		registry.register(Job::new("stuck", Duration::from_secs(60), false));

		let started = tokio::time::Instant::now();
		let err = registry.shutdown_all(Duration::from_secs(2)).await.unwrap_err();
		assert_eq!(started.elapsed(), Duration::from_secs(2));

		match err {
			ShutdownError::Aggregate(errors) => {
				assert_eq!(errors.len(), 2);
				assert!(matches!(&errors[0], ShutdownError::Failed { job, .. } if job == "broken"));
				assert!(matches!(&errors[1], ShutdownError::Timeout { job, .. } if job == "stuck"));
			}
			other => panic!("unexpected error: {other}"),
		}
	}

	#[tokio::test]
	async fn test_empty_registry() {
		let registry = JobRegistry::new();
		assert!(registry.is_empty());
		registry.shutdown_all(Duration::from_secs(1)).await.unwrap();
	}
}
