//! Test doubles shared by the pipeline tests.

use async_trait::async_trait;
use catalog_provider::{ProductProvider, ProviderError};
use catalog_storage::{StorageError, StorageInterface};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub(crate) fn product_json(id: u64, inactive: bool) -> Vec<u8> {
	serde_json::json!({
		"status": 200,
		"data": {
			"product": {
				"id": id,
				"title_fa": format!("Product {}", id),
				"url": { "uri": format!("/product/dkp-{}/", id) },
				"status": "marketable",
				"is_inactive": inactive,
				"images": { "main": { "url": [format!("https://img.example/{}.jpg", id)] } },
				"rating": { "rate": 80, "count": 10 },
				"breadcrumb": [
					{ "title": "Home", "url": { "uri": "/" } },
					{ "title": "Leaf", "url": { "uri": "/leaf/" } }
				],
				"default_variant": { "price": { "selling_price": id * 100 } }
			}
		}
	})
	.to_string()
	.into_bytes()
}

#[derive(Debug, Clone)]
pub(crate) enum Reply {
	Product,
	Inactive,
	Fail(ProviderError),
	Body(Vec<u8>),
	/// Never completes; only cancellation gets the caller out.
	Hang,
}

/// Provider answering from per-product scripts.
///
/// Each product pops the next scripted reply; once its script is empty it
/// answers with a valid active product. Tracks calls and peak concurrency.
#[derive(Default)]
pub(crate) struct ScriptedProvider {
	scripts: Mutex<HashMap<u64, VecDeque<Reply>>>,
	delays: Mutex<HashMap<u64, Duration>>,
	default_delay: Duration,
	calls: Mutex<Vec<u64>>,
	active: AtomicUsize,
	peak: AtomicUsize,
}

struct ActiveGuard<'a>(&'a AtomicUsize);

impl Drop for ActiveGuard<'_> {
	fn drop(&mut self) {
		self.0.fetch_sub(1, Ordering::SeqCst);
	}
}

impl ScriptedProvider {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_default_delay(mut self, delay: Duration) -> Self {
		self.default_delay = delay;
		self
	}

	pub fn script(self, product_id: u64, replies: impl IntoIterator<Item = Reply>) -> Self {
		self.scripts
			.lock()
			.unwrap()
			.insert(product_id, replies.into_iter().collect());
		self
	}

	pub fn delay(self, product_id: u64, delay: Duration) -> Self {
		self.delays.lock().unwrap().insert(product_id, delay);
		self
	}

	pub fn calls(&self) -> Vec<u64> {
		self.calls.lock().unwrap().clone()
	}

	pub fn calls_for(&self, product_id: u64) -> usize {
		self.calls().iter().filter(|id| **id == product_id).count()
	}

	pub fn peak(&self) -> usize {
		self.peak.load(Ordering::SeqCst)
	}
}

#[async_trait]
impl ProductProvider for ScriptedProvider {
	async fn fetch(&self, product_id: u64) -> Result<Vec<u8>, ProviderError> {
		self.calls.lock().unwrap().push(product_id);
		let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
		self.peak.fetch_max(active, Ordering::SeqCst);
		let _guard = ActiveGuard(&self.active);

		let delay = self
			.delays
			.lock()
			.unwrap()
			.get(&product_id)
			.copied()
			.unwrap_or(self.default_delay);
		if !delay.is_zero() {
			tokio::time::sleep(delay).await;
		}

		let reply = self
			.scripts
			.lock()
			.unwrap()
			.get_mut(&product_id)
			.and_then(VecDeque::pop_front)
			.unwrap_or(Reply::Product);

		match reply {
			Reply::Product => Ok(product_json(product_id, false)),
			Reply::Inactive => Ok(product_json(product_id, true)),
			Reply::Fail(err) => Err(err),
			Reply::Body(body) => Ok(body),
			Reply::Hang => std::future::pending().await,
		}
	}

	fn name(&self) -> &str {
		"scripted"
	}
}

/// Storage whose every operation fails, for fail-open checks.
#[derive(Default)]
pub(crate) struct BrokenStorage {
	pub writes: Arc<AtomicUsize>,
}

#[async_trait]
impl StorageInterface for BrokenStorage {
	async fn get_bytes(&self, _key: &str) -> Result<Vec<u8>, StorageError> {
		Err(StorageError::Backend("connection refused".to_string()))
	}

	async fn set_bytes(
		&self,
		_key: &str,
		_value: Vec<u8>,
		_ttl: Option<Duration>,
	) -> Result<(), StorageError> {
		self.writes.fetch_add(1, Ordering::SeqCst);
		Err(StorageError::Backend("connection refused".to_string()))
	}

	async fn delete(&self, _key: &str) -> Result<(), StorageError> {
		Err(StorageError::Backend("connection refused".to_string()))
	}

	async fn exists(&self, _key: &str) -> Result<bool, StorageError> {
		Err(StorageError::Backend("connection refused".to_string()))
	}
}
