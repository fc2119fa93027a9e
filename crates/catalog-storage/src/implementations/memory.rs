//! In-memory storage backend.
//!
//! Keeps entries in a `HashMap` behind a `RwLock`, with per-entry expiry and
//! an optional entry limit. When the limit is reached, expired entries are
//! dropped first and then the oldest insertions are evicted. Suitable for
//! single-instance deployments and tests; contents do not survive a restart.

use crate::{StorageError, StorageInterface};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::debug;

#[derive(Debug)]
struct Entry {
	value: Vec<u8>,
	deadline: Option<Instant>,
	/// Insertion sequence, matched against `MemoryData::order`
	seq: u64,
}

impl Entry {
	fn is_live(&self, now: Instant) -> bool {
		self.deadline.map_or(true, |d| d > now)
	}
}

#[derive(Debug, Default)]
struct MemoryData {
	entries: HashMap<String, Entry>,
	/// Keys in insertion order. Overwritten or removed keys leave stale
	/// records behind, recognised by a sequence mismatch.
	order: VecDeque<(u64, String)>,
	next_seq: u64,
}

impl MemoryData {
	fn insert(&mut self, key: &str, value: Vec<u8>, deadline: Option<Instant>) {
		let seq = self.next_seq;
		self.next_seq += 1;
		self.entries.insert(
			key.to_string(),
			Entry {
				value,
				deadline,
				seq,
			},
		);
		self.order.push_back((seq, key.to_string()));

		if self.order.len() > 2 * self.entries.len() + 16 {
			self.compact();
		}
	}

	fn compact(&mut self) {
		let entries = &self.entries;
		self.order
			.retain(|(seq, key)| entries.get(key).is_some_and(|e| e.seq == *seq));
	}

	fn purge_expired(&mut self, now: Instant) {
		self.entries.retain(|_, entry| entry.is_live(now));
	}

	/// Removes the oldest live insertion, returning its key.
	fn evict_oldest(&mut self) -> Option<String> {
		while let Some((seq, key)) = self.order.pop_front() {
			if self.entries.get(&key).is_some_and(|e| e.seq == seq) {
				self.entries.remove(&key);
				return Some(key);
			}
		}
		None
	}
}

/// In-memory storage implementation.
#[derive(Debug, Default)]
pub struct MemoryStorage {
	data: RwLock<MemoryData>,
	/// Maximum number of entries (None for unlimited)
	max_entries: Option<usize>,
}

impl MemoryStorage {
	pub fn new() -> Self {
		Self::default()
	}

	/// A limit of zero is raised to one.
	pub fn with_max_entries(max_entries: usize) -> Self {
		Self {
			data: RwLock::new(MemoryData::default()),
			max_entries: Some(max_entries.max(1)),
		}
	}
}

#[async_trait]
impl StorageInterface for MemoryStorage {
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError> {
		let now = Instant::now();
		{
			let data = self.data.read().await;
			match data.entries.get(key) {
				None => return Err(StorageError::NotFound),
				Some(entry) if entry.is_live(now) => return Ok(entry.value.clone()),
				Some(_) => {}
			}
		}

		// Expired: drop it so it does not count against the entry limit
		let mut data = self.data.write().await;
		if data.entries.get(key).is_some_and(|e| !e.is_live(now)) {
			data.entries.remove(key);
		}
		Err(StorageError::NotFound)
	}

	async fn set_bytes(
		&self,
		key: &str,
		value: Vec<u8>,
		ttl: Option<Duration>,
	) -> Result<(), StorageError> {
		let now = Instant::now();
		let deadline = ttl.map(|ttl| now + ttl);
		let mut data = self.data.write().await;

		if let Some(max) = self.max_entries {
			if !data.entries.contains_key(key) && data.entries.len() >= max {
				data.purge_expired(now);
				while data.entries.len() >= max {
					match data.evict_oldest() {
						Some(evicted) => debug!(key = %evicted, "evicted cache entry"),
						None => break,
					}
				}
			}
		}

		data.insert(key, value, deadline);
		Ok(())
	}

	async fn delete(&self, key: &str) -> Result<(), StorageError> {
		self.data.write().await.entries.remove(key);
		Ok(())
	}

	async fn exists(&self, key: &str) -> Result<bool, StorageError> {
		let now = Instant::now();
		Ok(self
			.data
			.read()
			.await
			.entries
			.get(key)
			.is_some_and(|entry| entry.is_live(now)))
	}
}

/// Factory function to create a memory backend from configuration.
///
/// Configuration parameters:
/// - `max_entries`: Maximum number of cached entries (default: unlimited)
pub fn create_storage(config: &toml::Value) -> Box<dyn StorageInterface> {
	let max_entries = config
		.get("max_entries")
		.and_then(|v| v.as_integer())
		.filter(|n| *n > 0)
		.map(|n| n as usize);

	match max_entries {
		Some(max) => Box::new(MemoryStorage::with_max_entries(max)),
		None => Box::new(MemoryStorage::new()),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn test_get_missing_key_is_not_found() {
		let storage = MemoryStorage::new();
		let err = storage.get_bytes("product:1").await.unwrap_err();
		assert!(err.is_not_found());
		assert!(!storage.exists("product:1").await.unwrap());
	}

	#[tokio::test]
	async fn test_set_without_ttl_persists() {
		let storage = MemoryStorage::new();
		storage
			.set_bytes("product:1", vec![1, 2, 3], None)
			.await
			.unwrap();

		assert_eq!(storage.get_bytes("product:1").await.unwrap(), vec![1, 2, 3]);
		assert!(storage.exists("product:1").await.unwrap());
	}

	#[tokio::test(start_paused = true)]
	async fn test_entry_expires_after_ttl() {
		let storage = MemoryStorage::new();
		storage
			.set_bytes("product:1", vec![9], Some(Duration::from_secs(30)))
			.await
			.unwrap();

		tokio::time::advance(Duration::from_secs(29)).await;
		assert_eq!(storage.get_bytes("product:1").await.unwrap(), vec![9]);

		tokio::time::advance(Duration::from_secs(2)).await;
		assert!(storage.get_bytes("product:1").await.unwrap_err().is_not_found());
		assert!(!storage.exists("product:1").await.unwrap());
	}

	#[tokio::test(start_paused = true)]
	async fn test_full_storage_reclaims_expired_entries_first() {
		let storage = MemoryStorage::with_max_entries(2);
		storage.set_bytes("a", vec![1], None).await.unwrap();
		storage
			.set_bytes("b", vec![2], Some(Duration::from_secs(1)))
			.await
			.unwrap();

		tokio::time::advance(Duration::from_secs(2)).await;
		storage.set_bytes("c", vec![3], None).await.unwrap();

		assert_eq!(storage.get_bytes("a").await.unwrap(), vec![1]);
		assert_eq!(storage.get_bytes("c").await.unwrap(), vec![3]);
	}

	#[tokio::test]
	async fn test_full_storage_evicts_oldest_insertion() {
		let storage = MemoryStorage::with_max_entries(2);
		storage.set_bytes("a", vec![1], None).await.unwrap();
		storage.set_bytes("b", vec![2], None).await.unwrap();
		// Overwriting refreshes the insertion order and never hits the limit
		storage.set_bytes("a", vec![10], None).await.unwrap();

		storage.set_bytes("c", vec![3], None).await.unwrap();

		assert!(storage.get_bytes("b").await.unwrap_err().is_not_found());
		assert_eq!(storage.get_bytes("a").await.unwrap(), vec![10]);
		assert_eq!(storage.get_bytes("c").await.unwrap(), vec![3]);
	}

	#[tokio::test]
	async fn test_deleted_keys_do_not_block_eviction() {
		let storage = MemoryStorage::with_max_entries(2);
		for round in 0..50u8 {
			let key = format!("k{}", round);
			storage.set_bytes(&key, vec![round], None).await.unwrap();
			if round % 3 == 0 {
				storage.delete(&key).await.unwrap();
			}
		}

		assert_eq!(storage.get_bytes("k49").await.unwrap(), vec![49]);
		assert_eq!(storage.data.read().await.entries.len(), 2);
	}

	#[tokio::test]
	async fn test_create_storage_reads_max_entries() {
		let config: toml::Value = toml::from_str("max_entries = 1").unwrap();
		let storage = create_storage(&config);

		storage.set_bytes("a", vec![1], None).await.unwrap();
		storage.set_bytes("b", vec![2], None).await.unwrap();
		assert!(storage.get_bytes("a").await.unwrap_err().is_not_found());
		assert_eq!(storage.get_bytes("b").await.unwrap(), vec![2]);
	}
}
