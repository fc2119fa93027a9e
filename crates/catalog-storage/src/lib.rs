//! Cache storage for the catalog enricher.
//!
//! This module provides a key-value abstraction used as the cache-aside store
//! for raw provider payloads, with in-memory and file-based backends. Backends
//! report a missing key through the distinguished [`StorageError::NotFound`]
//! so callers can tell a miss apart from an unhealthy store.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod file;
	pub mod memory;
	pub mod redis;
}

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
	/// Error that occurs when a requested item is not found.
	#[error("Not found")]
	NotFound,
	/// Error that occurs in the storage backend.
	#[error("Backend error: {0}")]
	Backend(String),
	/// Error that occurs when a backend cannot be built from configuration.
	#[error("Configuration error: {0}")]
	Configuration(String),
}

impl StorageError {
	pub fn is_not_found(&self) -> bool {
		matches!(self, StorageError::NotFound)
	}
}

/// Trait defining the low-level interface for storage backends.
///
/// It provides basic key-value operations with optional TTL support. A `None`
/// TTL means the entry never expires and is only dropped by the backend's own
/// eviction policy.
#[async_trait]
pub trait StorageInterface: Send + Sync {
	/// Retrieves raw bytes for the given key.
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError>;

	/// Stores raw bytes with optional time-to-live.
	async fn set_bytes(
		&self,
		key: &str,
		value: Vec<u8>,
		ttl: Option<Duration>,
	) -> Result<(), StorageError>;

	/// Deletes the value associated with the given key.
	async fn delete(&self, key: &str) -> Result<(), StorageError>;

	/// Checks if a key exists in storage.
	async fn exists(&self, key: &str) -> Result<bool, StorageError>;
}

/// Namespaced access to a storage backend.
///
/// The namespace and id are combined as `namespace:id` to form the backend key,
/// so `product` + `42` is stored under `product:42`.
pub struct StorageService {
	/// The underlying storage backend implementation.
	backend: Box<dyn StorageInterface>,
}

impl StorageService {
	/// Creates a new StorageService with the specified backend.
	pub fn new(backend: Box<dyn StorageInterface>) -> Self {
		Self { backend }
	}

	pub fn key(namespace: &str, id: &str) -> String {
		format!("{}:{}", namespace, id)
	}

	/// Retrieves the raw bytes stored for `namespace:id`.
	pub async fn retrieve_bytes(&self, namespace: &str, id: &str) -> Result<Vec<u8>, StorageError> {
		self.backend.get_bytes(&Self::key(namespace, id)).await
	}

	/// Stores raw bytes under `namespace:id` with an optional time-to-live.
	pub async fn store_bytes(
		&self,
		namespace: &str,
		id: &str,
		data: Vec<u8>,
		ttl: Option<Duration>,
	) -> Result<(), StorageError> {
		self.backend
			.set_bytes(&Self::key(namespace, id), data, ttl)
			.await
	}

	/// Removes a value from storage.
	pub async fn remove(&self, namespace: &str, id: &str) -> Result<(), StorageError> {
		self.backend.delete(&Self::key(namespace, id)).await
	}
}

/// Builds a storage backend by name.
///
/// Supported backends are `memory`, `file` and `redis`; `config` is the backend's own
/// TOML table (see each implementation's `create_storage`).
pub fn create_storage(
	backend: &str,
	config: &toml::Value,
) -> Result<Box<dyn StorageInterface>, StorageError> {
	match backend {
		"memory" => Ok(implementations::memory::create_storage(config)),
		"file" => Ok(implementations::file::create_storage(config)),
		"redis" => implementations::redis::create_storage(config),
		other => Err(StorageError::Configuration(format!(
			"unknown storage backend: {}",
			other
		))),
	}
}
