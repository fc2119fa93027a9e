//! Redis storage backend.
//!
//! Shares the cache between service instances. A missing key is reported as
//! [`StorageError::NotFound`]; entries without a TTL are written with a plain
//! `SET` and never expire.

use crate::{StorageError, StorageInterface};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::info;

const DEFAULT_URL: &str = "redis://127.0.0.1:6379";

/// Redis storage implementation.
///
/// The connection is opened on first use and re-established by the
/// connection manager after failures.
pub struct RedisStorage {
	client: redis::Client,
	connection: OnceCell<ConnectionManager>,
}

impl RedisStorage {
	pub fn new(url: &str) -> Result<Self, StorageError> {
		let client = redis::Client::open(url)
			.map_err(|e| StorageError::Configuration(format!("invalid redis url: {}", e)))?;
		Ok(Self {
			client,
			connection: OnceCell::new(),
		})
	}

	async fn connection(&self) -> Result<ConnectionManager, StorageError> {
		let connection = self
			.connection
			.get_or_try_init(|| async {
				let connection = self.client.get_connection_manager().await?;
				info!("Connected to redis");
				Ok::<_, redis::RedisError>(connection)
			})
			.await
			.map_err(backend_error)?;
		Ok(connection.clone())
	}
}

fn backend_error(e: redis::RedisError) -> StorageError {
	StorageError::Backend(e.to_string())
}

#[async_trait]
impl StorageInterface for RedisStorage {
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError> {
		let mut conn = self.connection().await?;
		let value: Option<Vec<u8>> = conn.get(key).await.map_err(backend_error)?;
		value.ok_or(StorageError::NotFound)
	}

	async fn set_bytes(
		&self,
		key: &str,
		value: Vec<u8>,
		ttl: Option<Duration>,
	) -> Result<(), StorageError> {
		let mut conn = self.connection().await?;
		match ttl {
			Some(ttl) => conn
				.set_ex::<_, _, ()>(key, value, ttl.as_secs().max(1))
				.await
				.map_err(backend_error),
			None => conn
				.set::<_, _, ()>(key, value)
				.await
				.map_err(backend_error),
		}
	}

	async fn delete(&self, key: &str) -> Result<(), StorageError> {
		let mut conn = self.connection().await?;
		conn.del::<_, ()>(key).await.map_err(backend_error)
	}

	async fn exists(&self, key: &str) -> Result<bool, StorageError> {
		let mut conn = self.connection().await?;
		conn.exists(key).await.map_err(backend_error)
	}
}

/// Factory function to create a redis backend from configuration.
///
/// Configuration parameters:
/// - `url`: Connection URL (default: "redis://127.0.0.1:6379")
pub fn create_storage(config: &toml::Value) -> Result<Box<dyn StorageInterface>, StorageError> {
	let url = config
		.get("url")
		.and_then(|v| v.as_str())
		.unwrap_or(DEFAULT_URL);

	Ok(Box::new(RedisStorage::new(url)?))
}
