//! File-based storage backend.
//!
//! Each key is stored as one file under a base directory. Files start with an
//! 8-byte big-endian header holding the expiry as seconds since the Unix epoch
//! (0 for entries that never expire), followed by the raw value.

use crate::{StorageError, StorageInterface};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::fs;
use tracing::debug;

const HEADER_LEN: usize = 8;

/// File-based storage implementation.
pub struct FileStorage {
	/// Base directory path for storing files.
	base_path: PathBuf,
	/// Distinguishes temp files of concurrent writes
	write_seq: AtomicU64,
}

impl FileStorage {
	/// Creates a new FileStorage instance with the specified base path.
	pub fn new(base_path: PathBuf) -> Self {
		Self {
			base_path,
			write_seq: AtomicU64::new(0),
		}
	}

	/// Converts a storage key to a filesystem-safe file path.
	fn get_file_path(&self, key: &str) -> PathBuf {
		let safe_key = key.replace(['/', ':', '\\'], "_");
		self.base_path.join(format!("{}.bin", safe_key))
	}

	/// Temp file next to `path`, unique per write and process.
	fn temp_path(&self, path: &Path) -> PathBuf {
		let seq = self.write_seq.fetch_add(1, Ordering::Relaxed);
		let mut name = path.file_name().unwrap_or_default().to_os_string();
		name.push(format!(".{}.{}.tmp", std::process::id(), seq));
		path.with_file_name(name)
	}

	fn now_secs() -> u64 {
		SystemTime::now()
			.duration_since(UNIX_EPOCH)
			.map(|d| d.as_secs())
			.unwrap_or_default()
	}

	fn encode(value: Vec<u8>, ttl: Option<Duration>) -> Vec<u8> {
		let expires_at = match ttl {
			Some(ttl) => Self::now_secs().saturating_add(ttl.as_secs().max(1)),
			None => 0,
		};
		let mut bytes = Vec::with_capacity(HEADER_LEN + value.len());
		bytes.extend_from_slice(&expires_at.to_be_bytes());
		bytes.extend_from_slice(&value);
		bytes
	}

	/// Splits a stored file into its expiry and value.
	fn decode(mut bytes: Vec<u8>) -> Result<(u64, Vec<u8>), StorageError> {
		if bytes.len() < HEADER_LEN {
			return Err(StorageError::Backend("truncated cache file".to_string()));
		}
		let mut header = [0u8; HEADER_LEN];
		header.copy_from_slice(&bytes[..HEADER_LEN]);
		let value = bytes.split_off(HEADER_LEN);
		Ok((u64::from_be_bytes(header), value))
	}

	fn is_expired(expires_at: u64) -> bool {
		expires_at != 0 && expires_at <= Self::now_secs()
	}

	async fn read_entry(&self, key: &str) -> Result<Vec<u8>, StorageError> {
		let path = self.get_file_path(key);

		let bytes = match fs::read(&path).await {
			Ok(data) => data,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
				return Err(StorageError::NotFound)
			}
			Err(e) => return Err(StorageError::Backend(e.to_string())),
		};

		let (expires_at, value) = Self::decode(bytes)?;
		if Self::is_expired(expires_at) {
			debug!(key, "dropping expired cache file");
			let _ = fs::remove_file(&path).await;
			return Err(StorageError::NotFound);
		}
		Ok(value)
	}
}

#[async_trait]
impl StorageInterface for FileStorage {
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError> {
		self.read_entry(key).await
	}

	async fn set_bytes(
		&self,
		key: &str,
		value: Vec<u8>,
		ttl: Option<Duration>,
	) -> Result<(), StorageError> {
		let path = self.get_file_path(key);

		if let Some(parent) = path.parent() {
			fs::create_dir_all(parent)
				.await
				.map_err(|e| StorageError::Backend(e.to_string()))?;
		}

		// Write atomically by writing to temp file then renaming
		let temp_path = self.temp_path(&path);
		fs::write(&temp_path, Self::encode(value, ttl))
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?;

		if let Err(e) = fs::rename(&temp_path, &path).await {
			let _ = fs::remove_file(&temp_path).await;
			return Err(StorageError::Backend(e.to_string()));
		}

		Ok(())
	}

	async fn delete(&self, key: &str) -> Result<(), StorageError> {
		let path = self.get_file_path(key);

		match fs::remove_file(&path).await {
			Ok(_) => Ok(()),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
			Err(e) => Err(StorageError::Backend(e.to_string())),
		}
	}

	async fn exists(&self, key: &str) -> Result<bool, StorageError> {
		match self.read_entry(key).await {
			Ok(_) => Ok(true),
			Err(StorageError::NotFound) => Ok(false),
			Err(e) => Err(e),
		}
	}
}

/// Factory function to create a file backend from configuration.
///
/// Configuration parameters:
/// - `storage_path`: Base directory for cache files (default: "./data/cache")
pub fn create_storage(config: &toml::Value) -> Box<dyn StorageInterface> {
	let storage_path = config
		.get("storage_path")
		.and_then(|v| v.as_str())
		.unwrap_or("./data/cache")
		.to_string();

	Box::new(FileStorage::new(PathBuf::from(storage_path)))
}
