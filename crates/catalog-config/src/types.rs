//! Configuration types for the catalog enricher.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Complete service configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct CatalogConfig {
	/// Process-level settings
	pub service: ServiceSettings,
	/// Fetch pipeline tuning
	pub fetcher: FetcherSettings,
	/// Upstream product catalog
	pub provider: ProviderSettings,
	/// Payload cache
	pub cache: CacheSettings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
	#[default]
	Pretty,
	Json,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServiceSettings {
	pub name: String,
	pub http_port: u16,
	pub log_level: String,
	pub log_format: LogFormat,
	/// Time budget for stopping all jobs on a termination signal
	pub shutdown_timeout_secs: u64,
	/// Deadline for a single fetch request
	pub request_timeout_secs: u64,
}

impl Default for ServiceSettings {
	fn default() -> Self {
		Self {
			name: "catalog-enricher".to_string(),
			http_port: 8080,
			log_level: "info".to_string(),
			log_format: LogFormat::Pretty,
			shutdown_timeout_secs: 5,
			request_timeout_secs: 10,
		}
	}
}

impl ServiceSettings {
	pub fn shutdown_timeout(&self) -> Duration {
		Duration::from_secs(self.shutdown_timeout_secs)
	}

	pub fn request_timeout(&self) -> Duration {
		Duration::from_secs(self.request_timeout_secs)
	}
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FetcherSettings {
	/// Retries after the first failed attempt of an item
	pub max_retries: u32,
	/// Maximum number of items resolved at the same time
	pub concurrency: usize,
	/// Fixed wait between attempts
	pub retry_backoff_ms: u64,
}

impl Default for FetcherSettings {
	fn default() -> Self {
		Self {
			max_retries: 3,
			concurrency: 8,
			retry_backoff_ms: 1000,
		}
	}
}

impl FetcherSettings {
	pub fn retry_backoff(&self) -> Duration {
		Duration::from_millis(self.retry_backoff_ms)
	}
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProviderSettings {
	/// Public site root used to build product and category links
	pub base_url: String,
	/// Product API root
	pub api_base_url: String,
	pub request_timeout_secs: u64,
	pub user_agent: Option<String>,
}

impl Default for ProviderSettings {
	fn default() -> Self {
		Self {
			base_url: "https://www.digikala.com".to_string(),
			api_base_url: "https://api.digikala.com/v2/product".to_string(),
			request_timeout_secs: 10,
			user_agent: None,
		}
	}
}

impl ProviderSettings {
	pub fn request_timeout(&self) -> Duration {
		Duration::from_secs(self.request_timeout_secs)
	}
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheSettings {
	/// Storage backend name: `memory`, `file` or `redis`
	pub backend: String,
	/// Namespace prepended to product ids in cache keys
	pub key_prefix: String,
	/// Entry lifetime; absent or 0 keeps entries until the backend evicts them
	pub ttl_secs: Option<u64>,
	/// Backend-specific settings
	pub config: toml::Value,
}

impl Default for CacheSettings {
	fn default() -> Self {
		Self {
			backend: "memory".to_string(),
			key_prefix: "product".to_string(),
			ttl_secs: None,
			config: toml::Value::Table(Default::default()),
		}
	}
}

impl CacheSettings {
	pub fn ttl(&self) -> Option<Duration> {
		self.ttl_secs
			.filter(|secs| *secs > 0)
			.map(Duration::from_secs)
	}
}
