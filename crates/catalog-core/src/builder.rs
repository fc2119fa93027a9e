// catalog-core/src/builder.rs

use crate::error::BuildError;
use crate::fetcher::ProductFetcher;
use crate::resolver::{ItemResolver, ResolverSettings};
use crate::retry::{RetryPolicy, RetryingResolver};
use catalog_config::{CatalogConfig, ConfigLoader};
use catalog_provider::{HttpProvider, HttpProviderConfig, ProductProvider};
use catalog_storage::{StorageInterface, StorageService};
use std::sync::Arc;
use tracing::info;

/// Assembles a [`ProductFetcher`] from configuration.
///
/// Storage and provider are created from the `cache` and `provider`
/// sections unless replaced with [`with_storage`](Self::with_storage) or
/// [`with_provider`](Self::with_provider).
pub struct FetcherBuilder {
	config: CatalogConfig,
	storage: Option<Box<dyn StorageInterface>>,
	provider: Option<Arc<dyn ProductProvider>>,
}

impl FetcherBuilder {
	pub fn new(config: CatalogConfig) -> Self {
		Self {
			config,
			storage: None,
			provider: None,
		}
	}

	pub fn with_storage(mut self, storage: Box<dyn StorageInterface>) -> Self {
		self.storage = Some(storage);
		self
	}

	pub fn with_provider(mut self, provider: Arc<dyn ProductProvider>) -> Self {
		self.provider = Some(provider);
		self
	}

	pub fn build(self) -> Result<ProductFetcher, BuildError> {
		ConfigLoader::validate(&self.config)
			.map_err(|e| BuildError::Configuration(e.to_string()))?;

		let cache = &self.config.cache;
		let backend = match self.storage {
			Some(storage) => storage,
			None => catalog_storage::create_storage(&cache.backend, &cache.config)?,
		};
		let storage = Arc::new(StorageService::new(backend));

		let provider = match self.provider {
			Some(provider) => provider,
			None => {
				let settings = &self.config.provider;
				Arc::new(HttpProvider::new(HttpProviderConfig {
					api_base_url: settings.api_base_url.clone(),
					request_timeout: settings.request_timeout(),
					user_agent: settings.user_agent.clone(),
				})?)
			}
		};

		let resolver = ItemResolver::new(
			storage,
			provider.clone(),
			ResolverSettings {
				site_base_url: self.config.provider.base_url.clone(),
				key_prefix: cache.key_prefix.clone(),
				cache_ttl: cache.ttl(),
			},
		);
		let fetcher = &self.config.fetcher;
		let policy = RetryPolicy {
			max_retries: fetcher.max_retries,
			backoff: fetcher.retry_backoff(),
		};

		info!(
			provider = provider.name(),
			cache = %cache.backend,
			concurrency = fetcher.concurrency,
			max_retries = fetcher.max_retries,
			"Product fetcher ready"
		);

		Ok(ProductFetcher::new(
			RetryingResolver::new(resolver, policy),
			fetcher.concurrency,
		))
	}
}
