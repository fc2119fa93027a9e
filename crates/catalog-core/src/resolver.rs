//! Cache-aside resolution of a single candidate.

use crate::error::{FetchError, PayloadOrigin};
use catalog_provider::{ProductPayload, ProductProvider};
use catalog_storage::{StorageError, StorageService};
use catalog_types::{CandidateItem, EnrichedItem};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

/// Whether a resolution may be served from the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CacheMode {
	#[default]
	ReadThrough,
	/// Skip the lookup and go straight to the provider. The fresh payload
	/// still overwrites the cache entry.
	Bypass,
}

#[derive(Debug, Clone)]
pub struct ResolverSettings {
	/// Public site root joined with product and category URIs
	pub site_base_url: String,
	/// Cache namespace, entries are keyed `{key_prefix}:{product id}`
	pub key_prefix: String,
	/// Lifetime of cache entries written on a miss; `None` never expires
	pub cache_ttl: Option<Duration>,
}

impl Default for ResolverSettings {
	fn default() -> Self {
		Self {
			site_base_url: "https://www.digikala.com".to_string(),
			key_prefix: "product".to_string(),
			cache_ttl: None,
		}
	}
}

/// Resolves one candidate into an [`EnrichedItem`].
///
/// The cache is consulted first. A miss, or any cache failure other than a
/// miss, falls through to the provider; a successful provider response is
/// written back to the cache before it is decoded. Cache failures are logged
/// and never fail the resolution.
pub struct ItemResolver {
	storage: Arc<StorageService>,
	provider: Arc<dyn ProductProvider>,
	settings: ResolverSettings,
}

impl ItemResolver {
	pub fn new(
		storage: Arc<StorageService>,
		provider: Arc<dyn ProductProvider>,
		settings: ResolverSettings,
	) -> Self {
		Self {
			storage,
			provider,
			settings,
		}
	}

	pub async fn resolve(
		&self,
		cancel: &CancellationToken,
		item: &CandidateItem,
		mode: CacheMode,
	) -> Result<EnrichedItem, FetchError> {
		if cancel.is_cancelled() {
			return Err(FetchError::canceled(&item.id));
		}

		let product_id: u64 = item
			.id
			.parse()
			.map_err(|_| FetchError::InvalidIdentifier {
				item_id: item.id.clone(),
			})?;
		let cache_id = product_id.to_string();

		let cached = match mode {
			CacheMode::ReadThrough => self.read_cache(cancel, item, &cache_id).await?,
			CacheMode::Bypass => None,
		};

		let (raw, origin) = match cached {
			Some(raw) => (raw, PayloadOrigin::Cache),
			None => (
				self.fetch_upstream(cancel, item, product_id, &cache_id)
					.await?,
				PayloadOrigin::Upstream,
			),
		};

		let payload =
			ProductPayload::from_slice(&raw).map_err(|e| FetchError::MalformedPayload {
				item_id: item.id.clone(),
				origin,
				reason: e.to_string(),
			})?;

		if payload.is_inactive() {
			return Err(FetchError::Inactive {
				item_id: item.id.clone(),
			});
		}

		Ok(payload.into_enriched(product_id, &self.settings.site_base_url, item.score))
	}

	async fn read_cache(
		&self,
		cancel: &CancellationToken,
		item: &CandidateItem,
		cache_id: &str,
	) -> Result<Option<Vec<u8>>, FetchError> {
		let lookup = tokio::select! {
			biased;
			_ = cancel.cancelled() => return Err(FetchError::canceled(&item.id)),
			lookup = self.storage.retrieve_bytes(&self.settings.key_prefix, cache_id) => lookup,
		};

		match lookup {
			Ok(raw) => {
				debug!(item_id = %item.id, "cache hit");
				Ok(Some(raw))
			}
			Err(StorageError::NotFound) => Ok(None),
			Err(e) => {
				warn!(item_id = %item.id, error = %e, "cache lookup failed, falling back to provider");
				Ok(None)
			}
		}
	}

	async fn fetch_upstream(
		&self,
		cancel: &CancellationToken,
		item: &CandidateItem,
		product_id: u64,
		cache_id: &str,
	) -> Result<Vec<u8>, FetchError> {
		let response = tokio::select! {
			biased;
			_ = cancel.cancelled() => return Err(FetchError::canceled(&item.id)),
			response = self.provider.fetch(product_id) => response,
		};
		let raw = response.map_err(|cause| FetchError::Upstream {
			item_id: item.id.clone(),
			cause,
		})?;

		if let Err(e) = self
			.storage
			.store_bytes(
				&self.settings.key_prefix,
				cache_id,
				raw.clone(),
				self.settings.cache_ttl,
			)
			.await
		{
			error!(item_id = %item.id, error = %e, "failed to cache product payload");
		}

		Ok(raw)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::{BrokenStorage, Reply, ScriptedProvider};
	use catalog_provider::ProviderError;
	use catalog_storage::implementations::memory::MemoryStorage;
	use std::sync::atomic::Ordering;

	fn resolver_with(
		storage: StorageService,
		provider: Arc<ScriptedProvider>,
	) -> (ItemResolver, Arc<StorageService>) {
		let storage = Arc::new(storage);
		let resolver = ItemResolver::new(
			storage.clone(),
			provider,
			ResolverSettings {
				site_base_url: "https://shop.example".to_string(),
				..Default::default()
			},
		);
		(resolver, storage)
	}

	fn memory() -> StorageService {
		StorageService::new(Box::new(MemoryStorage::new()))
	}

	#[tokio::test]
	async fn test_miss_fetches_and_warm_cache_skips_provider() {
		let provider = Arc::new(ScriptedProvider::new());
		let (resolver, storage) = resolver_with(memory(), provider.clone());
		let cancel = CancellationToken::new();
		let item = CandidateItem::new("42", 0.7);

		let first = resolver
			.resolve(&cancel, &item, CacheMode::ReadThrough)
			.await
			.unwrap();
		assert_eq!(first.id, 42);
		assert_eq!(first.url, "https://shop.example/product/dkp-42/");
		assert_eq!(first.score, 0.7);
		assert!(storage.retrieve_bytes("product", "42").await.is_ok());

		let second = resolver
			.resolve(&cancel, &item, CacheMode::ReadThrough)
			.await
			.unwrap();
		assert_eq!(first, second);
		assert_eq!(provider.calls_for(42), 1);
	}

	#[tokio::test]
	async fn test_bypass_skips_cached_entry() {
		let provider = Arc::new(ScriptedProvider::new());
		let (resolver, storage) = resolver_with(memory(), provider.clone());
		storage
			.store_bytes("product", "9", b"garbage".to_vec(), None)
			.await
			.unwrap();

		let item = CandidateItem::new("9", 0.1);
		let resolved = resolver
			.resolve(&CancellationToken::new(), &item, CacheMode::Bypass)
			.await
			.unwrap();
		assert_eq!(resolved.id, 9);
		assert_eq!(provider.calls_for(9), 1);
		// The corrupt entry was replaced by the fresh payload
		assert_ne!(
			storage.retrieve_bytes("product", "9").await.unwrap(),
			b"garbage".to_vec()
		);
	}

	#[tokio::test]
	async fn test_broken_cache_fails_open() {
		let provider = Arc::new(ScriptedProvider::new());
		let broken = BrokenStorage::default();
		let writes = broken.writes.clone();
		let (resolver, _) = resolver_with(StorageService::new(Box::new(broken)), provider.clone());

		let resolved = resolver
			.resolve(
				&CancellationToken::new(),
				&CandidateItem::new("5", 0.5),
				CacheMode::ReadThrough,
			)
			.await
			.unwrap();
		assert_eq!(resolved.id, 5);
		assert_eq!(provider.calls_for(5), 1);
		// The write was attempted and its failure absorbed
		assert_eq!(writes.load(Ordering::SeqCst), 1);
	}

	#[tokio::test]
	async fn test_inactive_product_is_rejected() {
		let provider = Arc::new(ScriptedProvider::new().script(3, [Reply::Inactive]));
		let (resolver, _) = resolver_with(memory(), provider);

		let err = resolver
			.resolve(
				&CancellationToken::new(),
				&CandidateItem::new("3", 0.0),
				CacheMode::ReadThrough,
			)
			.await
			.unwrap_err();
		assert!(matches!(err, FetchError::Inactive { ref item_id } if item_id == "3"));
	}

	#[tokio::test]
	async fn test_invalid_identifier_never_reaches_provider() {
		let provider = Arc::new(ScriptedProvider::new());
		let (resolver, _) = resolver_with(memory(), provider.clone());

		let err = resolver
			.resolve(
				&CancellationToken::new(),
				&CandidateItem::new("dkp-12", 0.0),
				CacheMode::ReadThrough,
			)
			.await
			.unwrap_err();
		assert!(matches!(err, FetchError::InvalidIdentifier { .. }));
		assert!(provider.calls().is_empty());
	}

	#[tokio::test]
	async fn test_upstream_status_is_reported_and_not_cached() {
		let provider = Arc::new(
			ScriptedProvider::new().script(8, [Reply::Fail(ProviderError::Status { status: 404 })]),
		);
		let (resolver, storage) = resolver_with(memory(), provider);

		let err = resolver
			.resolve(
				&CancellationToken::new(),
				&CandidateItem::new("8", 0.0),
				CacheMode::ReadThrough,
			)
			.await
			.unwrap_err();
		assert!(matches!(
			err,
			FetchError::Upstream {
				cause: ProviderError::Status { status: 404 },
				..
			}
		));
		assert!(storage
			.retrieve_bytes("product", "8")
			.await
			.unwrap_err()
			.is_not_found());
	}

	#[tokio::test]
	async fn test_malformed_cached_payload_is_reported() {
		let provider = Arc::new(ScriptedProvider::new());
		let (resolver, storage) = resolver_with(memory(), provider.clone());
		storage
			.store_bytes("product", "11", b"{not json".to_vec(), None)
			.await
			.unwrap();

		let err = resolver
			.resolve(
				&CancellationToken::new(),
				&CandidateItem::new("11", 0.0),
				CacheMode::ReadThrough,
			)
			.await
			.unwrap_err();
		assert!(matches!(
			err,
			FetchError::MalformedPayload {
				origin: PayloadOrigin::Cache,
				..
			}
		));
		assert!(provider.calls().is_empty());
	}

	#[tokio::test]
	async fn test_malformed_upstream_payload_is_reported_and_cached() {
		let provider = Arc::new(
			ScriptedProvider::new().script(12, [Reply::Body(b"<html>".to_vec())]),
		);
		let (resolver, storage) = resolver_with(memory(), provider.clone());

		let err = resolver
			.resolve(
				&CancellationToken::new(),
				&CandidateItem::new("12", 0.0),
				CacheMode::ReadThrough,
			)
			.await
			.unwrap_err();
		assert!(matches!(
			err,
			FetchError::MalformedPayload {
				origin: PayloadOrigin::Upstream,
				..
			}
		));
		assert_eq!(
			storage.retrieve_bytes("product", "12").await.unwrap(),
			b"<html>".to_vec()
		);
		assert_eq!(provider.calls_for(12), 1);
	}

	#[tokio::test]
	async fn test_bounded_cache_keeps_caching_new_products() {
		let storage = StorageService::new(Box::new(MemoryStorage::with_max_entries(1)));
		let provider = Arc::new(ScriptedProvider::new());
		let (resolver, _) = resolver_with(storage, provider.clone());
		let cancel = CancellationToken::new();

		for id in ["1", "2", "2", "2"] {
			resolver
				.resolve(&cancel, &CandidateItem::new(id, 0.0), CacheMode::ReadThrough)
				.await
				.unwrap();
		}
		assert_eq!(provider.calls_for(1), 1);
		assert_eq!(provider.calls_for(2), 1);
	}

	#[tokio::test]
	async fn test_cancellation_aborts_provider_call() {
		let provider = Arc::new(ScriptedProvider::new().script(4, [Reply::Hang]));
		let (resolver, _) = resolver_with(memory(), provider);
		let cancel = CancellationToken::new();

		let canceller = {
			let cancel = cancel.clone();
			tokio::spawn(async move {
				tokio::time::sleep(Duration::from_millis(20)).await;
				cancel.cancel();
			})
		};

		let err = resolver
			.resolve(&cancel, &CandidateItem::new("4", 0.0), CacheMode::ReadThrough)
			.await
			.unwrap_err();
		assert!(matches!(err, FetchError::Canceled { .. }));
		canceller.await.unwrap();
	}
}
