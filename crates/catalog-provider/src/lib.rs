//! Upstream product catalog client.
//!
//! The fetch pipeline talks to the product catalog through [`ProductProvider`],
//! which performs a single remote lookup per product and hands back the raw
//! payload untouched so it can be cached verbatim. [`payload`] turns that raw
//! payload into the shared [`catalog_types::EnrichedItem`].

use async_trait::async_trait;
use thiserror::Error;

pub mod http;
pub mod payload;

pub use http::{HttpProvider, HttpProviderConfig};
pub use payload::{PayloadError, ProductPayload};

/// Errors returned by a provider lookup.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
	/// The request never produced a response (connect, timeout, TLS, ...).
	#[error("transport error: {0}")]
	Transport(String),
	/// The provider answered with a non-success status.
	#[error("unexpected status {status}")]
	Status { status: u16 },
	/// The response body could not be read.
	#[error("failed to read response body: {0}")]
	Body(String),
}

/// A remote source of product payloads.
#[async_trait]
pub trait ProductProvider: Send + Sync {
	/// Fetches the raw payload for one product.
	async fn fetch(&self, product_id: u64) -> Result<Vec<u8>, ProviderError>;

	/// Short name used in logs.
	fn name(&self) -> &str;
}
