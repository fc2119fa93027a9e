//! Provider payload schema and conversion into [`EnrichedItem`].
//!
//! Only the fields the enricher needs are modelled; everything else in the
//! provider response is ignored. Missing optional sections fall back to empty
//! values rather than failing the whole decode.

use catalog_types::{Category, EnrichedItem, Rating};
use serde::{Deserialize, Deserializer};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("invalid product payload: {0}")]
pub struct PayloadError(String);

/// Top-level provider response envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductPayload {
	pub data: PayloadData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PayloadData {
	pub product: PayloadProduct,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PayloadProduct {
	#[serde(default)]
	pub id: u64,
	#[serde(default)]
	pub title_fa: String,
	#[serde(default)]
	pub url: PayloadUrl,
	#[serde(default)]
	pub status: String,
	#[serde(default)]
	pub is_inactive: bool,
	#[serde(default)]
	pub images: PayloadImages,
	#[serde(default)]
	pub rating: PayloadRating,
	#[serde(default)]
	pub breadcrumb: Vec<PayloadBreadcrumb>,
	/// The provider sends `[]` instead of an object for unavailable products.
	#[serde(default, deserialize_with = "object_or_none")]
	pub default_variant: Option<PayloadVariant>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PayloadUrl {
	#[serde(default)]
	pub uri: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PayloadImages {
	#[serde(default)]
	pub main: PayloadImage,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PayloadImage {
	#[serde(default)]
	pub url: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PayloadRating {
	#[serde(default)]
	pub rate: f32,
	#[serde(default)]
	pub count: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PayloadBreadcrumb {
	pub title: String,
	#[serde(default)]
	pub url: PayloadUrl,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PayloadVariant {
	#[serde(default)]
	pub price: PayloadPrice,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PayloadPrice {
	#[serde(default)]
	pub selling_price: i64,
}

fn object_or_none<'de, D>(deserializer: D) -> Result<Option<PayloadVariant>, D::Error>
where
	D: Deserializer<'de>,
{
	let value = serde_json::Value::deserialize(deserializer)?;
	if !value.is_object() {
		return Ok(None);
	}
	serde_json::from_value(value)
		.map(Some)
		.map_err(serde::de::Error::custom)
}

impl ProductPayload {
	pub fn from_slice(bytes: &[u8]) -> Result<Self, PayloadError> {
		serde_json::from_slice(bytes).map_err(|e| PayloadError(e.to_string()))
	}

	pub fn is_inactive(&self) -> bool {
		self.data.product.is_inactive
	}

	/// Builds the enriched item for `product_id`.
	///
	/// Relative provider URIs are joined onto `site_base_url`. The id comes
	/// from the request rather than the payload, since the payload id is
	/// optional in older responses.
	pub fn into_enriched(self, product_id: u64, site_base_url: &str, score: f32) -> EnrichedItem {
		let product = self.data.product;
		let base = site_base_url.trim_end_matches('/');

		let categories = product
			.breadcrumb
			.into_iter()
			.map(|crumb| Category {
				title: crumb.title,
				url: join_url(base, &crumb.url.uri),
			})
			.collect();

		EnrichedItem {
			id: product_id,
			title: product.title_fa,
			url: join_url(base, &product.url.uri),
			status: product.status,
			image_url: product.images.main.url.into_iter().next().unwrap_or_default(),
			rating: Rating {
				rate: product.rating.rate,
				count: product.rating.count,
			},
			categories,
			price: product
				.default_variant
				.map(|variant| variant.price.selling_price)
				.unwrap_or_default(),
			score,
		}
	}
}

fn join_url(base: &str, uri: &str) -> String {
	if uri.starts_with("http://") || uri.starts_with("https://") {
		return uri.to_string();
	}
	format!("{}{}", base, uri)
}
