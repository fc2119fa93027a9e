use serde::{Deserialize, Serialize};

/// Product metadata resolved from the upstream catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedItem {
	pub id: u64,
	pub title: String,
	/// Absolute product page URL.
	pub url: String,
	/// Provider status string, e.g. `marketable`.
	pub status: String,
	/// First main image, empty when the provider lists none.
	pub image_url: String,
	pub rating: Rating,
	/// Breadcrumb categories ordered from root to leaf.
	pub categories: Vec<Category>,
	pub price: i64,
	/// Ranking score copied from the candidate this item was resolved for.
	pub score: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rating {
	pub rate: f32,
	pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
	pub title: String,
	pub url: String,
}
