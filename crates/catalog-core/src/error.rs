// catalog-core/src/error.rs

use catalog_provider::ProviderError;
use catalog_storage::StorageError;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Where a payload that failed to decode came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadOrigin {
	Cache,
	Upstream,
}

impl fmt::Display for PayloadOrigin {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Cache => write!(f, "cached"),
			Self::Upstream => write!(f, "upstream"),
		}
	}
}

/// Discriminator for [`FetchError`], used for retry classification and by
/// transports that map failures onto their own status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
	InvalidIdentifier,
	Inactive,
	Canceled,
	Upstream,
	MalformedPayload,
	RetriesExhausted,
}

impl ErrorKind {
	pub fn as_str(&self) -> &'static str {
		match self {
			Self::InvalidIdentifier => "invalid_identifier",
			Self::Inactive => "inactive",
			Self::Canceled => "canceled",
			Self::Upstream => "upstream",
			Self::MalformedPayload => "malformed_payload",
			Self::RetriesExhausted => "retries_exhausted",
		}
	}
}

/// Per-item resolution failure. Every variant names the item it belongs to.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
	#[error("invalid product identifier '{item_id}'")]
	InvalidIdentifier { item_id: String },

	#[error("product {item_id} is inactive")]
	Inactive { item_id: String },

	#[error("fetching product {item_id} was canceled")]
	Canceled { item_id: String },

	#[error("failed to fetch product {item_id}: {cause}")]
	Upstream {
		item_id: String,
		#[source]
		cause: ProviderError,
	},

	#[error("malformed {origin} payload for product {item_id}: {reason}")]
	MalformedPayload {
		item_id: String,
		origin: PayloadOrigin,
		reason: String,
	},

	#[error("failed to fetch product {item_id} after {retries} retries: {last}")]
	RetriesExhausted {
		item_id: String,
		retries: u32,
		last: Box<FetchError>,
	},
}

impl FetchError {
	pub fn canceled(item_id: &str) -> Self {
		Self::Canceled {
			item_id: item_id.to_string(),
		}
	}

	pub fn item_id(&self) -> &str {
		match self {
			Self::InvalidIdentifier { item_id }
			| Self::Inactive { item_id }
			| Self::Canceled { item_id }
			| Self::Upstream { item_id, .. }
			| Self::MalformedPayload { item_id, .. }
			| Self::RetriesExhausted { item_id, .. } => item_id,
		}
	}

	pub fn kind(&self) -> ErrorKind {
		match self {
			Self::InvalidIdentifier { .. } => ErrorKind::InvalidIdentifier,
			Self::Inactive { .. } => ErrorKind::Inactive,
			Self::Canceled { .. } => ErrorKind::Canceled,
			Self::Upstream { .. } => ErrorKind::Upstream,
			Self::MalformedPayload { .. } => ErrorKind::MalformedPayload,
			Self::RetriesExhausted { .. } => ErrorKind::RetriesExhausted,
		}
	}

	/// Terminal errors are returned without retrying.
	pub fn is_terminal(&self) -> bool {
		matches!(
			self.kind(),
			ErrorKind::InvalidIdentifier | ErrorKind::Inactive | ErrorKind::Canceled
		)
	}
}

#[derive(Debug, Error)]
pub enum ShutdownError {
	#[error("{job} did not stop within {timeout:?}")]
	Timeout { job: String, timeout: Duration },

	#[error("{job} failed to stop: {reason}")]
	Failed { job: String, reason: String },

	#[error("{} job(s) failed to shut down: {}", .0.len(), join_errors(.0))]
	Aggregate(Vec<ShutdownError>),
}

fn join_errors(errors: &[ShutdownError]) -> String {
	errors
		.iter()
		.map(ToString::to_string)
		.collect::<Vec<_>>()
		.join("; ")
}

/// Errors raised while assembling a [`crate::ProductFetcher`].
#[derive(Debug, Error)]
pub enum BuildError {
	#[error("Configuration error: {0}")]
	Configuration(String),

	#[error("Storage error: {0}")]
	Storage(#[from] StorageError),

	#[error("Provider error: {0}")]
	Provider(#[from] ProviderError),
}
