//! HTTP implementation of [`ProductProvider`] backed by `reqwest`.

use crate::{ProductProvider, ProviderError};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, instrument};

/// Connection settings for [`HttpProvider`].
#[derive(Debug, Clone)]
pub struct HttpProviderConfig {
	/// Product API root; a lookup requests `{api_base_url}/{id}/`.
	pub api_base_url: String,
	/// Per-request timeout.
	pub request_timeout: Duration,
	pub user_agent: Option<String>,
}

impl Default for HttpProviderConfig {
	fn default() -> Self {
		Self {
			api_base_url: "https://api.digikala.com/v2/product".to_string(),
			request_timeout: Duration::from_secs(10),
			user_agent: None,
		}
	}
}

/// Product provider that issues one `GET` per lookup.
#[derive(Debug, Clone)]
pub struct HttpProvider {
	client: reqwest::Client,
	api_base_url: String,
}

impl HttpProvider {
	pub fn new(config: HttpProviderConfig) -> Result<Self, ProviderError> {
		let mut builder = reqwest::Client::builder().timeout(config.request_timeout);
		if let Some(user_agent) = &config.user_agent {
			builder = builder.user_agent(user_agent.clone());
		}
		let client = builder
			.build()
			.map_err(|e| ProviderError::Transport(format!("failed to build client: {}", e)))?;

		Ok(Self {
			client,
			api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
		})
	}

	fn product_url(&self, product_id: u64) -> String {
		format!("{}/{}/", self.api_base_url, product_id)
	}
}

#[async_trait]
impl ProductProvider for HttpProvider {
	#[instrument(skip(self), fields(provider = "http"))]
	async fn fetch(&self, product_id: u64) -> Result<Vec<u8>, ProviderError> {
		let url = self.product_url(product_id);
		let response = self
			.client
			.get(&url)
			.send()
			.await
			.map_err(|e| ProviderError::Transport(e.to_string()))?;

		let status = response.status();
		if !status.is_success() {
			debug!(%url, %status, "provider returned non-success status");
			return Err(ProviderError::Status {
				status: status.as_u16(),
			});
		}

		let body = response
			.bytes()
			.await
			.map_err(|e| ProviderError::Body(e.to_string()))?;
		Ok(body.to_vec())
	}

	fn name(&self) -> &str {
		"http"
	}
}
