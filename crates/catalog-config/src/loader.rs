//! Configuration loading from files and environment.

use crate::{CatalogConfig, ConfigError};
use regex::Regex;
use std::env;
use std::path::Path;
use tracing::{debug, info};

const KNOWN_CACHE_BACKENDS: [&str; 3] = ["memory", "file", "redis"];

/// Configuration loader with environment variable substitution
pub struct ConfigLoader {
	file_path: Option<String>,
	env_prefix: String,
}

impl Default for ConfigLoader {
	fn default() -> Self {
		Self::new()
	}
}

impl ConfigLoader {
	pub fn new() -> Self {
		Self {
			file_path: None,
			env_prefix: "CATALOG_".to_string(),
		}
	}

	pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
		self.file_path = Some(path.as_ref().to_string_lossy().to_string());
		self
	}

	/// Uses an optional file; without one only defaults and environment
	/// overrides apply.
	pub fn with_optional_file<P: AsRef<Path>>(self, path: Option<P>) -> Self {
		match path {
			Some(path) => self.with_file(path),
			None => self,
		}
	}

	pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
		self.env_prefix = prefix.into();
		self
	}

	pub async fn load(&self) -> Result<CatalogConfig, ConfigError> {
		let mut config = match &self.file_path {
			Some(file_path) => self.load_from_file(file_path).await?,
			None => {
				info!("No config file specified, using defaults and environment");
				CatalogConfig::default()
			}
		};

		self.apply_env_overrides(&mut config)?;
		Self::validate(&config)?;

		Ok(config)
	}

	/// Parses a TOML document without touching the environment.
	pub fn from_toml(contents: &str) -> Result<CatalogConfig, ConfigError> {
		let config: CatalogConfig =
			toml::from_str(contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;
		Self::validate(&config)?;
		Ok(config)
	}

	async fn load_from_file(&self, file_path: &str) -> Result<CatalogConfig, ConfigError> {
		info!("Loading configuration from {}", file_path);
		let content = match tokio::fs::read_to_string(file_path).await {
			Ok(content) => content,
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
				return Err(ConfigError::FileNotFound(file_path.to_string()))
			}
			Err(e) => return Err(e.into()),
		};

		let substituted_content = Self::substitute_env_vars(&content)?;

		toml::from_str(&substituted_content).map_err(|e| ConfigError::ParseError(e.to_string()))
	}

	fn substitute_env_vars(content: &str) -> Result<String, ConfigError> {
		let mut result = content.to_string();

		// Find and replace ${VAR_NAME} patterns
		let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| ConfigError::ParseError(e.to_string()))?;

		for cap in re.captures_iter(content) {
			let full_match = &cap[0];
			let var_name = &cap[1];

			let env_value = env::var(var_name)
				.map_err(|_| ConfigError::EnvVarNotFound(var_name.to_string()))?;

			result = result.replace(full_match, &env_value);
		}

		Ok(result)
	}

	fn env_var(&self, name: &str) -> Option<String> {
		env::var(format!("{}{}", self.env_prefix, name)).ok()
	}

	fn apply_env_overrides(&self, config: &mut CatalogConfig) -> Result<(), ConfigError> {
		if let Some(log_level) = self.env_var("LOG_LEVEL") {
			debug!("Overriding log level from environment");
			config.service.log_level = log_level;
		}

		if let Some(http_port) = self.env_var("HTTP_PORT") {
			config.service.http_port = http_port
				.parse()
				.map_err(|e| ConfigError::ValidationError(format!("Invalid HTTP port: {}", e)))?;
		}

		if let Some(concurrency) = self.env_var("CONCURRENCY") {
			config.fetcher.concurrency = concurrency
				.parse()
				.map_err(|e| ConfigError::ValidationError(format!("Invalid concurrency: {}", e)))?;
		}

		if let Some(max_retries) = self.env_var("MAX_RETRIES") {
			config.fetcher.max_retries = max_retries
				.parse()
				.map_err(|e| ConfigError::ValidationError(format!("Invalid max retries: {}", e)))?;
		}

		if let Some(api_base_url) = self.env_var("PROVIDER_API_BASE_URL") {
			debug!("Overriding provider API base URL from environment");
			config.provider.api_base_url = api_base_url;
		}

		Ok(())
	}

	/// Validate configuration
	pub fn validate(config: &CatalogConfig) -> Result<(), ConfigError> {
		if config.fetcher.concurrency == 0 {
			return Err(ConfigError::ValidationError(
				"fetcher.concurrency must be at least 1".to_string(),
			));
		}

		for (field, url) in [
			("provider.base_url", &config.provider.base_url),
			("provider.api_base_url", &config.provider.api_base_url),
		] {
			if !(url.starts_with("http://") || url.starts_with("https://")) {
				return Err(ConfigError::ValidationError(format!(
					"{} must be an http(s) URL, got '{}'",
					field, url
				)));
			}
		}

		if config.provider.request_timeout_secs == 0 {
			return Err(ConfigError::ValidationError(
				"provider.request_timeout_secs must be positive".to_string(),
			));
		}

		if !KNOWN_CACHE_BACKENDS.contains(&config.cache.backend.as_str()) {
			return Err(ConfigError::ValidationError(format!(
				"Unknown cache backend '{}', expected one of {:?}",
				config.cache.backend, KNOWN_CACHE_BACKENDS
			)));
		}

		if config.cache.key_prefix.is_empty() {
			return Err(ConfigError::ValidationError(
				"cache.key_prefix must not be empty".to_string(),
			));
		}

		if config.service.request_timeout_secs == 0 {
			return Err(ConfigError::ValidationError(
				"service.request_timeout_secs must be positive".to_string(),
			));
		}

		Ok(())
	}
}
