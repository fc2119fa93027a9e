//! Tracing subscriber setup.

use catalog_config::LogFormat;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Installs the global subscriber.
///
/// `RUST_LOG` takes precedence over `level` when set.
pub fn init_tracing(level: &str, format: LogFormat) -> anyhow::Result<()> {
	let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
	let subscriber = tracing_subscriber::registry().with(env_filter);

	match format {
		LogFormat::Json => subscriber
			.with(tracing_subscriber::fmt::layer().json().with_target(true))
			.try_init()
			.map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {}", e))?,
		LogFormat::Pretty => subscriber
			.with(tracing_subscriber::fmt::layer().pretty().with_target(true))
			.try_init()
			.map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {}", e))?,
	}

	Ok(())
}
