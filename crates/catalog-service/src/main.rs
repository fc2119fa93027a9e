use anyhow::{Context, Result};
use catalog_config::{CatalogConfig, ConfigLoader};
use catalog_core::{FetcherBuilder, GracefulShutdown, JobRegistry};
use catalog_service::api::{ApiServer, FetchResult};
use catalog_service::cli::{Args, Command};
use catalog_service::telemetry;
use catalog_types::CandidateItem;
use clap::Parser;
use futures::StreamExt;
use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
	let args = Args::parse();

	let mut config = ConfigLoader::new()
		.with_optional_file(args.config.as_ref())
		.load()
		.await
		.context("Failed to load configuration")?;
	if let Some(level) = &args.log_level {
		config.service.log_level = level.clone();
	}

	telemetry::init_tracing(&config.service.log_level, config.service.log_format)?;

	match args.command {
		Some(Command::Start) | None => start_service(config).await,
		Some(Command::Validate) => validate_config(&config),
		Some(Command::Fetch { ids, count }) => fetch_once(config, ids, count).await,
	}
}

async fn start_service(config: CatalogConfig) -> Result<()> {
	info!("Starting {}", config.service.name);

	let fetcher = FetcherBuilder::new(config.clone())
		.build()
		.context("Failed to build product fetcher")?;
	let fetcher = Arc::new(fetcher);

	let server = Arc::new(ApiServer::new(
		fetcher.clone(),
		config.service.request_timeout(),
	));
	server
		.bind(config.service.http_port)
		.await
		.context("Failed to start API server")?;

	let mut jobs = JobRegistry::new();
	jobs.register(server);
	jobs.register(fetcher);

	info!("{} started", config.service.name);
	shutdown_signal().await;
	info!("Shutdown signal received, stopping jobs");

	if let Err(e) = jobs.shutdown_all(config.service.shutdown_timeout()).await {
		error!("{}", e);
	}

	info!("{} stopped", config.service.name);
	Ok(())
}

fn validate_config(config: &CatalogConfig) -> Result<()> {
	info!("Configuration is valid");
	info!("Service: {} on port {}", config.service.name, config.service.http_port);
	info!(
		"Fetcher: concurrency {}, {} retries, {}ms backoff",
		config.fetcher.concurrency, config.fetcher.max_retries, config.fetcher.retry_backoff_ms
	);
	info!("Provider: {}", config.provider.api_base_url);
	info!(
		"Cache: {} (prefix '{}', ttl {:?})",
		config.cache.backend,
		config.cache.key_prefix,
		config.cache.ttl()
	);
	Ok(())
}

async fn fetch_once(config: CatalogConfig, ids: Vec<String>, count: usize) -> Result<()> {
	let fetcher = FetcherBuilder::new(config.clone())
		.build()
		.context("Failed to build product fetcher")?;

	let cancel = CancellationToken::new();
	let interrupt = {
		let cancel = cancel.clone();
		tokio::spawn(async move {
			shutdown_signal().await;
			cancel.cancel();
		})
	};

	let candidates = ids
		.into_iter()
		.map(|id| CandidateItem::new(id, 0.0))
		.collect();
	let mut outcomes = fetcher.fetch_top_results(&cancel, candidates, count);
	while let Some(outcome) = outcomes.next().await {
		let line = serde_json::to_string(&FetchResult::from(outcome))
			.context("Failed to encode outcome")?;
		println!("{}", line);
	}
	drop(outcomes);
	interrupt.abort();

	fetcher
		.shutdown(config.service.shutdown_timeout())
		.await
		.context("Failed to stop product fetcher")?;
	Ok(())
}

async fn shutdown_signal() {
	let ctrl_c = async {
		if let Err(e) = signal::ctrl_c().await {
			error!("Failed to listen for Ctrl+C: {}", e);
			std::future::pending::<()>().await;
		}
	};

	#[cfg(unix)]
	let terminate = async {
		match signal::unix::signal(signal::unix::SignalKind::terminate()) {
			Ok(mut stream) => {
				stream.recv().await;
			}
			Err(e) => {
				error!("Failed to install SIGTERM handler: {}", e);
				std::future::pending::<()>().await;
			}
		}
	};

	#[cfg(not(unix))]
	let terminate = std::future::pending::<()>();

	tokio::select! {
		_ = ctrl_c => {},
		_ = terminate => {},
	}
}
