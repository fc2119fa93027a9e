//! HTTP API over the fetch pipeline.

use async_trait::async_trait;
use axum::{
	extract::State,
	http::StatusCode,
	response::Json,
	routing::{get, post},
	Router,
};
use catalog_core::{GracefulShutdown, Outcome, ProductFetcher, ShutdownError};
use catalog_types::{CandidateItem, EnrichedItem};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, instrument, warn};

#[derive(Debug, Deserialize)]
pub struct FetchRequest {
	/// Candidates in rank order
	pub candidates: Vec<CandidateItem>,
	/// Number of products to resolve
	pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct FetchResponse {
	pub results: Vec<FetchResult>,
	/// Set when the request deadline cut the run short
	pub truncated: bool,
}

/// One outcome, serialized as `{"product": ..}` or `{"error": ..}`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchResult {
	Product(EnrichedItem),
	Error(ErrorBody),
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
	pub kind: &'static str,
	pub message: String,
}

impl From<Outcome> for FetchResult {
	fn from(outcome: Outcome) -> Self {
		match outcome {
			Ok(product) => Self::Product(product),
			Err(e) => Self::Error(ErrorBody {
				kind: e.kind().as_str(),
				message: e.to_string(),
			}),
		}
	}
}

#[derive(Clone)]
struct AppState {
	fetcher: Arc<ProductFetcher>,
	request_timeout: Duration,
}

/// HTTP server job.
pub struct ApiServer {
	state: AppState,
	shutdown: CancellationToken,
	tracker: TaskTracker,
}

impl ApiServer {
	pub fn new(fetcher: Arc<ProductFetcher>, request_timeout: Duration) -> Self {
		Self {
			state: AppState {
				fetcher,
				request_timeout,
			},
			shutdown: CancellationToken::new(),
			tracker: TaskTracker::new(),
		}
	}

	pub fn router(&self) -> Router {
		Router::new()
			.route("/health", get(health_check))
			.route("/v1/products/fetch", post(fetch_products))
			.with_state(self.state.clone())
			.layer(TraceLayer::new_for_http())
			.layer(CorsLayer::permissive())
	}

	/// Binds `0.0.0.0:{port}` and serves in the background.
	pub async fn bind(&self, port: u16) -> anyhow::Result<SocketAddr> {
		let listener = TcpListener::bind(format!("0.0.0.0:{}", port)).await?;
		Ok(self.serve(listener)?)
	}

	/// Serves on `listener` until [`GracefulShutdown::shutdown`] is called.
	pub fn serve(&self, listener: TcpListener) -> std::io::Result<SocketAddr> {
		let addr = listener.local_addr()?;
		let app = self.router();
		let shutdown = self.shutdown.clone();

		self.tracker.spawn(async move {
			let server = axum::serve(listener, app).with_graceful_shutdown(shutdown.cancelled_owned());
			if let Err(e) = server.await {
				error!(error = %e, "API server failed");
			}
		});

		info!("API server listening on {}", addr);
		Ok(addr)
	}
}

#[async_trait]
impl GracefulShutdown for ApiServer {
	fn name(&self) -> String {
		"api-server".to_string()
	}

	async fn shutdown(&self, timeout: Duration) -> Result<(), ShutdownError> {
		self.shutdown.cancel();
		self.tracker.close();

		tokio::time::timeout(timeout, self.tracker.wait())
			.await
			.map_err(|_| ShutdownError::Timeout {
				job: self.name(),
				timeout,
			})
	}
}

async fn health_check() -> StatusCode {
	StatusCode::OK
}

/// Runs the pipeline under the request deadline.
///
/// Dropping the handler (client went away) drops the stream, which stops
/// the run.
#[instrument(skip_all, fields(candidates = request.candidates.len(), count = request.count))]
async fn fetch_products(
	State(state): State<AppState>,
	Json(request): Json<FetchRequest>,
) -> Result<Json<FetchResponse>, (StatusCode, Json<ErrorBody>)> {
	if state.fetcher.is_shutting_down() {
		return Err((
			StatusCode::SERVICE_UNAVAILABLE,
			Json(ErrorBody {
				kind: "unavailable",
				message: "service is shutting down".to_string(),
			}),
		));
	}

	let cancel = CancellationToken::new();
	let mut outcomes = state
		.fetcher
		.fetch_top_results(&cancel, request.candidates, request.count);

	let deadline = tokio::time::sleep(state.request_timeout);
	tokio::pin!(deadline);

	let mut results = Vec::new();
	let mut truncated = false;
	loop {
		tokio::select! {
			biased;
			_ = &mut deadline => {
				warn!(collected = results.len(), "Request deadline reached");
				cancel.cancel();
				truncated = true;
				break;
			}
			next = outcomes.next() => match next {
				Some(outcome) => results.push(FetchResult::from(outcome)),
				None => break,
			},
		}
	}

	Ok(Json(FetchResponse { results, truncated }))
}
