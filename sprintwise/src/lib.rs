//! # sprintwise: backend for the Sprintwise calendar poster app
//!
//! A small HTTP service with two jobs: storing images the web client uploads in an S3 bucket, and
//! proxying poster generation jobs to the kie.ai image API so the provider key never reaches the
//! browser.
//!
//! ## Architecture
//!
//! Requests go through a single [axum](https://docs.rs/axum) router built by [`build_router`].
//! Handlers in [`api::handlers`] validate the request and delegate to one of two adapters held in
//! [`AppState`]:
//!
//! - [`storage::ObjectStore`]: writes a local file to object storage and returns its public URL
//!   ([`storage::S3ObjectStore`] in production)
//! - [`kie::GenerationProvider`]: creates generation tasks and fetches their status
//!   ([`kie::KieClient`] in production)
//!
//! The service keeps no state between requests. Generation is asynchronous on the provider side;
//! clients poll `/api/kie/status` with the task id returned by `/api/kie/create-task`.
//!
//! Configuration is described in [`config`], error responses in [`errors`].
//!
//! ## Usage
//!
//! ```no_run
//! use sprintwise::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     sprintwise::install_crypto_provider();
//!     let config = Config::default();
//!     let app = Application::new(config).await?;
//!     app.serve(async {
//!         tokio::signal::ctrl_c().await.ok();
//!     })
//!     .await
//! }
//! ```

pub mod api;
pub mod config;
pub mod errors;
pub mod kie;
mod openapi;
pub mod storage;
pub mod telemetry;

#[cfg(test)]
pub mod test_utils;

use crate::config::CorsOrigin;
use crate::kie::{GenerationProvider, KieClient};
use crate::openapi::ApiDoc;
use crate::storage::{ObjectStore, S3ObjectStore};
use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::{
    Router,
    routing::{get, post},
};
use bon::Builder;
pub use config::Config;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, debug, info, instrument, warn};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

/// Install the process-wide rustls crypto provider.
///
/// Must run before any TLS client (provider HTTP client, AWS SDK) is built. Calling it again is a
/// no-op.
pub fn install_crypto_provider() {
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();
}

/// Application state shared across all request handlers.
///
/// The adapters are trait objects so tests can swap in an in-memory store or point the
/// generation client at a mock server.
///
/// ```ignore
/// let state = AppState::builder()
///     .config(Arc::new(config))
///     .storage(Arc::new(store))
///     .generator(Arc::new(client))
///     .build();
/// ```
#[derive(Clone, Builder)]
pub struct AppState {
    pub config: Arc<Config>,
    pub storage: Arc<dyn ObjectStore>,
    pub generator: Arc<dyn GenerationProvider>,
}

/// Create CORS layer from configuration
fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let cors_config = &config.cors;

    let mut cors = if cors_config.allowed_origins.iter().any(|origin| matches!(origin, CorsOrigin::Wildcard)) {
        CorsLayer::new().allow_origin(Any)
    } else {
        let mut origins = Vec::new();
        for origin in &cors_config.allowed_origins {
            if let CorsOrigin::Url(url) = origin {
                origins.push(url.origin().ascii_serialization().parse::<HeaderValue>()?);
            }
        }
        CorsLayer::new().allow_origin(origins)
    };

    cors = cors.allow_methods(Any).allow_headers(Any);

    if let Some(max_age) = cors_config.max_age {
        cors = cors.max_age(std::time::Duration::from_secs(max_age));
    }

    Ok(cors)
}

/// Build the application router with all endpoints and middleware.
///
/// Routes:
/// - `GET /health`
/// - `POST /upload` (body limited to `storage.max_upload_size`)
/// - `POST /api/kie/create-task`
/// - `GET /api/kie/status`
/// - `GET /api-docs/openapi.json` and the Scalar viewer at `/docs`
///
/// CORS and request tracing apply to every route.
#[instrument(skip_all)]
pub fn build_router(state: &AppState) -> anyhow::Result<Router> {
    let upload_limit = DefaultBodyLimit::max(state.config.storage.max_upload_size);

    let router = Router::new()
        .route("/health", get(api::handlers::health::health))
        .route("/upload", post(api::handlers::uploads::upload_file).layer(upload_limit))
        .route("/api/kie/create-task", post(api::handlers::generation::create_task))
        .route("/api/kie/status", get(api::handlers::generation::task_status))
        .with_state(state.clone())
        .route("/api-docs/openapi.json", get(|| async { axum::Json(ApiDoc::openapi()) }))
        .merge(Scalar::with_url("/docs", ApiDoc::openapi()));

    let cors_layer = create_cors_layer(&state.config)?;
    let router = router.layer(cors_layer);

    // Add tracing layer
    let router = router.layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    );

    Ok(router)
}

/// Main application struct that owns the router and configuration.
///
/// # Lifecycle
///
/// 1. **Create**: [`Application::new`] builds the storage and generation adapters from the
///    configuration and assembles the router
/// 2. **Serve**: [`Application::serve`] binds to a TCP port and starts handling requests
/// 3. **Shutdown**: When the shutdown future resolves, in-flight requests finish and telemetry is
///    flushed
pub struct Application {
    router: Router,
    config: Arc<Config>,
}

impl Application {
    /// Create a new application instance with production adapters
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        debug!("Starting with configuration: {:#?}", config);

        if config.kie.api_key.is_none() {
            warn!("KIE_API_KEY is not set; generation endpoints will return errors");
        }
        if config.storage.bucket.is_none() {
            warn!("S3_BUCKET is not set; uploads will return errors");
        }

        let generator = KieClient::new(config.kie.clone())?;
        let storage = S3ObjectStore::new(config.storage.clone()).await;

        let state = AppState::builder()
            .config(Arc::new(config))
            .storage(Arc::new(storage))
            .generator(Arc::new(generator))
            .build();

        Self::with_state(state)
    }

    /// Create an application around already constructed state
    pub fn with_state(state: AppState) -> anyhow::Result<Self> {
        let router = build_router(&state)?;
        Ok(Self {
            router,
            config: state.config,
        })
    }

    /// Hand the router to a different server loop (e.g. the Lambda runtime)
    pub fn into_router(self) -> Router {
        self.router
    }

    /// Convert application into a test server (for tests)
    #[cfg(test)]
    pub fn into_test_server(self) -> axum_test::TestServer {
        axum_test::TestServer::new(self.router.into_make_service()).expect("Failed to create test server")
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!("Sprintwise API listening on http://{}", bind_addr);

        // Run the server with graceful shutdown
        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Shutting down telemetry...");
        telemetry::shutdown_telemetry();

        Ok(())
    }
}
