//! HTTP API of the metric server
//!
//! ## Architecture
//!
//! - **Axum** web framework with Tower middleware
//! - **Repository** shared through [`ApiState`] for every handler
//! - **tower-http** for request tracing and gzip in both directions
//!
//! ## Endpoints
//!
//! - `POST /update/:type/:name/:value` - Store a metric given in the path
//! - `POST /update/` - Store a JSON metric (signed)
//! - `POST /updates/` - Store a JSON array of metrics (signed)
//! - `GET /value/:type/:name` - Current value as plain text
//! - `POST /value/` - Current value as JSON
//! - `GET /` - HTML listing of all metrics
//! - `GET /ping` - Storage health check

#[cfg(feature = "api")]
pub mod error;
#[cfg(feature = "api")]
pub mod middleware;
#[cfg(feature = "api")]
pub mod routes;
#[cfg(feature = "api")]
pub mod state;
#[cfg(feature = "api")]
pub mod types;

#[cfg(feature = "api")]
pub use error::{ApiError, ApiResult};
#[cfg(feature = "api")]
pub use state::ApiState;
#[cfg(feature = "api")]
pub use types::{HealthResponse, MetricQuery, StoredResponse};

#[cfg(feature = "api")]
use axum::{
    Router,
    routing::{get, post},
};
#[cfg(feature = "api")]
use std::future::Future;
#[cfg(feature = "api")]
use std::net::SocketAddr;
#[cfg(feature = "api")]
use tokio::task::JoinHandle;
#[cfg(feature = "api")]
use tracing::info;

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Bind address (e.g., "localhost:8080")
    pub bind_addr: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_addr: "localhost:8080".to_string(),
        }
    }
}

/// Build the router with all routes and layers
#[cfg(feature = "api")]
pub fn router(state: ApiState) -> Router {
    use tower_http::compression::CompressionLayer;
    use tower_http::decompression::RequestDecompressionLayer;
    use tower_http::trace::TraceLayer;

    Router::new()
        .route("/update/", post(routes::update::update_json))
        .route("/updates/", post(routes::update::update_batch))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::signature::verify_signature,
        ))
        .route(
            "/update/:type/:name/:value",
            post(routes::update::update_from_path),
        )
        .route("/value/", post(routes::value::value_json))
        .route("/value/:type/:name", get(routes::value::value_from_path))
        .route("/", get(routes::index::list_metrics))
        .route("/ping", get(routes::ping::ping))
        .with_state(state)
        .layer(RequestDecompressionLayer::new())
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
}

/// Spawn the API server
///
/// This starts an Axum HTTP server in a background task that stops
/// accepting requests once `shutdown` resolves. Returns the server's local
/// address and the task handle, which completes after in-flight requests
/// have finished.
#[cfg(feature = "api")]
pub async fn spawn_api_server<F>(
    config: ApiConfig,
    state: ApiState,
    shutdown: F,
) -> anyhow::Result<(SocketAddr, JoinHandle<()>)>
where
    F: Future<Output = ()> + Send + 'static,
{
    info!("starting API server on {}", config.bind_addr);

    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    let addr = listener.local_addr()?;

    info!("API server listening on {}", addr);

    let handle = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
        {
            tracing::error!("API server error: {}", e);
        }
    });

    Ok((addr, handle))
}
