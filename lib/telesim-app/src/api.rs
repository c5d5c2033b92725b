//! Metrics exposition server.

use std::net::SocketAddr;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Router,
};
use telesim_error::{ErrorContext as _, GenericError};
use telesim_metrics::{MetricRegistry, PROMETHEUS_TEXT_CONTENT_TYPE};
use tokio::net::TcpListener;
use tracing::{debug, error, info};

/// An HTTP server exposing the contents of a [`MetricRegistry`] in the Prometheus text format.
///
/// Serves the following routes:
///
/// - `GET /metrics` and `GET /`: the rendered registry
/// - `GET /health`: always `200 OK`
///
/// ## Missing
///
/// - graceful shutdown (the server runs until the process exits)
pub struct ExpositionServer {
    router: Router,
}

impl ExpositionServer {
    /// Creates a new `ExpositionServer` for the given registry.
    pub fn new(registry: MetricRegistry) -> Self {
        let router = Router::new()
            .route("/", get(handle_metrics))
            .route("/metrics", get(handle_metrics))
            .route("/health", get(handle_health))
            .with_state(registry);

        Self { router }
    }

    /// Binds to the given address and serves requests in a background task.
    ///
    /// Returns the local address the server is bound to, which differs from `listen_address` when binding to port 0.
    ///
    /// ## Errors
    ///
    /// If the server fails to bind to the address, an error will be returned. Errors encountered after binding are
    /// logged, and do not stop the caller.
    pub async fn serve(self, listen_address: SocketAddr) -> Result<SocketAddr, GenericError> {
        let listener = TcpListener::bind(listen_address)
            .await
            .with_error_context(|| format!("Failed to bind metrics server to {}.", listen_address))?;
        let local_address = listener
            .local_addr()
            .error_context("Failed to query local address of metrics server.")?;

        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, self.router).await {
                error!(error = %e, "Failed to serve metrics.");
            }
        });

        info!("Metrics server listening on {}.", local_address);

        Ok(local_address)
    }

    #[cfg(test)]
    fn into_router(self) -> Router {
        self.router
    }
}

async fn handle_metrics(State(registry): State<MetricRegistry>) -> impl IntoResponse {
    debug!("Received scrape request.");

    (
        [(header::CONTENT_TYPE, PROMETHEUS_TEXT_CONTENT_TYPE)],
        registry.render(),
    )
}

async fn handle_health() -> StatusCode {
    StatusCode::OK
}
