//! HTTP server for the Prometheus metrics endpoint.

use super::{MetricsError, MetricsRegistry, MetricsSnapshot};
use crate::config::MetricsConfig;
use crate::generator::{GeneratorStatus, TrueRandomGenerator};
use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Router};
use std::future::Future;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use thiserror::Error;
use tower_http::cors::CorsLayer;

/// Errors that can occur during metrics server operations.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind to address: {0}")]
    Bind(#[from] std::io::Error),

    #[error("invalid bind address: {0}")]
    Address(#[from] std::net::AddrParseError),

    #[error("server error: {0}")]
    Server(String),
}

/// Configuration for the metrics server.
#[derive(Debug, Clone)]
pub struct MetricsServerConfig {
    /// Address to bind the server to.
    pub bind_addr: SocketAddr,
}

impl Default for MetricsServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: ([0, 0, 0, 0], 9090).into(),
        }
    }
}

impl MetricsServerConfig {
    /// Builds the bind address from the `[metrics]` file section.
    pub fn from_config(config: &MetricsConfig) -> Result<Self, ServerError> {
        let ip: IpAddr = config.bind.parse()?;
        Ok(Self {
            bind_addr: SocketAddr::new(ip, config.port),
        })
    }
}

/// Registry and the generator it reports on.
struct MetricsState {
    registry: MetricsRegistry,
    generator: Arc<TrueRandomGenerator>,
}

/// HTTP server exposing generator metrics.
///
/// Metrics are sampled from the generator on every scrape.
pub struct MetricsServer {
    config: MetricsServerConfig,
    state: Arc<MetricsState>,
}

impl MetricsServer {
    /// Creates a server reporting on `generator`.
    pub fn new(
        config: MetricsServerConfig,
        registry: MetricsRegistry,
        generator: Arc<TrueRandomGenerator>,
    ) -> Self {
        Self {
            config,
            state: Arc::new(MetricsState {
                registry,
                generator,
            }),
        }
    }

    fn router(&self) -> Router {
        Router::new()
            .route("/metrics", get(metrics_handler))
            .route("/health", get(health_handler))
            .layer(CorsLayer::permissive())
            .with_state(Arc::clone(&self.state))
    }

    /// Serves until `shutdown` resolves.
    pub async fn run<F>(self, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = self.router();
        let listener = tokio::net::TcpListener::bind(self.config.bind_addr).await?;

        tracing::info!(
            addr = %self.config.bind_addr,
            "Metrics server listening"
        );

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| ServerError::Server(e.to_string()))?;

        tracing::info!("Metrics server stopped");
        Ok(())
    }
}

/// Encodes fresh metrics; blocking work runs off the async workers.
fn render_metrics(state: &MetricsState) -> Result<String, MetricsError> {
    state
        .registry
        .update(&MetricsSnapshot::from_generator(&state.generator));
    state.registry.encode()
}

/// Handler for the /metrics endpoint.
async fn metrics_handler(State(state): State<Arc<MetricsState>>) -> impl IntoResponse {
    let rendered = tokio::task::spawn_blocking(move || render_metrics(&state))
        .await
        .map_err(|e| e.to_string())
        .and_then(|result| result.map_err(|e| e.to_string()));

    match rendered {
        Ok(output) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            output,
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            [("content-type", "text/plain; charset=utf-8")],
            format!("Failed to encode metrics: {}", e),
        ),
    }
}

/// Status code and body for the /health endpoint.
fn health_of(generator: &TrueRandomGenerator) -> (StatusCode, String) {
    let code = match generator.status() {
        GeneratorStatus::Stopped => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::OK,
    };
    (code, generator.describe())
}

/// Handler for the /health endpoint.
async fn health_handler(State(state): State<Arc<MetricsState>>) -> impl IntoResponse {
    tokio::task::spawn_blocking(move || health_of(&state.generator))
        .await
        .unwrap_or_else(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
}
