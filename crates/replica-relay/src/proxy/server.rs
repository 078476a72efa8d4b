//! HTTP surface of the binary forwarder
//!
//! Mounts the forwarder on one configurable route:
//! - `OPTIONS` answers CORS preflight
//! - `GET`/`POST` with `?url=` relay to the trusted replica
//! - `/health` for liveness checks

use axum::{
    Json, Router,
    body::Body,
    extract::{RawQuery, State},
    http::{HeaderMap, Method, header},
    response::Response,
    routing::{get, options},
};
use bytes::Bytes;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::error::{RelayError, Result};

use super::forwarder::Forwarder;

const HEALTH_PATH: &str = "/health";

/// Shared application state for all handlers
#[derive(Debug, Clone)]
pub struct AppState {
    /// The relay itself
    pub forwarder: Forwarder,
    /// Route the forwarder is mounted on
    pub proxy_path: String,
}

impl AppState {
    pub fn from_config(config: &Config) -> Result<Self> {
        if !config.relay.proxy_path.starts_with('/') {
            return Err(RelayError::Config(format!(
                "proxy_path must start with '/': {}",
                config.relay.proxy_path
            )));
        }
        if config.relay.proxy_path == HEALTH_PATH {
            return Err(RelayError::Config(format!(
                "proxy_path cannot be {HEALTH_PATH}, it is reserved for health checks"
            )));
        }

        Ok(Self {
            forwarder: Forwarder::from_config(config)?,
            proxy_path: config.relay.proxy_path.clone(),
        })
    }
}

/// The relay server
pub struct RelayServer {
    config: Config,
}

impl RelayServer {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Start the relay and listen for requests until shutdown
    pub async fn serve(&self) -> Result<()> {
        let state = Arc::new(AppState::from_config(&self.config)?);

        let addr: SocketAddr = self
            .config
            .relay
            .listen_addr
            .parse()
            .map_err(|e| RelayError::Config(format!("Invalid listen address: {e}")))?;

        tracing::info!("Starting relay on {addr}");
        tracing::info!("Forwarding {} -> {}", state.proxy_path, state.forwarder.upstream());
        if self.config.mode.is_production() {
            tracing::info!(
                "Production mode: {} allowed origins",
                self.config.relay.allowed_origins.len()
            );
        } else {
            tracing::info!("Development mode: CORS open to every origin");
        }

        let app = create_router(state);

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| RelayError::Proxy(format!("Failed to bind to {addr}: {e}")))?;

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| RelayError::Proxy(format!("Server error: {e}")))?;

        tracing::info!("Relay shut down gracefully");
        Ok(())
    }
}

/// Create the router with all routes configured
pub fn create_router(state: Arc<AppState>) -> Router {
    let proxy_path = state.proxy_path.clone();

    Router::new()
        .route(HEALTH_PATH, get(health_handler))
        .route(
            &proxy_path,
            options(preflight_handler)
                .get(forward_handler)
                .post(forward_handler),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint - returns JSON status
async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

async fn preflight_handler(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response<Body> {
    state.forwarder.preflight(origin_of(&headers))
}

async fn forward_handler(
    State(state): State<Arc<AppState>>,
    RawQuery(query): RawQuery,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Response<Body> {
    let target = query.as_deref().and_then(url_param);

    state
        .forwarder
        .forward(method, target.as_deref(), &headers, body, origin_of(&headers))
        .await
}

fn origin_of(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::ORIGIN)
        .and_then(|value| value.to_str().ok())
}

/// Pull the decoded `url` parameter out of a raw query string
fn url_param(query: &str) -> Option<String> {
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == "url")
        .map(|(_, value)| value.into_owned())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        },
    }
}
