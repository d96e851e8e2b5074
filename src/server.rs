//! HTTP endpoint exposing the claims of the `cf-access-jwt-assertion` header

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::routing::get;
use axum::Json;
use axum::Router;
use serde_json::json;
use serde_json::Value;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::verifier::Validator;
use crate::verifier::VerifyJwt;

/// Header Cloudflare Access forwards the application token in
pub const ASSERTION_HEADER: &str = "cf-access-jwt-assertion";

const DEFAULT_PORT: u16 = 3000;

/// Runtime settings for the HTTP endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerConfig {
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: DEFAULT_PORT }
    }
}

impl ServerConfig {
    /// Load from `PORT`, falling back to 3000 when unset or unparsable
    pub fn from_env() -> Self {
        Self::from_port(std::env::var("PORT").ok().as_deref())
    }

    fn from_port(port: Option<&str>) -> Self {
        let port = port
            .and_then(|port| port.parse().ok())
            .unwrap_or(DEFAULT_PORT);
        Self { port }
    }

    pub fn addr(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.port))
    }
}

/// Build the router serving `GET /`
pub fn router(validator: Arc<Validator>) -> Router {
    Router::new()
        .route("/", get(handler))
        .layer(TraceLayer::new_for_http())
        .with_state(validator)
}

/// Serve the router until Ctrl+C or SIGTERM
pub async fn serve(validator: Validator, config: ServerConfig) -> std::io::Result<()> {
    let addr = config.addr();
    let listener = TcpListener::bind(addr).await?;

    info!("Now listening on port {}...", config.port);

    axum::serve(listener, router(Arc::new(validator)))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

async fn handler(State(validator): State<Arc<Validator>>, headers: HeaderMap) -> Json<Value> {
    let Some(jwt) = headers
        .get(ASSERTION_HEADER)
        .and_then(|value| value.to_str().ok())
    else {
        return Json(json!({ "error": "JWT not found" }));
    };

    match validator.verify_or_none(jwt).await {
        Some(result) => Json(json!({ "result": result, "jwt": jwt })),
        None => Json(json!({ "error": "JWT is invalid", "jwt": jwt })),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = signal::ctrl_c().await {
            tracing::error!(%error, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(error) => {
                tracing::error!(%error, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal, starting graceful shutdown");
        },
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        },
    }
}
