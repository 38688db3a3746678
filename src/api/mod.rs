mod handlers;
mod routes;
mod state;


pub use handlers::{ConnectionCheckResponse, ErrorResponse, HealthResponse};
pub use routes::{ApiDoc, create_router};
pub use state::AppState;

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::http::StatusCode;
use miette::Diagnostic;
use thiserror::Error;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::ServerConfig;
use crate::db::BindingRegistry;
use crate::service::sample::SampleFacade;

/// API server configuration
pub struct Config {
    /// Host address to bind to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Requests running longer are aborted and their open scopes rolled back
    pub request_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self::from(&ServerConfig::default())
    }
}

impl From<&ServerConfig> for Config {
    fn from(server: &ServerConfig) -> Self {
        Self {
            host: server.host,
            port: server.port,
            request_timeout: server.request_timeout(),
        }
    }
}

#[derive(Error, Diagnostic, Debug)]
pub enum ApiError {
    #[error("Failed to bind {addr}: {source}")]
    #[diagnostic(code(puml::api::bind))]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Server error: {0}")]
    #[diagnostic(code(puml::api::serve))]
    Serve(#[from] std::io::Error),
}

/// Initialize tracing subscriber with env filter
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "puml=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Router with request tracing and the per-request timeout applied.
///
/// A request that exceeds the timeout gets `408 Request Timeout`; its
/// handler future is dropped, which rolls back any scope it held.
pub fn create_app<F: SampleFacade>(config: &Config, state: AppState<F>) -> Router {
    create_router(state)
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            config.request_timeout,
        ))
        .layer(TraceLayer::new_for_http())
}

/// Run the API server until Ctrl-C, then close every pool.
pub async fn run<F: SampleFacade>(
    config: Config,
    state: AppState<F>,
    registry: Arc<BindingRegistry>,
) -> Result<(), ApiError> {
    let app = create_app(&config, state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|source| ApiError::Bind {
            addr: addr.clone(),
            source,
        })?;
    info!("API server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("shutting down, closing pools");
    registry.close_all().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "cannot listen for Ctrl-C, serving until killed");
        std::future::pending::<()>().await;
    }
}
