use crate::catalog::{CatalogClient, CredentialLease};
use crate::config::{self, Config};
use crate::relay::{ByteSource, HttpByteSource};
use crate::resolver::{Resolver, UpstreamResolver};
use crate::search::SearchClient;
use anyhow::{Context, Result};
use axum::{
    http::{header, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub mod error;
pub mod routes_playlist;
pub mod routes_search;
pub mod routes_stream;

/// Shared application context
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<Config>,
    /// Credential lease for the catalog service.
    pub lease: Arc<CredentialLease>,
    pub catalog: Arc<CatalogClient>,
    pub search: Arc<SearchClient>,
    /// Media id resolution, behind a trait for test doubles.
    pub resolver: Arc<dyn Resolver>,
    /// Upstream byte source, behind a trait for test doubles.
    pub source: Arc<dyn ByteSource>,
}

/// Create the Axum router with all routes
pub fn create_router(ctx: AppContext) -> Router {
    // The browser audio element issues cross-origin ranged GETs.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, header::RANGE]);

    Router::new()
        .route("/health", get(health_check))
        .route("/api/playlist", post(routes_playlist::fetch_playlist))
        .route("/api/search", post(routes_search::search_video))
        .route("/stream/:media_id", get(routes_stream::stream_audio))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}

async fn health_check() -> impl IntoResponse {
    StatusCode::OK
}

/// Build the production context and start the HTTP server.
pub async fn start_server(config: Config) -> Result<()> {
    config::require_upstreams(&config)?;

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;

    let lease = Arc::new(CredentialLease::new(&config.catalog));
    let _renewal = lease.spawn_renewal();

    let catalog = Arc::new(CatalogClient::new(&config.catalog, Arc::clone(&lease)));
    let search = Arc::new(SearchClient::new(&config.search.base_url));
    let resolver: Arc<dyn Resolver> = Arc::new(UpstreamResolver::new(&config.resolver.base_url));
    let source: Arc<dyn ByteSource> = Arc::new(HttpByteSource::new());

    let ctx = AppContext {
        config: Arc::new(config),
        lease,
        catalog,
        search,
        resolver,
        source,
    };

    let app = create_router(ctx);

    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => {}
            Err(e) => {
                tracing::error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
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

    tracing::info!("Shutdown signal received");
}
