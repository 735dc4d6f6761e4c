//! HTTP surface: versioned controllers behind a fixed middleware pipeline.

mod error;
mod extract;
mod handlers;
mod pipeline;
mod routes;
mod scope;
mod state;
mod v0_9;
mod version;

#[cfg(test)]
mod version_test;

use std::net::{IpAddr, Ipv4Addr};

use tower_http::trace::TraceLayer;

pub use error::{ApiError, ErrorResponse};
pub use pipeline::{AccessPolicy, AllowAll, SUPPORTED_VERSIONS_HEADER};
pub use routes::{ApiDoc, DOCS_PATH, create_router, version_map};
pub use scope::RequestScope;
pub use state::AppState;
pub use version::{ApiVersion, VersionError, VersionMap};

/// API server configuration
pub struct Config {
    /// Host address to bind to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 5000,
        }
    }
}

/// Run the API server until interrupted, then close the storage pool.
pub async fn run(config: Config, state: AppState) -> std::io::Result<()> {
    let log = state.log().clone();
    let storage = state.storage().clone();
    let app = create_router(state).layer(TraceLayer::new_for_http());

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    log.info(
        "server_started",
        &format!("API server listening on http://{}", addr),
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    log.info("server_stopped", "API server stopped");
    storage.close().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
