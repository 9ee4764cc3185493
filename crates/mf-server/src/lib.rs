//! mf-server: HTTP surface for URL-driven media transformation.
//!
//! This crate ties the parser, dispatcher and executors together behind an
//! axum router. It provides:
//!
//! - A catch-all `GET` handler that parses the request path, reads the asset
//!   and returns either an image buffer or a streamed video body
//! - Filesystem-backed asset storage
//! - Request-id middleware and JSON error responses
//! - Graceful shutdown via signal handling

pub mod context;
pub mod error;
pub mod middleware;
pub mod router;
pub mod routes;
pub mod storage;

use std::net::SocketAddr;

use mf_core::config::Config;

use crate::context::AppContext;

pub use router::build_router;

/// Start the mediaforge HTTP server.
///
/// Discovers tools, builds the [`AppContext`] and serves until a shutdown
/// signal is received.
pub async fn start(config: Config) -> mf_core::Result<()> {
    for warning in config.validate() {
        tracing::warn!("Config warning: {warning}");
    }

    let ctx = AppContext::from_config(config.clone());
    for info in ctx.tools.check_all() {
        if info.available {
            tracing::info!(
                "Tool found: {} ({})",
                info.name,
                info.version.as_deref().unwrap_or("unknown version")
            );
        } else {
            tracing::warn!("Tool not found: {}; video requests will fail", info.name);
        }
    }

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| mf_core::Error::Internal(format!("Invalid server address: {e}")))?;

    let app = build_router(ctx);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| mf_core::Error::Internal(format!("Failed to bind to {addr}: {e}")))?;
    tracing::info!(
        "Serving assets from {} on {addr}",
        config.storage.root.display()
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Wait for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    tracing::info!("Shutdown signal received");
}
