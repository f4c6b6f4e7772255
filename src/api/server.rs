//! HTTP server lifecycle.
//!
//! bind → spawn background task → return handle with shutdown channel.
//! `serve` wraps that for the binary: it runs until Ctrl-C.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::api::router::api_router;
use crate::api::types::ApiContext;
use crate::config::AppConfig;
use crate::pipeline::resolution::LookupCache;

/// How often expired lookup cache entries are dropped.
const CACHE_PURGE_INTERVAL: Duration = Duration::from_secs(10 * 60);

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },

    #[error("Failed to read bound address: {0}")]
    LocalAddr(std::io::Error),
}

// ═══════════════════════════════════════════════════════════
// Server handle
// ═══════════════════════════════════════════════════════════

/// Handle to a running API server.
pub struct ApiServer {
    pub addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl ApiServer {
    /// Ask the server to stop accepting connections and drain.
    pub fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
            tracing::info!("API server shutdown signal sent");
        }
    }

    /// Wait for the server task to finish.
    pub async fn stopped(self) {
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "API server task failed");
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Server lifecycle
// ═══════════════════════════════════════════════════════════

/// Bind `addr` (port 0 picks an ephemeral port) and serve in the background.
pub async fn start_server(ctx: ApiContext, addr: SocketAddr) -> Result<ApiServer, ServerError> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })?;
    let addr = listener.local_addr().map_err(ServerError::LocalAddr)?;

    let app = api_router(ctx);
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let task = tokio::spawn(async move {
        let shutdown_signal = async move {
            let _ = shutdown_rx.await;
            tracing::info!("API server received shutdown signal");
        };

        tracing::info!(%addr, "API server started");

        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal)
            .await
        {
            tracing::error!(error = %e, "API server error");
        }

        tracing::info!("API server stopped");
    });

    Ok(ApiServer {
        addr,
        shutdown_tx: Some(shutdown_tx),
        task,
    })
}

/// Serve the configured pipeline until Ctrl-C.
pub async fn serve(config: AppConfig) -> Result<(), ServerError> {
    let ctx = ApiContext::from_config(&config);
    let purge = spawn_cache_purge(ctx.pipeline.resolver().cache().clone(), CACHE_PURGE_INTERVAL);

    let mut server = start_server(ctx, config.bind_addr).await?;

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Cannot listen for Ctrl-C, shutting down");
    }
    server.shutdown();
    server.stopped().await;
    purge.abort();
    Ok(())
}

/// Periodically drop expired cache entries so memory tracks live entries only.
fn spawn_cache_purge(cache: Arc<LookupCache>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            cache.purge_expired();
        }
    })
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    fn localhost() -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], 0))
    }

    #[tokio::test]
    async fn start_and_stop_server() {
        let ctx = ApiContext::from_config(&AppConfig::default());
        let mut server = start_server(ctx, localhost()).await.unwrap();
        assert!(server.addr.port() > 0);

        let url = format!("http://{}/api/health", server.addr);
        let json: serde_json::Value = reqwest::get(&url).await.unwrap().json().await.unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["generator_configured"], false);

        server.shutdown();
        server.stopped().await;
    }

    #[tokio::test]
    async fn bind_failure_is_reported() {
        let ctx = ApiContext::from_config(&AppConfig::default());
        let first = start_server(ctx.clone(), localhost()).await.unwrap();
        let err = start_server(ctx, first.addr).await.err().unwrap();
        assert!(matches!(err, ServerError::Bind { .. }));
    }
}
