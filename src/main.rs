//! Mini Groupcache - A read-through, peer-distributed in-memory cache
//!
//! Runs one cluster node: the peer protocol server and, optionally, the
//! front-end API server, both over a single `scores` group backed by a
//! small in-memory "slow database".

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::signal;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mini_groupcache::api::{create_api_router, create_peer_router};
use mini_groupcache::{AppState, CacheError, Config, GroupRegistry, HttpPool, LoaderFn};

/// Main entry point for a cache node.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Register the group with its slow-DB loader
/// 4. Wire the HTTP peer pool into the group
/// 5. Start the API server if `API_PORT` is set
/// 6. Serve the peer protocol on `SERVER_PORT`
/// 7. Handle graceful shutdown on SIGINT/SIGTERM
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mini_groupcache=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Mini Groupcache node");

    let config = Config::from_env();
    info!(
        "Configuration loaded: self={}, peers={:?}, port={}, api_port={:?}, cache_bytes={}",
        config.self_addr, config.peers, config.server_port, config.api_port, config.cache_bytes
    );

    let db: HashMap<&'static str, &'static str> =
        HashMap::from([("Tom", "630"), ("Jack", "589"), ("Sam", "567")]);

    let registry = Arc::new(GroupRegistry::new());
    let group = registry.new_group(
        config.group_name.clone(),
        config.cache_bytes,
        LoaderFn(move |key: &str| {
            info!("[SlowDB] search key {}", key);
            db.get(key)
                .map(|v| v.as_bytes().to_vec())
                .ok_or_else(|| CacheError::NotFound(key.to_string()))
        }),
    );

    let pool = HttpPool::with_options(config.self_addr.clone(), config.pool_options());
    pool.set_peers(config.peers.as_slice());
    group.register_peers(Arc::new(pool));

    let state = AppState::new(registry, config.group_name.clone());
    let shutdown = state.shutdown.clone();

    let api_handle = match config.api_port {
        Some(port) => {
            let addr = SocketAddr::from(([0, 0, 0, 0], port));
            let listener = tokio::net::TcpListener::bind(addr)
                .await
                .with_context(|| format!("binding API server to {addr}"))?;
            info!("API server listening on http://{}", addr);

            let app = create_api_router(state.clone());
            let token = shutdown.clone();
            Some(tokio::spawn(async move {
                if let Err(e) = axum::serve(listener, app)
                    .with_graceful_shutdown(async move { token.cancelled().await })
                    .await
                {
                    warn!("API server error: {}", e);
                }
            }))
        }
        None => None,
    };

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding peer server to {addr}"))?;
    info!("Cache node listening on http://{}{}", addr, config.base_path);

    let app = create_peer_router(state, &config.base_path);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await
        .context("peer server failed")?;

    if let Some(handle) = api_handle {
        join_api_server(handle).await;
    }

    info!("Node shutdown complete");
    Ok(())
}

/// Waits for the API server task, logging a panic or abort.
///
/// Returns false when the task did not finish normally.
async fn join_api_server(handle: JoinHandle<()>) -> bool {
    match handle.await {
        Ok(()) => true,
        Err(e) => {
            warn!("API server task failed: {}", e);
            false
        }
    }
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
///
/// Cancels `shutdown` so pending loads and the API server stop as well.
async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }

    shutdown.cancel();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_join_api_server_reports_clean_exit() {
        let handle = tokio::spawn(async {});
        assert!(join_api_server(handle).await);
    }

    #[tokio::test]
    async fn test_join_api_server_reports_panicked_task() {
        let handle = tokio::spawn(async { panic!("router blew up") });
        assert!(!join_api_server(handle).await);
    }
}
