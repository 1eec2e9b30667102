//! Server wiring: listener, sweeper task, and graceful shutdown.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use pulsewatch_core::SweepPolicy;

use crate::http;
use crate::shared::SharedRegistry;
use crate::sweeper::LivenessSweeper;

/// Validated server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen: SocketAddr,
    pub sweep_tick: Duration,
    pub policy: SweepPolicy,
}

/// Bind the listener and serve until `cancel` fires.
///
/// Failing to bind is the only fatal error; everything after that is
/// handled per request.
pub async fn run_server(config: ServerConfig, cancel: CancellationToken) -> anyhow::Result<()> {
    let listener = TcpListener::bind(config.listen)
        .await
        .with_context(|| format!("cannot bind {}", config.listen))?;
    serve(listener, SharedRegistry::new(), &config, cancel).await
}

/// Serve on an already-bound listener with the given registry.
pub async fn serve(
    listener: TcpListener,
    registry: SharedRegistry,
    config: &ServerConfig,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let addr = listener.local_addr()?;
    tracing::info!(%addr, "registry server listening");

    let sweeper = LivenessSweeper::new(registry.clone(), config.sweep_tick, config.policy)
        .spawn(cancel.child_token());

    let shutdown = cancel.clone();
    let result = axum::serve(listener, http::router(registry))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await;

    cancel.cancel();
    if let Err(e) = sweeper.await {
        tracing::warn!(error = %e, "sweeper task ended abnormally");
    }
    result?;

    tracing::info!("registry server stopped");
    Ok(())
}

/// Wait for ctrl-c or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => tracing::info!("received ctrl-c, shutting down"),
                    _ = sigterm.recv() => tracing::info!("received SIGTERM, shutting down"),
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "cannot install SIGTERM handler, waiting for ctrl-c only");
                ctrl_c.await.ok();
                tracing::info!("received ctrl-c, shutting down");
            }
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        tracing::info!("received ctrl-c, shutting down");
    }
}
