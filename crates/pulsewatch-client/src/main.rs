//! pulsewatch-client: heartbeat reporter binary.

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use pulsewatch_client::cli::Cli;
use pulsewatch_client::{Lifecycle, Reporter, ShutdownRequest, trigger};
use pulsewatch_core::logging::filter_directive;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(filter_directive()))
        .init();

    let config = args.lifecycle_config()?;
    let identity = args.resolve_identity()?;
    let reporter = Arc::new(Reporter::new(
        &args.server,
        identity.clone(),
        args.version_tag.clone(),
        args.backoff(),
    )?);

    tracing::info!(%identity, server = %args.server, "pulsewatch client starting");

    let listener = TcpListener::bind(args.trigger_listen)
        .await
        .with_context(|| format!("cannot bind trigger listener on {}", args.trigger_listen))?;

    let (triggers, requests) = mpsc::channel(4);
    let cancel = CancellationToken::new();
    let trigger_server = tokio::spawn(trigger::serve_triggers(
        listener,
        triggers.clone(),
        cancel.clone(),
    ));

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("received ctrl-c, shutting down");
            let _ = triggers.send(ShutdownRequest::detached()).await;
        }
    });

    Lifecycle::new(reporter, config).run(requests).await;

    cancel.cancel();
    match trigger_server.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::warn!(error = %e, "trigger listener error"),
        Err(e) => tracing::warn!(error = %e, "trigger listener task ended abnormally"),
    }

    tracing::info!("client stopped");
    Ok(())
}
