//! Shutdown-trigger listener.
//!
//! Any request to `/` asks the client to shut down. The response is held
//! until the shutdown sequence has finished.

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::lifecycle::ShutdownRequest;

pub const SHUTDOWN_COMPLETE: &str = "Successfully Shutdown Client";

pub fn router(triggers: mpsc::Sender<ShutdownRequest>) -> Router {
    Router::new()
        .route("/", get(trigger).post(trigger))
        .with_state(triggers)
}

async fn trigger(State(triggers): State<mpsc::Sender<ShutdownRequest>>) -> Response {
    tracing::info!("shutdown trigger received");
    let (request, done) = ShutdownRequest::acknowledged();
    if triggers.send(request).await.is_err() {
        return (StatusCode::CONFLICT, "shutdown already completed").into_response();
    }
    match done.await {
        Ok(()) => SHUTDOWN_COMPLETE.into_response(),
        // Dropped unanswered: an earlier trigger is driving the shutdown.
        Err(_) => (StatusCode::CONFLICT, "shutdown already in progress").into_response(),
    }
}

/// Serve trigger requests until `cancel` fires. In-flight requests are
/// allowed to finish.
pub async fn serve_triggers(
    listener: TcpListener,
    triggers: mpsc::Sender<ShutdownRequest>,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    tracing::info!(addr = %listener.local_addr()?, "shutdown trigger listening");
    axum::serve(listener, router(triggers))
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await?;
    Ok(())
}
