//! HTTP routes delivering client messages to the registry.
//!
//! - `POST /`        one client message per request
//! - `GET /clients`  snapshot of every tracked client
//! - `GET /health`   liveness probe for the server itself

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;

use pulsewatch_core::{ClientSnapshot, Dispatched, ProtocolError, decode_message};

use crate::shared::SharedRegistry;

pub fn router(registry: SharedRegistry) -> Router {
    Router::new()
        .route("/", post(post_event))
        .route("/clients", get(list_clients))
        .route("/health", get(health))
        .with_state(registry)
}

/// Acknowledgement returned for every decoded message.
#[derive(Debug, Serialize)]
pub struct Ack {
    pub accepted: bool,
    #[serde(flatten)]
    pub dispatched: Dispatched,
}

/// A request that could not be decoded. Reported to the sender only.
#[derive(Debug)]
pub struct BadRequest(ProtocolError);

impl IntoResponse for BadRequest {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "error": self.0.to_string() });
        (StatusCode::BAD_REQUEST, Json(body)).into_response()
    }
}

async fn post_event(
    State(registry): State<SharedRegistry>,
    body: Bytes,
) -> Result<Json<Ack>, BadRequest> {
    let message = decode_message(&body).map_err(|e| {
        tracing::warn!(error = %e, "rejecting undecodable client message");
        BadRequest(e)
    })?;

    let dispatched = registry.dispatch(&message).await;
    Ok(Json(Ack {
        accepted: dispatched.is_handled(),
        dispatched,
    }))
}

async fn list_clients(State(registry): State<SharedRegistry>) -> Json<Vec<ClientSnapshot>> {
    Json(registry.snapshot().await)
}

async fn health() -> impl IntoResponse {
    "OK"
}
