//! In-process stand-in for the registry server, used by unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use axum::{Json, Router, extract::State, http::StatusCode, routing::post};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use pulsewatch_core::ClientMessage;

#[derive(Clone, Default)]
struct FakeState {
    received: Arc<Mutex<Vec<ClientMessage>>>,
    /// Statuses returned for the next requests before answering 200.
    script: Arc<Mutex<VecDeque<StatusCode>>>,
    attempts: Arc<AtomicU32>,
}

pub(crate) struct FakeRegistry {
    pub url: String,
    state: FakeState,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl FakeRegistry {
    pub async fn start(script: Vec<StatusCode>) -> Self {
        let state = FakeState {
            script: Arc::new(Mutex::new(script.into())),
            ..FakeState::default()
        };
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        let app = Router::new()
            .route("/", post(receive))
            .with_state(state.clone());

        let cancel = CancellationToken::new();
        let shutdown = cancel.clone();
        let handle = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move { shutdown.cancelled().await })
                .await
                .expect("fake registry");
        });

        Self {
            url: format!("http://{addr}"),
            state,
            cancel,
            handle,
        }
    }

    /// Messages answered with 200, in arrival order.
    pub fn received(&self) -> Vec<ClientMessage> {
        self.state.received.lock().expect("lock").clone()
    }

    /// Every request seen, including scripted failures.
    pub fn attempts(&self) -> u32 {
        self.state.attempts.load(Ordering::SeqCst)
    }

    pub async fn stop(self) {
        self.cancel.cancel();
        self.handle.await.expect("fake registry task");
    }
}

async fn receive(State(state): State<FakeState>, Json(message): Json<ClientMessage>) -> StatusCode {
    state.attempts.fetch_add(1, Ordering::SeqCst);
    let scripted = state.script.lock().expect("lock").pop_front();
    match scripted {
        Some(status) => status,
        None => {
            state.received.lock().expect("lock").push(message);
            StatusCode::OK
        }
    }
}

/// URL of a local port nothing is listening on.
pub(crate) async fn closed_port_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);
    format!("http://{addr}")
}
