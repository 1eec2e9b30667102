//! HTTP sender for client lifecycle events, with retry and backoff.
//!
//! An unreachable registry is never fatal: each event is retried with
//! exponential backoff up to a bounded number of attempts, then reported to
//! the caller, which logs it and carries on.

use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use thiserror::Error;

use pulsewatch_core::{ClientMessage, EventKind, ProtocolError, encode_message};

/// Per-request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(2);

/// Retry schedule for one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub initial: Duration,
    pub max: Duration,
    /// Total attempts per event, including the first. Zero is treated as one.
    pub max_attempts: u32,
}

impl Backoff {
    /// Delay before the attempt that follows failed attempt number `attempt`
    /// (1-based): `initial * 2^(attempt-1)`, capped at `max`.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.initial.saturating_mul(factor).min(self.max)
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            initial: Duration::from_millis(100),
            max: Duration::from_secs(5),
            max_attempts: 5,
        }
    }
}

#[derive(Debug, Error)]
pub enum ReporterError {
    #[error("server rejected {kind} with status {status}")]
    Rejected { kind: &'static str, status: u16 },

    #[error("gave up sending {kind} after {attempts} attempts: {last_error}")]
    GaveUp {
        kind: &'static str,
        attempts: u32,
        last_error: String,
    },

    #[error("cannot encode message: {0}")]
    Encode(#[from] ProtocolError),

    #[error("http client error: {0}")]
    Client(#[from] reqwest::Error),
}

/// Sends this process's lifecycle events to the registry.
#[derive(Debug)]
pub struct Reporter {
    http: reqwest::Client,
    endpoint: String,
    identity: String,
    version: String,
    backoff: Backoff,
}

impl Reporter {
    pub fn new(
        server: &str,
        identity: impl Into<String>,
        version: impl Into<String>,
        backoff: Backoff,
    ) -> Result<Self, ReporterError> {
        let http = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self {
            http,
            endpoint: format!("{}/", server.trim_end_matches('/')),
            identity: identity.into(),
            version: version.into(),
            backoff,
        })
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Deliver one event, retrying transport failures and server errors.
    ///
    /// A 4xx response is not retried: resending the same message cannot fix it.
    pub async fn send(&self, kind: EventKind) -> Result<(), ReporterError> {
        let body = encode_message(&ClientMessage::new(&self.identity, kind, &self.version))?;
        let max_attempts = self.backoff.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            let request = self
                .http
                .post(&self.endpoint)
                .header(CONTENT_TYPE, "application/json")
                .body(body.clone());
            let last_error = match request.send().await {
                Ok(resp) if resp.status().is_success() => return Ok(()),
                Ok(resp) if resp.status().is_client_error() => {
                    return Err(ReporterError::Rejected {
                        kind: kind.as_str(),
                        status: resp.status().as_u16(),
                    });
                }
                Ok(resp) => format!("server returned {}", resp.status()),
                Err(e) => e.to_string(),
            };

            if attempt >= max_attempts {
                return Err(ReporterError::GaveUp {
                    kind: kind.as_str(),
                    attempts: attempt,
                    last_error,
                });
            }

            let delay = self.backoff.delay_after(attempt);
            tracing::debug!(
                event = kind.as_str(),
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %last_error,
                "send failed, retrying"
            );
            tokio::time::sleep(delay).await;
        }
    }
}
