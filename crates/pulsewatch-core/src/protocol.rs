//! Wire message exchanged between reporting clients and the server.
//!
//! One JSON object per request:
//! `{"identity": "host-a", "type": 1, "version": "v1"}`.
//! The legacy field name `hostname` is accepted in place of `identity`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The four lifecycle events a client can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Startup,
    Heartbeat,
    ShutdownStart,
    ShutdownEnd,
}

impl EventKind {
    pub const ALL: [EventKind; 4] = [
        EventKind::Startup,
        EventKind::Heartbeat,
        EventKind::ShutdownStart,
        EventKind::ShutdownEnd,
    ];

    /// Map a wire code to a kind. Unknown codes yield `None`.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::Startup),
            1 => Some(Self::Heartbeat),
            2 => Some(Self::ShutdownStart),
            3 => Some(Self::ShutdownEnd),
            _ => None,
        }
    }

    pub fn code(self) -> i64 {
        match self {
            Self::Startup => 0,
            Self::Heartbeat => 1,
            Self::ShutdownStart => 2,
            Self::ShutdownEnd => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Startup => "startup",
            Self::Heartbeat => "heartbeat",
            Self::ShutdownStart => "shutdown_start",
            Self::ShutdownEnd => "shutdown_end",
        }
    }
}

/// A decoded client message.
///
/// `kind_code` is kept raw so that unknown kinds survive decoding and can be
/// ignored by the dispatcher instead of failing the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientMessage {
    #[serde(alias = "hostname")]
    pub identity: String,
    #[serde(rename = "type")]
    pub kind_code: i64,
    pub version: String,
}

impl ClientMessage {
    pub fn new(identity: impl Into<String>, kind: EventKind, version: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            kind_code: kind.code(),
            version: version.into(),
        }
    }

    pub fn kind(&self) -> Option<EventKind> {
        EventKind::from_code(self.kind_code)
    }
}

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("empty request body")]
    EmptyBody,

    #[error("malformed client message: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Decode one message from a request body.
pub fn decode_message(body: &[u8]) -> Result<ClientMessage, ProtocolError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(ProtocolError::EmptyBody);
    }
    Ok(serde_json::from_slice(body)?)
}

/// Encode one message as a request body.
pub fn encode_message(message: &ClientMessage) -> Result<Vec<u8>, ProtocolError> {
    Ok(serde_json::to_vec(message)?)
}
