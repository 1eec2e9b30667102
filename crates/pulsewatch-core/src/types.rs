//! Liveness record types held by the registry.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ─── Lifecycle ───────────────────────────────────────────────────────

/// Lifecycle state of a present record.
///
/// There is no `Removed` variant: a client that finished shutdown or timed
/// out is simply absent from the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    /// Reporting heartbeats; subject to liveness eviction.
    Active,
    /// Announced shutdown at `since`; exempt from liveness eviction.
    ShuttingDown { since: Instant },
}

impl ClientState {
    pub fn phase(&self) -> ClientPhase {
        match self {
            Self::Active => ClientPhase::Active,
            Self::ShuttingDown { .. } => ClientPhase::ShuttingDown,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }
}

/// Serializable label for [`ClientState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientPhase {
    Active,
    ShuttingDown,
}

impl ClientPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::ShuttingDown => "shutting_down",
        }
    }
}

// ─── Record ──────────────────────────────────────────────────────────

/// One tracked process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientRecord {
    pub identity: String,
    /// Version reported at first registration. Later events never overwrite it.
    pub version: String,
    /// Wall-clock registration time, for display only.
    pub registered_at: DateTime<Utc>,
    pub last_heartbeat: Instant,
    pub state: ClientState,
}

impl ClientRecord {
    pub fn new(identity: &str, version: &str, now: Instant) -> Self {
        Self {
            identity: identity.to_owned(),
            version: version.to_owned(),
            registered_at: Utc::now(),
            last_heartbeat: now,
            state: ClientState::Active,
        }
    }

    /// Time since the last heartbeat. Zero if `now` precedes it.
    pub fn heartbeat_age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_heartbeat)
    }

    pub fn snapshot(&self, now: Instant) -> ClientSnapshot {
        ClientSnapshot {
            identity: self.identity.clone(),
            version: self.version.clone(),
            state: self.state.phase(),
            registered_at: self.registered_at,
            last_heartbeat_age_ms: u64::try_from(self.heartbeat_age(now).as_millis())
                .unwrap_or(u64::MAX),
        }
    }
}

// ─── Snapshot ────────────────────────────────────────────────────────

/// Owned, serializable copy of a record taken under the registry lock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientSnapshot {
    pub identity: String,
    pub version: String,
    pub state: ClientPhase,
    pub registered_at: DateTime<Utc>,
    pub last_heartbeat_age_ms: u64,
}
