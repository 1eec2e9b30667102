//! Routes decoded client messages to registry operations.

use std::time::Instant;

use serde::Serialize;

use crate::protocol::{ClientMessage, EventKind};
use crate::registry::{Outcome, Registry};

/// What the dispatcher did with one message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Dispatched {
    Handled { kind: EventKind, outcome: Outcome },
    /// The message carried a kind code outside the protocol.
    Ignored { code: i64 },
}

impl Dispatched {
    pub fn is_handled(&self) -> bool {
        matches!(self, Self::Handled { .. })
    }
}

/// Apply one message to the registry.
///
/// Performs no validation beyond routing. Unknown kinds are ignored. Nothing
/// is logged here: callers holding a lock report the result with
/// [`log_dispatched`] once it is released.
pub fn dispatch(registry: &mut Registry, message: &ClientMessage, now: Instant) -> Dispatched {
    let Some(kind) = message.kind() else {
        return Dispatched::Ignored {
            code: message.kind_code,
        };
    };

    let identity = message.identity.as_str();
    let version = message.version.as_str();
    let outcome = match kind {
        EventKind::Startup => registry.register(identity, version, now),
        EventKind::Heartbeat => registry.heartbeat(identity, version, now),
        EventKind::ShutdownStart => registry.mark_shutting_down(identity, version, now),
        EventKind::ShutdownEnd => registry.remove(identity, version),
    };

    Dispatched::Handled { kind, outcome }
}

/// Log what [`dispatch`] did with `message`.
pub fn log_dispatched(message: &ClientMessage, dispatched: &Dispatched) {
    let identity = &message.identity;
    let version = &message.version;
    let (kind, outcome) = match dispatched {
        Dispatched::Ignored { code } => {
            tracing::warn!(%identity, code, "ignoring message with unknown type");
            return;
        }
        Dispatched::Handled { kind, outcome } => (*kind, outcome),
    };

    match outcome {
        Outcome::Registered => {
            tracing::info!(%identity, %version, "registered client");
        }
        Outcome::AlreadyRegistered { existing_version } => {
            tracing::warn!(
                %identity,
                %version,
                %existing_version,
                "client attempted to register but already exists"
            );
        }
        Outcome::UnknownClient => {
            tracing::warn!(
                %identity,
                %version,
                event = kind.as_str(),
                "received event from client not in registry"
            );
        }
        Outcome::Applied {
            registered_version_mismatch,
        } => {
            if let Some(registered) = registered_version_mismatch {
                tracing::warn!(
                    %identity,
                    registered_version = %registered,
                    received_version = %version,
                    "version mismatch"
                );
            }
            match kind {
                EventKind::Heartbeat => tracing::debug!(%identity, "heartbeat"),
                EventKind::ShutdownStart => {
                    tracing::info!(%identity, %version, "received shutdown signal");
                }
                EventKind::ShutdownEnd => {
                    tracing::info!(%identity, %version, "finished shutdown, removing");
                }
                EventKind::Startup => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::types::ClientPhase;

    fn msg(identity: &str, kind: EventKind) -> ClientMessage {
        ClientMessage::new(identity, kind, "v1")
    }

    #[test]
    fn full_lifecycle_through_dispatch() {
        let t0 = Instant::now();
        let mut reg = Registry::new();

        let d = dispatch(&mut reg, &msg("h1", EventKind::Startup), t0);
        assert_eq!(
            d,
            Dispatched::Handled {
                kind: EventKind::Startup,
                outcome: Outcome::Registered,
            }
        );

        dispatch(
            &mut reg,
            &msg("h1", EventKind::Heartbeat),
            t0 + Duration::from_millis(500),
        );
        assert_eq!(
            reg.get("h1").expect("exists").last_heartbeat,
            t0 + Duration::from_millis(500)
        );

        dispatch(&mut reg, &msg("h1", EventKind::ShutdownStart), t0);
        assert_eq!(
            reg.get("h1").expect("exists").state.phase(),
            ClientPhase::ShuttingDown
        );

        dispatch(&mut reg, &msg("h1", EventKind::ShutdownEnd), t0);
        assert!(reg.is_empty());
    }

    #[test]
    fn unknown_kind_is_ignored() {
        let mut reg = Registry::new();
        let message = ClientMessage {
            identity: "h1".to_owned(),
            kind_code: 9,
            version: "v1".to_owned(),
        };

        let d = dispatch(&mut reg, &message, Instant::now());
        assert_eq!(d, Dispatched::Ignored { code: 9 });
        assert!(!d.is_handled());
        assert!(reg.is_empty());
    }

    #[test]
    fn heartbeat_before_startup_creates_nothing() {
        let mut reg = Registry::new();
        let d = dispatch(&mut reg, &msg("h3", EventKind::Heartbeat), Instant::now());

        assert_eq!(
            d,
            Dispatched::Handled {
                kind: EventKind::Heartbeat,
                outcome: Outcome::UnknownClient,
            }
        );
        assert!(reg.is_empty());
    }

    #[test]
    fn late_heartbeat_after_shutdown_end_is_noop() {
        let t0 = Instant::now();
        let mut reg = Registry::new();
        dispatch(&mut reg, &msg("h1", EventKind::Startup), t0);
        dispatch(&mut reg, &msg("h1", EventKind::ShutdownEnd), t0);

        let d = dispatch(&mut reg, &msg("h1", EventKind::Heartbeat), t0);
        assert!(matches!(
            d,
            Dispatched::Handled {
                outcome: Outcome::UnknownClient,
                ..
            }
        ));
        assert!(reg.is_empty());
    }

    #[test]
    fn dispatched_serializes_for_ack() {
        let json = serde_json::to_value(Dispatched::Handled {
            kind: EventKind::Startup,
            outcome: Outcome::Registered,
        })
        .expect("serialize");
        assert_eq!(json["status"], "handled");
        assert_eq!(json["kind"], "startup");
        assert_eq!(json["outcome"]["result"], "registered");
    }
}
