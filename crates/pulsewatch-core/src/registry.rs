//! Client registry: lifecycle state machine and timeout sweep.
//!
//! Maps a client identity to its [`ClientRecord`]. Records are created on the
//! first startup event, mutated in place by heartbeat and shutdown-start
//! events, and destroyed by a shutdown-end event or by the liveness sweep.
//!
//! The registry is a plain owned value. Callers that share it across tasks
//! wrap it in a single lock so every operation, including the sweep's
//! scan-and-evict, runs in one exclusive critical section.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::types::{ClientRecord, ClientSnapshot, ClientState};

// ─── Constants ───────────────────────────────────────────────────────

/// Default liveness timeout (2 seconds).
pub const DEFAULT_LIVENESS_TIMEOUT: Duration = Duration::from_secs(2);

// ─── Outcome ─────────────────────────────────────────────────────────

/// Result of applying one lifecycle operation.
///
/// None of these are errors: conflicts and unknown identities are resolved by
/// policy and only reported so the caller can log them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum Outcome {
    /// A new record was created.
    Registered,
    /// A record already existed; it was left untouched.
    AlreadyRegistered { existing_version: String },
    /// The operation was applied to an existing record. Carries the stored
    /// version when the event reported a different one.
    Applied {
        #[serde(skip_serializing_if = "Option::is_none")]
        registered_version_mismatch: Option<String>,
    },
    /// No record exists for the identity; nothing changed.
    UnknownClient,
}

// ─── Sweep policy ────────────────────────────────────────────────────

/// Eviction thresholds applied on each sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepPolicy {
    /// Maximum heartbeat gap tolerated for an `Active` record.
    pub liveness_timeout: Duration,
    /// Maximum time a record may stay `ShuttingDown`. `None` keeps
    /// shutting-down records until their shutdown-end event arrives.
    pub shutdown_timeout: Option<Duration>,
}

impl SweepPolicy {
    pub fn new(liveness_timeout: Duration) -> Self {
        Self {
            liveness_timeout,
            shutdown_timeout: None,
        }
    }

    pub fn with_shutdown_timeout(mut self, limit: Duration) -> Self {
        self.shutdown_timeout = Some(limit);
        self
    }
}

impl Default for SweepPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_LIVENESS_TIMEOUT)
    }
}

/// Identities removed by one [`Registry::sweep`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Active records whose heartbeat gap exceeded the liveness timeout.
    pub expired: Vec<String>,
    /// Shutting-down records that outlived the shutdown timeout.
    pub stalled: Vec<String>,
}

impl SweepReport {
    pub fn is_empty(&self) -> bool {
        self.expired.is_empty() && self.stalled.is_empty()
    }
}

// ─── Registry ────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct Registry {
    clients: HashMap<String, ClientRecord>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a client.
    ///
    /// Creates an `Active` record with `last_heartbeat = now`. If a record
    /// already exists this is a no-op: the first registration (and its
    /// version) wins and the heartbeat is not reset.
    pub fn register(&mut self, identity: &str, version: &str, now: Instant) -> Outcome {
        if let Some(existing) = self.clients.get(identity) {
            return Outcome::AlreadyRegistered {
                existing_version: existing.version.clone(),
            };
        }
        self.clients
            .insert(identity.to_owned(), ClientRecord::new(identity, version, now));
        Outcome::Registered
    }

    /// Record a heartbeat, whatever the record's state.
    ///
    /// `last_heartbeat` never moves backwards, even if `now` is earlier than
    /// the stored instant.
    pub fn heartbeat(&mut self, identity: &str, version: &str, now: Instant) -> Outcome {
        match self.clients.get_mut(identity) {
            Some(record) => {
                record.last_heartbeat = record.last_heartbeat.max(now);
                applied(record, version)
            }
            None => Outcome::UnknownClient,
        }
    }

    /// Move a client to `ShuttingDown`, exempting it from liveness eviction.
    ///
    /// A repeated shutdown-start keeps the original `since` instant.
    pub fn mark_shutting_down(&mut self, identity: &str, version: &str, now: Instant) -> Outcome {
        match self.clients.get_mut(identity) {
            Some(record) => {
                if record.state.is_active() {
                    record.state = ClientState::ShuttingDown { since: now };
                }
                applied(record, version)
            }
            None => Outcome::UnknownClient,
        }
    }

    /// Delete a client's record regardless of state.
    pub fn remove(&mut self, identity: &str, version: &str) -> Outcome {
        match self.clients.remove(identity) {
            Some(record) => applied(&record, version),
            None => Outcome::UnknownClient,
        }
    }

    /// Remove every `Active` record whose heartbeat age exceeds `timeout`.
    ///
    /// `ShuttingDown` records are never touched. Returns the removed
    /// identities, sorted.
    pub fn sweep_expired(&mut self, now: Instant, timeout: Duration) -> Vec<String> {
        let mut removed = Vec::new();
        self.clients.retain(|identity, record| {
            let expired = record.state.is_active() && record.heartbeat_age(now) > timeout;
            if expired {
                removed.push(identity.clone());
            }
            !expired
        });
        removed.sort();
        removed
    }

    /// Remove every `ShuttingDown` record that entered that state more than
    /// `limit` ago. Returns the removed identities, sorted.
    pub fn sweep_stalled_shutdowns(&mut self, now: Instant, limit: Duration) -> Vec<String> {
        let mut removed = Vec::new();
        self.clients.retain(|identity, record| {
            let stalled = match record.state {
                ClientState::ShuttingDown { since } => {
                    now.saturating_duration_since(since) > limit
                }
                ClientState::Active => false,
            };
            if stalled {
                removed.push(identity.clone());
            }
            !stalled
        });
        removed.sort();
        removed
    }

    /// Run every eviction pass the policy enables.
    pub fn sweep(&mut self, now: Instant, policy: &SweepPolicy) -> SweepReport {
        let expired = self.sweep_expired(now, policy.liveness_timeout);
        let stalled = match policy.shutdown_timeout {
            Some(limit) => self.sweep_stalled_shutdowns(now, limit),
            None => Vec::new(),
        };
        SweepReport { expired, stalled }
    }

    pub fn get(&self, identity: &str) -> Option<&ClientRecord> {
        self.clients.get(identity)
    }

    pub fn contains(&self, identity: &str) -> bool {
        self.clients.contains_key(identity)
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// Count of records in the `Active` state.
    pub fn active_count(&self) -> usize {
        self.clients
            .values()
            .filter(|r| r.state.is_active())
            .count()
    }

    /// Owned copies of every record, sorted by identity.
    pub fn snapshot(&self, now: Instant) -> Vec<ClientSnapshot> {
        let mut snaps: Vec<ClientSnapshot> =
            self.clients.values().map(|r| r.snapshot(now)).collect();
        snaps.sort_by(|a, b| a.identity.cmp(&b.identity));
        snaps
    }
}

fn applied(record: &ClientRecord, version: &str) -> Outcome {
    let registered_version_mismatch =
        (record.version != version).then(|| record.version.clone());
    Outcome::Applied {
        registered_version_mismatch,
    }
}

// ─── Tests ───────────────────────────────────────────────────────────


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    #[derive(Debug, Clone)]
    enum Op {
        Register,
        Heartbeat(u64),
        ShutdownStart,
        Sweep(u64),
    }

    fn arb_op() -> impl Strategy<Value = Op> {
        prop_oneof![
            Just(Op::Register),
            (0u64..5_000).prop_map(Op::Heartbeat),
            Just(Op::ShutdownStart),
            (0u64..10_000).prop_map(Op::Sweep),
        ]
    }

    proptest! {
        /// Stored heartbeat never decreases while the record exists.
        #[test]
        fn heartbeat_is_monotonic(offsets in proptest::collection::vec(0u64..10_000, 1..50)) {
            let t0 = Instant::now();
            let mut reg = Registry::new();
            reg.register("h1", "v1", t0);

            let mut last = t0;
            for off in offsets {
                reg.heartbeat("h1", "v1", t0 + Duration::from_millis(off));
                let stored = reg.get("h1").map(|r| r.last_heartbeat);
                prop_assert!(stored.is_some());
                let stored = stored.unwrap_or(last);
                prop_assert!(stored >= last);
                last = stored;
            }
        }

        /// A shutting-down record survives any liveness sweep.
        #[test]
        fn shutting_down_survives_sweep(
            age_ms in 0u64..1_000_000,
            timeout_ms in 1u64..10_000,
        ) {
            let t0 = Instant::now();
            let mut reg = Registry::new();
            reg.register("h1", "v1", t0);
            reg.mark_shutting_down("h1", "v1", t0);

            let removed = reg.sweep_expired(
                t0 + Duration::from_millis(age_ms),
                Duration::from_millis(timeout_ms),
            );
            prop_assert!(removed.is_empty());
            prop_assert!(reg.contains("h1"));
        }

        /// Arbitrary event sequences on one identity never produce more than
        /// one record, and operations on another identity never create one.
        #[test]
        fn single_record_per_identity(ops in proptest::collection::vec(arb_op(), 0..40)) {
            let t0 = Instant::now();
            let mut reg = Registry::new();
            for op in ops {
                match op {
                    Op::Register => { reg.register("h1", "v1", t0); }
                    Op::Heartbeat(off) => {
                        reg.heartbeat("h1", "v1", t0 + Duration::from_millis(off));
                        reg.heartbeat("ghost", "v1", t0 + Duration::from_millis(off));
                    }
                    Op::ShutdownStart => { reg.mark_shutting_down("h1", "v1", t0); }
                    Op::Sweep(off) => {
                        reg.sweep_expired(t0 + Duration::from_millis(off), Duration::from_secs(1));
                    }
                }
                prop_assert!(reg.len() <= 1);
                prop_assert!(!reg.contains("ghost"));
            }
        }
    }
}
