//! Liveness sweeper: evicts clients that stopped sending heartbeats.
//! Runs as a tokio task on a fixed tick, independent of the heartbeat interval.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;

use pulsewatch_core::{SweepPolicy, SweepReport};

use crate::shared::{self, SharedRegistry};

/// Default sweep tick (50ms).
pub const DEFAULT_SWEEP_TICK: Duration = Duration::from_millis(50);

pub struct LivenessSweeper {
    registry: SharedRegistry,
    tick: Duration,
    policy: SweepPolicy,
}

impl LivenessSweeper {
    pub fn new(registry: SharedRegistry, tick: Duration, policy: SweepPolicy) -> Self {
        Self {
            registry,
            tick,
            policy,
        }
    }

    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(cancel))
    }

    /// Sweep on every tick until `cancel` fires.
    pub async fn run(self, cancel: CancellationToken) {
        let mut ticker = interval(self.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            tick_ms = self.tick.as_millis() as u64,
            timeout_ms = self.policy.liveness_timeout.as_millis() as u64,
            "liveness sweeper started"
        );

        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    tracing::info!("liveness sweeper stopped");
                    break;
                }
                _ = ticker.tick() => {
                    self.sweep_once().await;
                }
            }
        }
    }

    /// Run a single sweep at the current instant and log every eviction.
    pub async fn sweep_once(&self) -> SweepReport {
        let report = self.registry.sweep(shared::now(), &self.policy).await;

        for identity in &report.expired {
            tracing::warn!(
                %identity,
                timeout_ms = self.policy.liveness_timeout.as_millis() as u64,
                "no heartbeat within liveness timeout, evicted"
            );
        }
        if let Some(limit) = self.policy.shutdown_timeout {
            for identity in &report.stalled {
                tracing::warn!(
                    %identity,
                    limit_ms = limit.as_millis() as u64,
                    "shutdown never completed, evicted"
                );
            }
        }

        report
    }
}
