//! Client lifecycle driver.
//!
//! startup → heartbeat loop → (trigger) shutdown-start → grace → shutdown-end.
//! Triggers arrive on a channel; waiting for them never spins.
//!
//! The registry drops heartbeats from clients it does not know, so until a
//! startup has been delivered the loop sends startup in place of heartbeat.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time::{MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;

use pulsewatch_core::EventKind;

use crate::reporter::Reporter;

/// Default heartbeat interval (500ms).
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_millis(500);

/// Default grace period between shutdown-start and shutdown-end (1s).
pub const DEFAULT_GRACE: Duration = Duration::from_secs(1);

/// A request to shut the client down.
///
/// `done` (if present) is signalled once shutdown-end has been sent.
#[derive(Debug)]
pub struct ShutdownRequest {
    done: Option<oneshot::Sender<()>>,
}

impl ShutdownRequest {
    /// Request that reports completion on the returned receiver.
    pub fn acknowledged() -> (Self, oneshot::Receiver<()>) {
        let (tx, rx) = oneshot::channel();
        (Self { done: Some(tx) }, rx)
    }

    /// Fire-and-forget request (e.g. from a signal handler).
    pub fn detached() -> Self {
        Self { done: None }
    }

    fn complete(self) {
        if let Some(done) = self.done {
            let _ = done.send(());
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecycleConfig {
    pub heartbeat_interval: Duration,
    pub grace: Duration,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            grace: DEFAULT_GRACE,
        }
    }
}

/// Delivery counts for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub startup_delivered: bool,
    /// Startups that failed once and were re-sent from the heartbeat loop.
    pub startup_resends: u64,
    pub heartbeats_sent: u64,
    pub heartbeats_failed: u64,
    pub shutdown_start_delivered: bool,
    pub shutdown_end_delivered: bool,
}

pub struct Lifecycle {
    reporter: Arc<Reporter>,
    config: LifecycleConfig,
}

impl Lifecycle {
    pub fn new(reporter: Arc<Reporter>, config: LifecycleConfig) -> Self {
        Self { reporter, config }
    }

    /// Drive the full lifecycle. Returns once shutdown-end has been attempted.
    ///
    /// A closed trigger channel is treated as a shutdown request. Delivery
    /// failures are logged and never abort the sequence.
    pub async fn run(self, mut triggers: mpsc::Receiver<ShutdownRequest>) -> RunSummary {
        let mut summary = RunSummary {
            startup_delivered: self.deliver(EventKind::Startup).await,
            ..RunSummary::default()
        };

        let stop = CancellationToken::new();
        let heartbeats = tokio::spawn(heartbeat_loop(
            Arc::clone(&self.reporter),
            self.config.heartbeat_interval,
            summary.startup_delivered,
            stop.clone(),
        ));
        tracing::info!(
            interval_ms = self.config.heartbeat_interval.as_millis() as u64,
            "heartbeat loop started"
        );

        let request = triggers.recv().await;
        if request.is_none() {
            tracing::warn!("shutdown trigger channel closed");
        }
        tracing::info!("shutdown requested");

        summary.shutdown_start_delivered = self.deliver(EventKind::ShutdownStart).await;

        stop.cancel();
        match heartbeats.await {
            Ok(stats) => {
                summary.startup_delivered |= stats.registered;
                summary.startup_resends = stats.startup_resends;
                summary.heartbeats_sent = stats.sent;
                summary.heartbeats_failed = stats.failed;
            }
            Err(e) => tracing::warn!(error = %e, "heartbeat task ended abnormally"),
        }

        tracing::info!(grace_ms = self.config.grace.as_millis() as u64, "waiting out grace period");
        tokio::time::sleep(self.config.grace).await;

        summary.shutdown_end_delivered = self.deliver(EventKind::ShutdownEnd).await;
        tracing::info!(?summary, "shutdown complete");

        if let Some(request) = request {
            request.complete();
        }
        summary
    }

    async fn deliver(&self, kind: EventKind) -> bool {
        match self.reporter.send(kind).await {
            Ok(()) => {
                tracing::info!(event = kind.as_str(), "sent to server");
                true
            }
            Err(e) => {
                tracing::error!(event = kind.as_str(), error = %e, "failed to send to server");
                false
            }
        }
    }
}

#[derive(Debug, Default)]
struct LoopStats {
    registered: bool,
    startup_resends: u64,
    sent: u64,
    failed: u64,
}

/// Send heartbeats until `stop` fires, re-sending startup first while it has
/// not been delivered.
async fn heartbeat_loop(
    reporter: Arc<Reporter>,
    every: Duration,
    registered: bool,
    stop: CancellationToken,
) -> LoopStats {
    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut stats = LoopStats {
        registered,
        ..LoopStats::default()
    };

    loop {
        tokio::select! {
            biased;
            () = stop.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let kind = if stats.registered {
            EventKind::Heartbeat
        } else {
            stats.startup_resends += 1;
            EventKind::Startup
        };

        tokio::select! {
            biased;
            () = stop.cancelled() => break,
            result = reporter.send(kind) => match (kind, result) {
                (EventKind::Startup, Ok(())) => {
                    stats.registered = true;
                    tracing::info!("startup delivered on retry");
                }
                (EventKind::Startup, Err(e)) => {
                    tracing::warn!(error = %e, "startup still not delivered");
                }
                (_, Ok(())) => {
                    stats.sent += 1;
                    tracing::debug!("sent heartbeat");
                }
                (_, Err(e)) => {
                    stats.failed += 1;
                    tracing::warn!(error = %e, "heartbeat not delivered");
                }
            },
        }
    }

    stats
}
