//! Shared registry handle used by request handlers and the sweeper.

use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Mutex;

use pulsewatch_core::{
    ClientMessage, ClientSnapshot, Dispatched, Registry, SweepPolicy, SweepReport, dispatch,
    log_dispatched,
};

/// Current instant on the tokio clock (the sweeper's interval runs on it).
pub fn now() -> Instant {
    tokio::time::Instant::now().into_std()
}

/// Cloneable handle to one [`Registry`] behind a single exclusive lock.
///
/// Every method takes the lock exactly once and holds it across no await
/// point, so each operation (including the sweep's scan-and-evict) is one
/// atomic critical section. Nothing is logged while the lock is held.
#[derive(Debug, Clone, Default)]
pub struct SharedRegistry {
    inner: Arc<Mutex<Registry>>,
}

impl SharedRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Route one client message. The timestamp is taken after the lock is
    /// acquired so heartbeat instants follow lock order.
    pub async fn dispatch(&self, message: &ClientMessage) -> Dispatched {
        let dispatched = {
            let mut reg = self.inner.lock().await;
            dispatch(&mut reg, message, now())
        };
        log_dispatched(message, &dispatched);
        dispatched
    }

    pub async fn sweep(&self, now: Instant, policy: &SweepPolicy) -> SweepReport {
        self.inner.lock().await.sweep(now, policy)
    }

    pub async fn snapshot(&self) -> Vec<ClientSnapshot> {
        let reg = self.inner.lock().await;
        reg.snapshot(now())
    }

    pub async fn contains(&self, identity: &str) -> bool {
        self.inner.lock().await.contains(identity)
    }

    pub async fn len(&self) -> usize {
        self.inner.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.is_empty()
    }
}
