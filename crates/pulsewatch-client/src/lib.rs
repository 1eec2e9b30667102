//! pulsewatch-client: reports this process's lifecycle to a pulsewatch
//! server and shuts down cleanly on request.

pub mod cli;
pub mod lifecycle;
pub mod reporter;
pub mod trigger;

#[cfg(test)]
mod testing;

pub use lifecycle::{Lifecycle, LifecycleConfig, RunSummary, ShutdownRequest};
pub use reporter::{Backoff, Reporter, ReporterError};
