//! CLI definition using clap derive.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};

use pulsewatch_core::SweepPolicy;
use pulsewatch_core::registry::DEFAULT_LIVENESS_TIMEOUT;

use crate::server::ServerConfig;
use crate::sweeper::DEFAULT_SWEEP_TICK;

#[derive(Parser)]
#[command(name = "pulsewatch", about = "heartbeat liveness registry")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the registry server (HTTP listener + liveness sweeper)
    Serve(ServeOpts),
    /// List clients tracked by a running server
    Ls(LsOpts),
}

#[derive(clap::Args, Debug, Clone)]
pub struct ServeOpts {
    /// Address to listen on
    #[arg(long, env = "PULSEWATCH_LISTEN", default_value = "0.0.0.0:8888")]
    pub listen: SocketAddr,

    /// Heartbeat gap after which an active client is evicted
    #[arg(
        long,
        env = "PULSEWATCH_LIVENESS_TIMEOUT_MS",
        default_value_t = DEFAULT_LIVENESS_TIMEOUT.as_millis() as u64
    )]
    pub liveness_timeout_ms: u64,

    /// How often the eviction sweep runs
    #[arg(
        long,
        env = "PULSEWATCH_SWEEP_TICK_MS",
        default_value_t = DEFAULT_SWEEP_TICK.as_millis() as u64
    )]
    pub sweep_tick_ms: u64,

    /// Evict clients stuck in shutdown for longer than this (unset: never)
    #[arg(long, env = "PULSEWATCH_SHUTDOWN_TIMEOUT_MS")]
    pub shutdown_timeout_ms: Option<u64>,

    /// Log file appended to in addition to stdout
    #[arg(long, env = "PULSEWATCH_LOG_FILE", default_value = "server.log")]
    pub log_file: PathBuf,

    /// Log to stdout only
    #[arg(long)]
    pub no_log_file: bool,
}

impl ServeOpts {
    /// Validate the timing options and build the server configuration.
    pub fn server_config(&self) -> anyhow::Result<ServerConfig> {
        anyhow::ensure!(self.liveness_timeout_ms > 0, "liveness timeout must be non-zero");
        anyhow::ensure!(self.sweep_tick_ms > 0, "sweep tick must be non-zero");
        anyhow::ensure!(
            self.sweep_tick_ms < self.liveness_timeout_ms,
            "sweep tick ({}ms) must be shorter than the liveness timeout ({}ms)",
            self.sweep_tick_ms,
            self.liveness_timeout_ms
        );

        let mut policy = SweepPolicy::new(Duration::from_millis(self.liveness_timeout_ms));
        if let Some(limit) = self.shutdown_timeout_ms {
            anyhow::ensure!(limit > 0, "shutdown timeout must be non-zero");
            policy = policy.with_shutdown_timeout(Duration::from_millis(limit));
        }

        Ok(ServerConfig {
            listen: self.listen,
            sweep_tick: Duration::from_millis(self.sweep_tick_ms),
            policy,
        })
    }

    pub fn log_file(&self) -> Option<&std::path::Path> {
        (!self.no_log_file).then_some(self.log_file.as_path())
    }
}

#[derive(clap::Args, Debug, Clone)]
pub struct LsOpts {
    /// Server base URL
    #[arg(long, env = "PULSEWATCH_SERVER", default_value = "http://127.0.0.1:8888")]
    pub server: String,

    /// Print raw JSON instead of a table
    #[arg(long)]
    pub json: bool,
}
