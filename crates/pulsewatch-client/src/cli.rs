//! CLI definition using clap derive.

use std::net::SocketAddr;
use std::time::Duration;

use clap::Parser;

use crate::lifecycle::{DEFAULT_GRACE, DEFAULT_HEARTBEAT_INTERVAL, LifecycleConfig};
use crate::reporter::Backoff;

#[derive(Parser, Debug)]
#[command(name = "pulsewatch-client", about = "report liveness to a pulsewatch server")]
pub struct Cli {
    /// Registry server base URL
    #[arg(long, env = "PULSEWATCH_SERVER", default_value = "http://127.0.0.1:8888")]
    pub server: String,

    /// Identity to report (default: this machine's hostname)
    #[arg(long, env = "PULSEWATCH_IDENTITY")]
    pub identity: Option<String>,

    /// Version string sent with every event
    #[arg(long, env = "PULSEWATCH_VERSION_TAG", default_value = "v1")]
    pub version_tag: String,

    /// Heartbeat interval in milliseconds
    #[arg(long, default_value_t = DEFAULT_HEARTBEAT_INTERVAL.as_millis() as u64)]
    pub heartbeat_interval_ms: u64,

    /// Delay between shutdown-start and shutdown-end in milliseconds
    #[arg(long, default_value_t = DEFAULT_GRACE.as_millis() as u64)]
    pub grace_ms: u64,

    /// Address of the shutdown-trigger listener
    #[arg(long, env = "PULSEWATCH_TRIGGER_LISTEN", default_value = "0.0.0.0:9000")]
    pub trigger_listen: SocketAddr,

    /// Send attempts per event before giving up on it
    #[arg(long, default_value = "5")]
    pub max_attempts: u32,
}

impl Cli {
    pub fn lifecycle_config(&self) -> anyhow::Result<LifecycleConfig> {
        anyhow::ensure!(
            self.heartbeat_interval_ms > 0,
            "heartbeat interval must be non-zero"
        );
        Ok(LifecycleConfig {
            heartbeat_interval: Duration::from_millis(self.heartbeat_interval_ms),
            grace: Duration::from_millis(self.grace_ms),
        })
    }

    pub fn backoff(&self) -> Backoff {
        Backoff {
            max_attempts: self.max_attempts,
            ..Backoff::default()
        }
    }

    /// The configured identity, or the machine hostname.
    pub fn resolve_identity(&self) -> anyhow::Result<String> {
        if let Some(identity) = &self.identity {
            return Ok(identity.clone());
        }
        let host = hostname::get()
            .map_err(|e| anyhow::anyhow!("cannot determine hostname: {e}"))?;
        Ok(host.to_string_lossy().into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cli = Cli::try_parse_from(["pulsewatch-client"]).expect("valid");
        let config = cli.lifecycle_config().expect("valid");
        assert_eq!(config.heartbeat_interval, Duration::from_millis(500));
        assert_eq!(config.grace, Duration::from_secs(1));
        assert_eq!(cli.backoff().max_attempts, 5);
        assert_eq!(cli.trigger_listen.port(), 9000);
        assert_eq!(cli.version_tag, "v1");
    }

    #[test]
    fn explicit_identity_wins() {
        let cli = Cli::try_parse_from(["pulsewatch-client", "--identity", "worker-7"])
            .expect("valid");
        assert_eq!(cli.resolve_identity().expect("identity"), "worker-7");
    }

    #[test]
    fn hostname_fallback_is_non_empty() {
        let cli = Cli::try_parse_from(["pulsewatch-client"]).expect("valid");
        if cli.identity.is_none() {
            assert!(!cli.resolve_identity().expect("hostname").is_empty());
        }
    }

    #[test]
    fn zero_heartbeat_interval_rejected() {
        let cli = Cli::try_parse_from(["pulsewatch-client", "--heartbeat-interval-ms", "0"])
            .expect("parses");
        assert!(cli.lifecycle_config().is_err());
    }
}
