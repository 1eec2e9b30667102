//! pulsewatch: heartbeat liveness registry binary.

use clap::Parser;
use tokio_util::sync::CancellationToken;

use pulsewatch_server::cli::{Cli, Command};
use pulsewatch_server::{cmd_ls, logging, server};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    match args.command {
        Command::Serve(opts) => {
            let config = opts.server_config()?;
            logging::init(opts.log_file())?;

            tracing::info!(
                listen = %config.listen,
                liveness_timeout_ms = config.policy.liveness_timeout.as_millis() as u64,
                sweep_tick_ms = config.sweep_tick.as_millis() as u64,
                shutdown_timeout_ms = ?config.policy.shutdown_timeout.map(|d| d.as_millis() as u64),
                "pulsewatch server starting"
            );

            let cancel = CancellationToken::new();
            let signal_cancel = cancel.clone();
            tokio::spawn(async move {
                server::shutdown_signal().await;
                signal_cancel.cancel();
            });

            server::run_server(config, cancel).await?;
        }
        Command::Ls(opts) => {
            cmd_ls::cmd_ls(&opts.server, opts.json).await?;
        }
    }

    Ok(())
}
