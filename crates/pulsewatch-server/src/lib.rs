//! pulsewatch-server: HTTP front end and liveness sweeper around the
//! pulsewatch-core registry.

pub mod cli;
pub mod cmd_ls;
pub mod http;
pub mod logging;
pub mod server;
pub mod shared;
pub mod sweeper;

pub use server::{ServerConfig, run_server, serve};
pub use shared::SharedRegistry;
pub use sweeper::LivenessSweeper;
