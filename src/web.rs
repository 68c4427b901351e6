#![cfg(not(tarpaulin_include))]

use clap::Parser;
use env_logger::Env;
use exam_dashboard::app;
use exam_dashboard::config::{ServerArgs, ServerConfig};

/// Main entry point for the dashboard web server
///
/// Reads the server settings from the command line (or the `DASHBOARD_*`
/// environment variables) and serves the upload page until interrupted.
/// Log output defaults to `info` and follows `RUST_LOG` when set.
///
/// # Returns
/// * `Result<(), Box<dyn std::error::Error>>` - Success or error object
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = ServerConfig::from(ServerArgs::parse());
    app::run(config).await
}
