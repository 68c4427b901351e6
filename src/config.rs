use crate::chart::ChartLayout;
use clap::Parser;
use std::net::{Ipv4Addr, SocketAddr};

const MEGABYTE: usize = 1024 * 1024;

/// Settings of the dashboard web server
#[derive(Clone, Debug, PartialEq)]
pub struct ServerConfig {
    pub bind: SocketAddr,

    /// Largest accepted request body, in bytes
    pub max_upload_bytes: usize,
    pub chart: ChartLayout,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from((Ipv4Addr::LOCALHOST, 3000)),
            max_upload_bytes: 10 * MEGABYTE,
            chart: ChartLayout::default(),
        }
    }
}

/// Command line arguments of the dashboard server
#[derive(Parser, Debug)]
#[command(name = "website", about = "Exam results dashboard server")]
pub struct ServerArgs {
    /// Address to listen on
    #[arg(long, env = "DASHBOARD_BIND", default_value = "127.0.0.1:3000")]
    pub bind: SocketAddr,

    /// Upload size limit in megabytes
    #[arg(long, env = "DASHBOARD_MAX_UPLOAD_MB", default_value_t = 10)]
    pub max_upload_mb: usize,

    /// Width of the non-faceted charts in pixels
    #[arg(long, default_value_t = 800)]
    pub chart_width: u32,

    /// Height of the non-faceted charts in pixels
    #[arg(long, default_value_t = 400)]
    pub chart_height: u32,
}

impl From<ServerArgs> for ServerConfig {
    fn from(args: ServerArgs) -> Self {
        Self {
            bind: args.bind,
            max_upload_bytes: args.max_upload_mb.saturating_mul(MEGABYTE),
            chart: ChartLayout {
                width: args.chart_width,
                height: args.chart_height,
                ..ChartLayout::default()
            },
        }
    }
}
