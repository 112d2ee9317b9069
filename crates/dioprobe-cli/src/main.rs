//! dioprobe exporter.
//!
//! Measures direct (cache-bypassing) write and read latency of one block
//! on every Prometheus scrape.
//!
//! # Quick Start
//!
//! ```bash
//! # Probe /var/run, serve on :9172
//! dioprobe
//!
//! # Probe a data volume on a custom port
//! DIOPROBE_PATH=/mnt/data dioprobe --listen 127.0.0.1:9200
//!
//! curl -s localhost:9200/metrics
//! ```

mod serve;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

/// dioprobe - direct I/O latency probe for Prometheus.
#[derive(Parser)]
#[command(name = "dioprobe")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory to probe [env: DIOPROBE_PATH] [default: /var/run]
    #[arg(long, value_name = "DIR")]
    path: Option<PathBuf>,

    /// Address to listen on: ":port", "port" or "host:port"
    /// [env: DIOPROBE_LISTEN] [default: :9172]
    #[arg(long, value_name = "ADDR")]
    listen: Option<String>,

    /// TOML configuration file.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let cli = Cli::parse();

    serve::run(cli.config.as_deref(), cli.path, cli.listen)
}
