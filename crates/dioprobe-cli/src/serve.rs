//! Serve command - runs the probe exporter until SIGINT/SIGTERM.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use dioprobe::{ProbeCollector, Prober};
use dioprobe_config::{ConfigLoader, Overrides};
use dioprobe_server::Server;
use prometheus::Registry;
use tracing::{error, info};

pub fn run(
    config_file: Option<&Path>,
    path: Option<PathBuf>,
    listen: Option<String>,
) -> Result<()> {
    let mut loader = ConfigLoader::new().with_overrides(Overrides { path, listen });
    if let Some(file) = config_file {
        loader = loader.with_config_file(file);
    }
    let config = loader.load().context("Failed to load configuration")?;
    let bind_addr = config.listen_addr()?;

    info!(
        path = %config.path.display(),
        listen = %bind_addr,
        block_size = config.block_size,
        "starting dioprobe"
    );

    let prober = Prober::new(&config.path).with_block_size(config.block_size);
    let registry = build_registry(prober)?;

    let mut server = match Server::with_signal_handling(bind_addr, registry) {
        Ok(server) => server,
        Err(e) => {
            error!(error = %e, "http");
            return Err(e).context("Failed to start HTTP endpoint");
        }
    };

    server.run().context("HTTP endpoint failed")?;

    info!("dioprobe stopped");
    Ok(())
}

/// Registers the probe gauges and, on Linux, the standard `process_*`
/// metrics of this exporter.
fn build_registry(prober: Prober) -> Result<Registry> {
    let registry = Registry::new();
    registry
        .register(Box::new(
            ProbeCollector::new(prober).context("Failed to create probe collector")?,
        ))
        .context("Failed to register probe collector")?;

    #[cfg(target_os = "linux")]
    registry
        .register(Box::new(
            prometheus::process_collector::ProcessCollector::for_self(),
        ))
        .context("Failed to register process collector")?;

    Ok(registry)
}

#[cfg(test)]
mod tests {
    use dioprobe::METRIC_NAME;
    use dioprobe_server::http::render_metrics;

    use super::*;

    #[test]
    fn registry_exports_probe_gauges() {
        let dir = tempfile::tempdir().unwrap();
        let registry = build_registry(Prober::new(dir.path())).unwrap();

        let text = render_metrics(&registry).unwrap();

        // Values depend on O_DIRECT support of the scratch filesystem.
        assert!(text.contains(&format!("{METRIC_NAME}{{op=\"read\"}}")));
        assert!(text.contains(&format!("{METRIC_NAME}{{op=\"write\"}}")));
        assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn registry_exports_process_metrics() {
        let dir = tempfile::tempdir().unwrap();
        let registry = build_registry(Prober::new(dir.path())).unwrap();

        let text = render_metrics(&registry).unwrap();

        assert!(text.lines().any(|line| line.starts_with("process_")));
    }
}
