//! Prometheus collector that runs one probe per scrape.

use std::collections::HashMap;

use dioprobe_io::IoBackend;
use prometheus::core::{Collector, Desc};
use prometheus::proto::MetricFamily;
use prometheus::{GaugeVec, Opts};
use tracing::error;

use crate::entropy::Entropy;
use crate::probe::{Prober, Sample};

/// Fully qualified name of the duration gauge.
pub const METRIC_NAME: &str = "dioprobe_block_duration_seconds";

/// Help text of the duration gauge.
pub const METRIC_HELP: &str = "Duration of the last direct I/O block operation in seconds.";

/// Label distinguishing the read and write samples.
pub const OP_LABEL: &str = "op";

/// Republishes each [`Prober::measure`] result as two gauges.
///
/// A failed probe is logged and reported as zero durations. The scrape
/// itself always succeeds, so a broken disk never looks like a down
/// exporter.
pub struct ProbeCollector<B, E> {
    prober: Prober<B, E>,
    desc: Desc,
}

impl<B: IoBackend, E: Entropy> ProbeCollector<B, E> {
    /// Wraps a prober. Fails only if the metric descriptor is invalid.
    pub fn new(prober: Prober<B, E>) -> prometheus::Result<Self> {
        let desc = Desc::new(
            METRIC_NAME.to_string(),
            METRIC_HELP.to_string(),
            vec![OP_LABEL.to_string()],
            HashMap::new(),
        )?;
        Ok(Self { prober, desc })
    }

    /// Runs one measurement, substituting zeros on failure.
    pub fn sample(&self) -> Sample {
        match self.prober.measure() {
            Ok(sample) => sample,
            Err(e) => {
                error!(error = %e, dir = %self.prober.dir().display(), "measure");
                Sample::ZERO
            }
        }
    }
}

impl<B: IoBackend, E: Entropy> Collector for ProbeCollector<B, E> {
    fn desc(&self) -> Vec<&Desc> {
        vec![&self.desc]
    }

    fn collect(&self) -> Vec<MetricFamily> {
        let sample = self.sample();

        // Fresh per scrape: nothing carries over between pulls.
        let gauges = match GaugeVec::new(Opts::new(METRIC_NAME, METRIC_HELP), &[OP_LABEL]) {
            Ok(gauges) => gauges,
            Err(e) => {
                error!(error = %e, "failed to build duration gauges");
                return Vec::new();
            }
        };
        gauges
            .with_label_values(&["read"])
            .set(sample.read.as_secs_f64());
        gauges
            .with_label_values(&["write"])
            .set(sample.write.as_secs_f64());

        gauges.collect()
    }
}
