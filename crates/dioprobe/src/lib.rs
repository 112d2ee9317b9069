//! # dioprobe: Direct I/O latency probe
//!
//! Each Prometheus scrape drives one round trip against the probe target:
//! a random block is written to a fresh file with Direct I/O, read back,
//! compared byte-for-byte, and the file is removed. The write and read
//! durations are published as `dioprobe_block_duration_seconds{op=...}`.
//!
//! ```text
//!   scrape ──► ProbeCollector::collect
//!                  │
//!                  ▼
//!              Prober::measure ──► write_direct ──► read_direct ──► verify
//!                  │                                                 │
//!                  └──────────────── TempFile dropped ◄──────────────┘
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! use dioprobe::{ProbeCollector, Prober};
//! use prometheus::Registry;
//!
//! let prober = Prober::new("/var/run");
//! let registry = Registry::new();
//! registry.register(Box::new(ProbeCollector::new(prober)?))?;
//! ```

mod collector;
mod entropy;
mod error;
mod probe;

pub use collector::{METRIC_HELP, METRIC_NAME, OP_LABEL, ProbeCollector};
pub use entropy::{Entropy, OsEntropy, SeededEntropy};
pub use error::{ProbeError, ProbeResult};
pub use probe::{Prober, Sample, TempFile};
