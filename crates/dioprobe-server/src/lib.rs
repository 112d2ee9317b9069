//! # dioprobe-server: HTTP endpoint for dioprobe
//!
//! A single-threaded `mio` event loop serving two routes:
//! - `GET /metrics`: Prometheus text format, one probe per request
//! - `GET /healthz`: liveness, always `200 OK`, never probes
//!
//! Sockets are driven by one loop thread. `/metrics` renders run on a
//! separate scrape worker, one at a time, so a slow or hung disk delays
//! only the scrapes queued behind it and `/healthz` keeps answering.
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │               dioprobe-server                │
//! │  ┌──────────┐   ┌─────────────┐   ┌────────┐ │
//! │  │ Listener │ → │ Connections │ → │ Router │ │
//! │  │  (TCP)   │   │ (mio poll)  │   │        │ │
//! │  └──────────┘   └─────────────┘   └───┬────┘ │
//! └───────────────────────────────────────┼──────┘
//!                                         ▼
//!                                 prometheus::Registry
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! use dioprobe_server::Server;
//! use prometheus::Registry;
//!
//! let registry = Registry::new();
//! let mut server = Server::with_signal_handling("0.0.0.0:9172".parse()?, registry)?;
//! server.run()?;
//! ```

mod connection;
mod error;
pub mod http;
mod scrape;
mod server;

pub use error::{ServerError, ServerResult};
pub use server::{Server, ShutdownHandle};
