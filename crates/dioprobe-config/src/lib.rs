//! Configuration management for dioprobe
//!
//! Provides hierarchical configuration loading from multiple sources:
//! 1. CLI arguments (highest precedence)
//! 2. Environment variables (DIOPROBE_* prefix)
//! 3. A TOML file passed with `--config`
//! 4. Built-in defaults (lowest precedence)
//!
//! The resulting [`ProbeConfig`] is read once at startup and never changes.

use std::net::{IpAddr, Ipv4Addr, SocketAddr, ToSocketAddrs};
use std::path::PathBuf;

use dioprobe_io::{BLOCK_ALIGNMENT, DEFAULT_BLOCK_SIZE};
use serde::{Deserialize, Serialize};

mod error;
mod loader;

pub use error::ConfigError;
pub use loader::{ConfigLoader, Overrides};

/// Directory probed when nothing else is configured.
pub const DEFAULT_PATH: &str = "/var/run";

/// Listen address used when nothing else is configured.
pub const DEFAULT_LISTEN: &str = ":9172";

/// Main dioprobe configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Directory the probe file is created in.
    pub path: PathBuf,
    /// Bind address of the HTTP endpoint.
    pub listen: String,
    /// Bytes written and read per probe.
    pub block_size: usize,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_PATH),
            listen: DEFAULT_LISTEN.to_string(),
            block_size: DEFAULT_BLOCK_SIZE,
        }
    }
}

impl ProbeConfig {
    /// Checks every field, returning the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.path.as_os_str().is_empty() {
            return Err(ConfigError::ValidationError(
                "probe path must not be empty".to_string(),
            ));
        }
        if self.block_size == 0 || self.block_size % BLOCK_ALIGNMENT != 0 {
            return Err(ConfigError::ValidationError(format!(
                "block_size {} is not a positive multiple of {BLOCK_ALIGNMENT}",
                self.block_size
            )));
        }
        self.listen_addr()?;
        Ok(())
    }

    /// Resolves `listen` to a socket address.
    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        parse_listen_addr(&self.listen)
    }
}

/// Parses a listen address.
///
/// Accepts:
/// - Port only with a leading colon: ":9172" -> "0.0.0.0:9172"
/// - Port only: "9172" -> "0.0.0.0:9172"
/// - Full address: "127.0.0.1:9172" or `[::1]:9172`
/// - Host name: "localhost:9172" (first resolved address)
pub fn parse_listen_addr(address: &str) -> Result<SocketAddr, ConfigError> {
    let invalid = |reason: &str| ConfigError::ListenAddress {
        address: address.to_string(),
        reason: reason.to_string(),
    };
    let any = IpAddr::V4(Ipv4Addr::UNSPECIFIED);

    let trimmed = address.trim();
    if trimmed.is_empty() {
        return Err(invalid("address is empty"));
    }

    if let Some(port) = trimmed.strip_prefix(':') {
        return port
            .parse::<u16>()
            .map(|port| SocketAddr::new(any, port))
            .map_err(|_| invalid("expected a port after ':'"));
    }

    if let Ok(port) = trimmed.parse::<u16>() {
        return Ok(SocketAddr::new(any, port));
    }

    if let Ok(addr) = trimmed.parse::<SocketAddr>() {
        return Ok(addr);
    }

    trimmed
        .to_socket_addrs()
        .map_err(|e| invalid(&e.to_string()))?
        .next()
        .ok_or_else(|| invalid("host name did not resolve"))
}
