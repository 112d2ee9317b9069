//! Probe error types.

use dioprobe_io::IoError;
use thiserror::Error;

/// Result type for probe operations.
pub type ProbeResult<T> = Result<T, ProbeError>;

/// Errors that abort a single measurement.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// Allocation, alignment, short transfer or OS error from the block helpers.
    #[error(transparent)]
    Io(#[from] IoError),

    /// The block read back differs from the block written.
    #[error("data mismatch at byte {offset} of {len}")]
    DataIntegrity { offset: usize, len: usize },

    /// The randomness source could not fill the write block.
    #[error("entropy source failed: {0}")]
    Entropy(#[from] rand::Error),
}
