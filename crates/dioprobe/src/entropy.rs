//! Randomness for block content and temp file names.

use std::sync::{Mutex, PoisonError};

use rand::rngs::{OsRng, StdRng};
use rand::{Rng, RngCore, SeedableRng};

/// Source of the random bytes written by each probe.
///
/// Shared by `&self` across scrapes, so implementations handle their own
/// synchronization.
pub trait Entropy: Send + Sync {
    /// Fills `buf` with random content.
    fn fill(&self, buf: &mut [u8]) -> Result<(), rand::Error>;

    /// Returns a suffix for the next temp file name.
    fn file_suffix(&self) -> u64;
}

/// Production source: block content from the OS CSPRNG.
///
/// Cryptographic randomness keeps the device or filesystem from
/// deduplicating or compressing the block.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsEntropy;

impl Entropy for OsEntropy {
    fn fill(&self, buf: &mut [u8]) -> Result<(), rand::Error> {
        OsRng.try_fill_bytes(buf)
    }

    fn file_suffix(&self) -> u64 {
        rand::thread_rng().r#gen()
    }
}

/// Deterministic source for reproducible runs.
#[derive(Debug)]
pub struct SeededEntropy {
    rng: Mutex<StdRng>,
}

impl SeededEntropy {
    /// Creates a source that replays the same sequence for the same seed.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl Entropy for SeededEntropy {
    fn fill(&self, buf: &mut [u8]) -> Result<(), rand::Error> {
        self.rng
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .try_fill_bytes(buf)
    }

    fn file_suffix(&self) -> u64 {
        self.rng
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .next_u64()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_sources_agree() {
        let a = SeededEntropy::new(7);
        let b = SeededEntropy::new(7);

        let (mut x, mut y) = ([0u8; 64], [0u8; 64]);
        a.fill(&mut x).unwrap();
        b.fill(&mut y).unwrap();

        assert_eq!(x, y);
        assert_eq!(a.file_suffix(), b.file_suffix());
    }

    #[test]
    fn seeded_source_advances() {
        let source = SeededEntropy::new(1);
        assert_ne!(source.file_suffix(), source.file_suffix());
    }

    #[test]
    fn os_entropy_fills_block() {
        let mut buf = [0u8; 4096];
        OsEntropy.fill(&mut buf).unwrap();
        // 4096 zero bytes from a CSPRNG would be a broken source.
        assert!(buf.iter().any(|&b| b != 0));
    }
}
