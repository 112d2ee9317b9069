//! Round-trip measurement.
//!
//! A measurement moves through these phases:
//!
//! ```text
//! Idle → Writing → Written → Reading → Verifying → Cleanup → Idle
//! ```
//!
//! Any failure jumps straight to Cleanup: the [`TempFile`] guard owns the
//! file from before the first write until `measure` returns or unwinds.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use dioprobe_io::{
    AlignedBuffer, DEFAULT_BLOCK_SIZE, IoBackend, SyncBackend, read_direct, write_direct,
};
use tracing::{debug, debug_span, warn};

use crate::entropy::{Entropy, OsEntropy};
use crate::error::{ProbeError, ProbeResult};

/// Durations of one write/read round trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Sample {
    /// Time spent in the direct read.
    pub read: Duration,
    /// Time spent in the direct write.
    pub write: Duration,
}

impl Sample {
    /// Reported in place of a failed measurement.
    pub const ZERO: Self = Self {
        read: Duration::ZERO,
        write: Duration::ZERO,
    };
}

/// A probe file that is removed when the guard goes out of scope.
#[derive(Debug)]
pub struct TempFile {
    path: PathBuf,
}

impl TempFile {
    /// Takes ownership of `path`. The file need not exist yet.
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Returns the guarded path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempFile {
    fn drop(&mut self) {
        match fs::remove_file(&self.path) {
            Ok(()) => {}
            // Nothing was created (open failed before the write).
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path.display(), error = %e, "failed to remove probe file"),
        }
    }
}

/// Measures direct write and read latency in one target directory.
///
/// Configuration is fixed at construction. The backend and entropy source
/// are injectable so tests can force short transfers, corruption or
/// deterministic content.
#[derive(Debug)]
pub struct Prober<B = SyncBackend, E = OsEntropy> {
    dir: PathBuf,
    block_size: usize,
    backend: B,
    entropy: E,
}

impl Prober {
    /// Creates a prober for `dir` using O_DIRECT and OS randomness.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self::with_parts(dir, SyncBackend::new(), OsEntropy)
    }
}

impl<B: IoBackend, E: Entropy> Prober<B, E> {
    /// Creates a prober with an explicit backend and entropy source.
    pub fn with_parts(dir: impl Into<PathBuf>, backend: B, entropy: E) -> Self {
        Self {
            dir: dir.into(),
            block_size: DEFAULT_BLOCK_SIZE,
            backend,
            entropy,
        }
    }

    /// Sets the number of bytes moved per round trip.
    ///
    /// Must be a multiple of the Direct I/O alignment; other sizes fail each
    /// measurement with an allocation error.
    pub fn with_block_size(mut self, block_size: usize) -> Self {
        self.block_size = block_size;
        self
    }

    /// Returns the probe target directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the number of bytes moved per round trip.
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Returns the entropy source.
    pub fn entropy(&self) -> &E {
        &self.entropy
    }

    /// Performs one write/read round trip and returns its durations.
    ///
    /// The probe file is unique to this call and is removed before the
    /// call returns, whatever the outcome. No partial sample is returned
    /// on failure.
    pub fn measure(&self) -> ProbeResult<Sample> {
        let file = TempFile::new(
            self.dir
                .join(format!("file{}.dat", self.entropy.file_suffix())),
        );
        let span = debug_span!("measure", path = %file.path().display());
        let _enter = span.enter();

        let mut block = AlignedBuffer::zeroed(self.block_size)?;
        self.entropy.fill(block.as_mut_slice())?;

        debug!("writing");
        let t0 = Instant::now();
        write_direct(&self.backend, file.path(), &block)?;
        let t1 = Instant::now();

        debug!("reading");
        let readback = read_direct(&self.backend, file.path(), self.block_size)?;
        let t2 = Instant::now();

        debug!("verifying");
        if let Some(offset) = first_mismatch(block.as_slice(), readback.as_slice()) {
            return Err(ProbeError::DataIntegrity {
                offset,
                len: block.len(),
            });
        }

        let sample = Sample {
            read: t2.duration_since(t1),
            write: t1.duration_since(t0),
        };
        debug!(read = ?sample.read, write = ?sample.write, "round trip complete");
        Ok(sample)
    }
}

/// Returns the index of the first differing byte, or the shorter length if
/// one slice is a prefix of the other.
fn first_mismatch(expected: &[u8], actual: &[u8]) -> Option<usize> {
    if let Some(i) = expected.iter().zip(actual).position(|(a, b)| a != b) {
        return Some(i);
    }
    (expected.len() != actual.len()).then(|| expected.len().min(actual.len()))
}
