//! Single-block direct transfers.
//!
//! Both helpers check the buffer against [`BLOCK_ALIGNMENT`] before touching
//! the file. An unaligned buffer under `O_DIRECT` fails with `EINVAL` on some
//! filesystems and silently falls back to buffered I/O on others, so the
//! check turns both into the same explicit error.

use std::path::Path;

use tracing::trace;

use crate::IoError;
use crate::aligned::{AlignedBuffer, BLOCK_ALIGNMENT, alignment_of};
use crate::backend::{IoBackend, OpenFlags};

/// Creates or truncates `path` and writes `block` to it in a single direct write.
///
/// The file is closed on every return path; an early `?` drops the handle.
pub fn write_direct<B: IoBackend + ?Sized>(
    backend: &B,
    path: &Path,
    block: &AlignedBuffer,
) -> Result<(), IoError> {
    check_alignment(block.as_slice())?;

    let mut handle = backend.open(path, OpenFlags::create_direct())?;
    let written = backend.write(&mut handle, block.as_slice())?;
    if written != block.len() {
        return Err(IoError::ShortWrite {
            written,
            expected: block.len(),
        });
    }
    backend.close(handle)?;

    trace!(path = %path.display(), bytes = written, "direct write complete");
    Ok(())
}

/// Reads the first `size` bytes of `path` into a fresh aligned block.
pub fn read_direct<B: IoBackend + ?Sized>(
    backend: &B,
    path: &Path,
    size: usize,
) -> Result<AlignedBuffer, IoError> {
    let mut block = AlignedBuffer::zeroed(size)?;
    check_alignment(block.as_slice())?;

    let handle = backend.open(path, OpenFlags::read_direct())?;
    let read = backend.read_at(&handle, 0, block.as_mut_slice())?;
    if read != size {
        return Err(IoError::ShortRead {
            read,
            expected: size,
        });
    }
    backend.close(handle)?;

    trace!(path = %path.display(), bytes = read, "direct read complete");
    Ok(block)
}

fn check_alignment(buf: &[u8]) -> Result<(), IoError> {
    let actual = alignment_of(buf);
    if actual < BLOCK_ALIGNMENT {
        return Err(IoError::Alignment {
            required: BLOCK_ALIGNMENT,
            actual,
        });
    }
    debug_assert!(buf.len() % BLOCK_ALIGNMENT == 0);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aligned_block_passes_check() {
        let block = AlignedBuffer::zeroed(BLOCK_ALIGNMENT).unwrap();
        assert!(check_alignment(block.as_slice()).is_ok());
    }

    #[test]
    fn offset_slice_fails_check() {
        let block = AlignedBuffer::zeroed(2 * BLOCK_ALIGNMENT).unwrap();
        let shifted = &block.as_slice()[8..8 + BLOCK_ALIGNMENT];
        assert!(matches!(
            check_alignment(shifted),
            Err(IoError::Alignment {
                required: BLOCK_ALIGNMENT,
                actual: 8,
            })
        ));
    }
}
