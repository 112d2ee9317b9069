//! Aligned buffer for Direct I/O.
//!
//! With `O_DIRECT` the kernel moves data straight between the device and
//! user memory, so the buffer address and length must both be multiples of
//! the logical block size. `AlignedBuffer` over-allocates a `Vec<u8>` by one
//! alignment unit and exposes the aligned window inside it, which keeps the
//! crate free of `unsafe` allocator calls.

use crate::IoError;

/// Block alignment requirement for Direct I/O (4 KiB).
pub const BLOCK_ALIGNMENT: usize = 4096;

/// Size of the block written and read by each probe.
pub const DEFAULT_BLOCK_SIZE: usize = 4096;

/// A fixed-size buffer whose first byte sits on a [`BLOCK_ALIGNMENT`] boundary.
///
/// The length never changes after allocation. Every buffer is freshly
/// zeroed; nothing is pooled or reused.
#[derive(Debug)]
pub struct AlignedBuffer {
    storage: Vec<u8>,
    offset: usize,
    len: usize,
}

impl AlignedBuffer {
    /// Allocates a zeroed block of exactly `size` bytes.
    ///
    /// `size` must be a non-zero multiple of [`BLOCK_ALIGNMENT`]; anything
    /// else could not be transferred with Direct I/O and is rejected with
    /// [`IoError::Allocation`].
    pub fn zeroed(size: usize) -> Result<Self, IoError> {
        let allocation_error = IoError::Allocation {
            size,
            alignment: BLOCK_ALIGNMENT,
        };

        if size == 0 || size % BLOCK_ALIGNMENT != 0 {
            return Err(allocation_error);
        }
        let Some(capacity) = size.checked_add(BLOCK_ALIGNMENT) else {
            return Err(allocation_error);
        };

        let storage = vec![0u8; capacity];
        let offset = storage.as_ptr().align_offset(BLOCK_ALIGNMENT);
        // align_offset may refuse (usize::MAX); treat that like any other miss.
        match offset.checked_add(size) {
            Some(end) if end <= storage.len() => Ok(Self {
                storage,
                offset,
                len: size,
            }),
            _ => Err(allocation_error),
        }
    }

    /// Returns the block contents.
    pub fn as_slice(&self) -> &[u8] {
        &self.storage[self.offset..self.offset + self.len]
    }

    /// Returns the block contents mutably.
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.storage[self.offset..self.offset + self.len]
    }

    /// Returns the block length in bytes.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Always false: zero-sized blocks are rejected at allocation.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the largest power of two dividing the block's start address.
    pub fn alignment(&self) -> usize {
        alignment_of(self.as_slice())
    }
}

impl AsRef<[u8]> for AlignedBuffer {
    fn as_ref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl AsMut<[u8]> for AlignedBuffer {
    fn as_mut(&mut self) -> &mut [u8] {
        self.as_mut_slice()
    }
}

/// Returns the largest power of two dividing the start address of `buf`.
pub fn alignment_of(buf: &[u8]) -> usize {
    let addr = buf.as_ptr() as usize;
    if addr == 0 {
        return usize::MAX;
    }
    1 << addr.trailing_zeros()
}
