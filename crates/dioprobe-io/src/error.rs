//! I/O error types.

/// Errors from the aligned block helpers and I/O backends.
#[derive(Debug, thiserror::Error)]
pub enum IoError {
    /// Underlying OS I/O error.
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    /// An aligned block of the requested size could not be provided.
    #[error("cannot allocate a {size}-byte block aligned to {alignment} bytes")]
    Allocation { size: usize, alignment: usize },

    /// Alignment error for Direct I/O.
    #[error("buffer not aligned to {required} bytes (actual alignment: {actual})")]
    Alignment { required: usize, actual: usize },

    /// Fewer bytes reached the file than were handed to the write.
    #[error("short write: {written} of {expected} bytes")]
    ShortWrite { written: usize, expected: usize },

    /// Fewer bytes came back from the file than the block holds.
    #[error("short read: {read} of {expected} bytes")]
    ShortRead { read: usize, expected: usize },

    /// Invalid file handle.
    #[error("invalid file handle: {handle}")]
    InvalidHandle { handle: u64 },
}
