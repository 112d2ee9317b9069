//! I/O backend trait.
//!
//! The [`IoBackend`] trait abstracts the four file calls a probe makes:
//! open, write, positional read and close. [`SyncBackend`](crate::SyncBackend)
//! maps them onto `std::fs` (with `O_DIRECT` on Linux); tests wrap it to
//! inject short transfers, corruption or buffered mode.

use std::path::Path;

use crate::IoError;

/// Flags for opening files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OpenFlags {
    /// Open for reading.
    pub read: bool,
    /// Open for writing.
    pub write: bool,
    /// Create the file if it doesn't exist.
    pub create: bool,
    /// Truncate an existing file to zero length.
    pub truncate: bool,
    /// Use Direct I/O (O_DIRECT on Linux, ignored elsewhere).
    pub direct: bool,
}

impl OpenFlags {
    /// Flags for reading an existing file through the page cache.
    pub fn read_only() -> Self {
        Self {
            read: true,
            ..Self::default()
        }
    }

    /// Flags for reading an existing file with Direct I/O.
    pub fn read_direct() -> Self {
        Self {
            read: true,
            direct: true,
            ..Self::default()
        }
    }

    /// Flags for creating or truncating a file with Direct I/O.
    pub fn create_direct() -> Self {
        Self {
            read: true,
            write: true,
            create: true,
            truncate: true,
            direct: true,
        }
    }

    /// Returns the same flags with Direct I/O switched off.
    pub fn buffered(self) -> Self {
        Self {
            direct: false,
            ..self
        }
    }
}

/// Opaque handle to an open file.
///
/// Dropping the handle closes the file, so every early return closes it
/// too. [`IoBackend::close`] is the explicit close on the success path.
#[derive(Debug)]
pub struct FileHandle {
    /// Internal identifier, unique per backend.
    pub(crate) id: u64,
    /// The open file.
    pub(crate) file: Option<std::fs::File>,
}

impl FileHandle {
    /// Creates a new file handle wrapping a `std::fs::File`.
    pub(crate) fn from_file(id: u64, file: std::fs::File) -> Self {
        Self {
            id,
            file: Some(file),
        }
    }

    /// Returns the backend-assigned identifier.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Returns the internal file reference.
    pub(crate) fn file(&self) -> Result<&std::fs::File, IoError> {
        self.file
            .as_ref()
            .ok_or(IoError::InvalidHandle { handle: self.id })
    }

    /// Returns the internal file reference mutably.
    pub(crate) fn file_mut(&mut self) -> Result<&mut std::fs::File, IoError> {
        self.file
            .as_mut()
            .ok_or(IoError::InvalidHandle { handle: self.id })
    }
}

/// Abstraction over the file calls made by one probe round trip.
///
/// All methods are synchronous and block the calling thread.
pub trait IoBackend: Send + Sync {
    /// Opens a file with the given flags.
    fn open(&self, path: &Path, flags: OpenFlags) -> Result<FileHandle, IoError>;

    /// Issues a single write at the current position.
    ///
    /// Returns the number of bytes written, which may be less than `buf.len()`.
    fn write(&self, handle: &mut FileHandle, buf: &[u8]) -> Result<usize, IoError>;

    /// Issues a single read at the given byte offset.
    ///
    /// Returns the number of bytes read, which may be less than `buf.len()`.
    fn read_at(&self, handle: &FileHandle, offset: u64, buf: &mut [u8]) -> Result<usize, IoError>;

    /// Closes a file handle.
    fn close(&self, handle: FileHandle) -> Result<(), IoError>;
}

impl<B: IoBackend + ?Sized> IoBackend for std::sync::Arc<B> {
    fn open(&self, path: &Path, flags: OpenFlags) -> Result<FileHandle, IoError> {
        (**self).open(path, flags)
    }

    fn write(&self, handle: &mut FileHandle, buf: &[u8]) -> Result<usize, IoError> {
        (**self).write(handle, buf)
    }

    fn read_at(&self, handle: &FileHandle, offset: u64, buf: &mut [u8]) -> Result<usize, IoError> {
        (**self).read_at(handle, offset, buf)
    }

    fn close(&self, handle: FileHandle) -> Result<(), IoError> {
        (**self).close(handle)
    }
}
