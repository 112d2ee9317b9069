//! Synchronous I/O backend using `std::fs`.
//!
//! When the `direct_io` feature is enabled on Linux, files opened with
//! `OpenFlags::direct = true` use `O_DIRECT` to bypass the page cache.
//! Elsewhere, or on a backend built with [`SyncBackend::buffered`], the flag
//! is ignored and the probe measures page-cache I/O.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::trace;

use crate::IoError;
use crate::backend::{FileHandle, IoBackend, OpenFlags};

/// Synchronous I/O backend using `std::fs::File`.
#[derive(Debug)]
pub struct SyncBackend {
    /// Counter for generating unique file handle IDs.
    next_handle_id: AtomicU64,
    /// Whether `OpenFlags::direct` is passed through to the OS.
    direct: bool,
}

impl SyncBackend {
    /// Creates a new synchronous I/O backend.
    pub fn new() -> Self {
        Self {
            next_handle_id: AtomicU64::new(1),
            direct: true,
        }
    }

    /// Creates a backend that always goes through the page cache.
    ///
    /// For filesystems that reject `O_DIRECT` (tmpfs on older kernels).
    pub fn buffered() -> Self {
        Self {
            next_handle_id: AtomicU64::new(1),
            direct: false,
        }
    }

    /// Returns true if `OpenFlags::direct` reaches the OS on this backend.
    pub fn is_direct(&self) -> bool {
        self.direct && cfg!(all(target_os = "linux", feature = "direct_io"))
    }

    /// Returns the next unique handle ID.
    fn next_id(&self) -> u64 {
        self.next_handle_id.fetch_add(1, Ordering::Relaxed)
    }
}

impl Default for SyncBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl IoBackend for SyncBackend {
    fn open(&self, path: &Path, flags: OpenFlags) -> Result<FileHandle, IoError> {
        let mut opts = OpenOptions::new();

        if flags.read {
            opts.read(true);
        }
        if flags.write {
            opts.write(true);
        }
        if flags.create {
            opts.create(true);
        }
        if flags.truncate {
            opts.truncate(true);
        }

        // Direct I/O on Linux
        #[cfg(all(target_os = "linux", feature = "direct_io"))]
        if flags.direct && self.direct {
            use std::os::unix::fs::OpenOptionsExt;
            opts.custom_flags(libc::O_DIRECT);
        }

        let file = opts.open(path)?;
        let id = self.next_id();
        trace!(
            handle = id,
            path = %path.display(),
            direct = flags.direct && self.is_direct(),
            "opened"
        );
        Ok(FileHandle::from_file(id, file))
    }

    fn write(&self, handle: &mut FileHandle, buf: &[u8]) -> Result<usize, IoError> {
        let file = handle.file_mut()?;
        let n = file.write(buf)?;
        Ok(n)
    }

    fn read_at(&self, handle: &FileHandle, offset: u64, buf: &mut [u8]) -> Result<usize, IoError> {
        // Use pread on Unix for positional read without seeking (safe wrapper)
        #[cfg(unix)]
        {
            use std::os::unix::fs::FileExt;
            let file = handle.file()?;
            let n = file.read_at(buf, offset)?;
            Ok(n)
        }

        #[cfg(not(unix))]
        {
            use std::os::windows::fs::FileExt;
            let file = handle.file()?;
            let n = file.seek_read(buf, offset)?;
            Ok(n)
        }
    }

    fn close(&self, mut handle: FileHandle) -> Result<(), IoError> {
        // Drop the file to close it
        handle.file = None;
        trace!(handle = handle.id, "closed");
        Ok(())
    }
}
