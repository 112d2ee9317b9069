//! # dioprobe-io: Aligned Block I/O for dioprobe
//!
//! This crate owns everything that touches the probe file itself:
//!
//! - **`AlignedBuffer`**: a fixed-size block whose start address satisfies
//!   the Direct I/O alignment requirement
//! - **`IoBackend`**: a trait over the open/write/read/close calls, so the
//!   probe can be driven against fault-injecting backends in tests
//! - **`write_direct` / `read_direct`**: one-block transfers that validate
//!   alignment up front and report partial transfers as errors
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────┐
//! │         dioprobe         │
//! │   (Prober, collector)    │
//! └────────────┬─────────────┘
//!              │ write_direct / read_direct
//! ┌────────────┴─────────────┐
//! │        dioprobe-io       │
//! │  ┌─────────┐  ┌────────┐ │
//! │  │ Aligned │  │  Sync  │ │
//! │  │ Buffer  │  │ Backend│ │
//! │  └─────────┘  └────────┘ │
//! └──────────────────────────┘
//! ```
//!
//! # Features
//!
//! - `direct_io` (default): open files with `O_DIRECT` on Linux (requires `libc`)

mod aligned;
mod backend;
mod block;
mod error;
mod sync_backend;

pub use aligned::{AlignedBuffer, BLOCK_ALIGNMENT, DEFAULT_BLOCK_SIZE, alignment_of};
pub use backend::{FileHandle, IoBackend, OpenFlags};
pub use block::{read_direct, write_direct};
pub use error::IoError;
pub use sync_backend::SyncBackend;
