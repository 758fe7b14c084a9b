//! # Memory-Mapped Files
//!
//! A [`MappedFile`] maps a single file lazily in fixed-size chunks and hands
//! out reference-counted [`MappedStore`]s over them. A [`MappedBytes`]
//! cursor walks the whole file, swapping chunks as its offset moves.
//!
//! ```text
//! MappedFile ──acquire_store(pos)──> MappedStore (one chunk + overlap)
//!     │                                   ^
//!     └──bytes()──> MappedBytes ──────────┘ swaps on chunk miss
//! ```
//!
//! Sharing a chunk between processes relies on the OS keeping shared
//! mappings of the same file coherent; nothing here re-checks it.

mod builder;
mod bytes;
mod file;
mod memory;

pub use builder::MappedFileBuilder;
pub use bytes::{Mapped, MappedBytes, MappedBytesCache};
pub use file::{MappedFile, MappedStore};
pub use memory::MappedMemory;
