//! # TurBytes - Zero-Copy Byte Storage
//!
//! TurBytes provides bounds-checked, zero-copy read/write access to memory
//! that lives on the Rust heap, off-heap in native allocations, or in a
//! memory-mapped file, behind one cursor-based streaming contract:
//!
//! - **One access layer**: identical algorithms over heap arrays, native
//!   addresses and mapped chunks, monomorphized per handle type
//! - **Explicit lifetimes**: every store and mapped file is reference counted;
//!   use after release is an error, never undefined behaviour
//! - **Chunked mapping**: files are mapped lazily in fixed-size chunks and
//!   grown under an advisory lock
//!
//! ## Quick Start
//!
//! ```ignore
//! use turbytes::bytes::{ElasticHeapBytes, StreamingInput, StreamingOutput};
//!
//! let mut bytes = ElasticHeapBytes::elastic_heap(16)?;
//! bytes.write_stop_bit(1_000)?;
//! bytes.write_utf8(Some("hello"))?;
//! bytes.append_f64(0.1)?;
//! bytes.write_u8(b' ')?;
//!
//! bytes.flip();
//! assert_eq!(bytes.read_stop_bit()?, 1_000);
//! assert_eq!(bytes.read_utf8()?.as_deref(), Some("hello"));
//! assert_eq!(bytes.parse_f64()?, 0.1);
//! ```
//!
//! Mapped files work the same way:
//!
//! ```ignore
//! use turbytes::mapped::MappedFile;
//!
//! let file = MappedFile::open("./journal.dat", 1 << 20)?;
//! let mut bytes = file.bytes()?;
//! bytes.write_i64(42)?;
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │   Bytes<B> cursor + codecs          │  position / limit, stop-bit, text,
//! │   (StreamingInput/StreamingOutput)  │  decimal, integer, stop chars
//! ├─────────────────────────────────────┤
//! │   Backing: Fixed | Elastic | Mapped │  growth and chunk swapping
//! ├─────────────────────────────────────┤
//! │   BytesStore<M>                     │  bounds checks, reservations
//! ├─────────────────────────────────────┤
//! │   ReadAccess / WriteAccess          │  unsafe primitives + derived ops
//! ├──────────┬──────────┬───────────────┤
//! │   Heap   │  Native  │ External │ Mapped chunk (MappedFile)
//! └──────────┴──────────┴───────────────┘
//! ```
//!
//! ## Module Overview
//!
//! - [`refcount`]: reference counter with exactly-once teardown
//! - [`access`]: capability traits and derived bulk operations
//! - [`memory`]: heap, native and external handles
//! - [`store`]: fixed-extent, bounds-checked `BytesStore`
//! - [`mapped`]: chunked memory-mapped files and mapped cursors
//! - [`bytes`]: the `Bytes` cursor and the streaming contract
//! - [`encoding`]: stop-bit, text, decimal and integer codecs
//! - [`error`]: typed error taxonomy carried through `eyre`
//! - [`config`]: numeric defaults
//! - [`os`]: page size and mapping granularity
//!
//! ## Logging
//!
//! The crate emits `tracing` events (chunk mapping, file growth, store
//! teardown at `debug`; chunk swaps and elastic growth at `trace`) and never
//! installs a subscriber.

pub mod access;
pub mod bytes;
pub mod config;
pub mod encoding;
pub mod error;
pub mod mapped;
pub mod memory;
pub mod os;
pub mod refcount;
pub mod store;

pub use bytes::{Bytes, StreamingInput, StreamingOutput};
pub use error::{classify, BytesError, ErrorKind};
pub use mapped::{MappedBytes, MappedFile};
pub use refcount::{ReferenceCounted, ReferenceCounter};
pub use store::BytesStore;
