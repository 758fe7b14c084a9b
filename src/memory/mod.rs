//! # Memory Handles
//!
//! The concrete handle types behind a [`crate::store::BytesStore`]:
//!
//! ```text
//! +----------------+-----------------------+---------+-----------+
//! | Handle         | Owner                 | Atomics | Allocate  |
//! +----------------+-----------------------+---------+-----------+
//! | HeapMemory     | Rust heap, Box<[u8]>  | no      | yes       |
//! | NativeMemory   | std::alloc, 8-aligned | yes     | yes       |
//! | ExternalMemory | caller                | yes     | no        |
//! | MappedMemory   | a mapped file chunk   | yes     | no        |
//! +----------------+-----------------------+---------+-----------+
//! ```
//!
//! `MappedMemory` lives in [`crate::mapped`] next to the file that creates it.
//!
//! ## Heap Arrays
//!
//! A heap array is an arbitrary `Vec<u8>` and carries no alignment guarantee,
//! so volatile, ordered and compare-and-swap operations report `Unsupported`
//! instead of pretending to be atomic. Every other handle checks alignment
//! per call.
//!
//! ## Lifetime
//!
//! A handle frees (or unmaps) its memory in `Drop`. Stores keep the handle
//! behind an `Arc`, so the physical free happens only once every store view
//! and cursor that points at it has gone away, regardless of when the
//! logical reference count reached zero.

mod heap;
mod native;

pub use heap::HeapMemory;
pub use native::{ExternalMemory, NativeMemory};

use eyre::Result;

use crate::access::Access;

/// A handle type a [`crate::store::BytesStore`] can be built over.
pub trait Memory: Access + Send + Sync + 'static {
    /// Short name used in diagnostics and error messages.
    const KIND: &'static str;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Base address, for diagnostics only.
    fn address(&self) -> usize;
}

/// Handles that can be created from nothing, which is what an elastic cursor
/// needs to grow.
pub trait Allocate: Memory + Sized {
    fn allocate_zeroed(len: usize) -> Result<Self>;
}
