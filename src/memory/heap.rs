use std::fmt;
use std::sync::atomic::AtomicU8;

use eyre::Result;

use super::{Allocate, Memory};
use crate::access::{raw_access, RawRegion};

/// On-heap byte array.
///
/// The bytes are stored as `AtomicU8` so that shared handles may write through
/// `&self` without violating aliasing rules; plain accesses still compile to
/// ordinary loads and stores.
pub struct HeapMemory {
    cells: Box<[AtomicU8]>,
}

impl HeapMemory {
    pub fn zeroed(len: usize) -> Self {
        Self::from_vec(vec![0; len])
    }

    /// Takes ownership of `bytes` without copying.
    pub fn from_vec(bytes: Vec<u8>) -> Self {
        let raw = Box::into_raw(bytes.into_boxed_slice()) as *mut [AtomicU8];
        // SAFETY: AtomicU8 has the same size, alignment and bit validity as u8,
        // and the box came from the global allocator with that same layout.
        let cells = unsafe { Box::from_raw(raw) };
        Self { cells }
    }
}

// SAFETY: the boxed slice never moves or changes length while the handle lives.
unsafe impl RawRegion for HeapMemory {
    #[inline]
    fn region_ptr(&self) -> *mut u8 {
        self.cells.as_ptr().cast::<u8>().cast_mut()
    }

    #[inline]
    fn region_len(&self) -> usize {
        self.cells.len()
    }

    #[inline]
    fn supports_atomics(&self) -> bool {
        false
    }
}

raw_access!(HeapMemory);

impl Memory for HeapMemory {
    const KIND: &'static str = "heap";

    fn len(&self) -> usize {
        self.cells.len()
    }

    fn address(&self) -> usize {
        self.region_ptr() as usize
    }
}

impl Allocate for HeapMemory {
    fn allocate_zeroed(len: usize) -> Result<Self> {
        Ok(Self::zeroed(len))
    }
}

impl fmt::Debug for HeapMemory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HeapMemory")
            .field("len", &self.cells.len())
            .finish()
    }
}
