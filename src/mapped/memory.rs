use std::fmt;

use memmap2::MmapRaw;

use crate::access::{raw_access, RawRegion};
use crate::memory::Memory;

/// One mapped chunk: `chunk_size + overlap_size` bytes of the file starting
/// at `chunk * chunk_size`. Unmapped when the last store over it is dropped.
pub struct MappedMemory {
    map: MmapRaw,
    chunk: usize,
}

impl MappedMemory {
    pub(crate) fn new(map: MmapRaw, chunk: usize) -> Self {
        Self { map, chunk }
    }

    pub fn chunk(&self) -> usize {
        self.chunk
    }
}

// SAFETY: the mapping stays valid and fixed in the address space until the
// MmapRaw is dropped, which only happens with this handle. The file is never
// shrunk while mapped.
unsafe impl RawRegion for MappedMemory {
    #[inline]
    fn region_ptr(&self) -> *mut u8 {
        self.map.as_mut_ptr()
    }

    #[inline]
    fn region_len(&self) -> usize {
        self.map.len()
    }

    #[inline]
    fn supports_atomics(&self) -> bool {
        true
    }
}

raw_access!(MappedMemory);

impl Memory for MappedMemory {
    const KIND: &'static str = "mapped";

    fn len(&self) -> usize {
        self.map.len()
    }

    fn address(&self) -> usize {
        self.map.as_ptr() as usize
    }
}

impl fmt::Debug for MappedMemory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MappedMemory")
            .field("chunk", &self.chunk)
            .field("address", &format_args!("{:#x}", self.address()))
            .field("len", &self.map.len())
            .finish()
    }
}
