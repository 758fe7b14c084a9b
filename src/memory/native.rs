use std::alloc::{self, Layout};
use std::fmt;
use std::ptr::NonNull;

use eyre::{bail, Result, WrapErr};
use tracing::trace;

use super::{Allocate, Memory};
use crate::access::{raw_access, RawRegion};
use crate::config::NATIVE_ALIGNMENT;

/// Off-heap allocation owned by the handle.
pub struct NativeMemory {
    ptr: NonNull<u8>,
    len: usize,
}

// SAFETY: the allocation is exclusively owned by this handle and every access
// goes through raw pointers; concurrent plain writes are the caller's concern,
// exactly as for the other handle types.
unsafe impl Send for NativeMemory {}
unsafe impl Sync for NativeMemory {}

impl NativeMemory {
    pub fn allocate_zeroed(len: usize) -> Result<Self> {
        if len == 0 {
            return Ok(Self {
                ptr: NonNull::<u64>::dangling().cast(),
                len: 0,
            });
        }

        let layout = Layout::from_size_align(len, NATIVE_ALIGNMENT)
            .wrap_err_with(|| format!("invalid native allocation of {} bytes", len))?;

        // SAFETY: layout has a non-zero size.
        let ptr = unsafe { alloc::alloc_zeroed(layout) };
        let Some(ptr) = NonNull::new(ptr) else {
            bail!("failed to allocate {} bytes of native memory", len);
        };

        trace!(len, address = ptr.as_ptr() as usize, "allocated native memory");
        Ok(Self { ptr, len })
    }
}

impl Drop for NativeMemory {
    fn drop(&mut self) {
        if self.len == 0 {
            return;
        }
        // SAFETY: ptr was returned by alloc_zeroed with exactly this layout,
        // which was validated in allocate_zeroed.
        unsafe {
            let layout = Layout::from_size_align_unchecked(self.len, NATIVE_ALIGNMENT);
            alloc::dealloc(self.ptr.as_ptr(), layout);
        }
    }
}

// SAFETY: the allocation is fixed for the lifetime of the handle.
unsafe impl RawRegion for NativeMemory {
    #[inline]
    fn region_ptr(&self) -> *mut u8 {
        self.ptr.as_ptr()
    }

    #[inline]
    fn region_len(&self) -> usize {
        self.len
    }

    #[inline]
    fn supports_atomics(&self) -> bool {
        true
    }
}

raw_access!(NativeMemory);

impl Memory for NativeMemory {
    const KIND: &'static str = "native";

    fn len(&self) -> usize {
        self.len
    }

    fn address(&self) -> usize {
        self.ptr.as_ptr() as usize
    }
}

impl Allocate for NativeMemory {
    fn allocate_zeroed(len: usize) -> Result<Self> {
        NativeMemory::allocate_zeroed(len)
    }
}

impl fmt::Debug for NativeMemory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NativeMemory")
            .field("address", &format_args!("{:#x}", self.address()))
            .field("len", &self.len)
            .finish()
    }
}

/// Memory owned by someone else: a buffer handed over by FFI, a region of a
/// foreign mapping, a stack array that outlives every store built on it.
pub struct ExternalMemory {
    ptr: NonNull<u8>,
    len: usize,
}

// SAFETY: see NativeMemory; the caller vouched for the region's validity.
unsafe impl Send for ExternalMemory {}
unsafe impl Sync for ExternalMemory {}

impl ExternalMemory {
    /// # Safety
    ///
    /// `ptr` must be valid for reads and writes of `len` bytes until the last
    /// store built over this handle is dropped, and nothing else may free it
    /// in the meantime.
    pub unsafe fn from_raw_parts(ptr: *mut u8, len: usize) -> Result<Self> {
        let Some(ptr) = NonNull::new(ptr) else {
            bail!("external memory must not be a null pointer");
        };
        Ok(Self { ptr, len })
    }
}

// SAFETY: guaranteed by the contract of from_raw_parts.
unsafe impl RawRegion for ExternalMemory {
    #[inline]
    fn region_ptr(&self) -> *mut u8 {
        self.ptr.as_ptr()
    }

    #[inline]
    fn region_len(&self) -> usize {
        self.len
    }

    #[inline]
    fn supports_atomics(&self) -> bool {
        true
    }
}

raw_access!(ExternalMemory);

impl Memory for ExternalMemory {
    const KIND: &'static str = "external";

    fn len(&self) -> usize {
        self.len
    }

    fn address(&self) -> usize {
        self.ptr.as_ptr() as usize
    }
}

impl fmt::Debug for ExternalMemory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExternalMemory")
            .field("address", &format_args!("{:#x}", self.address()))
            .field("len", &self.len)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::{ReadAccess, WriteAccess};
    use crate::error::{classify, ErrorKind};

    #[test]
    fn native_memory_is_zeroed_and_aligned() {
        let memory = NativeMemory::allocate_zeroed(64).unwrap();

        assert_eq!(memory.address() % NATIVE_ALIGNMENT, 0);
        for offset in (0..64).step_by(8) {
            assert_eq!(unsafe { memory.read_i64(offset) }, 0);
        }
    }

    #[test]
    fn zero_length_allocation() {
        let memory = NativeMemory::allocate_zeroed(0).unwrap();
        assert!(memory.is_empty());
    }

    #[test]
    fn aligned_compare_and_swap() {
        let memory = NativeMemory::allocate_zeroed(16).unwrap();

        unsafe {
            assert!(memory.compare_and_swap_i64(8, 0, 42).unwrap());
            assert!(!memory.compare_and_swap_i64(8, 0, 43).unwrap());
            assert_eq!(memory.read_volatile_i64(8).unwrap(), 42);

            memory.write_ordered_i32(4, 7).unwrap();
            assert_eq!(memory.read_i32(4), 7);
        }
    }

    #[test]
    fn misaligned_compare_and_swap_is_unsupported() {
        let memory = NativeMemory::allocate_zeroed(16).unwrap();

        let err = unsafe { memory.compare_and_swap_i32(1, 0, 1) }.unwrap_err();
        assert_eq!(classify(&err), ErrorKind::Unsupported);
    }

    #[test]
    fn external_memory_writes_through() {
        let mut backing = [0u8; 8];
        let memory = unsafe { ExternalMemory::from_raw_parts(backing.as_mut_ptr(), 8) }.unwrap();

        unsafe { memory.write_i16(2, 0x0102) };
        drop(memory);

        assert_eq!(
            i16::from_ne_bytes([backing[2], backing[3]]),
            0x0102
        );
    }

    #[test]
    fn external_memory_rejects_null() {
        assert!(unsafe { ExternalMemory::from_raw_parts(std::ptr::null_mut(), 8) }.is_err());
    }
}
