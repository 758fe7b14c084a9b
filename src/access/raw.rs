//! Shared implementation for handles that expose a contiguous address range.
//!
//! Heap arrays, native allocations, external buffers and mapped chunks all
//! reduce to a base pointer plus a length. They implement [`RawRegion`] and
//! get their [`ReadAccess`](super::ReadAccess) and
//! [`WriteAccess`](super::WriteAccess) impls from [`raw_access!`].
//!
//! Atomic operations additionally require the handle to opt in through
//! [`RawRegion::supports_atomics`] and the address to be aligned to the width
//! of the word; anything else reports `Unsupported`.

use std::sync::atomic::{AtomicI32, AtomicI64, Ordering};

use eyre::{bail, Result};

use crate::error::BytesError;

/// # Safety
///
/// `region_ptr()` must be valid for reads and writes of `region_len()` bytes
/// for as long as the implementing value is alive, and must not move.
pub(crate) unsafe trait RawRegion {
    fn region_ptr(&self) -> *mut u8;

    fn region_len(&self) -> usize;

    fn supports_atomics(&self) -> bool;
}

#[inline]
pub(crate) unsafe fn read<T: Copy, R: RawRegion + ?Sized>(region: &R, offset: usize) -> T {
    region.region_ptr().add(offset).cast::<T>().read_unaligned()
}

#[inline]
pub(crate) unsafe fn write<T: Copy, R: RawRegion + ?Sized>(region: &R, offset: usize, value: T) {
    region.region_ptr().add(offset).cast::<T>().write_unaligned(value)
}

#[inline]
pub(crate) unsafe fn read_into<R: RawRegion + ?Sized>(region: &R, offset: usize, dst: &mut [u8]) {
    std::ptr::copy_nonoverlapping(region.region_ptr().add(offset), dst.as_mut_ptr(), dst.len());
}

#[inline]
pub(crate) unsafe fn write_from<R: RawRegion + ?Sized>(region: &R, offset: usize, src: &[u8]) {
    std::ptr::copy_nonoverlapping(src.as_ptr(), region.region_ptr().add(offset), src.len());
}

pub(crate) unsafe fn atomic_i32<'a, R: RawRegion + ?Sized>(
    region: &'a R,
    offset: usize,
    operation: &'static str,
) -> Result<&'a AtomicI32> {
    let ptr = region.region_ptr().add(offset);
    if !region.supports_atomics() || ptr as usize % std::mem::align_of::<AtomicI32>() != 0 {
        bail!(BytesError::Unsupported { operation });
    }
    // SAFETY: the caller guarantees 4 bytes at `ptr` are inside the region and
    // the alignment was checked above.
    Ok(&*(ptr as *const AtomicI32))
}

pub(crate) unsafe fn atomic_i64<'a, R: RawRegion + ?Sized>(
    region: &'a R,
    offset: usize,
    operation: &'static str,
) -> Result<&'a AtomicI64> {
    let ptr = region.region_ptr().add(offset);
    if !region.supports_atomics() || ptr as usize % std::mem::align_of::<AtomicI64>() != 0 {
        bail!(BytesError::Unsupported { operation });
    }
    // SAFETY: as for atomic_i32, with an 8-byte word.
    Ok(&*(ptr as *const AtomicI64))
}

pub(crate) const LOAD: Ordering = Ordering::Acquire;
pub(crate) const STORE: Ordering = Ordering::Release;
pub(crate) const SWAP: Ordering = Ordering::SeqCst;

/// Implements `ReadAccess` and `WriteAccess` for [`RawRegion`] handles.
macro_rules! raw_access {
    ($($ty:ty),* $(,)?) => {
        $(
            impl $crate::access::ReadAccess for $ty {
                #[inline]
                unsafe fn read_i8(&self, offset: usize) -> i8 {
                    $crate::access::raw::read::<i8, _>(self, offset)
                }

                #[inline]
                unsafe fn read_i16(&self, offset: usize) -> i16 {
                    $crate::access::raw::read::<i16, _>(self, offset)
                }

                #[inline]
                unsafe fn read_i32(&self, offset: usize) -> i32 {
                    $crate::access::raw::read::<i32, _>(self, offset)
                }

                #[inline]
                unsafe fn read_i64(&self, offset: usize) -> i64 {
                    $crate::access::raw::read::<i64, _>(self, offset)
                }

                unsafe fn read_volatile_i32(&self, offset: usize) -> ::eyre::Result<i32> {
                    let word = $crate::access::raw::atomic_i32(self, offset, "read_volatile_i32")?;
                    Ok(word.load($crate::access::raw::LOAD))
                }

                unsafe fn read_volatile_i64(&self, offset: usize) -> ::eyre::Result<i64> {
                    let word = $crate::access::raw::atomic_i64(self, offset, "read_volatile_i64")?;
                    Ok(word.load($crate::access::raw::LOAD))
                }

                #[inline]
                unsafe fn read_into(&self, offset: usize, dst: &mut [u8]) {
                    $crate::access::raw::read_into(self, offset, dst)
                }
            }

            impl $crate::access::WriteAccess for $ty {
                #[inline]
                unsafe fn write_i8(&self, offset: usize, value: i8) {
                    $crate::access::raw::write(self, offset, value)
                }

                #[inline]
                unsafe fn write_i16(&self, offset: usize, value: i16) {
                    $crate::access::raw::write(self, offset, value)
                }

                #[inline]
                unsafe fn write_i32(&self, offset: usize, value: i32) {
                    $crate::access::raw::write(self, offset, value)
                }

                #[inline]
                unsafe fn write_i64(&self, offset: usize, value: i64) {
                    $crate::access::raw::write(self, offset, value)
                }

                unsafe fn write_ordered_i32(&self, offset: usize, value: i32) -> ::eyre::Result<()> {
                    let word = $crate::access::raw::atomic_i32(self, offset, "write_ordered_i32")?;
                    word.store(value, $crate::access::raw::STORE);
                    Ok(())
                }

                unsafe fn write_ordered_i64(&self, offset: usize, value: i64) -> ::eyre::Result<()> {
                    let word = $crate::access::raw::atomic_i64(self, offset, "write_ordered_i64")?;
                    word.store(value, $crate::access::raw::STORE);
                    Ok(())
                }

                unsafe fn compare_and_swap_i32(
                    &self,
                    offset: usize,
                    expected: i32,
                    value: i32,
                ) -> ::eyre::Result<bool> {
                    let word = $crate::access::raw::atomic_i32(self, offset, "compare_and_swap_i32")?;
                    Ok(word
                        .compare_exchange(
                            expected,
                            value,
                            $crate::access::raw::SWAP,
                            $crate::access::raw::SWAP,
                        )
                        .is_ok())
                }

                unsafe fn compare_and_swap_i64(
                    &self,
                    offset: usize,
                    expected: i64,
                    value: i64,
                ) -> ::eyre::Result<bool> {
                    let word = $crate::access::raw::atomic_i64(self, offset, "compare_and_swap_i64")?;
                    Ok(word
                        .compare_exchange(
                            expected,
                            value,
                            $crate::access::raw::SWAP,
                            $crate::access::raw::SWAP,
                        )
                        .is_ok())
                }

                #[inline]
                unsafe fn write_from(&self, offset: usize, src: &[u8]) {
                    $crate::access::raw::write_from(self, offset, src)
                }
            }
        )*
    };
}

pub(crate) use raw_access;
