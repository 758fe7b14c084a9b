//! # Access Abstraction
//!
//! Every byte store is backed by a *handle*: a heap array, a native
//! allocation, an externally owned buffer or one mapped chunk. The handle
//! implements two capability traits:
//!
//! - [`ReadAccess`]: typed primitive reads (`i8`..`i64`, `f32`, `f64`) plus
//!   volatile reads where the handle can provide them
//! - [`WriteAccess`]: the symmetric writes plus ordered writes and
//!   compare-and-swap on 32/64-bit words
//!
//! Everything else is derived once, generically, from those primitives:
//!
//! | Operation       | Function          |
//! |-----------------|-------------------|
//! | block copy      | [`copy`]          |
//! | equality        | [`equivalent`]    |
//! | fill            | [`fill`]          |
//! | zeroing         | [`zero_out`]      |
//! | text append     | [`append_utf8`]   |
//!
//! ## Dispatch
//!
//! Handles are selected by static type. Stores, cursors and the derived
//! operations are generic over `M: Access`, so each handle type gets its own
//! monomorphized copy and the per-byte path has no virtual call.
//!
//! ## Word-At-A-Time Transfer
//!
//! Derived operations move 8 bytes per step and finish the tail with at most
//! one 4-, one 2- and one 1-byte access:
//!
//! ```text
//! len = 15:  [ 8 bytes ][ 4 ][ 2 ][1]
//! len = 6:   [ 4 ][ 2 ]
//! ```
//!
//! The tail never touches a byte outside `[offset, offset + len)`.
//!
//! ## Safety Contract
//!
//! Primitive methods are `unsafe`: the caller guarantees the full width of the
//! access is inside the handle. [`crate::store::BytesStore`] performs that
//! check for every public operation, so nothing outside this crate needs to
//! call the primitives directly.
//!
//! All multi-byte values use native byte order.

pub(crate) mod raw;

pub(crate) use raw::{raw_access, RawRegion};

use eyre::{bail, Result};

use crate::encoding::utf8::encode_char;
use crate::error::BytesError;

pub trait ReadAccess {
    /// # Safety
    ///
    /// `offset` must be a valid index into the handle.
    unsafe fn read_i8(&self, offset: usize) -> i8;

    /// # Safety
    ///
    /// `offset..offset + 2` must lie inside the handle.
    unsafe fn read_i16(&self, offset: usize) -> i16;

    /// # Safety
    ///
    /// `offset..offset + 4` must lie inside the handle.
    unsafe fn read_i32(&self, offset: usize) -> i32;

    /// # Safety
    ///
    /// `offset..offset + 8` must lie inside the handle.
    unsafe fn read_i64(&self, offset: usize) -> i64;

    /// # Safety
    ///
    /// Same as [`ReadAccess::read_i32`].
    #[inline]
    unsafe fn read_f32(&self, offset: usize) -> f32 {
        f32::from_bits(self.read_i32(offset) as u32)
    }

    /// # Safety
    ///
    /// Same as [`ReadAccess::read_i64`].
    #[inline]
    unsafe fn read_f64(&self, offset: usize) -> f64 {
        f64::from_bits(self.read_i64(offset) as u64)
    }

    /// # Safety
    ///
    /// `offset..offset + 4` must lie inside the handle.
    unsafe fn read_volatile_i32(&self, _offset: usize) -> Result<i32> {
        bail!(BytesError::Unsupported {
            operation: "read_volatile_i32"
        })
    }

    /// # Safety
    ///
    /// `offset..offset + 8` must lie inside the handle.
    unsafe fn read_volatile_i64(&self, _offset: usize) -> Result<i64> {
        bail!(BytesError::Unsupported {
            operation: "read_volatile_i64"
        })
    }

    /// Copies `dst.len()` bytes starting at `offset` into `dst`.
    ///
    /// # Safety
    ///
    /// `offset..offset + dst.len()` must lie inside the handle.
    unsafe fn read_into(&self, offset: usize, dst: &mut [u8]) {
        for (i, byte) in dst.iter_mut().enumerate() {
            *byte = self.read_i8(offset + i) as u8;
        }
    }
}

pub trait WriteAccess {
    /// # Safety
    ///
    /// `offset` must be a valid index into the handle.
    unsafe fn write_i8(&self, offset: usize, value: i8);

    /// # Safety
    ///
    /// `offset..offset + 2` must lie inside the handle.
    unsafe fn write_i16(&self, offset: usize, value: i16);

    /// # Safety
    ///
    /// `offset..offset + 4` must lie inside the handle.
    unsafe fn write_i32(&self, offset: usize, value: i32);

    /// # Safety
    ///
    /// `offset..offset + 8` must lie inside the handle.
    unsafe fn write_i64(&self, offset: usize, value: i64);

    /// # Safety
    ///
    /// Same as [`WriteAccess::write_i32`].
    #[inline]
    unsafe fn write_f32(&self, offset: usize, value: f32) {
        self.write_i32(offset, value.to_bits() as i32)
    }

    /// # Safety
    ///
    /// Same as [`WriteAccess::write_i64`].
    #[inline]
    unsafe fn write_f64(&self, offset: usize, value: f64) {
        self.write_i64(offset, value.to_bits() as i64)
    }

    /// # Safety
    ///
    /// `offset..offset + 4` must lie inside the handle.
    unsafe fn write_ordered_i32(&self, _offset: usize, _value: i32) -> Result<()> {
        bail!(BytesError::Unsupported {
            operation: "write_ordered_i32"
        })
    }

    /// # Safety
    ///
    /// `offset..offset + 8` must lie inside the handle.
    unsafe fn write_ordered_i64(&self, _offset: usize, _value: i64) -> Result<()> {
        bail!(BytesError::Unsupported {
            operation: "write_ordered_i64"
        })
    }

    /// Returns `Ok(true)` when the word held `expected` and was replaced.
    ///
    /// # Safety
    ///
    /// `offset..offset + 4` must lie inside the handle.
    unsafe fn compare_and_swap_i32(&self, _offset: usize, _expected: i32, _value: i32) -> Result<bool> {
        bail!(BytesError::Unsupported {
            operation: "compare_and_swap_i32"
        })
    }

    /// # Safety
    ///
    /// `offset..offset + 8` must lie inside the handle.
    unsafe fn compare_and_swap_i64(&self, _offset: usize, _expected: i64, _value: i64) -> Result<bool> {
        bail!(BytesError::Unsupported {
            operation: "compare_and_swap_i64"
        })
    }

    /// Copies `src` into the handle starting at `offset`.
    ///
    /// # Safety
    ///
    /// `offset..offset + src.len()` must lie inside the handle.
    unsafe fn write_from(&self, offset: usize, src: &[u8]) {
        for (i, byte) in src.iter().enumerate() {
            self.write_i8(offset + i, *byte as i8);
        }
    }
}

/// A handle that can be both read and written.
pub trait Access: ReadAccess + WriteAccess {}

impl<T: ReadAccess + WriteAccess + ?Sized> Access for T {}

/// Plain byte slices are readable handles, which lets the derived operations
/// compare or copy caller-owned buffers against any store.
impl ReadAccess for [u8] {
    #[inline]
    unsafe fn read_i8(&self, offset: usize) -> i8 {
        *self.get_unchecked(offset) as i8
    }

    #[inline]
    unsafe fn read_i16(&self, offset: usize) -> i16 {
        self.as_ptr().add(offset).cast::<i16>().read_unaligned()
    }

    #[inline]
    unsafe fn read_i32(&self, offset: usize) -> i32 {
        self.as_ptr().add(offset).cast::<i32>().read_unaligned()
    }

    #[inline]
    unsafe fn read_i64(&self, offset: usize) -> i64 {
        self.as_ptr().add(offset).cast::<i64>().read_unaligned()
    }

    unsafe fn read_into(&self, offset: usize, dst: &mut [u8]) {
        dst.copy_from_slice(self.get_unchecked(offset..offset + dst.len()));
    }
}

/// Copies `len` bytes from `src` at `src_offset` to `dst` at `dst_offset`.
///
/// # Safety
///
/// Both ranges must lie inside their handles. When `src` and `dst` share
/// memory the ranges must not overlap unless `dst_offset <= src_offset`.
pub unsafe fn copy<S, D>(src: &S, src_offset: usize, dst: &D, dst_offset: usize, len: usize)
where
    S: ReadAccess + ?Sized,
    D: WriteAccess + ?Sized,
{
    let mut i = 0;
    while i + 8 <= len {
        dst.write_i64(dst_offset + i, src.read_i64(src_offset + i));
        i += 8;
    }
    if i + 4 <= len {
        dst.write_i32(dst_offset + i, src.read_i32(src_offset + i));
        i += 4;
    }
    if i + 2 <= len {
        dst.write_i16(dst_offset + i, src.read_i16(src_offset + i));
        i += 2;
    }
    if i < len {
        dst.write_i8(dst_offset + i, src.read_i8(src_offset + i));
    }
}

/// Compares two ranges of equal length, possibly over different handle types.
///
/// # Safety
///
/// Both ranges must lie inside their handles.
pub unsafe fn equivalent<A, B>(a: &A, a_offset: usize, b: &B, b_offset: usize, len: usize) -> bool
where
    A: ReadAccess + ?Sized,
    B: ReadAccess + ?Sized,
{
    let mut i = 0;
    while i + 8 <= len {
        if a.read_i64(a_offset + i) != b.read_i64(b_offset + i) {
            return false;
        }
        i += 8;
    }
    if i + 4 <= len {
        if a.read_i32(a_offset + i) != b.read_i32(b_offset + i) {
            return false;
        }
        i += 4;
    }
    if i + 2 <= len {
        if a.read_i16(a_offset + i) != b.read_i16(b_offset + i) {
            return false;
        }
        i += 2;
    }
    if i < len {
        return a.read_i8(a_offset + i) == b.read_i8(b_offset + i);
    }
    true
}

/// Sets `len` bytes starting at `offset` to `byte`.
///
/// # Safety
///
/// `offset..offset + len` must lie inside the handle.
pub unsafe fn fill<D: WriteAccess + ?Sized>(dst: &D, offset: usize, len: usize, byte: u8) {
    let word = u64::from_ne_bytes([byte; 8]) as i64;

    let mut i = 0;
    while i + 8 <= len {
        dst.write_i64(offset + i, word);
        i += 8;
    }
    if i + 4 <= len {
        dst.write_i32(offset + i, word as i32);
        i += 4;
    }
    if i + 2 <= len {
        dst.write_i16(offset + i, word as i16);
        i += 2;
    }
    if i < len {
        dst.write_i8(offset + i, byte as i8);
    }
}

/// # Safety
///
/// `offset..offset + len` must lie inside the handle.
pub unsafe fn zero_out<D: WriteAccess + ?Sized>(dst: &D, offset: usize, len: usize) {
    fill(dst, offset, len, 0)
}

/// Writes the compact text encoding of `text` at `offset` and returns the
/// number of bytes written, which is always `text.len()`.
///
/// Runs of ASCII are stored eight bytes at a time; every other character goes
/// through the 2/3/4-byte branches of [`encode_char`].
///
/// # Safety
///
/// `offset..offset + text.len()` must lie inside the handle.
pub unsafe fn append_utf8<D: WriteAccess + ?Sized>(dst: &D, offset: usize, text: &str) -> usize {
    let bytes = text.as_bytes();
    let mut i = 0;

    while i + 8 <= bytes.len() {
        let word = u64::from_ne_bytes([
            bytes[i],
            bytes[i + 1],
            bytes[i + 2],
            bytes[i + 3],
            bytes[i + 4],
            bytes[i + 5],
            bytes[i + 6],
            bytes[i + 7],
        ]);
        if word & 0x8080_8080_8080_8080 != 0 {
            break;
        }
        dst.write_i64(offset + i, word as i64);
        i += 8;
    }

    // `i` only advanced over ASCII, so it sits on a char boundary.
    for ch in text[i..].chars() {
        let (encoded, len) = encode_char(ch);
        for (j, byte) in encoded[..len].iter().enumerate() {
            dst.write_i8(offset + i + j, *byte as i8);
        }
        i += len;
    }
    i
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{HeapMemory, NativeMemory};

    fn native_with(bytes: &[u8]) -> NativeMemory {
        let memory = NativeMemory::allocate_zeroed(bytes.len()).unwrap();
        unsafe { memory.write_from(0, bytes) };
        memory
    }

    #[test]
    fn copy_is_exact_at_every_length() {
        let source: Vec<u8> = (1..=40).collect();

        for len in 0..=24 {
            let src = native_with(&source);
            let dst = HeapMemory::zeroed(40);
            unsafe { copy(&src, 3, &dst, 5, len) };

            let mut out = vec![0u8; 40];
            unsafe { dst.read_into(0, &mut out) };

            assert!(out[..5].iter().all(|b| *b == 0), "len {}", len);
            assert_eq!(&out[5..5 + len], &source[3..3 + len], "len {}", len);
            assert!(out[5 + len..].iter().all(|b| *b == 0), "len {}", len);
        }
    }

    #[test]
    fn equivalent_finds_difference_in_tail() {
        let a: Vec<u8> = (0..15).collect();
        let memory = native_with(&a);

        for flip in 0..15 {
            let mut b = a.clone();
            b[flip] ^= 0xFF;
            assert!(!unsafe { equivalent(&memory, 0, b.as_slice(), 0, 15) });
        }
        assert!(unsafe { equivalent(&memory, 0, a.as_slice(), 0, 15) });
    }

    #[test]
    fn fill_stays_inside_range() {
        let memory = HeapMemory::zeroed(32);

        for len in 0..=13 {
            unsafe { zero_out(&memory, 0, 32) };
            unsafe { fill(&memory, 7, len, 0xAB) };

            let mut out = vec![0u8; 32];
            unsafe { memory.read_into(0, &mut out) };
            for (i, byte) in out.iter().enumerate() {
                let expected = if (7..7 + len).contains(&i) { 0xAB } else { 0 };
                assert_eq!(*byte, expected, "len {} index {}", len, i);
            }
        }
    }

    #[test]
    fn append_utf8_matches_str_bytes() {
        let text = "plain ascii run, then é, € and 𝄞 at the end";
        let memory = HeapMemory::zeroed(text.len());

        let written = unsafe { append_utf8(&memory, 0, text) };
        assert_eq!(written, text.len());

        let mut out = vec![0u8; text.len()];
        unsafe { memory.read_into(0, &mut out) };
        assert_eq!(out, text.as_bytes());
    }

    #[test]
    fn heap_memory_rejects_atomics() {
        let memory = HeapMemory::zeroed(16);

        let err = unsafe { memory.compare_and_swap_i64(0, 0, 1) }.unwrap_err();
        assert_eq!(crate::error::classify(&err), crate::error::ErrorKind::Unsupported);
    }
}
