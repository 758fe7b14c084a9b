//! # Byte Store
//!
//! `BytesStore<M>` is a fixed-extent, bounds-checked region over one memory
//! handle. It is the only place where offsets are validated before the unsafe
//! primitives of [`crate::access`] run.
//!
//! ## Addressing
//!
//! A store exposes the half-open range `[start, start + capacity)`. Offsets are
//! absolute in that coordinate system; the index into the handle is
//! `offset - base`:
//!
//! ```text
//!              base = start                          start + capacity
//! heap/native:  0 ────────────────────────────────── capacity
//!
//!              base = start = chunk * chunk_size
//! mapped:      [chunk bytes ................ | overlap ]
//!
//! view:        base unchanged, start/capacity narrowed to the viewed range
//! ```
//!
//! Every access with width `w` at `offset` requires
//! `start <= offset && offset + w <= start + capacity`; anything else fails
//! with [`BytesError::OutOfBounds`]. Nothing is clamped or wrapped.
//!
//! ## Reservations
//!
//! A store carries an explicit [`ReferenceCounter`]. Construction reserves it
//! once for the creator. [`BytesStore::share`] and [`BytesStore::view`]
//! reserve again and return a second handle on the same memory and counter;
//! each holder calls `release()` exactly once. When the count reaches zero the
//! teardown runs (a mapped chunk returns its reservation on the file) and
//! every later access fails with a state error.
//!
//! Dropping a handle does not release it; cursors do that for the stores they
//! own.

use std::fmt;
use std::sync::Arc;

use eyre::{bail, Result};
use tracing::debug;

use crate::access::{self, ReadAccess, WriteAccess};
use crate::error::BytesError;
use crate::memory::{Allocate, ExternalMemory, HeapMemory, Memory, NativeMemory};
use crate::refcount::{ReferenceCounted, ReferenceCounter};

pub type HeapStore = BytesStore<HeapMemory>;
pub type NativeStore = BytesStore<NativeMemory>;

struct Shared<M> {
    memory: M,
    refs: ReferenceCounter,
}

pub struct BytesStore<M: Memory> {
    shared: Arc<Shared<M>>,
    base: usize,
    start: usize,
    capacity: usize,
}

macro_rules! primitive_accessors {
    ($($read:ident, $write:ident: $ty:ty;)*) => {
        $(
            #[inline]
            pub fn $read(&self, offset: usize) -> Result<$ty> {
                let index = self.index(offset, std::mem::size_of::<$ty>())?;
                // SAFETY: index() checked the full width against the store extent,
                // which never exceeds the handle.
                Ok(unsafe { self.shared.memory.$read(index) })
            }

            #[inline]
            pub fn $write(&self, offset: usize, value: $ty) -> Result<()> {
                let index = self.index(offset, std::mem::size_of::<$ty>())?;
                // SAFETY: as above.
                unsafe { self.shared.memory.$write(index, value) };
                Ok(())
            }
        )*
    };
}

impl<M: Memory> BytesStore<M> {
    /// Wraps `memory` covering `[base, base + memory.len())`, reserved once for
    /// the caller. `on_release` runs when the last reservation is released.
    pub(crate) fn with_teardown(
        memory: M,
        base: usize,
        on_release: impl FnOnce() + Send + 'static,
    ) -> Result<Self> {
        let capacity = memory.len();
        let refs = ReferenceCounter::new("bytes store", on_release);
        refs.acquire()?;

        Ok(Self {
            shared: Arc::new(Shared { memory, refs }),
            base,
            start: base,
            capacity,
        })
    }

    pub fn from_memory(memory: M) -> Result<Self> {
        let capacity = memory.len();
        Self::with_teardown(memory, 0, move || {
            debug!(kind = M::KIND, capacity, "released store");
        })
    }

    #[inline]
    pub fn start(&self) -> usize {
        self.start
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// One past the last valid offset.
    #[inline]
    pub fn end(&self) -> usize {
        self.start + self.capacity
    }

    pub fn kind(&self) -> &'static str {
        M::KIND
    }

    pub fn is_released(&self) -> bool {
        self.shared.refs.is_released()
    }

    #[inline]
    pub fn contains(&self, offset: usize, len: usize) -> bool {
        offset >= self.start
            && offset
                .checked_add(len)
                .is_some_and(|last| last <= self.end())
    }

    #[inline]
    fn index(&self, offset: usize, len: usize) -> Result<usize> {
        self.shared.refs.ensure_live()?;
        if !self.contains(offset, len) {
            bail!(BytesError::out_of_bounds(offset, len, self.start, self.end()));
        }
        Ok(offset - self.base)
    }

    primitive_accessors! {
        read_i8, write_i8: i8;
        read_i16, write_i16: i16;
        read_i32, write_i32: i32;
        read_i64, write_i64: i64;
        read_f32, write_f32: f32;
        read_f64, write_f64: f64;
    }

    pub fn read_volatile_i32(&self, offset: usize) -> Result<i32> {
        let index = self.index(offset, 4)?;
        // SAFETY: bounds checked by index().
        unsafe { self.shared.memory.read_volatile_i32(index) }
    }

    pub fn read_volatile_i64(&self, offset: usize) -> Result<i64> {
        let index = self.index(offset, 8)?;
        // SAFETY: bounds checked by index().
        unsafe { self.shared.memory.read_volatile_i64(index) }
    }

    pub fn write_ordered_i32(&self, offset: usize, value: i32) -> Result<()> {
        let index = self.index(offset, 4)?;
        // SAFETY: bounds checked by index().
        unsafe { self.shared.memory.write_ordered_i32(index, value) }
    }

    pub fn write_ordered_i64(&self, offset: usize, value: i64) -> Result<()> {
        let index = self.index(offset, 8)?;
        // SAFETY: bounds checked by index().
        unsafe { self.shared.memory.write_ordered_i64(index, value) }
    }

    pub fn compare_and_swap_i32(&self, offset: usize, expected: i32, value: i32) -> Result<bool> {
        let index = self.index(offset, 4)?;
        // SAFETY: bounds checked by index().
        unsafe { self.shared.memory.compare_and_swap_i32(index, expected, value) }
    }

    pub fn compare_and_swap_i64(&self, offset: usize, expected: i64, value: i64) -> Result<bool> {
        let index = self.index(offset, 8)?;
        // SAFETY: bounds checked by index().
        unsafe { self.shared.memory.compare_and_swap_i64(index, expected, value) }
    }

    /// Atomically adds `delta` and returns the previous value.
    pub fn get_and_add_i32(&self, offset: usize, delta: i32) -> Result<i32> {
        loop {
            let current = self.read_volatile_i32(offset)?;
            if self.compare_and_swap_i32(offset, current, current.wrapping_add(delta))? {
                return Ok(current);
            }
        }
    }

    pub fn get_and_add_i64(&self, offset: usize, delta: i64) -> Result<i64> {
        loop {
            let current = self.read_volatile_i64(offset)?;
            if self.compare_and_swap_i64(offset, current, current.wrapping_add(delta))? {
                return Ok(current);
            }
        }
    }

    pub fn read_into(&self, offset: usize, dst: &mut [u8]) -> Result<()> {
        let index = self.index(offset, dst.len())?;
        // SAFETY: bounds checked by index().
        unsafe { self.shared.memory.read_into(index, dst) };
        Ok(())
    }

    pub fn write_from(&self, offset: usize, src: &[u8]) -> Result<()> {
        let index = self.index(offset, src.len())?;
        // SAFETY: bounds checked by index().
        unsafe { self.shared.memory.write_from(index, src) };
        Ok(())
    }

    pub fn to_vec(&self, offset: usize, len: usize) -> Result<Vec<u8>> {
        let mut out = vec![0; len];
        self.read_into(offset, &mut out)?;
        Ok(out)
    }

    pub fn fill(&self, offset: usize, len: usize, byte: u8) -> Result<()> {
        let index = self.index(offset, len)?;
        // SAFETY: bounds checked by index().
        unsafe { access::fill(&self.shared.memory, index, len, byte) };
        Ok(())
    }

    pub fn zero_out(&self, offset: usize, len: usize) -> Result<()> {
        let index = self.index(offset, len)?;
        // SAFETY: bounds checked by index().
        unsafe { access::zero_out(&self.shared.memory, index, len) };
        Ok(())
    }

    /// Compares `expected.len()` bytes at `offset` with `expected`.
    pub fn content_equals(&self, offset: usize, expected: &[u8]) -> Result<bool> {
        let index = self.index(offset, expected.len())?;
        // SAFETY: bounds checked by index(); the slice covers its own length.
        Ok(unsafe { access::equivalent(&self.shared.memory, index, expected, 0, expected.len()) })
    }

    /// Compares a range of this store with a range of another, possibly of a
    /// different handle type.
    pub fn range_equals<N: Memory>(
        &self,
        offset: usize,
        other: &BytesStore<N>,
        other_offset: usize,
        len: usize,
    ) -> Result<bool> {
        let index = self.index(offset, len)?;
        let other_index = other.index(other_offset, len)?;
        // SAFETY: both ranges checked against their stores.
        Ok(unsafe {
            access::equivalent(
                &self.shared.memory,
                index,
                &other.shared.memory,
                other_index,
                len,
            )
        })
    }

    /// Writes the compact text encoding of `text` at `offset`, returning the
    /// number of bytes written.
    pub fn append_utf8(&self, offset: usize, text: &str) -> Result<usize> {
        let index = self.index(offset, text.len())?;
        // SAFETY: the encoding of a str is exactly text.len() bytes.
        Ok(unsafe { access::append_utf8(&self.shared.memory, index, text) })
    }

    /// Copies `len` bytes into `dst`, which may use a different handle type.
    pub fn copy_to<N: Memory>(
        &self,
        offset: usize,
        dst: &BytesStore<N>,
        dst_offset: usize,
        len: usize,
    ) -> Result<()> {
        let index = self.index(offset, len)?;
        let dst_index = dst.index(dst_offset, len)?;
        if std::ptr::eq(
            Arc::as_ptr(&self.shared).cast::<u8>(),
            Arc::as_ptr(&dst.shared).cast::<u8>(),
        ) && dst_index > index
            && dst_index < index + len
        {
            bail!("overlapping copy from {} to {} within one store", offset, dst_offset);
        }
        // SAFETY: both ranges checked; a backwards-overlapping copy inside one
        // store was rejected above.
        unsafe { access::copy(&self.shared.memory, index, &dst.shared.memory, dst_index, len) };
        Ok(())
    }

    /// Returns a second handle on `[offset, offset + len)`, sharing memory and
    /// reference count with this store and reserved once for the caller.
    pub fn view(&self, offset: usize, len: usize) -> Result<Self> {
        self.index(offset, len)?;
        self.shared.refs.acquire()?;
        Ok(Self {
            shared: Arc::clone(&self.shared),
            base: self.base,
            start: offset,
            capacity: len,
        })
    }

    /// Returns a second reserved handle over the same extent.
    pub fn share(&self) -> Result<Self> {
        self.view(self.start, self.capacity)
    }

    /// An unreserved handle for internal bookkeeping, e.g. a chunk table slot.
    pub(crate) fn duplicate(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            base: self.base,
            start: self.start,
            capacity: self.capacity,
        }
    }

    /// Reserves again unless the store has been torn down.
    pub(crate) fn try_acquire(&self) -> bool {
        self.shared.refs.try_acquire()
    }

    pub fn address(&self) -> usize {
        self.shared.memory.address() + (self.start - self.base)
    }
}

impl<M: Allocate> BytesStore<M> {
    /// Allocates a zeroed store of `capacity` bytes starting at offset 0.
    pub fn allocate(capacity: usize) -> Result<Self> {
        Self::from_memory(M::allocate_zeroed(capacity)?)
    }
}

impl BytesStore<HeapMemory> {
    /// Wraps an existing buffer without copying it.
    pub fn from_vec(bytes: Vec<u8>) -> Result<Self> {
        Self::from_memory(HeapMemory::from_vec(bytes))
    }
}

impl BytesStore<ExternalMemory> {
    /// # Safety
    ///
    /// See [`ExternalMemory::from_raw_parts`].
    pub unsafe fn external(ptr: *mut u8, len: usize) -> Result<Self> {
        Self::from_memory(ExternalMemory::from_raw_parts(ptr, len)?)
    }
}

impl<M: Memory> ReferenceCounted for BytesStore<M> {
    fn acquire(&self) -> Result<()> {
        self.shared.refs.acquire().map(|_| ())
    }

    fn release(&self) -> Result<()> {
        self.shared.refs.release().map(|_| ())
    }

    fn ref_count(&self) -> u64 {
        self.shared.refs.count()
    }
}

impl<M: Memory> fmt::Debug for BytesStore<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BytesStore")
            .field("kind", &M::KIND)
            .field("start", &self.start)
            .field("capacity", &self.capacity)
            .field("refs", &self.shared.refs.count())
            .field("released", &self.shared.refs.is_released())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{classify, ErrorKind};

    #[test]
    fn primitives_round_trip() {
        let store = NativeStore::allocate(64).unwrap();

        store.write_i8(0, -5).unwrap();
        store.write_i16(1, -300).unwrap();
        store.write_i32(3, 123_456_789).unwrap();
        store.write_i64(7, i64::MIN).unwrap();
        store.write_f32(15, 1.5).unwrap();
        store.write_f64(19, -0.0).unwrap();

        assert_eq!(store.read_i8(0).unwrap(), -5);
        assert_eq!(store.read_i16(1).unwrap(), -300);
        assert_eq!(store.read_i32(3).unwrap(), 123_456_789);
        assert_eq!(store.read_i64(7).unwrap(), i64::MIN);
        assert_eq!(store.read_f32(15).unwrap(), 1.5);
        assert_eq!(store.read_f64(19).unwrap().to_bits(), (-0.0f64).to_bits());
    }

    #[test]
    fn reads_past_capacity_fail_with_bounds() {
        let store = HeapStore::allocate(16).unwrap();

        for offset in [9, 15, 16, 100, usize::MAX] {
            let err = store.read_i64(offset).unwrap_err();
            assert_eq!(classify(&err), ErrorKind::Bounds, "offset {}", offset);
        }
        assert!(store.read_i64(8).is_ok());
    }

    #[test]
    fn view_narrows_range_and_shares_memory() {
        let store = NativeStore::allocate(32).unwrap();
        let view = store.view(8, 8).unwrap();

        assert_eq!(store.ref_count(), 2);
        assert_eq!(view.start(), 8);
        assert_eq!(view.end(), 16);

        view.write_i64(8, 77).unwrap();
        assert_eq!(store.read_i64(8).unwrap(), 77);

        assert_eq!(classify(&view.read_i8(7).unwrap_err()), ErrorKind::Bounds);
        assert_eq!(classify(&view.read_i8(16).unwrap_err()), ErrorKind::Bounds);
    }

    #[test]
    fn release_ends_access() {
        let store = HeapStore::from_vec(vec![1, 2, 3]).unwrap();
        let shared = store.share().unwrap();

        store.release().unwrap();
        assert_eq!(shared.read_i8(0).unwrap(), 1);

        shared.release().unwrap();
        assert!(store.is_released());
        assert_eq!(classify(&store.read_i8(0).unwrap_err()), ErrorKind::State);
        assert_eq!(classify(&store.release().unwrap_err()), ErrorKind::State);
    }

    #[test]
    fn fill_and_content_equals() {
        let store = NativeStore::allocate(24).unwrap();

        store.fill(2, 19, 0x5A).unwrap();
        let mut expected = vec![0u8; 24];
        expected[2..21].fill(0x5A);

        assert!(store.content_equals(0, &expected).unwrap());
        expected[20] = 0;
        assert!(!store.content_equals(0, &expected).unwrap());

        store.zero_out(0, 24).unwrap();
        assert!(store.content_equals(0, &[0u8; 24]).unwrap());
    }

    #[test]
    fn copy_between_handle_types() {
        let heap = HeapStore::from_vec((0..20).collect()).unwrap();
        let native = NativeStore::allocate(20).unwrap();

        heap.copy_to(1, &native, 0, 19).unwrap();

        assert!(native.range_equals(0, &heap, 1, 19).unwrap());
        assert_eq!(native.read_i8(18).unwrap(), 19);
    }

    #[test]
    fn get_and_add_on_native_memory() {
        let store = NativeStore::allocate(16).unwrap();

        assert_eq!(store.get_and_add_i64(8, 5).unwrap(), 0);
        assert_eq!(store.get_and_add_i64(8, -2).unwrap(), 5);
        assert_eq!(store.read_i64(8).unwrap(), 3);

        assert_eq!(store.get_and_add_i32(0, 1).unwrap(), 0);
        assert_eq!(store.read_volatile_i32(0).unwrap(), 1);
    }

    #[test]
    fn get_and_add_on_heap_is_unsupported() {
        let store = HeapStore::allocate(16).unwrap();

        let err = store.get_and_add_i32(0, 1).unwrap_err();
        assert_eq!(classify(&err), ErrorKind::Unsupported);
    }

    #[test]
    fn append_utf8_at_offset() {
        let store = HeapStore::allocate(16).unwrap();

        let written = store.append_utf8(2, "héllo").unwrap();
        assert_eq!(written, 6);
        assert!(store.content_equals(2, "héllo".as_bytes()).unwrap());

        let err = store.append_utf8(12, "héllo").unwrap_err();
        assert_eq!(classify(&err), ErrorKind::Bounds);
    }
}
