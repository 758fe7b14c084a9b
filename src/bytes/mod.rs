//! # Elastic Cursor
//!
//! `Bytes<B>` is a position/limit-bounded streaming view over the store(s)
//! provided by a [`Backing`]. It implements [`StreamingInput`] and
//! [`StreamingOutput`] for sequential work and offers random access at
//! absolute offsets alongside.
//!
//! ## Bounds
//!
//! ```text
//! start <= position <= limit <= capacity
//! ```
//!
//! - Reads, sequential or random, must end at or before `limit`.
//! - Writes must end at or before `limit`. When `limit == capacity` a write
//!   past it asks the backing to grow: an elastic backing reallocates and the
//!   limit follows the new capacity, a fixed one fails with a capacity error.
//!   A limit narrowed below capacity is never widened implicitly; writing
//!   past it is a bounds error.
//!
//! A fresh cursor has `position = start` and `limit = capacity`. After a run
//! of writes, [`Bytes::flip`] turns the written range into the readable one.
//!
//! ## Scoped Ranges
//!
//! There is no mark/reset. [`Bytes::cursor_state`] and [`Bytes::restore`]
//! save and restore position and limit explicitly; [`Bytes::with_range`]
//! runs a closure over a sub-range and restores both afterwards, even when
//! the closure fails.
//!
//! ## Lifetime
//!
//! A cursor owns one reservation on each store it holds. [`Bytes::release`]
//! returns them; dropping an unreleased cursor does the same and logs a
//! warning if that fails.

mod backing;
mod debug;
mod streaming;

pub use backing::{Backing, Elastic, Fixed};
pub use streaming::{StreamingInput, StreamingOutput};

use std::fmt;
use std::mem::size_of;

use eyre::{bail, Result};
use smallvec::SmallVec;
use tracing::warn;

use crate::encoding::integer::format_fixed;
use crate::error::BytesError;
use crate::memory::{Allocate, HeapMemory, Memory, NativeMemory};
use crate::store::BytesStore;

pub type HeapBytes = Bytes<Fixed<HeapMemory>>;
pub type NativeBytes = Bytes<Fixed<NativeMemory>>;
pub type ElasticHeapBytes = Bytes<Elastic<HeapMemory>>;
pub type ElasticNativeBytes = Bytes<Elastic<NativeMemory>>;

/// Saved position and limit of a cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CursorState {
    pub position: usize,
    pub limit: usize,
}

pub struct Bytes<B: Backing> {
    backing: B,
    position: usize,
    limit: usize,
    released: bool,
}

macro_rules! random_access {
    ($($read_at:ident => $read:ident, $write_at:ident => $write:ident: $ty:ty;)*) => {
        $(
            #[inline]
            pub fn $read_at(&mut self, offset: usize) -> Result<$ty> {
                self.check_read(offset, size_of::<$ty>())?;
                self.backing.store_at(offset)?.$read(offset)
            }

            #[inline]
            pub fn $write_at(&mut self, offset: usize, value: $ty) -> Result<()> {
                self.check_write(offset, size_of::<$ty>())?;
                self.backing.store_at(offset)?.$write(offset, value)
            }
        )*
    };
}

impl<B: Backing> Bytes<B> {
    pub fn from_backing(backing: B) -> Self {
        Self {
            position: backing.start(),
            limit: backing.capacity(),
            backing,
            released: false,
        }
    }

    pub fn start(&self) -> usize {
        self.backing.start()
    }

    pub fn capacity(&self) -> usize {
        self.backing.capacity()
    }

    #[inline]
    pub fn position(&self) -> usize {
        self.position
    }

    #[inline]
    pub fn limit(&self) -> usize {
        self.limit
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.limit - self.position
    }

    pub fn is_elastic(&self) -> bool {
        self.backing.is_elastic()
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    pub fn backing(&self) -> &B {
        &self.backing
    }

    pub fn set_limit(&mut self, limit: usize) -> Result<()> {
        if limit < self.position || limit > self.capacity() {
            bail!(BytesError::out_of_bounds(
                limit,
                0,
                self.position,
                self.capacity()
            ));
        }
        self.limit = limit;
        Ok(())
    }

    /// Resets to `position = start`, `limit = capacity`.
    pub fn clear(&mut self) {
        self.position = self.start();
        self.limit = self.capacity();
    }

    /// Makes the bytes written so far the readable range.
    pub fn flip(&mut self) {
        self.limit = self.position;
        self.position = self.start();
    }

    pub fn cursor_state(&self) -> CursorState {
        CursorState {
            position: self.position,
            limit: self.limit,
        }
    }

    pub fn restore(&mut self, state: CursorState) -> Result<()> {
        let start = self.start();
        if state.position < start || state.position > state.limit || state.limit > self.capacity()
        {
            bail!(BytesError::out_of_bounds(
                state.position,
                state.limit.saturating_sub(state.position),
                start,
                self.capacity()
            ));
        }
        self.position = state.position;
        self.limit = state.limit;
        Ok(())
    }

    /// Runs `f` with the cursor narrowed to `[position, limit)`, then restores
    /// the previous position and limit.
    pub fn with_range<R>(
        &mut self,
        position: usize,
        limit: usize,
        f: impl FnOnce(&mut Self) -> Result<R>,
    ) -> Result<R> {
        let saved = self.cursor_state();
        self.restore(CursorState { position, limit })?;
        let result = f(self);
        self.position = saved.position;
        self.limit = saved.limit;
        result
    }

    #[inline]
    fn ensure_live(&self) -> Result<()> {
        if self.released {
            bail!(BytesError::Released { resource: "cursor" });
        }
        Ok(())
    }

    #[inline]
    fn check_read(&self, offset: usize, len: usize) -> Result<()> {
        self.ensure_live()?;
        let start = self.start();
        if offset < start || offset.checked_add(len).map_or(true, |end| end > self.limit) {
            bail!(BytesError::out_of_bounds(offset, len, start, self.limit));
        }
        Ok(())
    }

    #[inline]
    fn check_write(&mut self, offset: usize, len: usize) -> Result<()> {
        self.ensure_live()?;
        let start = self.start();
        let Some(end) = offset.checked_add(len).filter(|_| offset >= start) else {
            bail!(BytesError::out_of_bounds(offset, len, start, self.limit));
        };
        if end <= self.limit {
            return Ok(());
        }
        if self.limit < self.capacity() {
            bail!(BytesError::out_of_bounds(offset, len, start, self.limit));
        }
        self.limit = self.backing.grow(end)?;
        Ok(())
    }

    random_access! {
        read_i8_at => read_i8, write_i8_at => write_i8: i8;
        read_i16_at => read_i16, write_i16_at => write_i16: i16;
        read_i32_at => read_i32, write_i32_at => write_i32: i32;
        read_i64_at => read_i64, write_i64_at => write_i64: i64;
        read_f32_at => read_f32, write_f32_at => write_f32: f32;
        read_f64_at => read_f64, write_f64_at => write_f64: f64;
    }

    pub fn read_u8_at(&mut self, offset: usize) -> Result<u8> {
        Ok(self.read_i8_at(offset)? as u8)
    }

    pub fn read_volatile_i32_at(&mut self, offset: usize) -> Result<i32> {
        self.check_read(offset, 4)?;
        self.backing.store_at(offset)?.read_volatile_i32(offset)
    }

    pub fn read_volatile_i64_at(&mut self, offset: usize) -> Result<i64> {
        self.check_read(offset, 8)?;
        self.backing.store_at(offset)?.read_volatile_i64(offset)
    }

    pub fn write_ordered_i32_at(&mut self, offset: usize, value: i32) -> Result<()> {
        self.check_write(offset, 4)?;
        self.backing.store_at(offset)?.write_ordered_i32(offset, value)
    }

    pub fn write_ordered_i64_at(&mut self, offset: usize, value: i64) -> Result<()> {
        self.check_write(offset, 8)?;
        self.backing.store_at(offset)?.write_ordered_i64(offset, value)
    }

    pub fn compare_and_swap_i32_at(
        &mut self,
        offset: usize,
        expected: i32,
        value: i32,
    ) -> Result<bool> {
        self.check_write(offset, 4)?;
        self.backing
            .store_at(offset)?
            .compare_and_swap_i32(offset, expected, value)
    }

    pub fn compare_and_swap_i64_at(
        &mut self,
        offset: usize,
        expected: i64,
        value: i64,
    ) -> Result<bool> {
        self.check_write(offset, 8)?;
        self.backing
            .store_at(offset)?
            .compare_and_swap_i64(offset, expected, value)
    }

    /// Atomically adds `delta` at `offset` and returns the previous value.
    pub fn get_and_add_i32_at(&mut self, offset: usize, delta: i32) -> Result<i32> {
        self.check_write(offset, 4)?;
        self.backing.store_at(offset)?.get_and_add_i32(offset, delta)
    }

    pub fn get_and_add_i64_at(&mut self, offset: usize, delta: i64) -> Result<i64> {
        self.check_write(offset, 8)?;
        self.backing.store_at(offset)?.get_and_add_i64(offset, delta)
    }

    /// Fills `dst` from `offset` without moving the position. A mapped cursor
    /// may cross chunks here.
    pub fn read_into_at(&mut self, offset: usize, dst: &mut [u8]) -> Result<()> {
        self.check_read(offset, dst.len())?;
        let mut done = 0;
        while done < dst.len() {
            let at = offset + done;
            let store = self.backing.store_at(at)?;
            let n = store.end().saturating_sub(at).min(dst.len() - done);
            if n == 0 {
                bail!(BytesError::out_of_bounds(at, dst.len() - done, store.start(), store.end()));
            }
            store.read_into(at, &mut dst[done..done + n])?;
            done += n;
        }
        Ok(())
    }

    pub fn write_from_at(&mut self, offset: usize, src: &[u8]) -> Result<()> {
        self.check_write(offset, src.len())?;
        let mut done = 0;
        while done < src.len() {
            let at = offset + done;
            let store = self.backing.store_at(at)?;
            let n = store.end().saturating_sub(at).min(src.len() - done);
            if n == 0 {
                bail!(BytesError::out_of_bounds(at, src.len() - done, store.start(), store.end()));
            }
            store.write_from(at, &src[done..done + n])?;
            done += n;
        }
        Ok(())
    }

    /// Overwrites exactly `digits` bytes at `offset` with `value` as
    /// zero-padded decimal text.
    pub fn append_fixed_at(&mut self, offset: usize, value: i64, digits: usize) -> Result<()> {
        let mut text: SmallVec<[u8; 20]> = SmallVec::from_elem(b'0', digits);
        format_fixed(value, &mut text)?;
        self.write_from_at(offset, &text)
    }

    /// A fixed cursor over `[position, limit)` sharing this cursor's memory.
    /// The slice holds its own reservation and never grows.
    pub fn slice(&mut self) -> Result<Bytes<Fixed<B::Memory>>> {
        self.ensure_live()?;
        let (position, len) = (self.position, self.remaining());
        let view = self.backing.store_at(position)?.view(position, len)?;
        Ok(Bytes::wrap(view))
    }

    /// Copies `[position, limit)` without moving the position.
    ///
    /// A mapped cursor's limit defaults to the file's capacity; use
    /// [`copy_range_to_vec`](Self::copy_range_to_vec) there.
    pub fn copy_to_vec(&mut self) -> Result<Vec<u8>> {
        self.copy_range_to_vec(self.position, self.remaining())
    }

    /// Copies `len` bytes at `offset`. Position and limit are untouched.
    pub fn copy_range_to_vec(&mut self, offset: usize, len: usize) -> Result<Vec<u8>> {
        self.check_read(offset, len)?;
        let mut out = vec![0; len];
        self.read_into_at(offset, &mut out)?;
        Ok(out)
    }

    /// An independent native cursor holding a copy of `[position, limit)`.
    pub fn copy_native(&mut self) -> Result<NativeBytes> {
        self.copy_range_native(self.position, self.remaining())
    }

    /// An independent native cursor holding a copy of `len` bytes at `offset`.
    pub fn copy_range_native(&mut self, offset: usize, len: usize) -> Result<NativeBytes> {
        let content = self.copy_range_to_vec(offset, len)?;
        let store = BytesStore::<NativeMemory>::allocate(content.len())?;
        store.write_from(0, &content)?;
        Ok(Bytes::wrap(store))
    }

    /// Returns the cursor's reservations. Any later access fails with a
    /// state error.
    pub fn release(&mut self) -> Result<()> {
        self.ensure_live()?;
        self.released = true;
        self.backing.release()
    }
}

impl<M: Memory> Bytes<Fixed<M>> {
    /// A cursor over `store`, taking over the caller's reservation.
    pub fn wrap(store: BytesStore<M>) -> Self {
        Self::from_backing(Fixed::new(store))
    }
}

impl<M: Allocate> Bytes<Fixed<M>> {
    pub fn allocate(capacity: usize) -> Result<Self> {
        Ok(Self::wrap(BytesStore::allocate(capacity)?))
    }
}

impl Bytes<Fixed<HeapMemory>> {
    /// A cursor reading `bytes` from the start, without copying.
    pub fn from_vec(bytes: Vec<u8>) -> Result<Self> {
        Ok(Self::wrap(BytesStore::from_vec(bytes)?))
    }
}

impl<M: Allocate> Bytes<Elastic<M>> {
    pub fn elastic(initial: usize) -> Result<Self> {
        Ok(Self::from_backing(Elastic::new(initial)?))
    }

    /// Caps growth at `max_capacity`; never below the current capacity.
    pub fn with_max_capacity(mut self, max_capacity: usize) -> Self {
        self.backing.set_max_capacity(max_capacity);
        self
    }

    pub fn max_capacity(&self) -> usize {
        self.backing.max_capacity()
    }
}

impl Bytes<Elastic<HeapMemory>> {
    pub fn elastic_heap(initial: usize) -> Result<Self> {
        Self::elastic(initial)
    }
}

impl Bytes<Elastic<NativeMemory>> {
    pub fn elastic_native(initial: usize) -> Result<Self> {
        Self::elastic(initial)
    }
}

macro_rules! streaming_reads {
    ($($read:ident => $read_at:ident: $ty:ty;)*) => {
        $(
            #[inline]
            fn $read(&mut self) -> Result<$ty> {
                let value = self.$read_at(self.position)?;
                self.position += size_of::<$ty>();
                Ok(value)
            }
        )*
    };
}

macro_rules! streaming_writes {
    ($($write:ident => $write_at:ident: $ty:ty;)*) => {
        $(
            #[inline]
            fn $write(&mut self, value: $ty) -> Result<()> {
                self.$write_at(self.position, value)?;
                self.position += size_of::<$ty>();
                Ok(())
            }
        )*
    };
}

impl<B: Backing> StreamingInput for Bytes<B> {
    fn position(&self) -> usize {
        self.position
    }

    fn limit(&self) -> usize {
        self.limit
    }

    fn set_position(&mut self, position: usize) -> Result<()> {
        let start = self.start();
        if position < start || position > self.limit {
            bail!(BytesError::out_of_bounds(position, 0, start, self.limit));
        }
        self.position = position;
        Ok(())
    }

    streaming_reads! {
        read_i8 => read_i8_at: i8;
        read_i16 => read_i16_at: i16;
        read_i32 => read_i32_at: i32;
        read_i64 => read_i64_at: i64;
        read_f32 => read_f32_at: f32;
        read_f64 => read_f64_at: f64;
    }

    fn read_bytes(&mut self, dst: &mut [u8]) -> Result<()> {
        self.read_into_at(self.position, dst)?;
        self.position += dst.len();
        Ok(())
    }
}

impl<B: Backing> StreamingOutput for Bytes<B> {
    streaming_writes! {
        write_i8 => write_i8_at: i8;
        write_i16 => write_i16_at: i16;
        write_i32 => write_i32_at: i32;
        write_i64 => write_i64_at: i64;
        write_f32 => write_f32_at: f32;
        write_f64 => write_f64_at: f64;
    }

    fn write_bytes(&mut self, src: &[u8]) -> Result<()> {
        self.write_from_at(self.position, src)?;
        self.position += src.len();
        Ok(())
    }

    fn append_utf8(&mut self, text: &str) -> Result<()> {
        let position = self.position;
        self.check_write(position, text.len())?;
        let store = self.backing.store_at(position)?;
        if store.contains(position, text.len()) {
            store.append_utf8(position, text)?;
        } else {
            self.write_from_at(position, text.as_bytes())?;
        }
        self.position += text.len();
        Ok(())
    }
}

impl<B: Backing> Drop for Bytes<B> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        if let Err(err) = self.backing.release() {
            warn!(error = %err, "failed to release cursor on drop");
        }
    }
}

impl<B: Backing> fmt::Debug for Bytes<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bytes")
            .field("kind", &<B::Memory as Memory>::KIND)
            .field("start", &self.start())
            .field("position", &self.position)
            .field("limit", &self.limit)
            .field("capacity", &self.capacity())
            .field("elastic", &self.is_elastic())
            .field("released", &self.released)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::StopChars;
    use crate::error::{classify, ErrorKind};
    use crate::refcount::ReferenceCounted;

    #[test]
    fn elastic_cursor_grows_without_loss() {
        let mut bytes = ElasticHeapBytes::elastic_heap(16).unwrap();

        for i in 0..32u8 {
            bytes.write_u8(i).unwrap();
        }
        assert!(bytes.capacity() >= 32);

        bytes.flip();
        let mut read = Vec::new();
        while bytes.remaining() > 0 {
            read.push(bytes.read_u8().unwrap());
        }
        assert_eq!(read, (0..32).collect::<Vec<u8>>());
    }

    #[test]
    fn elastic_native_respects_max_capacity() {
        let mut bytes = ElasticNativeBytes::elastic_native(8)
            .unwrap()
            .with_max_capacity(24);

        bytes.write_i64(1).unwrap();
        bytes.write_i64(2).unwrap();
        bytes.write_i64(3).unwrap();

        let err = bytes.write_i8(4).unwrap_err();
        assert_eq!(classify(&err), ErrorKind::Capacity);
    }

    #[test]
    fn fixed_cursor_write_past_capacity_is_capacity_error() {
        let mut bytes = NativeBytes::allocate(4).unwrap();

        bytes.write_i32(7).unwrap();
        let err = bytes.write_i8(1).unwrap_err();
        assert_eq!(classify(&err), ErrorKind::Capacity);
    }

    #[test]
    fn read_past_limit_is_bounds_error() {
        let mut bytes = HeapBytes::from_vec(vec![1, 2, 3]).unwrap();

        assert_eq!(bytes.read_i8().unwrap(), 1);
        let err = bytes.read_i32().unwrap_err();
        assert_eq!(classify(&err), ErrorKind::Bounds);
        assert_eq!(bytes.position(), 1);
    }

    #[test]
    fn narrowed_limit_is_not_widened_by_writes() {
        let mut bytes = ElasticHeapBytes::elastic_heap(16).unwrap();
        bytes.set_limit(4).unwrap();

        let err = bytes.write_i64(1).unwrap_err();
        assert_eq!(classify(&err), ErrorKind::Bounds);
        assert_eq!(bytes.capacity(), 16);
    }

    #[test]
    fn sequential_mixed_values() {
        let mut bytes = ElasticHeapBytes::elastic_heap(8).unwrap();

        bytes.write_stop_bit(300).unwrap();
        bytes.write_utf8(Some("héllo")).unwrap();
        bytes.write_utf8(None).unwrap();
        bytes.write_f64(2.5).unwrap();
        bytes.write_bool(true).unwrap();
        bytes.append_i64(-42).unwrap();
        bytes.write_u8(b',').unwrap();
        bytes.append_f64(0.1).unwrap();
        bytes.write_u8(b' ').unwrap();
        bytes.flip();

        assert_eq!(bytes.read_stop_bit().unwrap(), 300);
        assert_eq!(bytes.read_utf8().unwrap().as_deref(), Some("héllo"));
        assert_eq!(bytes.read_utf8().unwrap(), None);
        assert_eq!(bytes.read_f64().unwrap(), 2.5);
        assert!(bytes.read_bool().unwrap());
        assert_eq!(bytes.parse_i64().unwrap(), -42);
        assert_eq!(bytes.parse_f64().unwrap(), 0.1);
        assert_eq!(bytes.remaining(), 0);
    }

    #[test]
    fn parse_utf8_until_stop_char() {
        let mut bytes = HeapBytes::from_vec(b"name=value,next".to_vec()).unwrap();

        assert_eq!(bytes.parse_utf8(&|ch: char| ch == '=').unwrap(), "name");
        assert_eq!(bytes.parse_utf8(&StopChars::Comma).unwrap(), "value");
        assert_eq!(bytes.parse_utf8(&StopChars::Comma).unwrap(), "next");
        assert_eq!(bytes.remaining(), 0);
    }

    #[test]
    fn skip_to_reports_missing_stop_char() {
        let mut bytes = HeapBytes::from_vec(b"abc\ndef".to_vec()).unwrap();

        assert!(bytes.skip_to(&StopChars::NewLine).unwrap());
        assert_eq!(bytes.position(), 4);
        assert!(!bytes.skip_to(&StopChars::NewLine).unwrap());
        assert_eq!(bytes.remaining(), 0);
    }

    #[test]
    fn random_access_leaves_position_alone() {
        let mut bytes = NativeBytes::allocate(32).unwrap();

        bytes.write_i64_at(8, 99).unwrap();
        bytes.write_i16_at(30, -1).unwrap();

        assert_eq!(bytes.position(), 0);
        assert_eq!(bytes.read_i64_at(8).unwrap(), 99);
        assert_eq!(bytes.read_i16_at(30).unwrap(), -1);
        assert_eq!(
            classify(&bytes.read_i16_at(31).unwrap_err()),
            ErrorKind::Bounds
        );
    }

    #[test]
    fn get_and_add_at_offset() {
        let mut bytes = NativeBytes::allocate(16).unwrap();

        assert_eq!(bytes.get_and_add_i64_at(8, 10).unwrap(), 0);
        assert_eq!(bytes.get_and_add_i64_at(8, 5).unwrap(), 10);
        assert_eq!(bytes.read_volatile_i64_at(8).unwrap(), 15);

        bytes.write_ordered_i32_at(0, 3).unwrap();
        assert!(bytes.compare_and_swap_i32_at(0, 3, 4).unwrap());
        assert!(!bytes.compare_and_swap_i32_at(0, 3, 5).unwrap());
        assert_eq!(bytes.get_and_add_i32_at(0, 1).unwrap(), 4);
    }

    #[test]
    fn append_fixed_overwrites_in_place() {
        let mut bytes = HeapBytes::from_vec(b"count=00000;".to_vec()).unwrap();

        bytes.append_fixed_at(6, 42, 5).unwrap();
        assert_eq!(bytes.copy_to_vec().unwrap(), b"count=00042;");

        bytes.append_fixed_at(6, -7, 5).unwrap();
        assert_eq!(bytes.copy_to_vec().unwrap(), b"count=-0007;");

        assert!(bytes.append_fixed_at(6, 123_456, 5).is_err());
    }

    #[test]
    fn slice_shares_memory_and_never_grows() {
        let mut bytes = ElasticHeapBytes::elastic_heap(16).unwrap();
        bytes.write_bytes(b"0123456789").unwrap();
        bytes.flip();
        bytes.skip(2).unwrap();
        bytes.set_limit(6).unwrap();

        let mut slice = bytes.slice().unwrap();
        assert_eq!(slice.start(), 2);
        assert_eq!(slice.remaining(), 4);
        assert!(!slice.is_elastic());
        assert_eq!(slice.copy_to_vec().unwrap(), b"2345");

        slice.write_i8_at(2, b'X' as i8).unwrap();
        assert_eq!(bytes.read_u8_at(2).unwrap(), b'X');

        slice.set_position(6).unwrap();
        assert_eq!(classify(&slice.write_i8(0).unwrap_err()), ErrorKind::Capacity);
    }

    #[test]
    fn with_range_restores_state() {
        let mut bytes = HeapBytes::from_vec(b"header:body".to_vec()).unwrap();

        let header = bytes
            .with_range(0, 6, |b| b.read_utf8_len(6))
            .unwrap();
        assert_eq!(header, "header");
        assert_eq!(bytes.position(), 0);
        assert_eq!(bytes.limit(), 11);

        let failed = bytes.with_range(7, 9, |b| b.read_i32());
        assert!(failed.is_err());
        assert_eq!(bytes.cursor_state(), CursorState { position: 0, limit: 11 });
    }

    #[test]
    fn copy_native_is_independent() {
        let mut bytes = HeapBytes::from_vec(b"abcdef".to_vec()).unwrap();
        bytes.skip(1).unwrap();

        let mut copy = bytes.copy_native().unwrap();
        bytes.write_i8_at(1, b'Z' as i8).unwrap();

        assert_eq!(copy.copy_to_vec().unwrap(), b"bcdef");
    }

    #[test]
    fn range_copies_ignore_position() {
        let mut bytes = HeapBytes::from_vec(b"abcdef".to_vec()).unwrap();
        bytes.skip(4).unwrap();

        assert_eq!(bytes.copy_range_to_vec(1, 3).unwrap(), b"bcd");
        let mut copy = bytes.copy_range_native(0, 2).unwrap();
        assert_eq!(copy.copy_to_vec().unwrap(), b"ab");
        assert_eq!(bytes.position(), 4);

        let err = bytes.copy_range_to_vec(4, usize::MAX).unwrap_err();
        assert_eq!(classify(&err), ErrorKind::Bounds);
    }

    #[test]
    fn release_returns_reservation() {
        let store = BytesStore::<HeapMemory>::allocate(8).unwrap();
        let shared = store.share().unwrap();
        let mut bytes = HeapBytes::wrap(store);

        assert_eq!(shared.ref_count(), 2);
        bytes.release().unwrap();
        assert_eq!(shared.ref_count(), 1);

        assert_eq!(classify(&bytes.read_i8_at(0).unwrap_err()), ErrorKind::State);
        assert_eq!(classify(&bytes.release().unwrap_err()), ErrorKind::State);

        drop(bytes);
        assert_eq!(shared.ref_count(), 1);
    }

    #[test]
    fn drop_releases_once() {
        let store = BytesStore::<NativeMemory>::allocate(8).unwrap();
        let shared = store.share().unwrap();

        drop(NativeBytes::wrap(store));
        assert_eq!(shared.ref_count(), 1);
    }

    #[test]
    fn set_position_outside_limit_fails() {
        let mut bytes = HeapBytes::from_vec(vec![0; 4]).unwrap();

        assert!(bytes.set_position(4).is_ok());
        assert_eq!(classify(&bytes.set_position(5).unwrap_err()), ErrorKind::Bounds);
        assert_eq!(classify(&bytes.set_limit(3).unwrap_err()), ErrorKind::Bounds);
    }
}
