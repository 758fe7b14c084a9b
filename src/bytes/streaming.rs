//! # Streaming Contract
//!
//! [`StreamingInput`] and [`StreamingOutput`] are the sequential half of a
//! cursor: every call reads or writes at the current position and advances
//! it. Implementors supply the signed primitives and bulk transfer; the
//! unsigned helpers and every codec are provided on top of those.
//!
//! ```text
//! start        position              limit          capacity
//!   |------------|=====================|---------------|
//!                 <---- remaining ---->
//! ```
//!
//! Multi-byte values use native byte order. Booleans are a single byte:
//! `'Y'` for true and `0` for false; reading accepts any non-zero byte other
//! than `'N'` or `'n'` as true.

use eyre::Result;

use crate::encoding::stop_chars::{self, StopCharTester};
use crate::encoding::{decimal, integer, stop_bit, utf8};
use crate::error::BytesError;

pub trait StreamingInput {
    fn position(&self) -> usize;

    fn limit(&self) -> usize;

    fn remaining(&self) -> usize {
        self.limit().saturating_sub(self.position())
    }

    fn set_position(&mut self, position: usize) -> Result<()>;

    fn skip(&mut self, len: usize) -> Result<()> {
        let position = self.position();
        match position.checked_add(len) {
            Some(next) => self.set_position(next),
            None => Err(BytesError::out_of_bounds(position, len, position, self.limit()).into()),
        }
    }

    fn read_i8(&mut self) -> Result<i8>;

    fn read_i16(&mut self) -> Result<i16>;

    fn read_i32(&mut self) -> Result<i32>;

    fn read_i64(&mut self) -> Result<i64>;

    /// Fills `dst` from the stream.
    fn read_bytes(&mut self, dst: &mut [u8]) -> Result<()>;

    fn read_f32(&mut self) -> Result<f32> {
        Ok(f32::from_bits(self.read_i32()? as u32))
    }

    fn read_f64(&mut self) -> Result<f64> {
        Ok(f64::from_bits(self.read_i64()? as u64))
    }

    fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_i8()? as u8)
    }

    fn read_u16(&mut self) -> Result<u16> {
        Ok(self.read_i16()? as u16)
    }

    fn read_u32(&mut self) -> Result<u32> {
        Ok(self.read_i32()? as u32)
    }

    fn read_bool(&mut self) -> Result<bool> {
        let byte = self.read_u8()?;
        Ok(byte != 0 && byte != b'N' && byte != b'n')
    }

    fn read_stop_bit(&mut self) -> Result<i64> {
        stop_bit::read_stop_bit(self)
    }

    /// Reads a length-prefixed text value; `None` when the value is absent.
    fn read_utf8(&mut self) -> Result<Option<String>> {
        utf8::read_utf8(self)
    }

    fn read_utf8_len(&mut self, len: usize) -> Result<String> {
        utf8::read_utf8_len(self, len)
    }

    fn parse_utf8<T: StopCharTester + ?Sized>(&mut self, tester: &T) -> Result<String>
    where
        Self: Sized,
    {
        stop_chars::parse_utf8(self, tester)
    }

    fn skip_to<T: StopCharTester + ?Sized>(&mut self, tester: &T) -> Result<bool>
    where
        Self: Sized,
    {
        stop_chars::skip_to(self, tester)
    }

    fn parse_i64(&mut self) -> Result<i64> {
        integer::parse_i64(self)
    }

    fn parse_f64(&mut self) -> Result<f64> {
        decimal::parse_f64(self)
    }
}

pub trait StreamingOutput {
    fn write_i8(&mut self, value: i8) -> Result<()>;

    fn write_i16(&mut self, value: i16) -> Result<()>;

    fn write_i32(&mut self, value: i32) -> Result<()>;

    fn write_i64(&mut self, value: i64) -> Result<()>;

    fn write_bytes(&mut self, src: &[u8]) -> Result<()>;

    fn write_f32(&mut self, value: f32) -> Result<()> {
        self.write_i32(value.to_bits() as i32)
    }

    fn write_f64(&mut self, value: f64) -> Result<()> {
        self.write_i64(value.to_bits() as i64)
    }

    fn write_u8(&mut self, value: u8) -> Result<()> {
        self.write_i8(value as i8)
    }

    fn write_u16(&mut self, value: u16) -> Result<()> {
        self.write_i16(value as i16)
    }

    fn write_u32(&mut self, value: u32) -> Result<()> {
        self.write_i32(value as i32)
    }

    fn write_bool(&mut self, flag: bool) -> Result<()> {
        self.write_u8(if flag { b'Y' } else { 0 })
    }

    fn write_stop_bit(&mut self, value: i64) -> Result<()> {
        stop_bit::write_stop_bit(self, value)
    }

    /// Writes a length-prefixed text value; `None` is written as length -1.
    fn write_utf8(&mut self, text: Option<&str>) -> Result<()> {
        utf8::write_utf8(self, text)
    }

    /// Writes the encoded characters of `text` with no length prefix.
    fn append_utf8(&mut self, text: &str) -> Result<()> {
        utf8::append_utf8(self, text)
    }

    fn append_i64(&mut self, value: i64) -> Result<()> {
        integer::append_i64(self, value)
    }

    fn append_f64(&mut self, value: f64) -> Result<()> {
        decimal::append_f64(self, value)
    }
}
