//! # Stop-Bit Integer Encoding
//!
//! Variable-length encoding of signed 64-bit values used for length prefixes
//! and compact numeric fields.
//!
//! ## Encoding Format
//!
//! Each byte carries 7 value bits in bits 0-6. Bit 7 is a continuation flag:
//! set on every byte except the last.
//!
//! | Value Range            | Bytes | Format                                   |
//! |------------------------|-------|------------------------------------------|
//! | 0 - 127                | 1     | `[v]`                                    |
//! | 128 - 16383            | 2     | `[0x80 + (v & 0x7F), v >> 7]`             |
//! | 16384 - i64::MAX       | 3-9   | 7-bit groups, low group first            |
//! | negative               | 2-10  | groups of `!v`, then a `0x00` terminator  |
//!
//! A negative value is stored as its bitwise complement. The complement's last
//! group keeps its continuation bit and is followed by a zero byte, which is
//! how the decoder tells a negative value from a positive one:
//!
//! ```text
//!  -1  = !0    -> [0x80, 0x00]
//!  -2  = !1    -> [0x81, 0x00]
//! -129 = !128  -> [0x80, 0x81, 0x00]
//! ```
//!
//! ## Decoder Limits
//!
//! A positive value may use at most 9 continuation bytes (terminal shift 56)
//! and a negative value at most 10 (terminal shift 63). Longer runs are
//! rejected as malformed, which bounds the bytes consumed from hostile input.
//! `i64::MIN` is the only value that needs all ten.
//!
//! ## Boundary Values
//!
//! - 127: Maximum 1-byte value
//! - 128: Minimum 2-byte value
//! - 16383: Maximum 2-byte value
//! - 16384: Minimum 3-byte value
//! - -1: Minimum 2-byte value (negatives never take the 1-byte form)
//! - i64::MAX: 9 bytes
//! - i64::MIN: 10 bytes
//!
//! ## Usage Example
//!
//! ```rust
//! use turbytes::encoding::stop_bit::{decode_stop_bit, encode_stop_bit, stop_bit_len};
//!
//! let mut buf = [0u8; 10];
//! let written = encode_stop_bit(1000, &mut buf);
//! assert_eq!(written, stop_bit_len(1000));
//!
//! let (value, read) = decode_stop_bit(&buf).unwrap();
//! assert_eq!(value, 1000);
//! assert_eq!(read, 2);
//! ```
//!
//! The slice functions allocate nothing; the streaming functions read and
//! write through [`StreamingInput`] / [`StreamingOutput`] so they work over
//! any cursor.

use eyre::{bail, Result};

use crate::bytes::{StreamingInput, StreamingOutput};
use crate::config::{STOP_BIT_MAX_BYTES, STOP_BIT_NEGATIVE_LIMIT, STOP_BIT_POSITIVE_LIMIT};
use crate::error::BytesError;

pub fn stop_bit_len(value: i64) -> usize {
    if value & !0x7F == 0 {
        return 1;
    }
    if value & !0x3FFF == 0 {
        return 2;
    }

    let negative = value < 0;
    let mut n = (if negative { !value } else { value }) as u64;
    let mut len = 1;
    while n >> 7 != 0 {
        n >>= 7;
        len += 1;
    }
    if negative {
        len + 1
    } else {
        len
    }
}

/// Encodes `value` into `buf`, returning the number of bytes written.
///
/// `buf` must hold at least [`stop_bit_len`] bytes; [`STOP_BIT_MAX_BYTES`]
/// always suffices.
pub fn encode_stop_bit(value: i64, buf: &mut [u8]) -> usize {
    if value & !0x7F == 0 {
        buf[0] = value as u8;
        return 1;
    }
    if value & !0x3FFF == 0 {
        buf[0] = (value as u8 & 0x7F) | 0x80;
        buf[1] = (value >> 7) as u8;
        return 2;
    }

    let negative = value < 0;
    let mut n = (if negative { !value } else { value }) as u64;
    let mut i = 0;
    while n >> 7 != 0 {
        buf[i] = 0x80 | n as u8;
        n >>= 7;
        i += 1;
    }
    if negative {
        buf[i] = 0x80 | n as u8;
        buf[i + 1] = 0;
        i + 2
    } else {
        buf[i] = n as u8;
        i + 1
    }
}

/// Decodes one value from the front of `buf`, returning it with the number of
/// bytes consumed.
pub fn decode_stop_bit(buf: &[u8]) -> Result<(i64, usize)> {
    let mut consumed = 0;
    let value = decode(0, || {
        let Some(byte) = buf.get(consumed) else {
            bail!(BytesError::malformed(consumed, "truncated stop-bit value"));
        };
        consumed += 1;
        Ok(*byte as i8)
    })?;
    Ok((value, consumed))
}

pub fn write_stop_bit<O: StreamingOutput + ?Sized>(out: &mut O, value: i64) -> Result<()> {
    if value & !0x7F == 0 {
        return out.write_i8(value as i8);
    }
    let mut buf = [0u8; STOP_BIT_MAX_BYTES];
    let len = encode_stop_bit(value, &mut buf);
    out.write_bytes(&buf[..len])
}

pub fn read_stop_bit<I: StreamingInput + ?Sized>(input: &mut I) -> Result<i64> {
    let first = input.read_i8()?;
    if first >= 0 {
        return Ok(first as i64);
    }
    let position = input.position() - 1;
    let mut started = false;
    decode(position, || {
        if !started {
            started = true;
            return Ok(first);
        }
        input.read_i8()
    })
}

/// Shared decode loop. `next` yields the encoded bytes in order, starting with
/// the first one; `position` locates the value in error messages.
fn decode(position: usize, mut next: impl FnMut() -> Result<i8>) -> Result<i64> {
    let first = next()?;
    if first >= 0 {
        return Ok(first as i64);
    }

    let mut value = (first as i64) & 0x7F;
    let mut shift = 7u32;
    let mut terminal = next()?;
    while terminal < 0 {
        if shift > STOP_BIT_NEGATIVE_LIMIT {
            bail!(BytesError::malformed(
                position,
                "more than 10 stop-bit continuation bytes"
            ));
        }
        value |= ((terminal as i64) & 0x7F) << shift;
        shift += 7;
        terminal = next()?;
    }

    if terminal != 0 {
        if shift > STOP_BIT_POSITIVE_LIMIT {
            bail!(BytesError::malformed(
                position,
                "cannot read more than 9 stop bits of positive value"
            ));
        }
        Ok(value | ((terminal as i64) << shift))
    } else {
        if shift > STOP_BIT_NEGATIVE_LIMIT {
            bail!(BytesError::malformed(
                position,
                "cannot read more than 10 stop bits of negative value"
            ));
        }
        Ok(!value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{classify, ErrorKind};

    fn encoded(value: i64) -> Vec<u8> {
        let mut buf = [0u8; STOP_BIT_MAX_BYTES];
        let len = encode_stop_bit(value, &mut buf);
        buf[..len].to_vec()
    }

    #[test]
    fn stop_bit_len_boundaries() {
        assert_eq!(stop_bit_len(0), 1);
        assert_eq!(stop_bit_len(127), 1);
        assert_eq!(stop_bit_len(128), 2);
        assert_eq!(stop_bit_len(16383), 2);
        assert_eq!(stop_bit_len(16384), 3);
        assert_eq!(stop_bit_len(-1), 2);
        assert_eq!(stop_bit_len(i64::MAX), 9);
        assert_eq!(stop_bit_len(i64::MIN), 10);
    }

    #[test]
    fn stop_bit_len_matches_encoder() {
        for value in [
            0, 1, 127, 128, 300, 16383, 16384, 1 << 21, 1 << 35, i64::MAX, -1, -2, -64, -65, -128,
            -129, -16384, i64::MIN,
        ] {
            assert_eq!(stop_bit_len(value), encoded(value).len(), "value {}", value);
        }
    }

    #[test]
    fn encode_small_values() {
        assert_eq!(encoded(0), [0x00]);
        assert_eq!(encoded(127), [0x7F]);
        assert_eq!(encoded(128), [0x80, 0x01]);
        assert_eq!(encoded(16383), [0xFF, 0x7F]);
        assert_eq!(encoded(16384), [0x80, 0x80, 0x01]);
    }

    #[test]
    fn encode_negative_values() {
        assert_eq!(encoded(-1), [0x80, 0x00]);
        assert_eq!(encoded(-2), [0x81, 0x00]);
        assert_eq!(encoded(-129), [0x80, 0x81, 0x00]);
    }

    #[test]
    fn decode_boundaries() {
        for value in [0, 127, 128, 16383, 16384, i64::MAX, -1, -129, i64::MIN] {
            let bytes = encoded(value);
            let (decoded, read) = decode_stop_bit(&bytes).unwrap();
            assert_eq!(decoded, value);
            assert_eq!(read, bytes.len());
        }
    }

    #[test]
    fn decode_ignores_trailing_bytes() {
        let (value, read) = decode_stop_bit(&[0x80, 0x01, 0xFF, 0xFF]).unwrap();
        assert_eq!(value, 128);
        assert_eq!(read, 2);
    }

    #[test]
    fn decode_truncated_fails() {
        assert!(decode_stop_bit(&[]).is_err());

        let err = decode_stop_bit(&[0x80, 0x80]).unwrap_err();
        assert_eq!(classify(&err), ErrorKind::Format);
    }

    #[test]
    fn decode_rejects_ten_positive_groups() {
        let mut bytes = vec![0x81; 9];
        bytes.push(0x01);

        let err = decode_stop_bit(&bytes).unwrap_err();
        assert_eq!(classify(&err), ErrorKind::Format);
        assert!(err.to_string().contains("9 stop bits"));
    }

    #[test]
    fn decode_rejects_endless_continuation() {
        let bytes = vec![0xFF; 64];

        let err = decode_stop_bit(&bytes).unwrap_err();
        assert_eq!(classify(&err), ErrorKind::Format);
    }

    #[test]
    fn decode_accepts_ten_negative_groups() {
        let bytes = encoded(i64::MIN);
        assert_eq!(bytes.len(), 10);
        assert_eq!(bytes[9], 0);

        let (value, _) = decode_stop_bit(&bytes).unwrap();
        assert_eq!(value, i64::MIN);
    }
}
