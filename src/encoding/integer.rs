//! # Integer Text
//!
//! Decimal text for `i64` values: free-form append, fixed-width overwrite and
//! a permissive parser.
//!
//! ## Parsing Rules
//!
//! [`parse_i64`] consumes bytes until the first byte that is neither a digit
//! nor `-`, consuming that terminator as well. A `-` anywhere marks the value
//! negative; digits accumulate with wrapping arithmetic.
//!
//! ```text
//! "123,"    -> 123  (',' consumed)
//! "-42 x"   -> -42  (' ' consumed)
//! "4-2\n"   -> -42
//! ```
//!
//! ## Fixed Width
//!
//! [`format_fixed`] writes exactly `digits` bytes, left-padded with zeros, so
//! a shorter number overwrites a longer one in place. A negative value spends
//! the first byte on the sign.

use eyre::{bail, Result};

use crate::bytes::{StreamingInput, StreamingOutput};

/// Longest decimal form of an `i64`, sign included.
pub const MAX_I64_TEXT: usize = 20;

/// Formats `value` right-aligned into `buf`, returning the start index.
pub fn format_i64(value: i64, buf: &mut [u8; MAX_I64_TEXT]) -> usize {
    let mut n = value.unsigned_abs();
    let mut start = MAX_I64_TEXT;
    loop {
        start -= 1;
        buf[start] = b'0' + (n % 10) as u8;
        n /= 10;
        if n == 0 {
            break;
        }
    }
    if value < 0 {
        start -= 1;
        buf[start] = b'-';
    }
    start
}

pub fn append_i64<O: StreamingOutput + ?Sized>(out: &mut O, value: i64) -> Result<()> {
    if (0..10).contains(&value) {
        return out.write_u8(b'0' + value as u8);
    }
    let mut buf = [0u8; MAX_I64_TEXT];
    let start = format_i64(value, &mut buf);
    out.write_bytes(&buf[start..])
}

/// Writes `value` into all of `out` as zero-padded decimal text.
pub fn format_fixed(value: i64, out: &mut [u8]) -> Result<()> {
    let digits = out.len();
    if digits == 0 {
        bail!("number {} too large for 0 digits", value);
    }

    let negative = value < 0;
    let mut n = value.unsigned_abs();
    for slot in out[1..].iter_mut().rev() {
        *slot = b'0' + (n % 10) as u8;
        n /= 10;
    }

    if negative {
        if n != 0 {
            bail!("number {} too large for {} digits", value, digits);
        }
        out[0] = b'-';
    } else {
        if n > 9 {
            bail!("number {} too large for {} digits", value, digits);
        }
        out[0] = b'0' + n as u8;
    }
    Ok(())
}

pub fn parse_i64<I: StreamingInput + ?Sized>(input: &mut I) -> Result<i64> {
    let mut value: i64 = 0;
    let mut negative = false;

    while input.remaining() > 0 {
        let byte = input.read_u8()?;
        match byte {
            b'0'..=b'9' => {
                value = value.wrapping_mul(10).wrapping_add((byte - b'0') as i64);
            }
            b'-' => negative = true,
            _ => break,
        }
    }

    Ok(if negative { value.wrapping_neg() } else { value })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn formatted(value: i64) -> String {
        let mut buf = [0u8; MAX_I64_TEXT];
        let start = format_i64(value, &mut buf);
        String::from_utf8(buf[start..].to_vec()).unwrap()
    }

    fn fixed(value: i64, digits: usize) -> Result<String> {
        let mut out = vec![0u8; digits];
        format_fixed(value, &mut out)?;
        Ok(String::from_utf8(out).unwrap())
    }

    #[test]
    fn format_i64_matches_display() {
        for value in [0, 7, -7, 10, 99, -100, 1_234_567_890, i64::MAX, i64::MIN] {
            assert_eq!(formatted(value), value.to_string());
        }
    }

    #[test]
    fn format_i64_min_uses_full_buffer() {
        let mut buf = [0u8; MAX_I64_TEXT];
        assert_eq!(format_i64(i64::MIN, &mut buf), 0);
    }

    #[test]
    fn format_fixed_pads_with_zeros() {
        assert_eq!(fixed(42, 5).unwrap(), "00042");
        assert_eq!(fixed(-42, 5).unwrap(), "-0042");
        assert_eq!(fixed(0, 1).unwrap(), "0");
        assert_eq!(fixed(99_999, 5).unwrap(), "99999");
    }

    #[test]
    fn format_fixed_rejects_overflow() {
        assert!(fixed(100_000, 5).is_err());
        assert!(fixed(-10_000, 5).is_err());
        assert!(fixed(1, 0).is_err());
    }
}
