//! # Compact Text Encoding
//!
//! Code points are stored in one to four bytes:
//!
//! | Code Point          | Bytes | Layout                                  |
//! |---------------------|-------|-----------------------------------------|
//! | U+0000 - U+007F     | 1     | `0xxxxxxx`                              |
//! | U+0080 - U+07FF     | 2     | `110xxxxx 10xxxxxx`                     |
//! | U+0800 - U+FFFF     | 3     | `1110xxxx 10xxxxxx 10xxxxxx`            |
//! | U+10000 - U+10FFFF  | 4     | `11110xxx 10xxxxxx 10xxxxxx 10xxxxxx`   |
//!
//! Every continuation byte must match `10xxxxxx`; the decoder reports the
//! offending byte position otherwise.
//!
//! ## Wire Format
//!
//! A text value is a stop-bit byte length followed by the encoded bytes. A
//! length of `-1` marks an absent value:
//!
//! ```text
//! None        -> [0x80, 0x00]
//! Some("")    -> [0x00]
//! Some("hé")  -> [0x03, 'h', 0xC3, 0xA9]
//! ```

use eyre::{bail, Result};

use crate::bytes::{StreamingInput, StreamingOutput};
use crate::error::BytesError;

/// Encodes one character, returning the bytes and how many of them are used.
#[inline]
pub fn encode_char(ch: char) -> ([u8; 4], usize) {
    let c = ch as u32;
    if c <= 0x7F {
        ([c as u8, 0, 0, 0], 1)
    } else if c <= 0x7FF {
        ([0xC0 | (c >> 6) as u8, 0x80 | (c & 0x3F) as u8, 0, 0], 2)
    } else if c <= 0xFFFF {
        (
            [
                0xE0 | (c >> 12) as u8,
                0x80 | ((c >> 6) & 0x3F) as u8,
                0x80 | (c & 0x3F) as u8,
                0,
            ],
            3,
        )
    } else {
        (
            [
                0xF0 | (c >> 18) as u8,
                0x80 | ((c >> 12) & 0x3F) as u8,
                0x80 | ((c >> 6) & 0x3F) as u8,
                0x80 | (c & 0x3F) as u8,
            ],
            4,
        )
    }
}

/// Number of continuation bytes that follow `lead`, or `None` if `lead`
/// cannot start a character.
#[inline]
fn continuation_count(lead: u8) -> Option<usize> {
    match lead {
        0x00..=0x7F => Some(0),
        0xC0..=0xDF => Some(1),
        0xE0..=0xEF => Some(2),
        0xF0..=0xF7 => Some(3),
        _ => None,
    }
}

#[inline]
fn lead_bits(lead: u8, continuations: usize) -> u32 {
    match continuations {
        0 => lead as u32,
        1 => (lead & 0x1F) as u32,
        2 => (lead & 0x0F) as u32,
        _ => (lead & 0x07) as u32,
    }
}

fn to_char(code: u32, position: usize) -> Result<char> {
    match char::from_u32(code) {
        Some(ch) => Ok(ch),
        None => bail!(BytesError::malformed(
            position,
            format!("invalid code point U+{:X}", code)
        )),
    }
}

/// Decodes a complete encoded buffer. `base` is added to byte positions in
/// error messages.
pub fn decode_utf8_at(bytes: &[u8], base: usize) -> Result<String> {
    let mut text = String::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        let lead = bytes[i];
        if lead < 0x80 {
            text.push(lead as char);
            i += 1;
            continue;
        }

        let Some(count) = continuation_count(lead) else {
            bail!(BytesError::malformed(
                base + i,
                format!("unexpected byte 0x{:02X} at start of character", lead)
            ));
        };
        if i + count >= bytes.len() {
            bail!(BytesError::malformed(base + i, "partial character at end"));
        }

        let mut code = lead_bits(lead, count);
        for j in 1..=count {
            let byte = bytes[i + j];
            if byte & 0xC0 != 0x80 {
                bail!(BytesError::malformed(
                    base + i + j,
                    format!("malformed continuation byte 0x{:02X}", byte)
                ));
            }
            code = (code << 6) | (byte & 0x3F) as u32;
        }

        text.push(to_char(code, base + i)?);
        i += count + 1;
    }

    Ok(text)
}

pub fn decode_utf8(bytes: &[u8]) -> Result<String> {
    decode_utf8_at(bytes, 0)
}

/// Reads one character from a stream.
pub fn read_char<I: StreamingInput + ?Sized>(input: &mut I) -> Result<char> {
    let position = input.position();
    let lead = input.read_u8()?;
    if lead < 0x80 {
        return Ok(lead as char);
    }

    let Some(count) = continuation_count(lead) else {
        bail!(BytesError::malformed(
            position,
            format!("unexpected byte 0x{:02X} at start of character", lead)
        ));
    };
    if input.remaining() < count {
        bail!(BytesError::malformed(position, "partial character at end"));
    }

    let mut code = lead_bits(lead, count);
    for j in 1..=count {
        let byte = input.read_u8()?;
        if byte & 0xC0 != 0x80 {
            bail!(BytesError::malformed(
                position + j,
                format!("malformed continuation byte 0x{:02X}", byte)
            ));
        }
        code = (code << 6) | (byte & 0x3F) as u32;
    }
    to_char(code, position)
}

/// Writes `text` character by character, without a length prefix.
pub fn append_utf8<O: StreamingOutput + ?Sized>(out: &mut O, text: &str) -> Result<()> {
    for ch in text.chars() {
        let (bytes, len) = encode_char(ch);
        if len == 1 {
            out.write_u8(bytes[0])?;
        } else {
            out.write_bytes(&bytes[..len])?;
        }
    }
    Ok(())
}

/// Writes a length-prefixed text value; `None` is written as length `-1`.
pub fn write_utf8<O: StreamingOutput + ?Sized>(out: &mut O, text: Option<&str>) -> Result<()> {
    match text {
        None => out.write_stop_bit(-1),
        Some(text) => {
            out.write_stop_bit(text.len() as i64)?;
            out.append_utf8(text)
        }
    }
}

/// Reads a length-prefixed text value written by [`write_utf8`].
pub fn read_utf8<I: StreamingInput + ?Sized>(input: &mut I) -> Result<Option<String>> {
    let position = input.position();
    let len = input.read_stop_bit()?;
    if len == -1 {
        return Ok(None);
    }
    if len < 0 {
        bail!(BytesError::malformed(
            position,
            format!("invalid text length {}", len)
        ));
    }
    read_utf8_len(input, len as usize).map(Some)
}

/// Decodes exactly `len` encoded bytes from the stream.
pub fn read_utf8_len<I: StreamingInput + ?Sized>(input: &mut I, len: usize) -> Result<String> {
    let position = input.position();
    if len > input.remaining() {
        bail!(BytesError::out_of_bounds(
            position,
            len,
            position,
            input.limit()
        ));
    }

    let mut bytes = vec![0u8; len];
    input.read_bytes(&mut bytes)?;
    decode_utf8_at(&bytes, position)
}
