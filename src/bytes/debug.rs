//! Text renderings of a cursor for logs and test failures.
//!
//! Neither rendering moves the position.
//!
//! ```text
//! to_hex_string, 16 bytes per row, offsets absolute:
//! 00000000 48 65 6c 6c 6f 2c 20 77  6f 72 6c 64 0a          Hello, w orld·
//!
//! to_debug_string(4), position 5:
//! [pos: 5, lim: 13, cap: 16 ] ello‖, wo
//! ```

use std::fmt::Write;

use eyre::Result;

use super::{Backing, Bytes};
use crate::config::{HEX_DUMP_WIDTH, MAPPED_CAPACITY};

const HEX_DIGITS: &[u8; 16] = b"0123456789abcdef";

#[inline]
fn printable(byte: u8) -> char {
    if (b' '..=b'~').contains(&byte) {
        byte as char
    } else {
        '·'
    }
}

impl<B: Backing> Bytes<B> {
    /// Hex dump of `[position, limit)`.
    pub fn to_hex_string(&mut self) -> Result<String> {
        self.to_hex_string_range(self.position, self.remaining())
    }

    /// Hex dump of `len` bytes at `offset`, independent of position and
    /// limit. Rows stay aligned to absolute offsets.
    pub fn to_hex_string_range(&mut self, offset: usize, len: usize) -> Result<String> {
        let content = self.copy_range_to_vec(offset, len)?;
        if content.is_empty() {
            return Ok(String::new());
        }

        let end = offset + content.len();
        let first_row = offset / HEX_DUMP_WIDTH * HEX_DUMP_WIDTH;
        let byte_at = |i: usize| (offset..end).contains(&i).then(|| content[i - offset]);

        let mut out = String::new();
        for row in (first_row..end).step_by(HEX_DUMP_WIDTH) {
            let _ = write!(out, "{:08x}", row);
            for j in 0..HEX_DUMP_WIDTH {
                if j == HEX_DUMP_WIDTH / 2 {
                    out.push(' ');
                }
                match byte_at(row + j) {
                    Some(byte) => {
                        out.push(' ');
                        out.push(HEX_DIGITS[(byte >> 4) as usize] as char);
                        out.push(HEX_DIGITS[(byte & 15) as usize] as char);
                    }
                    None => out.push_str("   "),
                }
            }
            out.push(' ');
            for j in 0..HEX_DUMP_WIDTH {
                if j == HEX_DUMP_WIDTH / 2 {
                    out.push(' ');
                }
                out.push(byte_at(row + j).map_or(' ', printable));
            }
            out.push('\n');
        }
        Ok(out)
    }

    /// Cursor state followed by up to `max_len` bytes either side of the
    /// position, separated by `‖`.
    pub fn to_debug_string(&mut self, max_len: usize) -> Result<String> {
        let position = self.position;
        let limit = self.limit;
        let capacity = self.capacity();

        let mut out = String::with_capacity(64 + 2 * max_len);
        let _ = write!(out, "[pos: {}, lim: {}, cap: ", position, limit);
        if capacity as u64 == MAPPED_CAPACITY {
            out.push_str("1TiB");
        } else {
            let _ = write!(out, "{}", capacity);
        }
        out.push_str(" ] ");

        let before = position.saturating_sub(max_len).max(self.start());
        if position > before {
            let mut bytes = vec![0u8; position.min(limit) - before];
            self.read_into_at(before, &mut bytes)?;
            out.extend(bytes.into_iter().map(printable));
            out.push('‖');
            if position >= limit {
                return Ok(out);
            }
        }

        let after = position.saturating_add(max_len).min(limit);
        let mut bytes = vec![0u8; after.saturating_sub(position)];
        self.read_into_at(position, &mut bytes)?;
        out.extend(bytes.into_iter().map(printable));
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use crate::bytes::{HeapBytes, StreamingInput};

    #[test]
    fn hex_string_aligns_rows() {
        let mut bytes = HeapBytes::from_vec(b"Hello, world\n".to_vec()).unwrap();

        let dump = bytes.to_hex_string().unwrap();
        assert_eq!(
            dump,
            "00000000 48 65 6c 6c 6f 2c 20 77  6f 72 6c 64 0a          Hello, w orld·   \n"
        );
    }

    #[test]
    fn hex_string_starts_mid_row() {
        let mut bytes = HeapBytes::from_vec((0u8..20).collect()).unwrap();
        bytes.skip(18).unwrap();

        let dump = bytes.to_hex_string().unwrap();
        let lines: Vec<&str> = dump.lines().collect();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("00000010       12 13"));
    }

    #[test]
    fn hex_string_of_explicit_range() {
        let mut bytes = HeapBytes::from_vec((0u8..40).collect()).unwrap();
        bytes.skip(30).unwrap();

        let dump = bytes.to_hex_string_range(16, 2).unwrap();
        assert_eq!(dump.lines().count(), 1);
        assert!(dump.starts_with("00000010 10 11   "));
        assert_eq!(bytes.position(), 30);
    }

    #[test]
    fn debug_string_marks_position() {
        let mut bytes = HeapBytes::from_vec(b"Hello, world".to_vec()).unwrap();
        bytes.skip(5).unwrap();

        assert_eq!(
            bytes.to_debug_string(4).unwrap(),
            "[pos: 5, lim: 12, cap: 12 ] ello‖, wo"
        );
    }

    #[test]
    fn debug_string_at_start_and_end() {
        let mut bytes = HeapBytes::from_vec(b"abc".to_vec()).unwrap();
        assert_eq!(bytes.to_debug_string(8).unwrap(), "[pos: 0, lim: 3, cap: 3 ] abc");

        bytes.skip(3).unwrap();
        assert_eq!(bytes.to_debug_string(8).unwrap(), "[pos: 3, lim: 3, cap: 3 ] abc‖");
    }

    #[test]
    fn empty_hex_string() {
        let mut bytes = HeapBytes::from_vec(Vec::new()).unwrap();
        assert_eq!(bytes.to_hex_string().unwrap(), "");
    }
}
