//! # Encoding Module
//!
//! Binary and text codecs that run over the streaming cursor contract:
//!
//! - **Stop-bit**: variable-length signed integers for lengths and compact fields
//! - **UTF-8**: compact text encoding and length-prefixed text values
//! - **Decimal**: exact, shortest `f64` to decimal text and back
//! - **Integer**: `i64` decimal text, including fixed-width in-place fields
//! - **Stop chars**: delimiter-terminated text parsing

pub mod decimal;
pub mod integer;
pub mod stop_bit;
pub mod stop_chars;
pub mod utf8;

pub use decimal::{format_decimal, parse_decimal, to_decimal_string};
pub use stop_bit::{decode_stop_bit, encode_stop_bit, stop_bit_len};
pub use stop_chars::{for_chars, StopCharSet, StopCharTester, StopChars};
pub use utf8::{decode_utf8, encode_char};
