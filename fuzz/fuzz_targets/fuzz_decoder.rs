//! Fuzz testing for the stream decoders.
//!
//! Feeds arbitrary bytes to every decoder that reads untrusted input and
//! checks that each one either decodes or reports an error, without
//! panicking and without reading past the cursor's limit.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use turbytes::bytes::{HeapBytes, StreamingInput};
use turbytes::encoding::decimal::{format_decimal, parse_decimal, DecimalBuf};
use turbytes::encoding::stop_bit::decode_stop_bit;
use turbytes::encoding::utf8::decode_utf8;
use turbytes::encoding::StopChars;

#[derive(Debug, Arbitrary)]
struct DecoderInput {
    ops: Vec<Op>,
    data: Vec<u8>,
}

#[derive(Debug, Arbitrary, Clone, Copy)]
enum Op {
    StopBit,
    Utf8,
    Utf8Len(u8),
    ParseI64,
    ParseF64,
    ParseUntilComma,
    SkipToNewLine,
    Bool,
}

fuzz_target!(|input: DecoderInput| {
    let _ = decode_stop_bit(&input.data);
    let _ = decode_utf8(&input.data);

    if let Ok(value) = parse_decimal(&input.data) {
        if value.is_finite() {
            let mut text = DecimalBuf::new();
            format_decimal(value, &mut text);
            let reparsed = parse_decimal(&text).expect("formatted decimal must parse");
            assert_eq!(reparsed.to_bits(), value.to_bits());
        }
    }

    let Ok(mut bytes) = HeapBytes::from_vec(input.data) else {
        return;
    };
    for op in input.ops.iter().take(64) {
        let before = bytes.position();
        let result = match *op {
            Op::StopBit => bytes.read_stop_bit().map(|_| ()),
            Op::Utf8 => bytes.read_utf8().map(|_| ()),
            Op::Utf8Len(len) => bytes.read_utf8_len(len as usize).map(|_| ()),
            Op::ParseI64 => bytes.parse_i64().map(|_| ()),
            Op::ParseF64 => bytes.parse_f64().map(|_| ()),
            Op::ParseUntilComma => bytes.parse_utf8(&StopChars::Comma).map(|_| ()),
            Op::SkipToNewLine => bytes.skip_to(&StopChars::NewLine).map(|_| ()),
            Op::Bool => bytes.read_bool().map(|_| ()),
        };
        assert!(bytes.position() <= bytes.limit());
        if result.is_err() && bytes.remaining() == 0 && before == bytes.position() {
            break;
        }
    }
});
