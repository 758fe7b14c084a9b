//! # Cursor Integration Tests
//!
//! Elastic growth, text framing and bounds behavior through the public cursor
//! API, over heap and native memory.

use turbytes::bytes::{ElasticHeapBytes, ElasticNativeBytes, HeapBytes, NativeBytes};
use turbytes::encoding::StopChars;
use turbytes::store::HeapStore;
use turbytes::{classify, ErrorKind, StreamingInput, StreamingOutput};

mod elastic_growth_tests {
    use super::*;

    #[test]
    fn capacity_16_grows_across_32_sequential_bytes() {
        let mut bytes = ElasticNativeBytes::elastic_native(16).unwrap();
        assert_eq!(bytes.capacity(), 16);

        for i in 0..32u8 {
            bytes.write_u8(i).unwrap();
        }
        assert!(bytes.capacity() >= 32);

        bytes.flip();
        for i in 0..32u8 {
            assert_eq!(bytes.read_u8().unwrap(), i, "byte {} SHOULD survive growth", i);
        }
        assert_eq!(bytes.remaining(), 0);
    }

    #[test]
    fn growth_stops_at_max_capacity() {
        let mut bytes = ElasticHeapBytes::elastic_heap(8).unwrap().with_max_capacity(24);

        bytes.write_i64(1).unwrap();
        bytes.write_i64(2).unwrap();
        bytes.write_i64(3).unwrap();
        assert_eq!(bytes.capacity(), 24);

        let err = bytes.write_i8(4).unwrap_err();
        assert_eq!(classify(&err), ErrorKind::Capacity);
    }

    #[test]
    fn long_text_grows_the_store() {
        let text = "grows past the first store: ".repeat(20);
        let mut bytes = ElasticHeapBytes::elastic_heap(16).unwrap();

        bytes.write_utf8(Some(&text)).unwrap();
        bytes.flip();
        assert_eq!(bytes.read_utf8().unwrap().as_deref(), Some(text.as_str()));
    }
}

mod text_framing_tests {
    use super::*;

    #[test]
    fn minus_one_prefix_reads_as_absent() {
        let mut bytes = HeapBytes::allocate(16).unwrap();
        bytes.write_stop_bit(-1).unwrap();
        bytes.write_utf8(None).unwrap();
        bytes.write_utf8(Some("")).unwrap();
        bytes.flip();

        assert_eq!(bytes.read_utf8().unwrap(), None);
        assert_eq!(bytes.read_utf8().unwrap(), None);
        assert_eq!(bytes.read_utf8().unwrap().as_deref(), Some(""));
    }

    #[test]
    fn negative_length_other_than_absent_is_format_error() {
        let mut bytes = HeapBytes::allocate(16).unwrap();
        bytes.write_stop_bit(-2).unwrap();
        bytes.flip();

        let err = bytes.read_utf8().unwrap_err();
        assert_eq!(classify(&err), ErrorKind::Format);
    }

    #[test]
    fn truncated_text_is_bounds_error() {
        let mut bytes = HeapBytes::allocate(16).unwrap();
        bytes.write_stop_bit(10).unwrap();
        bytes.write_bytes(b"abc").unwrap();
        bytes.flip();

        let err = bytes.read_utf8().unwrap_err();
        assert_eq!(classify(&err), ErrorKind::Bounds);
    }

    #[test]
    fn text_fields_and_numbers_in_one_message() {
        let mut bytes = ElasticNativeBytes::elastic_native(32).unwrap();
        bytes.append_utf8("EUR/USD,").unwrap();
        bytes.append_i64(-42).unwrap();
        bytes.append_utf8(",").unwrap();
        bytes.append_f64(1.0825).unwrap();
        bytes.append_utf8("\n").unwrap();
        bytes.flip();

        assert_eq!(bytes.parse_utf8(&StopChars::Comma).unwrap(), "EUR/USD");
        assert_eq!(bytes.parse_i64().unwrap(), -42);
        assert_eq!(bytes.parse_f64().unwrap(), 1.0825);
        assert_eq!(bytes.remaining(), 0);
    }
}

mod bounds_tests {
    use super::*;

    #[test]
    fn reads_past_a_fixed_store_are_bounds_errors() {
        let store = HeapStore::allocate(8).unwrap();
        for offset in [1usize, 4, 8, usize::MAX - 2] {
            let err = store.read_i64(offset).unwrap_err();
            assert_eq!(classify(&err), ErrorKind::Bounds, "offset {}", offset);
        }

        let mut bytes = NativeBytes::allocate(8).unwrap();
        bytes.read_i64().unwrap();
        let err = bytes.read_i8().unwrap_err();
        assert_eq!(classify(&err), ErrorKind::Bounds);
    }

    #[test]
    fn fixed_cursor_reports_capacity_not_bounds_on_overflow() {
        let mut bytes = HeapBytes::allocate(4).unwrap();
        let err = bytes.write_i64(7).unwrap_err();
        assert_eq!(classify(&err), ErrorKind::Capacity);
        assert_eq!(bytes.position(), 0);
    }

    #[test]
    fn released_cursor_refuses_access() {
        let mut bytes = NativeBytes::allocate(8).unwrap();
        bytes.release().unwrap();

        let err = bytes.read_i32_at(0).unwrap_err();
        assert_eq!(classify(&err), ErrorKind::State);
    }

    #[test]
    fn copies_are_independent_of_the_source() {
        let mut bytes = HeapBytes::allocate(16).unwrap();
        bytes.write_bytes(b"independent").unwrap();
        bytes.flip();

        let mut copy = bytes.copy_native().unwrap();
        bytes.write_i8_at(0, b'X' as i8).unwrap();

        assert_eq!(copy.copy_to_vec().unwrap(), b"independent");
        assert_eq!(bytes.copy_to_vec().unwrap(), b"Xndependent");
    }
}
