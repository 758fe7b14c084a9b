//! # TurBytes Configuration Constants
//!
//! This module centralizes all configuration constants, grouping interdependent
//! values together and documenting their relationships.
//!
//! ## Dependency Graph
//!
//! ```text
//! MAPPED_CAPACITY (1 TiB logical address-space reservation)
//!       │
//!       └─> MAX_ELASTIC_CAPACITY (must be <=)
//!             An elastic heap/native cursor may never claim more room than
//!             a mapped cursor advertises.
//!
//! DEFAULT_CHUNK_SIZE (64 MiB)
//!       │
//!       └─> rounded up by os::map_align() at open time
//!             FALLBACK_MAP_GRANULARITY is used when the OS page size is unknown
//!
//! STOP_BIT_MAX_BYTES (10)
//!       │
//!       ├─> STOP_BIT_POSITIVE_LIMIT (shift 56, 9 continuation bytes)
//!       └─> STOP_BIT_NEGATIVE_LIMIT (shift 63, 10 continuation bytes)
//!             Both are tied to the 64-bit value width.
//!
//! MAX_SIGNIFICANT_DIGITS (17)
//!       │
//!       └─> Any f64 is recovered exactly from 17 correctly chosen digits;
//!           the decimal formatter gives up on its own digit stream there.
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! use crate::config::{DEFAULT_CHUNK_SIZE, MAPPED_CAPACITY};
//! ```

// ============================================================================
// MAPPED FILE CONFIGURATION
// ============================================================================

/// Default size of one mapped chunk before rounding to the mapping granularity.
pub const DEFAULT_CHUNK_SIZE: u64 = 64 << 20;

/// Logical capacity advertised by a mapped file and its cursors.
///
/// This is an address-space ceiling, not the file length: the file only
/// grows to cover the chunks that are actually touched.
pub const MAPPED_CAPACITY: u64 = 1 << 40;

/// Mapping granularity used when the platform cannot report a page size.
///
/// Windows maps on 64 KiB allocation boundaries, so this value is safe for
/// every platform memmap2 supports.
pub const FALLBACK_MAP_GRANULARITY: u64 = 64 << 10;

// ============================================================================
// ELASTIC CURSOR CONFIGURATION
// ============================================================================

/// Initial capacity of an elastic cursor created without an explicit size.
pub const DEFAULT_ELASTIC_CAPACITY: usize = 256;

/// Hard ceiling for elastic heap and native cursors.
pub const MAX_ELASTIC_CAPACITY: usize = 1 << 34;

/// Alignment of native allocations. Eight bytes keeps every 64-bit word
/// written at an 8-aligned offset eligible for atomic access.
pub const NATIVE_ALIGNMENT: usize = 8;

const _: () = assert!(
    MAX_ELASTIC_CAPACITY as u64 <= MAPPED_CAPACITY,
    "MAX_ELASTIC_CAPACITY must not exceed MAPPED_CAPACITY"
);

const _: () = assert!(
    DEFAULT_ELASTIC_CAPACITY <= MAX_ELASTIC_CAPACITY,
    "DEFAULT_ELASTIC_CAPACITY must be <= MAX_ELASTIC_CAPACITY"
);

const _: () = assert!(
    NATIVE_ALIGNMENT.is_power_of_two() && NATIVE_ALIGNMENT >= 8,
    "NATIVE_ALIGNMENT must be a power of two of at least 8"
);

// ============================================================================
// CODEC LIMITS
// ============================================================================

/// Maximum encoded length of a stop-bit value: nine 7-bit groups plus the
/// trailing zero byte that marks a negative value.
pub const STOP_BIT_MAX_BYTES: usize = 10;

/// Largest bit shift accepted for the terminal byte of a positive value
/// (nine continuation bytes).
pub const STOP_BIT_POSITIVE_LIMIT: u32 = 56;

/// Largest bit shift accepted before the zero terminator of a negative value
/// (ten continuation bytes).
pub const STOP_BIT_NEGATIVE_LIMIT: u32 = 63;

/// Number of significant decimal digits that always identify an f64.
pub const MAX_SIGNIFICANT_DIGITS: usize = 17;

/// Largest power of ten that is exactly representable as an f64 together
/// with its five-power factor (5^22 < 2^53).
pub const MAX_EXACT_POW10: usize = 22;

const _: () = assert!(
    STOP_BIT_POSITIVE_LIMIT + 7 == STOP_BIT_NEGATIVE_LIMIT,
    "negative stop-bit values carry exactly one extra 7-bit group"
);

const _: () = assert!(
    STOP_BIT_MAX_BYTES * 7 >= 64,
    "STOP_BIT_MAX_BYTES must cover a full 64-bit value"
);

// ============================================================================
// DIAGNOSTICS
// ============================================================================

/// Bytes per row in hex dumps.
pub const HEX_DUMP_WIDTH: usize = 16;
