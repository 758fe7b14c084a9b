//! # TurBytes Configuration Module
//!
//! This module centralizes the numeric defaults used by the storage layer.
//! Constants are grouped by their functional area and interdependencies are
//! documented and enforced through compile-time assertions.
//!
//! ## Why Centralization?
//!
//! Several limits are coupled: the stop-bit decoder's byte limit is tied to
//! the 64-bit value width, mapped chunk sizes must be multiples of the mapping
//! granularity, and the elastic growth ceiling must never exceed the logical
//! capacity reserved for mapped cursors. Co-locating them keeps those
//! relationships visible.
//!
//! ## Module Organization
//!
//! - [`constants`]: All numeric configuration values with dependency documentation

pub mod constants;
pub use constants::*;
