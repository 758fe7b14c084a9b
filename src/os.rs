//! # OS Collaborator
//!
//! Page size and mapping granularity. Mapping offsets handed to the kernel
//! must be multiples of the granularity, so chunk and overlap sizes are
//! rounded with [`map_align`] before any chunk is mapped.

use std::sync::OnceLock;

use eyre::{bail, Result};

use crate::config::FALLBACK_MAP_GRANULARITY;
use crate::error::BytesError;

static PAGE_SIZE: OnceLock<u64> = OnceLock::new();

pub fn page_size() -> u64 {
    *PAGE_SIZE.get_or_init(query_page_size)
}

#[cfg(unix)]
fn query_page_size() -> u64 {
    // SAFETY: sysconf has no preconditions; it returns -1 for unknown names.
    let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if size > 0 {
        size as u64
    } else {
        FALLBACK_MAP_GRANULARITY
    }
}

#[cfg(not(unix))]
fn query_page_size() -> u64 {
    FALLBACK_MAP_GRANULARITY
}

/// Granularity that mapping offsets must be aligned to.
pub fn map_granularity() -> u64 {
    if cfg!(windows) {
        FALLBACK_MAP_GRANULARITY
    } else {
        page_size()
    }
}

/// Rounds `size` up to the next multiple of the mapping granularity.
///
/// Zero rounds up to one granule so a chunk is never empty. Sizes whose
/// rounded value does not fit a `u64` are a capacity error.
pub fn map_align(size: u64) -> Result<u64> {
    let granule = map_granularity();
    let size = size.max(1);
    match size.div_ceil(granule).checked_mul(granule) {
        Some(aligned) => Ok(aligned),
        None => bail!(BytesError::CapacityExceeded {
            requested: size,
            capacity: u64::MAX / granule * granule,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_size_is_power_of_two() {
        let size = page_size();
        assert!(size >= 512);
        assert!(size.is_power_of_two());
    }

    #[test]
    fn map_align_rounds_up() {
        let granule = map_granularity();

        assert_eq!(map_align(1).unwrap(), granule);
        assert_eq!(map_align(granule).unwrap(), granule);
        assert_eq!(map_align(granule + 1).unwrap(), 2 * granule);
        assert_eq!(map_align(0).unwrap(), granule);
    }

    #[test]
    fn map_align_near_u64_max_is_capacity_error() {
        let granule = map_granularity();
        let top = u64::MAX / granule * granule;

        assert_eq!(map_align(top).unwrap(), top);
        let err = map_align(top + 1).unwrap_err();
        assert_eq!(crate::error::classify(&err), crate::error::ErrorKind::Capacity);
        assert!(map_align(u64::MAX).is_err());
    }
}
