//! # Mapped File Builder
//!
//! Fluent configuration for [`MappedFile`]. Unset options are resolved when
//! `open()` is called.
//!
//! | Option         | Default                 | Description                            |
//! |----------------|-------------------------|----------------------------------------|
//! | chunk_size     | 64 MiB                  | Bytes per chunk, rounded to granularity|
//! | overlap_size   | one page                | Trailing bytes mapped past each chunk  |
//! | capacity       | 1 TiB                   | Logical ceiling advertised to cursors  |
//! | create         | true                    | Create the file if it does not exist   |
//!
//! ```ignore
//! let file = MappedFile::builder("./journal.dat")
//!     .chunk_size(1 << 20)
//!     .overlap_size(0)
//!     .open()?;
//! ```
//!
//! An overlap of zero stays zero; any other overlap is rounded up to the
//! mapping granularity like the chunk size.

use std::path::{Path, PathBuf};

use eyre::{bail, ensure, Result};

use super::MappedFile;
use crate::config::{DEFAULT_CHUNK_SIZE, MAPPED_CAPACITY};
use crate::error::BytesError;
use crate::os;

pub struct MappedFileBuilder {
    path: PathBuf,
    chunk_size: Option<u64>,
    overlap_size: Option<u64>,
    capacity: Option<u64>,
    create: bool,
}

impl MappedFileBuilder {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            chunk_size: None,
            overlap_size: None,
            capacity: None,
            create: true,
        }
    }

    pub fn chunk_size(mut self, bytes: u64) -> Self {
        self.chunk_size = Some(bytes);
        self
    }

    pub fn overlap_size(mut self, bytes: u64) -> Self {
        self.overlap_size = Some(bytes);
        self
    }

    pub fn capacity(mut self, bytes: u64) -> Self {
        self.capacity = Some(bytes);
        self
    }

    /// Fails on a missing file instead of creating it when `false`.
    pub fn create(mut self, create: bool) -> Self {
        self.create = create;
        self
    }

    pub fn open(self) -> Result<MappedFile> {
        let chunk_size = os::map_align(self.chunk_size.unwrap_or(DEFAULT_CHUNK_SIZE))?;
        let overlap_size = match self.overlap_size {
            Some(0) => 0,
            Some(bytes) => os::map_align(bytes)?,
            None => os::page_size(),
        };
        let capacity = self.capacity.unwrap_or(MAPPED_CAPACITY);

        ensure!(
            capacity >= chunk_size,
            "capacity {} is smaller than one chunk of {} bytes",
            capacity,
            chunk_size
        );
        let mapped_end = capacity.checked_add(overlap_size);
        if mapped_end.map_or(true, |end| usize::try_from(end).is_err()) {
            bail!(BytesError::CapacityExceeded {
                requested: capacity.saturating_add(overlap_size),
                capacity: usize::MAX as u64,
            });
        }

        MappedFile::create(
            &self.path,
            chunk_size as usize,
            overlap_size as usize,
            capacity as usize,
            self.create,
        )
    }
}
