use std::path::Path;

use eyre::{bail, eyre, Result};
use hashbrown::hash_map::Entry;
use hashbrown::HashMap;
use tracing::trace;

use super::file::{MappedFile, MappedStore};
use super::memory::MappedMemory;
use crate::bytes::{Backing, Bytes, StreamingInput};
use crate::error::BytesError;
use crate::refcount::ReferenceCounted;

pub type MappedBytes = Bytes<Mapped>;

/// Cursor backing that holds one chunk of a [`MappedFile`] at a time.
///
/// An access at an offset outside `[chunk start, chunk start + chunk_size)`
/// releases the current chunk and acquires the one containing the offset. A
/// value that starts inside a chunk may run into its overlap; running past
/// the overlap is a bounds error.
pub struct Mapped {
    file: MappedFile,
    chunk: Option<MappedStore>,
}

impl Mapped {
    pub fn file(&self) -> &MappedFile {
        &self.file
    }

    /// Chunk currently held, if any.
    pub fn current_chunk(&self) -> Option<usize> {
        self.chunk.as_ref().map(|store| store.start() / self.file.chunk_size())
    }
}

impl Backing for Mapped {
    type Memory = MappedMemory;

    fn start(&self) -> usize {
        0
    }

    fn capacity(&self) -> usize {
        self.file.capacity()
    }

    fn is_elastic(&self) -> bool {
        true
    }

    fn store_at(&mut self, offset: usize) -> Result<&MappedStore> {
        let chunk_size = self.file.chunk_size();
        let stale = match &self.chunk {
            Some(store) => offset < store.start() || offset - store.start() >= chunk_size,
            None => true,
        };

        if stale {
            let next = self.file.acquire_store(offset)?;
            trace!(file = %self.file.name(), offset, chunk = offset / chunk_size, "swapped chunk");
            if let Some(previous) = self.chunk.replace(next) {
                previous.release()?;
            }
        }

        self.chunk
            .as_ref()
            .ok_or_else(|| eyre!("no chunk of '{}' held at {}", self.file.name(), offset))
    }

    fn grow(&mut self, end: usize) -> Result<usize> {
        bail!(BytesError::CapacityExceeded {
            requested: end as u64,
            capacity: self.file.capacity() as u64,
        })
    }

    fn release(&mut self) -> Result<()> {
        let chunk = match self.chunk.take() {
            Some(store) => store.release(),
            None => Ok(()),
        };
        let file = self.file.release();
        chunk.and(file)
    }
}

impl MappedFile {
    /// A cursor over the whole file, holding its own reservation on it.
    pub fn bytes(&self) -> Result<MappedBytes> {
        self.acquire()?;
        Ok(Bytes::from_backing(Mapped {
            file: self.clone(),
            chunk: None,
        }))
    }

    /// A cursor positioned at `position` whose window is already the chunk
    /// holding it. Lower chunks are never mapped.
    pub fn bytes_at(&self, position: usize) -> Result<MappedBytes> {
        self.acquire()?;
        let store = match self.acquire_store(position) {
            Ok(store) => store,
            Err(err) => {
                self.release()?;
                return Err(err);
            }
        };
        let mut bytes = Bytes::from_backing(Mapped {
            file: self.clone(),
            chunk: Some(store),
        });
        bytes.set_position(position)?;
        Ok(bytes)
    }
}

impl Bytes<Mapped> {
    /// Opens `path` and returns a cursor that owns the file: releasing the
    /// cursor releases the file.
    pub fn open<P: AsRef<Path>>(path: P, chunk_size: u64) -> Result<Self> {
        let file = MappedFile::open(path, chunk_size)?;
        let bytes = file.bytes()?;
        file.release()?;
        Ok(bytes)
    }

    pub fn mapped_file(&self) -> &MappedFile {
        self.backing().file()
    }
}

/// Caller-owned cache of one mapped cursor per file.
///
/// Threads that repeatedly work on the same files keep one of these each
/// instead of opening a cursor per call.
#[derive(Default)]
pub struct MappedBytesCache {
    cursors: HashMap<u64, MappedBytes>,
}

impl MappedBytesCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached cursor for `file`, created on first use. A cursor whose
    /// file has been closed is evicted and the call fails.
    pub fn acquire(&mut self, file: &MappedFile) -> Result<&mut MappedBytes> {
        if file.is_closed() {
            self.cursors.remove(&file.id());
            bail!(BytesError::Closed {
                name: file.name().to_string()
            });
        }

        match self.cursors.entry(file.id()) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => Ok(entry.insert(file.bytes()?)),
        }
    }

    /// Drops the cursor for `file`, releasing its reservations.
    pub fn evict(&mut self, file: &MappedFile) -> bool {
        self.cursors.remove(&file.id()).is_some()
    }

    pub fn len(&self) -> usize {
        self.cursors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cursors.is_empty()
    }

    pub fn clear(&mut self) {
        self.cursors.clear();
    }
}
