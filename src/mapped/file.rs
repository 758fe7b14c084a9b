//! # Chunked Mapped File
//!
//! `MappedFile` owns one file handle and maps it lazily, one chunk at a time.
//!
//! ## Chunk Layout
//!
//! ```text
//! file:   [ chunk 0          ][ chunk 1          ][ chunk 2          ] ...
//! map 0:  [ chunk 0          | overlap ]
//! map 1:                      [ chunk 1          | overlap ]
//! ```
//!
//! Chunk `i` maps `[i * chunk_size, i * chunk_size + chunk_size + overlap)`.
//! The overlap lets a value that starts near the end of a chunk be read or
//! written in one piece without touching the next mapping.
//!
//! ## Chunk Lifecycle
//!
//! ```text
//! unmapped --acquire--> mapped (refs >= 1) --last release--> released
//!                          ^                                    |
//!                          +------------ acquire: remap --------+
//!                                                               |
//!                                        miss / compact: evict -+
//! ```
//!
//! The chunk table holds an unreserved handle per slot. `acquire_store`
//! re-reserves a live slot; a released slot is evicted and the chunk mapped
//! again. The table is the only locked structure: mapping happens under the
//! lock, access through an acquired store never takes it.
//!
//! ## Growth
//!
//! When a chunk's mapped range extends past the end of the file, the file is
//! extended under an exclusive advisory lock. The length is re-read after the
//! lock is taken, so two processes growing the same file race safely. The
//! file is never shrunk.
//!
//! ## Reservations
//!
//! The file starts with one reservation held by the opener. Each live chunk
//! and each mapped cursor holds one more. [`MappedFile::close`] returns the
//! opener's reservation and refuses new chunks; chunks already handed out
//! stay valid until their holders release them. When the count reaches zero
//! the descriptor is closed and every later call fails with
//! [`BytesError::Closed`].

use std::fmt::{self, Write as _};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use eyre::{bail, Result, WrapErr};
use fs2::FileExt;
use memmap2::MmapOptions;
use parking_lot::Mutex;
use tracing::{debug, warn};

use super::builder::MappedFileBuilder;
use super::memory::MappedMemory;
use crate::config::DEFAULT_CHUNK_SIZE;
use crate::error::BytesError;
use crate::refcount::{ReferenceCounted, ReferenceCounter};
use crate::store::BytesStore;

static NEXT_FILE_ID: AtomicU64 = AtomicU64::new(1);

pub type MappedStore = BytesStore<MappedMemory>;

#[derive(Clone)]
pub struct MappedFile {
    inner: Arc<FileInner>,
}

struct FileInner {
    id: u64,
    path: PathBuf,
    name: String,
    file: Mutex<Option<File>>,
    chunk_size: usize,
    overlap_size: usize,
    capacity: usize,
    chunks: Mutex<Vec<Option<MappedStore>>>,
    refs: ReferenceCounter,
    closed: AtomicBool,
}

impl MappedFile {
    pub fn builder<P: AsRef<Path>>(path: P) -> MappedFileBuilder {
        MappedFileBuilder::new(path)
    }

    /// Opens (creating if needed) with the default overlap and capacity.
    pub fn open<P: AsRef<Path>>(path: P, chunk_size: u64) -> Result<Self> {
        MappedFileBuilder::new(path).chunk_size(chunk_size).open()
    }

    /// Opens with [`DEFAULT_CHUNK_SIZE`].
    pub fn open_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open(path, DEFAULT_CHUNK_SIZE)
    }

    pub(super) fn create(
        path: &Path,
        chunk_size: usize,
        overlap_size: usize,
        capacity: usize,
        create: bool,
    ) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(create)
            .truncate(false)
            .open(path)
            .wrap_err_with(|| format!("failed to open mapped file '{}'", path.display()))?;

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let inner = Arc::new_cyclic(|owner: &Weak<FileInner>| {
            let owner = owner.clone();
            FileInner {
                id: NEXT_FILE_ID.fetch_add(1, Ordering::Relaxed),
                path: path.to_path_buf(),
                name,
                file: Mutex::new(Some(file)),
                chunk_size,
                overlap_size,
                capacity,
                chunks: Mutex::new(Vec::new()),
                refs: ReferenceCounter::new("mapped file", move || {
                    if let Some(inner) = owner.upgrade() {
                        inner.shut_down();
                    }
                }),
                closed: AtomicBool::new(false),
            }
        });
        inner.refs.acquire()?;

        debug!(
            path = %path.display(),
            chunk_size,
            overlap_size,
            "opened mapped file"
        );

        Ok(Self { inner })
    }

    /// Process-unique identity, stable across clones.
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn chunk_size(&self) -> usize {
        self.inner.chunk_size
    }

    pub fn overlap_size(&self) -> usize {
        self.inner.overlap_size
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Current length of the file on disk. Fails once the descriptor is
    /// closed.
    pub fn len(&self) -> Result<u64> {
        self.with_handle(|file| self.file_len(file))
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            bail!(BytesError::Closed {
                name: self.inner.name.clone()
            });
        }
        self.inner.refs.ensure_live()
    }

    fn with_handle<T>(&self, f: impl FnOnce(&File) -> Result<T>) -> Result<T> {
        let handle = self.inner.file.lock();
        match handle.as_ref() {
            Some(file) => f(file),
            None => bail!(BytesError::Closed {
                name: self.inner.name.clone()
            }),
        }
    }

    fn file_len(&self, file: &File) -> Result<u64> {
        let metadata = file.metadata().wrap_err_with(|| {
            format!("failed to get metadata for '{}'", self.inner.path.display())
        })?;
        Ok(metadata.len())
    }

    /// Returns a store over the chunk containing `position`, reserved once for
    /// the caller.
    pub fn acquire_store(&self, position: usize) -> Result<MappedStore> {
        self.ensure_open()?;
        if position >= self.inner.capacity {
            bail!(BytesError::out_of_bounds(position, 1, 0, self.inner.capacity));
        }

        let chunk = position / self.inner.chunk_size;
        let mut chunks = self.inner.chunks.lock();
        if chunks.len() <= chunk {
            chunks.resize_with(chunk + 1, || None);
        }

        if let Some(store) = &chunks[chunk] {
            if store.try_acquire() {
                return Ok(store.duplicate());
            }
        }

        // Released chunks are only evicted under acquisition pressure.
        for slot in chunks.iter_mut() {
            if slot.as_ref().is_some_and(|store| store.is_released()) {
                *slot = None;
            }
        }

        let store = self.map_chunk(chunk)?;
        chunks[chunk] = Some(store.duplicate());
        Ok(store)
    }

    fn map_chunk(&self, chunk: usize) -> Result<MappedStore> {
        let inner = &self.inner;
        let start = chunk * inner.chunk_size;
        let mapped_len = inner.chunk_size + inner.overlap_size;
        let map = self.with_handle(|file| {
            self.grow(file, (start + mapped_len) as u64)?;
            MmapOptions::new()
                .offset(start as u64)
                .len(mapped_len)
                .map_raw(file)
                .wrap_err_with(|| {
                    format!(
                        "failed to map chunk {} of '{}' ({} bytes at {})",
                        chunk,
                        inner.path.display(),
                        mapped_len,
                        start
                    )
                })
        })?;

        inner.refs.acquire()?;
        let file = Arc::downgrade(inner);
        let store = BytesStore::with_teardown(MappedMemory::new(map, chunk), start, move || {
            debug!(chunk, "released mapped chunk");
            if let Some(file) = file.upgrade() {
                if let Err(err) = file.refs.release() {
                    warn!(error = %err, chunk, "chunk failed to release its file");
                }
            }
        })?;

        debug!(
            file = %inner.name,
            chunk,
            start,
            len = mapped_len,
            "mapped chunk"
        );
        Ok(store)
    }

    /// Grows the file on disk to at least `min_len` bytes under an exclusive
    /// advisory lock. Never shrinks.
    pub fn ensure_len(&self, min_len: u64) -> Result<()> {
        self.with_handle(|file| self.grow(file, min_len))
    }

    fn grow(&self, file: &File, min_len: u64) -> Result<()> {
        if self.file_len(file)? >= min_len {
            return Ok(());
        }

        let path = &self.inner.path;
        FileExt::lock_exclusive(file)
            .wrap_err_with(|| format!("failed to lock '{}' for growth", path.display()))?;

        let grown = self.file_len(file).and_then(|len| {
            if len < min_len {
                file.set_len(min_len).wrap_err_with(|| {
                    format!("failed to grow '{}' to {} bytes", path.display(), min_len)
                })?;
                debug!(file = %self.inner.name, from = len, to = min_len, "grew mapped file");
            }
            Ok(())
        });

        FileExt::unlock(file)
            .wrap_err_with(|| format!("failed to unlock '{}'", path.display()))?;
        grown
    }

    /// Drops released chunks from the table. Returns how many were evicted.
    pub fn compact(&self) -> usize {
        let mut chunks = self.inner.chunks.lock();
        let mut evicted = 0;
        for slot in chunks.iter_mut() {
            if slot.as_ref().is_some_and(|store| store.is_released()) {
                *slot = None;
                evicted += 1;
            }
        }
        while chunks.last().is_some_and(|slot| slot.is_none()) {
            chunks.pop();
        }
        evicted
    }

    /// Refuses further chunk acquisitions, empties the chunk table and returns
    /// the opener's reservation. Closing twice is a no-op.
    pub fn close(&self) -> Result<()> {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.inner.chunks.lock().clear();
        debug!(file = %self.inner.name, "closed mapped file");
        self.inner
            .refs
            .release()
            .map(|_| ())
            .wrap_err_with(|| format!("failed to close '{}'", self.inner.path.display()))
    }

    /// `refs: <file>, chunks: [<chunk 0>, <chunk 1>, ..]`; a released or
    /// never-mapped chunk shows 0.
    pub fn reference_counts(&self) -> String {
        let chunks = self.inner.chunks.lock();
        let mut out = format!("refs: {}, chunks: [", self.inner.refs.count());
        for (i, slot) in chunks.iter().enumerate() {
            if i > 0 {
                out.push_str(", ");
            }
            let count = slot.as_ref().map_or(0, |store| store.ref_count());
            let _ = write!(out, "{}", count);
        }
        out.push(']');
        out
    }

    /// Number of chunk slots currently holding a live mapping.
    pub fn mapped_chunks(&self) -> usize {
        self.inner
            .chunks
            .lock()
            .iter()
            .filter(|slot| slot.as_ref().is_some_and(|store| !store.is_released()))
            .count()
    }
}

impl FileInner {
    /// Runs once when the file's count reaches zero.
    fn shut_down(&self) {
        self.closed.store(true, Ordering::Release);
        self.chunks.lock().clear();
        if self.file.lock().take().is_some() {
            debug!(file = %self.name, "released mapped file");
        }
    }
}

impl ReferenceCounted for MappedFile {
    fn acquire(&self) -> Result<()> {
        self.inner.refs.acquire().map(|_| ())
    }

    fn release(&self) -> Result<()> {
        self.inner.refs.release().map(|_| ())
    }

    fn ref_count(&self) -> u64 {
        self.inner.refs.count()
    }
}

impl fmt::Debug for MappedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MappedFile")
            .field("path", &self.inner.path)
            .field("chunk_size", &self.inner.chunk_size)
            .field("overlap_size", &self.inner.overlap_size)
            .field("refs", &self.inner.refs.count())
            .field("closed", &self.is_closed())
            .finish()
    }
}
