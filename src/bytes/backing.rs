//! Stores behind a cursor.
//!
//! A [`Backing`] hands the cursor the store that serves a given offset and
//! decides what happens when a write runs past the current capacity:
//!
//! | Backing     | Store                    | Past capacity                 |
//! |-------------|--------------------------|-------------------------------|
//! | `Fixed`     | one store, never changes | capacity error                |
//! | `Elastic`   | reallocated on growth    | doubles, up to `max_capacity` |
//! | `Mapped`    | one chunk at a time      | capacity error past 1 TiB     |
//!
//! `Mapped` lives in [`crate::mapped`].

use eyre::{bail, Result};
use tracing::trace;

use crate::config::MAX_ELASTIC_CAPACITY;
use crate::error::BytesError;
use crate::memory::{Allocate, Memory};
use crate::refcount::ReferenceCounted;
use crate::store::BytesStore;

pub trait Backing {
    type Memory: Memory;

    fn start(&self) -> usize;

    fn capacity(&self) -> usize;

    fn is_elastic(&self) -> bool;

    /// The store that serves an access starting at `offset`.
    fn store_at(&mut self, offset: usize) -> Result<&BytesStore<Self::Memory>>;

    /// Makes `[start, end)` writable and returns the new capacity.
    fn grow(&mut self, end: usize) -> Result<usize>;

    /// Returns the backing's reservations. Called once, by the cursor.
    fn release(&mut self) -> Result<()>;
}

pub struct Fixed<M: Memory> {
    store: BytesStore<M>,
}

impl<M: Memory> Fixed<M> {
    /// Takes over the caller's reservation on `store`.
    pub fn new(store: BytesStore<M>) -> Self {
        Self { store }
    }
}

impl<M: Memory> Backing for Fixed<M> {
    type Memory = M;

    fn start(&self) -> usize {
        self.store.start()
    }

    fn capacity(&self) -> usize {
        self.store.end()
    }

    fn is_elastic(&self) -> bool {
        false
    }

    #[inline]
    fn store_at(&mut self, _offset: usize) -> Result<&BytesStore<M>> {
        Ok(&self.store)
    }

    fn grow(&mut self, end: usize) -> Result<usize> {
        bail!(BytesError::CapacityExceeded {
            requested: end as u64,
            capacity: self.store.end() as u64,
        })
    }

    fn release(&mut self) -> Result<()> {
        self.store.release()
    }
}

pub struct Elastic<M: Allocate> {
    store: BytesStore<M>,
    max_capacity: usize,
}

impl<M: Allocate> Elastic<M> {
    pub fn new(initial: usize) -> Result<Self> {
        Ok(Self {
            store: BytesStore::allocate(initial)?,
            max_capacity: MAX_ELASTIC_CAPACITY,
        })
    }

    pub fn max_capacity(&self) -> usize {
        self.max_capacity
    }

    pub(crate) fn set_max_capacity(&mut self, max_capacity: usize) {
        self.max_capacity = max_capacity.max(self.store.capacity());
    }
}

impl<M: Allocate> Backing for Elastic<M> {
    type Memory = M;

    fn start(&self) -> usize {
        0
    }

    fn capacity(&self) -> usize {
        self.store.capacity()
    }

    fn is_elastic(&self) -> bool {
        true
    }

    #[inline]
    fn store_at(&mut self, _offset: usize) -> Result<&BytesStore<M>> {
        Ok(&self.store)
    }

    fn grow(&mut self, end: usize) -> Result<usize> {
        let current = self.store.capacity();
        if end <= current {
            return Ok(current);
        }
        if end > self.max_capacity {
            bail!(BytesError::CapacityExceeded {
                requested: end as u64,
                capacity: self.max_capacity as u64,
            });
        }

        let capacity = current.saturating_mul(2).max(end).min(self.max_capacity);
        let grown = BytesStore::<M>::allocate(capacity)?;
        self.store.copy_to(0, &grown, 0, current)?;
        self.store.release()?;
        self.store = grown;

        trace!(kind = M::KIND, from = current, to = capacity, "grew elastic store");
        Ok(capacity)
    }

    fn release(&mut self) -> Result<()> {
        self.store.release()
    }
}
