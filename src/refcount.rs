//! # Reference Counting
//!
//! Native allocations and mapped chunks are shared between independent holders
//! (store views, cursors, the mapped file's chunk table). Each shared resource
//! carries a [`ReferenceCounter`] that tracks the number of explicit holders and
//! runs the resource's teardown exactly once, when the last holder releases it.
//!
//! ## State Word
//!
//! The count and the released flag live in a single `AtomicU64` so that an
//! acquire racing with the final release is decided by one compare-exchange:
//!
//! ```text
//! bit 63        bits 0..62
//! +----------+---------------------+
//! | RELEASED |  holder count       |
//! +----------+---------------------+
//! ```
//!
//! - A counter starts at zero holders; the owning resource acquires it once on
//!   behalf of its creator.
//! - `release()` that brings the count to zero sets `RELEASED` in the same CAS.
//! - Once `RELEASED` is set every `acquire()` and `release()` fails with a
//!   state error; the teardown closure has been taken and run.
//!
//! ## Memory Lifetime
//!
//! Teardown ends the resource's logical life. Handles that still point at the
//! memory keep it allocated (`Arc`) but every accessor checks the released flag
//! first, so no caller can observe memory after its count reached zero.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use eyre::{bail, Result};
use parking_lot::Mutex;

use crate::error::BytesError;

const RELEASED: u64 = 1 << 63;
const COUNT_MASK: u64 = RELEASED - 1;

type Teardown = Box<dyn FnOnce() + Send>;

/// Shared-lifetime primitive behind every store and mapped file.
pub struct ReferenceCounter {
    state: AtomicU64,
    resource: &'static str,
    on_release: Mutex<Option<Teardown>>,
}

impl ReferenceCounter {
    pub fn new(resource: &'static str, on_release: impl FnOnce() + Send + 'static) -> Self {
        Self {
            state: AtomicU64::new(0),
            resource,
            on_release: Mutex::new(Some(Box::new(on_release))),
        }
    }

    pub fn without_teardown(resource: &'static str) -> Self {
        Self {
            state: AtomicU64::new(0),
            resource,
            on_release: Mutex::new(None),
        }
    }

    /// Adds a holder, returning the new count.
    pub fn acquire(&self) -> Result<u64> {
        let mut current = self.state.load(Ordering::Acquire);
        loop {
            if current & RELEASED != 0 {
                bail!(BytesError::Released {
                    resource: self.resource
                });
            }
            if current & COUNT_MASK == COUNT_MASK {
                bail!("{} reference count overflow", self.resource);
            }

            match self.state.compare_exchange_weak(
                current,
                current + 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return Ok(current + 1),
                Err(actual) => current = actual,
            }
        }
    }

    /// Adds a holder unless the resource has already been torn down.
    pub fn try_acquire(&self) -> bool {
        self.acquire().is_ok()
    }

    /// Drops a holder. Returns `true` when this call ran the teardown.
    pub fn release(&self) -> Result<bool> {
        let mut current = self.state.load(Ordering::Acquire);
        loop {
            if current & RELEASED != 0 || current == 0 {
                bail!(BytesError::DoubleRelease {
                    resource: self.resource
                });
            }

            let next = if current == 1 { RELEASED } else { current - 1 };

            match self.state.compare_exchange_weak(
                current,
                next,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => break,
                Err(actual) => current = actual,
            }
        }

        if current != 1 {
            return Ok(false);
        }

        // Take the closure before running it so a teardown that touches this
        // counter again sees the released state instead of deadlocking.
        let teardown = self.on_release.lock().take();
        if let Some(teardown) = teardown {
            teardown();
        }
        Ok(true)
    }

    pub fn count(&self) -> u64 {
        self.state.load(Ordering::Acquire) & COUNT_MASK
    }

    pub fn is_released(&self) -> bool {
        self.state.load(Ordering::Acquire) & RELEASED != 0
    }

    /// Fails with a state error once the resource has been torn down.
    #[inline]
    pub fn ensure_live(&self) -> Result<()> {
        if self.is_released() {
            bail!(BytesError::Released {
                resource: self.resource
            });
        }
        Ok(())
    }

    pub fn resource(&self) -> &'static str {
        self.resource
    }
}

impl fmt::Debug for ReferenceCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReferenceCounter")
            .field("resource", &self.resource)
            .field("count", &self.count())
            .field("released", &self.is_released())
            .finish()
    }
}

/// Resources whose lifetime is governed by an explicit holder count.
pub trait ReferenceCounted {
    fn acquire(&self) -> Result<()>;

    fn release(&self) -> Result<()>;

    fn ref_count(&self) -> u64;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{classify, ErrorKind};
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    fn counting(calls: &Arc<AtomicUsize>) -> ReferenceCounter {
        let calls = Arc::clone(calls);
        ReferenceCounter::new("test", move || {
            calls.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn teardown_runs_after_last_release() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = counting(&calls);

        counter.acquire().unwrap();
        counter.acquire().unwrap();
        assert_eq!(counter.count(), 2);

        assert!(!counter.release().unwrap());
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        assert!(counter.release().unwrap());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(counter.is_released());
    }

    #[test]
    fn release_after_teardown_is_rejected() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = counting(&calls);

        counter.acquire().unwrap();
        counter.release().unwrap();

        let err = counter.release().unwrap_err();
        assert_eq!(classify(&err), ErrorKind::State);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn acquire_after_teardown_is_rejected() {
        let counter = ReferenceCounter::without_teardown("test");
        counter.acquire().unwrap();
        counter.release().unwrap();

        assert!(!counter.try_acquire());
        assert_eq!(classify(&counter.acquire().unwrap_err()), ErrorKind::State);
        assert!(counter.ensure_live().is_err());
    }

    #[test]
    fn release_without_acquire_is_rejected() {
        let counter = ReferenceCounter::without_teardown("test");

        assert!(counter.release().is_err());
        assert!(!counter.is_released());
    }

    #[test]
    fn concurrent_release_runs_teardown_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::new(counting(&calls));

        for _ in 0..64 {
            counter.acquire().unwrap();
        }

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let counter = Arc::clone(&counter);
                std::thread::spawn(move || {
                    for _ in 0..8 {
                        counter.release().unwrap();
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(counter.is_released());
    }

    #[test]
    fn debug_output_shows_count() {
        let counter = ReferenceCounter::without_teardown("store");
        counter.acquire().unwrap();

        let text = format!("{:?}", counter);
        assert!(text.contains("store"));
        assert!(text.contains("count: 1"));
    }
}
