//! # Error Taxonomy
//!
//! Every fallible operation in TurBytes returns `eyre::Result`. Failures that
//! callers need to tell apart are raised as a typed [`BytesError`] inside the
//! report, the same way the memory budget raises its own typed error:
//!
//! ```ignore
//! match store.read_i64(offset) {
//!     Err(report) if classify(&report) == ErrorKind::Bounds => { /* .. */ }
//!     other => other?,
//! }
//! ```
//!
//! | Kind          | Raised when                                                 |
//! |---------------|-------------------------------------------------------------|
//! | `Bounds`      | offset/length outside a store or a cursor's limit           |
//! | `Format`      | malformed text, stop-bit or number encoding                 |
//! | `Capacity`    | a write does not fit a non-elastic store                    |
//! | `State`       | use after release, double release, closed file              |
//! | `Unsupported` | atomic operation on a handle that cannot provide it         |
//! | `Io`          | open / extend / lock / map failures (`std::io::Error`)      |
//!
//! Bounds violations are never clamped and resource misuse is never ignored;
//! nothing in the crate retries an I/O failure.

use eyre::Report;
use thiserror::Error;

/// Coarse classification of a [`BytesError`] or a wrapped I/O failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Bounds,
    Format,
    Capacity,
    State,
    Unsupported,
    Io,
    Other,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BytesError {
    #[error("offset {offset} with length {len} is outside [{start}, {end})")]
    OutOfBounds {
        offset: u64,
        len: u64,
        start: u64,
        end: u64,
    },

    #[error("malformed input at byte {position}: {reason}")]
    Malformed { position: u64, reason: String },

    #[error("capacity exceeded: {requested} bytes requested but capacity is {capacity}")]
    CapacityExceeded { requested: u64, capacity: u64 },

    #[error("{resource} has already been released")]
    Released { resource: &'static str },

    #[error("{resource} released more times than it was acquired")]
    DoubleRelease { resource: &'static str },

    #[error("mapped file '{name}' is closed")]
    Closed { name: String },

    #[error("{operation} is not supported by this memory")]
    Unsupported { operation: &'static str },
}

impl BytesError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BytesError::OutOfBounds { .. } => ErrorKind::Bounds,
            BytesError::Malformed { .. } => ErrorKind::Format,
            BytesError::CapacityExceeded { .. } => ErrorKind::Capacity,
            BytesError::Released { .. }
            | BytesError::DoubleRelease { .. }
            | BytesError::Closed { .. } => ErrorKind::State,
            BytesError::Unsupported { .. } => ErrorKind::Unsupported,
        }
    }

    pub(crate) fn out_of_bounds(offset: usize, len: usize, start: usize, end: usize) -> Self {
        BytesError::OutOfBounds {
            offset: offset as u64,
            len: len as u64,
            start: start as u64,
            end: end as u64,
        }
    }

    pub(crate) fn malformed(position: usize, reason: impl Into<String>) -> Self {
        BytesError::Malformed {
            position: position as u64,
            reason: reason.into(),
        }
    }
}

/// Classifies a report produced anywhere in this crate.
///
/// Context added with `wrap_err` does not hide the root cause: the whole
/// chain is searched for a [`BytesError`] or an `io::Error`.
pub fn classify(report: &Report) -> ErrorKind {
    for cause in report.chain() {
        if let Some(err) = cause.downcast_ref::<BytesError>() {
            return err.kind();
        }
        if cause.downcast_ref::<std::io::Error>().is_some() {
            return ErrorKind::Io;
        }
    }
    ErrorKind::Other
}
