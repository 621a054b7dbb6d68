//! Error types for the butterfly-osm import toolkit
//!
//! Store failures are split by direction so callers can tell a dead store
//! (pool-fatal) from per-record data faults, which are always contained.

use std::path::PathBuf;
use thiserror::Error;

use crate::element::EntityKind;

/// Main error type for cache and pipeline operations
#[derive(Debug, Error)]
pub enum Error {
    /// Store could not be opened at the given path
    #[error("failed to open cache at {}: {message}", path.display())]
    Open { path: PathBuf, message: String },

    /// Underlying store failed to serve a read
    #[error("cache read failed: {0}")]
    StoreRead(String),

    /// Underlying store failed to apply a write
    #[error("cache write failed: {0}")]
    StoreWrite(String),

    /// Entity could not be serialized
    #[error("failed to encode {kind} {id}: {reason}")]
    Encode {
        kind: EntityKind,
        id: i64,
        reason: String,
    },

    /// Key with the wrong width
    #[error("corrupt key: expected 8 bytes, got {0}")]
    CorruptKey(usize),

    /// Stored payload is truncated or inconsistent
    #[error("corrupt record: {0}")]
    CorruptRecord(String),

    /// Key absent from the store
    #[error("{kind} {id} not found")]
    NotFound { kind: EntityKind, id: i64 },

    /// File I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid configuration or parameters
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A pipeline worker thread panicked
    #[error("worker thread panicked")]
    WorkerPanicked,
}

impl Error {
    /// True when the store itself is unusable and the run must abort.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Error::Open { .. } | Error::StoreRead(_) | Error::StoreWrite(_) | Error::WorkerPanicked
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }

    /// True for data-integrity failures of a single key or record.
    pub fn is_corrupt(&self) -> bool {
        matches!(self, Error::CorruptKey(_) | Error::CorruptRecord(_))
    }
}

/// Convenience result type for butterfly-osm operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_classification() {
        assert!(Error::StoreRead("io".to_string()).is_fatal());
        assert!(Error::StoreWrite("io".to_string()).is_fatal());
        assert!(!Error::NotFound {
            kind: EntityKind::Node,
            id: 1
        }
        .is_fatal());
        assert!(!Error::CorruptRecord("short".to_string()).is_fatal());
    }

    #[test]
    fn test_not_found_message() {
        let err = Error::NotFound {
            kind: EntityKind::Way,
            id: 17,
        };
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "way 17 not found");
    }
}
