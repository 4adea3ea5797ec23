//! Error types for the cache
//!
//! Provides unified error handling using thiserror.

use std::path::PathBuf;

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Construction with a zero capacity
    #[error("Invalid capacity: {0} (must be > 0)")]
    InvalidCapacity(usize),

    /// Key not found in cache
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Key existed but its TTL had elapsed
    #[error("Key expired: {0}")]
    Expired(String),

    /// Snapshot could not be written or read
    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    /// Value has no JSON representation, or a stored value does not match the requested type
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The dedicated autosave runtime could not be created
    #[error("Failed to start autosave: {0}")]
    AutosaveStart(#[source] std::io::Error),
}

impl CacheError {
    /// Returns true for plain misses and for expired keys.
    ///
    /// An expired key is a refinement of a missing one, so callers that only care
    /// about "no usable value" can match both with this.
    pub fn is_not_found(&self) -> bool {
        matches!(self, CacheError::NotFound(_) | CacheError::Expired(_))
    }
}

// == Persistence Error Enum ==
/// Failure while reading or writing a snapshot file.
#[derive(Error, Debug)]
pub enum PersistenceError {
    /// Filesystem failure (open, write, sync, rename)
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The snapshot could not be encoded or parsed
    #[error("Malformed snapshot {}: {source}", .path.display())]
    Format {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

// == Result Type Alias ==
/// Convenience Result type for the cache.
pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expired_refines_not_found() {
        assert!(CacheError::NotFound("a".to_string()).is_not_found());
        assert!(CacheError::Expired("a".to_string()).is_not_found());
        assert!(!CacheError::InvalidCapacity(0).is_not_found());
    }

    #[test]
    fn test_persistence_error_message_names_path() {
        let err: CacheError = PersistenceError::Io {
            path: PathBuf::from("/tmp/snapshot.json"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        }
        .into();

        let message = err.to_string();
        assert!(message.contains("/tmp/snapshot.json"));
        assert!(message.contains("denied"));
    }
}
