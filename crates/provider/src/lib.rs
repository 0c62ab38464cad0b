//! External catalog access
//!
//! The device media index is authoritative for which tracks exist but
//! unreliable about their metadata. This crate exposes the read-only seam
//! to it: the `MediaIndex` trait, a filesystem-backed implementation, the
//! directory rule resolver, and the `CatalogReader` that ties them
//! together with directory filtering and a TTL genre cache.

mod dir_rules;
mod index;
mod local;
mod reader;
mod record;

pub use dir_rules::DirectoryRules;
pub use index::MediaIndex;
pub use local::LocalMediaIndex;
pub use reader::{CatalogReader, GENRE_CACHE_TTL, GENRE_POOL_WIDTH, SCAN_TRIGGER_TIMEOUT};
pub use record::RawTrack;

use std::path::PathBuf;
use thiserror::Error;

/// Result type for provider operations
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Errors from the external catalog
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Primary index query failed
    #[error("Index query failed: {0}")]
    Query(String),

    /// A path returned by the index could not be interpreted
    #[error("Invalid index record for {path}: {reason}")]
    InvalidRecord { path: PathBuf, reason: String },

    /// I/O error while reading the index
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ProviderError> for audioshelf_core::AppError {
    fn from(err: ProviderError) -> Self {
        audioshelf_core::AppError::provider("catalog query failed", err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ProviderError::Query("cursor closed".to_string());
        assert!(err.to_string().contains("cursor closed"));
    }

    #[test]
    fn test_error_converts_to_app_error() {
        let err: audioshelf_core::AppError = ProviderError::Query("x".to_string()).into();
        assert!(err.is_fatal());
    }
}
