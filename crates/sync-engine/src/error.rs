//! Error types for sync passes

use audioshelf_core::AppError;
use audioshelf_provider::ProviderError;
use thiserror::Error;

/// Result type for sync operations
pub type SyncResult<T> = Result<T, SyncError>;

/// Pass-level failures
///
/// Per-item failures (one unreadable file, one failed genre lookup) are
/// absorbed and logged at the component boundary; only these propagate to
/// the caller. There is no partial-success variant: the last-sync
/// timestamp only advances when the whole pass succeeded.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The primary index fetch failed
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Reading or writing the local catalog failed
    #[error("Storage error: {0}")]
    Storage(#[from] AppError),

    /// The pass was cancelled cooperatively
    #[error("Sync cancelled")]
    Cancelled,
}
