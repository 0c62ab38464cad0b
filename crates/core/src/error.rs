//! Error types for AudioShelf
//!
//! A single `AppError` taxonomy shared by all crates, with three severity
//! tiers:
//! - **Recoverable**: can be retried (locked database, transient index I/O)
//! - **Degraded**: one item or feature affected, the pass continues
//! - **Fatal**: the current operation must abort

use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Error severity classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    /// Error can be retried
    Recoverable,
    /// One item or feature affected, processing continues
    Degraded,
    /// The current operation must abort
    Fatal,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Recoverable => write!(f, "Recoverable"),
            Self::Degraded => write!(f, "Degraded"),
            Self::Fatal => write!(f, "Fatal"),
        }
    }
}

/// Main error type for AudioShelf
#[derive(Error, Debug)]
pub enum AppError {
    /// Database operation failed
    #[error("Database error: {message}")]
    DatabaseError {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Database is locked by another process
    #[error("Database locked: {operation}")]
    DatabaseLocked { operation: String },

    /// Database migration failed
    #[error("Migration {version} failed: {reason}")]
    MigrationFailed { version: i64, reason: String },

    /// Record not found in database
    #[error("Record not found: {entity} with {identifier}")]
    RecordNotFound { entity: String, identifier: String },

    /// Media index query failed
    #[error("Provider error: {message}")]
    ProviderError {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Media index scan request timed out
    #[error("Provider scan timed out after {seconds}s")]
    ProviderScanTimeout { seconds: u64 },

    /// Failed to parse tags out of an audio file
    #[error("Tag parse error in {file}: {reason}")]
    TagParseError { file: PathBuf, reason: String },

    /// Artifact cache read or write failed
    #[error("Cache error at {path}: {reason}")]
    CacheError { path: PathBuf, reason: String },

    /// Invalid configuration value
    #[error("Invalid configuration: {setting} = '{value}' ({reason})")]
    InvalidConfiguration {
        setting: String,
        value: String,
        reason: String,
    },

    /// General I/O error
    #[error("I/O error: {message}")]
    IoError {
        message: String,
        #[source]
        source: io::Error,
    },

    /// Operation cancelled
    #[error("Operation cancelled: {operation}")]
    Cancelled { operation: String },

    /// Generic internal error
    #[error("Internal error: {message}")]
    InternalError { message: String },
}

impl AppError {
    /// Returns the severity level of this error
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::DatabaseLocked { .. } => ErrorSeverity::Recoverable,

            Self::TagParseError { .. }
            | Self::CacheError { .. }
            | Self::ProviderScanTimeout { .. }
            | Self::RecordNotFound { .. } => ErrorSeverity::Degraded,

            Self::DatabaseError { .. }
            | Self::MigrationFailed { .. }
            | Self::ProviderError { .. }
            | Self::InvalidConfiguration { .. }
            | Self::IoError { .. }
            | Self::Cancelled { .. }
            | Self::InternalError { .. } => ErrorSeverity::Fatal,
        }
    }

    /// Returns true if this error aborts the enclosing pass
    pub fn is_fatal(&self) -> bool {
        self.severity() == ErrorSeverity::Fatal
    }

    /// Helper to create a database error from any error type
    pub fn database<E: std::error::Error + Send + Sync + 'static>(
        message: impl Into<String>,
        source: E,
    ) -> Self {
        Self::DatabaseError {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Helper to create a provider error from any error type
    pub fn provider<E: std::error::Error + Send + Sync + 'static>(
        message: impl Into<String>,
        source: E,
    ) -> Self {
        Self::ProviderError {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Helper to create a provider error without a source
    pub fn provider_msg(message: impl Into<String>) -> Self {
        Self::ProviderError {
            message: message.into(),
            source: None,
        }
    }

    /// Helper to create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::InternalError {
            message: message.into(),
        }
    }
}

/// Convenience type alias for Results using AppError
pub type Result<T> = std::result::Result<T, AppError>;

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        Self::IoError {
            message: err.to_string(),
            source: err,
        }
    }
}
