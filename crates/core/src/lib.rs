pub mod error;
pub mod types;

// Re-export commonly used types
pub use error::{AppError, ErrorSeverity, Result};
pub use types::{
    Author, AuthorId, Book, BookId, Duration, Timestamp, Track, TrackAuthorCrossRef, TrackId,
    Validator,
};
