//! Book domain model

use crate::types::{AuthorId, Validator};
use serde::{Deserialize, Serialize};

/// Surrogate identifier for a book
///
/// Reused from the external index's original book id when available, else
/// regenerated per (title, grouping author) group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BookId(i64);

impl BookId {
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for BookId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An aggregate grouping of tracks sharing a (title, resolved author)
/// identity
///
/// The same physical book is never duplicated because of a different
/// combining strategy: the identity key is the title plus the resolved
/// grouping author, regardless of how author strings were combined.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Book {
    pub id: BookId,
    pub title: String,
    /// Resolved grouping author (book-level override or primary author)
    pub author_name: String,
    pub author_id: AuthorId,
    pub cover_uri: Option<String>,
    /// Derived: number of tracks grouped under this book
    pub track_count: u32,
    pub year: Option<u32>,
}

impl Book {
    pub fn new(id: BookId, title: String, author_name: String, author_id: AuthorId) -> Self {
        Self {
            id,
            title,
            author_name,
            author_id,
            cover_uri: None,
            track_count: 0,
            year: None,
        }
    }
}

impl Validator for Book {
    fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.title.trim().is_empty() {
            errors.push("Title cannot be empty".to_string());
        }

        if self.author_name.trim().is_empty() {
            errors.push("Author name cannot be empty".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
