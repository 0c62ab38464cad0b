//! Author domain model and the track-author junction

use crate::types::{TrackId, Validator};
use serde::{Deserialize, Serialize};

/// Surrogate identifier for an author
///
/// Assigned by the splitter as a monotonic counter; must stay stable for a
/// name across sync passes as long as a prior mapping exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AuthorId(i64);

impl AuthorId {
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for AuthorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An individual author after delimiter splitting
///
/// The name is the dedup key within one sync pass. The image URL is set
/// out-of-band and preserved across syncs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Author {
    pub id: AuthorId,
    pub name: String,
    /// Derived: number of tracks referencing this author
    pub track_count: u32,
    pub image_url: Option<String>,
}

impl Author {
    pub fn new(id: AuthorId, name: String) -> Self {
        Self {
            id,
            name,
            track_count: 0,
            image_url: None,
        }
    }
}

impl Validator for Author {
    fn validate(&self) -> Result<(), Vec<String>> {
        if self.name.trim().is_empty() {
            Err(vec!["Author name cannot be empty".to_string()])
        } else {
            Ok(())
        }
    }
}

/// Many-to-many link between a track and an author
///
/// Exactly one row per track carries `is_primary = true`, corresponding to
/// the first author the delimiter split produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrackAuthorCrossRef {
    pub track_id: TrackId,
    pub author_id: AuthorId,
    pub is_primary: bool,
}

impl TrackAuthorCrossRef {
    pub fn new(track_id: TrackId, author_id: AuthorId, is_primary: bool) -> Self {
        Self {
            track_id,
            author_id,
            is_primary,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_author_new() {
        let author = Author::new(AuthorId::new(1), "Ursula K. Le Guin".to_string());
        assert_eq!(author.track_count, 0);
        assert!(author.image_url.is_none());
        assert!(author.is_valid());
    }

    #[test]
    fn test_author_empty_name_invalid() {
        let author = Author::new(AuthorId::new(1), "  ".to_string());
        assert!(!author.is_valid());
    }

    #[test]
    fn test_cross_ref_equality() {
        let a = TrackAuthorCrossRef::new(TrackId::new(1), AuthorId::new(2), true);
        let b = TrackAuthorCrossRef::new(TrackId::new(1), AuthorId::new(2), true);
        assert_eq!(a, b);
    }
}
