//! Track domain model

use crate::types::{AuthorId, BookId, Duration, Timestamp, Validator};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Unique identifier for a track, assigned by the external media index
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TrackId(i64);

impl TrackId {
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for TrackId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single media item in the catalog
///
/// Created or updated each sync pass from external records merged with
/// prior local state; deleted when the external index no longer reports
/// the id (subject to directory filtering).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Track {
    pub id: TrackId,
    pub title: String,
    /// Display name of the primary author (first position of a split)
    pub author_name: String,
    pub author_id: AuthorId,
    /// Book-level author override, when the index reports one
    pub book_author: Option<String>,
    pub book_name: String,
    pub book_id: BookId,
    pub file_path: PathBuf,
    /// Parent directory of `file_path`, denormalized for rule filtering
    pub parent_dir: PathBuf,
    pub duration: Duration,
    /// Content locator understood by the playback side
    pub content_uri: String,
    pub cover_uri: Option<String>,
    pub genre: Option<String>,
    pub favorite: bool,
    /// User-editable free text (lyrics/transcript)
    pub annotation: Option<String>,
    pub track_number: Option<u32>,
    pub year: Option<u32>,
    pub modified_at: Timestamp,
    pub mime_type: Option<String>,
    pub bitrate: Option<u32>,
    pub sample_rate: Option<u32>,
}

impl Track {
    /// Creates a track with required fields; everything else defaults
    pub fn new(
        id: TrackId,
        title: String,
        author_name: String,
        author_id: AuthorId,
        book_name: String,
        book_id: BookId,
        file_path: PathBuf,
    ) -> Self {
        let parent_dir = file_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let content_uri = format!("file://{}", file_path.display());
        Self {
            id,
            title,
            author_name,
            author_id,
            book_author: None,
            book_name,
            book_id,
            file_path,
            parent_dir,
            duration: Duration::ZERO,
            content_uri,
            cover_uri: None,
            genre: None,
            favorite: false,
            annotation: None,
            track_number: None,
            year: None,
            modified_at: Timestamp::from_millis(0),
            mime_type: None,
            bitrate: None,
            sample_rate: None,
        }
    }
}

impl Validator for Track {
    fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.title.trim().is_empty() {
            errors.push("Title cannot be empty".to_string());
        }

        if self.file_path.as_os_str().is_empty() {
            errors.push("File path cannot be empty".to_string());
        }

        if self.content_uri.trim().is_empty() {
            errors.push("Content URI cannot be empty".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_track() -> Track {
        Track::new(
            TrackId::new(7),
            "Chapter 1".to_string(),
            "Alice Munro".to_string(),
            AuthorId::new(1),
            "Runaway".to_string(),
            BookId::new(3),
            PathBuf::from("/audio/runaway/ch1.mp3"),
        )
    }

    #[test]
    fn test_track_new_derives_parent_dir() {
        let track = test_track();
        assert_eq!(track.parent_dir, PathBuf::from("/audio/runaway"));
    }

    #[test]
    fn test_track_new_derives_content_uri() {
        let track = test_track();
        assert_eq!(track.content_uri, "file:///audio/runaway/ch1.mp3");
    }

    #[test]
    fn test_track_validation_success() {
        assert!(test_track().is_valid());
    }

    #[test]
    fn test_track_validation_empty_title() {
        let mut track = test_track();
        track.title = "   ".to_string();
        assert!(!track.is_valid());
    }

    #[test]
    fn test_track_id_display() {
        assert_eq!(TrackId::new(42).to_string(), "42");
    }

    #[test]
    fn test_track_defaults() {
        let track = test_track();
        assert!(!track.favorite);
        assert!(track.annotation.is_none());
        assert!(track.cover_uri.is_none());
        assert!(track.duration.is_zero());
    }
}
