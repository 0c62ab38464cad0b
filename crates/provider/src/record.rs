//! Raw rows as the external index reports them

use audioshelf_core::{AuthorId, BookId, Duration, Timestamp, TrackId};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// One track row from the external media index, before any splitting,
/// merging or enrichment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawTrack {
    /// Index-assigned stable id
    pub id: TrackId,
    /// The index's own book id, when it reports one
    pub book_id: Option<BookId>,
    /// The index's own primary-author id, used only as an initial value
    /// until the splitter assigns surrogate ids
    pub author_id: Option<AuthorId>,
    pub path: PathBuf,
    pub title: String,
    /// Possibly multi-valued, delimiter-joined author string
    pub author: String,
    pub book_name: String,
    /// Book-level author override, when the index reports one
    pub book_author: Option<String>,
    pub duration: Duration,
    pub track_number: Option<u32>,
    pub year: Option<u32>,
    pub modified_at: Timestamp,
    /// Content locator understood by the playback side
    pub content_uri: String,
}

impl RawTrack {
    /// Parent directory of the file, used for rule filtering
    pub fn parent_dir(&self) -> PathBuf {
        self.path.parent().map(PathBuf::from).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parent_dir() {
        let raw = RawTrack {
            id: TrackId::new(1),
            book_id: None,
            author_id: None,
            path: PathBuf::from("/audio/book/ch1.mp3"),
            title: "ch1".to_string(),
            author: "Someone".to_string(),
            book_name: "book".to_string(),
            book_author: None,
            duration: Duration::ZERO,
            track_number: None,
            year: None,
            modified_at: Timestamp::from_millis(0),
            content_uri: "file:///audio/book/ch1.mp3".to_string(),
        };
        assert_eq!(raw.parent_dir(), PathBuf::from("/audio/book"));
    }
}
