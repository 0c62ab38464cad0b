//! Filesystem-backed media index
//!
//! A quick index in the spirit of a device media store: rows are derived
//! from the filesystem layout alone (file stem, parent and grandparent
//! directory names, mtime) without opening files. Tag-accurate metadata is
//! the deep-scan pass's job, not this one's.

use crate::{MediaIndex, ProviderError, ProviderResult, RawTrack};
use audioshelf_core::{AuthorId, BookId, Duration, Timestamp, TrackId};
use audioshelf_media_formats::AudioFormat;
use lofty::prelude::*;
use lofty::probe::Probe;
use log::{debug, warn};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use std::time::UNIX_EPOCH;
use walkdir::WalkDir;

const UNKNOWN_AUTHOR: &str = "Unknown Author";
const UNKNOWN_BOOK: &str = "Unknown Book";

/// Media index backed by walking a set of root directories
pub struct LocalMediaIndex {
    roots: Vec<PathBuf>,
    /// id -> path mapping refreshed by every walk; serves genre lookups
    path_cache: RwLock<HashMap<TrackId, PathBuf>>,
}

impl LocalMediaIndex {
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self {
            roots,
            path_cache: RwLock::new(HashMap::new()),
        }
    }

    /// Walks all roots and returns every recognized audio file
    fn walk(&self) -> Vec<PathBuf> {
        let mut files = Vec::new();
        for root in &self.roots {
            if !root.exists() {
                warn!("Index root does not exist: {}", root.display());
                continue;
            }
            for entry in WalkDir::new(root).follow_links(false) {
                let entry = match entry {
                    Ok(e) => e,
                    Err(e) => {
                        warn!("Error walking {}: {}", root.display(), e);
                        continue;
                    }
                };
                let path = entry.path();
                if entry.file_type().is_file() && AudioFormat::from_path(path).is_some() {
                    files.push(path.to_path_buf());
                }
            }
        }
        files
    }

    fn remember(&self, id: TrackId, path: &Path) {
        if let Ok(mut cache) = self.path_cache.write() {
            cache.insert(id, path.to_path_buf());
        }
    }

    fn record_for(&self, path: &Path) -> ProviderResult<RawTrack> {
        let id = TrackId::new(stable_id(&path.to_string_lossy()));
        self.remember(id, path);

        let metadata = std::fs::metadata(path)?;
        let modified_seconds = metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);

        let title = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("Unknown")
            .to_string();

        let parent = path.parent();
        let book_name = parent
            .and_then(Path::file_name)
            .and_then(|s| s.to_str())
            .unwrap_or(UNKNOWN_BOOK)
            .to_string();
        let author = parent
            .and_then(Path::parent)
            .and_then(Path::file_name)
            .and_then(|s| s.to_str())
            .unwrap_or(UNKNOWN_AUTHOR)
            .to_string();

        let book_id = parent.map(|p| BookId::new(stable_id(&p.to_string_lossy())));
        let author_id = Some(AuthorId::new(stable_id(&author)));

        Ok(RawTrack {
            id,
            book_id,
            author_id,
            title,
            author,
            book_name,
            book_author: None,
            duration: Duration::ZERO,
            track_number: None,
            year: None,
            modified_at: Timestamp::from_seconds(modified_seconds),
            content_uri: format!("file://{}", path.display()),
            path: path.to_path_buf(),
        })
    }
}

impl MediaIndex for LocalMediaIndex {
    fn known_files(&self) -> ProviderResult<Vec<(TrackId, PathBuf)>> {
        let files = self.walk();
        let mut known = Vec::with_capacity(files.len());
        for path in files {
            let id = TrackId::new(stable_id(&path.to_string_lossy()));
            self.remember(id, &path);
            known.push((id, path));
        }
        Ok(known)
    }

    fn tracks_changed_since(&self, since_seconds: Option<i64>) -> ProviderResult<Vec<RawTrack>> {
        let mut records = Vec::new();
        for path in self.walk() {
            let record = match self.record_for(&path) {
                Ok(r) => r,
                Err(e) => {
                    warn!("Skipping unreadable file {}: {}", path.display(), e);
                    continue;
                }
            };
            if let Some(since) = since_seconds {
                if record.modified_at.as_seconds() < since {
                    continue;
                }
            }
            records.push(record);
        }
        debug!("Index walk produced {} changed rows", records.len());
        Ok(records)
    }

    fn genre_of(&self, id: TrackId) -> ProviderResult<Option<String>> {
        let path = match self.path_cache.read() {
            Ok(cache) => cache.get(&id).cloned(),
            Err(_) => None,
        };
        let Some(path) = path else {
            return Ok(None);
        };

        let tagged = Probe::open(&path)
            .map_err(|e| ProviderError::Query(format!("{}: {}", path.display(), e)))?
            .read();
        match tagged {
            Ok(file) => Ok(file
                .primary_tag()
                .and_then(|tag| tag.genre())
                .map(|s| s.to_string())),
            // Unreadable tags are an empty genre, not a query failure
            Err(e) => {
                debug!("No readable tags in {}: {}", path.display(), e);
                Ok(None)
            }
        }
    }

    fn request_scan(&self, paths: &[PathBuf]) -> ProviderResult<()> {
        let mut discovered = 0usize;
        for path in paths {
            if !path.exists() {
                continue;
            }
            for entry in WalkDir::new(path).follow_links(false) {
                let entry = match entry {
                    Ok(e) => e,
                    Err(_) => continue,
                };
                let p = entry.path();
                if entry.file_type().is_file() && AudioFormat::from_path(p).is_some() {
                    let id = TrackId::new(stable_id(&p.to_string_lossy()));
                    self.remember(id, p);
                    discovered += 1;
                }
            }
        }
        debug!("Scan request registered {} files", discovered);
        Ok(())
    }
}

/// Stable non-negative 64-bit id derived from a string
fn stable_id(input: &str) -> i64 {
    let digest = Sha256::digest(input.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    i64::from_be_bytes(bytes) & i64::MAX
}
