//! On-disk cover art cache
//!
//! Derived artifacts keyed by track id. Each entry is either the cached
//! image (`cover_<id>.img`) or a negative marker (`cover_<id>.none`) that
//! remembers a failed extraction so it is not retried every pass. Any
//! component reading this directory must honor the naming convention to
//! participate in eviction and orphan cleanup correctly.
//!
//! Total size is bounded: when the cap is exceeded, the oldest quarter of
//! the entries (by mtime) is evicted. Cap checks are throttled to one per
//! five minutes behind a mutex so concurrent callers cannot double-evict.
//! Orphan cleanup runs every sync pass, independent of the throttle.

use audioshelf_core::TrackId;
use filetime::FileTime;
use log::{debug, info, warn};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant, SystemTime};
use thiserror::Error;

/// Default size cap: 200 MB
pub const DEFAULT_CAP_BYTES: u64 = 200 * 1024 * 1024;

/// Minimum interval between cap checks
pub const CAP_CHECK_INTERVAL: Duration = Duration::from_secs(5 * 60);

const FILE_PREFIX: &str = "cover_";
const IMAGE_SUFFIX: &str = ".img";
const MARKER_SUFFIX: &str = ".none";

/// Result type for cache operations
pub type CacheResult<T> = Result<T, CacheError>;

/// Errors from the cover art cache
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Failed to create cache directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write cache entry {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Lookup outcome for one track id
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheEntry {
    /// Cached image on disk
    Image(PathBuf),
    /// A previous extraction found no artwork; do not retry
    NoArtwork,
    /// Nothing cached for this id
    Miss,
}

/// Bounded on-disk cache of cover art files
pub struct CoverArtCache {
    dir: PathBuf,
    cap_bytes: u64,
    last_cap_check: Mutex<Option<Instant>>,
}

impl CoverArtCache {
    /// Opens (and creates if needed) a cache in `dir` with the default cap
    pub fn new(dir: impl Into<PathBuf>) -> CacheResult<Self> {
        Self::with_cap(dir, DEFAULT_CAP_BYTES)
    }

    /// Opens a cache with an explicit size cap
    pub fn with_cap(dir: impl Into<PathBuf>, cap_bytes: u64) -> CacheResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| CacheError::CreateDir {
            path: dir.clone(),
            source: e,
        })?;
        Ok(Self {
            dir,
            cap_bytes,
            last_cap_check: Mutex::new(None),
        })
    }

    /// Path an image for this track would live at
    pub fn image_path(&self, id: TrackId) -> PathBuf {
        self.dir
            .join(format!("{}{}{}", FILE_PREFIX, id, IMAGE_SUFFIX))
    }

    fn marker_path(&self, id: TrackId) -> PathBuf {
        self.dir
            .join(format!("{}{}{}", FILE_PREFIX, id, MARKER_SUFFIX))
    }

    /// Stores extracted artwork, replacing any negative marker
    pub fn store(&self, id: TrackId, bytes: &[u8]) -> CacheResult<PathBuf> {
        let path = self.image_path(id);
        fs::write(&path, bytes).map_err(|e| CacheError::Write {
            path: path.clone(),
            source: e,
        })?;
        let _ = fs::remove_file(self.marker_path(id));
        debug!("Cached {} bytes of artwork for track {}", bytes.len(), id);
        Ok(path)
    }

    /// Remembers that this track has no extractable artwork
    pub fn store_marker(&self, id: TrackId) -> CacheResult<()> {
        let path = self.marker_path(id);
        fs::write(&path, b"").map_err(|e| CacheError::Write {
            path: path.clone(),
            source: e,
        })?;
        Ok(())
    }

    /// Looks up a track, refreshing the entry's mtime on a hit so recently
    /// used entries survive eviction
    pub fn lookup(&self, id: TrackId) -> CacheEntry {
        let image = self.image_path(id);
        if image.exists() {
            touch(&image);
            return CacheEntry::Image(image);
        }
        let marker = self.marker_path(id);
        if marker.exists() {
            touch(&marker);
            return CacheEntry::NoArtwork;
        }
        CacheEntry::Miss
    }

    /// Total size in bytes of all cache entries
    pub fn size_bytes(&self) -> u64 {
        self.entries()
            .iter()
            .map(|entry| entry.size)
            .sum()
    }

    /// Evicts the oldest quarter of entries when the cap is exceeded
    ///
    /// Throttled: at most one check per `CAP_CHECK_INTERVAL`. The throttle
    /// state stays locked for the whole eviction so concurrent callers
    /// cannot evict twice. Returns the number of files removed.
    pub fn clean_if_over_cap(&self) -> usize {
        let mut last_check = match self.last_cap_check.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(at) = *last_check {
            if at.elapsed() < CAP_CHECK_INTERVAL {
                return 0;
            }
        }
        *last_check = Some(Instant::now());

        let mut entries = self.entries();
        let total: u64 = entries.iter().map(|e| e.size).sum();
        if total <= self.cap_bytes || entries.is_empty() {
            return 0;
        }

        // Oldest 25% by mtime, never less than one file
        entries.sort_by_key(|e| e.modified);
        let evict_count = entries.len().div_ceil(4).max(1);

        let mut removed = 0usize;
        for entry in entries.iter().take(evict_count) {
            match fs::remove_file(&entry.path) {
                Ok(()) => removed += 1,
                Err(e) => warn!("Failed to evict {}: {}", entry.path.display(), e),
            }
        }
        info!(
            "Cover cache over cap ({} > {} bytes): evicted {} of {} entries",
            total,
            self.cap_bytes,
            removed,
            entries.len()
        );
        removed
    }

    /// Deletes every entry (markers included) whose track id is not in the
    /// currently-valid set. Runs once per sync pass, independent of the
    /// cap throttle.
    pub fn clean_orphans(&self, valid_ids: &HashSet<TrackId>) -> usize {
        let mut removed = 0usize;
        for entry in self.entries() {
            if valid_ids.contains(&entry.track_id) {
                continue;
            }
            match fs::remove_file(&entry.path) {
                Ok(()) => removed += 1,
                Err(e) => warn!("Failed to remove orphan {}: {}", entry.path.display(), e),
            }
        }
        if removed > 0 {
            info!("Removed {} orphaned cover cache entries", removed);
        }
        removed
    }

    /// Removes every cache entry
    pub fn clear_all(&self) -> usize {
        let mut removed = 0usize;
        for entry in self.entries() {
            if fs::remove_file(&entry.path).is_ok() {
                removed += 1;
            }
        }
        removed
    }

    fn entries(&self) -> Vec<EntryInfo> {
        let read_dir = match fs::read_dir(&self.dir) {
            Ok(rd) => rd,
            Err(e) => {
                warn!("Cannot read cache directory {}: {}", self.dir.display(), e);
                return Vec::new();
            }
        };

        let mut entries = Vec::new();
        for dir_entry in read_dir.flatten() {
            let path = dir_entry.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let Some(track_id) = parse_track_id(name) else {
                continue;
            };
            let Ok(metadata) = dir_entry.metadata() else {
                continue;
            };
            entries.push(EntryInfo {
                path,
                track_id,
                size: metadata.len(),
                modified: metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH),
            });
        }
        entries
    }
}

struct EntryInfo {
    path: PathBuf,
    track_id: TrackId,
    size: u64,
    modified: SystemTime,
}

/// Extracts the track id embedded in a cache file name
fn parse_track_id(file_name: &str) -> Option<TrackId> {
    let rest = file_name.strip_prefix(FILE_PREFIX)?;
    let id_str = rest
        .strip_suffix(IMAGE_SUFFIX)
        .or_else(|| rest.strip_suffix(MARKER_SUFFIX))?;
    id_str.parse::<i64>().ok().map(TrackId::new)
}

/// Sets a file's mtime to now; failures are non-fatal
fn touch(path: &Path) {
    if let Err(e) = filetime::set_file_mtime(path, FileTime::now()) {
        debug!("Failed to touch {}: {}", path.display(), e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use filetime::set_file_mtime;
    use tempfile::TempDir;

    fn cache_with_cap(cap: u64) -> (TempDir, CoverArtCache) {
        let temp = TempDir::new().unwrap();
        let cache = CoverArtCache::with_cap(temp.path().join("covers"), cap).unwrap();
        (temp, cache)
    }

    fn backdate(path: &Path, seconds_ago: i64) {
        let mtime = FileTime::from_unix_time(FileTime::now().unix_seconds() - seconds_ago, 0);
        set_file_mtime(path, mtime).unwrap();
    }

    #[test]
    fn test_store_and_lookup() {
        let (_temp, cache) = cache_with_cap(DEFAULT_CAP_BYTES);
        let id = TrackId::new(42);

        assert_eq!(cache.lookup(id), CacheEntry::Miss);

        let path = cache.store(id, &[1, 2, 3]).unwrap();
        assert_eq!(cache.lookup(id), CacheEntry::Image(path.clone()));
        assert_eq!(fs::read(path).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_marker_roundtrip() {
        let (_temp, cache) = cache_with_cap(DEFAULT_CAP_BYTES);
        let id = TrackId::new(7);

        cache.store_marker(id).unwrap();
        assert_eq!(cache.lookup(id), CacheEntry::NoArtwork);

        // A later successful extraction replaces the marker
        cache.store(id, &[9]).unwrap();
        assert!(matches!(cache.lookup(id), CacheEntry::Image(_)));
    }

    #[test]
    fn test_size_bytes_sums_entries() {
        let (_temp, cache) = cache_with_cap(DEFAULT_CAP_BYTES);
        cache.store(TrackId::new(1), &[0u8; 100]).unwrap();
        cache.store(TrackId::new(2), &[0u8; 50]).unwrap();
        cache.store_marker(TrackId::new(3)).unwrap();

        assert_eq!(cache.size_bytes(), 150);
    }

    #[test]
    fn test_eviction_removes_oldest_quarter() {
        let (_temp, cache) = cache_with_cap(4096);

        // 8 entries of 1 KB each: 8 KB total, cap 4 KB
        for i in 0..8i64 {
            let path = cache.store(TrackId::new(i), &[0u8; 1024]).unwrap();
            // Entry 0 is oldest, entry 7 newest
            backdate(&path, 1000 - i * 100);
        }

        let removed = cache.clean_if_over_cap();
        assert_eq!(removed, 2);

        // The oldest two entries are gone, the newest survive
        assert_eq!(cache.lookup(TrackId::new(0)), CacheEntry::Miss);
        assert_eq!(cache.lookup(TrackId::new(1)), CacheEntry::Miss);
        assert!(matches!(cache.lookup(TrackId::new(7)), CacheEntry::Image(_)));
    }

    #[test]
    fn test_eviction_removes_at_least_one() {
        let (_temp, cache) = cache_with_cap(1024);
        let path = cache.store(TrackId::new(1), &[0u8; 2048]).unwrap();
        backdate(&path, 100);
        cache.store(TrackId::new(2), &[0u8; 10]).unwrap();

        let removed = cache.clean_if_over_cap();
        assert_eq!(removed, 1);
        assert_eq!(cache.lookup(TrackId::new(1)), CacheEntry::Miss);
    }

    #[test]
    fn test_under_cap_evicts_nothing() {
        let (_temp, cache) = cache_with_cap(DEFAULT_CAP_BYTES);
        cache.store(TrackId::new(1), &[0u8; 10]).unwrap();
        assert_eq!(cache.clean_if_over_cap(), 0);
        assert!(matches!(cache.lookup(TrackId::new(1)), CacheEntry::Image(_)));
    }

    #[test]
    fn test_cap_check_is_throttled() {
        let (_temp, cache) = cache_with_cap(512);
        cache.store(TrackId::new(1), &[0u8; 1024]).unwrap();
        cache.store(TrackId::new(2), &[0u8; 1024]).unwrap();

        assert!(cache.clean_if_over_cap() > 0);
        // Still over cap, but the throttle suppresses the second check
        assert_eq!(cache.clean_if_over_cap(), 0);
    }

    #[test]
    fn test_orphan_cleanup_removes_unknown_ids() {
        let (_temp, cache) = cache_with_cap(DEFAULT_CAP_BYTES);
        cache.store(TrackId::new(1), &[1]).unwrap();
        cache.store(TrackId::new(2), &[2]).unwrap();
        cache.store_marker(TrackId::new(3)).unwrap();

        let valid: HashSet<TrackId> = [TrackId::new(1)].into_iter().collect();
        let removed = cache.clean_orphans(&valid);

        assert_eq!(removed, 2);
        assert!(matches!(cache.lookup(TrackId::new(1)), CacheEntry::Image(_)));
        assert_eq!(cache.lookup(TrackId::new(2)), CacheEntry::Miss);
        assert_eq!(cache.lookup(TrackId::new(3)), CacheEntry::Miss);
    }

    #[test]
    fn test_orphan_cleanup_ignores_foreign_files() {
        let (_temp, cache) = cache_with_cap(DEFAULT_CAP_BYTES);
        let foreign = cache.image_path(TrackId::new(0)).with_file_name("notes.txt");
        fs::write(&foreign, b"keep me").unwrap();

        let removed = cache.clean_orphans(&HashSet::new());
        assert_eq!(removed, 0);
        assert!(foreign.exists());
    }

    #[test]
    fn test_clear_all() {
        let (_temp, cache) = cache_with_cap(DEFAULT_CAP_BYTES);
        cache.store(TrackId::new(1), &[1]).unwrap();
        cache.store_marker(TrackId::new(2)).unwrap();

        assert_eq!(cache.clear_all(), 2);
        assert_eq!(cache.size_bytes(), 0);
    }

    #[test]
    fn test_parse_track_id() {
        assert_eq!(parse_track_id("cover_42.img"), Some(TrackId::new(42)));
        assert_eq!(parse_track_id("cover_42.none"), Some(TrackId::new(42)));
        assert_eq!(parse_track_id("cover_.img"), None);
        assert_eq!(parse_track_id("other_42.img"), None);
        assert_eq!(parse_track_id("cover_42.jpg"), None);
    }

    #[test]
    fn test_lookup_refreshes_mtime() {
        let (_temp, cache) = cache_with_cap(DEFAULT_CAP_BYTES);
        let path = cache.store(TrackId::new(1), &[1]).unwrap();
        backdate(&path, 10_000);
        let stale = fs::metadata(&path).unwrap().modified().unwrap();

        cache.lookup(TrackId::new(1));
        let fresh = fs::metadata(&path).unwrap().modified().unwrap();
        assert!(fresh > stale);
    }
}
