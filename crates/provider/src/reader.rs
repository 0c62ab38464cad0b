//! External catalog reader
//!
//! Wraps a `MediaIndex` with directory-rule filtering, moves its blocking
//! calls off the orchestration task, pools the expensive per-id genre
//! lookups behind a bounded semaphore and a TTL cache, and exposes the
//! best-effort, bounded scan trigger.

use crate::{DirectoryRules, MediaIndex, ProviderResult, RawTrack};
use audioshelf_core::{Timestamp, TrackId};
use log::{debug, warn};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{RwLock, Semaphore};
use tokio::task::JoinSet;

/// Width of the genre sub-query pool
pub const GENRE_POOL_WIDTH: usize = 4;

/// How long a fetched genre map stays fresh
pub const GENRE_CACHE_TTL: Duration = Duration::from_secs(60 * 60);

/// Default bound on the index scan-trigger wait
pub const SCAN_TRIGGER_TIMEOUT: Duration = Duration::from_secs(15);

struct CachedGenres {
    fetched_at: Instant,
    /// `None` values remember "no genre" so failed lookups are not retried
    /// within the TTL window
    map: HashMap<TrackId, Option<String>>,
}

/// Filtered, cached access to the external media index
pub struct CatalogReader {
    index: Arc<dyn MediaIndex>,
    rules: DirectoryRules,
    genre_pool: Arc<Semaphore>,
    genre_cache: RwLock<Option<CachedGenres>>,
    genre_ttl: Duration,
}

impl CatalogReader {
    pub fn new(index: Arc<dyn MediaIndex>, rules: DirectoryRules) -> Self {
        Self::with_genre_ttl(index, rules, GENRE_CACHE_TTL)
    }

    pub fn with_genre_ttl(
        index: Arc<dyn MediaIndex>,
        rules: DirectoryRules,
        genre_ttl: Duration,
    ) -> Self {
        Self {
            index,
            rules,
            genre_pool: Arc::new(Semaphore::new(GENRE_POOL_WIDTH)),
            genre_cache: RwLock::new(None),
            genre_ttl,
        }
    }

    /// Ids the index currently knows, with blocked directories removed
    pub async fn known_ids(&self) -> ProviderResult<HashSet<TrackId>> {
        let index = Arc::clone(&self.index);
        let files = tokio::task::spawn_blocking(move || index.known_files())
            .await
            .map_err(|e| crate::ProviderError::Query(format!("index task failed: {}", e)))??;

        let rules = &self.rules;
        Ok(files
            .into_iter()
            .filter(|(_, path)| {
                let dir = path.parent().map(PathBuf::from).unwrap_or_default();
                !rules.is_blocked(&dir)
            })
            .map(|(id, _)| id)
            .collect())
    }

    /// Rows changed since `since` (`None` fetches everything), with
    /// blocked directories removed
    ///
    /// The index speaks whole seconds; the millisecond timestamp is
    /// floored, which can only widen the fetch window.
    pub async fn fetch_changed_since(
        &self,
        since: Option<Timestamp>,
    ) -> ProviderResult<Vec<RawTrack>> {
        let index = Arc::clone(&self.index);
        let since_seconds = since.map(|t| t.as_seconds());
        let records = tokio::task::spawn_blocking(move || index.tracks_changed_since(since_seconds))
            .await
            .map_err(|e| crate::ProviderError::Query(format!("index task failed: {}", e)))??;

        let before = records.len();
        let filtered: Vec<RawTrack> = records
            .into_iter()
            .filter(|r| !self.rules.is_blocked(&r.parent_dir()))
            .collect();
        debug!(
            "Fetched {} rows, {} after directory filtering",
            before,
            filtered.len()
        );
        Ok(filtered)
    }

    /// Genre strings for the given ids, served from the TTL cache
    ///
    /// Missing entries are fetched through the bounded lookup pool.
    /// Per-id lookup failures are logged and yield no entry; they never
    /// fail the batch.
    pub async fn genres_for(&self, ids: &[TrackId]) -> HashMap<TrackId, String> {
        let mut missing: Vec<TrackId> = Vec::new();
        {
            let cache = self.genre_cache.read().await;
            match cache.as_ref() {
                Some(cached) if cached.fetched_at.elapsed() < self.genre_ttl => {
                    missing = ids
                        .iter()
                        .filter(|id| !cached.map.contains_key(id))
                        .copied()
                        .collect();
                }
                _ => missing.extend_from_slice(ids),
            }
        }

        if !missing.is_empty() {
            let fetched = self.fetch_genres(&missing).await;

            let mut cache = self.genre_cache.write().await;
            match cache.as_mut() {
                // Single refresher: merge into a still-fresh map
                Some(cached) if cached.fetched_at.elapsed() < self.genre_ttl => {
                    cached.map.extend(fetched);
                }
                _ => {
                    *cache = Some(CachedGenres {
                        fetched_at: Instant::now(),
                        map: fetched,
                    });
                }
            }
        }

        let cache = self.genre_cache.read().await;
        let Some(cached) = cache.as_ref() else {
            return HashMap::new();
        };
        ids.iter()
            .filter_map(|id| {
                cached
                    .map
                    .get(id)
                    .and_then(|genre| genre.clone())
                    .map(|genre| (*id, genre))
            })
            .collect()
    }

    /// Drops the cached genre map; the next `genres_for` refetches
    pub async fn invalidate_genres(&self) {
        *self.genre_cache.write().await = None;
    }

    async fn fetch_genres(&self, ids: &[TrackId]) -> HashMap<TrackId, Option<String>> {
        let mut tasks = JoinSet::new();
        for &id in ids {
            let index = Arc::clone(&self.index);
            let pool = Arc::clone(&self.genre_pool);
            tasks.spawn(async move {
                let _permit = pool.acquire_owned().await;
                let result =
                    tokio::task::spawn_blocking(move || index.genre_of(id)).await;
                match result {
                    Ok(Ok(genre)) => (id, genre),
                    Ok(Err(e)) => {
                        warn!("Genre lookup failed for track {}: {}", id, e);
                        (id, None)
                    }
                    Err(e) => {
                        warn!("Genre lookup task failed for track {}: {}", id, e);
                        (id, None)
                    }
                }
            });
        }

        let mut fetched = HashMap::with_capacity(ids.len());
        while let Some(joined) = tasks.join_next().await {
            if let Ok((id, genre)) = joined {
                fetched.insert(id, genre);
            }
        }
        fetched
    }

    /// Asks the index to pick up the given paths, waiting at most
    /// `timeout`. Best-effort: returns false on timeout or failure and the
    /// caller proceeds regardless.
    pub async fn trigger_scan(&self, paths: Vec<PathBuf>, timeout: Duration) -> bool {
        let index = Arc::clone(&self.index);
        let scan = tokio::task::spawn_blocking(move || index.request_scan(&paths));

        match tokio::time::timeout(timeout, scan).await {
            Ok(Ok(Ok(()))) => true,
            Ok(Ok(Err(e))) => {
                warn!("Index scan request failed: {}", e);
                false
            }
            Ok(Err(e)) => {
                warn!("Index scan task failed: {}", e);
                false
            }
            Err(_) => {
                warn!(
                    "Index scan request did not complete within {:?}, proceeding without it",
                    timeout
                );
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ProviderError;
    use audioshelf_core::Duration as TrackDuration;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeIndex {
        rows: Vec<RawTrack>,
        genre_calls: AtomicUsize,
        scan_delay: Duration,
    }

    impl FakeIndex {
        fn new(rows: Vec<RawTrack>) -> Self {
            Self {
                rows,
                genre_calls: AtomicUsize::new(0),
                scan_delay: Duration::from_millis(0),
            }
        }
    }

    impl MediaIndex for FakeIndex {
        fn known_files(&self) -> ProviderResult<Vec<(TrackId, PathBuf)>> {
            Ok(self.rows.iter().map(|r| (r.id, r.path.clone())).collect())
        }

        fn tracks_changed_since(
            &self,
            since_seconds: Option<i64>,
        ) -> ProviderResult<Vec<RawTrack>> {
            Ok(self
                .rows
                .iter()
                .filter(|r| since_seconds.map_or(true, |s| r.modified_at.as_seconds() >= s))
                .cloned()
                .collect())
        }

        fn genre_of(&self, id: TrackId) -> ProviderResult<Option<String>> {
            self.genre_calls.fetch_add(1, Ordering::SeqCst);
            if id == TrackId::new(99) {
                return Err(ProviderError::Query("bad row".to_string()));
            }
            Ok(Some(format!("genre-{}", id)))
        }

        fn request_scan(&self, _paths: &[PathBuf]) -> ProviderResult<()> {
            std::thread::sleep(self.scan_delay);
            Ok(())
        }
    }

    fn raw(id: i64, path: &str, modified_seconds: i64) -> RawTrack {
        RawTrack {
            id: TrackId::new(id),
            book_id: None,
            author_id: None,
            path: PathBuf::from(path),
            title: format!("t{}", id),
            author: "A".to_string(),
            book_name: "B".to_string(),
            book_author: None,
            duration: TrackDuration::ZERO,
            track_number: None,
            year: None,
            modified_at: Timestamp::from_seconds(modified_seconds),
            content_uri: format!("file://{}", path),
        }
    }

    fn allow_all() -> DirectoryRules {
        DirectoryRules::new(vec![PathBuf::from("/")], Vec::new())
    }

    #[tokio::test]
    async fn test_fetch_filters_blocked_directories() {
        let index = Arc::new(FakeIndex::new(vec![
            raw(1, "/music/a/t1.mp3", 100),
            raw(2, "/music/podcasts/t2.mp3", 100),
        ]));
        let rules = DirectoryRules::new(
            vec![PathBuf::from("/music")],
            vec![PathBuf::from("/music/podcasts")],
        );
        let reader = CatalogReader::new(index, rules);

        let records = reader.fetch_changed_since(None).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, TrackId::new(1));
    }

    #[tokio::test]
    async fn test_known_ids_filters_blocked_directories() {
        let index = Arc::new(FakeIndex::new(vec![
            raw(1, "/music/a/t1.mp3", 100),
            raw(2, "/other/t2.mp3", 100),
        ]));
        let rules = DirectoryRules::new(vec![PathBuf::from("/music")], Vec::new());
        let reader = CatalogReader::new(index, rules);

        let ids = reader.known_ids().await.unwrap();
        assert_eq!(ids.len(), 1);
        assert!(ids.contains(&TrackId::new(1)));
    }

    #[tokio::test]
    async fn test_fetch_converts_millis_to_seconds() {
        let index = Arc::new(FakeIndex::new(vec![
            raw(1, "/music/a/t1.mp3", 100),
            raw(2, "/music/a/t2.mp3", 300),
        ]));
        let reader = CatalogReader::new(index, allow_all());

        // 200_500 ms floors to 200 s, so only the newer row qualifies
        let records = reader
            .fetch_changed_since(Some(Timestamp::from_millis(200_500)))
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, TrackId::new(2));
    }

    #[tokio::test]
    async fn test_genres_are_cached_within_ttl() {
        let index = Arc::new(FakeIndex::new(vec![raw(1, "/music/a/t1.mp3", 100)]));
        let reader = CatalogReader::new(Arc::clone(&index) as Arc<dyn MediaIndex>, allow_all());

        let ids = [TrackId::new(1), TrackId::new(2)];
        let first = reader.genres_for(&ids).await;
        assert_eq!(first.len(), 2);
        assert_eq!(index.genre_calls.load(Ordering::SeqCst), 2);

        let second = reader.genres_for(&ids).await;
        assert_eq!(second.len(), 2);
        assert_eq!(index.genre_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_invalidate_forces_refetch() {
        let index = Arc::new(FakeIndex::new(vec![raw(1, "/music/a/t1.mp3", 100)]));
        let reader = CatalogReader::new(Arc::clone(&index) as Arc<dyn MediaIndex>, allow_all());

        let ids = [TrackId::new(1)];
        reader.genres_for(&ids).await;
        reader.invalidate_genres().await;
        reader.genres_for(&ids).await;
        assert_eq!(index.genre_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_stale_cache_refetches() {
        let index = Arc::new(FakeIndex::new(vec![raw(1, "/music/a/t1.mp3", 100)]));
        let reader = CatalogReader::with_genre_ttl(
            Arc::clone(&index) as Arc<dyn MediaIndex>,
            allow_all(),
            Duration::from_millis(0),
        );

        let ids = [TrackId::new(1)];
        reader.genres_for(&ids).await;
        reader.genres_for(&ids).await;
        assert_eq!(index.genre_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_failed_genre_lookup_is_absorbed() {
        let index = Arc::new(FakeIndex::new(vec![raw(99, "/music/a/t99.mp3", 100)]));
        let reader = CatalogReader::new(index, allow_all());

        let genres = reader.genres_for(&[TrackId::new(99)]).await;
        assert!(genres.is_empty());
    }

    #[tokio::test]
    async fn test_trigger_scan_completes() {
        let index = Arc::new(FakeIndex::new(Vec::new()));
        let reader = CatalogReader::new(index, allow_all());

        let ok = reader
            .trigger_scan(vec![PathBuf::from("/music")], Duration::from_secs(1))
            .await;
        assert!(ok);
    }

    #[tokio::test]
    async fn test_trigger_scan_times_out_without_failing() {
        let index = Arc::new(FakeIndex {
            rows: Vec::new(),
            genre_calls: AtomicUsize::new(0),
            scan_delay: Duration::from_millis(200),
        });
        let reader = CatalogReader::new(index, allow_all());

        let ok = reader
            .trigger_scan(vec![PathBuf::from("/music")], Duration::from_millis(10))
            .await;
        assert!(!ok);
    }
}
