//! The incremental reconciler
//!
//! One sync pass reconciles the local catalog against the device media
//! index. Each `SyncMode` variant has its own handler composed from shared
//! sub-steps: deletion detection, fetch, enrichment, field-level merge,
//! author splitting and transactional persistence. The last-sync timestamp
//! and the force-rescan flag only change when the whole pass succeeded, so
//! a failed pass is retried over the same window.

use crate::augment::Augmenter;
use crate::error::{SyncError, SyncResult};
use crate::merge::merge_track;
use crate::splitter;
use crate::types::{NoopProgress, ProgressSink, SyncMode, SyncPhase, SyncReport};
use audioshelf_artwork_cache::CoverArtCache;
use audioshelf_config::Config;
use audioshelf_core::{AuthorId, BookId, Timestamp, Track, TrackId};
use audioshelf_database::{ApplyStats, LibraryStore, SyncApply};
use audioshelf_media_formats::mime_for_path;
use audioshelf_provider::{CatalogReader, RawTrack, SCAN_TRIGGER_TIMEOUT};
use log::{info, warn};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Orchestrates sync passes against one store and one index
pub struct SyncEngine {
    reader: CatalogReader,
    store: LibraryStore,
    artwork: Arc<CoverArtCache>,
    augmenter: Augmenter,
    progress: Arc<dyn ProgressSink>,
    cancelled: Arc<AtomicBool>,
}

impl SyncEngine {
    pub fn new(reader: CatalogReader, store: LibraryStore, artwork: Arc<CoverArtCache>) -> Self {
        let cancelled = Arc::new(AtomicBool::new(false));
        let augmenter = Augmenter::new(Arc::clone(&artwork), Arc::clone(&cancelled));
        Self {
            reader,
            store,
            artwork,
            augmenter,
            progress: Arc::new(NoopProgress),
            cancelled,
        }
    }

    /// Replaces the progress sink
    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    /// Access to the reader, e.g. for the genre-cache invalidation hook
    pub fn reader(&self) -> &CatalogReader {
        &self.reader
    }

    /// Cooperative cancellation: no new enrichment work is issued,
    /// in-flight items complete, and the pass aborts at the next stage
    /// boundary without advancing the last-sync timestamp
    pub fn request_cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    /// Runs one pass; mutated config fields (force-rescan flag, last-sync
    /// timestamp) are only touched on success and the caller persists them
    pub async fn run(&self, mode: SyncMode, config: &mut Config) -> SyncResult<SyncReport> {
        let started_wall = Timestamp::now();
        let started = std::time::Instant::now();
        self.cancelled.store(false, Ordering::Relaxed);

        info!("Starting {:?} sync pass", mode);

        // Ask the index to pick up files it does not know yet. Bounded and
        // best-effort: a timeout proceeds without it.
        if !config.directories.allowed.is_empty() {
            self.reader
                .trigger_scan(config.directories.allowed.clone(), SCAN_TRIGGER_TIMEOUT)
                .await;
        }
        self.check_cancelled()?;

        let fresh_install = self.store.is_empty().await?;

        let (fetched, stats) = match mode {
            SyncMode::Rebuild => self.rebuild(config).await?,
            SyncMode::Full => self.full_sync(config).await?,
            SyncMode::Incremental => self.incremental_sync(config, fresh_install).await?,
        };

        // The pass succeeded: clear the rescan flag and advance the
        // last-sync timestamp to the pass start, so records modified while
        // we ran are fetched again next time
        config.sync.force_full_rescan = false;
        config.sync.last_sync_ms = started_wall.as_millis();

        self.clean_artwork().await?;

        let annotations_updated = if config.sync.scan_annotations {
            self.annotation_scan().await?
        } else {
            0
        };

        let report = SyncReport {
            mode,
            fetched,
            deleted: stats.deleted_tracks,
            upserted: stats.upserted_tracks,
            annotations_updated,
            elapsed: started.elapsed(),
        };
        info!(
            "{:?} sync pass finished: {} fetched, {} upserted, {} deleted in {:?}",
            mode, report.fetched, report.upserted, report.deleted, report.elapsed
        );
        Ok(report)
    }

    /// Rebuild: ignore prior state, fetch everything, clear all tables
    /// before inserting the fresh result. Deletion detection is pointless
    /// here since everything is cleared anyway.
    async fn rebuild(&self, config: &Config) -> SyncResult<(usize, ApplyStats)> {
        let records = self.reader.fetch_changed_since(None).await?;
        let fetched = records.len();

        let tracks = self.build_tracks(records, config).await;
        self.check_cancelled()?;

        let outcome = splitter::process(
            tracks,
            &config.sync.author_delimiters,
            config.sync.group_by_book_author,
            &HashMap::new(),
            0,
        );

        let apply = SyncApply {
            replace_all: true,
            deleted_track_ids: Vec::new(),
            authors: outcome.authors,
            books: outcome.books,
            tracks: outcome.tracks,
            cross_refs: outcome.cross_refs,
        };
        let stats = self.store.apply_sync(&apply).await?;
        Ok((fetched, stats))
    }

    /// Full: fetch everything, but merge into existing rows so book and
    /// author surrogate ids already on disk survive
    async fn full_sync(&self, config: &Config) -> SyncResult<(usize, ApplyStats)> {
        self.merge_pass(None, config).await
    }

    /// Incremental: fetch only records changed since the last successful
    /// pass. A forced rescan or a fresh install widens this to everything.
    async fn incremental_sync(
        &self,
        config: &Config,
        fresh_install: bool,
    ) -> SyncResult<(usize, ApplyStats)> {
        let since = if config.sync.force_full_rescan || fresh_install || !config.sync.has_synced()
        {
            None
        } else {
            Some(Timestamp::from_millis(config.sync.last_sync_ms))
        };
        self.merge_pass(since, config).await
    }

    /// Shared Full/Incremental body: deletion detection, fetch, enrich,
    /// merge, split, persist
    async fn merge_pass(
        &self,
        since: Option<Timestamp>,
        config: &Config,
    ) -> SyncResult<(usize, ApplyStats)> {
        // Deletion detection: locally known ids minus externally known
        // ids, with directory rules already applied to the external set
        let local_ids = self.store.all_track_ids().await?;
        let external_ids = self.reader.known_ids().await?;
        let deleted: Vec<TrackId> = local_ids.difference(&external_ids).copied().collect();
        if !deleted.is_empty() {
            info!("Deletion detection: {} tracks gone from the index", deleted.len());
        }
        self.check_cancelled()?;

        let records = self.reader.fetch_changed_since(since).await?;
        let fetched = records.len();

        let candidates = self.build_tracks(records, config).await;
        self.check_cancelled()?;

        // Field-level merge against prior local rows
        let local_tracks: HashMap<TrackId, Track> = self
            .store
            .all_tracks()
            .await?
            .into_iter()
            .map(|t| (t.id, t))
            .collect();
        let delimiters = config.sync.author_delimiters.clone();
        let merged: Vec<Track> = candidates
            .into_iter()
            .map(|candidate| match local_tracks.get(&candidate.id) {
                Some(local) => merge_track(candidate, local, &delimiters),
                None => candidate,
            })
            .collect();

        // Splitting and dedup, with prior assignments carried forward
        let prior: HashMap<String, AuthorId> = self
            .store
            .all_authors()
            .await?
            .into_iter()
            .map(|a| (a.name, a.id))
            .collect();
        let max_author_id = self.store.max_author_id().await?;
        let outcome = splitter::process(
            merged,
            &delimiters,
            config.sync.group_by_book_author,
            &prior,
            max_author_id,
        );
        self.check_cancelled()?;

        let apply = SyncApply {
            replace_all: false,
            deleted_track_ids: deleted,
            authors: outcome.authors,
            books: outcome.books,
            tracks: outcome.tracks,
            cross_refs: outcome.cross_refs,
        };
        let stats = self.store.apply_sync(&apply).await?;
        Ok((fetched, stats))
    }

    /// Converts raw index rows into track candidates, attaches cached
    /// genres and runs the bounded deep-scan enrichment
    async fn build_tracks(&self, records: Vec<RawTrack>, config: &Config) -> Vec<Track> {
        let total = records.len();
        self.progress.report(0, total, SyncPhase::Fetch);

        let ids: Vec<TrackId> = records.iter().map(|r| r.id).collect();
        let genres = self.reader.genres_for(&ids).await;

        let candidates: Vec<Track> = records
            .into_iter()
            .map(|raw| candidate_track(raw, &genres))
            .collect();

        let deep_scan_all = config.sync.deep_scan_all || config.sync.force_full_rescan;
        self.augmenter
            .enrich(candidates, deep_scan_all, Arc::clone(&self.progress))
            .await
    }

    /// Orphan cleanup with the final authoritative id set, then the
    /// throttled cap check
    async fn clean_artwork(&self) -> SyncResult<()> {
        let valid = self.store.all_track_ids().await?;
        let artwork = Arc::clone(&self.artwork);
        let result = tokio::task::spawn_blocking(move || {
            artwork.clean_orphans(&valid);
            artwork.clean_if_over_cap();
        })
        .await;
        if let Err(e) = result {
            warn!("Artwork cleanup task failed: {}", e);
        }
        Ok(())
    }

    /// Optional post-sync pass storing extracted lyrics as annotations
    async fn annotation_scan(&self) -> SyncResult<usize> {
        let tracks = self.store.all_tracks().await?;
        let updates = self
            .augmenter
            .scan_annotations(&tracks, Arc::clone(&self.progress))
            .await;
        let count = updates.len();
        self.store.apply_annotations(&updates).await?;
        Ok(count)
    }

    fn check_cancelled(&self) -> SyncResult<()> {
        if self.cancelled.load(Ordering::Relaxed) {
            Err(SyncError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Builds the candidate track for one raw index row
///
/// The index's own author/book ids are only initial values; the splitter
/// replaces them with surrogate assignments.
fn candidate_track(raw: RawTrack, genres: &HashMap<TrackId, String>) -> Track {
    let genre = genres.get(&raw.id).cloned();
    let mut track = Track::new(
        raw.id,
        raw.title,
        raw.author,
        raw.author_id.unwrap_or(AuthorId::new(0)),
        raw.book_name,
        raw.book_id.unwrap_or(BookId::new(0)),
        raw.path,
    );
    track.book_author = raw.book_author;
    track.duration = raw.duration;
    track.content_uri = raw.content_uri;
    track.track_number = raw.track_number;
    track.year = raw.year;
    track.modified_at = raw.modified_at;
    track.genre = genre;
    track.mime_type = mime_for_path(&track.file_path).map(str::to_string);
    track
}

#[cfg(test)]
mod tests {
    use super::*;
    use audioshelf_core::Duration as TrackDuration;
    use std::path::PathBuf;

    #[test]
    fn test_candidate_track_conversion() {
        let raw = RawTrack {
            id: TrackId::new(5),
            book_id: Some(BookId::new(50)),
            author_id: Some(AuthorId::new(7)),
            path: PathBuf::from("/audio/book/05.flac"),
            title: "Five".to_string(),
            author: "Alice & Bob".to_string(),
            book_name: "Book".to_string(),
            book_author: Some("Alice".to_string()),
            duration: TrackDuration::from_seconds(30),
            track_number: Some(5),
            year: Some(2001),
            modified_at: Timestamp::from_seconds(1000),
            content_uri: "file:///audio/book/05.flac".to_string(),
        };
        let mut genres = HashMap::new();
        genres.insert(TrackId::new(5), "Fiction".to_string());

        let track = candidate_track(raw, &genres);
        assert_eq!(track.id, TrackId::new(5));
        assert_eq!(track.book_id, BookId::new(50));
        assert_eq!(track.author_id, AuthorId::new(7));
        assert_eq!(track.author_name, "Alice & Bob");
        assert_eq!(track.book_author.as_deref(), Some("Alice"));
        assert_eq!(track.genre.as_deref(), Some("Fiction"));
        assert_eq!(track.mime_type.as_deref(), Some("audio/flac"));
        assert_eq!(track.parent_dir, PathBuf::from("/audio/book"));
    }

    #[test]
    fn test_candidate_track_without_provider_ids() {
        let raw = RawTrack {
            id: TrackId::new(5),
            book_id: None,
            author_id: None,
            path: PathBuf::from("/audio/book/05.mp3"),
            title: "Five".to_string(),
            author: "Alice".to_string(),
            book_name: "Book".to_string(),
            book_author: None,
            duration: TrackDuration::ZERO,
            track_number: None,
            year: None,
            modified_at: Timestamp::from_seconds(0),
            content_uri: "file:///audio/book/05.mp3".to_string(),
        };

        let track = candidate_track(raw, &HashMap::new());
        // Zero sentinels: the splitter assigns real surrogates
        assert_eq!(track.author_id, AuthorId::new(0));
        assert_eq!(track.book_id, BookId::new(0));
        assert!(track.genre.is_none());
    }
}
