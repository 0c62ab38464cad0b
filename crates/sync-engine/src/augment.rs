//! Deep metadata enrichment
//!
//! The device index's quick rows are unreliable for some formats, so
//! flagged tracks get opened directly: tags and embedded artwork are
//! extracted with lofty and override the index-supplied fields when the
//! extracted value is non-blank. Work runs under a bounded semaphore sized
//! well below typical file-descriptor limits; one unreadable file is
//! logged and falls back to index-supplied values without aborting the
//! batch.

use crate::types::{should_report, ProgressSink, SyncPhase};
use audioshelf_artwork_cache::{CacheEntry, CoverArtCache};
use audioshelf_core::{AppError, Duration as TrackDuration, Track, TrackId};
use audioshelf_media_formats::AudioFormat;
use lofty::prelude::*;
use lofty::probe::Probe;
use log::{debug, warn};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Deep-scan pool width, well below typical file-descriptor limits
pub const DEEP_SCAN_POOL_WIDTH: usize = 8;

/// Values pulled out of one audio file
#[derive(Debug, Default, Clone)]
struct Extracted {
    title: Option<String>,
    author: Option<String>,
    book: Option<String>,
    book_author: Option<String>,
    genre: Option<String>,
    track_number: Option<u32>,
    year: Option<u32>,
    duration: Option<TrackDuration>,
    bitrate: Option<u32>,
    sample_rate: Option<u32>,
    artwork: Option<Vec<u8>>,
}

/// Bounded-concurrency tag and artwork extractor
pub struct Augmenter {
    pool: Arc<Semaphore>,
    artwork: Arc<CoverArtCache>,
    cancelled: Arc<AtomicBool>,
}

impl Augmenter {
    pub fn new(artwork: Arc<CoverArtCache>, cancelled: Arc<AtomicBool>) -> Self {
        Self {
            pool: Arc::new(Semaphore::new(DEEP_SCAN_POOL_WIDTH)),
            artwork,
            cancelled,
        }
    }

    /// Returns true when this track warrants opening the file
    pub fn needs_deep_scan(track: &Track, deep_scan_all: bool) -> bool {
        if deep_scan_all {
            return true;
        }
        AudioFormat::from_path(&track.file_path)
            .map(|format| format.needs_deep_scan())
            .unwrap_or(false)
    }

    /// Enriches the batch, preserving its order
    ///
    /// Cancellation stops issuing new tasks; in-flight ones complete and
    /// the remaining tracks pass through unchanged.
    pub async fn enrich(
        &self,
        tracks: Vec<Track>,
        deep_scan_all: bool,
        progress: Arc<dyn ProgressSink>,
    ) -> Vec<Track> {
        let total = tracks.len();
        let completed = Arc::new(AtomicUsize::new(0));

        let mut slots: Vec<Option<Track>> = Vec::with_capacity(total);
        let mut tasks: JoinSet<(usize, Track)> = JoinSet::new();

        for (index, track) in tracks.into_iter().enumerate() {
            let scan = Self::needs_deep_scan(&track, deep_scan_all)
                && !self.cancelled.load(Ordering::Relaxed);
            if !scan {
                let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
                if should_report(done, total) {
                    progress.report(done, total, SyncPhase::Fetch);
                }
                slots.push(Some(track));
                continue;
            }

            slots.push(None);
            let pool = Arc::clone(&self.pool);
            let artwork = Arc::clone(&self.artwork);
            let completed = Arc::clone(&completed);
            let progress = Arc::clone(&progress);
            tasks.spawn(async move {
                let _permit = pool.acquire_owned().await;
                let enriched = deep_scan(track, &artwork).await;
                let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
                if should_report(done, total) {
                    progress.report(done, total, SyncPhase::Fetch);
                }
                (index, enriched)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, track)) => slots[index] = Some(track),
                Err(e) => warn!("Deep-scan task failed: {}", e),
            }
        }

        slots.into_iter().flatten().collect()
    }

    /// Post-sync lyrics pass: extracts annotation text for tracks that
    /// have none yet. Per-file failures are absorbed.
    pub async fn scan_annotations(
        &self,
        tracks: &[Track],
        progress: Arc<dyn ProgressSink>,
    ) -> Vec<(TrackId, String)> {
        let pending: Vec<(TrackId, std::path::PathBuf)> = tracks
            .iter()
            .filter(|t| t.annotation.is_none())
            .map(|t| (t.id, t.file_path.clone()))
            .collect();

        let total = pending.len();
        let completed = Arc::new(AtomicUsize::new(0));
        let mut tasks: JoinSet<Option<(TrackId, String)>> = JoinSet::new();

        for (id, path) in pending {
            if self.cancelled.load(Ordering::Relaxed) {
                break;
            }
            let pool = Arc::clone(&self.pool);
            let completed = Arc::clone(&completed);
            let progress = Arc::clone(&progress);
            tasks.spawn(async move {
                let _permit = pool.acquire_owned().await;
                let lyrics = tokio::task::spawn_blocking(move || extract_lyrics(&path))
                    .await
                    .unwrap_or(None);
                let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
                if should_report(done, total) {
                    progress.report(done, total, SyncPhase::Annotations);
                }
                lyrics.map(|text| (id, text))
            });
        }

        let mut updates = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            if let Ok(Some(update)) = joined {
                updates.push(update);
            }
        }
        updates
    }
}

/// Opens the file off-task and folds the result into the track
async fn deep_scan(track: Track, artwork: &CoverArtCache) -> Track {
    let path = track.file_path.clone();
    let extracted = tokio::task::spawn_blocking(move || extract_tags(&path)).await;

    match extracted {
        Ok(Ok(extracted)) => apply_extracted(track, extracted, artwork),
        Ok(Err(e)) => {
            // Fall back to index-supplied values for this record only
            warn!("Deep scan failed for {}: {}", track.file_path.display(), e);
            track
        }
        Err(e) => {
            warn!("Deep-scan task panicked for {}: {}", track.file_path.display(), e);
            track
        }
    }
}

/// Overrides index-supplied fields with non-blank extracted values and
/// routes embedded artwork into the cover cache
fn apply_extracted(mut track: Track, extracted: Extracted, artwork: &CoverArtCache) -> Track {
    override_string(&mut track.title, extracted.title);
    override_string(&mut track.author_name, extracted.author);
    override_string(&mut track.book_name, extracted.book);

    if let Some(book_author) = non_blank(extracted.book_author) {
        track.book_author = Some(book_author);
    }
    if let Some(genre) = non_blank(extracted.genre) {
        track.genre = Some(genre);
    }
    if extracted.track_number.is_some() {
        track.track_number = extracted.track_number;
    }
    if extracted.year.is_some() {
        track.year = extracted.year;
    }
    if let Some(duration) = extracted.duration {
        if !duration.is_zero() {
            track.duration = duration;
        }
    }
    if extracted.bitrate.is_some() {
        track.bitrate = extracted.bitrate;
    }
    if extracted.sample_rate.is_some() {
        track.sample_rate = extracted.sample_rate;
    }

    match extracted.artwork {
        Some(bytes) => match artwork.store(track.id, &bytes) {
            Ok(path) => track.cover_uri = Some(path.display().to_string()),
            Err(e) => warn!("Failed to cache artwork for track {}: {}", track.id, e),
        },
        // Remember the miss so the file is not reopened every pass
        None => {
            if artwork.lookup(track.id) == CacheEntry::Miss {
                if let Err(e) = artwork.store_marker(track.id) {
                    debug!("Failed to write no-artwork marker for {}: {}", track.id, e);
                }
            }
        }
    }

    track
}

/// Reads tags and audio properties out of one file (blocking)
fn extract_tags(path: &Path) -> Result<Extracted, AppError> {
    let tagged_file = Probe::open(path)
        .map_err(|e| AppError::TagParseError {
            file: path.to_path_buf(),
            reason: e.to_string(),
        })?
        .read()
        .map_err(|e| AppError::TagParseError {
            file: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    let properties = tagged_file.properties();
    let mut extracted = Extracted {
        duration: Some(TrackDuration::from(properties.duration())),
        bitrate: properties.audio_bitrate().map(|kbps| kbps * 1000),
        sample_rate: properties.sample_rate(),
        ..Default::default()
    };

    if let Some(tag) = tagged_file.primary_tag() {
        extracted.title = tag.title().map(|s| s.to_string());
        extracted.author = tag.artist().map(|s| s.to_string());
        extracted.book = tag.album().map(|s| s.to_string());
        extracted.book_author = tag
            .get_string(&ItemKey::AlbumArtist)
            .map(|s| s.to_string());
        extracted.genre = tag.genre().map(|s| s.to_string());
        extracted.track_number = tag.track();
        extracted.year = tag.year();
        extracted.artwork = tag.pictures().first().map(|p| p.data().to_vec());
    }

    Ok(extracted)
}

/// Reads the lyrics tag out of one file (blocking)
fn extract_lyrics(path: &Path) -> Option<String> {
    let tagged_file = Probe::open(path).ok()?.read().ok()?;
    let tag = tagged_file.primary_tag()?;
    tag.get_string(&ItemKey::Lyrics)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn override_string(target: &mut String, value: Option<String>) {
    if let Some(value) = non_blank(value) {
        *target = value;
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}
