//! Batched persistence port
//!
//! Transaction-scoped procedures over the primitive query modules. The
//! whole reconciliation write for one pass executes as a single
//! transaction, so a crash mid-pass cannot leave a partially-merged state
//! visible to readers.

use crate::queries::{authors, books, cross_refs, tracks};
use crate::DbPool;
use audioshelf_core::{AppError, Author, Book, Timestamp, Track, TrackAuthorCrossRef, TrackId};
use log::{debug, info};
use std::collections::HashSet;

/// Everything one sync pass wants persisted
#[derive(Debug, Default)]
pub struct SyncApply {
    /// Clear all four tables before inserting (rebuild semantics)
    pub replace_all: bool,
    /// Tracks the external index no longer reports
    pub deleted_track_ids: Vec<TrackId>,
    pub authors: Vec<Author>,
    pub books: Vec<Book>,
    pub tracks: Vec<Track>,
    /// Junction rows for the tracks being upserted
    pub cross_refs: Vec<TrackAuthorCrossRef>,
}

impl SyncApply {
    /// True when applying would not touch the database
    pub fn is_noop(&self) -> bool {
        !self.replace_all
            && self.deleted_track_ids.is_empty()
            && self.tracks.is_empty()
            && self.authors.is_empty()
            && self.books.is_empty()
            && self.cross_refs.is_empty()
    }
}

/// Counts of rows written by one `apply_sync` call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyStats {
    pub deleted_tracks: u64,
    pub upserted_tracks: usize,
    pub orphaned_books: u64,
    pub orphaned_authors: u64,
}

/// The local catalog store
///
/// Owns the write path for tracks, books, authors and the junction table.
#[derive(Clone)]
pub struct LibraryStore {
    pool: DbPool,
}

impl LibraryStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// The underlying pool, for read-side queries
    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Applies one reconciliation pass atomically
    ///
    /// Order inside the transaction: optional full clear, delete removed
    /// tracks and their junction rows, upsert authors, upsert books,
    /// upsert tracks, replace junction rows for the upserted tracks,
    /// delete orphaned books, delete orphaned authors.
    pub async fn apply_sync(&self, apply: &SyncApply) -> Result<ApplyStats, AppError> {
        if apply.is_noop() {
            debug!("Sync apply is a no-op, skipping transaction");
            return Ok(ApplyStats::default());
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::database("Failed to begin sync transaction", e))?;

        let mut stats = ApplyStats::default();

        if apply.replace_all {
            for sql in [
                "DELETE FROM track_authors",
                "DELETE FROM tracks",
                "DELETE FROM books",
                "DELETE FROM authors",
            ] {
                sqlx::query(sql)
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| AppError::database("Failed to clear tables", e))?;
            }
        } else if !apply.deleted_track_ids.is_empty() {
            cross_refs::delete_cross_refs_by_track_ids(&mut tx, &apply.deleted_track_ids).await?;
            stats.deleted_tracks =
                tracks::delete_tracks_by_ids(&mut tx, &apply.deleted_track_ids).await?;
        }

        authors::upsert_authors(&mut tx, &apply.authors).await?;
        books::upsert_books(&mut tx, &apply.books).await?;
        tracks::upsert_tracks(&mut tx, &apply.tracks).await?;
        stats.upserted_tracks = apply.tracks.len();

        // Replace junction rows for every upserted track so stale author
        // links cannot survive a metadata change
        if !apply.replace_all {
            let changed: Vec<TrackId> = apply.tracks.iter().map(|t| t.id).collect();
            cross_refs::delete_cross_refs_by_track_ids(&mut tx, &changed).await?;
        }
        cross_refs::insert_cross_refs(&mut tx, &apply.cross_refs).await?;

        stats.orphaned_books = books::delete_orphaned_books(&mut tx).await?;
        stats.orphaned_authors = authors::delete_orphaned_authors(&mut tx).await?;

        // An incremental batch only carries counts for the rows it
        // touched; refresh every derived count from the authoritative
        // tables before the transaction becomes visible
        sqlx::query(
            "UPDATE authors SET track_count = \
             (SELECT COUNT(*) FROM track_authors WHERE track_authors.author_id = authors.id)",
        )
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::database("Failed to refresh author track counts", e))?;
        sqlx::query(
            "UPDATE books SET track_count = \
             (SELECT COUNT(*) FROM tracks WHERE tracks.book_id = books.id)",
        )
        .execute(&mut *tx)
        .await
        .map_err(|e| AppError::database("Failed to refresh book track counts", e))?;

        tx.commit()
            .await
            .map_err(|e| AppError::database("Failed to commit sync transaction", e))?;

        info!(
            "Sync apply committed: {} upserts, {} deletions, {} orphaned books, {} orphaned authors",
            stats.upserted_tracks, stats.deleted_tracks, stats.orphaned_books, stats.orphaned_authors
        );
        Ok(stats)
    }

    /// Stores annotation text for several tracks in one transaction
    pub async fn apply_annotations(
        &self,
        updates: &[(TrackId, String)],
    ) -> Result<(), AppError> {
        if updates.is_empty() {
            return Ok(());
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::database("Failed to begin annotation transaction", e))?;

        for (id, annotation) in updates {
            tracks::update_annotation(&mut tx, *id, annotation).await?;
        }

        tx.commit()
            .await
            .map_err(|e| AppError::database("Failed to commit annotation transaction", e))?;
        Ok(())
    }

    /// All track ids currently persisted
    pub async fn all_track_ids(&self) -> Result<HashSet<TrackId>, AppError> {
        tracks::all_track_ids(&self.pool).await
    }

    /// Full snapshot of every persisted track
    pub async fn all_tracks(&self) -> Result<Vec<Track>, AppError> {
        tracks::all_tracks(&self.pool).await
    }

    /// Full snapshot of every persisted author
    pub async fn all_authors(&self) -> Result<Vec<Author>, AppError> {
        authors::all_authors(&self.pool).await
    }

    /// Highest author id ever assigned, or 0
    pub async fn max_author_id(&self) -> Result<i64, AppError> {
        authors::max_author_id(&self.pool).await
    }

    /// True when no tracks have ever been persisted (fresh install)
    pub async fn is_empty(&self) -> Result<bool, AppError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tracks")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::database("Failed to count tracks", e))?;
        Ok(count == 0)
    }

    /// Most recent modified timestamp across all tracks, if any
    pub async fn latest_modified_at(&self) -> Result<Option<Timestamp>, AppError> {
        let max: Option<i64> = sqlx::query_scalar("SELECT MAX(modified_at) FROM tracks")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::database("Failed to read latest modification", e))?;
        Ok(max.map(Timestamp::from_millis))
    }
}
