//! Track table operations

use crate::batch::{batch_rows, TRACK_COLUMNS};
use crate::DbPool;
use audioshelf_core::{AppError, AuthorId, BookId, Duration, Timestamp, Track, TrackId};
use sqlx::{QueryBuilder, Row, Sqlite, SqliteConnection};
use std::collections::HashSet;
use std::path::PathBuf;

const SELECT_COLUMNS: &str = "id, title, author_name, author_id, book_author, book_name, book_id, \
     file_path, parent_dir, duration_ms, content_uri, cover_uri, genre, favorite, annotation, \
     track_number, year, modified_at, mime_type, bitrate, sample_rate";

/// Upserts tracks in batches sized to the bind-parameter cap
pub async fn upsert_tracks(conn: &mut SqliteConnection, tracks: &[Track]) -> Result<(), AppError> {
    for chunk in tracks.chunks(batch_rows(TRACK_COLUMNS)) {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
            "INSERT INTO tracks (id, title, author_name, author_id, book_author, book_name, \
             book_id, file_path, parent_dir, duration_ms, content_uri, cover_uri, genre, \
             favorite, annotation, track_number, year, modified_at, mime_type, bitrate, \
             sample_rate) ",
        );
        qb.push_values(chunk, |mut b, t| {
            b.push_bind(t.id.as_i64())
                .push_bind(&t.title)
                .push_bind(&t.author_name)
                .push_bind(t.author_id.as_i64())
                .push_bind(&t.book_author)
                .push_bind(&t.book_name)
                .push_bind(t.book_id.as_i64())
                .push_bind(t.file_path.to_string_lossy().into_owned())
                .push_bind(t.parent_dir.to_string_lossy().into_owned())
                .push_bind(t.duration.as_millis() as i64)
                .push_bind(&t.content_uri)
                .push_bind(&t.cover_uri)
                .push_bind(&t.genre)
                .push_bind(t.favorite as i64)
                .push_bind(&t.annotation)
                .push_bind(t.track_number.map(|n| n as i64))
                .push_bind(t.year.map(|y| y as i64))
                .push_bind(t.modified_at.as_millis())
                .push_bind(&t.mime_type)
                .push_bind(t.bitrate.map(|b| b as i64))
                .push_bind(t.sample_rate.map(|s| s as i64));
        });
        qb.push(
            " ON CONFLICT(id) DO UPDATE SET \
             title = excluded.title, author_name = excluded.author_name, \
             author_id = excluded.author_id, book_author = excluded.book_author, \
             book_name = excluded.book_name, book_id = excluded.book_id, \
             file_path = excluded.file_path, parent_dir = excluded.parent_dir, \
             duration_ms = excluded.duration_ms, content_uri = excluded.content_uri, \
             cover_uri = excluded.cover_uri, genre = excluded.genre, \
             favorite = excluded.favorite, annotation = excluded.annotation, \
             track_number = excluded.track_number, year = excluded.year, \
             modified_at = excluded.modified_at, mime_type = excluded.mime_type, \
             bitrate = excluded.bitrate, sample_rate = excluded.sample_rate",
        );
        qb.build()
            .execute(&mut *conn)
            .await
            .map_err(|e| AppError::database("Failed to upsert tracks", e))?;
    }
    Ok(())
}

/// Deletes tracks by id in batches sized to the bind-parameter cap
pub async fn delete_tracks_by_ids(
    conn: &mut SqliteConnection,
    ids: &[TrackId],
) -> Result<u64, AppError> {
    let mut deleted = 0u64;
    for chunk in ids.chunks(batch_rows(1)) {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new("DELETE FROM tracks WHERE id IN (");
        let mut separated = qb.separated(", ");
        for id in chunk {
            separated.push_bind(id.as_i64());
        }
        qb.push(")");
        let result = qb
            .build()
            .execute(&mut *conn)
            .await
            .map_err(|e| AppError::database("Failed to delete tracks", e))?;
        deleted += result.rows_affected();
    }
    Ok(deleted)
}

/// All track ids currently persisted
pub async fn all_track_ids(pool: &DbPool) -> Result<HashSet<TrackId>, AppError> {
    let rows: Vec<i64> = sqlx::query_scalar("SELECT id FROM tracks")
        .fetch_all(pool)
        .await
        .map_err(|e| AppError::database("Failed to list track ids", e))?;
    Ok(rows.into_iter().map(TrackId::new).collect())
}

/// Full snapshot of every persisted track
pub async fn all_tracks(pool: &DbPool) -> Result<Vec<Track>, AppError> {
    let rows = sqlx::query(&format!("SELECT {} FROM tracks", SELECT_COLUMNS))
        .fetch_all(pool)
        .await
        .map_err(|e| AppError::database("Failed to list tracks", e))?;
    rows.into_iter().map(row_to_track).collect()
}

/// Gets a track by ID
pub async fn get_track(pool: &DbPool, id: TrackId) -> Result<Track, AppError> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM tracks WHERE id = ?",
        SELECT_COLUMNS
    ))
    .bind(id.as_i64())
    .fetch_optional(pool)
    .await
    .map_err(|e| AppError::database("Failed to fetch track", e))?
    .ok_or_else(|| AppError::RecordNotFound {
        entity: "Track".to_string(),
        identifier: id.to_string(),
    })?;

    row_to_track(row)
}

/// Tracks belonging to a book, in track-number order
pub async fn tracks_for_book(pool: &DbPool, book_id: BookId) -> Result<Vec<Track>, AppError> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM tracks WHERE book_id = ? ORDER BY track_number, title",
        SELECT_COLUMNS
    ))
    .bind(book_id.as_i64())
    .fetch_all(pool)
    .await
    .map_err(|e| AppError::database("Failed to get tracks for book", e))?;
    rows.into_iter().map(row_to_track).collect()
}

/// Tracks credited to an author through the junction table
pub async fn tracks_for_author(pool: &DbPool, author_id: AuthorId) -> Result<Vec<Track>, AppError> {
    let rows = sqlx::query(
        "SELECT tracks.* FROM tracks \
         INNER JOIN track_authors ON track_authors.track_id = tracks.id \
         WHERE track_authors.author_id = ? ORDER BY tracks.book_name, tracks.track_number",
    )
    .bind(author_id.as_i64())
    .fetch_all(pool)
    .await
    .map_err(|e| AppError::database("Failed to get tracks for author", e))?;
    rows.into_iter().map(row_to_track).collect()
}

/// Stores user-entered annotation text (lyrics/transcript) for a track
pub async fn update_annotation(
    conn: &mut SqliteConnection,
    id: TrackId,
    annotation: &str,
) -> Result<(), AppError> {
    sqlx::query("UPDATE tracks SET annotation = ? WHERE id = ?")
        .bind(annotation)
        .bind(id.as_i64())
        .execute(conn)
        .await
        .map_err(|e| AppError::database("Failed to update annotation", e))?;
    Ok(())
}

/// Sets the user favorite flag on a track
pub async fn set_favorite(pool: &DbPool, id: TrackId, favorite: bool) -> Result<(), AppError> {
    sqlx::query("UPDATE tracks SET favorite = ? WHERE id = ?")
        .bind(favorite as i64)
        .bind(id.as_i64())
        .execute(pool)
        .await
        .map_err(|e| AppError::database("Failed to set favorite", e))?;
    Ok(())
}

/// Converts a database row to a Track
pub(crate) fn row_to_track(row: sqlx::sqlite::SqliteRow) -> Result<Track, AppError> {
    let id: i64 = row
        .try_get("id")
        .map_err(|e| AppError::database("Missing track id", e))?;
    let author_id: i64 = row
        .try_get("author_id")
        .map_err(|e| AppError::database("Missing author id", e))?;
    let book_id: i64 = row
        .try_get("book_id")
        .map_err(|e| AppError::database("Missing book id", e))?;
    let file_path: String = row
        .try_get("file_path")
        .map_err(|e| AppError::database("Missing file path", e))?;
    let parent_dir: String = row
        .try_get("parent_dir")
        .map_err(|e| AppError::database("Missing parent dir", e))?;
    let duration_ms: i64 = row
        .try_get("duration_ms")
        .map_err(|e| AppError::database("Missing duration", e))?;
    let favorite: i64 = row
        .try_get("favorite")
        .map_err(|e| AppError::database("Missing favorite flag", e))?;
    let modified_at: i64 = row
        .try_get("modified_at")
        .map_err(|e| AppError::database("Missing modified timestamp", e))?;

    let track_number: Option<i64> = row.try_get("track_number").ok();
    let year: Option<i64> = row.try_get("year").ok();
    let bitrate: Option<i64> = row.try_get("bitrate").ok();
    let sample_rate: Option<i64> = row.try_get("sample_rate").ok();

    Ok(Track {
        id: TrackId::new(id),
        title: row
            .try_get("title")
            .map_err(|e| AppError::database("Missing title", e))?,
        author_name: row
            .try_get("author_name")
            .map_err(|e| AppError::database("Missing author name", e))?,
        author_id: AuthorId::new(author_id),
        book_author: row.try_get("book_author").ok(),
        book_name: row
            .try_get("book_name")
            .map_err(|e| AppError::database("Missing book name", e))?,
        book_id: BookId::new(book_id),
        file_path: PathBuf::from(file_path),
        parent_dir: PathBuf::from(parent_dir),
        duration: Duration::from_millis(duration_ms.max(0) as u64),
        content_uri: row
            .try_get("content_uri")
            .map_err(|e| AppError::database("Missing content URI", e))?,
        cover_uri: row.try_get("cover_uri").ok(),
        genre: row.try_get("genre").ok(),
        favorite: favorite != 0,
        annotation: row.try_get("annotation").ok(),
        track_number: track_number.map(|n| n as u32),
        year: year.map(|y| y as u32),
        modified_at: Timestamp::from_millis(modified_at),
        mime_type: row.try_get("mime_type").ok(),
        bitrate: bitrate.map(|b| b as u32),
        sample_rate: sample_rate.map(|s| s as u32),
    })
}
