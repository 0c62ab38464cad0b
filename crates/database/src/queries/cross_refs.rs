//! Track-author junction operations
//!
//! The junction is only 3 columns wide, so its batches are much larger
//! than the track table's while staying under the same bind cap.

use crate::batch::{batch_rows, CROSS_REF_COLUMNS};
use crate::DbPool;
use audioshelf_core::{AppError, AuthorId, TrackAuthorCrossRef, TrackId};
use sqlx::{QueryBuilder, Row, Sqlite, SqliteConnection};

/// Inserts junction rows in batches sized to the bind-parameter cap
pub async fn insert_cross_refs(
    conn: &mut SqliteConnection,
    cross_refs: &[TrackAuthorCrossRef],
) -> Result<(), AppError> {
    for chunk in cross_refs.chunks(batch_rows(CROSS_REF_COLUMNS)) {
        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new("INSERT INTO track_authors (track_id, author_id, is_primary) ");
        qb.push_values(chunk, |mut b, xref| {
            b.push_bind(xref.track_id.as_i64())
                .push_bind(xref.author_id.as_i64())
                .push_bind(xref.is_primary as i64);
        });
        qb.push(
            " ON CONFLICT(track_id, author_id) DO UPDATE SET is_primary = excluded.is_primary",
        );
        qb.build()
            .execute(&mut *conn)
            .await
            .map_err(|e| AppError::database("Failed to insert cross references", e))?;
    }
    Ok(())
}

/// Deletes all junction rows for the given tracks, in capped batches
pub async fn delete_cross_refs_by_track_ids(
    conn: &mut SqliteConnection,
    track_ids: &[TrackId],
) -> Result<u64, AppError> {
    let mut deleted = 0u64;
    for chunk in track_ids.chunks(batch_rows(1)) {
        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new("DELETE FROM track_authors WHERE track_id IN (");
        let mut separated = qb.separated(", ");
        for id in chunk {
            separated.push_bind(id.as_i64());
        }
        qb.push(")");
        let result = qb
            .build()
            .execute(&mut *conn)
            .await
            .map_err(|e| AppError::database("Failed to delete cross references", e))?;
        deleted += result.rows_affected();
    }
    Ok(deleted)
}

/// Junction rows for one track, primary row first
pub async fn cross_refs_for_track(
    pool: &DbPool,
    track_id: TrackId,
) -> Result<Vec<TrackAuthorCrossRef>, AppError> {
    let rows = sqlx::query(
        "SELECT track_id, author_id, is_primary FROM track_authors \
         WHERE track_id = ? ORDER BY is_primary DESC, author_id",
    )
    .bind(track_id.as_i64())
    .fetch_all(pool)
    .await
    .map_err(|e| AppError::database("Failed to get cross references", e))?;

    rows.into_iter().map(row_to_cross_ref).collect()
}

/// All junction rows, for aggregate checks
pub async fn all_cross_refs(pool: &DbPool) -> Result<Vec<TrackAuthorCrossRef>, AppError> {
    let rows = sqlx::query("SELECT track_id, author_id, is_primary FROM track_authors")
        .fetch_all(pool)
        .await
        .map_err(|e| AppError::database("Failed to list cross references", e))?;

    rows.into_iter().map(row_to_cross_ref).collect()
}

fn row_to_cross_ref(row: sqlx::sqlite::SqliteRow) -> Result<TrackAuthorCrossRef, AppError> {
    let track_id: i64 = row
        .try_get("track_id")
        .map_err(|e| AppError::database("Missing track id", e))?;
    let author_id: i64 = row
        .try_get("author_id")
        .map_err(|e| AppError::database("Missing author id", e))?;
    let is_primary: i64 = row
        .try_get("is_primary")
        .map_err(|e| AppError::database("Missing primary flag", e))?;

    Ok(TrackAuthorCrossRef {
        track_id: TrackId::new(track_id),
        author_id: AuthorId::new(author_id),
        is_primary: is_primary != 0,
    })
}
