//! Author table operations

use crate::batch::{batch_rows, AUTHOR_COLUMNS};
use crate::DbPool;
use audioshelf_core::{AppError, Author, AuthorId};
use sqlx::{QueryBuilder, Row, Sqlite, SqliteConnection};

/// Upserts authors in batches sized to the bind-parameter cap
///
/// The image URL is set out-of-band and must survive syncs, so the
/// conflict clause never touches it.
pub async fn upsert_authors(
    conn: &mut SqliteConnection,
    authors: &[Author],
) -> Result<(), AppError> {
    for chunk in authors.chunks(batch_rows(AUTHOR_COLUMNS)) {
        let mut qb: QueryBuilder<Sqlite> =
            QueryBuilder::new("INSERT INTO authors (id, name, track_count, image_url) ");
        qb.push_values(chunk, |mut b, author| {
            b.push_bind(author.id.as_i64())
                .push_bind(&author.name)
                .push_bind(author.track_count as i64)
                .push_bind(&author.image_url);
        });
        qb.push(
            " ON CONFLICT(id) DO UPDATE SET \
             name = excluded.name, track_count = excluded.track_count",
        );
        qb.build()
            .execute(&mut *conn)
            .await
            .map_err(|e| AppError::database("Failed to upsert authors", e))?;
    }
    Ok(())
}

/// Deletes every author with no referencing junction row
pub async fn delete_orphaned_authors(conn: &mut SqliteConnection) -> Result<u64, AppError> {
    let result = sqlx::query(
        "DELETE FROM authors WHERE id NOT IN (SELECT DISTINCT author_id FROM track_authors)",
    )
    .execute(conn)
    .await
    .map_err(|e| AppError::database("Failed to delete orphaned authors", e))?;
    Ok(result.rows_affected())
}

/// Full snapshot of every persisted author
pub async fn all_authors(pool: &DbPool) -> Result<Vec<Author>, AppError> {
    let rows = sqlx::query("SELECT id, name, track_count, image_url FROM authors ORDER BY name")
        .fetch_all(pool)
        .await
        .map_err(|e| AppError::database("Failed to list authors", e))?;

    rows.into_iter().map(row_to_author).collect()
}

/// Highest author id ever assigned, or 0 for an empty table
///
/// Seeds the splitter's monotonic id counter.
pub async fn max_author_id(pool: &DbPool) -> Result<i64, AppError> {
    let max: Option<i64> = sqlx::query_scalar("SELECT MAX(id) FROM authors")
        .fetch_one(pool)
        .await
        .map_err(|e| AppError::database("Failed to read max author id", e))?;
    Ok(max.unwrap_or(0))
}

/// Stores an out-of-band author image URL
pub async fn set_author_image(
    pool: &DbPool,
    id: AuthorId,
    image_url: &str,
) -> Result<(), AppError> {
    sqlx::query("UPDATE authors SET image_url = ? WHERE id = ?")
        .bind(image_url)
        .bind(id.as_i64())
        .execute(pool)
        .await
        .map_err(|e| AppError::database("Failed to set author image", e))?;
    Ok(())
}

/// Converts a database row to an Author
pub(crate) fn row_to_author(row: sqlx::sqlite::SqliteRow) -> Result<Author, AppError> {
    let id: i64 = row
        .try_get("id")
        .map_err(|e| AppError::database("Missing author id", e))?;
    let track_count: i64 = row
        .try_get("track_count")
        .map_err(|e| AppError::database("Missing track count", e))?;

    Ok(Author {
        id: AuthorId::new(id),
        name: row
            .try_get("name")
            .map_err(|e| AppError::database("Missing author name", e))?,
        track_count: track_count.max(0) as u32,
        image_url: row.try_get("image_url").ok(),
    })
}
