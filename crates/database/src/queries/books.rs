//! Book table operations

use crate::batch::{batch_rows, BOOK_COLUMNS};
use crate::DbPool;
use audioshelf_core::{AppError, AuthorId, Book, BookId};
use sqlx::{QueryBuilder, Row, Sqlite, SqliteConnection};

/// Upserts books in batches sized to the bind-parameter cap
pub async fn upsert_books(conn: &mut SqliteConnection, books: &[Book]) -> Result<(), AppError> {
    for chunk in books.chunks(batch_rows(BOOK_COLUMNS)) {
        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(
            "INSERT INTO books (id, title, author_name, author_id, cover_uri, track_count, year) ",
        );
        qb.push_values(chunk, |mut b, book| {
            b.push_bind(book.id.as_i64())
                .push_bind(&book.title)
                .push_bind(&book.author_name)
                .push_bind(book.author_id.as_i64())
                .push_bind(&book.cover_uri)
                .push_bind(book.track_count as i64)
                .push_bind(book.year.map(|y| y as i64));
        });
        qb.push(
            " ON CONFLICT(id) DO UPDATE SET \
             title = excluded.title, author_name = excluded.author_name, \
             author_id = excluded.author_id, cover_uri = excluded.cover_uri, \
             track_count = excluded.track_count, year = excluded.year",
        );
        qb.build()
            .execute(&mut *conn)
            .await
            .map_err(|e| AppError::database("Failed to upsert books", e))?;
    }
    Ok(())
}

/// Deletes every book with no referencing track row
pub async fn delete_orphaned_books(conn: &mut SqliteConnection) -> Result<u64, AppError> {
    let result =
        sqlx::query("DELETE FROM books WHERE id NOT IN (SELECT DISTINCT book_id FROM tracks)")
            .execute(conn)
            .await
            .map_err(|e| AppError::database("Failed to delete orphaned books", e))?;
    Ok(result.rows_affected())
}

/// Gets a book by ID
pub async fn get_book(pool: &DbPool, id: BookId) -> Result<Book, AppError> {
    let row = sqlx::query(
        "SELECT id, title, author_name, author_id, cover_uri, track_count, year \
         FROM books WHERE id = ?",
    )
    .bind(id.as_i64())
    .fetch_optional(pool)
    .await
    .map_err(|e| AppError::database("Failed to fetch book", e))?
    .ok_or_else(|| AppError::RecordNotFound {
        entity: "Book".to_string(),
        identifier: id.to_string(),
    })?;

    row_to_book(row)
}

/// Lists all books ordered by title
pub async fn list_books(pool: &DbPool) -> Result<Vec<Book>, AppError> {
    let rows = sqlx::query(
        "SELECT id, title, author_name, author_id, cover_uri, track_count, year \
         FROM books ORDER BY title",
    )
    .fetch_all(pool)
    .await
    .map_err(|e| AppError::database("Failed to list books", e))?;

    rows.into_iter().map(row_to_book).collect()
}

/// Converts a database row to a Book
pub(crate) fn row_to_book(row: sqlx::sqlite::SqliteRow) -> Result<Book, AppError> {
    let id: i64 = row
        .try_get("id")
        .map_err(|e| AppError::database("Missing book id", e))?;
    let author_id: i64 = row
        .try_get("author_id")
        .map_err(|e| AppError::database("Missing author id", e))?;
    let track_count: i64 = row
        .try_get("track_count")
        .map_err(|e| AppError::database("Missing track count", e))?;
    let year: Option<i64> = row.try_get("year").ok();

    Ok(Book {
        id: BookId::new(id),
        title: row
            .try_get("title")
            .map_err(|e| AppError::database("Missing title", e))?,
        author_name: row
            .try_get("author_name")
            .map_err(|e| AppError::database("Missing author name", e))?,
        author_id: AuthorId::new(author_id),
        cover_uri: row.try_get("cover_uri").ok(),
        track_count: track_count.max(0) as u32,
        year: year.map(|y| y as u32),
    })
}
