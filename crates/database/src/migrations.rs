//! Database migrations

use crate::DbPool;
use audioshelf_core::AppError;

/// Migration 001: Initial catalog schema
const MIGRATION_001: &str = include_str!("../migrations/001_initial_schema.sql");

/// Migration 002: Lookup indexes
const MIGRATION_002: &str = include_str!("../migrations/002_add_indexes.sql");

/// Current database schema version
pub const CURRENT_VERSION: i64 = 2;

/// Returns the current migration version
pub fn current_version() -> i64 {
    CURRENT_VERSION
}

/// Runs all pending migrations
pub async fn run_migrations(pool: &DbPool) -> Result<(), AppError> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at INTEGER NOT NULL DEFAULT (strftime('%s', 'now') * 1000)
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(|e| AppError::database("Failed to create migrations table", e))?;

    run_migration(pool, 1, MIGRATION_001).await?;
    run_migration(pool, 2, MIGRATION_002).await?;

    Ok(())
}

/// Runs a single migration if not already applied
async fn run_migration(pool: &DbPool, version: i64, sql: &str) -> Result<(), AppError> {
    let applied: Option<i64> =
        sqlx::query_scalar("SELECT version FROM schema_migrations WHERE version = ?")
            .bind(version)
            .fetch_optional(pool)
            .await
            .map_err(|e| AppError::database("Failed to check migration status", e))?;

    if applied.is_some() {
        return Ok(());
    }

    sqlx::raw_sql(sql)
        .execute(pool)
        .await
        .map_err(|e| AppError::database(format!("Failed to run migration {}", version), e))?;

    sqlx::query("INSERT INTO schema_migrations (version) VALUES (?)")
        .bind(version)
        .execute(pool)
        .await
        .map_err(|e| AppError::database("Failed to record migration", e))?;

    Ok(())
}

/// Verifies database integrity
pub async fn verify_integrity(pool: &DbPool) -> Result<(), AppError> {
    let result: String = sqlx::query_scalar("PRAGMA integrity_check")
        .fetch_one(pool)
        .await
        .map_err(|e| AppError::database("Failed to run integrity check", e))?;

    if result == "ok" {
        Ok(())
    } else {
        Err(AppError::internal(format!(
            "Database integrity check failed: {}",
            result
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::create_test_db;

    #[tokio::test]
    async fn test_migrations_apply_once() {
        let pool = create_test_db().await.unwrap();
        run_migrations(&pool).await.unwrap();
        run_migrations(&pool).await.unwrap();

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM schema_migrations")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, CURRENT_VERSION);
    }

    #[tokio::test]
    async fn test_schema_tables_exist() {
        let pool = create_test_db().await.unwrap();
        run_migrations(&pool).await.unwrap();

        for table in ["tracks", "books", "authors", "track_authors"] {
            let found: Option<String> = sqlx::query_scalar(
                "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?",
            )
            .bind(table)
            .fetch_optional(&pool)
            .await
            .unwrap();
            assert_eq!(found.as_deref(), Some(table));
        }
    }

    #[tokio::test]
    async fn test_integrity_check_passes() {
        let pool = create_test_db().await.unwrap();
        run_migrations(&pool).await.unwrap();
        verify_integrity(&pool).await.unwrap();
    }
}
