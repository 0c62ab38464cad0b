//! AudioShelf persistence layer
//!
//! SQLite with sqlx. The write path belongs to the sync pass and runs in
//! single transactions; every multi-row statement is chunked so its bound
//! parameter count stays under SQLite's cap.

pub mod batch;
pub mod connection;
pub mod migrations;
pub mod queries;
pub mod store;

pub use batch::{batch_rows, MAX_BIND_PARAMS};
pub use connection::{connect, create_test_db, DatabaseConfig, DbPool};
pub use migrations::{current_version, run_migrations, verify_integrity};
pub use store::{ApplyStats, LibraryStore, SyncApply};
