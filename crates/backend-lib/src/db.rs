// ============================
// filedrop-lib/src/db.rs
// ============================
//! SQLite pool and schema for users and ownership records.
use std::path::Path;
use std::time::Duration;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous};
use crate::error::AppError;

const SCHEMA: [&str; 2] = [
    "CREATE TABLE IF NOT EXISTS users (
        id              INTEGER PRIMARY KEY AUTOINCREMENT,
        username        TEXT NOT NULL UNIQUE,
        hashed_password TEXT NOT NULL
    )",
    "CREATE TABLE IF NOT EXISTS files (
        id       INTEGER PRIMARY KEY AUTOINCREMENT,
        filename TEXT NOT NULL,
        owner_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
        UNIQUE (owner_id, filename)
    )",
];

/// Shared connection pool. Cheap to clone.
#[derive(Clone, Debug)]
pub struct Db(SqlitePool);

impl Db {
    /// Open (creating if needed) the database file and apply the schema
    pub async fn connect<P: AsRef<Path>>(path: P) -> Result<Self, AppError> {
        let opts = SqliteConnectOptions::new()
            .filename(path.as_ref())
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(opts)
            .await?;

        let db = Db(pool);
        db.migrate().await?;
        Ok(db)
    }

    async fn migrate(&self) -> Result<(), AppError> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.0).await?;
        }
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.0
    }
}
