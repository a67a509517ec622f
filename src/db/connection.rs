//! Batch record database
//!
//! An r2d2 pool over the SQLite file that holds saved formulations. Opening
//! the database also brings its schema up to date.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, OpenFlags, Transaction};
use thiserror::Error;

use super::migrations;

/// Database error types
#[derive(Debug, Error)]
pub enum DbError {
    #[error("Cannot create database directory: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database connection error: {0}")]
    Connection(#[from] r2d2::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Invalid stored data: {0}")]
    InvalidData(String),
}

/// Result type for database operations
pub type DbResult<T> = Result<T, DbError>;

/// Connections are few: one MCP client drives the server
const POOL_SIZE: u32 = 4;

/// Pooled handle to the batch record database
#[derive(Clone)]
pub struct Database {
    pool: Arc<Pool<SqliteConnectionManager>>,
    path: Arc<PathBuf>,
}

impl Database {
    /// Open (or create) the database at `path` and migrate it
    ///
    /// The parent directory is created when missing.
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let manager = SqliteConnectionManager::file(&path)
            .with_flags(OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE)
            .with_init(|conn| {
                // Lines cascade with their formulation only when foreign keys are on
                conn.execute_batch(
                    "PRAGMA foreign_keys = ON;
                     PRAGMA journal_mode = WAL;
                     PRAGMA synchronous = NORMAL;",
                )
            });

        let pool = Pool::builder().max_size(POOL_SIZE).build(manager)?;
        let database = Self {
            pool: Arc::new(pool),
            path: Arc::new(path),
        };

        database.with_conn(|conn| {
            if migrations::needs_migration(conn)? {
                tracing::info!(path = %database.path.display(), "Migrating batch record database");
            }
            migrations::run_migrations(conn)?;
            let version = migrations::get_schema_version(conn)?;
            tracing::info!(version, "Batch record schema ready");
            Ok(())
        })?;

        Ok(database)
    }

    /// Location of the database file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Size of the database file, if it exists
    pub fn size_bytes(&self) -> Option<u64> {
        std::fs::metadata(self.path.as_path()).ok().map(|m| m.len())
    }

    /// Get a connection from the pool
    pub fn get_conn(&self) -> DbResult<PooledConnection<SqliteConnectionManager>> {
        Ok(self.pool.get()?)
    }

    /// Run a closure with a pooled connection
    pub fn with_conn<F, T>(&self, f: F) -> DbResult<T>
    where
        F: FnOnce(&Connection) -> DbResult<T>,
    {
        let conn = self.get_conn()?;
        f(&conn)
    }

    /// Run a closure inside a transaction, committing only when it succeeds
    pub fn with_transaction<F, T>(&self, f: F) -> DbResult<T>
    where
        F: FnOnce(&Transaction) -> DbResult<T>,
    {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }
}
