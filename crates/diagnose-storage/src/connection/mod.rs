//! Connection management: write-serialized + read-pooled.

pub mod pool;
pub mod pragmas;
pub mod write_connection;
pub mod writer;

use std::path::{Path, PathBuf};

use diagnose_core::errors::StorageError;
use rusqlite::Connection;

use self::pool::ReadPool;
use self::pragmas::apply_pragmas;
use self::write_connection::WriteConnection;
use crate::queries::events;
use crate::{migrations, to_storage_err};

/// Owns the single write connection and, for file-backed databases, a pool
/// of read-only connections.
pub struct DatabaseManager {
    writer: WriteConnection,
    readers: Option<ReadPool>,
    path: Option<PathBuf>,
    high_water_mark: Option<i64>,
}

impl DatabaseManager {
    /// Open a database at the given path, apply pragmas, run migrations.
    pub fn open(path: &Path, read_pool_size: usize) -> Result<Self, StorageError> {
        let conn = Connection::open(path).map_err(to_storage_err)?;
        apply_pragmas(&conn)?;
        migrations::run_migrations(&conn)?;
        let high_water_mark = events::high_water_mark(&conn)?;

        let readers = ReadPool::open(path, read_pool_size)?;

        Ok(Self {
            writer: WriteConnection::new(conn),
            readers: Some(readers),
            path: Some(path.to_path_buf()),
            high_water_mark,
        })
    }

    /// Open an in-memory database. Reads go through the writer because
    /// separate in-memory connections would not share data.
    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory().map_err(to_storage_err)?;
        apply_pragmas(&conn)?;
        migrations::run_migrations(&conn)?;

        Ok(Self {
            writer: WriteConnection::new(conn),
            readers: None,
            path: None,
            high_water_mark: None,
        })
    }

    /// Execute a write operation with the serialized writer connection.
    pub async fn with_writer<F, T>(&self, f: F) -> Result<T, StorageError>
    where
        F: FnOnce(&Connection) -> Result<T, StorageError>,
    {
        self.writer.with_conn(f).await
    }

    /// Execute a read operation with a pooled read connection.
    pub async fn with_reader<F, T>(&self, f: F) -> Result<T, StorageError>
    where
        F: FnOnce(&Connection) -> Result<T, StorageError>,
    {
        match &self.readers {
            Some(pool) => pool.with_conn(f),
            None => self.writer.with_conn(f).await,
        }
    }

    /// Fold the WAL back into the main file.
    pub async fn checkpoint(&self) -> Result<(), StorageError> {
        if self.path.is_none() {
            return Ok(());
        }
        self.with_writer(|conn| {
            conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")
                .map_err(to_storage_err)
        })
        .await
    }

    /// Newest event or config timestamp found when the database was opened.
    pub fn high_water_mark(&self) -> Option<i64> {
        self.high_water_mark
    }

    /// Get the database file path (None for in-memory).
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }
}
