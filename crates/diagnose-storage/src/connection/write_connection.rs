//! Single write connection behind `tokio::sync::Mutex`.

use diagnose_core::errors::StorageError;
use rusqlite::Connection;
use tokio::sync::Mutex;

pub struct WriteConnection {
    conn: Mutex<Connection>,
}

impl WriteConnection {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    /// Acquire the write lock and execute a closure with the connection.
    /// The closure is synchronous, so the lock is never held across an await.
    pub async fn with_conn<F, T>(&self, f: F) -> Result<T, StorageError>
    where
        F: FnOnce(&Connection) -> Result<T, StorageError>,
    {
        let guard = self.conn.lock().await;
        f(&guard)
    }
}
