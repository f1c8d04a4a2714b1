//! Queries for the local vendor snapshot.

use diagnose_core::errors::StorageError;
use diagnose_core::models::{VendorData, VendorDatabase};
use rusqlite::{params, Connection, OptionalExtension};

use crate::to_storage_err;

/// Replace all vendor rows and the stored version. Call inside a transaction.
pub fn replace_all(
    conn: &Connection,
    db: &VendorDatabase,
    stored_at: i64,
) -> Result<usize, StorageError> {
    conn.execute("DELETE FROM vendors", []).map_err(to_storage_err)?;

    let mut stmt = conn
        .prepare_cached("INSERT INTO vendors (domain, vendor_id, iab_id) VALUES (?1, ?2, ?3)")
        .map_err(to_storage_err)?;
    let mut inserted = 0usize;
    let mut failure = None;
    db.export(|domain, vendor_id, iab_id| {
        if failure.is_some() {
            return;
        }
        match stmt.execute(params![domain, vendor_id, iab_id]) {
            Ok(n) => inserted += n,
            Err(e) => failure = Some(e),
        }
    });
    if let Some(e) = failure {
        return Err(to_storage_err(e));
    }

    conn.execute(
        "INSERT INTO vendor_meta (id, version, stored_at) VALUES (1, ?1, ?2)
         ON CONFLICT(id) DO UPDATE SET version = excluded.version, stored_at = excluded.stored_at",
        params![db.version(), stored_at],
    )
    .map_err(to_storage_err)?;

    Ok(inserted)
}

pub fn stored_version(conn: &Connection) -> Result<Option<String>, StorageError> {
    conn.query_row("SELECT version FROM vendor_meta WHERE id = 1", [], |row| row.get(0))
        .optional()
        .map_err(to_storage_err)
}

/// The stored snapshot, or `None` if none was ever stored.
pub fn load(conn: &Connection) -> Result<Option<VendorDatabase>, StorageError> {
    let Some(version) = stored_version(conn)? else {
        return Ok(None);
    };

    let mut stmt = conn
        .prepare_cached("SELECT domain, vendor_id, iab_id FROM vendors")
        .map_err(to_storage_err)?;
    let rows = stmt
        .query_map([], |row| {
            Ok(VendorData {
                domain: row.get(0)?,
                vendor_id: row.get(1)?,
                iab_id: row.get(2)?,
            })
        })
        .map_err(to_storage_err)?;
    let entries = rows.collect::<Result<Vec<_>, _>>().map_err(to_storage_err)?;

    VendorDatabase::new(&version, entries)
        .map(Some)
        .map_err(|e| StorageError::CorruptRow {
            details: e.to_string(),
        })
}
