//! Vendor table refresh.

use diagnose_core::constants::UNSET_VERSION;
use diagnose_core::errors::{DiagnoseError, DiagnoseErrorCode};
use diagnose_core::models::VendorDatabase;
use diagnose_core::traits::{DiagnoseClient, VendorDatabaseLoader};

/// Pick the best available vendor table. Never fails.
///
/// Starts from an empty table at the sentinel version, prefers the local
/// snapshot, and downloads the remote table only when `remote_version` is
/// known and differs from what is held. A downloaded table is written back
/// locally; it is used even if that write fails.
pub async fn load_database<C, L>(remote_version: &str, client: &C, loader: &L) -> VendorDatabase
where
    C: DiagnoseClient,
    L: VendorDatabaseLoader,
{
    let mut db = VendorDatabase::unset();

    match loader.load_local_database().await {
        Ok(Some(local)) => db = local,
        Ok(None) => {}
        Err(e) => {
            tracing::error!(error = %e, code = e.error_code(), "error loading local vendor database");
        }
    }

    if remote_version != db.version() && remote_version != UNSET_VERSION {
        match client.get_vendor_database().await {
            Ok(remote) => {
                if let Err(e) = loader.store_local_database(&remote).await {
                    tracing::error!(error = %e, "error storing vendor database");
                }
                tracing::info!(
                    from = db.version(),
                    to = remote.version(),
                    vendors = remote.len(),
                    "vendor database updated"
                );
                db = remote;
            }
            Err(e) => {
                let err = DiagnoseError::SyncFailed(e);
                tracing::error!(error = %err, code = err.error_code(), "error loading remote vendor database");
            }
        }
    }

    db
}
