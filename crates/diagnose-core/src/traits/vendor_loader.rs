//! Local persistence for vendor table snapshots.

use std::future::Future;

use crate::errors::StorageError;
use crate::models::VendorDatabase;

pub trait VendorDatabaseLoader: Send + Sync {
    /// `None` when no snapshot has been stored yet.
    fn load_local_database(
        &self,
    ) -> impl Future<Output = Result<Option<VendorDatabase>, StorageError>> + Send;

    /// Replace the stored snapshot.
    fn store_local_database(
        &self,
        db: &VendorDatabase,
    ) -> impl Future<Output = Result<(), StorageError>> + Send;
}
