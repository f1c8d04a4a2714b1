//! Seams to external collaborators.

pub mod cancellation;
pub mod client;
pub mod consent;
pub mod vendor_loader;

pub use cancellation::{Cancellable, CancellationToken};
pub use client::DiagnoseClient;
pub use consent::{ConsentManager, NullConsentManager};
pub use vendor_loader::VendorDatabaseLoader;
