//! Remote backend client.

use std::future::Future;

use crate::errors::CloudError;
use crate::models::{ConsentAction, RemoteConfig, SendEvent, VendorDatabase};

/// The backend the agent talks to. Implemented over HTTP by
/// `diagnose-cloud`; tests substitute in-memory fakes.
///
/// Futures are `Send` so handlers can be driven from spawned tasks.
/// Implementors may write the methods as plain `async fn`.
pub trait DiagnoseClient: Send + Sync {
    fn get_config(&self) -> impl Future<Output = Result<RemoteConfig, CloudError>> + Send;

    fn get_vendor_database(
        &self,
    ) -> impl Future<Output = Result<VendorDatabase, CloudError>> + Send;

    /// Upload a batch. An empty batch succeeds without contacting the backend.
    fn send_events(
        &self,
        events: &[SendEvent],
    ) -> impl Future<Output = Result<(), CloudError>> + Send;

    /// Report a consent action. `ts_ms` is milliseconds since the epoch.
    fn send_consent_action(
        &self,
        action: ConsentAction,
        ts_ms: i64,
    ) -> impl Future<Output = Result<(), CloudError>> + Send;

    /// The installation's current sample rate, for backends that report it.
    fn set_sample_rate(&self, _rate: u8) {}
}
