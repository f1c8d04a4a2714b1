//! Top-level error taxonomy seen at the handler boundary.
//!
//! Cloud failures are classified by the operation that hit them so that
//! logs and bridge codes distinguish a missing remote config from a failed
//! upload even though both come from the same transport.

use super::error_code::{self, DiagnoseErrorCode};
use super::{CloudError, ConfigError, StorageError};

pub type DiagnoseResult<T> = Result<T, DiagnoseError>;

#[derive(Debug, thiserror::Error)]
pub enum DiagnoseError {
    /// Remote config fetch failed; caller falls back to a default config.
    #[error("remote config unavailable: {0}")]
    ConfigUnavailable(CloudError),

    /// Vendor database refresh failed; caller keeps the previous snapshot.
    #[error("vendor database sync failed: {0}")]
    SyncFailed(CloudError),

    /// Upload failed; caller unmarks the drained events.
    #[error("event upload failed: {0}")]
    UploadFailed(CloudError),

    #[error("malformed input {input:?}: {reason}")]
    MalformedInput { input: String, reason: String },

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl DiagnoseErrorCode for DiagnoseError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::ConfigUnavailable(_) => error_code::CONFIG_UNAVAILABLE,
            Self::SyncFailed(_) => error_code::SYNC_FAILED,
            Self::UploadFailed(_) => error_code::UPLOAD_FAILED,
            Self::MalformedInput { .. } => error_code::MALFORMED_INPUT,
            Self::Storage(e) => e.error_code(),
            Self::Config(e) => e.error_code(),
        }
    }
}
