//! Cloud transport errors.

use super::error_code::{self, DiagnoseErrorCode};

#[derive(Debug, thiserror::Error)]
pub enum CloudError {
    #[error("network error: {reason}")]
    NetworkError { reason: String },

    #[error("unexpected HTTP status {status}: {body}")]
    BadStatus { status: u16, body: String },

    #[error("failed to decode response: {reason}")]
    DecodeFailed { reason: String },

    #[error("invalid vendor database: {reason}")]
    InvalidVendorDatabase { reason: String },
}

impl DiagnoseErrorCode for CloudError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NetworkError { .. } | Self::BadStatus { .. } => error_code::NETWORK_ERROR,
            Self::DecodeFailed { .. } => error_code::DECODE_ERROR,
            Self::InvalidVendorDatabase { .. } => error_code::INVALID_VENDOR_DATABASE,
        }
    }
}
