//! DiagnoseErrorCode trait for host-bridge conversion.

/// Every error enum implements this to provide a structured error code
/// string that host bindings (Kotlin/Swift bridges) can match on.
pub trait DiagnoseErrorCode {
    /// Returns the error code string (e.g., "STORAGE_ERROR").
    fn error_code(&self) -> &'static str;

    /// Returns the formatted bridge string: `[ERROR_CODE] message`.
    fn coded_string(&self) -> String
    where
        Self: std::fmt::Display,
    {
        format!("[{}] {}", self.error_code(), self)
    }
}

// Error code constants for the host boundary.
pub const STORAGE_ERROR: &str = "STORAGE_ERROR";
pub const MIGRATION_FAILED: &str = "MIGRATION_FAILED";
pub const DB_CORRUPT: &str = "DB_CORRUPT";
pub const NETWORK_ERROR: &str = "NETWORK_ERROR";
pub const DECODE_ERROR: &str = "DECODE_ERROR";
pub const INVALID_VENDOR_DATABASE: &str = "INVALID_VENDOR_DATABASE";
pub const CONFIG_ERROR: &str = "CONFIG_ERROR";
pub const CONFIG_UNAVAILABLE: &str = "CONFIG_UNAVAILABLE";
pub const SYNC_FAILED: &str = "SYNC_FAILED";
pub const UPLOAD_FAILED: &str = "UPLOAD_FAILED";
pub const MALFORMED_INPUT: &str = "MALFORMED_INPUT";
