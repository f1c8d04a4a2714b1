//! Error handling for the diagnose agent.
//! One error enum per subsystem, `thiserror` only, zero `anyhow`.

pub mod cloud_error;
pub mod config_error;
pub mod diagnose_error;
pub mod error_code;
pub mod storage_error;

pub use cloud_error::CloudError;
pub use config_error::ConfigError;
pub use diagnose_error::{DiagnoseError, DiagnoseResult};
pub use error_code::DiagnoseErrorCode;
pub use storage_error::StorageError;
