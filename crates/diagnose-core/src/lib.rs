//! Core types, traits, errors, config, clock and sampling for the diagnose agent.
//!
//! Everything here is free of I/O except configuration file loading; storage
//! lives in `diagnose-storage`, transport in `diagnose-cloud`.

pub mod clock;
pub mod config;
pub mod constants;
pub mod errors;
pub mod models;
pub mod sampling;
pub mod traits;
pub mod tracing;

pub use clock::{MonotonicClock, SystemMonotonicClock};
pub use errors::{CloudError, ConfigError, DiagnoseError, DiagnoseErrorCode, StorageError};
pub use models::{
    ConsentAction, Event, EventFlags, EventType, RemoteConfig, SendEvent, StoredConfig,
    VendorData, VendorDatabase, VendorRow,
};
pub use sampling::Sampling;
