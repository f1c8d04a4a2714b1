//! Domain model: events, config snapshots, vendor tables.

pub mod consent;
pub mod event;
pub mod flags;
pub mod remote_config;
pub mod stored_config;
pub mod vendor;

pub use consent::ConsentAction;
pub use event::{Event, SendEvent};
pub use flags::{EventFlags, EventType};
pub use remote_config::RemoteConfig;
pub use stored_config::StoredConfig;
pub use vendor::{normalize_domain, VendorData, VendorDatabase, VendorRow};
