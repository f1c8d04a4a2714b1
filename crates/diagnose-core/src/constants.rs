//! Shared constants.

/// Schema version tag on config history rows. Reads only consider rows
/// written under this version.
pub const CONFIG_VERSION: &str = "1.0";

/// Sentinel version for "no vendor database / no remote config".
pub const UNSET_VERSION: &str = "000";

pub const NANOS_PER_MILLI: i64 = 1_000_000;

/// Project-level config file name.
pub const CONFIG_FILE_NAME: &str = "diagnose.toml";

/// Environment variable holding the tracing filter.
pub const LOG_ENV_VAR: &str = "DIAGNOSE_LOG";

/// Tracing filter used when `DIAGNOSE_LOG` is unset or invalid.
pub const DEFAULT_LOG_FILTER: &str = "diagnose=info";
