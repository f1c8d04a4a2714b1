//! Tracing initialization and configuration.

use std::sync::Once;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::constants::{DEFAULT_LOG_FILTER, LOG_ENV_VAR};

static INIT: Once = Once::new();

/// Initialize logging for the agent.
///
/// Reads `DIAGNOSE_LOG` for per-module levels, e.g.
/// `DIAGNOSE_LOG=diagnose_storage=debug,diagnose_cloud=warn`.
/// Falls back to `diagnose=info` when unset or invalid.
///
/// Idempotent. Hosts that install their own subscriber should not call it.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env(LOG_ENV_VAR)
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

        // try_init: the host may already own the global subscriber.
        let _ = tracing_subscriber::registry()
            .with(fmt::layer().with_target(true).with_thread_ids(true))
            .with(filter)
            .try_init();
    });
}
