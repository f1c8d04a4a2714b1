//! Periodic upload loop.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use diagnose_core::traits::{Cancellable, CancellationToken, ConsentManager, DiagnoseClient};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::handler::{EventHandler, FlushOutcome};

/// Flush every `interval` until `cancel` is set. Refreshes the remote config
/// first when it has expired. The first tick fires after one full interval.
pub fn spawn_flush_loop<C, M>(
    handler: Arc<EventHandler<C, M>>,
    interval: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()>
where
    C: DiagnoseClient + 'static,
    M: ConsentManager + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::debug!(interval_ms = interval.as_millis() as u64, "flush loop started");

        loop {
            ticker.tick().await;
            if cancel.is_cancelled() {
                break;
            }
            if handler.needs_refresh(Utc::now()) {
                let report = handler.refresh().await;
                tracing::debug!(?report, "refreshed expired config");
            }
            match handler.dump_state().await {
                FlushOutcome::Uploaded { events, .. } => {
                    tracing::debug!(events, "periodic flush uploaded events");
                }
                FlushOutcome::Failed => tracing::debug!("periodic flush failed; will retry"),
                _ => {}
            }
        }
        tracing::debug!("flush loop stopped");
    })
}
