//! Wiring the agent from configuration.

use std::sync::Arc;
use std::time::Duration;

use diagnose_cloud::DiagnoseApiClient;
use diagnose_core::clock::{MonotonicClock, SystemMonotonicClock};
use diagnose_core::config::AgentConfig;
use diagnose_core::errors::{DiagnoseError, DiagnoseErrorCode};
use diagnose_core::models::{ConsentAction, VendorDatabase};
use diagnose_core::traits::{CancellationToken, ConsentManager, NullConsentManager};
use diagnose_storage::EventStore;
use tokio::task::JoinHandle;

use crate::flush::spawn_flush_loop;
use crate::handler::{EventHandler, FlushOutcome};

pub type DefaultEventHandler = EventHandler<DiagnoseApiClient, NullConsentManager>;

/// A running agent, or the no-op stand-in used when startup failed.
///
/// Startup problems never reach the host: a disabled agent accepts every call
/// and never blocks a request.
pub enum Agent<M = NullConsentManager> {
    Active(Arc<EventHandler<DiagnoseApiClient, M>>),
    Disabled,
}

impl Agent<NullConsentManager> {
    /// Start without a consent evaluator. `handler.consent_gating` is ignored
    /// here because `NullConsentManager` would drop every IAB vendor; hosts
    /// that gate on consent use [`Agent::start_with`].
    pub async fn start(config: &AgentConfig) -> Self {
        if config.handler.effective_consent_gating() {
            tracing::warn!("consent gating requires a consent manager; gating disabled");
        }
        Self::launch(config, NullConsentManager, false).await
    }
}

impl<M> Agent<M>
where
    M: ConsentManager + 'static,
{
    /// Start with the host's consent evaluator. Gating follows
    /// `handler.consent_gating`.
    pub async fn start_with(config: &AgentConfig, consent: M) -> Self {
        let gating = config.handler.effective_consent_gating();
        Self::launch(config, consent, gating).await
    }

    async fn launch(config: &AgentConfig, consent: M, consent_gating: bool) -> Self {
        match Self::try_start(config, consent, consent_gating).await {
            Ok(handler) => Self::Active(handler),
            Err(e) => {
                tracing::error!(error = %e, code = e.error_code(), "agent disabled");
                Self::Disabled
            }
        }
    }

    async fn try_start(
        config: &AgentConfig,
        consent: M,
        consent_gating: bool,
    ) -> Result<Arc<EventHandler<DiagnoseApiClient, M>>, DiagnoseError> {
        AgentConfig::validate(config)?;

        let clock: Arc<dyn MonotonicClock> = Arc::new(SystemMonotonicClock::new());
        let store = Arc::new(EventStore::from_config(&config.storage, clock)?);
        let client = DiagnoseApiClient::from_config(&config.api)?;

        // Never record the agent's own traffic.
        let ignore = config
            .handler
            .ignore_domains
            .iter()
            .cloned()
            .chain(config.api.host());

        let handler = EventHandler::new(store, client, consent, VendorDatabase::unset())
            .with_ignore_domains(ignore)
            .with_consent_gating(consent_gating);
        let report = handler.refresh().await;
        tracing::info!(
            config_applied = report.config_applied,
            vendor_version = %report.vendor_version,
            consent_gating,
            "agent started"
        );
        Ok(Arc::new(handler))
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active(_))
    }

    pub fn handler(&self) -> Option<&Arc<EventHandler<DiagnoseApiClient, M>>> {
        match self {
            Self::Active(handler) => Some(handler),
            Self::Disabled => None,
        }
    }

    pub async fn url_received(&self, url: &str, method: &str, headers: &[(String, String)]) -> bool {
        match self {
            Self::Active(h) => h.url_received(url, method, headers).await,
            Self::Disabled => false,
        }
    }

    pub async fn set_state(&self, state: Vec<String>) {
        if let Self::Active(h) = self {
            h.set_state(state).await;
        }
    }

    pub async fn set_consent_string(&self, consent_string: String) {
        if let Self::Active(h) = self {
            h.set_consent_string(consent_string).await;
        }
    }

    pub async fn consent_event(&self, action: ConsentAction) -> bool {
        match self {
            Self::Active(h) => h.consent_event(action).await,
            Self::Disabled => false,
        }
    }

    pub async fn dump_state(&self) -> FlushOutcome {
        match self {
            Self::Active(h) => h.dump_state().await,
            Self::Disabled => FlushOutcome::Inactive,
        }
    }

    /// `None` for a disabled agent. Must be called inside a tokio runtime.
    pub fn spawn_flush_loop(
        &self,
        config: &AgentConfig,
        cancel: CancellationToken,
    ) -> Option<JoinHandle<()>> {
        let Self::Active(handler) = self else {
            return None;
        };
        let interval = Duration::from_secs(config.handler.effective_flush_interval_secs());
        Some(spawn_flush_loop(Arc::clone(handler), interval, cancel))
    }
}
