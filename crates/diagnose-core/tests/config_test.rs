//! Agent configuration loading and validation.

use std::sync::Mutex;

use diagnose_core::config::{AgentConfig, HostOverrides};
use diagnose_core::errors::{ConfigError, DiagnoseErrorCode};
use tempfile::TempDir;

// Env var tests mutate process state; run them one at a time.
static ENV_MUTEX: Mutex<()> = Mutex::new(());

const VALID: &str = r#"
[api]
base_url = "https://diagnose.example.com/api/v1"
account_id = "22"
property_id = "31337"
app_name = "demo"

[storage]
db_path = "/tmp/diagnose.db"

[handler]
ignore_domains = ["localhost"]
flush_interval_secs = 15
"#;

// ---- parsing ----

#[test]
fn parses_full_file() {
    let cfg = AgentConfig::from_toml(VALID).unwrap();
    assert_eq!(cfg.api.account_id.as_deref(), Some("22"));
    assert_eq!(cfg.api.host().as_deref(), Some("diagnose.example.com"));
    assert_eq!(cfg.handler.effective_flush_interval_secs(), 15);
    assert_eq!(cfg.api.effective_timeout_secs(), 30);
    assert_eq!(cfg.api.effective_max_retries(), 3);
    assert!(!cfg.handler.effective_consent_gating());
    AgentConfig::validate(&cfg).unwrap();
}

#[test]
fn empty_file_is_default() {
    let cfg = AgentConfig::from_toml("").unwrap();
    assert_eq!(cfg, AgentConfig::default());
    assert!(cfg.storage.effective_db_path().is_none());
}

#[test]
fn to_toml_round_trips() {
    let cfg = AgentConfig::from_toml(VALID).unwrap();
    let back = AgentConfig::from_toml(&cfg.to_toml().unwrap()).unwrap();
    assert_eq!(cfg, back);
}

#[test]
fn bad_toml_is_parse_error() {
    let err = AgentConfig::from_toml("[api\nbase_url =").unwrap_err();
    assert!(matches!(err, ConfigError::ParseError { .. }));
    assert!(err.coded_string().starts_with("[CONFIG_ERROR]"));
}

// ---- validation ----

#[test]
fn base_url_requires_ids() {
    let cfg = AgentConfig::from_toml("[api]\nbase_url = \"https://x.test\"\n").unwrap();
    let err = AgentConfig::validate(&cfg).unwrap_err();
    match err {
        ConfigError::ValidationFailed { field, .. } => assert_eq!(field, "api.account_id"),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn rejects_non_http_base_url() {
    let cfg = AgentConfig::from_toml(
        "[api]\nbase_url = \"ftp://x.test\"\naccount_id = \"1\"\nproperty_id = \"2\"\n",
    )
    .unwrap();
    assert!(AgentConfig::validate(&cfg).is_err());
}

#[test]
fn rejects_zero_flush_interval() {
    let cfg = AgentConfig::from_toml("[handler]\nflush_interval_secs = 0\n").unwrap();
    assert!(AgentConfig::validate(&cfg).is_err());
}

// ---- layered load ----

#[test]
fn load_layers_file_env_and_host() {
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|p| p.into_inner());
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("diagnose.toml"), VALID).unwrap();

    std::env::set_var("DIAGNOSE_API_REGION", "eu");
    std::env::set_var("DIAGNOSE_HANDLER_FLUSH_INTERVAL_SECS", "90");
    let host = HostOverrides {
        property_id: Some("99".into()),
        ..Default::default()
    };
    let result = AgentConfig::load(dir.path(), Some(&host));
    std::env::remove_var("DIAGNOSE_API_REGION");
    std::env::remove_var("DIAGNOSE_HANDLER_FLUSH_INTERVAL_SECS");

    let cfg = result.unwrap();
    assert_eq!(cfg.api.account_id.as_deref(), Some("22"));
    assert_eq!(cfg.api.region.as_deref(), Some("eu"));
    assert_eq!(cfg.handler.effective_flush_interval_secs(), 90);
    assert_eq!(cfg.api.property_id.as_deref(), Some("99"));
}

#[test]
fn load_without_file_uses_defaults() {
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|p| p.into_inner());
    let dir = TempDir::new().unwrap();
    let cfg = AgentConfig::load(dir.path(), None).unwrap();
    assert!(cfg.api.base_url.is_none());
}
