//! Configuration system for the agent.
//! TOML-based, layered resolution: host overrides > env > project file > defaults.

pub mod agent_config;
pub mod api_config;
pub mod defaults;
pub mod handler_config;
pub mod storage_config;

pub use agent_config::{AgentConfig, HostOverrides};
pub use api_config::ApiConfig;
pub use handler_config::HandlerConfig;
pub use storage_config::StorageConfig;
