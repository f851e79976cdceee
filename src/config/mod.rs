//! Layered application configuration
//!
//! Defaults are defined on the types themselves; `ConfigLoader` merges
//! TOML files, environment variables, and explicit overrides on top.

pub mod loader;
pub mod types;

pub use loader::ConfigLoader;
pub use types::{
    EngineConfig, LogFormat, LogRotation, LoggingConfig, MonitoringSettings, ServerConfig,
};
