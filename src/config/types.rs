//! Configuration types for the analysis engine
//!
//! Every section deserializes from TOML and environment sources with
//! complete defaults, so `EngineConfig::default()` is a working
//! configuration for local development.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::analytics::{AnomalyConfig, ForecastConfig};
use crate::error::{Error, Result};
use crate::keyword::PipelineConfig;
use crate::llm::LlmConfig;
use crate::monitoring::AlertConfig;

/// Top-level configuration for the engine
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// HTTP server settings
    pub server: ServerConfig,
    /// Keyword analysis pipeline settings
    pub pipeline: PipelineConfig,
    /// Site monitoring settings
    pub monitoring: MonitoringSettings,
    /// LLM provider settings
    pub llm: LlmConfig,
    /// Logging settings
    pub logging: LoggingConfig,
}

impl EngineConfig {
    /// Validate cross-field constraints that serde defaults cannot express
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(Error::Config("server.port must be non-zero".to_string()));
        }
        if self.server.request_timeout_secs == 0 {
            return Err(Error::Config(
                "server.request_timeout_secs must be non-zero".to_string(),
            ));
        }
        let thresholds = &self.monitoring.anomaly;
        let ordered = thresholds.low_threshold <= thresholds.medium_threshold
            && thresholds.medium_threshold <= thresholds.high_threshold
            && thresholds.high_threshold <= thresholds.critical_threshold;
        if !ordered {
            return Err(Error::Config(
                "anomaly thresholds must satisfy low <= medium <= high <= critical".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.pipeline.similarity_threshold) {
            return Err(Error::Config(
                "pipeline.similarity_threshold must be within 0.0..=1.0".to_string(),
            ));
        }
        self.llm.validate()?;
        Ok(())
    }
}

/// HTTP server settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address
    pub host: String,
    /// Bind port
    pub port: u16,
    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,
}

impl ServerConfig {
    /// Socket address in `host:port` form
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            request_timeout_secs: 30,
        }
    }
}

/// Site monitoring settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringSettings {
    /// Seed for the deterministic mock data sources
    pub mock_seed: u64,
    /// Anomaly detection thresholds and windows
    pub anomaly: AnomalyConfig,
    /// Forecasting parameters
    pub forecast: ForecastConfig,
    /// Alert generation parameters
    pub alert: AlertConfig,
}

impl Default for MonitoringSettings {
    fn default() -> Self {
        Self {
            mock_seed: 42,
            anomaly: AnomalyConfig::default(),
            forecast: ForecastConfig::default(),
            alert: AlertConfig::default(),
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (trace, debug, info, warn, error) or a full
    /// `EnvFilter` directive string
    pub level: String,
    /// Console output format
    pub format: LogFormat,
    /// Console logging toggle
    pub console_enabled: bool,
    /// File logging toggle
    pub file_enabled: bool,
    /// Directory for rotated log files
    pub log_dir: PathBuf,
    /// Log file rotation policy
    pub rotation: LogRotation,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
            console_enabled: true,
            file_enabled: false,
            log_dir: PathBuf::from("logs"),
            rotation: LogRotation::Daily,
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable output for development
    Pretty,
    /// Structured JSON lines
    Json,
    /// Single-line compact output
    Compact,
}

impl Default for LogFormat {
    fn default() -> Self {
        LogFormat::Pretty
    }
}

/// Log file rotation policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    /// Rotate at midnight UTC
    Daily,
    /// Rotate at the top of each hour
    Hourly,
    /// Single file, never rotated
    Never,
}

impl Default for LogRotation {
    fn default() -> Self {
        LogRotation::Daily
    }
}
