use anyhow::{Context, Result};
use config::{Config, Environment, File, Value};

use super::types::EngineConfig;

/// Configuration loader with builder pattern
///
/// Sources are layered in order, later ones winning: struct defaults,
/// then an optional TOML file, then `SEO_`-prefixed environment
/// variables, then explicit overrides (typically CLI flags).
pub struct ConfigLoader {
    config_file: Option<String>,
    load_env: bool,
    overrides: Vec<(String, Value)>,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        Self {
            config_file: None,
            load_env: false,
            overrides: Vec::new(),
        }
    }

    /// Load configuration from a file
    ///
    /// With `None`, the standard locations `seo-workers.toml` and
    /// `config/seo-workers.toml` are probed instead.
    pub fn load_from_file(mut self, path: Option<&str>) -> Self {
        self.config_file = path.map(String::from);
        self
    }

    /// Load configuration from environment variables
    ///
    /// Nested keys use double underscores, e.g. `SEO_SERVER__PORT=9090`.
    pub fn load_from_env(mut self) -> Self {
        self.load_env = true;
        self
    }

    /// Override a single key, applied after all other sources
    pub fn with_override(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.overrides.push((key.to_string(), value.into()));
        self
    }

    /// Build the final configuration
    pub fn build(self) -> Result<EngineConfig> {
        let mut builder =
            Config::builder().add_source(Config::try_from(&EngineConfig::default())?);

        // Add configuration file if specified
        if let Some(config_path) = &self.config_file {
            builder = builder.add_source(File::with_name(config_path).required(false));
        } else {
            // Try to load from standard locations
            builder = builder
                .add_source(File::with_name("seo-workers").required(false))
                .add_source(File::with_name("config/seo-workers").required(false));
        }

        // Add environment variables if requested
        if self.load_env {
            builder = builder.add_source(
                Environment::with_prefix("SEO")
                    .prefix_separator("_")
                    .separator("__"),
            );
        }

        for (key, value) in self.overrides {
            builder = builder
                .set_override(key, value)
                .context("Failed to apply configuration override")?;
        }

        // Build the configuration
        let config: EngineConfig = builder
            .build()
            .context("Failed to build configuration")?
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        Ok(config)
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
