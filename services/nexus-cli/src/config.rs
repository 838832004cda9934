//! CLI configuration.
//!
//! Settings come from a YAML file when one is given, otherwise from the
//! `NEXUS_*` environment variables (after `.env` has been loaded).

use std::path::Path;

use anyhow::{Context, Result};
use nexus_pipeline::PipelineConfig;
use serde::{Deserialize, Serialize};

/// Top-level CLI configuration file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Read pipeline settings
    pub pipeline: PipelineConfig,
}

impl CliConfig {
    /// Load configuration from a YAML file.
    pub fn from_yaml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;

        serde_yaml::from_str(&text)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self {
            pipeline: PipelineConfig::from_env(),
        }
    }

    /// Load from `path` if given, else from the environment, and validate.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::from_yaml(path)?,
            None => Self::from_env(),
        };

        config
            .pipeline
            .validate()
            .map_err(|msg| anyhow::anyhow!("invalid configuration: {}", msg))?;

        Ok(config)
    }
}
