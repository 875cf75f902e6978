//! Configuration loading for agent-ci.

use crate::loader::MAX_FILE_SIZE;
use crate::types::{RunConfig, SourceConfig, ValidationError};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur during config loading.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    NotFound(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("config file {0} exceeds the 10 MiB limit")]
    TooLarge(PathBuf),
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yml::Error),
    #[error("invalid config: {0}")]
    Invalid(#[from] ValidationError),
}

/// Load a scripted source configuration from a YAML file.
///
/// # Errors
/// Returns an error if:
/// - The file does not exist or cannot be read
/// - The YAML is invalid or has unknown keys
/// - `failure_rate` is outside `[0, 1]` or a latency is negative
pub fn load_source_config(path: &Path) -> Result<SourceConfig, ConfigError> {
    if !path.is_file() {
        return Err(ConfigError::NotFound(path.to_path_buf()));
    }
    if std::fs::metadata(path)?.len() > MAX_FILE_SIZE {
        return Err(ConfigError::TooLarge(path.to_path_buf()));
    }

    let content = std::fs::read_to_string(path)?;
    let config: SourceConfig = serde_yml::from_str(&content)?;
    config.validate()?;

    tracing::debug!(
        path = %path.display(),
        model = %config.model_name,
        responses = config.responses.len(),
        "loaded source config"
    );
    Ok(config)
}

/// CLI override options for a run.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub source_config: Option<SourceConfig>,
    pub timeout_seconds: Option<f64>,
    pub parallel: Option<bool>,
    pub concurrency: Option<usize>,
    pub seed: Option<u64>,
}

/// Apply CLI overrides to a run configuration.
#[must_use]
pub fn apply_overrides(mut config: RunConfig, overrides: &ConfigOverrides) -> RunConfig {
    if let Some(ref source) = overrides.source_config {
        config.source_config = Some(source.clone());
    }
    if let Some(timeout) = overrides.timeout_seconds {
        config.timeout_seconds = timeout;
    }
    if let Some(parallel) = overrides.parallel {
        config.parallel = parallel;
    }
    if let Some(concurrency) = overrides.concurrency {
        config.concurrency = Some(concurrency);
    }
    if let Some(seed) = overrides.seed {
        config.seed = Some(seed);
    }
    config
}
