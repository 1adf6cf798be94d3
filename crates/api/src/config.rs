//! Service configuration
//!
//! Layered as: defaults, optional TOML file, `MULTIBOOST_*` environment
//! variables. Command-line overrides are applied by the binary afterwards.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use config::{Config, Environment, File as ConfigFile};
use multiboost_executor::runner::{
    DEFAULT_CLASSIFICATION_SCRIPT, DEFAULT_INTERPRETER, DEFAULT_REGRESSION_SCRIPT,
    DEFAULT_TIMEOUT_SECS,
};
use multiboost_executor::ExecutorConfig;
use multiboost_protocol::dataset::{
    DEFAULT_DATA_ROOT, DEFAULT_REGRESSION_DATA_ROOT, DEFAULT_REGRESSION_MARKER,
};
use multiboost_protocol::environment::DEFAULT_PROJECT_ROOT;
use multiboost_protocol::{DataRoots, TranslatorSettings};
use serde::{Deserialize, Serialize};

use crate::datasets::DatasetCatalog;

pub const DEFAULT_CONFIG_PATH: &str = "config/multiboost.toml";
pub const ENV_PREFIX: &str = "MULTIBOOST";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub project_root: String,
    pub data_root: String,
    pub regression_data_root: String,
    pub regression_marker: String,
    /// Empty means the script is executed directly.
    pub interpreter: String,
    pub regression_script: String,
    pub classification_script: String,
    pub timeout_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8002,
            log_level: "info".to_string(),
            project_root: DEFAULT_PROJECT_ROOT.to_string(),
            data_root: DEFAULT_DATA_ROOT.to_string(),
            regression_data_root: DEFAULT_REGRESSION_DATA_ROOT.to_string(),
            regression_marker: DEFAULT_REGRESSION_MARKER.to_string(),
            interpreter: DEFAULT_INTERPRETER.to_string(),
            regression_script: DEFAULT_REGRESSION_SCRIPT.to_string(),
            classification_script: DEFAULT_CLASSIFICATION_SCRIPT.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl ServiceConfig {
    /// Load from `path`, or from [`DEFAULT_CONFIG_PATH`] when it exists, then
    /// apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let resolved: Option<PathBuf> = match path {
            Some(explicit) => Some(explicit.to_path_buf()),
            None => {
                let fallback = PathBuf::from(DEFAULT_CONFIG_PATH);
                fallback.exists().then_some(fallback)
            }
        };

        let mut builder = Config::builder();
        if let Some(path) = &resolved {
            builder = builder.add_source(ConfigFile::from(path.as_path()).required(true));
        }
        builder = builder.add_source(Environment::with_prefix(ENV_PREFIX));

        let config = builder
            .build()
            .with_context(|| match &resolved {
                Some(path) => format!("failed to read configuration from {}", path.display()),
                None => "failed to read configuration".to_string(),
            })?
            .try_deserialize::<ServiceConfig>()
            .context("invalid configuration")?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            bail!("port must be non-zero");
        }
        if self.timeout_secs == 0 {
            bail!("timeout_secs must be non-zero");
        }
        if self.host.trim().is_empty() {
            bail!("host must not be empty");
        }
        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn translator_settings(&self) -> TranslatorSettings {
        TranslatorSettings {
            project_root: self.project_root.clone(),
            roots: DataRoots {
                data_root: self.data_root.clone(),
                regression_data_root: self.regression_data_root.clone(),
                regression_marker: self.regression_marker.clone(),
            },
        }
    }

    pub fn executor_config(&self) -> ExecutorConfig {
        let interpreter = self.interpreter.trim();
        ExecutorConfig {
            interpreter: (!interpreter.is_empty()).then(|| interpreter.to_string()),
            regression_script: PathBuf::from(&self.regression_script),
            classification_script: PathBuf::from(&self.classification_script),
            working_dir: PathBuf::from(&self.project_root),
            timeout: self.timeout(),
        }
    }

    pub fn dataset_catalog(&self) -> DatasetCatalog {
        DatasetCatalog::new(&self.data_root, &self.regression_data_root)
    }
}
