//! Dataset location resolution
//!
//! Picks the effective dataset identifier and data root for a request from
//! heuristics on the dataset name, or from a caller-supplied local path.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

use crate::errors::{Result, TranslateError};
use crate::fields::names;
use crate::normalize::NormalizedParameterSet;

pub const DEFAULT_DATA_ROOT: &str = "/opt/data";
pub const DEFAULT_REGRESSION_DATA_ROOT: &str = "/opt/data/Regression";
pub const DEFAULT_REGRESSION_MARKER: &str = "BNG_lowbwt";

/// Built-in filesystem roots the external executable searches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataRoots {
    pub data_root: String,
    pub regression_data_root: String,
    /// Substring identifying the regression benchmark family.
    pub regression_marker: String,
}

impl Default for DataRoots {
    fn default() -> Self {
        Self {
            data_root: DEFAULT_DATA_ROOT.to_string(),
            regression_data_root: DEFAULT_REGRESSION_DATA_ROOT.to_string(),
            regression_marker: DEFAULT_REGRESSION_MARKER.to_string(),
        }
    }
}

/// Which selection rule produced a resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DatasetSource {
    LocalPath,
    RegressionFamily,
    ExplicitPath,
    BuiltIn,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatasetResolution {
    pub effective_dataset_id: String,
    pub data_root_path: String,
    pub stepwise_oos_enabled: bool,
    pub source: DatasetSource,
}

impl DatasetResolution {
    pub fn with_stepwise_oos(mut self, enabled: bool) -> Self {
        self.stepwise_oos_enabled = enabled;
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct DatasetResolver {
    roots: DataRoots,
}

impl DatasetResolver {
    pub fn new(roots: DataRoots) -> Self {
        Self { roots }
    }

    pub fn roots(&self) -> &DataRoots {
        &self.roots
    }

    /// Resolve a dataset location; the first matching rule wins.
    ///
    /// Only the local-path rule touches the filesystem.
    pub fn resolve(
        &self,
        dataname: &str,
        local_data_path: Option<&str>,
        dataset_name: Option<&str>,
    ) -> Result<DatasetResolution> {
        if let Some(local) = local_data_path {
            return self.resolve_local(local, dataset_name);
        }

        let source = if dataname.contains(&self.roots.regression_marker) {
            DatasetSource::RegressionFamily
        } else if dataname.contains(std::path::MAIN_SEPARATOR) && !self.has_builtin_prefix(dataname)
        {
            DatasetSource::ExplicitPath
        } else {
            DatasetSource::BuiltIn
        };

        let data_root_path = match source {
            DatasetSource::RegressionFamily => self.roots.regression_data_root.clone(),
            _ => self.roots.data_root.clone(),
        };

        Ok(DatasetResolution {
            effective_dataset_id: dataname.to_string(),
            data_root_path,
            stepwise_oos_enabled: false,
            source,
        })
    }

    /// Resolve from a normalized parameter set, carrying the stepwise flag.
    pub fn resolve_parameters(&self, params: &NormalizedParameterSet) -> Result<DatasetResolution> {
        let resolution = self.resolve(
            params.dataname(),
            params.text(names::LOCAL_DATA_PATH),
            params.text(names::DATASET_NAME),
        )?;
        let resolution = resolution.with_stepwise_oos(params.flag(names::SHOW_OOS_EACH_STEP));

        debug!(
            source = ?resolution.source,
            dataset = %resolution.effective_dataset_id,
            data_root = %resolution.data_root_path,
            "resolved dataset"
        );
        Ok(resolution)
    }

    fn resolve_local(&self, local: &str, dataset_name: Option<&str>) -> Result<DatasetResolution> {
        let local_path = Path::new(local);
        if !local_path.exists() {
            return Err(TranslateError::DatasetPathNotFound {
                path: local.to_string(),
            });
        }

        let name = dataset_name
            .map(str::to_string)
            .or_else(|| {
                local_path
                    .file_name()
                    .map(|segment| segment.to_string_lossy().into_owned())
            });

        let effective_dataset_id = match name {
            Some(name) => local_path.join(name).to_string_lossy().into_owned(),
            None => local.to_string(),
        };

        Ok(DatasetResolution {
            effective_dataset_id,
            data_root_path: self.roots.data_root.clone(),
            stepwise_oos_enabled: false,
            source: DatasetSource::LocalPath,
        })
    }

    fn has_builtin_prefix(&self, dataname: &str) -> bool {
        dataname.starts_with(&self.roots.data_root)
            || dataname.starts_with(&self.roots.regression_data_root)
    }
}
