//! Listing of datasets available under the configured data roots

use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;

const FEATURES_SUFFIX: &str = "_X.csv";
const LABELS_SUFFIX: &str = "_y.csv";
const TRAIN_FEATURES_SUFFIX: &str = "_train_X.csv";

/// Minimum number of the four train/test files a regression dataset needs.
const MIN_REGRESSION_FILES: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatasetEntry {
    pub name: String,
    pub path: String,
    pub files: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct DatasetCatalog {
    data_root: PathBuf,
    regression_data_root: PathBuf,
}

impl DatasetCatalog {
    pub fn new<P: Into<PathBuf>, Q: Into<PathBuf>>(data_root: P, regression_data_root: Q) -> Self {
        Self {
            data_root: data_root.into(),
            regression_data_root: regression_data_root.into(),
        }
    }

    /// Datasets in the generic root first, then the regression root. A root
    /// that does not exist contributes nothing.
    pub fn list(&self) -> io::Result<Vec<DatasetEntry>> {
        let mut datasets = self.list_paired(&self.data_root)?;
        datasets.extend(self.list_regression(&self.regression_data_root)?);
        Ok(datasets)
    }

    fn list_paired(&self, root: &Path) -> io::Result<Vec<DatasetEntry>> {
        let mut entries = Vec::new();
        for file_name in file_names(root)? {
            let Some(stem) = file_name.strip_suffix(FEATURES_SUFFIX) else {
                continue;
            };
            let labels = format!("{stem}{LABELS_SUFFIX}");
            if stem.is_empty() || !root.join(&labels).is_file() {
                continue;
            }
            entries.push(DatasetEntry {
                name: stem.to_string(),
                path: root.to_string_lossy().into_owned(),
                files: vec![file_name.clone(), labels],
            });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    fn list_regression(&self, root: &Path) -> io::Result<Vec<DatasetEntry>> {
        let mut entries = Vec::new();
        for file_name in file_names(root)? {
            let Some(base) = file_name.strip_suffix(TRAIN_FEATURES_SUFFIX) else {
                continue;
            };
            let files: Vec<String> = ["train_X", "train_y", "test_X", "test_y"]
                .iter()
                .map(|part| format!("{base}_{part}.csv"))
                .filter(|candidate| root.join(candidate).is_file())
                .collect();
            if files.len() < MIN_REGRESSION_FILES {
                continue;
            }
            entries.push(DatasetEntry {
                name: format!("{base}_train"),
                path: root.to_string_lossy().into_owned(),
                files,
            });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }
}

fn file_names(root: &Path) -> io::Result<Vec<String>> {
    if !root.is_dir() {
        return Ok(Vec::new());
    }
    let mut names = Vec::new();
    for entry in std::fs::read_dir(root)? {
        let entry = entry?;
        if entry.file_type()?.is_file() {
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
    }
    Ok(names)
}
