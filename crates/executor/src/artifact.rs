//! Per-request parameter file
//!
//! The raw request is written before translation so it can be inspected when
//! translation fails; a successful translation replaces it with the
//! normalized set. The file is removed when the artifact is dropped.

use std::fs::File;
use std::io::{self, Seek, SeekFrom, Write};
use std::path::Path;

use serde_json::Value;
use tempfile::{Builder, NamedTempFile};

use crate::errors::{ExecutorError, Result};

const ARTIFACT_PREFIX: &str = "multiboost-params-";

#[derive(Debug)]
pub struct ParamsArtifact {
    file: NamedTempFile,
}

impl ParamsArtifact {
    /// Create in the system temp directory.
    pub fn create(contents: &Value) -> Result<Self> {
        Self::create_in(std::env::temp_dir(), contents)
    }

    pub fn create_in<P: AsRef<Path>>(dir: P, contents: &Value) -> Result<Self> {
        let file = Builder::new()
            .prefix(ARTIFACT_PREFIX)
            .suffix(".json")
            .tempfile_in(dir)
            .map_err(|e| ExecutorError::Artifact(format!("create failed: {e}")))?;
        let mut artifact = Self { file };
        artifact.write_all(contents)?;
        Ok(artifact)
    }

    /// Replace the contents in place; the path stays the same.
    pub fn overwrite(&mut self, contents: &Value) -> Result<()> {
        self.write_all(contents)
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    fn write_all(&mut self, contents: &Value) -> Result<()> {
        let body = serde_json::to_vec_pretty(contents)?;
        rewrite(self.file.as_file_mut(), &body)
            .map_err(|e| ExecutorError::Artifact(format!("write failed: {e}")))
    }
}

fn rewrite(file: &mut File, body: &[u8]) -> io::Result<()> {
    file.set_len(0)?;
    file.seek(SeekFrom::Start(0))?;
    file.write_all(body)?;
    file.flush()
}
