//! MultiBoost fit execution
//!
//! Launches the fit script for a translated invocation, captures its output
//! and enforces a wall-clock limit. Also owns the per-request parameter file.

pub mod artifact;
pub mod errors;
pub mod runner;

pub use artifact::ParamsArtifact;
pub use errors::ExecutorError;
pub use runner::{ExecutionOutcome, ExecutorConfig, FitExecutor, PARAMS_FILE_VAR};
