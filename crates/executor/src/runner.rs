//! Fit script execution

use std::io;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};

use multiboost_protocol::{FitVariant, InvocationDescriptor};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::errors::{ExecutorError, Result};

pub const DEFAULT_INTERPRETER: &str = "/bin/bash";
pub const DEFAULT_REGRESSION_SCRIPT: &str =
    "/opt/multiboost/scripts/incremental_regression_fit.sh";
pub const DEFAULT_CLASSIFICATION_SCRIPT: &str =
    "/opt/multiboost/scripts/incremental_classifier_fit.sh";
pub const DEFAULT_WORKING_DIR: &str = "/opt/multiboost";
pub const DEFAULT_TIMEOUT_SECS: u64 = 3600;

/// Environment variable naming the per-request parameter file.
pub const PARAMS_FILE_VAR: &str = "IB_PARAMS_FILE";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutorConfig {
    /// Program that runs the script. `None` executes the script directly.
    pub interpreter: Option<String>,
    pub regression_script: PathBuf,
    pub classification_script: PathBuf,
    pub working_dir: PathBuf,
    pub timeout: Duration,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            interpreter: Some(DEFAULT_INTERPRETER.to_string()),
            regression_script: PathBuf::from(DEFAULT_REGRESSION_SCRIPT),
            classification_script: PathBuf::from(DEFAULT_CLASSIFICATION_SCRIPT),
            working_dir: PathBuf::from(DEFAULT_WORKING_DIR),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl ExecutorConfig {
    pub fn script_for(&self, variant: FitVariant) -> &Path {
        match variant {
            FitVariant::Regression => &self.regression_script,
            FitVariant::Classification => &self.classification_script,
        }
    }
}

/// Result of a run that completed, whatever its exit code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionOutcome {
    pub success: bool,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub command: String,
}

#[derive(Debug, Clone, Default)]
pub struct FitExecutor {
    config: ExecutorConfig,
}

impl FitExecutor {
    pub fn new(config: ExecutorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Program followed by its arguments, as it will be spawned.
    pub fn command_line(&self, variant: FitVariant, invocation: &InvocationDescriptor) -> Vec<String> {
        let mut line = Vec::with_capacity(invocation.argument_vector.len() + 2);
        if let Some(interpreter) = &self.config.interpreter {
            line.push(interpreter.clone());
        }
        line.push(self.config.script_for(variant).to_string_lossy().into_owned());
        line.extend(invocation.argument_vector.iter().cloned());
        line
    }

    pub async fn run(
        &self,
        variant: FitVariant,
        invocation: &InvocationDescriptor,
        artifact: Option<&Path>,
    ) -> Result<ExecutionOutcome> {
        let line = self.command_line(variant, invocation);
        let (program, args) = line
            .split_first()
            .ok_or_else(|| ExecutorError::Internal("empty command line".into()))?;
        let command = line.join(" ");

        let mut cmd = Command::new(program);
        cmd.args(args)
            .env_clear()
            .envs(&invocation.environment)
            .current_dir(&self.config.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(path) = artifact {
            cmd.env(PARAMS_FILE_VAR, path);
        }

        #[cfg(unix)]
        cmd.process_group(0);

        let started = Instant::now();
        let mut child = cmd.spawn().map_err(|source| ExecutorError::Launch {
            program: program.clone(),
            source,
        })?;
        let pid = child.id();
        info!(%variant, ?pid, command = %command, "launched fit script");

        // Drained concurrently so a full pipe never stalls the script.
        let stdout_task = tokio::spawn(read_stream(child.stdout.take()));
        let stderr_task = tokio::spawn(read_stream(child.stderr.take()));

        let limit = self.config.timeout;
        let status = match tokio::time::timeout(limit, child.wait()).await {
            Ok(result) => result.map_err(|e| ExecutorError::Internal(format!("wait failed: {e}")))?,
            Err(_) => {
                terminate_group(pid);
                if let Err(err) = child.kill().await {
                    debug!(%variant, "fit script already gone after group kill: {}", err);
                }
                stdout_task.abort();
                stderr_task.abort();
                warn!(%variant, timeout_secs = limit.as_secs(), "fit script timed out");
                return Err(ExecutorError::ExecutionTimeout { limit });
            }
        };

        // Anything the script left running would hold the output pipes open.
        terminate_group(pid);
        let output = CapturedOutput {
            status,
            stdout: join_stream(stdout_task).await?,
            stderr: join_stream(stderr_task).await?,
        };

        let exit_code = exit_code(output.status);
        info!(
            %variant,
            exit_code,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "fit script finished"
        );

        Ok(ExecutionOutcome {
            success: exit_code == 0,
            exit_code,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            command,
        })
    }
}

struct CapturedOutput {
    status: ExitStatus,
    stdout: Vec<u8>,
    stderr: Vec<u8>,
}

async fn read_stream<R: AsyncRead + Unpin>(stream: Option<R>) -> io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    if let Some(mut stream) = stream {
        stream.read_to_end(&mut buf).await?;
    }
    Ok(buf)
}

async fn join_stream(task: JoinHandle<io::Result<Vec<u8>>>) -> Result<Vec<u8>> {
    task.await
        .map_err(|e| ExecutorError::Internal(format!("output reader failed: {e}")))?
        .map_err(|e| ExecutorError::Internal(format!("failed to read output: {e}")))
}

/// SIGKILL the process group led by `pid`, reaching every descendant the
/// script spawned.
#[cfg(unix)]
fn terminate_group(pid: Option<u32>) {
    let Some(pgid) = pid.and_then(|pid| libc::pid_t::try_from(pid).ok()) else {
        return;
    };
    // SAFETY: killpg takes plain integers and touches no memory; ESRCH just
    // means the group has already emptied.
    unsafe {
        libc::killpg(pgid, libc::SIGKILL);
    }
}

#[cfg(not(unix))]
fn terminate_group(_pid: Option<u32>) {}

#[cfg(unix)]
fn exit_code(status: ExitStatus) -> i32 {
    use std::os::unix::process::ExitStatusExt;
    status
        .code()
        .or_else(|| status.signal().map(|signal| -signal))
        .unwrap_or(-1)
}

#[cfg(not(unix))]
fn exit_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(-1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use multiboost_protocol::EnvironmentMap;

    fn invocation(args: &[&str]) -> InvocationDescriptor {
        InvocationDescriptor {
            argument_vector: args.iter().map(|a| a.to_string()).collect(),
            environment: EnvironmentMap::new(),
        }
    }

    #[test]
    fn test_command_line_with_interpreter() {
        let executor = FitExecutor::default();
        let line = executor.command_line(FitVariant::Classification, &invocation(&["1", "250"]));
        assert_eq!(
            line,
            vec![
                DEFAULT_INTERPRETER.to_string(),
                DEFAULT_CLASSIFICATION_SCRIPT.to_string(),
                "1".to_string(),
                "250".to_string(),
            ]
        );
    }

    #[test]
    fn test_command_line_without_interpreter() {
        let executor = FitExecutor::new(ExecutorConfig {
            interpreter: None,
            ..ExecutorConfig::default()
        });
        let line = executor.command_line(FitVariant::Regression, &invocation(&["2"]));
        assert_eq!(line, vec![DEFAULT_REGRESSION_SCRIPT.to_string(), "2".to_string()]);
    }

    #[tokio::test]
    async fn test_missing_interpreter_is_launch_error() {
        let executor = FitExecutor::new(ExecutorConfig {
            interpreter: Some("/definitely/not/a/shell".into()),
            working_dir: std::env::temp_dir(),
            ..ExecutorConfig::default()
        });
        let err = executor
            .run(FitVariant::Regression, &invocation(&[]), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ExecutorError::Launch { .. }));
    }
}
