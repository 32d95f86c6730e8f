//! Command runner for external process execution.
//!
//! Every run is bounded: the child is raced against a timeout and a
//! cancellation token, and is killed when either fires (or when the
//! future is dropped).

use std::ffi::OsString;
use std::process::Stdio;
use std::time::Duration;

use thiserror::Error;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

/// Low-level outcome of an external tool run that did not succeed.
#[derive(Error, Debug)]
pub enum ToolError {
    /// The executable could not be started.
    #[error("failed to run {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    /// The tool ran but reported failure.
    #[error("{tool} failed with exit code {exit_code}: {message}")]
    Failed {
        tool: String,
        exit_code: i32,
        message: String,
    },

    /// The tool exceeded its time budget and was killed.
    #[error("{tool} timed out after {}s", .timeout.as_secs())]
    TimedOut { tool: String, timeout: Duration },

    /// The run was cancelled and the tool was killed.
    #[error("{tool} was cancelled")]
    Cancelled { tool: String },
}

impl ToolError {
    /// Create a failed-run error.
    pub fn failed(tool: impl Into<String>, exit_code: i32, message: impl Into<String>) -> Self {
        Self::Failed {
            tool: tool.into(),
            exit_code,
            message: message.into(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ToolError::Cancelled { .. })
    }
}

/// Captured output of a successful run.
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Runs one external program with a timeout.
#[derive(Debug, Clone)]
pub struct CommandRunner {
    program: OsString,
    timeout: Duration,
}

impl CommandRunner {
    pub fn new(program: impl Into<OsString>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    /// Program name for messages.
    pub fn tool_name(&self) -> String {
        self.program.to_string_lossy().to_string()
    }

    /// Run with the given arguments and wait for completion.
    ///
    /// Returns the captured output on exit code 0; any other exit code,
    /// timeout or cancellation is an error.
    pub async fn run<I, S>(&self, args: I, cancel: &CancellationToken) -> Result<CommandOutput, ToolError>
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        let tool = self.tool_name();

        let mut cmd = Command::new(&self.program);
        cmd.args(args.into_iter().map(Into::into))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        tracing::debug!("Running {}: {:?}", tool, cmd.as_std());

        let child = cmd.spawn().map_err(|source| ToolError::Spawn {
            tool: tool.clone(),
            source,
        })?;

        // Dropping the wait future drops the child, which kills it
        let output = tokio::select! {
            result = child.wait_with_output() => result.map_err(|source| ToolError::Spawn {
                tool: tool.clone(),
                source,
            })?,
            _ = tokio::time::sleep(self.timeout) => {
                tracing::warn!("{} exceeded {:?}, killed", tool, self.timeout);
                return Err(ToolError::TimedOut { tool, timeout: self.timeout });
            }
            _ = cancel.cancelled() => {
                tracing::debug!("{} cancelled", tool);
                return Err(ToolError::Cancelled { tool });
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        if !output.status.success() {
            let exit_code = output.status.code().unwrap_or(-1);
            let message = if stderr.trim().is_empty() {
                "no error output".to_string()
            } else {
                stderr.trim().to_string()
            };
            return Err(ToolError::failed(tool, exit_code, message));
        }

        Ok(CommandOutput { stdout, stderr })
    }
}
