use std::process::Stdio;
use std::time::Duration;

use crate::domain::ports::probe::ProbeError;

/// Captured output of a finished command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// Stdout of a successful command.
    ///
    /// # Errors
    ///
    /// Returns `ProbeError::CommandFailed` with the exit status and stderr
    /// when the command did not succeed.
    pub fn into_stdout(self, program: &str) -> Result<String, ProbeError> {
        if self.success {
            Ok(self.stdout)
        } else {
            Err(ProbeError::CommandFailed(format!(
                "{program} exited with {}: {}",
                self.code.map_or_else(|| "signal".to_string(), |c| c.to_string()),
                self.stderr.trim()
            )))
        }
    }
}

/// Runs a read-only command with a C locale and a timeout.
///
/// The child is killed when the returned future is dropped, so a probe
/// cancelled by the registry never leaves the process behind.
///
/// # Errors
///
/// Returns `ProbeError::ToolMissing` if the program does not exist,
/// `ProbeError::PermissionDenied` if it cannot be executed,
/// `ProbeError::Timeout` if it does not finish in time.
pub async fn run_command(
    program: &str,
    args: &[&str],
    timeout: Duration,
) -> Result<CommandOutput, ProbeError> {
    tracing::debug!("Running {program} {}", args.join(" "));
    let child = tokio::process::Command::new(program)
        .args(args)
        .env("LC_ALL", "C")
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output();

    match tokio::time::timeout(timeout, child).await {
        Ok(Ok(output)) => Ok(CommandOutput {
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }),
        Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(ProbeError::ToolMissing(program.to_string()))
        }
        Ok(Err(e)) => Err(ProbeError::from(e)),
        Err(_) => Err(ProbeError::Timeout(timeout)),
    }
}
