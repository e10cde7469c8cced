//! External command execution with log capture
//!
//! Both pipelines are sequences of external tool invocations (python, git,
//! fpm, unzip, ssh, rsync). This module runs them while forwarding their
//! output through tracing, and enforces the fail-fast policy: any non-zero
//! exit aborts the pipeline.

use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;

use crate::{Error, Result};

/// Run a command, streaming its stdout and stderr into tracing.
///
/// Each stdout line is logged at debug level and each stderr line at warn
/// level, so tool output stays visible under `-v` without drowning the
/// normal progress messages.
pub async fn run_logged(command: &mut Command, operation: &str) -> Result<()> {
    command.stdout(Stdio::piped()).stderr(Stdio::piped());

    tracing::debug!("Running command: {:?}", command);

    let mut child = command.spawn().map_err(|e| {
        Error::command(
            format!("{} failed to start", operation),
            e.to_string(),
        )
    })?;

    let stdout = child.stdout.take().expect("Failed to capture stdout");
    let stderr = child.stderr.take().expect("Failed to capture stderr");

    let operation_stdout = operation.to_string();
    let stdout_handle = tokio::spawn(async move {
        let reader = BufReader::new(stdout);
        let mut lines = reader.lines();
        while let Ok(Some(line)) = lines.next_line().await {
            tracing::debug!(target: "tool_output", operation = %operation_stdout, "{}", line);
        }
    });

    let operation_stderr = operation.to_string();
    let stderr_handle = tokio::spawn(async move {
        let reader = BufReader::new(stderr);
        let mut lines = reader.lines();
        while let Ok(Some(line)) = lines.next_line().await {
            tracing::warn!(target: "tool_output", operation = %operation_stderr, "{}", line);
        }
    });

    let status = child.wait().await.map_err(|e| {
        Error::command(format!("{} failed", operation), e.to_string())
    })?;

    let _ = stdout_handle.await;
    let _ = stderr_handle.await;

    if !status.success() {
        return Err(Error::command(
            format!(
                "{} failed with exit code: {:?}",
                operation,
                status.code()
            ),
            "Check the tool output for errors",
        ));
    }

    Ok(())
}

/// Run a command and capture its trimmed stdout.
///
/// Used for query-style invocations (git rev-parse, setup.py --name). A
/// non-zero exit is an error carrying the captured stderr as help text.
pub async fn run_capture(command: &mut Command, operation: &str) -> Result<String> {
    tracing::debug!("Running command: {:?}", command);

    let output = command.output().await.map_err(|e| {
        Error::command(
            format!("{} failed to start", operation),
            e.to_string(),
        )
    })?;

    if !output.status.success() {
        return Err(Error::command(
            format!(
                "{} failed with exit code: {:?}",
                operation,
                output.status.code()
            ),
            String::from_utf8_lossy(&output.stderr).trim().to_string(),
        ));
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_capture_trims_output() {
        let mut cmd = Command::new("echo");
        cmd.arg("hello");

        let out = run_capture(&mut cmd, "echo").await.unwrap();
        assert_eq!(out, "hello");
    }

    #[tokio::test]
    async fn test_run_capture_nonzero_exit_is_error() {
        let mut cmd = Command::new("false");

        let err = run_capture(&mut cmd, "false").await.unwrap_err();
        assert!(matches!(err, Error::Command { .. }));
    }

    #[tokio::test]
    async fn test_run_logged_missing_binary_is_error() {
        let mut cmd = Command::new("venvdeb-no-such-binary");

        let err = run_logged(&mut cmd, "missing tool").await.unwrap_err();
        assert!(matches!(err, Error::Command { .. }));
    }

    #[tokio::test]
    async fn test_run_logged_success() {
        let mut cmd = Command::new("true");

        run_logged(&mut cmd, "true").await.unwrap();
    }
}
