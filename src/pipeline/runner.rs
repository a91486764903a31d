//! External process execution for pipeline stages.

use std::process::Stdio;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::process::Command;
use tokio::time::timeout;

/// What a finished process left behind
#[derive(Debug, Clone, Default)]
pub struct ProcessOutput {
    /// `None` when the process was terminated by a signal
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Runs one external program to completion.
///
/// An `Err` means the process could not be started or did not finish in
/// time; a process that ran and exited non-zero is an `Ok` output.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    async fn run(&self, program: &str, args: &[String], limit: Duration) -> Result<ProcessOutput>;
}

/// Spawns real processes on the tokio runtime
#[derive(Debug, Default, Clone)]
pub struct TokioProcessRunner;

#[async_trait]
impl ProcessRunner for TokioProcessRunner {
    async fn run(&self, program: &str, args: &[String], limit: Duration) -> Result<ProcessOutput> {
        let mut command = Command::new(program);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        // Own group, so a timeout also reaches helpers the tool forked (ffmpeg).
        #[cfg(unix)]
        command.process_group(0);

        let child = command
            .spawn()
            .with_context(|| format!("Failed to start '{}'", program))?;
        let pid = child.id();

        let output = match timeout(limit, child.wait_with_output()).await {
            Ok(output) => output.with_context(|| format!("Failed to wait for '{}'", program))?,
            Err(_) => {
                if let Some(pid) = pid {
                    kill_process_group(pid);
                }
                anyhow::bail!("'{}' timed out after {:?}", program, limit);
            }
        };

        Ok(ProcessOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

#[cfg(unix)]
fn kill_process_group(pid: u32) {
    use nix::errno::Errno;
    use nix::sys::signal::{Signal, killpg};
    use nix::unistd::Pid;

    let Ok(pgid) = i32::try_from(pid) else {
        return;
    };
    match killpg(Pid::from_raw(pgid), Signal::SIGKILL) {
        Ok(()) | Err(Errno::ESRCH) => {}
        Err(e) => tracing::warn!("Failed to kill process group {}: {}", pgid, e),
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: u32) {}

#[cfg(test)]
mod tests {
    use super::*;

    fn sh(script: &str) -> Vec<String> {
        vec!["-c".to_string(), script.to_string()]
    }

    #[tokio::test]
    async fn test_captures_output_and_exit_code() {
        let output = TokioProcessRunner
            .run("sh", &sh("echo hello; echo oops >&2; exit 3"), Duration::from_secs(10))
            .await
            .unwrap();

        assert!(!output.success());
        assert_eq!(output.exit_code, Some(3));
        assert_eq!(output.stdout.trim(), "hello");
        assert_eq!(output.stderr.trim(), "oops");
    }

    #[tokio::test]
    async fn test_success() {
        let output = TokioProcessRunner
            .run("sh", &sh("exit 0"), Duration::from_secs(10))
            .await
            .unwrap();
        assert!(output.success());
    }

    #[tokio::test]
    async fn test_missing_program_fails_to_start() {
        let err = TokioProcessRunner
            .run("definitely-not-a-real-binary-ytm", &[], Duration::from_secs(10))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Failed to start"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout_kills_forked_helpers() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("late-write");
        let script = format!("(sleep 0.5; touch '{}') & wait", marker.display());

        let err = TokioProcessRunner
            .run("sh", &sh(&script), Duration::from_millis(100))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("timed out"));

        tokio::time::sleep(Duration::from_millis(800)).await;
        assert!(!marker.exists());
    }

    #[tokio::test]
    async fn test_timeout() {
        let err = TokioProcessRunner
            .run("sh", &sh("sleep 5"), Duration::from_millis(100))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }
}
