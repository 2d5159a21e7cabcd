//! Subprocess execution for the Bluetooth tools
//!
//! [`CommandRunner`] is the seam between the Bluetooth service and the OS:
//! production uses [`SystemRunner`], tests inject canned output.

use async_trait::async_trait;
use futures::stream::Stream;
use lmp_common::{Error, Result};
use std::pin::Pin;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, warn};

/// Lines of a running process's stdout
///
/// Dropping the stream kills the process.
pub type LineStream = Pin<Box<dyn Stream<Item = String> + Send>>;

/// Captured result of a finished command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// stdout followed by stderr
    pub fn combined(&self) -> String {
        if self.stderr.is_empty() {
            self.stdout.clone()
        } else {
            format!("{}\n{}", self.stdout, self.stderr)
        }
    }
}

#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run to completion and capture output
    async fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput>;

    /// Start a long-running command and stream its stdout line by line
    async fn spawn_lines(&self, program: &str, args: &[&str]) -> Result<LineStream>;
}

/// Runs real processes via `tokio::process`
#[derive(Debug, Clone)]
pub struct SystemRunner {
    timeout: Duration,
}

impl SystemRunner {
    /// `timeout` bounds [`CommandRunner::run`]; pairing can take a while
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for SystemRunner {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}

fn spawn_error(program: &str, e: std::io::Error) -> Error {
    if e.kind() == std::io::ErrorKind::NotFound {
        Error::Command(format!("{} not found", program))
    } else {
        Error::Command(format!("Failed to run {}: {}", program, e))
    }
}

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput> {
        debug!("Running {} {}", program, args.join(" "));

        let child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output();

        let output = tokio::time::timeout(self.timeout, child)
            .await
            .map_err(|_| {
                Error::Command(format!(
                    "{} {} timed out after {}s",
                    program,
                    args.join(" "),
                    self.timeout.as_secs()
                ))
            })?
            .map_err(|e| spawn_error(program, e))?;

        Ok(CommandOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }

    async fn spawn_lines(&self, program: &str, args: &[&str]) -> Result<LineStream> {
        debug!("Spawning {} {}", program, args.join(" "));

        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| spawn_error(program, e))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::Internal(format!("{} has no stdout", program)))?;
        let program = program.to_string();

        let stream = async_stream::stream! {
            let mut lines = BufReader::new(stdout).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => yield line,
                    Ok(None) => break,
                    Err(e) => {
                        warn!("Error reading {} output: {}", program, e);
                        break;
                    }
                }
            }
            match child.wait().await {
                Ok(status) => debug!("{} exited with {}", program, status),
                Err(e) => warn!("Failed to reap {}: {}", program, e),
            }
        };

        Ok(Box::pin(stream))
    }
}
