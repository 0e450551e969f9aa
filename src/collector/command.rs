// src/collector/command.rs
//! Execution of external diagnostic tools.

use crate::error::{ProbeError, ProbeResult};
use async_trait::async_trait;
use std::collections::HashMap;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// What a finished tool left behind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    /// Exit code, `None` when killed by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

/// Runs external tools.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `program` to completion. Only spawn failures and timeouts are
    /// errors here; the exit status is left to the caller.
    async fn execute(&self, program: &str, args: &[&str]) -> ProbeResult<ToolOutput>;

    /// Run `program` and return stdout, treating any non-zero exit as failure.
    async fn run(&self, program: &str, args: &[&str]) -> ProbeResult<String> {
        self.run_accepting(program, args, |code| code == 0).await
    }

    /// Run `program` and return stdout when `accept` approves the exit code.
    /// Tools such as smartctl report findings through status bits while
    /// still printing usable output.
    async fn run_accepting(&self, program: &str, args: &[&str], accept: fn(i32) -> bool) -> ProbeResult<String> {
        let output = self.execute(program, args).await?;

        match output.code {
            Some(code) if accept(code) => Ok(output.stdout),
            code => Err(ProbeError::NonZeroExit {
                program: program.to_string(),
                code,
                stderr: output.stderr.trim().to_string(),
            }),
        }
    }
}

/// Runner backed by real child processes, each bounded by a timeout.
#[derive(Debug, Clone)]
pub struct SystemRunner {
    timeout: Duration,
}

impl SystemRunner {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn execute(&self, program: &str, args: &[&str]) -> ProbeResult<ToolOutput> {
        debug!(program, ?args, "running tool");

        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(Ok(output)) => Ok(ToolOutput {
                code: output.status.code(),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            }),
            Ok(Err(source)) => Err(ProbeError::Spawn {
                program: program.to_string(),
                source,
            }),
            // The child is killed when the dropped future releases it.
            Err(_elapsed) => Err(ProbeError::Timeout {
                program: program.to_string(),
                secs: self.timeout.as_secs(),
            }),
        }
    }
}

/// Runner that replays recorded tool output, keyed by the full command line
/// (`"iostat -x 1 1"`). Commands without a recording fail as if the tool
/// exited with status 1.
#[derive(Debug, Default, Clone)]
pub struct CannedRunner {
    outputs: HashMap<String, (i32, String)>,
}

impl CannedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the output of a successful run.
    pub fn with(self, command_line: &str, stdout: &str) -> Self {
        self.with_status(command_line, 0, stdout)
    }

    /// Register the output of a run ending with exit `code`.
    pub fn with_status(mut self, command_line: &str, code: i32, stdout: &str) -> Self {
        self.outputs
            .insert(command_line.to_string(), (code, stdout.to_string()));
        self
    }
}

#[async_trait]
impl CommandRunner for CannedRunner {
    async fn execute(&self, program: &str, args: &[&str]) -> ProbeResult<ToolOutput> {
        let mut line = program.to_string();
        for arg in args {
            line.push(' ');
            line.push_str(arg);
        }

        Ok(match self.outputs.get(&line) {
            Some((code, stdout)) => ToolOutput {
                code: Some(*code),
                stdout: stdout.clone(),
                stderr: String::new(),
            },
            None => ToolOutput {
                code: Some(1),
                stdout: String::new(),
                stderr: format!("no recording for `{line}`"),
            },
        })
    }
}
