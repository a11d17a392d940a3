//! Subprocess execution boundary.
//!
//! Component `execute` bodies call external commands (`svn`, `rake`, ...)
//! through this seam; a non-zero exit is the component's own error to
//! interpret, never a core-level failure.

use std::process::Command;

use anyhow::Context;

/// Result of one synchronous command invocation.
#[derive(Debug, Clone)]
pub struct ExecOutput {
    pub exit_code: i32,
    /// Combined stdout + stderr, in that order.
    pub output: String,
}

impl ExecOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// External command runner.
pub trait CommandRunner: Send + Sync {
    /// Run a command line to completion and capture its combined output.
    fn run(&self, command_line: &str) -> anyhow::Result<ExecOutput>;
}

/// Runner backed by the system shell.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, command_line: &str) -> anyhow::Result<ExecOutput> {
        let output = Command::new("sh")
            .arg("-c")
            .arg(command_line)
            .output()
            .with_context(|| format!("Failed to spawn command: {command_line}"))?;

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));

        Ok(ExecOutput {
            exit_code: output.status.code().unwrap_or(-1),
            output: combined,
        })
    }
}
