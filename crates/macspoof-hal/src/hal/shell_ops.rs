//! Privileged shell operations.
//!
//! A shell session is a long-lived interpreter that receives newline-terminated command lines.
//! Implementations must hand out `&mut self` access only, so a session never has more than
//! one command in flight.

use crate::{HalError, HalResult};
use std::time::Duration;

/// Output of a command run through a shell session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShellReply {
    /// Everything the command wrote to stdout, without the end marker.
    pub stdout: String,
    /// Everything the command wrote to stderr.
    pub stderr: String,
    /// Exit status of the command as reported by the shell (`$?`).
    pub exit_code: i32,
}

impl ShellReply {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Diagnostic text for a failed command: stderr, or stdout when stderr is empty.
    pub fn diagnostic(&self) -> &str {
        match self.stderr.trim() {
            "" => self.stdout.trim(),
            stderr => stderr,
        }
    }

    fn into_result(self, command: &str) -> HalResult<Self> {
        if !self.success() {
            return Err(HalError::CommandFailed {
                program: command.to_string(),
                code: Some(self.exit_code),
                stderr: self.diagnostic().to_string(),
            });
        }
        Ok(self)
    }
}

/// Shell session trait (privileged command interpreter).
pub trait ShellOps {
    /// Run a command and wait (bounded by `timeout`) for its output and exit status.
    fn run(&mut self, command: &str, timeout: Duration) -> HalResult<ShellReply>;

    /// Terminate the interpreter. Further calls fail with `SessionUnavailable`.
    fn close(&mut self) -> HalResult<()>;

    /// Run a command and fail unless it exits with status 0.
    fn execute(&mut self, command: &str, timeout: Duration) -> HalResult<()> {
        self.run(command, timeout)?.into_result(command)?;
        Ok(())
    }

    /// Run a command that must succeed and return its stdout.
    fn query(&mut self, command: &str, timeout: Duration) -> HalResult<String> {
        Ok(self.run(command, timeout)?.into_result(command)?.stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reply(stdout: &str, stderr: &str, exit_code: i32) -> ShellReply {
        ShellReply {
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
            exit_code,
        }
    }

    #[test]
    fn diagnostic_prefers_stderr() {
        assert_eq!(reply("out\n", " err\n", 1).diagnostic(), "err");
        assert_eq!(reply("out\n", "", 1).diagnostic(), "out");
    }

    #[test]
    fn failed_reply_carries_diagnostic() {
        let err = reply("", "cp: can't stat '/x': No such file or directory", 1)
            .into_result("cp /x /y")
            .unwrap_err();
        match err {
            HalError::CommandFailed {
                program,
                code,
                stderr,
            } => {
                assert_eq!(program, "cp /x /y");
                assert_eq!(code, Some(1));
                assert!(stderr.contains("No such file"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
