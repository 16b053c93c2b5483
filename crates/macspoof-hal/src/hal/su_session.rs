//! Long-lived privileged shell session.
//!
//! Commands are written to the interpreter's stdin one line at a time. Every `run` is followed
//! by end markers on stdout and stderr carrying a per-command id (and, on stdout, the command's
//! `$?`), so replies are delimited explicitly instead of being inferred from read sizes.

use super::{ShellOps, ShellReply};
use crate::{HalError, HalResult};
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::process::{Child, ChildStdin, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::time::{Duration, Instant};
use wait_timeout::ChildExt;

const OUT_MARKER: &str = "__MACSPOOF_END__";
const ERR_MARKER: &str = "__MACSPOOF_ERR_END__";
const EXIT_GRACE: Duration = Duration::from_secs(5);
const TERM_GRACE: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stream {
    Stdout,
    Stderr,
}

type StreamLine = (Stream, io::Result<String>);

/// An open privileged command interpreter (`su` on a rooted device).
///
/// The session owns the child process. It is terminated by [`ShellOps::close`] or, failing
/// that, when the session is dropped.
#[derive(Debug)]
pub struct SuSession {
    program: String,
    child: Child,
    stdin: Option<ChildStdin>,
    lines: mpsc::Receiver<StreamLine>,
    next_id: u64,
}

fn unavailable(program: &str, reason: impl Into<String>) -> HalError {
    HalError::SessionUnavailable {
        program: program.to_string(),
        reason: reason.into(),
    }
}

/// Parse `<marker>:<id>:<status>` into the stream it closes, the id and the status.
fn parse_marker(line: &str) -> Option<(Stream, u64, i32)> {
    let line = line.trim_end();
    let (stream, rest) = if let Some(rest) = line.strip_prefix(OUT_MARKER) {
        (Stream::Stdout, rest)
    } else {
        (Stream::Stderr, line.strip_prefix(ERR_MARKER)?)
    };
    let (id, code) = rest.strip_prefix(':')?.split_once(':')?;
    Some((stream, id.parse().ok()?, code.parse().ok()?))
}

/// Shell line that ends the reply of command `id` on both streams.
fn marker_command(id: u64) -> String {
    // The leading newlines keep each marker on its own line even when the command's output
    // does not end with one. `$?` must be expanded by the first printf.
    format!(
        "printf '\\n%s:%s:%s\\n' {out} {id} \"$?\"; printf '\\n%s:%s:0\\n' {err} {id} >&2",
        out = OUT_MARKER,
        err = ERR_MARKER,
        id = id
    )
}

fn forward<R: Read + Send + 'static>(stream: Stream, reader: R, tx: Sender<StreamLine>) {
    std::thread::spawn(move || {
        for line in BufReader::new(reader).lines() {
            if tx.send((stream, line)).is_err() {
                break;
            }
        }
    });
}

/// Lines of one stream collected for the command in flight.
#[derive(Debug, Default)]
struct Collected {
    lines: Vec<String>,
    status: Option<i32>,
}

impl Collected {
    fn finish(&mut self, status: i32) {
        if self.lines.last().is_some_and(|l| l.is_empty()) {
            self.lines.pop();
        }
        self.status = Some(status);
    }

    fn text(&self) -> String {
        self.lines.join("\n")
    }
}

impl SuSession {
    /// Launch `program` and wait up to `timeout` for it to accept commands.
    ///
    /// On a rooted device the superuser manager may prompt before `su` starts reading, so the
    /// timeout should leave room for a human to answer.
    pub fn acquire(program: &str, timeout: Duration) -> HalResult<Self> {
        let mut child = Command::new(program)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| unavailable(program, e.to_string()))?;

        let (Some(stdin), Some(stdout), Some(stderr)) =
            (child.stdin.take(), child.stdout.take(), child.stderr.take())
        else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(unavailable(program, "interpreter streams not available"));
        };

        let (tx, rx) = mpsc::channel::<StreamLine>();
        forward(Stream::Stdout, stdout, tx.clone());
        forward(Stream::Stderr, stderr, tx);

        let mut session = Self {
            program: program.to_string(),
            child,
            stdin: Some(stdin),
            lines: rx,
            next_id: 0,
        };

        match session.run(":", timeout) {
            Ok(reply) if reply.success() => {
                log::info!("privileged shell ready ({}, pid {})", program, session.id());
                Ok(session)
            }
            Ok(reply) => Err(unavailable(
                program,
                format!("handshake exited with status {}", reply.exit_code),
            )),
            Err(err) => Err(unavailable(program, err.to_string())),
        }
    }

    /// OS process id of the interpreter.
    pub fn id(&self) -> u32 {
        self.child.id()
    }

    pub fn is_open(&self) -> bool {
        self.stdin.is_some()
    }

    fn write_line(&mut self, line: &str) -> HalResult<()> {
        let Some(stdin) = self.stdin.as_mut() else {
            return Err(unavailable(&self.program, "session already closed"));
        };
        let written = (|| -> io::Result<()> {
            stdin.write_all(line.as_bytes())?;
            stdin.write_all(b"\n")?;
            stdin.flush()
        })();
        written.map_err(HalError::CommandWriteFailure)
    }

    fn shutdown(&mut self) -> HalResult<ExitStatus> {
        if let Some(mut stdin) = self.stdin.take() {
            // Best effort: the interpreter may already be gone.
            let _ = stdin.write_all(b"exit\n");
            let _ = stdin.flush();
        }

        if let Some(status) = self.child.wait_timeout(EXIT_GRACE)? {
            return Ok(status);
        }

        log::warn!("{} did not exit; sending SIGTERM", self.program);
        let pid = Pid::from_raw(self.child.id() as i32);
        if let Err(errno) = signal::kill(pid, Signal::SIGTERM) {
            log::debug!("SIGTERM to {} failed: {}", pid, errno);
        }
        if let Some(status) = self.child.wait_timeout(TERM_GRACE)? {
            return Ok(status);
        }

        self.child.kill()?;
        Ok(self.child.wait()?)
    }
}

impl ShellOps for SuSession {
    fn run(&mut self, command: &str, timeout: Duration) -> HalResult<ShellReply> {
        let id = self.next_id;
        self.next_id += 1;

        log::debug!("{}[{}] $ {}", self.program, id, command);
        self.write_line(command)?;
        self.write_line(&marker_command(id))?;

        let deadline = Instant::now() + timeout;
        let mut stdout = Collected::default();
        let mut stderr = Collected::default();
        loop {
            if let (Some(exit_code), Some(_)) = (stdout.status, stderr.status) {
                return Ok(ShellReply {
                    stdout: stdout.text(),
                    stderr: stderr.text(),
                    exit_code,
                });
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(HalError::CommandTimeout {
                    program: command.to_string(),
                    timeout_secs: timeout.as_secs(),
                });
            }

            match self.lines.recv_timeout(remaining) {
                Ok((stream, Ok(line))) => match parse_marker(&line) {
                    Some((closes, marker_id, status)) => {
                        let target = match closes {
                            Stream::Stdout => &mut stdout,
                            Stream::Stderr => &mut stderr,
                        };
                        if marker_id == id {
                            target.finish(status);
                        } else {
                            // Output of an earlier command that timed out.
                            log::debug!("discarding late output of shell command {}", marker_id);
                            target.lines.clear();
                        }
                    }
                    None => match stream {
                        Stream::Stdout => stdout.lines.push(line),
                        Stream::Stderr => {
                            log::debug!("{}[{}] stderr: {}", self.program, id, line);
                            stderr.lines.push(line);
                        }
                    },
                },
                Ok((_, Err(err))) => return Err(HalError::CommandReadFailure(err.to_string())),
                Err(RecvTimeoutError::Timeout) => {
                    return Err(HalError::CommandTimeout {
                        program: command.to_string(),
                        timeout_secs: timeout.as_secs(),
                    });
                }
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(HalError::CommandReadFailure(format!(
                        "{} closed its output streams",
                        self.program
                    )));
                }
            }
        }
    }

    fn close(&mut self) -> HalResult<()> {
        if !self.is_open() {
            return Ok(());
        }
        let status = self.shutdown()?;
        log::info!("privileged shell {} exited ({})", self.program, status);
        Ok(())
    }
}

impl Drop for SuSession {
    fn drop(&mut self) {
        if !self.is_open() {
            return;
        }
        if let Err(err) = self.shutdown() {
            log::warn!("failed to tear down shell session {}: {}", self.program, err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMEOUT: Duration = Duration::from_secs(10);

    fn sh() -> SuSession {
        SuSession::acquire("sh", TIMEOUT).unwrap()
    }

    #[test]
    fn parses_end_markers() {
        assert_eq!(parse_marker("__MACSPOOF_END__:3:0"), Some((Stream::Stdout, 3, 0)));
        assert_eq!(
            parse_marker("__MACSPOOF_END__:12:127\r"),
            Some((Stream::Stdout, 12, 127))
        );
        assert_eq!(
            parse_marker("__MACSPOOF_ERR_END__:12:0"),
            Some((Stream::Stderr, 12, 0))
        );
        assert_eq!(parse_marker("__MACSPOOF_END__:x:0"), None);
        assert_eq!(parse_marker("wlan0: flags=4163"), None);
    }

    #[test]
    fn run_collects_stdout_and_status() {
        let mut shell = sh();
        let reply = shell.run("echo hello", TIMEOUT).unwrap();
        assert_eq!(reply.stdout, "hello");
        assert_eq!(reply.exit_code, 0);

        let reply = shell.run("false", TIMEOUT).unwrap();
        assert_eq!(reply.stdout, "");
        assert_eq!(reply.exit_code, 1);
    }

    #[test]
    fn run_keeps_stderr_apart_from_stdout() {
        let mut shell = sh();
        let reply = shell.run("echo out; echo err >&2", TIMEOUT).unwrap();
        assert_eq!(reply.stdout, "out");
        assert_eq!(reply.stderr, "err");

        let reply = shell.run("printf 'partial' >&2", TIMEOUT).unwrap();
        assert_eq!(reply.stderr, "partial");
        assert_eq!(reply.stdout, "");
    }

    #[test]
    fn failed_copy_reports_shell_diagnostic() {
        let tmp = tempfile::tempdir().unwrap();
        let dst = tmp.path().join("copy");
        let mut shell = sh();

        let err = shell
            .execute(&format!("cp /nonexistent/a {}", dst.display()), TIMEOUT)
            .unwrap_err();
        assert!(matches!(err, HalError::CommandFailed { .. }));
        assert!(err.to_string().contains("No such file"), "{}", err);

        // The diagnostic belongs to the failed command only.
        assert_eq!(shell.run("true", TIMEOUT).unwrap().stderr, "");
    }

    #[test]
    fn output_without_trailing_newline_is_kept() {
        let mut shell = sh();
        let reply = shell.run("printf 'aa:bb:cc:dd:ee:ff'", TIMEOUT).unwrap();
        assert_eq!(reply.stdout, "aa:bb:cc:dd:ee:ff");
    }

    #[test]
    fn multi_line_output_is_joined() {
        let mut shell = sh();
        let reply = shell.run("printf 'one\\ntwo\\n'", TIMEOUT).unwrap();
        assert_eq!(reply.stdout, "one\ntwo");
    }

    #[test]
    fn execute_surfaces_non_zero_exit() {
        let mut shell = sh();
        let err = shell.execute("(exit 3)", TIMEOUT);
        assert!(matches!(
            err,
            Err(HalError::CommandFailed { code: Some(3), .. })
        ));
    }

    #[test]
    fn commands_share_shell_state() {
        let mut shell = sh();
        shell.execute("SPOOF_TEST_VALUE=42", TIMEOUT).unwrap();
        assert_eq!(shell.query("echo $SPOOF_TEST_VALUE", TIMEOUT).unwrap(), "42");
    }

    #[test]
    fn earlier_output_does_not_leak_into_next_reply() {
        let mut shell = sh();
        shell.execute("echo earlier", TIMEOUT).unwrap();
        let reply = shell.run("echo mine", TIMEOUT).unwrap();
        assert_eq!(reply.stdout, "mine");
    }

    #[test]
    fn late_output_of_timed_out_command_is_discarded() {
        let mut shell = sh();
        let err = shell
            .run("sleep 1; echo late; echo late >&2", Duration::from_millis(100))
            .unwrap_err();
        assert!(matches!(err, HalError::CommandTimeout { .. }));

        let reply = shell.run("echo fresh", TIMEOUT).unwrap();
        assert_eq!(reply.stdout, "fresh");
        assert_eq!(reply.stderr, "");
    }

    #[test]
    fn closed_session_rejects_commands() {
        let mut shell = sh();
        shell.close().unwrap();
        assert!(!shell.is_open());
        assert!(matches!(
            shell.run("true", TIMEOUT),
            Err(HalError::SessionUnavailable { .. })
        ));
        // Closing twice is a no-op.
        shell.close().unwrap();
    }

    #[test]
    fn drop_terminates_interpreter() {
        let shell = sh();
        let pid = Pid::from_raw(shell.id() as i32);
        drop(shell);
        assert!(signal::kill(pid, None).is_err());
    }

    #[test]
    fn missing_interpreter_is_unavailable() {
        let err = SuSession::acquire("/nonexistent/su", TIMEOUT).unwrap_err();
        assert!(matches!(err, HalError::SessionUnavailable { .. }));
    }

    #[test]
    fn interpreter_that_exits_immediately_is_unavailable() {
        let err = SuSession::acquire("true", TIMEOUT).unwrap_err();
        assert!(matches!(err, HalError::SessionUnavailable { .. }));
    }
}
