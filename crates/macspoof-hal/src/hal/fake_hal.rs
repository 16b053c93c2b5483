//! Fake HAL implementation for testing.
//!
//! This implementation records all operations without executing them,
//! allowing for CI-safe testing without root privileges or a real device.
//! Clones share state, so one `FakeHal` can stand in for the shell session,
//! the wireless toggle and the host at once and keep a single ordered log.

use super::{CapabilityOps, FsOps, ProcessOps, ShellOps, ShellReply, WirelessOps};
use crate::{HalError, HalResult};
use std::collections::{HashSet, VecDeque};
use std::os::unix::process::ExitStatusExt;
use std::path::{Path, PathBuf};
use std::process::Output;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Operation records for testing and verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    ShellRun { command: String },
    ShellClose,
    Wireless { enabled: bool },
    Process { program: String, args: Vec<String>, timeout_secs: u64 },
}

/// Shared state for FakeHal operations.
#[derive(Debug, Clone)]
struct FakeHalState {
    /// All operations that were recorded
    operations: Vec<Operation>,
    /// Paths that `path_exists` reports as present
    existing_paths: HashSet<PathBuf>,
    /// Scripted replies for `run`, consumed front to back
    replies: VecDeque<ShellReply>,
    /// Commands containing the pattern exit with the given status
    failing_commands: Vec<(String, i32)>,
    wireless_fails: bool,
    busybox: bool,
    root: bool,
    access: bool,
    closed: bool,
}

impl Default for FakeHalState {
    fn default() -> Self {
        Self {
            operations: Vec::new(),
            existing_paths: HashSet::new(),
            replies: VecDeque::new(),
            failing_commands: Vec::new(),
            wireless_fails: false,
            busybox: true,
            root: true,
            access: true,
            closed: false,
        }
    }
}

impl FakeHalState {
    /// Mirror the filesystem effect of the commands the spoofer issues.
    fn apply_side_effects(&mut self, command: &str) {
        let parts: Vec<&str> = command.split_whitespace().collect();
        match parts.as_slice() {
            ["cp", _, dst] => {
                self.existing_paths.insert(PathBuf::from(*dst));
            }
            ["echo", _, ">", dst] => {
                self.existing_paths.insert(PathBuf::from(*dst));
            }
            _ => {}
        }
    }
}

/// Fake HAL implementation that records operations without executing them.
///
/// This is designed for testing and CI environments where real device
/// operations would fail or be dangerous.
#[derive(Debug, Clone, Default)]
pub struct FakeHal {
    state: Arc<Mutex<FakeHalState>>,
}

impl FakeHal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `path` as present on the fake device.
    pub fn add_path(&self, path: impl Into<PathBuf>) {
        self.state.lock().unwrap().existing_paths.insert(path.into());
    }

    /// Queue the reply for the next `run` that does not hit a failing pattern.
    pub fn push_reply(&self, stdout: impl Into<String>, exit_code: i32) {
        self.state.lock().unwrap().replies.push_back(ShellReply {
            stdout: stdout.into(),
            exit_code,
            ..ShellReply::default()
        });
    }

    /// Make every command containing `pattern` exit with `exit_code`.
    pub fn fail_commands_containing(&self, pattern: impl Into<String>, exit_code: i32) {
        self.state
            .lock()
            .unwrap()
            .failing_commands
            .push((pattern.into(), exit_code));
    }

    pub fn fail_wireless(&self, fails: bool) {
        self.state.lock().unwrap().wireless_fails = fails;
    }

    pub fn set_capabilities(&self, busybox: bool, root: bool, access: bool) {
        let mut state = self.state.lock().unwrap();
        state.busybox = busybox;
        state.root = root;
        state.access = access;
    }

    /// Get all recorded operations.
    pub fn operations(&self) -> Vec<Operation> {
        self.state.lock().unwrap().operations.clone()
    }

    /// Get the number of operations recorded.
    pub fn operation_count(&self) -> usize {
        self.state.lock().unwrap().operations.len()
    }

    /// Check if a specific operation was recorded.
    pub fn has_operation(&self, check: impl Fn(&Operation) -> bool) -> bool {
        self.state.lock().unwrap().operations.iter().any(check)
    }

    /// Command lines sent to the shell, in order.
    pub fn shell_commands(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .operations
            .iter()
            .filter_map(|op| match op {
                Operation::ShellRun { command } => Some(command.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().unwrap().closed
    }

    /// Clear all recorded operations.
    pub fn clear(&self) {
        self.state.lock().unwrap().operations.clear();
    }

    fn record_operation(&self, op: Operation) {
        self.state.lock().unwrap().operations.push(op);
    }

    fn ensure_open(&self) -> HalResult<()> {
        if self.is_closed() {
            return Err(HalError::SessionUnavailable {
                program: "fake".to_string(),
                reason: "session already closed".to_string(),
            });
        }
        Ok(())
    }
}

impl ShellOps for FakeHal {
    fn run(&mut self, command: &str, _timeout: Duration) -> HalResult<ShellReply> {
        self.ensure_open()?;
        log::info!("FAKE HAL: run {}", command);
        let mut state = self.state.lock().unwrap();
        state.operations.push(Operation::ShellRun {
            command: command.to_string(),
        });

        let failure = state
            .failing_commands
            .iter()
            .find(|(pattern, _)| command.contains(pattern.as_str()))
            .map(|(pattern, code)| (pattern.clone(), *code));
        if let Some((pattern, exit_code)) = failure {
            return Ok(ShellReply {
                stdout: String::new(),
                stderr: format!("fake failure matching '{}'", pattern),
                exit_code,
            });
        }

        state.apply_side_effects(command);
        Ok(state.replies.pop_front().unwrap_or_default())
    }

    fn close(&mut self) -> HalResult<()> {
        let mut state = self.state.lock().unwrap();
        if !state.closed {
            state.closed = true;
            state.operations.push(Operation::ShellClose);
        }
        Ok(())
    }
}

impl WirelessOps for FakeHal {
    fn set_wireless_enabled(&mut self, enabled: bool) -> HalResult<()> {
        log::info!("FAKE HAL: wireless enabled = {}", enabled);
        let mut state = self.state.lock().unwrap();
        state.operations.push(Operation::Wireless { enabled });
        if state.wireless_fails {
            return Err(HalError::Other("wireless toggle failed".to_string()));
        }
        Ok(())
    }
}

impl FsOps for FakeHal {
    fn path_exists(&self, path: &Path) -> bool {
        self.state.lock().unwrap().existing_paths.contains(path)
    }
}

impl CapabilityOps for FakeHal {
    fn busybox_available(&self) -> bool {
        self.state.lock().unwrap().busybox
    }

    fn root_available(&self) -> bool {
        self.state.lock().unwrap().root
    }

    fn root_access_granted(&self) -> bool {
        self.state.lock().unwrap().access
    }
}

impl ProcessOps for FakeHal {
    fn command_output(&self, program: &str, args: &[&str], timeout: Duration) -> HalResult<Output> {
        self.record_operation(Operation::Process {
            program: program.to_string(),
            args: args.iter().map(|s| s.to_string()).collect(),
            timeout_secs: timeout.as_secs(),
        });
        Ok(Output {
            status: std::process::ExitStatus::from_raw(0),
            stdout: Vec::new(),
            stderr: Vec::new(),
        })
    }

    fn command_status(&self, program: &str, args: &[&str], timeout: Duration) -> HalResult<()> {
        let _ = self.command_output(program, args, timeout)?;
        Ok(())
    }
}
