//! Linux/Android HAL implementation using real processes and the real filesystem.

use super::{CapabilityOps, FsOps, ProcessOps, WirelessOps};
use crate::{HalError, HalResult};
use std::fs;
use std::io::Read;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use std::time::Duration;
use wait_timeout::ChildExt;

const PROBE_TIMEOUT: Duration = Duration::from_secs(30);
const WIRELESS_TIMEOUT: Duration = Duration::from_secs(20);

/// Locations where superuser managers install `su` on Android, checked after `PATH`.
const KNOWN_SU_PATHS: &[&str] = &[
    "/system/bin/su",
    "/system/xbin/su",
    "/sbin/su",
    "/su/bin/su",
    "/data/adb/ksu/bin/su",
    "/data/local/xbin/su",
    "/data/local/bin/su",
];

/// Real HAL implementation for Linux and Android systems.
#[derive(Debug, Clone)]
pub struct LinuxHal {
    su_binary: String,
    busybox_binary: String,
    path_env: String,
    probe_timeout: Duration,
}

impl Default for LinuxHal {
    fn default() -> Self {
        Self::new("su", "busybox")
    }
}

impl LinuxHal {
    pub fn new(su_binary: impl Into<String>, busybox_binary: impl Into<String>) -> Self {
        Self {
            su_binary: su_binary.into(),
            busybox_binary: busybox_binary.into(),
            path_env: std::env::var("PATH").unwrap_or_default(),
            probe_timeout: PROBE_TIMEOUT,
        }
    }

    /// Override the search path used for binary lookups.
    pub fn with_path_env(mut self, path_env: impl Into<String>) -> Self {
        self.path_env = path_env.into();
        self
    }

    /// Resolve `binary` the way a shell would: names containing `/` are taken as paths,
    /// anything else is looked up on `PATH`.
    fn resolve(&self, binary: &str) -> Option<PathBuf> {
        if binary.contains('/') {
            let path = PathBuf::from(binary);
            return is_executable(&path).then_some(path);
        }
        find_executable_in_path(binary, &self.path_env)
    }
}

fn is_executable(path: &Path) -> bool {
    fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

fn find_executable_in_path(binary: &str, path_env: &str) -> Option<PathBuf> {
    path_env
        .split(':')
        .filter(|dir| !dir.is_empty())
        .map(|dir| Path::new(dir).join(binary))
        .find(|candidate| is_executable(candidate))
}

fn running_as_root() -> bool {
    nix::unistd::geteuid().is_root()
}

fn map_command_err(program: &str, err: std::io::Error) -> HalError {
    if err.kind() == std::io::ErrorKind::NotFound {
        return HalError::CommandNotFound(program.to_string());
    }
    HalError::Io(err)
}

fn output_failed(program: &str, output: &Output) -> HalError {
    HalError::CommandFailed {
        program: program.to_string(),
        code: output.status.code(),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    }
}

fn output_with_timeout(program: &str, cmd: &mut Command, timeout: Duration) -> HalResult<Output> {
    // Avoid commands hanging waiting for input.
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    let mut child = cmd.spawn().map_err(|e| map_command_err(program, e))?;

    let mut stdout = child.stdout.take();
    let mut stderr = child.stderr.take();

    // Drain pipes concurrently to avoid deadlocks on large output.
    let stdout_handle = std::thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut out) = stdout.take() {
            let _ = out.read_to_end(&mut buf);
        }
        buf
    });
    let stderr_handle = std::thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut err) = stderr.take() {
            let _ = err.read_to_end(&mut buf);
        }
        buf
    });

    let status = match child.wait_timeout(timeout).map_err(HalError::Io)? {
        Some(status) => status,
        None => {
            let _ = child.kill();
            let _ = child.wait();
            let _ = stdout_handle.join();
            let _ = stderr_handle.join();
            return Err(HalError::CommandTimeout {
                program: program.to_string(),
                timeout_secs: timeout.as_secs(),
            });
        }
    };

    let stdout = stdout_handle.join().unwrap_or_default();
    let stderr = stderr_handle.join().unwrap_or_default();
    Ok(Output {
        status,
        stdout,
        stderr,
    })
}

impl ProcessOps for LinuxHal {
    fn command_output(&self, program: &str, args: &[&str], timeout: Duration) -> HalResult<Output> {
        let mut cmd = Command::new(program);
        cmd.args(args);
        output_with_timeout(program, &mut cmd, timeout)
    }

    fn command_status(&self, program: &str, args: &[&str], timeout: Duration) -> HalResult<()> {
        let output = self.command_output(program, args, timeout)?;
        if !output.status.success() {
            return Err(output_failed(program, &output));
        }
        Ok(())
    }
}

impl FsOps for LinuxHal {
    fn path_exists(&self, path: &Path) -> bool {
        path.exists()
    }
}

impl CapabilityOps for LinuxHal {
    fn busybox_available(&self) -> bool {
        let found = self.resolve(&self.busybox_binary);
        log::debug!("busybox lookup: {:?}", found);
        found.is_some()
    }

    fn root_available(&self) -> bool {
        if running_as_root() {
            return true;
        }
        if self.resolve(&self.su_binary).is_some() {
            return true;
        }
        KNOWN_SU_PATHS
            .iter()
            .any(|candidate| is_executable(Path::new(candidate)))
    }

    fn root_access_granted(&self) -> bool {
        if running_as_root() {
            return true;
        }
        match self.command_output(&self.su_binary, &["-c", "id"], self.probe_timeout) {
            Ok(output) => {
                let stdout = String::from_utf8_lossy(&output.stdout);
                output.status.success() && stdout.contains("uid=0")
            }
            Err(err) => {
                log::debug!("root access probe failed: {}", err);
                false
            }
        }
    }
}

/// Wireless toggle backed by Android's `svc wifi` service command, run through `su`.
#[derive(Debug, Clone)]
pub struct SvcWireless<P: ProcessOps> {
    process: P,
    su_binary: String,
    timeout: Duration,
}

impl<P: ProcessOps> SvcWireless<P> {
    pub fn new(process: P, su_binary: impl Into<String>) -> Self {
        Self {
            process,
            su_binary: su_binary.into(),
            timeout: WIRELESS_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl<P: ProcessOps> WirelessOps for SvcWireless<P> {
    fn set_wireless_enabled(&mut self, enabled: bool) -> HalResult<()> {
        let command = if enabled {
            "svc wifi enable"
        } else {
            "svc wifi disable"
        };
        log::info!("{}", command);
        self.process
            .command_status(&self.su_binary, &["-c", command], self.timeout)
    }
}
