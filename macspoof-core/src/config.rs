//! Spoofer configuration.
//!
//! Every field has a default matching the stock Samsung layout, so an empty (or absent) TOML
//! file is a valid configuration.

use crate::commands::{is_shell_path, is_shell_word};
use crate::spoofer::Strategy;
use macspoof_error::{SpoofError, SpoofResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_ADDRESS_FILE: &str = "/efs/wifi/.mac.info";
pub const DEFAULT_BACKUP_SUFFIX: &str = ".bak";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SpooferConfig {
    /// Files that may persist the factory hardware address, checked in order.
    pub candidate_paths: Vec<PathBuf>,
    /// Appended to the address file path to form the backup path.
    pub backup_suffix: String,
    pub su_binary: String,
    pub busybox_binary: String,
    pub default_interface: String,
    pub default_strategy: Strategy,
    /// How long to wait for the superuser prompt to be answered.
    pub acquire_timeout_secs: u64,
    pub command_timeout_secs: u64,
    pub wireless_timeout_secs: u64,
    pub log_file: Option<PathBuf>,
}

impl Default for SpooferConfig {
    fn default() -> Self {
        Self {
            candidate_paths: vec![PathBuf::from(DEFAULT_ADDRESS_FILE)],
            backup_suffix: DEFAULT_BACKUP_SUFFIX.to_string(),
            su_binary: "su".to_string(),
            busybox_binary: "busybox".to_string(),
            default_interface: "wlan0".to_string(),
            default_strategy: Strategy::InterfaceReconfigure,
            acquire_timeout_secs: 60,
            command_timeout_secs: 10,
            wireless_timeout_secs: 20,
            log_file: None,
        }
    }
}

impl SpooferConfig {
    pub fn from_toml_str(contents: &str) -> SpoofResult<Self> {
        let cfg: Self =
            toml::from_str(contents).map_err(|e| SpoofError::Config(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load(path: &Path) -> SpoofResult<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            SpoofError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&contents)
    }

    /// Load `path` if given, otherwise use defaults.
    pub fn load_or_default(path: Option<&Path>) -> SpoofResult<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> SpoofResult<()> {
        if self.candidate_paths.is_empty() {
            return Err(SpoofError::Config(
                "candidate_paths must list at least one file".to_string(),
            ));
        }
        if let Some(relative) = self.candidate_paths.iter().find(|p| !p.is_absolute()) {
            return Err(SpoofError::Config(format!(
                "candidate path must be absolute: {}",
                relative.display()
            )));
        }
        // These end up inside root shell command lines.
        if let Some(unsafe_path) = self.candidate_paths.iter().find(|p| !is_shell_path(p)) {
            return Err(SpoofError::Config(format!(
                "candidate path contains whitespace or shell metacharacters: {:?}",
                unsafe_path
            )));
        }
        for (field, value) in [
            ("backup_suffix", &self.backup_suffix),
            ("busybox_binary", &self.busybox_binary),
            ("default_interface", &self.default_interface),
        ] {
            if !is_shell_word(value) {
                return Err(SpoofError::Config(format!(
                    "{} must be non-empty without whitespace or shell metacharacters: {:?}",
                    field, value
                )));
            }
        }
        if self.su_binary.trim().is_empty() {
            return Err(SpoofError::Config("su_binary must not be empty".to_string()));
        }
        if self.acquire_timeout_secs == 0
            || self.command_timeout_secs == 0
            || self.wireless_timeout_secs == 0
        {
            return Err(SpoofError::Config("timeouts must be non-zero".to_string()));
        }
        Ok(())
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    pub fn wireless_timeout(&self) -> Duration {
        Duration::from_secs(self.wireless_timeout_secs)
    }
}
