//! The privileged shell session manager.
//!
//! A `Spoofer` owns one shell session and issues every device mutation through it. Commands
//! run one at a time (`&mut self`), each one is checked for its exit status, and a failure is
//! returned to the caller instead of letting the sequence carry on.

use crate::address_file::{self, backup_path};
use crate::commands;
use crate::config::SpooferConfig;
use crate::preflight::CapabilityReport;
use macspoof_error::{HalError, SpoofError, SpoofResult};
use macspoof_hal::{DeviceHal, ShellOps, SuSession, WirelessGuard, WirelessOps};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// How the observed hardware address gets changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// Reconfigure the live interface with `ifconfig ... hw ether`.
    InterfaceReconfigure,
    /// Rewrite the persisted address file read by the wireless driver at start-up.
    AddressFile,
}

impl Strategy {
    pub fn needs_busybox(self) -> bool {
        matches!(self, Strategy::InterfaceReconfigure)
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::InterfaceReconfigure => write!(f, "interface-reconfigure"),
            Strategy::AddressFile => write!(f, "address-file"),
        }
    }
}

/// Why an operation had nothing to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// None of the candidate address files exists on this device.
    TargetNotFound,
    /// A backup was taken earlier and is never overwritten.
    BackupExists,
}

/// Result of a mutating operation that completed without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Applied,
    Skipped(SkipReason),
}

impl Outcome {
    /// Treat a missing address file as an error, for callers that need the change to happen.
    pub fn require_applied(self) -> SpoofResult<()> {
        match self {
            Outcome::Skipped(SkipReason::TargetNotFound) => Err(SpoofError::TargetNotFound),
            Outcome::Applied | Outcome::Skipped(SkipReason::BackupExists) => Ok(()),
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Applied => write!(f, "applied"),
            Outcome::Skipped(SkipReason::TargetNotFound) => {
                write!(f, "skipped (no address file on this device)")
            }
            Outcome::Skipped(SkipReason::BackupExists) => write!(f, "skipped (backup exists)"),
        }
    }
}

fn require_non_empty<'a>(value: &'a str, what: &str) -> SpoofResult<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(SpoofError::InvalidInput(format!("{} must not be empty", what)));
    }
    Ok(trimmed)
}

/// Trimmed `value`, rejected unless the root shell would take it literally.
pub(crate) fn require_shell_word<'a>(value: &'a str, what: &str) -> SpoofResult<&'a str> {
    let value = require_non_empty(value, what)?;
    if !commands::is_shell_word(value) {
        return Err(SpoofError::InvalidInput(format!(
            "{} contains characters the shell would interpret: {:?}",
            what, value
        )));
    }
    Ok(value)
}

pub struct Spoofer<S: ShellOps, H: DeviceHal> {
    session: S,
    host: H,
    config: SpooferConfig,
}

impl<H: DeviceHal> Spoofer<SuSession, H> {
    /// Open a root shell (`config.su_binary`) and wrap it.
    pub fn acquire(host: H, config: SpooferConfig) -> SpoofResult<Self> {
        let session = SuSession::acquire(&config.su_binary, config.acquire_timeout())?;
        Ok(Self::new(session, host, config))
    }
}

impl<S: ShellOps, H: DeviceHal> Spoofer<S, H> {
    pub fn new(session: S, host: H, config: SpooferConfig) -> Self {
        Self {
            session,
            host,
            config,
        }
    }

    pub fn config(&self) -> &SpooferConfig {
        &self.config
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub(crate) fn session_mut(&mut self) -> &mut S {
        &mut self.session
    }

    pub fn busybox_available(&self) -> bool {
        self.host.busybox_available()
    }

    pub fn root_available(&self) -> bool {
        self.host.root_available()
    }

    pub fn root_access_granted(&self) -> bool {
        self.host.root_access_granted()
    }

    pub fn capabilities(&self) -> CapabilityReport {
        CapabilityReport::probe(&self.host)
    }

    pub fn locate_address_file(&self) -> Option<PathBuf> {
        address_file::locate_address_file(&self.host, &self.config.candidate_paths)
    }

    pub fn backup_path_for(&self, file: &Path) -> PathBuf {
        backup_path(file, &self.config.backup_suffix)
    }

    /// Copy the address file to its backup path, once.
    ///
    /// An existing backup is never overwritten, so the first backup keeps the factory address.
    pub fn backup_address_file(&mut self) -> SpoofResult<Outcome> {
        let Some(file) = self.locate_address_file() else {
            log::info!("no address file found; nothing to back up");
            return Ok(Outcome::Skipped(SkipReason::TargetNotFound));
        };
        let backup = self.backup_path_for(&file);
        if address_file::has_backup(&self.host, &file, &self.config.backup_suffix) {
            log::info!("backup already present at {}", backup.display());
            return Ok(Outcome::Skipped(SkipReason::BackupExists));
        }

        log::info!("backing up {} to {}", file.display(), backup.display());
        let timeout = self.config.command_timeout();
        self.session.execute(&commands::copy(&file, &backup), timeout)?;
        Ok(Outcome::Applied)
    }

    /// Copy the backup over the address file.
    ///
    /// Fails with `BackupMissing` without touching the device when no backup exists.
    pub fn restore_address_file(&mut self) -> SpoofResult<Outcome> {
        let Some(file) = self.locate_address_file() else {
            log::info!("no address file found; nothing to restore");
            return Ok(Outcome::Skipped(SkipReason::TargetNotFound));
        };
        let backup = self.backup_path_for(&file);
        if !address_file::has_backup(&self.host, &file, &self.config.backup_suffix) {
            return Err(SpoofError::BackupMissing(backup));
        }

        log::info!("restoring {} from {}", file.display(), backup.display());
        let timeout = self.config.command_timeout();
        self.session.execute(&commands::copy(&backup, &file), timeout)?;
        Ok(Outcome::Applied)
    }

    /// Change the hardware address of `interface` using `strategy`.
    ///
    /// `wireless` is only consulted by [`Strategy::AddressFile`], which disables wireless,
    /// rewrites the address file and enables wireless again. Wireless is re-enabled even if
    /// the rewrite fails.
    pub fn change_hardware_address(
        &mut self,
        new_address: &str,
        interface: &str,
        strategy: Strategy,
        wireless: Option<&mut dyn WirelessOps>,
    ) -> SpoofResult<Outcome> {
        let address = require_shell_word(new_address, "hardware address")?;
        let interface = require_shell_word(interface, "interface name")?;
        let timeout = self.config.command_timeout();

        match strategy {
            Strategy::InterfaceReconfigure => {
                log::info!("setting {} hardware address to {}", interface, address);
                let command =
                    commands::interface_reconfigure(&self.config.busybox_binary, interface, address);
                self.session.execute(&command, timeout)?;
                Ok(Outcome::Applied)
            }
            Strategy::AddressFile => {
                let Some(file) = self.locate_address_file() else {
                    log::warn!("no address file found; hardware address left unchanged");
                    return Ok(Outcome::Skipped(SkipReason::TargetNotFound));
                };
                let Some(wireless) = wireless else {
                    return Err(SpoofError::PreconditionUnmet(
                        "wireless control is required for the address-file strategy".to_string(),
                    ));
                };

                log::info!("writing {} to {}", address, file.display());
                wireless.set_wireless_enabled(false)?;
                let guard = WirelessGuard::new(wireless);
                let written = self
                    .session
                    .execute(&commands::write_address_file(address, &file), timeout);
                let reenabled = guard.finish();
                if let (Err(_), Err(err)) = (&written, &reenabled) {
                    log::warn!("failed to re-enable wireless after write error: {}", err);
                }
                written?;
                reenabled?;
                Ok(Outcome::Applied)
            }
        }
    }

    /// Read the interface's current link-layer address.
    pub fn read_current_hardware_address(&mut self, interface: &str) -> SpoofResult<String> {
        let interface = require_shell_word(interface, "interface name")?;
        let command = commands::read_link_address(&self.config.busybox_binary, interface);
        let timeout = self.config.command_timeout();
        let output = self.session.query(&command, timeout)?;

        let address = output.trim();
        if address.is_empty() {
            return Err(HalError::CommandReadFailure(format!(
                "no link-layer address reported for {}",
                interface
            ))
            .into());
        }
        Ok(address.to_string())
    }

    /// Terminate the shell session.
    pub fn close(mut self) -> SpoofResult<()> {
        self.session.close()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use macspoof_hal::{FakeHal, Operation};

    fn spoofer(hal: &FakeHal) -> Spoofer<FakeHal, FakeHal> {
        Spoofer::new(hal.clone(), hal.clone(), SpooferConfig::default())
    }

    #[test]
    fn rejects_blank_address_and_interface() {
        let hal = FakeHal::new();
        let mut spoofer = spoofer(&hal);

        let err = spoofer
            .change_hardware_address("  ", "wlan0", Strategy::InterfaceReconfigure, None)
            .unwrap_err();
        assert!(matches!(err, SpoofError::InvalidInput(_)));

        let err = spoofer
            .change_hardware_address("AA:BB:CC:DD:EE:FF", "", Strategy::InterfaceReconfigure, None)
            .unwrap_err();
        assert!(matches!(err, SpoofError::InvalidInput(_)));
        assert_eq!(hal.operation_count(), 0);
    }

    #[test]
    fn rejects_shell_metacharacters_before_any_command() {
        let hal = FakeHal::new();
        hal.add_path("/efs/wifi/.mac.info");
        let mut spoofer = spoofer(&hal);
        let mut wireless = hal.clone();

        let err = spoofer
            .change_hardware_address(
                "AA:BB:CC:DD:EE:FF",
                "wlan0; reboot",
                Strategy::InterfaceReconfigure,
                None,
            )
            .unwrap_err();
        assert!(matches!(err, SpoofError::InvalidInput(_)));

        let err = spoofer
            .change_hardware_address(
                "AA:BB:CC:DD:EE:FF > /system/build.prop",
                "wlan0",
                Strategy::AddressFile,
                Some(&mut wireless),
            )
            .unwrap_err();
        assert!(matches!(err, SpoofError::InvalidInput(_)));

        assert!(matches!(
            spoofer.read_current_hardware_address("$(id)"),
            Err(SpoofError::InvalidInput(_))
        ));
        assert_eq!(hal.operation_count(), 0);
    }

    #[test]
    fn backup_check_uses_configured_suffix() {
        let hal = FakeHal::new();
        hal.add_path("/efs/wifi/.mac.info");
        hal.add_path("/efs/wifi/.mac.info.bak");
        let mut spoofer = Spoofer::new(
            hal.clone(),
            hal.clone(),
            SpooferConfig {
                backup_suffix: ".orig".to_string(),
                ..SpooferConfig::default()
            },
        );

        assert!(matches!(
            spoofer.restore_address_file(),
            Err(SpoofError::BackupMissing(path)) if path.ends_with(".mac.info.orig")
        ));
        assert_eq!(spoofer.backup_address_file().unwrap(), Outcome::Applied);
        assert_eq!(
            hal.shell_commands(),
            vec!["cp /efs/wifi/.mac.info /efs/wifi/.mac.info.orig"]
        );
        assert_eq!(
            spoofer.backup_address_file().unwrap(),
            Outcome::Skipped(SkipReason::BackupExists)
        );
    }

    #[test]
    fn address_file_without_wireless_handle_is_a_precondition_failure() {
        let hal = FakeHal::new();
        hal.add_path("/efs/wifi/.mac.info");
        let mut spoofer = spoofer(&hal);

        let err = spoofer
            .change_hardware_address("AA:BB:CC:DD:EE:FF", "wlan0", Strategy::AddressFile, None)
            .unwrap_err();
        assert!(matches!(err, SpoofError::PreconditionUnmet(_)));
        assert_eq!(hal.operation_count(), 0);
    }

    #[test]
    fn failed_write_still_reenables_wireless() {
        let hal = FakeHal::new();
        hal.add_path("/efs/wifi/.mac.info");
        hal.fail_commands_containing("echo", 1);
        let mut spoofer = spoofer(&hal);
        let mut wireless = hal.clone();

        let err = spoofer
            .change_hardware_address(
                "AA:BB:CC:DD:EE:FF",
                "wlan0",
                Strategy::AddressFile,
                Some(&mut wireless),
            )
            .unwrap_err();
        assert!(matches!(
            err,
            SpoofError::Hal(HalError::CommandFailed { .. })
        ));
        assert_eq!(
            hal.operations().last(),
            Some(&Operation::Wireless { enabled: true })
        );
    }

    #[test]
    fn failed_disable_issues_no_write() {
        let hal = FakeHal::new();
        hal.add_path("/efs/wifi/.mac.info");
        hal.fail_wireless(true);
        let mut spoofer = spoofer(&hal);
        let mut wireless = hal.clone();

        assert!(spoofer
            .change_hardware_address(
                "AA:BB:CC:DD:EE:FF",
                "wlan0",
                Strategy::AddressFile,
                Some(&mut wireless),
            )
            .is_err());
        assert!(hal.shell_commands().is_empty());
    }

    #[test]
    fn outcome_require_applied() {
        assert!(Outcome::Applied.require_applied().is_ok());
        assert!(Outcome::Skipped(SkipReason::BackupExists)
            .require_applied()
            .is_ok());
        assert!(matches!(
            Outcome::Skipped(SkipReason::TargetNotFound).require_applied(),
            Err(SpoofError::TargetNotFound)
        ));
    }

    #[test]
    fn read_back_trims_output_and_rejects_empty() {
        let hal = FakeHal::new();
        hal.push_reply("aa:bb:cc:dd:ee:ff\n", 0);
        hal.push_reply("", 0);
        let mut spoofer = spoofer(&hal);

        assert_eq!(
            spoofer.read_current_hardware_address("wlan0").unwrap(),
            "aa:bb:cc:dd:ee:ff"
        );
        assert!(matches!(
            spoofer.read_current_hardware_address("wlan9"),
            Err(SpoofError::Hal(HalError::CommandReadFailure(_)))
        ));
    }

    #[test]
    fn capability_probes_delegate_to_host() {
        let hal = FakeHal::new();
        hal.set_capabilities(false, true, false);
        let spoofer = spoofer(&hal);

        assert!(!spoofer.busybox_available());
        assert!(spoofer.root_available());
        assert!(!spoofer.root_access_granted());
        assert!(!spoofer.capabilities().root_access);
    }

    #[test]
    fn close_terminates_session() {
        let hal = FakeHal::new();
        let spoofer = spoofer(&hal);
        spoofer.close().unwrap();
        assert!(hal.is_closed());
    }
}
