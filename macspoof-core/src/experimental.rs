//! Experimental in-place address substitution.
//!
//! These rewrite arbitrary configuration files (typically the wireless driver's `nvram.txt`)
//! with `sed -i`. They have not been verified on devices and can clobber unrelated settings,
//! so every call needs an [`ExperimentalArmToken`], which only exists once the caller has
//! passed `--yes-i-know` and typed [`EXPERIMENTAL_CONFIRMATION`].

use crate::commands;
use crate::spoofer::{require_shell_word, Spoofer};
use macspoof_error::{SpoofError, SpoofResult};
use macspoof_hal::{DeviceHal, ShellOps};
use std::path::Path;

pub const EXPERIMENTAL_CONFIRMATION: &str = "I ACCEPT THAT THIS MAY CORRUPT DEVICE CONFIGURATION";

#[derive(Debug, Clone, Copy)]
pub struct ExperimentalArmToken(());

impl ExperimentalArmToken {
    pub fn try_new(yes_i_know: bool, typed_confirmation: &str) -> SpoofResult<Self> {
        if !yes_i_know {
            return Err(SpoofError::MissingRiskAcknowledgement);
        }
        if typed_confirmation.trim() != EXPERIMENTAL_CONFIRMATION {
            return Err(SpoofError::MissingExperimentalConfirmation);
        }
        log::warn!("experimental operations armed");
        Ok(Self(()))
    }
}

/// `/` would end the sed expression early.
fn sed_safe<'a>(value: &'a str, what: &str) -> SpoofResult<&'a str> {
    let value = require_shell_word(value, what)?;
    if value.contains('/') {
        return Err(SpoofError::InvalidInput(format!("{} must not contain '/'", what)));
    }
    Ok(value)
}

impl<S: ShellOps, H: DeviceHal> Spoofer<S, H> {
    /// Replace every occurrence of `current_address` in `file` with `new_address`.
    pub fn change_address_via_pattern_substitution(
        &mut self,
        _token: &ExperimentalArmToken,
        current_address: &str,
        new_address: &str,
        file: &Path,
    ) -> SpoofResult<()> {
        let current = sed_safe(current_address, "current hardware address")?;
        let new = sed_safe(new_address, "hardware address")?;
        self.require_target(file)?;

        log::warn!(
            "EXPERIMENTAL: replacing {} with {} in {}",
            current,
            new,
            file.display()
        );
        let timeout = self.config().command_timeout();
        self.session_mut()
            .execute(&commands::substitute_address(current, new, file), timeout)?;
        Ok(())
    }

    /// Replace anything shaped like a hardware address in `file` with `new_address`.
    pub fn change_any_address_in_file(
        &mut self,
        _token: &ExperimentalArmToken,
        new_address: &str,
        file: &Path,
    ) -> SpoofResult<()> {
        let new = sed_safe(new_address, "hardware address")?;
        self.require_target(file)?;

        log::warn!(
            "EXPERIMENTAL: replacing every address in {} with {}",
            file.display(),
            new
        );
        let timeout = self.config().command_timeout();
        self.session_mut()
            .execute(&commands::substitute_any_address(new, file), timeout)?;
        Ok(())
    }

    fn require_target(&self, file: &Path) -> SpoofResult<()> {
        if !commands::is_shell_path(file) {
            return Err(SpoofError::InvalidInput(format!(
                "file path contains whitespace or shell metacharacters: {:?}",
                file
            )));
        }
        if !self.host().path_exists(file) {
            return Err(SpoofError::TargetNotFound);
        }
        Ok(())
    }
}
