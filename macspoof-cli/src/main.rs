use anyhow::{Context, Result};
use clap::Parser;
use macspoof_core::address_file::{backup_path, has_backup, locate_address_file};
use macspoof_core::experimental::ExperimentalArmToken;
use macspoof_core::preflight::{self, CapabilityReport};
use macspoof_core::{logging, Outcome, Spoofer, SpooferConfig, Strategy};
use macspoof_hal::{LinuxHal, SuSession, SvcWireless};
use serde::Serialize;
use std::path::PathBuf;

mod cli;

#[derive(Serialize)]
struct LocateReport {
    address_file: Option<PathBuf>,
    backup: Option<PathBuf>,
    backup_exists: bool,
}

fn host_for(config: &SpooferConfig) -> LinuxHal {
    LinuxHal::new(&config.su_binary, &config.busybox_binary)
}

fn open(config: &SpooferConfig, needs_busybox: bool) -> Result<Spoofer<SuSession, LinuxHal>> {
    let host = host_for(config);
    preflight::run(&host, needs_busybox)?;
    Spoofer::acquire(host, config.clone()).context("failed to open a root shell")
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn report_outcome(action: &str, outcome: Outcome) {
    match outcome {
        Outcome::Applied => println!("✅ {}: done", action),
        Outcome::Skipped(_) => println!("ℹ️  {}: {}", action, outcome),
    }
}

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    let config = SpooferConfig::load_or_default(cli.config.as_deref())
        .context("failed to load configuration")?;
    logging::init(cli.verbose, config.log_file.as_deref());

    match cli.command {
        cli::Command::Preflight { json } => {
            let report = CapabilityReport::probe(&host_for(&config));
            if json {
                print_json(&report)?;
            } else {
                println!("busybox:     {}", report.busybox);
                println!("root:        {}", report.root);
                println!("root access: {}", report.root_access);
            }
            report.require(true)?;
        }
        cli::Command::Locate { json } => {
            let host = host_for(&config);
            let address_file = locate_address_file(&host, &config.candidate_paths);
            let backup = address_file
                .as_deref()
                .map(|file| backup_path(file, &config.backup_suffix));
            let backup_exists = address_file
                .as_deref()
                .is_some_and(|file| has_backup(&host, file, &config.backup_suffix));
            let report = LocateReport {
                address_file,
                backup,
                backup_exists,
            };
            if json {
                print_json(&report)?;
            } else {
                match &report.address_file {
                    Some(file) => println!("address file: {}", file.display()),
                    None => println!("address file: not found"),
                }
                if let Some(backup) = &report.backup {
                    let state = if report.backup_exists { "present" } else { "missing" };
                    println!("backup:       {} ({})", backup.display(), state);
                }
            }
        }
        cli::Command::Show { interface } => {
            let interface = interface.unwrap_or_else(|| config.default_interface.clone());
            let mut spoofer = open(&config, true)?;
            let address = spoofer.read_current_hardware_address(&interface)?;
            println!("{}", address);
            spoofer.close()?;
        }
        cli::Command::Change {
            address,
            interface,
            strategy,
            no_backup,
        } => {
            let interface = interface.unwrap_or_else(|| config.default_interface.clone());
            let strategy: Strategy = strategy.map(Into::into).unwrap_or(config.default_strategy);
            let mut spoofer = open(&config, strategy.needs_busybox())?;

            if strategy == Strategy::AddressFile && !no_backup {
                let outcome = spoofer.backup_address_file()?;
                if outcome == Outcome::Applied {
                    log::info!("factory address file backed up");
                }
            }

            log::info!("changing {} using {}", interface, strategy);
            let outcome = match strategy {
                Strategy::InterfaceReconfigure => {
                    spoofer.change_hardware_address(&address, &interface, strategy, None)?
                }
                Strategy::AddressFile => {
                    let mut wireless = SvcWireless::new(host_for(&config), &config.su_binary)
                        .with_timeout(config.wireless_timeout());
                    spoofer.change_hardware_address(
                        &address,
                        &interface,
                        strategy,
                        Some(&mut wireless),
                    )?
                }
            };
            outcome.require_applied()?;
            report_outcome("change", outcome);
            spoofer.close()?;
        }
        cli::Command::Backup => {
            let mut spoofer = open(&config, false)?;
            let outcome = spoofer.backup_address_file()?;
            report_outcome("backup", outcome);
            spoofer.close()?;
        }
        cli::Command::Restore => {
            let mut spoofer = open(&config, false)?;
            let outcome = spoofer.restore_address_file()?;
            report_outcome("restore", outcome);
            spoofer.close()?;
            if outcome == Outcome::Applied {
                println!("Restart Wi-Fi (or reboot) for the restored address to take effect.");
            }
        }
        cli::Command::Substitute {
            current,
            new,
            file,
            yes_i_know,
            confirm,
        } => {
            let token = ExperimentalArmToken::try_new(yes_i_know, &confirm)?;
            let mut spoofer = open(&config, false)?;
            spoofer.change_address_via_pattern_substitution(&token, &current, &new, &file)?;
            report_outcome("substitute", Outcome::Applied);
            spoofer.close()?;
        }
        cli::Command::ReplaceAny {
            new,
            file,
            yes_i_know,
            confirm,
        } => {
            let token = ExperimentalArmToken::try_new(yes_i_know, &confirm)?;
            let mut spoofer = open(&config, false)?;
            spoofer.change_any_address_in_file(&token, &new, &file)?;
            report_outcome("replace-any", Outcome::Applied);
            spoofer.close()?;
        }
    }

    Ok(())
}
