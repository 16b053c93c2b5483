//! CLI argument parsing for macspoof.

use clap::{Parser, Subcommand, ValueEnum};
use macspoof_core::Strategy;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StrategyArg {
    /// `ifconfig <iface> hw ether` on the live interface (lost on reboot)
    InterfaceReconfigure,
    /// Rewrite the persisted address file and restart Wi-Fi
    AddressFile,
}

impl From<StrategyArg> for Strategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::InterfaceReconfigure => Strategy::InterfaceReconfigure,
            StrategyArg::AddressFile => Strategy::AddressFile,
        }
    }
}

#[derive(Parser)]
#[command(name = "macspoof")]
#[command(about = "Change the Wi-Fi hardware address of a rooted Android device")]
#[command(long_about = "Change the Wi-Fi hardware address of a rooted Android device.\n\n\
    Commands run through a single root shell (su). The address file is backed up\n\
    before it is first modified and can be restored later.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// TOML configuration file (defaults are used when omitted)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Check busybox, root and root access
    Preflight {
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show which address file (and backup) this device uses
    Locate {
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the current hardware address of an interface
    Show {
        /// Interface name (defaults to the configured interface)
        #[arg(short, long)]
        interface: Option<String>,
    },

    /// Change the hardware address
    Change {
        /// New hardware address, e.g. 02:1A:2B:3C:4D:5E
        #[arg(short, long)]
        address: String,

        /// Interface name (defaults to the configured interface)
        #[arg(short, long)]
        interface: Option<String>,

        /// Strategy (defaults to the configured strategy)
        #[arg(short, long, value_enum)]
        strategy: Option<StrategyArg>,

        /// Do not back up the address file before rewriting it
        #[arg(long)]
        no_backup: bool,
    },

    /// Back up the address file (never overwrites an existing backup)
    Backup,

    /// Restore the address file from its backup
    Restore,

    /// EXPERIMENTAL: replace a known address inside a file with sed
    Substitute {
        /// Address currently stored in the file
        #[arg(long)]
        current: String,

        /// Replacement address
        #[arg(long)]
        new: String,

        /// File to edit in place (e.g. the driver's nvram.txt)
        #[arg(long)]
        file: PathBuf,

        /// Acknowledge that this may corrupt device configuration
        #[arg(long)]
        yes_i_know: bool,

        /// Typed confirmation phrase
        #[arg(long, default_value = "")]
        confirm: String,
    },

    /// EXPERIMENTAL: replace every address-shaped string inside a file with sed
    ReplaceAny {
        /// Replacement address
        #[arg(long)]
        new: String,

        /// File to edit in place (e.g. the driver's nvram.txt)
        #[arg(long)]
        file: PathBuf,

        /// Acknowledge that this may corrupt device configuration
        #[arg(long)]
        yes_i_know: bool,

        /// Typed confirmation phrase
        #[arg(long, default_value = "")]
        confirm: String,
    },
}
