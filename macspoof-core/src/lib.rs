//! macspoof core library.
//!
//! `macspoof-core` holds the spoofing workflow (backup, change, restore, read-back) on top of
//! the HAL traits, plus config and logging shared with the binary.

pub mod address_file;
pub mod commands;
pub mod config;
pub mod experimental;
pub mod logging;
pub mod preflight;
pub mod spoofer;

pub use config::SpooferConfig;
pub use macspoof_error::{HalError, SpoofError, SpoofResult};
pub use spoofer::{Outcome, SkipReason, Spoofer, Strategy};
