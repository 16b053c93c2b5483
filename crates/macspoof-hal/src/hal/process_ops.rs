//! Process execution helpers.
//!
//! One-shot external commands (probes, wireless toggles) go through the HAL so we can
//! test workflows without spawning real processes.

use crate::HalResult;
use std::process::Output;
use std::time::Duration;

/// Process execution trait (external command runner).
pub trait ProcessOps {
    fn command_output(&self, program: &str, args: &[&str], timeout: Duration) -> HalResult<Output>;

    fn command_status(&self, program: &str, args: &[&str], timeout: Duration) -> HalResult<()>;
}
