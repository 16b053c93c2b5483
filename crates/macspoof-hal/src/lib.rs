//! macspoof Hardware Abstraction Layer (HAL).
//!
//! Everything that touches the device goes through the traits defined here: the privileged
//! shell, the wireless toggle, capability probes and filesystem lookups. `LinuxHal` and
//! `SuSession` talk to the real system; `FakeHal` records operations for tests.

pub mod hal;
pub mod path;

pub use hal::*;
pub use macspoof_error::{HalError, HalResult};
