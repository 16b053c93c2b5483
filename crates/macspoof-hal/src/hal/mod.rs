//! HAL trait definitions and implementations.
//!
//! This module defines the core traits for device operations and provides
//! both real (LinuxHal, SuSession) and fake (FakeHal) implementations.

pub mod capability_ops;
pub mod fake_hal;
pub mod fs_ops;
pub mod guards;
pub mod linux_hal;
pub mod process_ops;
pub mod shell_ops;
pub mod su_session;
pub mod wireless_ops;

pub use capability_ops::CapabilityOps;
pub use fake_hal::{FakeHal, Operation};
pub use fs_ops::FsOps;
pub use guards::WirelessGuard;
pub use linux_hal::{LinuxHal, SvcWireless};
pub use process_ops::ProcessOps;
pub use shell_ops::{ShellOps, ShellReply};
pub use su_session::SuSession;
pub use wireless_ops::WirelessOps;

/// Host-side view of the device combining filesystem lookups and capability probes.
pub trait DeviceHal: FsOps + CapabilityOps {}

/// Automatically implement DeviceHal for any type implementing all required traits.
impl<T> DeviceHal for T where T: FsOps + CapabilityOps {}
