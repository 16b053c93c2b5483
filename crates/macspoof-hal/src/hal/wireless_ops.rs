//! Wireless subsystem power control.

use crate::HalResult;

/// Toggle for the wireless subsystem.
///
/// The subsystem reads the persisted hardware address only while initialising, so address
/// file rewrites are bracketed by a disable/enable pair.
pub trait WirelessOps {
    fn set_wireless_enabled(&mut self, enabled: bool) -> HalResult<()>;
}
