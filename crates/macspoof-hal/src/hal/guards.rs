use crate::{HalResult, WirelessOps};

/// RAII guard that re-enables the wireless subsystem when dropped.
///
/// Create it right after disabling wireless. Call [`WirelessGuard::finish`] on the normal path
/// to observe the re-enable result; any other exit path (early return, panic) re-enables on drop.
#[derive(Debug)]
pub struct WirelessGuard<'a, W: WirelessOps + ?Sized> {
    wireless: &'a mut W,
    active: bool,
}

impl<'a, W: WirelessOps + ?Sized> WirelessGuard<'a, W> {
    pub fn new(wireless: &'a mut W) -> Self {
        Self {
            wireless,
            active: true,
        }
    }

    /// Re-enable wireless now and report the result.
    pub fn finish(mut self) -> HalResult<()> {
        self.active = false;
        self.wireless.set_wireless_enabled(true)
    }

    /// Prevent automatic re-enabling.
    pub fn release(mut self) {
        self.active = false;
    }
}

impl<'a, W: WirelessOps + ?Sized> Drop for WirelessGuard<'a, W> {
    fn drop(&mut self) {
        if !self.active {
            return;
        }
        if let Err(err) = self.wireless.set_wireless_enabled(true) {
            log::warn!("wireless guard failed to re-enable wireless: {}", err);
        }
    }
}
