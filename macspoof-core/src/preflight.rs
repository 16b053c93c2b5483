use macspoof_error::{SpoofError, SpoofResult};
use macspoof_hal::CapabilityOps;
use serde::Serialize;

/// Snapshot of the root capability probes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CapabilityReport {
    pub busybox: bool,
    pub root: bool,
    pub root_access: bool,
}

impl CapabilityReport {
    pub fn probe<H: CapabilityOps + ?Sized>(host: &H) -> Self {
        let report = Self {
            busybox: host.busybox_available(),
            root: host.root_available(),
            root_access: host.root_access_granted(),
        };
        log::debug!("capabilities: {:?}", report);
        report
    }

    /// Every mutating operation needs root; only busybox-driven ones need busybox.
    pub fn require(&self, needs_busybox: bool) -> SpoofResult<()> {
        let mut missing = Vec::new();
        if !self.root {
            missing.push("device is not rooted");
        } else if !self.root_access {
            missing.push("root access was not granted");
        }
        if needs_busybox && !self.busybox {
            missing.push("busybox is not installed");
        }
        if !missing.is_empty() {
            return Err(SpoofError::PreconditionUnmet(missing.join(", ")));
        }
        Ok(())
    }
}

/// Probe the host and fail with `PreconditionUnmet` if anything required is absent.
pub fn run<H: CapabilityOps + ?Sized>(host: &H, needs_busybox: bool) -> SpoofResult<CapabilityReport> {
    log::info!("🧪 Preflight checks");
    let report = CapabilityReport::probe(host);
    report.require(needs_busybox)?;
    log::info!("✅ Preflight passed");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use macspoof_hal::FakeHal;

    #[test]
    fn passes_when_everything_is_present() {
        let hal = FakeHal::new();
        let report = run(&hal, true).unwrap();
        assert_eq!(
            report,
            CapabilityReport {
                busybox: true,
                root: true,
                root_access: true
            }
        );
    }

    #[test]
    fn fails_without_root() {
        let hal = FakeHal::new();
        hal.set_capabilities(true, false, false);
        let err = run(&hal, false).unwrap_err();
        assert!(err.to_string().contains("not rooted"));
    }

    #[test]
    fn fails_when_access_denied() {
        let hal = FakeHal::new();
        hal.set_capabilities(true, true, false);
        let err = run(&hal, false).unwrap_err();
        assert!(matches!(err, SpoofError::PreconditionUnmet(_)));
        assert!(err.to_string().contains("not granted"));
    }

    #[test]
    fn busybox_only_required_when_asked() {
        let hal = FakeHal::new();
        hal.set_capabilities(false, true, true);
        assert!(run(&hal, false).is_ok());
        let err = run(&hal, true).unwrap_err();
        assert!(err.to_string().contains("busybox"));
    }
}
