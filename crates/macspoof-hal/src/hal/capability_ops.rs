//! Root capability probes (read-only).

/// Capability probing trait. Probes never fail; an unanswerable probe reports `false`.
pub trait CapabilityOps {
    /// True when a busybox binary is reachable.
    fn busybox_available(&self) -> bool;

    /// True when the device is rooted (an `su` binary exists or we already run as root).
    fn root_available(&self) -> bool;

    /// True when root access was actually granted to this process.
    fn root_access_granted(&self) -> bool;
}
