//! macOS permission preflight.
//!
//! The event taps need Input Monitoring and injection needs Accessibility.
//! This crate only answers whether the process currently has each grant;
//! guiding the user to System Settings is the host's problem. All calls are
//! fast and side-effect free.

#[cfg_attr(target_os = "macos", link(name = "ApplicationServices", kind = "framework"))]
unsafe extern "C" {
    fn AXIsProcessTrusted() -> bool;
    fn CGPreflightListenEventAccess() -> bool;
}

/// Check the Accessibility permission (required to post synthetic events).
pub fn accessibility_ok() -> bool {
    unsafe { AXIsProcessTrusted() }
}

/// Check the Input Monitoring permission (required to observe input via a
/// CGEvent tap).
pub fn input_monitoring_ok() -> bool {
    unsafe { CGPreflightListenEventAccess() }
}

/// Snapshot of both grants.
#[derive(Debug, Clone, Copy)]
pub struct Preflight {
    /// Accessibility grant; injection is unavailable without it.
    pub accessibility: bool,
    /// Input Monitoring grant; taps cannot be installed without it.
    pub input_monitoring: bool,
}

impl Preflight {
    /// Query both grants.
    pub fn check() -> Self {
        Self {
            accessibility: accessibility_ok(),
            input_monitoring: input_monitoring_ok(),
        }
    }

    /// True when the full intercept-and-inject pipeline can run.
    pub fn all_granted(self) -> bool {
        self.accessibility && self.input_monitoring
    }
}
