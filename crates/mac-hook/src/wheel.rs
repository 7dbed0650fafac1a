//! The wheel tap: every scroll event, one Allow/Block decision.

use std::{
    panic::{AssertUnwindSafe, catch_unwind},
    sync::Arc,
    thread::JoinHandle,
};

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::{
    Error, Result, START_READY_TIMEOUT, STOP_JOIN_TIMEOUT, WheelDecision, join_bounded, sys,
};

/// Delta magnitude of one notch of physical wheel rotation.
///
/// The tap reports line deltas (±1 per notch); they are normalized to this
/// scale at the tap boundary so the gesture buffer arithmetic works in the
/// conventional 120-per-notch units.
pub const NOTCH_DELTA: i64 = 120;

/// One wheel event as seen by the decision handler.
#[derive(Debug, Clone, Copy)]
pub struct WheelEvent {
    /// Signed, notch-normalized delta (+[`NOTCH_DELTA`] per notch up).
    pub delta: i64,
}

/// Decision handler invoked for every non-synthetic wheel event.
pub(crate) type WheelHandler = Arc<dyn Fn(&WheelEvent) -> WheelDecision + Send + Sync>;

/// Run a handler, resolving every failure to Allow.
///
/// A wedged or always-blocking wheel hook freezes the pointer device for
/// the whole system; a missed remap does not.
pub(crate) fn decide_or_allow(handler: &WheelHandler, event: &WheelEvent) -> WheelDecision {
    match catch_unwind(AssertUnwindSafe(|| handler(event))) {
        Ok(d) => d,
        Err(_) => {
            warn!("wheel_handler_panicked_failing_open");
            WheelDecision::Allow
        }
    }
}

/// The global wheel tap, owning its run-loop thread.
pub struct WheelTap {
    handler: WheelHandler,
    ctrl: Arc<sys::SysControl>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl WheelTap {
    /// Create a wheel tap with the given decision handler; nothing touches
    /// the OS until [`WheelTap::start`].
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&WheelEvent) -> WheelDecision + Send + Sync + 'static,
    {
        Self {
            handler: Arc::new(handler),
            ctrl: Arc::new(sys::SysControl::new()),
            thread: Mutex::new(None),
        }
    }

    /// Install the tap on a dedicated thread. Idempotent.
    pub fn start(&self) -> Result<()> {
        let mut guard = self.thread.lock();
        if guard.is_some() {
            return Ok(());
        }
        let (ready_tx, ready_rx) = crossbeam_channel::bounded(1);
        let handler = self.handler.clone();
        let ctrl = self.ctrl.clone();
        let handle = std::thread::Builder::new()
            .name("wheel-tap".into())
            .spawn(move || {
                let _ = sys::run_wheel_tap(handler, ready_tx, ctrl);
            })
            .map_err(|e| Error::OsError(e.to_string()))?;
        match ready_rx.recv_timeout(START_READY_TIMEOUT) {
            Ok(Ok(())) => {
                *guard = Some(handle);
                Ok(())
            }
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(e)
            }
            Err(_) => Err(Error::TapStart),
        }
    }

    /// Stop the run loop and join the tap thread with a bounded wait.
    /// Idempotent.
    pub fn stop(&self) {
        let handle = self.thread.lock().take();
        if let Some(handle) = handle {
            self.ctrl.stop();
            join_bounded(handle, STOP_JOIN_TIMEOUT);
            debug!("wheel_tap_stopped");
        }
    }
}

impl Drop for WheelTap {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handler_decision_passes_through() {
        let handler: WheelHandler = Arc::new(|ev: &WheelEvent| {
            if ev.delta > 0 {
                WheelDecision::Block
            } else {
                WheelDecision::Allow
            }
        });
        assert_eq!(
            decide_or_allow(&handler, &WheelEvent { delta: 120 }),
            WheelDecision::Block
        );
        assert_eq!(
            decide_or_allow(&handler, &WheelEvent { delta: -120 }),
            WheelDecision::Allow
        );
    }

    #[test]
    fn panicking_handler_fails_open() {
        let handler: WheelHandler = Arc::new(|_: &WheelEvent| panic!("injected fault"));
        assert_eq!(
            decide_or_allow(&handler, &WheelEvent { delta: 120 }),
            WheelDecision::Allow
        );
    }
}
