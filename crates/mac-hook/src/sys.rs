//! macOS event tap (CoreGraphics) integration.
//!
//! Both taps use the `core-graphics` `CGEventTap`, whose `CallbackResult`
//! maps `Drop` to a NULL `CGEventRef` at the C boundary. CoreGraphics only
//! suppresses delivery for a NULL return, so `Drop` is the one correct way
//! to swallow an event before the foreground app sees it.

use std::{
    ffi::c_void,
    process,
    sync::{
        Arc,
        atomic::{AtomicPtr, Ordering},
    },
};

use core_foundation::{
    base::TCFType,
    mach_port::CFMachPortRef,
    runloop::{CFRunLoop, kCFRunLoopCommonModes},
};
use core_graphics::event::{self as cge, CallbackResult};
use crossbeam_channel::Sender;
use keyspec::modifiers_from_cg_flags;
use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::{
    CallbackCtx, Event, EventKind, policy,
    wheel::{self, WheelEvent, WheelHandler},
};

#[cfg_attr(target_os = "macos", link(name = "CoreGraphics", kind = "framework"))]
unsafe extern "C" {
    fn CGEventTapEnable(tap: CFMachPortRef, enable: bool);
}

// Minimal subset of CGEventField constants used by this module.
const FIELD_EVENT_SOURCE_UNIX_PROCESS_ID: u32 = 41;
const FIELD_EVENT_SOURCE_USER_DATA: u32 = 42;
const FIELD_KEYBOARD_EVENT_AUTOREPEAT: u32 = 8;
const FIELD_KEYBOARD_EVENT_KEYCODE: u32 = 9;
const FIELD_SCROLL_WHEEL_DELTA_AXIS1: u32 = 11;
const FIELD_SCROLL_WHEEL_DELTA_AXIS2: u32 = 12;

// Shared control handle to stop a run loop from other threads.
pub(crate) struct SysControl {
    rl: Mutex<Option<CFRunLoop>>,
}

impl SysControl {
    pub(crate) fn new() -> Self {
        Self {
            rl: Mutex::new(None),
        }
    }

    fn set_rl(&self, rl: CFRunLoop) {
        let mut g = self.rl.lock();
        *g = Some(rl);
    }

    pub(crate) fn stop(&self) {
        let mut g = self.rl.lock();
        if let Some(rl) = g.take() {
            rl.stop();
        }
    }
}

/// True when the event was synthesized by this process and must be invisible
/// to the taps.
fn is_own_event(event: &cge::CGEvent) -> bool {
    let user_tag = event.get_integer_value_field(FIELD_EVENT_SOURCE_USER_DATA);
    let src_pid = event.get_integer_value_field(FIELD_EVENT_SOURCE_UNIX_PROCESS_ID) as u32;
    eventmark::is_marked(user_tag) || src_pid == process::id()
}

/// Run the key tap event loop on the current thread until stopped.
pub(crate) fn run_key_tap(
    cb_ctx: CallbackCtx,
    ready: Sender<crate::Result<()>>,
    ctrl: Arc<SysControl>,
) -> crate::Result<()> {
    if !permissions::input_monitoring_ok() {
        warn!("input_monitoring_permission_missing");
        let _ = ready.send(Err(crate::Error::PermissionDenied("Input Monitoring")));
        return Err(crate::Error::PermissionDenied("Input Monitoring"));
    }

    // Capture for re-enabling the tap from inside the closure.
    let tap_port_ptr: Arc<AtomicPtr<c_void>> = Arc::new(AtomicPtr::new(std::ptr::null_mut()));

    debug!("creating_key_tap");
    let tap_port_ptr_cb = tap_port_ptr.clone();
    let tap = match cge::CGEventTap::new(
        cge::CGEventTapLocation::HID,
        cge::CGEventTapPlacement::HeadInsertEventTap,
        cge::CGEventTapOptions::Default,
        vec![cge::CGEventType::KeyDown, cge::CGEventType::KeyUp],
        move |_proxy, etype, event| {
            if is_own_event(event) {
                trace!("ignoring_synthetic_key_event");
                return CallbackResult::Keep;
            }
            match etype {
                cge::CGEventType::KeyDown | cge::CGEventType::KeyUp => {
                    key_event(&cb_ctx, etype, event)
                }
                cge::CGEventType::TapDisabledByTimeout
                | cge::CGEventType::TapDisabledByUserInput => {
                    reenable(&tap_port_ptr_cb);
                    CallbackResult::Keep
                }
                _ => CallbackResult::Keep,
            }
        },
    ) {
        Ok(t) => t,
        Err(_) => {
            warn!("key_tap_create_failed");
            let _ = ready.send(Err(crate::Error::TapStart));
            return Err(crate::Error::TapStart);
        }
    };

    serve_tap(&tap, &tap_port_ptr, ready, &ctrl, "key")
}

/// Handle one key transition. Must stay cheap: this runs on the tap thread
/// for every keystroke on the system.
fn key_event(
    cb_ctx: &CallbackCtx,
    etype: cge::CGEventType,
    event: &cge::CGEvent,
) -> CallbackResult {
    let keycode = event.get_integer_value_field(FIELD_KEYBOARD_EVENT_KEYCODE) as u16;
    let Some(code) = keyspec::Key::from_code(keycode) else {
        return CallbackResult::Keep;
    };
    let mods = modifiers_from_cg_flags(event.get_flags().bits());

    let mut inner = cb_ctx.inner.lock();
    if matches!(etype, cge::CGEventType::KeyUp) {
        return if inner.take_intercept_up(code) {
            trace!(?code, "intercepting_key_up");
            CallbackResult::Drop
        } else {
            CallbackResult::Keep
        };
    }

    let is_repeat = event.get_integer_value_field(FIELD_KEYBOARD_EVENT_AUTOREPEAT) != 0;
    let matched = inner.match_event(code, &mods).map(|(id, c)| (id, c.clone()));
    let suppressed = matched
        .as_ref()
        .is_some_and(|(_, c)| inner.is_suppressed(&c.to_spec()));
    let decision = policy::classify(matched.is_some(), suppressed, is_repeat);

    trace!(
        scancode = keycode,
        ?code,
        ?mods,
        is_repeat,
        matched = matched.is_some(),
        suppressed,
        "key_tap_event"
    );

    let mut intercept = decision.intercept;
    if intercept {
        inner.note_intercept_down(code);
    } else if is_repeat && inner.intercepting_repeat(code) {
        // The initial down was dropped; its repeats are dropped too even if
        // a suppression started in between.
        intercept = true;
    }

    if decision.emit
        && let Some((id, chord)) = matched
    {
        let ev = Event {
            id,
            chord,
            kind: EventKind::KeyDown,
            repeat: is_repeat,
        };
        let _ = cb_ctx.tx.send(ev);
    }

    if intercept {
        trace!("intercepting_key_event");
        CallbackResult::Drop
    } else {
        CallbackResult::Keep
    }
}

/// Run the wheel tap event loop on the current thread until stopped.
pub(crate) fn run_wheel_tap(
    handler: WheelHandler,
    ready: Sender<crate::Result<()>>,
    ctrl: Arc<SysControl>,
) -> crate::Result<()> {
    if !permissions::input_monitoring_ok() {
        warn!("input_monitoring_permission_missing");
        let _ = ready.send(Err(crate::Error::PermissionDenied("Input Monitoring")));
        return Err(crate::Error::PermissionDenied("Input Monitoring"));
    }

    let tap_port_ptr: Arc<AtomicPtr<c_void>> = Arc::new(AtomicPtr::new(std::ptr::null_mut()));

    debug!("creating_wheel_tap");
    let tap_port_ptr_cb = tap_port_ptr.clone();
    let tap = match cge::CGEventTap::new(
        cge::CGEventTapLocation::HID,
        cge::CGEventTapPlacement::HeadInsertEventTap,
        cge::CGEventTapOptions::Default,
        vec![cge::CGEventType::ScrollWheel],
        move |_proxy, etype, event| {
            match etype {
                cge::CGEventType::ScrollWheel => {}
                cge::CGEventType::TapDisabledByTimeout
                | cge::CGEventType::TapDisabledByUserInput => {
                    reenable(&tap_port_ptr_cb);
                    return CallbackResult::Keep;
                }
                // Fast-reject anything else with zero work.
                _ => return CallbackResult::Keep,
            }
            if is_own_event(event) {
                trace!("ignoring_synthetic_wheel_event");
                return CallbackResult::Keep;
            }

            let mut raw = event.get_integer_value_field(FIELD_SCROLL_WHEEL_DELTA_AXIS1);
            if raw == 0 {
                raw = event.get_integer_value_field(FIELD_SCROLL_WHEEL_DELTA_AXIS2);
            }
            let ev = WheelEvent {
                delta: raw * wheel::NOTCH_DELTA,
            };
            match wheel::decide_or_allow(&handler, &ev) {
                crate::WheelDecision::Allow => CallbackResult::Keep,
                crate::WheelDecision::Block => {
                    trace!(delta = ev.delta, "blocking_wheel_event");
                    CallbackResult::Drop
                }
            }
        },
    ) {
        Ok(t) => t,
        Err(_) => {
            warn!("wheel_tap_create_failed");
            let _ = ready.send(Err(crate::Error::TapStart));
            return Err(crate::Error::TapStart);
        }
    };

    serve_tap(&tap, &tap_port_ptr, ready, &ctrl, "wheel")
}

/// Publish the tap's mach port, attach it to this thread's run loop, and
/// run until stopped.
fn serve_tap(
    tap: &cge::CGEventTap<'_>,
    tap_port_ptr: &Arc<AtomicPtr<c_void>>,
    ready: Sender<crate::Result<()>>,
    ctrl: &SysControl,
    label: &str,
) -> crate::Result<()> {
    tap_port_ptr.store(
        tap.mach_port().as_concrete_TypeRef() as *mut c_void,
        Ordering::SeqCst,
    );

    let source = match tap.mach_port().create_runloop_source(0) {
        Ok(s) => s,
        Err(_) => {
            warn!(label, "run_loop_source_create_failed");
            let _ = ready.send(Err(crate::Error::TapStart));
            return Err(crate::Error::TapStart);
        }
    };

    let rl = CFRunLoop::get_current();
    ctrl.set_rl(rl.clone());
    let mode = unsafe { kCFRunLoopCommonModes };
    rl.add_source(&source, mode);

    tap.enable();

    let _ = ready.send(Ok(()));
    debug!(label, "tap_started_run_loop");

    CFRunLoop::run_current();

    debug!(label, "tap_exited");
    Ok(())
}

/// Turn the tap back on after the OS disabled it (timeout or user input).
fn reenable(tap_port_ptr: &Arc<AtomicPtr<c_void>>) {
    let p = tap_port_ptr.load(Ordering::SeqCst) as CFMachPortRef;
    if !p.is_null() {
        warn!("tap_disabled_by_os_reenabling");
        unsafe { CGEventTapEnable(p, true) };
    }
}
