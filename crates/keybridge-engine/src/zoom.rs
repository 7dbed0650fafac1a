//! Zoom continuity: one continuous remapped scroll gesture, not N events.
//!
//! While the user turns the wheel under the trigger modifier, the worker
//! owns the keyboard: it releases the trigger modifier, holds the output
//! modifier, and replays buffered wheel deltas as synthetic ticks. Once the
//! output modifier is physically down, further ticks pass through natively
//! (the OS scrolls more smoothly than a re-synthesized stream would). A
//! sticky window keeps the session alive across momentary gaps in wheel
//! motion; when it lapses with an empty buffer the worker restores the
//! modifiers — the output up, the trigger back to wherever the user's hand
//! actually has it.

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
    time::{Duration, Instant},
};

use keyspec::Gesture;
use mac_hook::{NOTCH_DELTA, WheelDecision};
use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::{
    deps::InjectApi,
    mapper::MappingLookup,
    state::{ContextCell, LookupCell},
    ZOOM_DRAIN_INTERVAL, ZOOM_IDLE_POLL, ZOOM_SWITCH_DELAY,
};

/// Inputs to the per-event gesture decision, gathered by the wheel hook.
#[derive(Debug, Clone, Copy)]
pub(crate) struct GestureInputs {
    /// The trigger modifier is physically held.
    pub(crate) trigger_down: bool,
    /// The output modifier is physically held (the worker has switched).
    pub(crate) output_down: bool,
    /// The last qualifying event was recent enough to keep the session.
    pub(crate) sticky: bool,
    /// A session is in progress.
    pub(crate) session_active: bool,
}

/// What to do with one wheel event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Verdict {
    /// Not a gesture event: let it through untouched.
    Pass,
    /// Session running with the output modifier down: native handling.
    Passthrough,
    /// Session starting or running pre-switch: buffer the delta, block.
    Buffer,
}

/// The gesture state machine, per event.
pub(crate) fn classify(inputs: GestureInputs) -> Verdict {
    if !inputs.trigger_down && !inputs.sticky && !inputs.session_active {
        return Verdict::Pass;
    }
    if inputs.output_down {
        Verdict::Passthrough
    } else {
        Verdict::Buffer
    }
}

#[derive(Default)]
struct Session {
    active: bool,
    /// (trigger, output) modifier pair this session switches between.
    pair: Option<(keyspec::Modifier, keyspec::Modifier)>,
    /// Accumulated, unflushed delta in notch-normalized units.
    buffer: i64,
    last_activity: Option<Instant>,
}

/// Session state shared between the wheel hook and the worker.
///
/// The hook writes only the buffer, the activity timestamp, and the active
/// flag, and holds the lock just long enough to do so; it never sleeps or
/// injects.
pub(crate) struct ZoomShared {
    session: Mutex<Session>,
    sticky_window: Duration,
}

impl ZoomShared {
    pub(crate) fn new(sticky_window: Duration) -> Self {
        Self {
            session: Mutex::new(Session::default()),
            sticky_window,
        }
    }

    /// Hook side: apply the state machine to one wheel event.
    pub(crate) fn on_wheel(
        &self,
        trigger: keyspec::Modifier,
        output: keyspec::Modifier,
        trigger_down: bool,
        output_down: bool,
        delta: i64,
        now: Instant,
    ) -> WheelDecision {
        let mut s = self.session.lock();
        let sticky = s
            .last_activity
            .is_some_and(|t| now.duration_since(t) < self.sticky_window);
        let verdict = classify(GestureInputs {
            trigger_down,
            output_down,
            sticky,
            session_active: s.active,
        });
        trace!(?verdict, delta, sticky, "wheel_gesture_event");
        match verdict {
            Verdict::Pass => WheelDecision::Allow,
            Verdict::Passthrough => {
                s.last_activity = Some(now);
                WheelDecision::Allow
            }
            Verdict::Buffer => {
                s.buffer += delta;
                s.active = true;
                s.pair = Some((trigger, output));
                s.last_activity = Some(now);
                WheelDecision::Block
            }
        }
    }

    /// Worker side: the session's modifier pair, when one is active.
    fn active_pair(&self) -> Option<(keyspec::Modifier, keyspec::Modifier)> {
        let s = self.session.lock();
        if s.active { s.pair } else { None }
    }

    /// Worker side: read and zero the buffer.
    fn take_buffer(&self) -> i64 {
        let mut s = self.session.lock();
        std::mem::take(&mut s.buffer)
    }

    /// Worker side: true once the sticky window has lapsed.
    fn idle_expired(&self, now: Instant) -> bool {
        let s = self.session.lock();
        s.last_activity
            .is_none_or(|t| now.duration_since(t) >= self.sticky_window)
    }

    fn deactivate(&self) {
        let mut s = self.session.lock();
        s.active = false;
    }

    /// Worker side: clear any residue after a session's teardown.
    fn reset_buffer(&self) {
        let mut s = self.session.lock();
        s.buffer = 0;
    }

    #[cfg(test)]
    fn buffered(&self) -> i64 {
        self.session.lock().buffer
    }
}

/// Find the wheel rule in the live table and parse both sides.
///
/// Malformed specs make the rule unusable, which reads as "no rule": the
/// event is allowed rather than half-handled.
fn gesture_rule(table: &MappingLookup) -> Option<(Gesture, Gesture)> {
    table.iter().find_map(|(trigger, binding)| {
        if !keyspec::is_gesture_spec(trigger) {
            return None;
        }
        Some((
            Gesture::parse(trigger)?,
            Gesture::parse(&binding.output)?,
        ))
    })
}

/// The wheel hook's decision procedure, fail-open by construction: every
/// early exit is Allow.
pub(crate) fn decide_wheel(
    context: &ContextCell,
    lookup: &LookupCell,
    injector: &Arc<dyn InjectApi>,
    zoom: &ZoomShared,
    delta: i64,
    now: Instant,
) -> WheelDecision {
    if context.current().is_none() {
        return WheelDecision::Allow;
    }
    let table = lookup.snapshot();
    let Some((trigger, output)) = gesture_rule(&table) else {
        return WheelDecision::Allow;
    };
    let trigger_down = injector.modifier_down(trigger.modifier);
    let output_down = injector.modifier_down(output.modifier);
    zoom.on_wheel(
        trigger.modifier,
        output.modifier,
        trigger_down,
        output_down,
        delta,
        now,
    )
}

/// One full session: switch modifiers, drain until the sticky window
/// lapses with an empty buffer, then restore. Returns false when no
/// session was pending.
fn service_session(
    shared: &ZoomShared,
    injector: &Arc<dyn InjectApi>,
    running: &AtomicBool,
) -> bool {
    let Some((trigger, output)) = shared.active_pair() else {
        return false;
    };
    debug!(
        trigger = %trigger.to_spec(),
        output = %output.to_spec(),
        "zoom_session_start"
    );
    injector.set_modifier(trigger, false);
    thread::sleep(ZOOM_SWITCH_DELAY);
    injector.set_modifier(output, true);
    thread::sleep(ZOOM_SWITCH_DELAY);

    // Fractional notches carry across drains; the buffer itself is only
    // ever zeroed by being read.
    let mut carry = 0.0_f64;
    while running.load(Ordering::Relaxed) {
        let delta = shared.take_buffer();
        if delta != 0 {
            carry += delta as f64 / NOTCH_DELTA as f64;
            let whole = carry.trunc();
            if whole != 0.0 {
                injector.scroll_lines(whole as i32);
                carry -= whole;
            }
            thread::sleep(ZOOM_DRAIN_INTERVAL);
        } else if shared.idle_expired(Instant::now()) {
            shared.deactivate();
            break;
        } else {
            thread::sleep(ZOOM_DRAIN_INTERVAL);
        }
    }

    injector.set_modifier(output, false);
    thread::sleep(ZOOM_SWITCH_DELAY);
    // The trigger goes back to wherever the user's hand actually has it.
    let physically_down = injector.modifier_down(trigger);
    injector.set_modifier(trigger, physically_down);
    shared.reset_buffer();
    debug!("zoom_session_end");
    true
}

/// The worker loop: idles until a session activates, services it, repeats.
pub(crate) fn run_zoom_worker(
    shared: Arc<ZoomShared>,
    injector: Arc<dyn InjectApi>,
    running: Arc<AtomicBool>,
) {
    debug!("zoom_worker_started");
    while running.load(Ordering::Relaxed) {
        if !service_session(&shared, &injector, &running) {
            thread::sleep(ZOOM_IDLE_POLL);
        }
    }
    debug!("zoom_worker_stopped");
}
