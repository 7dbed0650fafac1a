//! Synthesizes the translated input: key combos and wheel ticks.
//!
//! An [`Injector`] posts a combo as a structured sequence — modifiers down
//! in canonical order, key tap, modifiers up in reverse — with short fixed
//! delays so downstream applications see distinct transitions. Afterwards it
//! queries the *physical* state of control, shift, and option from the HID
//! system and forces each back to exactly that state: the user's hand may
//! still be holding the trigger chord at the moment of synthesis, and
//! without the repair step the synthetic releases would strand the session
//! modifier state away from physical reality.
//!
//! Every posted event carries the [`eventmark`] tag so the observation taps
//! ignore it. Injection never propagates errors into the hook pipeline:
//! a failed structured sequence degrades to a single flags-carrying event,
//! and a failure of that is logged and swallowed.
#![warn(missing_docs)]
#![warn(unsafe_op_in_unsafe_fn)]

use std::{sync::Arc, thread, time::Duration};

use core_graphics::{
    event as cge,
    event_source::{CGEventSource, CGEventSourceStateID},
};
use keyspec::{Chord, Modifier};
use tracing::{trace, warn};

mod error;
mod sys;

pub use error::{Error, Result};

/// Delay between injection steps. Three steps keep the full sequence well
/// under the 50 ms latency budget.
const STEP_DELAY: Duration = Duration::from_millis(10);

/// The modifiers whose physical state is repaired after every injection.
const RESTORED_MODIFIERS: [Modifier; 3] = [Modifier::Control, Modifier::Shift, Modifier::Option];

pub(crate) trait Poster: Send + Sync {
    /// Post a down/up transition for a single hardware keycode.
    fn post_key(&self, code: u16, down: bool) -> Result<()>;
    /// Post the whole chord as one flags-carrying event pair (fallback path).
    fn post_combo(&self, chord: &Chord) -> Result<()>;
    /// Post `lines` wheel lines as one scroll event.
    fn post_scroll(&self, lines: i32) -> Result<()>;
    /// Physical (HID) down state for a modifier.
    fn physical_down(&self, modifier: Modifier) -> bool;
}

struct MacPoster;

impl MacPoster {
    fn source() -> Result<CGEventSource> {
        CGEventSource::new(CGEventSourceStateID::HIDSystemState).map_err(|_| {
            if !permissions::accessibility_ok() {
                warn!("accessibility_permission_missing_for_event_source");
                Error::PermissionDenied("Accessibility")
            } else {
                Error::EventSource
            }
        })
    }

    fn mark_and_post(event: &cge::CGEvent) {
        event.set_integer_value_field(cge::EventField::EVENT_SOURCE_USER_DATA, eventmark::MARK);
        event.post(cge::CGEventTapLocation::HID);
    }
}

impl Poster for MacPoster {
    fn post_key(&self, code: u16, down: bool) -> Result<()> {
        let source = Self::source()?;
        let event = cge::CGEvent::new_keyboard_event(source, cge::CGKeyCode::from(code), down)
            .map_err(|_| Error::EventCreate)?;
        Self::mark_and_post(&event);
        trace!(code, down, "posted_key");
        Ok(())
    }

    fn post_combo(&self, chord: &Chord) -> Result<()> {
        let code = cge::CGKeyCode::from(chord.key.code());
        let flags = cge::CGEventFlags::from_bits_retain(chord.flag_bits());
        for down in [true, false] {
            let source = Self::source()?;
            let event = cge::CGEvent::new_keyboard_event(source, code, down)
                .map_err(|_| Error::EventCreate)?;
            event.set_flags(flags);
            Self::mark_and_post(&event);
        }
        trace!(combo = %chord, "posted_combo_event");
        Ok(())
    }

    fn post_scroll(&self, lines: i32) -> Result<()> {
        let source = Self::source()?;
        let event = cge::CGEvent::new_scroll_event(source, cge::ScrollEventUnit::LINE, 1, lines, 0, 0)
            .map_err(|_| Error::EventCreate)?;
        Self::mark_and_post(&event);
        trace!(lines, "posted_scroll");
        Ok(())
    }

    fn physical_down(&self, modifier: Modifier) -> bool {
        sys::hid_key_down(modifier.code())
    }
}

/// Posts synthesized input to the system, repairing modifier state after
/// each combo.
#[derive(Clone)]
pub struct Injector {
    poster: Arc<dyn Poster>,
    /// Skip inter-step sleeps (tests).
    paced: bool,
}

impl Default for Injector {
    fn default() -> Self {
        Self::new()
    }
}

impl Injector {
    /// Create an injector posting real HID events.
    pub fn new() -> Self {
        Self {
            poster: Arc::new(MacPoster),
            paced: true,
        }
    }

    /// Test helper to inject a custom poster.
    #[cfg(test)]
    fn new_with_poster(poster: Arc<dyn Poster>) -> Self {
        Self {
            poster,
            paced: false,
        }
    }

    fn pace(&self) {
        if self.paced {
            thread::sleep(STEP_DELAY);
        }
    }

    /// Synthesize `combo` (e.g. `"ctrl+j"`), then repair modifier state.
    ///
    /// Failures never escape: a failed structured sequence falls back to a
    /// single best-effort event, and a total failure is logged only.
    pub fn inject(&self, combo: &str) {
        let Some(chord) = Chord::parse(combo) else {
            warn!(combo, "unparsable_combo_not_injected");
            return;
        };
        if let Err(e) = self.inject_chord(&chord) {
            warn!(combo, error = %e, "structured_injection_failed_falling_back");
            if let Err(e) = self.poster.post_combo(&chord) {
                warn!(combo, error = %e, "fallback_injection_failed");
            }
        }
    }

    fn inject_chord(&self, chord: &Chord) -> Result<()> {
        let mods = chord.ordered_modifiers();
        for m in &mods {
            self.poster.post_key(m.code(), true)?;
        }
        self.pace();
        self.poster.post_key(chord.key.code(), true)?;
        self.pace();
        self.poster.post_key(chord.key.code(), false)?;
        self.pace();
        for m in mods.iter().rev() {
            self.poster.post_key(m.code(), false)?;
        }
        self.restore_modifiers();
        Ok(())
    }

    /// Force control, shift, and option back to their physical state.
    ///
    /// Also used by the gesture worker when tearing a session down.
    pub fn restore_modifiers(&self) {
        for m in RESTORED_MODIFIERS {
            let down = self.poster.physical_down(m);
            if let Err(e) = self.poster.post_key(m.code(), down) {
                warn!(modifier = %m.to_spec(), error = %e, "modifier_restore_failed");
            }
        }
    }

    /// Post a down or up transition for one modifier key.
    pub fn set_modifier(&self, modifier: Modifier, down: bool) {
        if let Err(e) = self.poster.post_key(modifier.code(), down) {
            warn!(modifier = %modifier.to_spec(), down, error = %e, "modifier_post_failed");
        }
    }

    /// Physical (HID) down state for a modifier.
    pub fn modifier_physically_down(&self, modifier: Modifier) -> bool {
        self.poster.physical_down(modifier)
    }

    /// Emit `lines` synthetic wheel lines (positive scrolls up).
    pub fn scroll_lines(&self, lines: i32) {
        if lines == 0 {
            return;
        }
        if let Err(e) = self.poster.post_scroll(lines) {
            warn!(lines, error = %e, "scroll_injection_failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::HashSet, sync::Mutex};

    use keyspec::Key;

    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Op {
        Key(u16, bool),
        Combo(Key),
        Scroll(i32),
    }

    #[derive(Default)]
    struct RecordingPoster {
        ops: Mutex<Vec<Op>>,
        held: Mutex<HashSet<Modifier>>,
        fail_keys: bool,
    }

    impl RecordingPoster {
        fn ops(&self) -> Vec<Op> {
            self.ops.lock().unwrap().clone()
        }
        fn hold(&self, m: Modifier) {
            self.held.lock().unwrap().insert(m);
        }
    }

    impl Poster for RecordingPoster {
        fn post_key(&self, code: u16, down: bool) -> Result<()> {
            if self.fail_keys {
                return Err(Error::EventCreate);
            }
            self.ops.lock().unwrap().push(Op::Key(code, down));
            Ok(())
        }
        fn post_combo(&self, chord: &Chord) -> Result<()> {
            self.ops.lock().unwrap().push(Op::Combo(chord.key));
            Ok(())
        }
        fn post_scroll(&self, lines: i32) -> Result<()> {
            self.ops.lock().unwrap().push(Op::Scroll(lines));
            Ok(())
        }
        fn physical_down(&self, modifier: Modifier) -> bool {
            self.held.lock().unwrap().contains(&modifier)
        }
    }

    const CTRL: u16 = 0x3B;
    const SHIFT: u16 = 0x38;
    const OPT: u16 = 0x3A;

    #[test]
    fn structured_sequence_and_ordering() {
        let poster = Arc::new(RecordingPoster::default());
        let inj = Injector::new_with_poster(poster.clone());
        inj.inject("ctrl+shift+z");

        let z = Key::Z.code();
        let ops = poster.ops();
        // Press order ctrl, shift; release order shift, ctrl; then the
        // restore pass forces all three standard modifiers up.
        assert_eq!(
            ops,
            vec![
                Op::Key(CTRL, true),
                Op::Key(SHIFT, true),
                Op::Key(z, true),
                Op::Key(z, false),
                Op::Key(SHIFT, false),
                Op::Key(CTRL, false),
                Op::Key(CTRL, false),
                Op::Key(SHIFT, false),
                Op::Key(OPT, false),
            ]
        );
    }

    #[test]
    fn restore_represses_physically_held_modifier() {
        let poster = Arc::new(RecordingPoster::default());
        poster.hold(Modifier::Control);
        let inj = Injector::new_with_poster(poster.clone());
        inj.inject("ctrl+j");

        let ops = poster.ops();
        // The tail of the sequence must put ctrl back down because the
        // physical key is still held.
        assert_eq!(
            &ops[ops.len() - 3..],
            &[
                Op::Key(CTRL, true),
                Op::Key(SHIFT, false),
                Op::Key(OPT, false),
            ]
        );
    }

    #[test]
    fn failed_sequence_falls_back_to_single_event() {
        let poster = Arc::new(RecordingPoster {
            fail_keys: true,
            ..Default::default()
        });
        let inj = Injector::new_with_poster(poster.clone());
        inj.inject("ctrl+j");
        assert_eq!(poster.ops(), vec![Op::Combo(Key::J)]);
    }

    #[test]
    fn unparsable_combo_posts_nothing() {
        let poster = Arc::new(RecordingPoster::default());
        let inj = Injector::new_with_poster(poster.clone());
        inj.inject("ctrl+notakey");
        assert!(poster.ops().is_empty());
    }

    #[test]
    fn zero_scroll_is_elided() {
        let poster = Arc::new(RecordingPoster::default());
        let inj = Injector::new_with_poster(poster.clone());
        inj.scroll_lines(0);
        inj.scroll_lines(-3);
        assert_eq!(poster.ops(), vec![Op::Scroll(-3)]);
    }
}
