//! mac-hook: the two CGEvent taps of the interception layer.
//!
//! - [`KeyTap`]: observes KeyDown/KeyUp system-wide, intercepts registered
//!   chords, and emits [`Event`]s over a channel for the dispatcher. A
//!   suppression set allows per-event pass-through while an injection is in
//!   flight, so a translated output that is itself a registered trigger
//!   cannot loop.
//! - [`WheelTap`]: observes every scroll-wheel event and asks a
//!   caller-supplied handler for a [`WheelDecision`]; anything that goes
//!   wrong resolves to Allow (fail-open).
//!
//! Each tap owns a dedicated thread running a CFRunLoop. Events injected by
//! this process (eventmark tag or matching pid) are invisible to both taps.

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
    thread::JoinHandle,
    time::Duration,
};

use crossbeam_channel::{Receiver, Sender, unbounded};
use keyspec::{Chord, Key, Modifier};
use parking_lot::Mutex;
use tracing::debug;

mod error;
mod policy;
mod sys;
mod wheel;

pub use error::{Error, Result};
pub use policy::WheelDecision;
pub use wheel::{NOTCH_DELTA, WheelEvent, WheelTap};

/// How long `stop()` waits for a tap thread to wind down.
const STOP_JOIN_TIMEOUT: Duration = Duration::from_secs(2);

/// How long `start()` waits for the tap to come up before giving up.
const START_READY_TIMEOUT: Duration = Duration::from_secs(5);

/// Key transition kinds delivered to the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Key pressed (possibly an OS auto-repeat).
    KeyDown,
    /// Key released.
    KeyUp,
}

/// One intercepted key event.
#[derive(Debug, Clone)]
pub struct Event {
    /// Registration id that matched.
    pub id: u32,
    /// The registered chord.
    pub chord: Chord,
    /// Down or up.
    pub kind: EventKind,
    /// True for OS auto-repeat KeyDowns.
    pub repeat: bool,
}

/// Registration and suppression state shared with the tap callback.
#[derive(Default)]
pub(crate) struct Inner {
    /// Registration id → chord.
    regs: HashMap<u32, Chord>,
    /// Canonical chord specs currently passed through per-event.
    suppressed: HashSet<String>,
    /// Keys whose KeyDown we dropped; their KeyUp is dropped too so the
    /// foreground app never sees a stray release.
    intercepted_down: HashSet<Key>,
    next_id: u32,
}

impl Inner {
    fn register(&mut self, chord: Chord) -> u32 {
        self.next_id += 1;
        let id = self.next_id;
        self.regs.insert(id, chord);
        id
    }

    fn unregister(&mut self, id: u32) -> Result<()> {
        self.regs.remove(&id).map(|_| ()).ok_or(Error::InvalidId)
    }

    /// Exact chord match: same key, same modifier set.
    pub(crate) fn match_event(&self, key: Key, mods: &HashSet<Modifier>) -> Option<(u32, &Chord)> {
        self.regs
            .iter()
            .find(|(_, c)| c.key == key && c.modifiers == *mods)
            .map(|(id, c)| (*id, c))
    }

    pub(crate) fn is_suppressed(&self, spec: &str) -> bool {
        self.suppressed.contains(spec)
    }

    pub(crate) fn note_intercept_down(&mut self, key: Key) {
        self.intercepted_down.insert(key);
    }

    pub(crate) fn take_intercept_up(&mut self, key: Key) -> bool {
        self.intercepted_down.remove(&key)
    }

    pub(crate) fn intercepting_repeat(&self, key: Key) -> bool {
        self.intercepted_down.contains(&key)
    }
}

/// Shared context handed to the tap callback.
#[derive(Clone)]
pub(crate) struct CallbackCtx {
    pub(crate) inner: Arc<Mutex<Inner>>,
    pub(crate) tx: Sender<Event>,
}

/// The global key tap: registration, suppression, event channel, lifecycle.
pub struct KeyTap {
    ctx: CallbackCtx,
    rx: Receiver<Event>,
    ctrl: Arc<sys::SysControl>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl Default for KeyTap {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyTap {
    /// Create a key tap; nothing touches the OS until [`KeyTap::start`].
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self {
            ctx: CallbackCtx {
                inner: Arc::new(Mutex::new(Inner::default())),
                tx,
            },
            rx,
            ctrl: Arc::new(sys::SysControl::new()),
            thread: Mutex::new(None),
        }
    }

    /// Install the tap on a dedicated thread. Idempotent; returns an error
    /// if the tap cannot be created (missing permission, OS refusal).
    pub fn start(&self) -> Result<()> {
        let mut guard = self.thread.lock();
        if guard.is_some() {
            return Ok(());
        }
        let (ready_tx, ready_rx) = crossbeam_channel::bounded(1);
        let ctx = self.ctx.clone();
        let ctrl = self.ctrl.clone();
        let handle = std::thread::Builder::new()
            .name("key-tap".into())
            .spawn(move || {
                let _ = sys::run_key_tap(ctx, ready_tx, ctrl);
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
            debug!("key_tap_stopped");
        }
    }

    /// Register a chord for interception. Takes effect on the next event.
    pub fn register(&self, chord: Chord) -> u32 {
        self.ctx.inner.lock().register(chord)
    }

    /// Remove a registration.
    pub fn unregister(&self, id: u32) -> Result<()> {
        self.ctx.inner.lock().unregister(id)
    }

    /// Whether `spec` (canonical chord spec) is currently registered.
    pub fn is_registered_spec(&self, spec: &str) -> bool {
        let inner = self.ctx.inner.lock();
        inner.regs.values().any(|c| c.to_spec() == spec)
    }

    /// Pass events matching `spec` through untouched until
    /// [`KeyTap::unsuppress`].
    pub fn suppress(&self, spec: &str) {
        self.ctx.inner.lock().suppressed.insert(spec.to_string());
    }

    /// End a suppression started by [`KeyTap::suppress`].
    pub fn unsuppress(&self, spec: &str) {
        self.ctx.inner.lock().suppressed.remove(spec);
    }

    /// The channel the tap emits intercepted events on.
    pub fn events(&self) -> Receiver<Event> {
        self.rx.clone()
    }
}

impl Drop for KeyTap {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Join a thread, giving up after `timeout` rather than hanging shutdown.
pub(crate) fn join_bounded(handle: JoinHandle<()>, timeout: Duration) {
    let (done_tx, done_rx) = crossbeam_channel::bounded(1);
    std::thread::spawn(move || {
        let _ = handle.join();
        let _ = done_tx.send(());
    });
    let _ = done_rx.recv_timeout(timeout);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chord(spec: &str) -> Chord {
        Chord::parse(spec).expect("chord")
    }

    fn mods(spec: &[Modifier]) -> HashSet<Modifier> {
        spec.iter().copied().collect()
    }

    #[test]
    fn register_match_unregister() {
        let mut inner = Inner::default();
        let id = inner.register(chord("ctrl+d"));

        let hit = inner.match_event(Key::D, &mods(&[Modifier::Control]));
        assert_eq!(hit.map(|(i, _)| i), Some(id));

        // Modifier supersets and subsets do not match.
        assert!(
            inner
                .match_event(Key::D, &mods(&[Modifier::Control, Modifier::Shift]))
                .is_none()
        );
        assert!(inner.match_event(Key::D, &mods(&[])).is_none());

        inner.unregister(id).expect("unregister");
        assert!(inner.match_event(Key::D, &mods(&[Modifier::Control])).is_none());
        assert!(matches!(inner.unregister(id), Err(Error::InvalidId)));
    }

    #[test]
    fn suppression_is_by_canonical_spec() {
        let tap = KeyTap::new();
        tap.register(chord("ctrl+j"));
        assert!(tap.is_registered_spec("ctrl+j"));
        assert!(!tap.is_registered_spec("ctrl+k"));

        tap.suppress("ctrl+j");
        assert!(tap.ctx.inner.lock().is_suppressed("ctrl+j"));
        tap.unsuppress("ctrl+j");
        assert!(!tap.ctx.inner.lock().is_suppressed("ctrl+j"));
    }

    #[test]
    fn intercepted_down_pairs_with_up() {
        let mut inner = Inner::default();
        inner.note_intercept_down(Key::D);
        assert!(inner.intercepting_repeat(Key::D));
        assert!(inner.take_intercept_up(Key::D));
        // Second up for the same key is not ours.
        assert!(!inner.take_intercept_up(Key::D));
    }
}
