//! API abstractions over the hook and injection layers.
//!
//! The engine's logic is exercised in tests against mock implementations;
//! the real ones are thin wrappers over `mac-hook` and `synthkey`.

use std::sync::Arc;

use keyspec::{Chord, Modifier};

/// Minimal key-tap API used by the trigger registry.
pub trait HookApi: Send + Sync {
    /// Register a chord for interception; returns the registration id.
    fn register(&self, chord: Chord) -> u32;
    /// Remove a registration.
    fn unregister(&self, id: u32) -> mac_hook::Result<()>;
    /// Pass events for `spec` through untouched until unsuppressed.
    fn suppress(&self, spec: &str);
    /// End a suppression.
    fn unsuppress(&self, spec: &str);
}

/// Minimal injection API used by the dispatcher and the gesture worker.
pub trait InjectApi: Send + Sync {
    /// Synthesize a combo, repairing modifier state afterwards.
    fn inject(&self, combo: &str);
    /// Post a down/up transition for one modifier key.
    fn set_modifier(&self, modifier: Modifier, down: bool);
    /// Physical (HID) down state for a modifier.
    fn modifier_down(&self, modifier: Modifier) -> bool;
    /// Emit synthetic wheel lines.
    fn scroll_lines(&self, lines: i32);
}

/// Real key-tap wrapper.
pub(crate) struct RealHookApi {
    inner: Arc<mac_hook::KeyTap>,
}

impl RealHookApi {
    pub(crate) fn new(inner: Arc<mac_hook::KeyTap>) -> Self {
        Self { inner }
    }
}

impl HookApi for RealHookApi {
    fn register(&self, chord: Chord) -> u32 {
        self.inner.register(chord)
    }
    fn unregister(&self, id: u32) -> mac_hook::Result<()> {
        self.inner.unregister(id)
    }
    fn suppress(&self, spec: &str) {
        self.inner.suppress(spec);
    }
    fn unsuppress(&self, spec: &str) {
        self.inner.unsuppress(spec);
    }
}

/// Real injector wrapper.
pub(crate) struct RealInjectApi {
    inner: synthkey::Injector,
}

impl RealInjectApi {
    pub(crate) fn new(inner: synthkey::Injector) -> Self {
        Self { inner }
    }
}

impl InjectApi for RealInjectApi {
    fn inject(&self, combo: &str) {
        self.inner.inject(combo);
    }
    fn set_modifier(&self, modifier: Modifier, down: bool) {
        self.inner.set_modifier(modifier, down);
    }
    fn modifier_down(&self, modifier: Modifier) -> bool {
        self.inner.modifier_physically_down(modifier)
    }
    fn scroll_lines(&self, lines: i32) {
        self.inner.scroll_lines(lines);
    }
}
