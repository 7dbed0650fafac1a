//! Mock hook and injection implementations for engine tests.

use std::{
    collections::{HashMap, HashSet},
    sync::atomic::{AtomicU32, Ordering},
};

use keyspec::{Chord, Modifier};
use parking_lot::Mutex;

use crate::deps::{HookApi, InjectApi};

/// Records registrations and suppressions instead of touching a tap.
#[derive(Default)]
pub(crate) struct MockHook {
    regs: Mutex<HashMap<u32, Chord>>,
    next: AtomicU32,
    register_counts: Mutex<HashMap<String, usize>>,
    /// Ordered log of suppress/unsuppress/inject-visible operations.
    log: Mutex<Vec<String>>,
}

impl MockHook {
    /// Canonical specs currently registered, sorted.
    pub(crate) fn registered(&self) -> Vec<String> {
        let mut specs: Vec<String> = self.regs.lock().values().map(Chord::to_spec).collect();
        specs.sort();
        specs
    }

    /// How many times `spec` was registered over the mock's lifetime.
    pub(crate) fn register_calls(&self, spec: &str) -> usize {
        self.register_counts.lock().get(spec).copied().unwrap_or(0)
    }

    pub(crate) fn note(&self, entry: String) {
        self.log.lock().push(entry);
    }

    pub(crate) fn log(&self) -> Vec<String> {
        self.log.lock().clone()
    }
}

impl HookApi for MockHook {
    fn register(&self, chord: Chord) -> u32 {
        let id = self.next.fetch_add(1, Ordering::SeqCst) + 1;
        *self
            .register_counts
            .lock()
            .entry(chord.to_spec())
            .or_insert(0) += 1;
        self.regs.lock().insert(id, chord);
        id
    }

    fn unregister(&self, id: u32) -> mac_hook::Result<()> {
        self.regs
            .lock()
            .remove(&id)
            .map(|_| ())
            .ok_or(mac_hook::Error::InvalidId)
    }

    fn suppress(&self, spec: &str) {
        self.note(format!("suppress {spec}"));
    }

    fn unsuppress(&self, spec: &str) {
        self.note(format!("unsuppress {spec}"));
    }
}

/// Records injected combos, modifier transitions, and scroll totals.
#[derive(Default)]
pub(crate) struct MockInject {
    held: Mutex<HashSet<Modifier>>,
    combos: Mutex<Vec<String>>,
    modifier_ops: Mutex<Vec<(Modifier, bool)>>,
    scrolled: Mutex<i64>,
    /// Shared op log interleaving injections with hook operations.
    pub(crate) shared_log: Mutex<Option<std::sync::Arc<MockHook>>>,
}

impl MockInject {
    /// Mark a modifier as physically held.
    pub(crate) fn hold(&self, m: Modifier) {
        self.held.lock().insert(m);
    }

    pub(crate) fn injected(&self) -> Vec<String> {
        self.combos.lock().clone()
    }

    pub(crate) fn modifier_ops(&self) -> Vec<(Modifier, bool)> {
        self.modifier_ops.lock().clone()
    }

    pub(crate) fn total_scrolled(&self) -> i64 {
        *self.scrolled.lock()
    }

    /// Interleave injections into `hook`'s op log (for ordering tests).
    pub(crate) fn mirror_into(&self, hook: std::sync::Arc<MockHook>) {
        *self.shared_log.lock() = Some(hook);
    }
}

impl InjectApi for MockInject {
    fn inject(&self, combo: &str) {
        if let Some(hook) = self.shared_log.lock().as_ref() {
            hook.note(format!("inject {combo}"));
        }
        self.combos.lock().push(combo.to_string());
    }

    fn set_modifier(&self, modifier: Modifier, down: bool) {
        self.modifier_ops.lock().push((modifier, down));
    }

    fn modifier_down(&self, modifier: Modifier) -> bool {
        self.held.lock().contains(&modifier)
    }

    fn scroll_lines(&self, lines: i32) {
        *self.scrolled.lock() += i64::from(lines);
    }
}
