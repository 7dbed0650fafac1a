//! Trigger registration bookkeeping over the key tap.

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use keyspec::Chord;
use tracing::{debug, trace, warn};

use crate::deps::HookApi;

/// Maintains the set of registered key triggers, keyed by canonical chord
/// spec, and brackets injections with suppressions.
pub(crate) struct TriggerRegistry {
    api: Arc<dyn HookApi>,
    /// Canonical spec → registration id.
    ids: HashMap<String, u32>,
}

impl TriggerRegistry {
    pub(crate) fn new(api: Arc<dyn HookApi>) -> Self {
        Self {
            api,
            ids: HashMap::new(),
        }
    }

    /// Replace the registered set with `desired`, incrementally: triggers
    /// already registered stay untouched so there is no interception gap.
    pub(crate) fn update(&mut self, desired: Vec<Chord>) {
        let want: HashMap<String, Chord> =
            desired.into_iter().map(|c| (c.to_spec(), c)).collect();
        let want_specs: HashSet<&String> = want.keys().collect();

        let stale: Vec<String> = self
            .ids
            .keys()
            .filter(|spec| !want_specs.contains(spec))
            .cloned()
            .collect();
        for spec in stale {
            if let Some(id) = self.ids.remove(&spec) {
                if let Err(e) = self.api.unregister(id) {
                    warn!(spec = %spec, error = %e, "unregister_failed");
                }
                trace!(spec = %spec, "trigger_unregistered");
            }
        }

        let mut added = 0usize;
        let mut pairs: Vec<(String, Chord)> = want.into_iter().collect();
        pairs.sort_by(|a, b| a.0.cmp(&b.0));
        for (spec, chord) in pairs {
            if !self.ids.contains_key(&spec) {
                let id = self.api.register(chord);
                self.ids.insert(spec.clone(), id);
                trace!(spec = %spec, id, "trigger_registered");
                added += 1;
            }
        }
        debug!(total = self.ids.len(), added, "trigger_registry_updated");
    }

    /// Unregister everything (shutdown path).
    pub(crate) fn clear(&mut self) {
        for (spec, id) in self.ids.drain() {
            if let Err(e) = self.api.unregister(id) {
                warn!(spec = %spec, error = %e, "unregister_failed");
            }
        }
    }

    pub(crate) fn is_registered(&self, spec: &str) -> bool {
        self.ids.contains_key(spec)
    }

    pub(crate) fn suppress(&self, spec: &str) {
        self.api.suppress(spec);
    }

    pub(crate) fn unsuppress(&self, spec: &str) {
        self.api.unsuppress(spec);
    }

    pub(crate) fn len(&self) -> usize {
        self.ids.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockHook;

    fn chord(spec: &str) -> Chord {
        Chord::parse(spec).expect("chord")
    }

    #[test]
    fn incremental_update_keeps_survivors() {
        let hook = Arc::new(MockHook::default());
        let mut reg = TriggerRegistry::new(hook.clone());

        reg.update(vec![chord("ctrl+d"), chord("esc")]);
        assert_eq!(reg.len(), 2);
        assert_eq!(hook.registered(), vec!["ctrl+d".to_string(), "esc".into()]);

        // "ctrl+d" survives; "esc" goes; "ctrl+j" arrives.
        reg.update(vec![chord("ctrl+d"), chord("ctrl+j")]);
        assert_eq!(reg.len(), 2);
        let regs = hook.registered();
        assert!(regs.contains(&"ctrl+d".to_string()));
        assert!(regs.contains(&"ctrl+j".to_string()));
        assert!(!regs.contains(&"esc".to_string()));
        // The surviving trigger was registered exactly once.
        assert_eq!(hook.register_calls("ctrl+d"), 1);
    }

    #[test]
    fn clear_unregisters_everything() {
        let hook = Arc::new(MockHook::default());
        let mut reg = TriggerRegistry::new(hook.clone());
        reg.update(vec![chord("ctrl+d"), chord("esc")]);
        reg.clear();
        assert_eq!(reg.len(), 0);
        assert!(hook.registered().is_empty());
    }
}
