//! The trigger→command mapping engine.
//!
//! For the focused context, every catalog action that defines a native
//! command there yields one binding: the trigger comes from the user's
//! preference (a literal `custom:` combo, or another application's native
//! command for the same action), the output is the focused application's
//! own command. Unresolvable preferences skip the action with a diagnostic;
//! they never fail the build.

use std::collections::{HashMap, HashSet};

use config::{ActionKind, Catalog, Preference, Profile};
use keyspec::{Chord, Gesture};
use tracing::{debug, warn};

/// One resolved trigger→output binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    /// The command to synthesize in the focused context.
    pub output: String,
    /// Key chord or wheel gesture.
    pub kind: ActionKind,
}

/// Lowercased trigger spec → binding, valid for exactly one context.
pub type MappingLookup = HashMap<String, Binding>;

/// Builds and caches mapping tables from the catalog and active profile.
pub struct ActionMapper {
    catalog: Catalog,
    profile: Profile,
    cached: Option<(String, std::sync::Arc<MappingLookup>)>,
}

impl ActionMapper {
    /// Create a mapper over the loaded catalog and the active profile.
    pub fn new(catalog: Catalog, profile: Profile) -> Self {
        Self {
            catalog,
            profile,
            cached: None,
        }
    }

    /// The live table for `context`, rebuilt only when the context differs
    /// from the cached one.
    pub fn lookup_for(&mut self, context: &str) -> std::sync::Arc<MappingLookup> {
        if let Some((cached_ctx, table)) = &self.cached
            && cached_ctx == context
        {
            return table.clone();
        }
        let table = std::sync::Arc::new(self.build_lookup(context));
        self.cached = Some((context.to_string(), table.clone()));
        table
    }

    /// Build the table for `context` from scratch.
    ///
    /// Actions are visited in name order so that when two actions resolve
    /// to the same trigger, which one wins is at least deterministic
    /// (last write, alphabetically).
    pub fn build_lookup(&self, context: &str) -> MappingLookup {
        let mut table = MappingLookup::new();
        let mut names: Vec<&String> = self.catalog.actions.keys().collect();
        names.sort();
        for name in names {
            let def = &self.catalog.actions[name];
            let Some(output) = def.command_for(context) else {
                continue;
            };
            let Some(trigger) = self.resolve_trigger(name, def) else {
                continue;
            };
            let key = canonical_trigger(&trigger);
            debug!(action = %name, trigger = %key, output, "mapping_rule");
            if let Some(prev) = table.insert(
                key.clone(),
                Binding {
                    output: output.to_string(),
                    kind: def.kind,
                },
            ) {
                debug!(trigger = %key, displaced = %prev.output, "duplicate_trigger_overwritten");
            }
        }
        table
    }

    /// Every trigger across all contexts, with its action kind. Computed
    /// once at startup (and on reload) to register the hook universe;
    /// context changes only alter which output a firing trigger resolves
    /// to.
    pub fn all_triggers(&self) -> HashMap<String, ActionKind> {
        let mut triggers = HashMap::new();
        for (name, def) in &self.catalog.actions {
            if let Some(trigger) = self.resolve_trigger(name, def) {
                triggers.insert(canonical_trigger(&trigger), def.kind);
            }
        }
        triggers
    }

    /// The candidate set for context resolution.
    pub fn target_apps(&self) -> HashSet<String> {
        self.catalog.target_apps()
    }

    /// Resolve the user's trigger for one action, or `None` (with a
    /// diagnostic) when the preference cannot be satisfied.
    fn resolve_trigger(&self, action: &str, def: &config::ActionDefinition) -> Option<String> {
        let Some(pref) = self.profile.preference(action) else {
            warn!(action, "no_preference_for_action");
            return None;
        };
        match pref {
            Preference::Custom(combo) if !combo.is_empty() => Some(combo),
            Preference::Custom(_) => {
                warn!(action, "empty_custom_trigger");
                None
            }
            Preference::App(app) => match def.command_for(&app) {
                Some(cmd) => Some(cmd.to_string()),
                None => {
                    warn!(action, preferred_app = %app, "preference_has_no_command_for_action");
                    None
                }
            },
        }
    }
}

/// Canonicalize a trigger spec so table keys, registrations, and firing
/// chords all agree on one spelling (`"Control + D"`, `"ctrl+d"`, and a
/// firing chord's spec are the same key). Specs that parse as neither a
/// chord nor a gesture fall back to plain lowercasing; they can never fire
/// anyway and only surface in diagnostics.
fn canonical_trigger(trigger: &str) -> String {
    if keyspec::is_gesture_spec(trigger) {
        if let Some(g) = Gesture::parse(trigger) {
            return g.to_spec();
        }
    } else if let Some(c) = Chord::parse(trigger) {
        return c.to_spec();
    }
    trigger.to_lowercase()
}
