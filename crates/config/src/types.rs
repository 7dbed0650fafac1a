//! Document types for the action catalog, profiles, and settings.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::warn;

/// How an action is performed physically.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
#[derive(Default)]
pub enum ActionKind {
    /// A key chord (e.g. `"ctrl+j"`).
    #[default]
    Key,
    /// A continuous wheel gesture (e.g. `"ctrl+wheel"`).
    Gesture,
}

/// One semantic action with its native command per supported application.
///
/// The document form puts application names directly on the action object,
/// next to the `type` field:
///
/// ```json
/// { "type": "key", "figma": "ctrl+d", "photoshop": "ctrl+j" }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionDefinition {
    /// Whether this action is a key chord or a wheel gesture.
    #[serde(rename = "type", default)]
    pub kind: ActionKind,
    /// Native command string per application name.
    #[serde(flatten)]
    pub commands: HashMap<String, String>,
}

impl ActionDefinition {
    /// The native command for `app`, if this action supports it.
    pub fn command_for(&self, app: &str) -> Option<&str> {
        self.commands.get(app).map(String::as_str)
    }
}

/// A named preference profile: per action, what the user wants to press.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Profile {
    /// Action name → preference string (an application name, or
    /// `"custom:<combo>"`).
    #[serde(default)]
    pub settings: HashMap<String, String>,
}

impl Profile {
    /// The parsed preference for `action`, if one is set.
    pub fn preference(&self, action: &str) -> Option<Preference> {
        self.settings.get(action).map(|raw| Preference::parse(raw))
    }
}

/// A user preference for one action's trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Preference {
    /// Use the named application's native command as the trigger.
    App(String),
    /// Use this literal combo as the trigger.
    Custom(String),
}

impl Preference {
    /// Parse a raw preference string. `"custom:<combo>"` selects a literal
    /// trigger; anything else names an application.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().split_once(':') {
            Some((head, rest)) if head.trim().eq_ignore_ascii_case("custom") => {
                Self::Custom(rest.trim().to_string())
            }
            _ => Self::App(raw.trim().to_string()),
        }
    }
}

/// The semantic action catalog plus the preference profiles.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    /// Action name → definition.
    #[serde(default)]
    pub actions: HashMap<String, ActionDefinition>,
    /// Profile name → profile.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Catalog {
    /// All application names the catalog defines commands for. This derived
    /// set is the candidate universe for context resolution.
    pub fn target_apps(&self) -> HashSet<String> {
        let mut apps = HashSet::new();
        for def in self.actions.values() {
            for app in def.commands.keys() {
                apps.insert(app.clone());
            }
        }
        apps
    }

    /// The profile selected by `settings`, falling back to any defined
    /// profile when the named one is missing. `None` only when the catalog
    /// defines no profiles at all.
    pub fn active_profile(&self, settings: &Settings) -> Option<&Profile> {
        if let Some(p) = self.profiles.get(&settings.active_profile) {
            return Some(p);
        }
        let fallback = self.profiles.iter().next();
        if let Some((name, _)) = fallback {
            warn!(
                requested = %settings.active_profile,
                using = %name,
                "active profile not found, falling back"
            );
        }
        fallback.map(|(_, p)| p)
    }
}

/// Runtime settings document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Name of the profile whose preferences are in effect.
    #[serde(default)]
    pub active_profile: String,
}
