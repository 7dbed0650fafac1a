//! Parsing tests for the catalog and settings documents.

#[cfg(test)]
mod tests {

    use crate::{ActionKind, Catalog, Preference, Settings};

    const CATALOG: &str = r#"{
        "actions": {
            "duplicate": { "type": "key", "figma": "ctrl+d", "photoshop": "ctrl+j" },
            "deselect":  { "figma": "esc", "photoshop": "ctrl+d" },
            "zoom":      { "type": "gesture", "figma": "ctrl+wheel", "photoshop": "alt+wheel" }
        },
        "profiles": {
            "figma-muscle-memory": {
                "settings": { "duplicate": "figma", "deselect": "figma", "zoom": "figma" }
            },
            "overrides": {
                "settings": { "duplicate": "custom: f1" }
            }
        }
    }"#;

    #[test]
    fn catalog_parses_actions_and_profiles() {
        let cat: Catalog = serde_json::from_str(CATALOG).expect("parse");
        assert_eq!(cat.actions.len(), 3);
        assert_eq!(cat.profiles.len(), 2);

        let dup = &cat.actions["duplicate"];
        assert_eq!(dup.kind, ActionKind::Key);
        assert_eq!(dup.command_for("figma"), Some("ctrl+d"));
        assert_eq!(dup.command_for("photoshop"), Some("ctrl+j"));
        assert_eq!(dup.command_for("krita"), None);

        // Missing type defaults to key; gesture parses explicitly.
        assert_eq!(cat.actions["deselect"].kind, ActionKind::Key);
        assert_eq!(cat.actions["zoom"].kind, ActionKind::Gesture);
    }

    #[test]
    fn target_apps_are_derived_from_commands() {
        let cat: Catalog = serde_json::from_str(CATALOG).expect("parse");
        let apps = cat.target_apps();
        assert!(apps.contains("figma"));
        assert!(apps.contains("photoshop"));
        assert_eq!(apps.len(), 2);
    }

    #[test]
    fn preference_parsing() {
        assert_eq!(Preference::parse("figma"), Preference::App("figma".into()));
        assert_eq!(
            Preference::parse("custom: f1"),
            Preference::Custom("f1".into())
        );
        assert_eq!(
            Preference::parse("CUSTOM:ctrl+shift+k"),
            Preference::Custom("ctrl+shift+k".into())
        );
    }

    #[test]
    fn active_profile_fallback() {
        let cat: Catalog = serde_json::from_str(CATALOG).expect("parse");

        let named = Settings {
            active_profile: "overrides".into(),
        };
        let profile = cat.active_profile(&named).expect("profile");
        assert_eq!(
            profile.preference("duplicate"),
            Some(Preference::Custom("f1".into()))
        );

        // Unknown name falls back to some defined profile rather than failing.
        let missing = Settings {
            active_profile: "nope".into(),
        };
        assert!(cat.active_profile(&missing).is_some());

        let empty = Catalog::default();
        assert!(empty.active_profile(&missing).is_none());
    }
}
