//! Key chords: a modifier set plus a single key.

use std::{collections::HashSet, fmt};

use serde::{Deserialize, Serialize};

use crate::{Key, Modifier};

/// A key chord parsed from a "+"-joined spec such as `"ctrl+shift+z"`.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Chord {
    /// Modifiers held for this chord.
    pub modifiers: HashSet<Modifier>,
    /// The final, non-modifier key.
    pub key: Key,
}

impl Chord {
    /// Parses a chord spec.
    ///
    /// Components are separated by `+`; the last component is the key, all
    /// earlier components must be modifiers. Case-insensitive, tolerant of
    /// surrounding whitespace per component. Returns `None` for an empty
    /// spec, an unknown key, a non-modifier in modifier position, or a
    /// modifier-only spec (`"ctrl"` is a key spec for the Control key, not
    /// a chord of it).
    pub fn parse(spec: &str) -> Option<Self> {
        let mut parts: Vec<&str> = spec.split('+').collect();
        let key = Key::from_spec(parts.pop()?)?;
        let mut modifiers = HashSet::new();
        for part in parts {
            modifiers.insert(Modifier::from_spec(part)?);
        }
        Some(Self { modifiers, key })
    }

    /// Modifiers in the canonical press order (ctrl, shift, alt, cmd).
    ///
    /// Injection presses in this order and releases in reverse.
    pub fn ordered_modifiers(&self) -> Vec<Modifier> {
        let mut mods: Vec<Modifier> = self.modifiers.iter().copied().collect();
        mods.sort_by_key(|m| m.order());
        mods
    }

    /// The CGEventFlags bits for this chord's modifier set.
    pub fn flag_bits(&self) -> u64 {
        self.modifiers.iter().map(|m| m.flag_bit()).sum()
    }

    /// Canonical lowercase spec, usable as a stable lookup key.
    pub fn to_spec(&self) -> String {
        let mut out: Vec<&str> = self.ordered_modifiers().iter().map(|m| m.to_spec()).collect();
        out.push(self.key.to_spec());
        out.join("+")
    }
}

impl fmt::Display for Chord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_spec())
    }
}
