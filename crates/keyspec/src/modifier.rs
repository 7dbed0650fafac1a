//! Modifier keys and conversions to keycodes and CGEventFlags bits.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::Key;

/// The four primary modifier keys.
///
/// Mapping documents only ever name the generic (left-side) modifiers, so
/// the right-hand variants are not modeled; physical right-hand presses
/// still set the same CGEventFlags bits and match the same chords.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modifier {
    /// Control.
    Control,
    /// Shift.
    Shift,
    /// Option, spelled `alt` in mapping documents.
    Option,
    /// Command.
    Command,
}

/// All modifiers, in the canonical press order used for emission and
/// injection: ctrl, shift, alt, cmd.
pub const ALL_MODIFIERS: [Modifier; 4] = [
    Modifier::Control,
    Modifier::Shift,
    Modifier::Option,
    Modifier::Command,
];

impl Modifier {
    /// Parses a modifier spec (case-insensitive; accepts the same aliases
    /// as [`Key::from_spec`]).
    pub fn from_spec(s: &str) -> Option<Self> {
        match Key::from_spec(s)? {
            Key::Control | Key::RightControl => Some(Self::Control),
            Key::Shift | Key::RightShift => Some(Self::Shift),
            Key::Option | Key::RightOption => Some(Self::Option),
            Key::Command => Some(Self::Command),
            _ => None,
        }
    }

    /// Canonical spec string, as written in mapping documents.
    pub fn to_spec(self) -> &'static str {
        match self {
            Self::Control => "ctrl",
            Self::Shift => "shift",
            Self::Option => "alt",
            Self::Command => "cmd",
        }
    }

    /// The left-hand hardware keycode for posting this modifier as its own
    /// key event.
    pub fn code(self) -> u16 {
        let key = match self {
            Self::Control => Key::Control,
            Self::Shift => Key::Shift,
            Self::Option => Key::Option,
            Self::Command => Key::Command,
        };
        key.code()
    }

    /// The CGEventFlags bit this modifier sets on an event.
    pub fn flag_bit(self) -> u64 {
        match self {
            Self::Shift => 1 << 17,
            Self::Control => 1 << 18,
            Self::Option => 1 << 19,
            Self::Command => 1 << 20,
        }
    }

    /// Position in the canonical press order.
    pub(crate) fn order(self) -> usize {
        match self {
            Self::Control => 0,
            Self::Shift => 1,
            Self::Option => 2,
            Self::Command => 3,
        }
    }
}

/// Construct a modifier set from macOS CGEventFlags bits.
pub fn modifiers_from_cg_flags(flags: u64) -> HashSet<Modifier> {
    let mut set = HashSet::new();
    for m in ALL_MODIFIERS {
        if flags & m.flag_bit() != 0 {
            set.insert(m);
        }
    }
    set
}
