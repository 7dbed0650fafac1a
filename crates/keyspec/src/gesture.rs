//! Wheel gestures: a held modifier plus wheel rotation.

use std::fmt;

use crate::{Modifier, WHEEL_TOKEN};

/// A wheel gesture parsed from a spec such as `"ctrl+wheel"`.
///
/// Exactly one modifier is supported: the gesture machinery switches a
/// single held modifier for another, and a chorded gesture has no
/// counterpart in any mapping document this system consumes.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Gesture {
    /// The modifier that must be held while the wheel turns.
    pub modifier: Modifier,
}

impl Gesture {
    /// Parses a gesture spec of the form `"<modifier>+wheel"`.
    pub fn parse(spec: &str) -> Option<Self> {
        let mut parts = spec.split('+');
        let modifier = Modifier::from_spec(parts.next()?)?;
        let token = parts.next()?;
        if !token.trim().eq_ignore_ascii_case(WHEEL_TOKEN) || parts.next().is_some() {
            return None;
        }
        Some(Self { modifier })
    }

    /// Canonical lowercase spec.
    pub fn to_spec(self) -> String {
        format!("{}+{}", self.modifier.to_spec(), WHEEL_TOKEN)
    }
}

impl fmt::Display for Gesture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_spec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_emit() {
        let g = Gesture::parse("ctrl+wheel").expect("parse");
        assert_eq!(g.modifier, Modifier::Control);
        assert_eq!(g.to_spec(), "ctrl+wheel");

        let g = Gesture::parse("Alt+Wheel").expect("parse");
        assert_eq!(g.modifier, Modifier::Option);
        assert_eq!(g.to_spec(), "alt+wheel");
    }

    #[test]
    fn rejects_malformed() {
        assert_eq!(Gesture::parse("wheel"), None);
        assert_eq!(Gesture::parse("ctrl+shift+wheel"), None);
        assert_eq!(Gesture::parse("ctrl+j"), None);
        assert_eq!(Gesture::parse("j+wheel"), None);
    }
}
