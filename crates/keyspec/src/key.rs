//! Virtual keycodes for the keys a mapping document can name.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

macro_rules! keys {
    ( $( $name:ident = $code:expr => [ $( $spec:expr ),+ ] ),+ $(,)? ) => {
        /// A macOS virtual keycode.
        ///
        /// The discriminants are the hardware codes from the HIToolbox
        /// `kVK_*` constants, so a `Key` converts to a `CGKeyCode` with a
        /// plain cast.
        #[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
        #[repr(u16)]
        #[allow(missing_docs)]
        pub enum Key {
            $( $name = $code, )+
        }

        impl Key {
            /// Canonical spec string for this key (lowercase, shortest form).
            pub fn to_spec(self) -> &'static str {
                match self {
                    $( Self::$name => first_spec!($( $spec ),+), )+
                }
            }
        }

        static SPEC_TABLE: Lazy<HashMap<&'static str, Key>> = Lazy::new(|| {
            let mut m = HashMap::new();
            $( $( m.insert($spec, Key::$name); )+ )+
            m
        });

        static CODE_TABLE: Lazy<HashMap<u16, Key>> = Lazy::new(|| {
            let mut m = HashMap::new();
            $( m.insert($code, Key::$name); )+
            m
        });
    };
}

macro_rules! first_spec {
    ( $first:expr $( , $rest:expr )* ) => { $first };
}

keys! {
    A = 0x00 => ["a"],
    S = 0x01 => ["s"],
    D = 0x02 => ["d"],
    F = 0x03 => ["f"],
    H = 0x04 => ["h"],
    G = 0x05 => ["g"],
    Z = 0x06 => ["z"],
    X = 0x07 => ["x"],
    C = 0x08 => ["c"],
    V = 0x09 => ["v"],
    B = 0x0B => ["b"],
    Q = 0x0C => ["q"],
    W = 0x0D => ["w"],
    E = 0x0E => ["e"],
    R = 0x0F => ["r"],
    Y = 0x10 => ["y"],
    T = 0x11 => ["t"],
    Digit1 = 0x12 => ["1"],
    Digit2 = 0x13 => ["2"],
    Digit3 = 0x14 => ["3"],
    Digit4 = 0x15 => ["4"],
    Digit6 = 0x16 => ["6"],
    Digit5 = 0x17 => ["5"],
    Equal = 0x18 => ["=", "equal"],
    Digit9 = 0x19 => ["9"],
    Digit7 = 0x1A => ["7"],
    Minus = 0x1B => ["-", "minus"],
    Digit8 = 0x1C => ["8"],
    Digit0 = 0x1D => ["0"],
    RightBracket = 0x1E => ["]", "rightbracket"],
    O = 0x1F => ["o"],
    U = 0x20 => ["u"],
    LeftBracket = 0x21 => ["[", "leftbracket"],
    I = 0x22 => ["i"],
    P = 0x23 => ["p"],
    Return = 0x24 => ["enter", "return", "ret"],
    L = 0x25 => ["l"],
    J = 0x26 => ["j"],
    Quote = 0x27 => ["'", "quote"],
    K = 0x28 => ["k"],
    Semicolon = 0x29 => [";", "semicolon"],
    Backslash = 0x2A => ["\\", "backslash"],
    Comma = 0x2B => [",", "comma"],
    Slash = 0x2C => ["/", "slash"],
    N = 0x2D => ["n"],
    M = 0x2E => ["m"],
    Period = 0x2F => [".", "period"],
    Tab = 0x30 => ["tab"],
    Space = 0x31 => ["space"],
    Grave = 0x32 => ["`", "grave"],
    Delete = 0x33 => ["backspace", "delete"],
    Escape = 0x35 => ["esc", "escape"],
    Command = 0x37 => ["cmd", "command", "meta"],
    Shift = 0x38 => ["shift"],
    CapsLock = 0x39 => ["capslock", "caps"],
    Option = 0x3A => ["alt", "opt", "option"],
    Control = 0x3B => ["ctrl", "control"],
    RightShift = 0x3C => ["rightshift"],
    RightOption = 0x3D => ["rightalt", "rightopt"],
    RightControl = 0x3E => ["rightctrl"],
    Function = 0x3F => ["fn"],
    Home = 0x73 => ["home"],
    PageUp = 0x74 => ["pgup", "pageup"],
    ForwardDelete = 0x75 => ["del", "forwarddelete"],
    End = 0x77 => ["end"],
    PageDown = 0x79 => ["pgdn", "pagedown"],
    LeftArrow = 0x7B => ["left"],
    RightArrow = 0x7C => ["right"],
    DownArrow = 0x7D => ["down"],
    UpArrow = 0x7E => ["up"],
    F1 = 0x7A => ["f1"],
    F2 = 0x78 => ["f2"],
    F3 = 0x63 => ["f3"],
    F4 = 0x76 => ["f4"],
    F5 = 0x60 => ["f5"],
    F6 = 0x61 => ["f6"],
    F7 = 0x62 => ["f7"],
    F8 = 0x64 => ["f8"],
    F9 = 0x65 => ["f9"],
    F10 = 0x6D => ["f10"],
    F11 = 0x67 => ["f11"],
    F12 = 0x6F => ["f12"],
}

impl Key {
    /// Parses a key spec. Accepts the canonical form plus aliases, all
    /// case-insensitive (`"esc"`, `"Escape"`, `","`, `"comma"`).
    pub fn from_spec(s: &str) -> Option<Self> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return None;
        }
        let lowered = trimmed.to_ascii_lowercase();
        SPEC_TABLE.get(lowered.as_str()).copied()
    }

    /// The hardware keycode as used by `CGEvent::new_keyboard_event`.
    pub fn code(self) -> u16 {
        self as u16
    }

    /// Maps a hardware keycode reported by an event tap back to a `Key`.
    pub fn from_code(code: u16) -> Option<Self> {
        CODE_TABLE.get(&code).copied()
    }
}
