// Pocketkeys Key Type
// Physical key identifiers, numbered after Linux input-event-codes.h

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// Represents a single physical key on the hardware keyboard.
///
/// This is a newtype wrapper around u16 for type safety.
/// The numeric values match Linux input-event-codes.h definitions,
/// except for `SYM` which reuses the COMPOSE code since evdev has no
/// dedicated symbol key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct Key(pub u16);

impl Key {
    pub const BACKSPACE: Key = Key(14);
    pub const ENTER: Key = Key(28);
    pub const LEFT_CTRL: Key = Key(29);
    pub const LEFT_SHIFT: Key = Key(42);
    pub const RIGHT_SHIFT: Key = Key(54);
    pub const LEFT_ALT: Key = Key(56);
    pub const SPACE: Key = Key(57);
    pub const RIGHT_CTRL: Key = Key(97);
    pub const RIGHT_ALT: Key = Key(100);
    pub const SYM: Key = Key(127);

    pub const Q: Key = Key(16);
    pub const W: Key = Key(17);
    pub const E: Key = Key(18);
    pub const R: Key = Key(19);
    pub const T: Key = Key(20);
    pub const Y: Key = Key(21);
    pub const U: Key = Key(22);
    pub const I: Key = Key(23);
    pub const O: Key = Key(24);
    pub const P: Key = Key(25);
    pub const A: Key = Key(30);
    pub const S: Key = Key(31);
    pub const D: Key = Key(32);
    pub const F: Key = Key(33);
    pub const G: Key = Key(34);
    pub const H: Key = Key(35);
    pub const J: Key = Key(36);
    pub const K: Key = Key(37);
    pub const L: Key = Key(38);
    pub const Z: Key = Key(44);
    pub const X: Key = Key(45);
    pub const C: Key = Key(46);
    pub const V: Key = Key(47);
    pub const B: Key = Key(48);
    pub const N: Key = Key(49);
    pub const M: Key = Key(50);

    /// Get the raw numeric code value
    pub fn code(self) -> u16 {
        self.0
    }

    /// Get the name of this key
    pub fn name(self) -> &'static str {
        key_name(self.0)
    }

    /// True for Ctrl keys, which are never interpreted by the composer
    pub fn is_ctrl(self) -> bool {
        self == Key::LEFT_CTRL || self == Key::RIGHT_CTRL
    }
}

impl From<u16> for Key {
    fn from(code: u16) -> Self {
        Key(code)
    }
}

impl From<Key> for u16 {
    fn from(key: Key) -> Self {
        key.0
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Key {
    type Err = String;

    /// Accepts a key name (`"Q"`, `"SPACE"`, `"sym"`) or a raw numeric code (`"57"`).
    /// Single digits are names, so `"1"` is the KEY_1 key.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Some(key) = key_from_name(trimmed) {
            return Ok(key);
        }
        trimmed
            .parse::<u16>()
            .map(Key)
            .map_err(|_| format!("Unknown key: {}", s))
    }
}

const KEY_NAMES: &[(u16, &str)] = &[
    (0, "RESERVED"),
    (1, "ESC"),
    (2, "KEY_1"),
    (3, "KEY_2"),
    (4, "KEY_3"),
    (5, "KEY_4"),
    (6, "KEY_5"),
    (7, "KEY_6"),
    (8, "KEY_7"),
    (9, "KEY_8"),
    (10, "KEY_9"),
    (11, "KEY_0"),
    (12, "MINUS"),
    (13, "EQUAL"),
    (14, "BACKSPACE"),
    (15, "TAB"),
    (16, "Q"),
    (17, "W"),
    (18, "E"),
    (19, "R"),
    (20, "T"),
    (21, "Y"),
    (22, "U"),
    (23, "I"),
    (24, "O"),
    (25, "P"),
    (26, "LEFT_BRACE"),
    (27, "RIGHT_BRACE"),
    (28, "ENTER"),
    (29, "LEFT_CTRL"),
    (30, "A"),
    (31, "S"),
    (32, "D"),
    (33, "F"),
    (34, "G"),
    (35, "H"),
    (36, "J"),
    (37, "K"),
    (38, "L"),
    (39, "SEMICOLON"),
    (40, "APOSTROPHE"),
    (41, "GRAVE"),
    (42, "LEFT_SHIFT"),
    (43, "BACKSLASH"),
    (44, "Z"),
    (45, "X"),
    (46, "C"),
    (47, "V"),
    (48, "B"),
    (49, "N"),
    (50, "M"),
    (51, "COMMA"),
    (52, "DOT"),
    (53, "SLASH"),
    (54, "RIGHT_SHIFT"),
    (56, "LEFT_ALT"),
    (57, "SPACE"),
    (58, "CAPSLOCK"),
    (97, "RIGHT_CTRL"),
    (100, "RIGHT_ALT"),
    (102, "HOME"),
    (103, "UP"),
    (104, "PAGE_UP"),
    (105, "LEFT"),
    (106, "RIGHT"),
    (107, "END"),
    (108, "DOWN"),
    (109, "PAGE_DOWN"),
    (111, "DELETE"),
    (113, "MUTE"),
    (114, "VOLUMEDOWN"),
    (115, "VOLUMEUP"),
    (127, "SYM"),
];

/// Display name for a key code
pub fn key_name(code: u16) -> &'static str {
    static NAMES: OnceLock<HashMap<u16, &'static str>> = OnceLock::new();
    NAMES
        .get_or_init(|| KEY_NAMES.iter().copied().collect())
        .get(&code)
        .copied()
        .unwrap_or("UNKNOWN")
}

/// Look up a key by name (case-insensitive).
///
/// Besides the canonical names, a few aliases used in layout files are
/// accepted: `SHIFT`, `ALT`, `DEL`, `COMPOSE` and single digits.
pub fn key_from_name(name: &str) -> Option<Key> {
    static CODES: OnceLock<HashMap<&'static str, u16>> = OnceLock::new();
    let codes = CODES.get_or_init(|| {
        let mut codes: HashMap<&'static str, u16> =
            KEY_NAMES.iter().map(|&(code, name)| (name, code)).collect();
        codes.insert("SHIFT", 42);
        codes.insert("ALT", 56);
        codes.insert("DEL", 14);
        codes.insert("COMPOSE", 127);
        codes.insert("0", 11);
        codes.insert("1", 2);
        codes.insert("2", 3);
        codes.insert("3", 4);
        codes.insert("4", 5);
        codes.insert("5", 6);
        codes.insert("6", 7);
        codes.insert("7", 8);
        codes.insert("8", 9);
        codes.insert("9", 10);
        codes
    });
    codes.get(name.to_ascii_uppercase().as_str()).map(|&code| Key(code))
}
