// Pocketkeys Key Events
// Timestamped key events as delivered by the host input pipeline

use strum_macros::Display;

use crate::key::Key;

/// Which transition of a physical key an event reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "lowercase")]
pub enum KeyAction {
    Press,
    /// Auto-repeat while held
    Repeat,
    Release,
}

/// Edge of a key transition, used for commands forwarded to the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyEdge {
    Down,
    Up,
}

/// A single hardware key event.
///
/// `time` is the event time in milliseconds on a monotonic clock. For
/// repeats, `repeat_count` counts the auto-repeat events generated since
/// the press (the press itself has `repeat_count == 0`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: Key,
    pub action: KeyAction,
    pub time: u64,
    pub repeat_count: u32,
    /// Ctrl is held (reported by the host, never latched here)
    pub ctrl: bool,
}

impl KeyEvent {
    /// Initial key press
    pub fn press(key: Key, time: u64) -> Self {
        Self {
            key,
            action: KeyAction::Press,
            time,
            repeat_count: 0,
            ctrl: false,
        }
    }

    /// Auto-repeat of a held key
    pub fn repeat(key: Key, time: u64, repeat_count: u32) -> Self {
        Self {
            key,
            action: KeyAction::Repeat,
            time,
            repeat_count,
            ctrl: false,
        }
    }

    /// Key release
    pub fn release(key: Key, time: u64) -> Self {
        Self {
            key,
            action: KeyAction::Release,
            time,
            repeat_count: 0,
            ctrl: false,
        }
    }

    /// Mark this event as happening with Ctrl held
    pub fn with_ctrl(mut self) -> Self {
        self.ctrl = true;
        self
    }

    /// Down edge (press or repeat)
    pub fn is_down(&self) -> bool {
        self.action != KeyAction::Release
    }
}

/// Whether the engine consumed an event or the host should deliver it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    Handled,
    Unhandled,
}

impl KeyOutcome {
    pub fn is_handled(self) -> bool {
        self == KeyOutcome::Handled
    }
}

impl From<bool> for KeyOutcome {
    fn from(handled: bool) -> Self {
        if handled {
            KeyOutcome::Handled
        } else {
            KeyOutcome::Unhandled
        }
    }
}

/// Milliseconds between two event times, zero if the clock went backwards
pub fn elapsed_ms(since: u64, now: u64) -> u64 {
    now.saturating_sub(since)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors() {
        let press = KeyEvent::press(Key::Q, 10);
        assert_eq!(press.action, KeyAction::Press);
        assert_eq!(press.action.to_string(), "press");
        assert_eq!(press.repeat_count, 0);
        assert!(press.is_down());

        let repeat = KeyEvent::repeat(Key::Q, 500, 3);
        assert_eq!(repeat.action, KeyAction::Repeat);
        assert_eq!(repeat.repeat_count, 3);
        assert!(repeat.is_down());

        let release = KeyEvent::release(Key::Q, 600).with_ctrl();
        assert!(!release.is_down());
        assert!(release.ctrl);
    }

    #[test]
    fn test_elapsed_ms_saturates() {
        assert_eq!(elapsed_ms(100, 350), 250);
        assert_eq!(elapsed_ms(350, 100), 0);
    }

    #[test]
    fn test_outcome_from_bool() {
        assert_eq!(KeyOutcome::from(true), KeyOutcome::Handled);
        assert!(!KeyOutcome::from(false).is_handled());
    }
}
