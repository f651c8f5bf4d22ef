// Pocketkeys Pad Mode
// Translates letter keys into navigation and media commands while Sym is held or locked

use std::collections::HashSet;
use std::time::Duration;

use strum_macros::{Display, EnumIter};

use crate::event::{elapsed_ms, KeyEdge, KeyEvent};
use crate::modifier::DEFAULT_LONG_PRESS;
use crate::sink::CommandSink;
use crate::Key;

/// Navigation commands, laid out as a 3x3 pad plus line start / end
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum DirectionalCommand {
    Home,
    End,
    UpLeft,
    Up,
    UpRight,
    Left,
    Center,
    Right,
    DownLeft,
    Down,
    DownRight,
}

/// Media transport commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum MediaCommand {
    PlayPause,
    Previous,
    Next,
    Rewind,
    FastForward,
}

/// A command produced by a pad key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PadCommand {
    Directional(DirectionalCommand),
    Media(MediaCommand),
}

/// Commands bound to one key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PadBinding {
    pub short: PadCommand,
    pub long: Option<PadCommand>,
}

/// Pad binding of a key, `None` if the key is not part of the pad
pub fn binding_for(key: Key) -> Option<PadBinding> {
    use DirectionalCommand as D;
    use MediaCommand as M;

    let directional = |cmd| PadBinding {
        short: PadCommand::Directional(cmd),
        long: None,
    };

    let binding = match key {
        Key::R | Key::U => directional(D::Home),
        Key::F | Key::J => directional(D::End),
        Key::Q | Key::I => directional(D::UpLeft),
        Key::W | Key::O => directional(D::Up),
        Key::E | Key::P => directional(D::UpRight),
        Key::A | Key::K => directional(D::Left),
        Key::S | Key::L => directional(D::Center),
        Key::D | Key::BACKSPACE => directional(D::Right),
        Key::Z | Key::N => directional(D::DownLeft),
        Key::X | Key::M => directional(D::Down),
        Key::C | Key::ENTER => directional(D::DownRight),
        Key::V => PadBinding {
            short: PadCommand::Media(M::Previous),
            long: Some(PadCommand::Media(M::Rewind)),
        },
        Key::SPACE => PadBinding {
            short: PadCommand::Media(M::PlayPause),
            long: None,
        },
        Key::B => PadBinding {
            short: PadCommand::Media(M::Next),
            long: Some(PadCommand::Media(M::FastForward)),
        },
        _ => return None,
    };
    Some(binding)
}

/// Keys whose key-down was claimed by pad mode
#[derive(Debug, Clone, Default)]
struct PressedKeys {
    pressed: HashSet<Key>,
}

impl PressedKeys {
    fn add(&mut self, key: Key) {
        self.pressed.insert(key);
    }

    /// Returns true if the key was tracked
    fn remove(&mut self, key: Key) -> bool {
        self.pressed.remove(&key)
    }

    fn is_pressed(&self, key: Key) -> bool {
        self.pressed.contains(&key)
    }

    fn clear(&mut self) {
        self.pressed.clear();
    }
}

/// Pad-mode key translator
pub struct PadModeTranslator {
    long_press: Duration,
    pressed: PressedKeys,
    last_key_down_time: u64,
    long_fired: bool,
}

impl Default for PadModeTranslator {
    fn default() -> Self {
        Self::new(DEFAULT_LONG_PRESS)
    }
}

impl PadModeTranslator {
    pub fn new(long_press: Duration) -> Self {
        Self {
            long_press,
            pressed: PressedKeys::default(),
            last_key_down_time: 0,
            long_fired: false,
        }
    }

    fn held_past_threshold(&self, time: u64) -> bool {
        u128::from(elapsed_ms(self.last_key_down_time, time)) > self.long_press.as_millis()
    }

    /// Handle a key-down; returns false if the key is not a pad key
    pub fn key_down(&mut self, event: &KeyEvent, shift: bool, commands: &mut dyn CommandSink) -> bool {
        let Some(binding) = binding_for(event.key) else {
            return false;
        };

        if event.repeat_count == 0 {
            self.last_key_down_time = event.time;
            self.long_fired = false;
            self.pressed.add(event.key);
            if binding.long.is_none() {
                dispatch(commands, binding.short, KeyEdge::Down, shift);
            }
            return true;
        }

        match binding.long {
            Some(long) if !self.long_fired && self.held_past_threshold(event.time) => {
                log::debug!("Pad long press on {}: {:?}", event.key, long);
                self.long_fired = true;
                dispatch(commands, long, KeyEdge::Down, shift);
            }
            Some(_) => {}
            None => dispatch(commands, binding.short, KeyEdge::Down, shift),
        }
        true
    }

    /// Handle a key-up; returns false if the key-down was not claimed by the pad
    pub fn key_up(&mut self, event: &KeyEvent, shift: bool, commands: &mut dyn CommandSink) -> bool {
        let Some(binding) = binding_for(event.key) else {
            return false;
        };
        if !self.pressed.remove(event.key) {
            return false;
        }

        match binding.long {
            Some(long) if self.long_fired => {
                self.long_fired = false;
                dispatch(commands, long, KeyEdge::Up, shift);
            }
            Some(_) => {
                dispatch(commands, binding.short, KeyEdge::Down, shift);
                dispatch(commands, binding.short, KeyEdge::Up, shift);
            }
            None => dispatch(commands, binding.short, KeyEdge::Up, shift),
        }
        true
    }

    /// True if the key-down of `key` was claimed by pad mode
    pub fn has_pressed_key(&self, key: Key) -> bool {
        self.pressed.is_pressed(key)
    }

    pub fn reset(&mut self) {
        self.pressed.clear();
        self.long_fired = false;
    }
}

fn dispatch(commands: &mut dyn CommandSink, command: PadCommand, edge: KeyEdge, shift: bool) {
    match command {
        PadCommand::Directional(cmd) => commands.directional(cmd, edge, shift),
        PadCommand::Media(cmd) => commands.media(cmd, edge),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[derive(Default)]
    struct Recorder {
        events: Vec<(PadCommand, KeyEdge)>,
    }

    impl CommandSink for Recorder {
        fn directional(&mut self, command: DirectionalCommand, edge: KeyEdge, _shift: bool) {
            self.events.push((PadCommand::Directional(command), edge));
        }

        fn media(&mut self, command: MediaCommand, edge: KeyEdge) {
            self.events.push((PadCommand::Media(command), edge));
        }
    }

    const NEXT: PadCommand = PadCommand::Media(MediaCommand::Next);
    const FAST_FORWARD: PadCommand = PadCommand::Media(MediaCommand::FastForward);
    const UP: PadCommand = PadCommand::Directional(DirectionalCommand::Up);

    #[test]
    fn test_every_command_is_bound() {
        let bound: Vec<PadBinding> = (0..=127u16).filter_map(|c| binding_for(Key(c))).collect();
        for cmd in DirectionalCommand::iter() {
            assert!(bound.iter().any(|b| b.short == PadCommand::Directional(cmd)));
        }
        for cmd in MediaCommand::iter() {
            assert!(bound
                .iter()
                .any(|b| b.short == PadCommand::Media(cmd) || b.long == Some(PadCommand::Media(cmd))));
        }
        assert!(binding_for(Key::T).is_none());
    }

    #[test]
    fn test_short_only_key() {
        let mut pad = PadModeTranslator::default();
        let mut rec = Recorder::default();
        assert!(pad.key_down(&KeyEvent::press(Key::W, 0), false, &mut rec));
        assert!(pad.has_pressed_key(Key::W));
        assert!(pad.key_down(&KeyEvent::repeat(Key::W, 400, 1), false, &mut rec));
        assert!(pad.key_up(&KeyEvent::release(Key::W, 450), false, &mut rec));
        assert!(!pad.has_pressed_key(Key::W));
        assert_eq!(
            rec.events,
            vec![(UP, KeyEdge::Down), (UP, KeyEdge::Down), (UP, KeyEdge::Up)]
        );
    }

    #[test]
    fn test_short_press_with_long_binding() {
        let mut pad = PadModeTranslator::default();
        let mut rec = Recorder::default();
        pad.key_down(&KeyEvent::press(Key::B, 1000), false, &mut rec);
        assert!(rec.events.is_empty());
        pad.key_up(&KeyEvent::release(Key::B, 1100), false, &mut rec);
        assert_eq!(rec.events, vec![(NEXT, KeyEdge::Down), (NEXT, KeyEdge::Up)]);
    }

    #[test]
    fn test_long_press_fires_once() {
        let mut pad = PadModeTranslator::default();
        let mut rec = Recorder::default();
        pad.key_down(&KeyEvent::press(Key::B, 1000), false, &mut rec);
        pad.key_down(&KeyEvent::repeat(Key::B, 1200, 1), false, &mut rec);
        pad.key_down(&KeyEvent::repeat(Key::B, 1400, 2), false, &mut rec);
        pad.key_down(&KeyEvent::repeat(Key::B, 1450, 3), false, &mut rec);
        pad.key_up(&KeyEvent::release(Key::B, 1500), false, &mut rec);
        assert_eq!(
            rec.events,
            vec![(FAST_FORWARD, KeyEdge::Down), (FAST_FORWARD, KeyEdge::Up)]
        );
    }

    #[test]
    fn test_unclaimed_release() {
        let mut pad = PadModeTranslator::default();
        let mut rec = Recorder::default();
        assert!(!pad.key_up(&KeyEvent::release(Key::W, 0), false, &mut rec));
        assert!(!pad.key_down(&KeyEvent::press(Key::T, 0), false, &mut rec));
        assert!(rec.events.is_empty());
    }
}
