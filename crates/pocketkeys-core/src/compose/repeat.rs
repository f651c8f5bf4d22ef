// Pocketkeys Key Repeat Context
// Multi-tap and long-press bookkeeping for the composer

use crate::event::elapsed_ms;
use crate::Key;

/// Tracks the current key-press group.
///
/// A group starts with a new key (or a slow press of the same key) and
/// captures the Shift/Alt state at that moment. Fast presses of the same
/// key advance `counter` and keep resolving with the captured state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyRepeatContext {
    last_key: Option<Key>,
    last_key_down_time: Option<u64>,
    shift: bool,
    alt: bool,
    counter: u8,
}

impl KeyRepeatContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin a new group with the live modifier state
    pub fn start_group(&mut self, shift: bool, alt: bool) {
        self.counter = 0;
        self.shift = shift;
        self.alt = alt;
    }

    /// Next candidate of the current group
    pub fn advance(&mut self) {
        self.counter = self.counter.wrapping_add(1);
    }

    /// Long press: resolve the held key through its alt values
    pub fn force_alt(&mut self) {
        self.alt = true;
        self.counter = 0;
    }

    /// Record a handled key-down
    pub fn mark(&mut self, key: Key, time: u64) {
        self.last_key = Some(key);
        self.last_key_down_time = Some(time);
    }

    /// Restart the timing window without changing the key
    pub fn touch(&mut self, time: u64) {
        self.last_key_down_time = Some(time);
    }

    pub fn is_same_key(&self, key: Key) -> bool {
        self.last_key == Some(key)
    }

    /// The previous key-down happened at most `threshold_ms` before `time`
    pub fn within(&self, time: u64, threshold_ms: u64) -> bool {
        self.last_key_down_time
            .is_some_and(|last| elapsed_ms(last, time) <= threshold_ms)
    }

    /// More than `threshold_ms` passed since the previous key-down
    pub fn held_past(&self, time: u64, threshold_ms: u64) -> bool {
        self.last_key_down_time
            .is_some_and(|last| elapsed_ms(last, time) > threshold_ms)
    }

    pub fn shift(&self) -> bool {
        self.shift
    }

    pub fn alt(&self) -> bool {
        self.alt
    }

    pub fn counter(&self) -> u8 {
        self.counter
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_lifecycle() {
        let mut ctx = KeyRepeatContext::new();
        assert!(!ctx.within(0, 300));
        assert!(!ctx.held_past(1000, 300));

        ctx.start_group(true, false);
        ctx.mark(Key::K, 1000);
        ctx.advance();
        ctx.advance();
        assert_eq!(ctx.counter(), 2);
        assert!(ctx.shift());
        assert!(ctx.is_same_key(Key::K));
        assert!(ctx.within(1300, 300));
        assert!(!ctx.within(1301, 300));
        assert!(ctx.held_past(1301, 300));

        ctx.force_alt();
        assert!(ctx.alt());
        assert_eq!(ctx.counter(), 0);
    }

    #[test]
    fn test_counter_wraps() {
        let mut ctx = KeyRepeatContext::new();
        for _ in 0..256 {
            ctx.advance();
        }
        assert_eq!(ctx.counter(), 0);
    }
}
