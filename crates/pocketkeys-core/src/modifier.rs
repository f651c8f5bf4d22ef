// Pocketkeys Modifier System
// Latching Shift / Alt / Sym state machine driven by hardware key events

use std::time::Duration;

use strum_macros::{Display, EnumIter, EnumString};

use crate::event::elapsed_ms;
use crate::sink::{CallControl, StatusListener};
use crate::Key;

/// Default long-press threshold, also used as the double-tap window
pub const DEFAULT_LONG_PRESS: Duration = Duration::from_millis(300);

/// The modifier keys tracked by the state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum ModifierKind {
    Shift,
    Alt,
    Sym,
}

impl ModifierKind {
    /// Map a physical key to the modifier it drives
    pub fn from_key(key: Key) -> Option<Self> {
        match key {
            Key::LEFT_SHIFT | Key::RIGHT_SHIFT => Some(ModifierKind::Shift),
            Key::LEFT_ALT | Key::RIGHT_ALT => Some(ModifierKind::Alt),
            Key::SYM => Some(ModifierKind::Sym),
            _ => None,
        }
    }

    /// Shift and Alt pressed together form the layout-switch combo
    pub fn partner(self) -> Option<Self> {
        match self {
            ModifierKind::Shift => Some(ModifierKind::Alt),
            ModifierKind::Alt => Some(ModifierKind::Shift),
            ModifierKind::Sym => None,
        }
    }
}

/// Sticky state of a modifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display)]
pub enum LatchState {
    #[default]
    Off,
    /// One-shot: applies to the next character
    Latched,
    /// Applies until explicitly released
    Locked,
}

impl LatchState {
    /// Full cycle used by on-screen modifier buttons
    pub fn next(self) -> Self {
        match self {
            LatchState::Off => LatchState::Latched,
            LatchState::Latched => LatchState::Locked,
            LatchState::Locked => LatchState::Off,
        }
    }

    /// Single hardware tap: Off and Latched alternate, a lock is released
    pub fn toggled(self) -> Self {
        match self {
            LatchState::Off => LatchState::Latched,
            LatchState::Latched | LatchState::Locked => LatchState::Off,
        }
    }
}

/// Observable state of one modifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ModifierStatus {
    pub pressed: bool,
    pub latch: LatchState,
}

impl ModifierStatus {
    /// Modifier applies to the next character
    pub fn enabled(&self) -> bool {
        self.pressed || self.latch != LatchState::Off
    }

    /// Modifier is held or locked
    pub fn locked(&self) -> bool {
        self.pressed || self.latch == LatchState::Locked
    }
}

/// Immutable copy of all modifier state, handed to status listeners
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ModifierSnapshot {
    pub shift: ModifierStatus,
    pub alt: ModifierStatus,
    pub sym: ModifierStatus,
}

impl ModifierSnapshot {
    pub fn get(&self, kind: ModifierKind) -> ModifierStatus {
        match kind {
            ModifierKind::Shift => self.shift,
            ModifierKind::Alt => self.alt,
            ModifierKind::Sym => self.sym,
        }
    }
}

/// Result of feeding a modifier key event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModifierOutcome {
    Handled,
    /// Shift+Alt combo: the host should switch to the next layout
    SwitchLayout,
    CallAccepted,
    CallEnded,
}

#[derive(Debug, Clone, Copy, Default)]
struct ModifierKey {
    pressed: bool,
    latch: LatchState,
    press_time: u64,
    last_release_time: Option<u64>,
    consumed: bool,
}

impl ModifierKey {
    fn status(&self) -> ModifierStatus {
        ModifierStatus {
            pressed: self.pressed,
            latch: self.latch,
        }
    }

    // A held key owns its state until release
    fn set_latch(&mut self, latch: LatchState) {
        if !self.pressed {
            self.latch = latch;
        }
    }
}

/// Shift / Alt / Sym state machine.
///
/// Shift and Alt latch for one character on a tap, lock on a double tap
/// and release on the next tap. Sym only locks (pad mode), since its tap
/// is reserved for the emoji panel.
pub struct ModifierStateMachine {
    shift: ModifierKey,
    alt: ModifierKey,
    sym: ModifierKey,
    long_press: Duration,
    phone_control: bool,
    sym_lock_enabled: bool,
    listener: Option<Box<dyn StatusListener>>,
    call_control: Option<Box<dyn CallControl>>,
    last_notified: Option<ModifierSnapshot>,
}

impl Default for ModifierStateMachine {
    fn default() -> Self {
        Self::new(DEFAULT_LONG_PRESS)
    }
}

impl ModifierStateMachine {
    /// Create a new state machine with the given long-press threshold
    pub fn new(long_press: Duration) -> Self {
        Self {
            shift: ModifierKey::default(),
            alt: ModifierKey::default(),
            sym: ModifierKey::default(),
            long_press,
            phone_control: false,
            sym_lock_enabled: true,
            listener: None,
            call_control: None,
            last_notified: None,
        }
    }

    /// Answer / end calls with Shift / Alt while a call is active
    pub fn set_phone_control(&mut self, enabled: bool) {
        self.phone_control = enabled;
    }

    /// Allow Sym to be locked with a double tap
    pub fn set_sym_lock_enabled(&mut self, enabled: bool) {
        self.sym_lock_enabled = enabled;
    }

    /// Register the status listener; it immediately receives the current state
    pub fn set_status_listener(&mut self, listener: Box<dyn StatusListener>) {
        listener.on_modifier_state_changed(&self.snapshot());
        self.last_notified = Some(self.snapshot());
        self.listener = Some(listener);
    }

    pub fn set_call_control(&mut self, call_control: Box<dyn CallControl>) {
        self.call_control = Some(call_control);
    }

    pub fn long_press(&self) -> Duration {
        self.long_press
    }

    fn long_press_ms(&self) -> u64 {
        u64::try_from(self.long_press.as_millis()).unwrap_or(u64::MAX)
    }

    fn key(&self, kind: ModifierKind) -> &ModifierKey {
        match kind {
            ModifierKind::Shift => &self.shift,
            ModifierKind::Alt => &self.alt,
            ModifierKind::Sym => &self.sym,
        }
    }

    fn key_mut(&mut self, kind: ModifierKind) -> &mut ModifierKey {
        match kind {
            ModifierKind::Shift => &mut self.shift,
            ModifierKind::Alt => &mut self.alt,
            ModifierKind::Sym => &mut self.sym,
        }
    }

    /// Current state of every modifier
    pub fn snapshot(&self) -> ModifierSnapshot {
        ModifierSnapshot {
            shift: self.shift.status(),
            alt: self.alt.status(),
            sym: self.sym.status(),
        }
    }

    pub fn status(&self, kind: ModifierKind) -> ModifierStatus {
        self.key(kind).status()
    }

    /// Pressed or latched
    pub fn is_enabled(&self, kind: ModifierKind) -> bool {
        self.status(kind).enabled()
    }

    /// Pressed or locked
    pub fn is_locked(&self, kind: ModifierKind) -> bool {
        self.status(kind).locked()
    }

    fn notify(&mut self) {
        let snapshot = self.snapshot();
        if self.last_notified == Some(snapshot) {
            return;
        }
        self.last_notified = Some(snapshot);
        log::trace!("Modifier state: {:?}", snapshot);
        if let Some(listener) = &self.listener {
            listener.on_modifier_state_changed(&snapshot);
        }
    }

    fn handle_call(&mut self, kind: ModifierKind) -> Option<ModifierOutcome> {
        if !self.phone_control {
            return None;
        }
        let calls = self.call_control.as_ref().filter(|c| c.is_calling())?;
        let outcome = match kind {
            ModifierKind::Shift => {
                calls.accept_call();
                ModifierOutcome::CallAccepted
            }
            ModifierKind::Alt => {
                calls.end_call();
                ModifierOutcome::CallEnded
            }
            ModifierKind::Sym => return None,
        };
        log::debug!("{} press handled as call control: {:?}", kind, outcome);
        Some(outcome)
    }

    /// Feed a modifier key-down (press or auto-repeat)
    pub fn on_key_down(&mut self, kind: ModifierKind, time: u64, repeat_count: u32) -> ModifierOutcome {
        if repeat_count > 0 {
            return ModifierOutcome::Handled;
        }

        if let Some(outcome) = self.handle_call(kind) {
            self.key_mut(kind).consumed = true;
            return outcome;
        }

        let key = self.key_mut(kind);
        key.pressed = true;
        key.press_time = time;

        let mut outcome = ModifierOutcome::Handled;
        if let Some(partner) = kind.partner() {
            if self.key(partner).pressed {
                self.key_mut(partner).consumed = true;
                self.key_mut(kind).consumed = true;
                log::debug!("{}+{} combo: switch layout", partner, kind);
                outcome = ModifierOutcome::SwitchLayout;
            }
        }

        self.notify();
        outcome
    }

    /// Feed a modifier key-up
    pub fn on_key_up(&mut self, kind: ModifierKind, time: u64) {
        let long_press = self.long_press_ms();
        let sym_lock_enabled = self.sym_lock_enabled;
        let key = self.key_mut(kind);
        key.pressed = false;
        let consumed = std::mem::take(&mut key.consumed);

        if !consumed && elapsed_ms(key.press_time, time) < long_press {
            let double_tap = key
                .last_release_time
                .is_some_and(|last| elapsed_ms(last, time) < long_press);
            let next = match kind {
                ModifierKind::Sym if double_tap && sym_lock_enabled => LatchState::Locked,
                ModifierKind::Sym => LatchState::Off,
                _ if double_tap => LatchState::Locked,
                _ => key.latch.toggled(),
            };
            key.set_latch(next);
        }
        key.last_release_time = Some(time);

        self.notify();
    }

    /// Turn Shift on for auto-capitalisation (only from Off)
    pub fn enable_shift(&mut self) {
        if self.shift.latch == LatchState::Off {
            self.shift.set_latch(LatchState::Latched);
            self.notify();
        }
    }

    /// Undo auto-capitalisation (only a one-shot latch is dropped)
    pub fn disable_shift(&mut self) {
        self.consume_latch(ModifierKind::Shift);
    }

    /// A one-shot latch has been used up
    pub fn consume_latch(&mut self, kind: ModifierKind) {
        let key = self.key_mut(kind);
        if key.latch == LatchState::Latched {
            key.set_latch(LatchState::Off);
            self.notify();
        }
    }

    /// Consume the Shift and Alt one-shot latches
    pub fn consume_latches(&mut self) {
        self.consume_latch(ModifierKind::Shift);
        self.consume_latch(ModifierKind::Alt);
    }

    /// Advance the full Off -> Latched -> Locked cycle (on-screen buttons)
    pub fn cycle(&mut self, kind: ModifierKind) {
        let key = self.key_mut(kind);
        let next = key.latch.next();
        key.set_latch(next);
        self.notify();
    }

    /// Drop all latches (new input field)
    pub fn reset(&mut self) {
        self.shift.set_latch(LatchState::Off);
        self.alt.set_latch(LatchState::Off);
        self.sym.set_latch(LatchState::Off);
        self.notify();
    }
}
