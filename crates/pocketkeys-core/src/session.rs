// Pocketkeys Input Session
// Routes key events between modifiers, pad mode and the composer

use std::sync::Arc;

use strum_macros::{Display, EnumString};

use crate::compose::{ComposeResult, Composer, ComposerConfig, InputMode};
use crate::event::{KeyEvent, KeyOutcome};
use crate::layout::LayoutManager;
use crate::mapping::KeyMapTable;
use crate::modifier::{LatchState, ModifierKind, ModifierOutcome, ModifierSnapshot, ModifierStateMachine};
use crate::pad::{binding_for, PadModeTranslator};
use crate::settings::Settings;
use crate::sink::{
    CallControl, CommandSink, HostActions, NullHost, StatusListener, SuggestionSource, TextSink,
};
use crate::Key;

/// Kind of field that has focus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumString)]
#[strum(ascii_case_insensitive)]
pub enum EditorClass {
    #[default]
    Text,
    Number,
    DateTime,
    Phone,
    /// No editor, only key events
    Null,
}

impl EditorClass {
    /// Fields that get the numeric layout
    pub fn is_numeric(self) -> bool {
        matches!(self, EditorClass::Number | EditorClass::DateTime | EditorClass::Phone)
    }
}

/// Focused editor as reported by the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorInfo {
    /// Owning application, matched against the raw/direct input lists
    pub package: String,
    pub class: EditorClass,
    /// The editor accepts composing text and suggestions
    pub suggestions_allowed: bool,
}

impl EditorInfo {
    pub fn new(package: impl Into<String>, class: EditorClass) -> Self {
        Self {
            package: package.into(),
            class,
            suggestions_allowed: class == EditorClass::Text,
        }
    }

    pub fn with_suggestions(mut self, allowed: bool) -> Self {
        self.suggestions_allowed = allowed;
        self
    }
}

/// One input method instance bound to a host.
///
/// Events must be fed in order from a single thread. The session is the
/// only owner of modifier, composer and pad state; text edits go to the
/// `TextSink` passed with each event.
pub struct InputSession {
    settings: Settings,
    modifiers: ModifierStateMachine,
    composer: Composer,
    pad: PadModeTranslator,
    layouts: LayoutManager,
    text_layout: String,
    editor: Option<EditorInfo>,
    host: Box<dyn HostActions>,
    commands: Box<dyn CommandSink>,
    suggestions: Option<Box<dyn SuggestionSource>>,
    pad_just_used: bool,
}

impl InputSession {
    pub fn new(settings: Settings, layouts: LayoutManager) -> Self {
        let mut modifiers = ModifierStateMachine::new(settings.long_press());
        modifiers.set_phone_control(settings.phone_control());
        modifiers.set_sym_lock_enabled(settings.lock_sym_pad());

        Self {
            composer: Composer::new(ComposerConfig::from_settings(&settings)),
            pad: PadModeTranslator::new(settings.long_press()),
            text_layout: settings.default_layout().to_string(),
            modifiers,
            layouts,
            settings,
            editor: None,
            host: Box::new(NullHost),
            commands: Box::new(NullHost),
            suggestions: None,
            pad_just_used: false,
        }
    }

    pub fn with_host(mut self, host: impl HostActions + 'static) -> Self {
        self.host = Box::new(host);
        self
    }

    pub fn with_commands(mut self, commands: impl CommandSink + 'static) -> Self {
        self.commands = Box::new(commands);
        self
    }

    pub fn with_suggestions(mut self, suggestions: impl SuggestionSource + 'static) -> Self {
        self.suggestions = Some(Box::new(suggestions));
        self
    }

    pub fn with_status_listener(mut self, listener: impl StatusListener + 'static) -> Self {
        self.modifiers.set_status_listener(Box::new(listener));
        self
    }

    pub fn with_call_control(mut self, call_control: impl CallControl + 'static) -> Self {
        self.modifiers.set_call_control(Box::new(call_control));
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Apply changed settings; composing state is kept
    pub fn apply_settings(&mut self, settings: Settings) {
        self.modifiers.set_phone_control(settings.phone_control());
        self.modifiers.set_sym_lock_enabled(settings.lock_sym_pad());
        self.composer.set_config(ComposerConfig::from_settings(&settings));
        self.settings = settings;
    }

    pub fn modifiers(&self) -> &ModifierStateMachine {
        &self.modifiers
    }

    pub fn snapshot(&self) -> ModifierSnapshot {
        self.modifiers.snapshot()
    }

    pub fn composer(&self) -> &Composer {
        &self.composer
    }

    pub fn layouts(&self) -> &LayoutManager {
        &self.layouts
    }

    /// Active key map, `None` until a layout loaded
    pub fn current_layout(&self) -> Option<&Arc<KeyMapTable>> {
        self.layouts.current()
    }

    pub fn editor(&self) -> Option<&EditorInfo> {
        self.editor.as_ref()
    }

    fn is_direct_input(&self) -> bool {
        self.editor
            .as_ref()
            .is_some_and(|editor| self.settings.is_direct_input_editor(&editor.package))
    }

    // Sym held or locked
    fn pad_active(&self) -> bool {
        self.modifiers.is_locked(ModifierKind::Sym)
    }

    /// Focus moved to `editor`.
    ///
    /// `restarting` is true when the same editor is re-initialised, in
    /// which case latched modifiers survive.
    pub fn start_input(&mut self, editor: EditorInfo, restarting: bool) {
        if !restarting {
            self.modifiers.reset();
        }
        self.pad.reset();
        self.pad_just_used = false;

        let raw = self.settings.is_raw_input_editor(&editor.package);
        let loaded = if editor.class.is_numeric() {
            self.layouts.switch_to_numeric()
        } else {
            let layout = self.text_layout.clone();
            self.layouts.switch_to(&layout)
        };
        if loaded.is_err() {
            if let Some(layout_id) = self.layouts.take_failure() {
                self.host.notify_layout_load_failed(&layout_id);
            }
        }

        let mode = if raw {
            InputMode::raw()
        } else if editor.class.is_numeric() {
            InputMode::numeric()
        } else {
            InputMode::text(editor.suggestions_allowed)
        };
        log::debug!(
            "Start input in {} ({}): {:?}, layout {:?}",
            editor.package,
            editor.class,
            mode,
            self.layouts.current_id()
        );
        self.composer.start_input(mode);
        self.editor = Some(editor);
    }

    /// Focus left the editor
    pub fn finish_input(&mut self) {
        self.composer.finish_input();
        self.pad.reset();
        self.editor = None;
    }

    /// Make `layout_id` the text layout.
    ///
    /// The layout only becomes active right away if the focused editor is
    /// not numeric. A failed load keeps the previous layout and notifies
    /// the host.
    pub fn switch_layout(
        &mut self,
        layout_id: &str,
        suggestions_allowed: bool,
        sink: Option<&mut dyn TextSink>,
    ) {
        self.composer.set_composing_enabled(suggestions_allowed, sink);
        if let Some(editor) = self.editor.as_mut() {
            editor.suggestions_allowed = suggestions_allowed;
        }
        if self.editor.as_ref().is_some_and(|editor| editor.class.is_numeric()) {
            self.text_layout = layout_id.to_string();
            return;
        }

        match self.layouts.switch_to(layout_id) {
            Ok(_) => self.text_layout = layout_id.to_string(),
            Err(_) => {
                if let Some(failed) = self.layouts.take_failure() {
                    self.host.notify_layout_load_failed(&failed);
                }
            }
        }
    }

    /// Key-down (press or auto-repeat).
    ///
    /// Returns `Unhandled` when the host should deliver the event to the
    /// editor unchanged.
    pub fn key_down(&mut self, event: &KeyEvent, sink: Option<&mut dyn TextSink>) -> KeyOutcome {
        if self.is_direct_input() {
            return KeyOutcome::Unhandled;
        }

        if let Some(kind) = ModifierKind::from_key(event.key) {
            if self.modifiers.on_key_down(kind, event.time, event.repeat_count)
                == ModifierOutcome::SwitchLayout
            {
                self.host.switch_layout();
            }
            return KeyOutcome::Handled;
        }

        let pad_active = self.pad_active();
        if event.ctrl && !pad_active {
            self.composer.reset_repeat();
            return KeyOutcome::Unhandled;
        }
        let Some(sink) = sink else {
            return KeyOutcome::Unhandled;
        };

        if pad_active && binding_for(event.key).is_some() {
            self.composer.reset_composing(sink);
            self.composer.reset_repeat();
            let shift = self.modifiers.is_enabled(ModifierKind::Shift);
            if self.pad.key_down(event, shift, self.commands.as_mut()) {
                self.pad_just_used = true;
                return KeyOutcome::Handled;
            }
        }

        if event.ctrl || event.key == Key::ENTER || event.key.is_ctrl() {
            self.composer.reset_composing(sink);
            self.composer.reset_repeat();
            return KeyOutcome::Unhandled;
        }

        let shift = self.modifiers.is_enabled(ModifierKind::Shift);
        let alt = self.modifiers.is_enabled(ModifierKind::Alt);
        let table = self.layouts.current().map(Arc::as_ref);
        let result = self.composer.key_down(
            event,
            table,
            shift,
            alt,
            sink,
            self.suggestions.as_deref(),
        );

        if result.is_handled() {
            self.update_meta_state(sink);
        }
        if result == ComposeResult::SwitchLayout {
            self.host.switch_layout();
        }
        result.is_handled().into()
    }

    /// Key-up
    pub fn key_up(&mut self, event: &KeyEvent) -> KeyOutcome {
        if self.is_direct_input() {
            return KeyOutcome::Unhandled;
        }

        if let Some(kind) = ModifierKind::from_key(event.key) {
            let was_locked = self.modifiers.status(kind).latch == LatchState::Locked;
            self.modifiers.on_key_up(kind, event.time);
            if kind == ModifierKind::Sym {
                if !self.pad_just_used && !was_locked {
                    self.host.toggle_emoji_panel();
                }
                self.pad_just_used = false;
            }
            return KeyOutcome::Handled;
        }

        if self.pad_active() || self.pad.has_pressed_key(event.key) {
            let shift = self.modifiers.is_enabled(ModifierKind::Shift);
            if self.pad.key_up(event, shift, self.commands.as_mut()) {
                return KeyOutcome::Handled;
            }
        }

        if event.ctrl {
            return KeyOutcome::Unhandled;
        }
        let consumed = event.key == Key::SPACE
            || event.key == Key::BACKSPACE
            || self
                .layouts
                .current()
                .is_some_and(|table| table.contains(event.key));
        consumed.into()
    }

    /// Drop used one-shot latches after a character
    fn update_meta_state(&mut self, sink: &dyn TextSink) {
        if self.settings.auto_capitalization() {
            self.refresh_caps(sink);
            self.modifiers.consume_latch(ModifierKind::Alt);
        } else {
            self.modifiers.consume_latches();
        }
    }

    /// Latch or release Shift for auto-capitalisation at the cursor
    pub fn refresh_caps(&mut self, sink: &dyn TextSink) {
        if !self.settings.auto_capitalization() {
            return;
        }
        if self.composer.is_composing_enabled() && sink.cursor_caps_mode() {
            self.modifiers.enable_shift();
        } else {
            self.modifiers.disable_shift();
        }
    }

    /// Cursor or selection moved in the editor
    pub fn update_selection(
        &mut self,
        start: usize,
        end: usize,
        composing_end: Option<usize>,
        sink: &mut dyn TextSink,
    ) {
        self.composer.update_selection(start, end, composing_end, sink);
        self.refresh_caps(sink);
    }

    /// A suggestion was picked from the strip
    pub fn apply_suggestion(&mut self, text: &str, append_space: bool, sink: &mut dyn TextSink) {
        self.composer.apply_suggestion(text, append_space, sink);
        self.update_meta_state(sink);
    }

    /// An emoji was picked from the panel
    pub fn commit_emoji(&mut self, emoji: &str, sink: &mut dyn TextSink) {
        self.composer.commit_emoji(emoji, sink);
    }

    /// Word the suggestion strip should work on
    pub fn current_composing_text(&self) -> &str {
        self.composer.current_composing_text()
    }

    /// On-screen modifier button
    pub fn cycle_modifier(&mut self, kind: ModifierKind) {
        self.modifiers.cycle(kind);
    }
}
