// Pocketkeys External Interfaces
// Traits implemented by the host: text delivery, commands, status, telephony

mod memory;

pub use memory::MemoryTextSink;

use std::ops::{Deref, DerefMut};

use crate::event::KeyEdge;
use crate::modifier::ModifierSnapshot;
use crate::pad::{DirectionalCommand, MediaCommand};

/// Editable text of the focused field.
///
/// Lengths passed to `delete_before` are UTF-8 byte counts; `text_before`
/// and `text_after` count characters. All edits are infallible: a host
/// that lost its connection simply drops them.
pub trait TextSink {
    /// Start grouping edits into one undoable, atomically rendered step
    fn begin_batch(&mut self);

    /// Close the group opened by `begin_batch`
    fn end_batch(&mut self);

    /// Replace the composing text (or the selection) with `text` and finish composing
    fn commit_text(&mut self, text: &str);

    /// Delete `bytes` bytes before the cursor
    fn delete_before(&mut self, bytes: usize);

    /// Delete `count` code points before the cursor
    fn delete_codepoints_before(&mut self, count: usize);

    /// Replace the composing text (or the selection) with provisional `text`
    fn set_composing_text(&mut self, text: &str);

    /// Keep the composing text as committed text
    fn finish_composing(&mut self);

    /// Move the selection (byte offsets)
    fn set_selection(&mut self, start: usize, end: usize);

    /// Up to `max_chars` characters before the cursor
    fn text_before(&self, max_chars: usize) -> String;

    /// Up to `max_chars` characters after the cursor
    fn text_after(&self, max_chars: usize) -> String;

    /// Currently selected text, empty when the selection is collapsed
    fn selected_text(&self) -> String;

    /// Deliver a character as a synthetic key press (raw-input editors)
    fn send_char(&mut self, c: char) {
        let mut buf = [0u8; 4];
        self.commit_text(c.encode_utf8(&mut buf));
    }

    /// Deliver a synthetic delete key press (raw-input editors)
    fn send_backspace(&mut self) {
        self.delete_codepoints_before(1);
    }

    /// True if the next character starts a sentence
    fn cursor_caps_mode(&self) -> bool {
        false
    }
}

/// Keeps a `TextSink` batch open for the lifetime of the guard
pub struct BatchGuard<'a> {
    sink: &'a mut dyn TextSink,
}

impl<'a> BatchGuard<'a> {
    pub fn new(sink: &'a mut dyn TextSink) -> Self {
        sink.begin_batch();
        Self { sink }
    }
}

impl<'a> Deref for BatchGuard<'a> {
    type Target = dyn TextSink + 'a;

    fn deref(&self) -> &Self::Target {
        &*self.sink
    }
}

impl<'a> DerefMut for BatchGuard<'a> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut *self.sink
    }
}

impl Drop for BatchGuard<'_> {
    fn drop(&mut self) {
        self.sink.end_batch();
    }
}

/// Spell checker or dictionary offering a correction for the composing word
pub trait SuggestionSource {
    fn recommended_correction(&self) -> Option<String>;
}

/// Receives modifier state for the on-screen indicator
pub trait StatusListener {
    fn on_modifier_state_changed(&self, snapshot: &ModifierSnapshot);
}

/// Receives navigation and media commands produced in pad mode
pub trait CommandSink {
    /// Directional key edge; `shift` extends the selection
    fn directional(&mut self, command: DirectionalCommand, edge: KeyEdge, shift: bool);

    fn media(&mut self, command: MediaCommand, edge: KeyEdge);
}

/// Actions that only the host input service can perform
pub trait HostActions {
    /// Move to the next enabled layout
    fn switch_layout(&mut self) {}

    /// Show or hide the emoji panel
    fn toggle_emoji_panel(&mut self) {}

    /// Tell the user a layout could not be loaded
    fn notify_layout_load_failed(&mut self, _layout_id: &str) {}
}

/// Telephony hooks for answering and ending calls from the keyboard
pub trait CallControl {
    fn is_calling(&self) -> bool;
    fn accept_call(&self);
    fn end_call(&self);
}

/// Host that ignores every request
#[derive(Debug, Clone, Copy, Default)]
pub struct NullHost;

impl HostActions for NullHost {}

impl CommandSink for NullHost {
    fn directional(&mut self, _command: DirectionalCommand, _edge: KeyEdge, _shift: bool) {}

    fn media(&mut self, _command: MediaCommand, _edge: KeyEdge) {}
}
