// Pocketkeys Composer
// Multi-tap cycling, long-press alternates, composing text and punctuation rules

use super::repeat::KeyRepeatContext;
use crate::event::KeyEvent;
use crate::grapheme::{
    is_letter_or_digit_and_space, is_punctuation, last_cluster_len, match_capitalization,
    word_start_index,
};
use crate::mapping::{KeyMapTable, KeyMapping};
use crate::settings::Settings;
use crate::sink::{BatchGuard, SuggestionSource, TextSink};
use crate::Key;

/// Tunables the composer reads on every key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposerConfig {
    /// Long-press threshold, also the multi-tap and double-space window
    pub long_press_ms: u64,
    /// Space repeat count that deletes the word and switches layout
    pub layout_change_repeat_count: u32,
    pub layout_change_shortcut: bool,
    pub double_space_period: bool,
    pub auto_correction: bool,
    /// Non-alphanumeric characters that do not end the composing word
    pub keep_composing: String,
    /// How many characters before the cursor are searched for a word
    pub word_lookup_length: usize,
}

impl ComposerConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            long_press_ms: u64::try_from(settings.long_press().as_millis()).unwrap_or(u64::MAX),
            layout_change_repeat_count: settings.layout_change_repeat_count(),
            layout_change_shortcut: settings.layout_change_shortcut(),
            double_space_period: settings.double_space_period(),
            auto_correction: settings.auto_correction(),
            keep_composing: settings.keep_composing().to_string(),
            word_lookup_length: settings.word_lookup_length(),
        }
    }
}

impl Default for ComposerConfig {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

/// How the focused editor wants text delivered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputMode {
    /// Words are built as provisional text before being committed
    pub composing: bool,
    /// Numeric field: no cycling, no long-press alternates
    pub numeric: bool,
    /// Characters and backspaces are sent as key events, one at a time
    pub raw: bool,
}

impl InputMode {
    /// Regular text field
    pub fn text(composing: bool) -> Self {
        Self {
            composing,
            ..Self::default()
        }
    }

    pub fn numeric() -> Self {
        Self {
            numeric: true,
            ..Self::default()
        }
    }

    pub fn raw() -> Self {
        Self {
            raw: true,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComposerState {
    Idle,
    Composing,
}

/// Result of feeding a key-down to the composer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComposeResult {
    Handled,
    Unhandled,
    /// Space was held long enough to request the next layout
    SwitchLayout,
}

impl ComposeResult {
    pub fn is_handled(self) -> bool {
        self != ComposeResult::Unhandled
    }
}

/// Turns resolved key values into edits on a `TextSink`.
///
/// The composer owns the composing buffer. Every edit that deletes and
/// inserts is wrapped in a `BatchGuard` so the sink applies it at once.
#[derive(Debug, Clone, Default)]
pub struct Composer {
    config: ComposerConfig,
    mode: InputMode,
    buffer: String,
    selected_text: String,
    repeat: KeyRepeatContext,
    autocorrection: bool,
}

impl Composer {
    pub fn new(config: ComposerConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &ComposerConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: ComposerConfig) {
        self.autocorrection = self.mode.composing && config.auto_correction;
        self.config = config;
    }

    pub fn mode(&self) -> InputMode {
        self.mode
    }

    pub fn state(&self) -> ComposerState {
        if self.buffer.is_empty() {
            ComposerState::Idle
        } else {
            ComposerState::Composing
        }
    }

    /// Provisional text not yet committed
    pub fn composing_text(&self) -> &str {
        &self.buffer
    }

    /// The word a suggestion strip should work on: the composing text,
    /// or the selection when nothing is being composed
    pub fn current_composing_text(&self) -> &str {
        if self.buffer.is_empty() {
            &self.selected_text
        } else {
            &self.buffer
        }
    }

    pub fn repeat_context(&self) -> &KeyRepeatContext {
        &self.repeat
    }

    pub fn is_raw(&self) -> bool {
        self.mode.raw
    }

    pub fn is_composing_enabled(&self) -> bool {
        self.mode.composing
    }

    /// A new editor got focus
    pub fn start_input(&mut self, mode: InputMode) {
        self.mode = mode;
        self.autocorrection = mode.composing && self.config.auto_correction;
        self.buffer.clear();
        self.selected_text.clear();
        self.repeat.reset();
    }

    /// The editor lost focus; whatever the sink holds as composing is its business now
    pub fn finish_input(&mut self) {
        self.buffer.clear();
        self.selected_text.clear();
        self.repeat.reset();
    }

    /// Turn composing on or off, committing any open word first
    pub fn set_composing_enabled(&mut self, enabled: bool, sink: Option<&mut dyn TextSink>) {
        if let Some(sink) = sink {
            self.commit_composing(sink);
        }
        self.buffer.clear();
        self.mode.composing = enabled && !self.mode.raw;
        self.autocorrection = self.mode.composing && self.config.auto_correction;
    }

    /// Commit the composing word as-is
    pub fn reset_composing(&mut self, sink: &mut dyn TextSink) {
        self.commit_composing(sink);
    }

    /// Forget the press group; the next key starts fresh
    pub fn reset_repeat(&mut self) {
        self.repeat.reset();
    }

    /// Main key-down entry point.
    ///
    /// `shift` and `alt` are the effective modifier states at the time of
    /// the event. They only matter when the key starts a new press group.
    pub fn key_down(
        &mut self,
        event: &KeyEvent,
        table: Option<&KeyMapTable>,
        shift: bool,
        alt: bool,
        sink: &mut dyn TextSink,
        suggestions: Option<&dyn SuggestionSource>,
    ) -> ComposeResult {
        match event.key {
            Key::BACKSPACE => self.on_backspace(event, sink),
            Key::SPACE => self.on_space(event, sink, suggestions),
            key => match table.and_then(|table| table.get(key)) {
                Some(mapping) => self.on_character(event, mapping, shift, alt, sink),
                None => {
                    self.repeat.reset();
                    ComposeResult::Unhandled
                }
            },
        }
    }

    fn on_character(
        &mut self,
        event: &KeyEvent,
        mapping: &KeyMapping,
        shift: bool,
        alt: bool,
        sink: &mut dyn TextSink,
    ) -> ComposeResult {
        let window = self.config.long_press_ms;

        if event.repeat_count > 0 {
            if !self.mode.numeric
                && !self.repeat.alt()
                && !mapping.alt_values().is_empty()
                && self.repeat.held_past(event.time, window)
            {
                self.repeat.force_alt();
                let c = mapping.resolve(self.repeat.shift(), true, 0);
                log::trace!("Long press on {}: {:?}", event.key, c);
                self.replace_last(c, sink);
                self.repeat.touch(event.time);
            }
            return ComposeResult::Handled;
        }

        let cycling = mapping.has_additional_values(self.repeat.alt())
            && self.repeat.is_same_key(event.key)
            && self.repeat.within(event.time, window);

        if cycling {
            self.repeat.advance();
        } else {
            self.repeat.start_group(shift, alt);
        }

        let c = mapping.resolve(self.repeat.shift(), self.repeat.alt(), self.repeat.counter());
        log::trace!(
            "{} -> {:?} (counter {}, cycling {})",
            event.key,
            c,
            self.repeat.counter(),
            cycling
        );

        if cycling && !self.mode.numeric {
            self.replace_last(c, sink);
        } else {
            self.print_next(c, sink);
        }
        self.repeat.mark(event.key, event.time);
        ComposeResult::Handled
    }

    fn on_space(
        &mut self,
        event: &KeyEvent,
        sink: &mut dyn TextSink,
        suggestions: Option<&dyn SuggestionSource>,
    ) -> ComposeResult {
        if self.config.layout_change_shortcut && event.repeat_count > 0 {
            if event.repeat_count == self.config.layout_change_repeat_count {
                // the held space already went out as a character
                self.backspace(sink);
                log::debug!("Space held for {} repeats, switching layout", event.repeat_count);
                return ComposeResult::SwitchLayout;
            }
            return ComposeResult::Handled;
        }

        let double = self.config.double_space_period
            && self.repeat.within(event.time, self.config.long_press_ms);

        if self.mode.composing && !self.autocorrect(sink, suggestions) {
            self.commit_composing(sink);
        }

        if double && is_letter_or_digit_and_space(&sink.text_before(3)) {
            let mut batch = BatchGuard::new(sink);
            let space_len = last_cluster_len(&batch.text_before(1));
            batch.delete_before(space_len);
            batch.commit_text(". ");
        } else {
            sink.commit_text(" ");
        }

        self.repeat.mark(Key::SPACE, event.time);
        ComposeResult::Handled
    }

    fn on_backspace(&mut self, event: &KeyEvent, sink: &mut dyn TextSink) -> ComposeResult {
        if !self.mode.composing || event.repeat_count == 0 {
            self.backspace(sink);
            self.repeat.mark(Key::BACKSPACE, event.time);
            return ComposeResult::Handled;
        }

        if self.repeat.held_past(event.time, self.config.long_press_ms) {
            self.backspace(sink);
            let had_word = !self.buffer.is_empty();
            {
                let mut batch = BatchGuard::new(sink);
                self.buffer.clear();
                batch.commit_text("");
            }
            if had_word {
                self.repeat.touch(event.time);
            }
        }
        ComposeResult::Handled
    }

    fn autocorrect(
        &mut self,
        sink: &mut dyn TextSink,
        suggestions: Option<&dyn SuggestionSource>,
    ) -> bool {
        if !self.autocorrection || self.buffer.is_empty() {
            return false;
        }
        match suggestions.and_then(|source| source.recommended_correction()) {
            Some(correction) if !correction.is_empty() => {
                let correction = match_capitalization(&correction, &self.buffer);
                log::debug!("Autocorrecting {:?} to {:?}", self.buffer, correction);
                self.apply_suggestion(&correction, false, sink);
                true
            }
            _ => false,
        }
    }

    fn backspace(&mut self, sink: &mut dyn TextSink) {
        if !self.mode.composing {
            self.delete_last_character(sink);
            return;
        }

        if self.buffer.is_empty() {
            let mut batch = BatchGuard::new(sink);
            self.delete_last_character(&mut *batch);
            self.reopen_last_word(&mut *batch);
            return;
        }

        let keep = self.buffer.len() - last_cluster_len(&self.buffer);
        self.buffer.truncate(keep);
        if self.buffer.is_empty() {
            sink.commit_text("");
        } else {
            sink.set_composing_text(&self.buffer);
        }
    }

    fn delete_last_character(&mut self, sink: &mut dyn TextSink) {
        if self.mode.raw {
            sink.send_backspace();
        } else if sink.selected_text().is_empty() {
            let before = sink.text_before(self.config.word_lookup_length);
            sink.delete_before(last_cluster_len(&before));
        } else {
            sink.commit_text("");
        }
    }

    /// Pull the word right before the cursor back into the composing buffer
    fn reopen_last_word(&mut self, sink: &mut dyn TextSink) {
        let before = sink.text_before(self.config.word_lookup_length);
        let start = word_start_index(&before, &self.config.keep_composing);
        if start >= before.len() {
            return;
        }

        let word = &before[start..];
        log::trace!("Reopening {:?} for composing", word);
        self.buffer.push_str(word);
        sink.finish_composing();
        sink.delete_before(word.len());
        sink.set_composing_text(&self.buffer);
    }

    fn print_next(&mut self, c: char, sink: &mut dyn TextSink) {
        if self.mode.raw {
            sink.send_char(c);
        } else if is_punctuation(c) {
            self.punctuation(c, false, sink);
        } else if self.mode.composing {
            self.compose_char(c, sink);
        } else {
            let mut utf8 = [0; 4];
            sink.commit_text(c.encode_utf8(&mut utf8));
        }
    }

    /// Swap the last produced character for `c`
    fn replace_last(&mut self, c: char, sink: &mut dyn TextSink) {
        if self.mode.raw {
            self.backspace(sink);
            self.print_next(c, sink);
        } else if is_punctuation(c) {
            self.punctuation(c, true, sink);
        } else if self.mode.composing && !self.buffer.is_empty() {
            let keep = self.buffer.len() - last_cluster_len(&self.buffer);
            self.buffer.truncate(keep);
            self.compose_char(c, sink);
        } else if self.mode.composing {
            // previous candidate was punctuation and is already committed
            let mut batch = BatchGuard::new(sink);
            delete_last_candidate(&mut *batch);
            let mut utf8 = [0; 4];
            batch.commit_text(c.encode_utf8(&mut utf8));
            self.reopen_last_word(&mut *batch);
        } else {
            let mut batch = BatchGuard::new(sink);
            delete_last_candidate(&mut *batch);
            self.print_next(c, &mut *batch);
        }
    }

    fn compose_char(&mut self, c: char, sink: &mut dyn TextSink) {
        self.buffer.push(c);
        sink.set_composing_text(&self.buffer);
        if !c.is_alphanumeric() && !self.config.keep_composing.contains(c) {
            self.commit_composing(sink);
        }
    }

    /// Commit punctuation, pulling it against the previous word.
    ///
    /// "word |" followed by `,` becomes "word, ".
    fn punctuation(&mut self, c: char, remove_last: bool, sink: &mut dyn TextSink) {
        let mut batch = BatchGuard::new(sink);
        self.commit_composing(&mut *batch);
        let spaced = remove_last && delete_last_candidate(&mut *batch);

        let pull_space = !spaced && is_letter_or_digit_and_space(&batch.text_before(3));
        if pull_space {
            let space_len = last_cluster_len(&batch.text_before(1));
            batch.delete_before(space_len);
        }

        if spaced || pull_space {
            batch.commit_text(&format!("{} ", c));
        } else {
            let mut utf8 = [0; 4];
            batch.commit_text(c.encode_utf8(&mut utf8));
        }
    }

    fn commit_composing(&mut self, sink: &mut dyn TextSink) {
        if !self.buffer.is_empty() {
            sink.commit_text(&self.buffer);
            self.buffer.clear();
        }
    }

    /// Replace the composing word with a picked suggestion
    pub fn apply_suggestion(&mut self, text: &str, append_space: bool, sink: &mut dyn TextSink) {
        if self.mode.composing {
            self.buffer.clear();
            self.buffer.push_str(text);
            if append_space {
                self.buffer.push(' ');
            }
            self.commit_composing(sink);
        } else {
            sink.commit_text(text);
        }
    }

    /// Insert an emoji picked from the panel
    pub fn commit_emoji(&mut self, emoji: &str, sink: &mut dyn TextSink) {
        self.commit_composing(sink);
        self.apply_suggestion(emoji, false, sink);
    }

    /// The editor's cursor or selection moved.
    ///
    /// `composing_end` is where the editor thinks the composing region
    /// ends, `None` if it has none. A cursor anywhere else means the user
    /// moved away from the word, so composing stops.
    pub fn update_selection(
        &mut self,
        start: usize,
        end: usize,
        composing_end: Option<usize>,
        sink: &mut dyn TextSink,
    ) {
        if !self.mode.composing {
            return;
        }

        self.selected_text.clear();
        let moved_away = composing_end.map_or(true, |pos| start != pos || end != pos);
        if !self.buffer.is_empty() && moved_away {
            log::trace!("Cursor left the composing word, finishing {:?}", self.buffer);
            self.buffer.clear();
            self.repeat.reset();
            sink.finish_composing();
        } else if start != end {
            self.selected_text = sink.selected_text();
        }
    }
}

/// Remove the previous multi-tap candidate.
///
/// Punctuation may have pulled a space in after itself; that space goes
/// too. Returns true in that case.
fn delete_last_candidate(sink: &mut dyn TextSink) -> bool {
    let tail = sink.text_before(2);
    let mut before = tail.chars().rev();
    let spaced = matches!(
        (before.next(), before.next()),
        (Some(' '), Some(p)) if is_punctuation(p)
    );
    sink.delete_codepoints_before(if spaced { 2 } else { 1 });
    spaced
}
