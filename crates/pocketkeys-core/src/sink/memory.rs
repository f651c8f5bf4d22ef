// Pocketkeys In-Memory Text Sink
// A TextSink over a String, used by the replay CLI and tests

use std::ops::Range;

use super::TextSink;

/// Text field held in memory.
///
/// Offsets are byte offsets into `text`, always on char boundaries.
#[derive(Debug, Clone, Default)]
pub struct MemoryTextSink {
    text: String,
    selection: Range<usize>,
    composing: Option<Range<usize>>,
    batch_depth: usize,
    batch_count: usize,
}

fn floor_boundary(text: &str, index: usize) -> usize {
    let mut index = index.min(text.len());
    while !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}

impl MemoryTextSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with `text` and the cursor at its end
    pub fn with_text(text: impl Into<String>) -> Self {
        let text = text.into();
        let end = text.len();
        Self {
            text,
            selection: end..end,
            ..Self::default()
        }
    }

    /// Whole field content, composing text included
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Provisional text, empty when nothing is being composed
    pub fn composing_text(&self) -> &str {
        self.composing
            .as_ref()
            .map(|r| &self.text[r.clone()])
            .unwrap_or("")
    }

    /// Byte range of the composing text
    pub fn composing_range(&self) -> Option<Range<usize>> {
        self.composing.clone()
    }

    /// Text outside the composing span
    pub fn committed_text(&self) -> String {
        match &self.composing {
            Some(r) => format!("{}{}", &self.text[..r.start], &self.text[r.end..]),
            None => self.text.clone(),
        }
    }

    /// Cursor position (selection start)
    pub fn cursor(&self) -> usize {
        self.selection.start
    }

    pub fn selection(&self) -> Range<usize> {
        self.selection.clone()
    }

    /// Currently open batches
    pub fn batch_depth(&self) -> usize {
        self.batch_depth
    }

    /// Batches opened so far
    pub fn batch_count(&self) -> usize {
        self.batch_count
    }

    // Range replaced by the next composing or commit edit
    fn edit_range(&self) -> Range<usize> {
        self.composing.clone().unwrap_or_else(|| self.selection.clone())
    }

    fn replace(&mut self, range: Range<usize>, text: &str) -> Range<usize> {
        self.text.replace_range(range.clone(), text);
        let end = range.start + text.len();
        self.selection = end..end;
        range.start..end
    }

    fn delete_range(&mut self, range: Range<usize>) {
        if range.is_empty() {
            return;
        }
        let removed = range.len();
        if let Some(c) = self.composing.take() {
            if c.end <= range.start {
                self.composing = Some(c);
            } else if c.start >= range.end {
                self.composing = Some(c.start - removed..c.end - removed);
            }
        }
        self.text.replace_range(range.clone(), "");
        let shift = |pos: usize| {
            if pos >= range.end {
                pos - removed
            } else if pos > range.start {
                range.start
            } else {
                pos
            }
        };
        self.selection = shift(self.selection.start)..shift(self.selection.end);
    }
}

impl TextSink for MemoryTextSink {
    fn begin_batch(&mut self) {
        self.batch_depth += 1;
        self.batch_count += 1;
    }

    fn end_batch(&mut self) {
        self.batch_depth = self.batch_depth.saturating_sub(1);
    }

    fn commit_text(&mut self, text: &str) {
        let range = self.edit_range();
        self.replace(range, text);
        self.composing = None;
    }

    fn delete_before(&mut self, bytes: usize) {
        let end = self.selection.start;
        let start = floor_boundary(&self.text, end.saturating_sub(bytes));
        self.delete_range(start..end);
    }

    fn delete_codepoints_before(&mut self, count: usize) {
        let end = self.selection.start;
        let start = self.text[..end]
            .char_indices()
            .rev()
            .take(count)
            .last()
            .map(|(i, _)| i)
            .unwrap_or(end);
        self.delete_range(start..end);
    }

    fn set_composing_text(&mut self, text: &str) {
        let range = self.edit_range();
        let composed = self.replace(range, text);
        self.composing = if composed.is_empty() {
            None
        } else {
            Some(composed)
        };
    }

    fn finish_composing(&mut self) {
        self.composing = None;
    }

    fn set_selection(&mut self, start: usize, end: usize) {
        let start = floor_boundary(&self.text, start);
        let end = floor_boundary(&self.text, end);
        self.selection = start.min(end)..start.max(end);
    }

    fn text_before(&self, max_chars: usize) -> String {
        let before = &self.text[..self.selection.start];
        let start = before
            .char_indices()
            .rev()
            .take(max_chars)
            .last()
            .map(|(i, _)| i)
            .unwrap_or(before.len());
        before[start..].to_string()
    }

    fn text_after(&self, max_chars: usize) -> String {
        self.text[self.selection.end..].chars().take(max_chars).collect()
    }

    fn selected_text(&self) -> String {
        self.text[self.selection.clone()].to_string()
    }

    fn cursor_caps_mode(&self) -> bool {
        let before = &self.text[..self.selection.start];
        let trimmed = before.trim_end();
        if trimmed.is_empty() {
            return true;
        }
        trimmed.len() < before.len() && trimmed.ends_with(|c| matches!(c, '.' | '!' | '?'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_composing_then_commit() {
        let mut sink = MemoryTextSink::with_text("say ");
        sink.set_composing_text("h");
        sink.set_composing_text("hi");
        assert_eq!(sink.text(), "say hi");
        assert_eq!(sink.composing_text(), "hi");
        assert_eq!(sink.committed_text(), "say ");

        sink.commit_text("hi ");
        assert_eq!(sink.text(), "say hi ");
        assert_eq!(sink.composing_text(), "");
        assert_eq!(sink.cursor(), 7);
    }

    #[test]
    fn test_empty_composing_cancels() {
        let mut sink = MemoryTextSink::with_text("a");
        sink.set_composing_text("b");
        sink.set_composing_text("");
        assert_eq!(sink.text(), "a");
        assert!(sink.composing_range().is_none());
    }

    #[test]
    fn test_delete_before() {
        let mut sink = MemoryTextSink::with_text("h\u{00E9}llo");
        sink.delete_codepoints_before(4);
        assert_eq!(sink.text(), "h");

        let mut sink = MemoryTextSink::with_text("ab\u{1F600}");
        sink.delete_before(4);
        assert_eq!(sink.text(), "ab");
        sink.delete_before(10);
        assert_eq!(sink.text(), "");
    }

    #[test]
    fn test_text_around_cursor() {
        let mut sink = MemoryTextSink::with_text("hello world");
        sink.set_selection(5, 5);
        assert_eq!(sink.text_before(3), "llo");
        assert_eq!(sink.text_before(50), "hello");
        assert_eq!(sink.text_after(3), " wo");

        sink.set_selection(6, 11);
        assert_eq!(sink.selected_text(), "world");
        sink.commit_text("there");
        assert_eq!(sink.text(), "hello there");
    }

    #[test]
    fn test_cursor_caps_mode() {
        assert!(MemoryTextSink::new().cursor_caps_mode());
        assert!(MemoryTextSink::with_text("Done. ").cursor_caps_mode());
        assert!(MemoryTextSink::with_text("Really?  ").cursor_caps_mode());
        assert!(!MemoryTextSink::with_text("Done.").cursor_caps_mode());
        assert!(!MemoryTextSink::with_text("word ").cursor_caps_mode());
    }
}
