//! Rope-backed text with line/column conversion.
//!
//! Widgets report positions as rows and columns; the sequence speaks in flat
//! char offsets over the visible text. `TextRope` converts between the two.

use std::ops::Range;

use smol_str::{SmolStr, ToSmolStr};

use crate::widget::Position;

/// Ropey-backed text buffer.
///
/// All offsets are in Unicode scalar values (chars), not bytes or UTF-16.
#[derive(Clone, Debug, Default)]
pub struct TextRope {
    rope: ropey::Rope,
}

impl TextRope {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_str(s: &str) -> Self {
        Self {
            rope: ropey::Rope::from_str(s),
        }
    }

    pub fn len_chars(&self) -> usize {
        self.rope.len_chars()
    }

    pub fn is_empty(&self) -> bool {
        self.len_chars() == 0
    }

    /// Insert text at char offset. Offsets past the end append.
    pub fn insert(&mut self, char_offset: usize, text: &str) {
        let at = char_offset.min(self.len_chars());
        self.rope.insert(at, text);
    }

    /// Delete a char range, clamped to the buffer.
    pub fn delete(&mut self, char_range: Range<usize>) {
        let end = char_range.end.min(self.len_chars());
        let start = char_range.start.min(end);
        self.rope.remove(start..end);
    }

    /// Get a slice. Returns None if the range is out of bounds.
    pub fn slice(&self, char_range: Range<usize>) -> Option<SmolStr> {
        if char_range.start > char_range.end || char_range.end > self.len_chars() {
            return None;
        }
        Some(self.rope.slice(char_range).to_smolstr())
    }

    /// Convert a row/column position to a char offset.
    ///
    /// Rows are split on `'\n'` only, matching [`ContentChange::lines`]; other
    /// Unicode line separators are ordinary characters. Columns past the end
    /// of a row clamp to the row end (before its line break); rows past the
    /// last one clamp to the end of the text.
    ///
    /// [`ContentChange::lines`]: crate::widget::ContentChange::lines
    pub fn position_to_offset(&self, position: Position) -> usize {
        let line_start = if position.row == 0 {
            0
        } else {
            let start = self
                .rope
                .chars()
                .enumerate()
                .filter(|(_, c)| *c == '\n')
                .nth(position.row - 1)
                .map(|(idx, _)| idx + 1);
            match start {
                Some(start) => start,
                None => return self.len_chars(),
            }
        };
        let line_len = self
            .rope
            .chars_at(line_start)
            .take_while(|c| *c != '\n')
            .count();
        line_start + position.column.min(line_len)
    }

    /// Convert a char offset to a row/column position, clamping to the end.
    pub fn offset_to_position(&self, char_offset: usize) -> Position {
        let offset = char_offset.min(self.len_chars());
        let (row, line_start) = self
            .rope
            .chars()
            .take(offset)
            .enumerate()
            .filter(|(_, c)| *c == '\n')
            .fold((0, 0), |(row, _), (idx, _)| (row + 1, idx + 1));
        Position {
            row,
            column: offset - line_start,
        }
    }
}

impl std::fmt::Display for TextRope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for chunk in self.rope.chunks() {
            f.write_str(chunk)?;
        }
        Ok(())
    }
}

impl From<&str> for TextRope {
    fn from(s: &str) -> Self {
        Self::from_str(s)
    }
}

impl From<String> for TextRope {
    fn from(s: String) -> Self {
        Self::from_str(&s)
    }
}
