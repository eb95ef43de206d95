//! RopeBuffer: in-memory editing surface backed by a rope
//!
//! Used by headless hosts and by the tests as the live buffer. Cursor
//! handling follows the usual editor convention: an edit before the cursor
//! shifts it, and text inserted exactly at the cursor pushes it forward.

use super::{ChangeOrigin, EditorChange, EditorSurface, Position};
use crate::error::{Result, SyncError};
use ropey::Rope;

/// Length of `line` in characters without its newline
pub(crate) fn line_len(rope: &Rope, line: usize) -> Option<usize> {
    if line >= rope.len_lines() {
        return None;
    }
    let slice = rope.line(line);
    let length = slice.len_chars();
    if length > 0 && slice.char(length - 1) == '\n' {
        Some(length - 1)
    } else {
        Some(length)
    }
}

/// Character offset of `position`, if it lies inside the text
pub(crate) fn position_to_char(rope: &Rope, position: Position) -> Option<usize> {
    let length = line_len(rope, position.line)?;
    if position.ch > length {
        return None;
    }
    Some(rope.line_to_char(position.line) + position.ch)
}

/// Line/column of a character offset (clamped to the end of the text)
pub(crate) fn char_to_position(rope: &Rope, offset: usize) -> Position {
    let offset = offset.min(rope.len_chars());
    let line = rope.char_to_line(offset);
    Position {
        line,
        ch: offset - rope.line_to_char(line),
    }
}

/// Editing surface over a [`ropey::Rope`]
#[derive(Debug, Clone, Default)]
pub struct RopeBuffer {
    rope: Rope,

    /// Cursor as a character offset
    cursor: usize,

    /// Origin of the most recent mutation
    last_origin: Option<ChangeOrigin>,
}

impl RopeBuffer {
    pub fn new(text: &str) -> Self {
        Self {
            rope: Rope::from_str(text),
            cursor: 0,
            last_origin: None,
        }
    }

    pub fn rope(&self) -> &Rope {
        &self.rope
    }

    pub fn last_origin(&self) -> Option<ChangeOrigin> {
        self.last_origin
    }

    /// Perform a user edit and describe it the way a UI toolkit would
    ///
    /// Replaces `from..to` with `inserted`, leaves the cursor after the
    /// inserted text and returns the change to feed into the session.
    pub fn user_edit(&mut self, from: Position, to: Position, inserted: &str) -> Result<EditorChange> {
        let (start, end) = self.range(from, to)?;
        let removed = self.rope.slice(start..end).to_string();

        self.replace_range(inserted, from, to, ChangeOrigin::Input)?;
        self.cursor = start + inserted.chars().count();

        Ok(EditorChange::new(from, removed, inserted))
    }

    /// Type `text` at the cursor
    pub fn type_text(&mut self, text: &str) -> Result<EditorChange> {
        let at = self.cursor();
        self.user_edit(at, at, text)
    }

    fn range(&self, from: Position, to: Position) -> Result<(usize, usize)> {
        let start = position_to_char(&self.rope, from)
            .ok_or_else(|| SyncError::Desync(format!("position {} is outside the buffer", from)))?;
        let end = position_to_char(&self.rope, to)
            .ok_or_else(|| SyncError::Desync(format!("position {} is outside the buffer", to)))?;
        if end < start {
            return Err(SyncError::Desync(format!("range {}..{} is reversed", from, to)));
        }
        Ok((start, end))
    }
}

impl EditorSurface for RopeBuffer {
    fn value(&self) -> String {
        self.rope.to_string()
    }

    fn set_value(&mut self, text: &str) {
        self.rope = Rope::from_str(text);
        self.cursor = 0;
        self.last_origin = Some(ChangeOrigin::SetValue);
    }

    fn len_chars(&self) -> usize {
        self.rope.len_chars()
    }

    fn line_len(&self, line: usize) -> Option<usize> {
        line_len(&self.rope, line)
    }

    fn replace_range(
        &mut self,
        text: &str,
        from: Position,
        to: Position,
        origin: ChangeOrigin,
    ) -> Result<()> {
        let (start, end) = self.range(from, to)?;
        let inserted = text.chars().count();

        self.rope.remove(start..end);
        self.rope.insert(start, text);

        if self.cursor > end {
            self.cursor = self.cursor - (end - start) + inserted;
        } else if self.cursor >= start {
            self.cursor = start + inserted;
        }
        self.last_origin = Some(origin);

        Ok(())
    }

    fn cursor(&self) -> Position {
        char_to_position(&self.rope, self.cursor)
    }

    fn set_cursor(&mut self, position: Position) {
        self.cursor = position_to_char(&self.rope, position).unwrap_or(self.rope.len_chars());
    }
}
