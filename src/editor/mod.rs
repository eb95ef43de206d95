//! Editing surface boundary
//!
//! The synchronization core does not render or capture keystrokes. It sees
//! the editing surface through the [`EditorSurface`] trait, receives local
//! edits as [`ChangeBatch`]es and pushes buffer mutations back through
//! [`EditorSurface::replace_range`].
//!
//! Positions are line/column pairs; columns count characters and lines are
//! separated by `\n`.

pub mod buffer;
pub mod translate;

pub use buffer::RopeBuffer;
pub use translate::EditTranslator;

use crate::error::Result;

/// A line/column position in the buffer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position {
    pub line: usize,
    pub ch: usize,
}

impl Position {
    pub fn new(line: usize, ch: usize) -> Self {
        Self { line, ch }
    }

    /// Position right after `text` when it is written starting here
    pub fn advanced_by(self, text: &str) -> Position {
        match text.rfind('\n') {
            Some(last_newline) => Position {
                line: self.line + text.matches('\n').count(),
                ch: text[last_newline + 1..].chars().count(),
            },
            None => Position {
                line: self.line,
                ch: self.ch + text.chars().count(),
            },
        }
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.ch)
    }
}

/// Where a buffer change came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeOrigin {
    /// Typed or pasted by the local user
    Input,
    /// Applied from a remote operation
    Network,
    /// Applied by the session's undo
    Undo,
    /// Applied by the session's redo
    Redo,
    /// Whole-buffer reset (document load)
    SetValue,
}

impl ChangeOrigin {
    /// Only user input is translated into outbound operations
    pub fn is_user(self) -> bool {
        matches!(self, ChangeOrigin::Input)
    }
}

/// A single range replacement reported by the editing surface
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorChange {
    /// Start of the replaced range, in the text as it was before this change
    pub from: Position,
    pub removed: String,
    pub inserted: String,
}

impl EditorChange {
    pub fn new(from: Position, removed: impl Into<String>, inserted: impl Into<String>) -> Self {
        Self {
            from,
            removed: removed.into(),
            inserted: inserted.into(),
        }
    }
}

/// Changes the surface applied together, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeBatch {
    pub origin: ChangeOrigin,
    pub changes: Vec<EditorChange>,
}

impl ChangeBatch {
    pub fn new(origin: ChangeOrigin, changes: Vec<EditorChange>) -> Self {
        Self { origin, changes }
    }

    /// A batch of user edits
    pub fn user(changes: Vec<EditorChange>) -> Self {
        Self::new(ChangeOrigin::Input, changes)
    }
}

/// The live text buffer the session keeps in sync
///
/// Implementations report positions outside the buffer as errors from
/// `replace_range` and `None` from `line_len`; the translator turns both into
/// a desync.
pub trait EditorSurface {
    /// Full buffer content
    fn value(&self) -> String;

    /// Replace the whole buffer (document load)
    fn set_value(&mut self, text: &str);

    /// Buffer length in characters
    fn len_chars(&self) -> usize;

    /// Length of `line` in characters, without its newline
    fn line_len(&self, line: usize) -> Option<usize>;

    /// Replace the text between `from` and `to` with `text`
    fn replace_range(
        &mut self,
        text: &str,
        from: Position,
        to: Position,
        origin: ChangeOrigin,
    ) -> Result<()>;

    fn cursor(&self) -> Position;

    fn set_cursor(&mut self, position: Position);
}
