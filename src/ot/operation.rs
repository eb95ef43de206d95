//! TextOperation: an edit descriptor over a linear text
//!
//! An operation is an ordered list of [`Step`]s walked from the start of the
//! source text:
//!
//! - `Retain(n)` copies the next `n` characters
//! - `Insert(s)` writes `s` at the cursor
//! - `Delete(s)` skips the next characters, which must equal `s`
//!
//! Deletes carry their text so that an operation can be inverted without the
//! source text and so that `apply` can detect corrupted operations.
//!
//! # Example
//!
//! ```rust
//! use otsync_core::ot::TextOperation;
//!
//! let mut op = TextOperation::new(Some("client-1".to_string()));
//! op.retain(5);
//! op.insert(" world");
//!
//! assert_eq!(op.source_length(), 5);
//! assert_eq!(op.target_length(), 11);
//! assert_eq!(op.apply("hello").unwrap(), "hello world");
//! assert_eq!(op.invert().apply("hello world").unwrap(), "hello");
//! ```

use crate::error::{Result, SyncError};
use crate::ClientID;

/// Number of characters in `text`
pub(crate) fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Byte index of the `n`-th character of `text` (or `text.len()`)
pub(crate) fn byte_index(text: &str, n: usize) -> usize {
    text.char_indices()
        .nth(n)
        .map(|(index, _)| index)
        .unwrap_or(text.len())
}

/// One primitive step of a [`TextOperation`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Retain(usize),
    Insert(String),
    Delete(String),
}

impl Step {
    /// Length in characters covered by this step
    pub fn len(&self) -> usize {
        match self {
            Step::Retain(amount) => *amount,
            Step::Insert(text) | Step::Delete(text) => char_len(text),
        }
    }

    /// Whether the step covers no characters
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Split after `at` characters into a head and a tail of the same kind
    pub(crate) fn split_at(&self, at: usize) -> (Step, Step) {
        match self {
            Step::Retain(amount) => (Step::Retain(at), Step::Retain(amount - at)),
            Step::Insert(text) => {
                let index = byte_index(text, at);
                (
                    Step::Insert(text[..index].to_string()),
                    Step::Insert(text[index..].to_string()),
                )
            }
            Step::Delete(text) => {
                let index = byte_index(text, at);
                (
                    Step::Delete(text[..index].to_string()),
                    Step::Delete(text[index..].to_string()),
                )
            }
        }
    }
}

/// An edit from a source text of `source_length` characters to a target text
/// of `target_length` characters
///
/// Built incrementally with [`retain`](Self::retain), [`insert`](Self::insert)
/// and [`delete`](Self::delete), which merge adjacent steps of the same kind.
/// An insert directly after a delete (or the reverse) stays a separate,
/// adjacent step: both attach at the same source position.
#[derive(Debug, Clone, Default)]
pub struct TextOperation {
    author_id: Option<ClientID>,
    steps: Vec<Step>,
    source_length: usize,
    target_length: usize,
}

impl TextOperation {
    /// Create an empty operation (identity on the empty text)
    pub fn new(author_id: Option<ClientID>) -> Self {
        Self {
            author_id,
            ..Self::default()
        }
    }

    /// Build an operation from a list of steps, normalizing as it goes
    pub fn from_steps(author_id: Option<ClientID>, steps: impl IntoIterator<Item = Step>) -> Self {
        let mut op = Self::new(author_id);
        for step in steps {
            op.push(step);
        }
        op
    }

    pub fn author_id(&self) -> Option<&str> {
        self.author_id.as_deref()
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Length of the text this operation applies to
    pub fn source_length(&self) -> usize {
        self.source_length
    }

    /// Length of the text this operation produces
    pub fn target_length(&self) -> usize {
        self.target_length
    }

    /// Append any step
    pub fn push(&mut self, step: Step) {
        match step {
            Step::Retain(amount) => self.retain(amount),
            Step::Insert(text) => self.insert(&text),
            Step::Delete(text) => self.delete(&text),
        }
    }

    /// Skip over `amount` characters
    ///
    /// Lengths saturate at `usize::MAX`; such an operation fails the length
    /// check of `apply`.
    pub fn retain(&mut self, amount: usize) {
        if amount == 0 {
            return;
        }
        self.source_length = self.source_length.saturating_add(amount);
        self.target_length = self.target_length.saturating_add(amount);

        match self.steps.last_mut() {
            Some(Step::Retain(last)) => *last = last.saturating_add(amount),
            _ => self.steps.push(Step::Retain(amount)),
        }
    }

    /// Insert `text` at the current position
    pub fn insert(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        self.target_length = self.target_length.saturating_add(char_len(text));

        match self.steps.last_mut() {
            Some(Step::Insert(last)) => last.push_str(text),
            _ => self.steps.push(Step::Insert(text.to_string())),
        }
    }

    /// Delete `text`, which must be the next characters of the source
    pub fn delete(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        self.source_length = self.source_length.saturating_add(char_len(text));

        match self.steps.last_mut() {
            Some(Step::Delete(last)) => last.push_str(text),
            _ => self.steps.push(Step::Delete(text.to_string())),
        }
    }

    /// Apply to `text`, producing the target text
    ///
    /// # Errors
    ///
    /// `LengthMismatch` if `text` is not `source_length` characters long,
    /// `CorruptOperation` if a deleted slice differs from the recorded text.
    pub fn apply(&self, text: &str) -> Result<String> {
        let length = char_len(text);
        if length != self.source_length {
            return Err(SyncError::LengthMismatch {
                operation: "apply",
                expected: self.source_length,
                actual: length,
            });
        }

        let mut result = String::with_capacity(text.len());
        let mut rest = text;
        for step in &self.steps {
            match step {
                Step::Retain(amount) => {
                    let index = byte_index(rest, *amount);
                    result.push_str(&rest[..index]);
                    rest = &rest[index..];
                }
                Step::Insert(inserted) => result.push_str(inserted),
                Step::Delete(deleted) => {
                    let index = byte_index(rest, char_len(deleted));
                    if &rest[..index] != deleted.as_str() {
                        return Err(SyncError::CorruptOperation(format!(
                            "delete expected {:?}, found {:?}",
                            deleted,
                            &rest[..index]
                        )));
                    }
                    rest = &rest[index..];
                }
            }
        }
        result.push_str(rest);

        Ok(result)
    }

    /// The operation that undoes this one
    ///
    /// Inserted and deleted texts swap roles; retains and step order are kept.
    pub fn invert(&self) -> TextOperation {
        let steps = self.steps.iter().map(|step| match step {
            Step::Retain(amount) => Step::Retain(*amount),
            Step::Insert(text) => Step::Delete(text.clone()),
            Step::Delete(text) => Step::Insert(text.clone()),
        });
        TextOperation::from_steps(self.author_id.clone(), steps)
    }

    /// Whether applying the operation leaves any text unchanged
    pub fn is_noop(&self) -> bool {
        self.steps.iter().all(|step| matches!(step, Step::Retain(_)))
    }

    /// Canonical step list used for equality
    ///
    /// Runs of adjacent inserts and deletes collapse into one insert followed
    /// by one delete, and a trailing retain is dropped.
    fn canonical(&self) -> Vec<Step> {
        let mut canonical = Vec::with_capacity(self.steps.len());
        let mut inserted = String::new();
        let mut deleted = String::new();

        let flush = |canonical: &mut Vec<Step>, inserted: &mut String, deleted: &mut String| {
            if !inserted.is_empty() {
                canonical.push(Step::Insert(std::mem::take(inserted)));
            }
            if !deleted.is_empty() {
                canonical.push(Step::Delete(std::mem::take(deleted)));
            }
        };

        for step in &self.steps {
            match step {
                Step::Retain(amount) => {
                    flush(&mut canonical, &mut inserted, &mut deleted);
                    canonical.push(Step::Retain(*amount));
                }
                Step::Insert(text) => inserted.push_str(text),
                Step::Delete(text) => deleted.push_str(text),
            }
        }
        flush(&mut canonical, &mut inserted, &mut deleted);

        if let Some(Step::Retain(_)) = canonical.last() {
            canonical.pop();
        }
        canonical
    }
}

/// Operations are equal when they make the same edit, regardless of author,
/// of a trailing retain, or of the order inside an insert/delete run
impl PartialEq for TextOperation {
    fn eq(&self, other: &Self) -> bool {
        self.canonical() == other.canonical()
    }
}

impl Eq for TextOperation {}
