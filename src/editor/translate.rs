//! EditTranslator: editing-surface changes <-> TextOperation
//!
//! The translator keeps a snapshot of the text as the shared algebra sees
//! it. Local change batches are positioned against that snapshot (the
//! surface itself already holds the post-edit text), and every operation
//! applied to the surface is first checked against it. Any position or
//! content that does not line up means the buffer and the shared document
//! diverged, which is reported as [`SyncError::Desync`].

use super::buffer::{line_len, position_to_char};
use super::{ChangeBatch, ChangeOrigin, EditorChange, EditorSurface, Position};
use crate::error::{Result, SyncError};
use crate::ot::{compose, Step, TextOperation};
use crate::ClientID;
use ropey::Rope;
use tracing::trace;

/// Translates between surface changes and operations for one client
#[derive(Debug, Clone)]
pub struct EditTranslator {
    client_id: ClientID,

    /// Text as of the last translated batch or applied operation
    snapshot: Rope,
}

impl EditTranslator {
    pub fn new(client_id: ClientID, text: &str) -> Self {
        Self {
            client_id,
            snapshot: Rope::from_str(text),
        }
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Replace the snapshot (document load)
    pub fn reset(&mut self, text: &str) {
        self.snapshot = Rope::from_str(text);
    }

    pub fn snapshot(&self) -> &Rope {
        &self.snapshot
    }

    /// Turn a batch of local changes into one composed operation
    ///
    /// Returns `None` for batches that must not produce outbound operations
    /// (anything but user input) and for batches that change nothing.
    pub fn translate(&mut self, batch: &ChangeBatch) -> Result<Option<TextOperation>> {
        if !batch.origin.is_user() {
            return Ok(None);
        }

        let mut composed: Option<TextOperation> = None;
        for change in &batch.changes {
            let operation = self.translate_change(change)?;
            composed = Some(match composed {
                None => operation,
                Some(previous) => compose(&previous, &operation).map_err(SyncError::into_desync)?,
            });
        }

        trace!(client_id = %self.client_id, changes = batch.changes.len(), "translated change batch");
        Ok(composed.filter(|operation| !operation.is_noop()))
    }

    fn translate_change(&mut self, change: &EditorChange) -> Result<TextOperation> {
        let length = self.snapshot.len_chars();
        let offset = position_to_char(&self.snapshot, change.from).ok_or_else(|| {
            SyncError::Desync(format!("change at {} is outside the known text", change.from))
        })?;

        let removed_len = change.removed.chars().count();
        if offset + removed_len > length {
            return Err(SyncError::Desync(format!(
                "change at {} removes past the end of the known text",
                change.from
            )));
        }
        let removed = self.snapshot.slice(offset..offset + removed_len);
        if removed != change.removed.as_str() {
            return Err(SyncError::Desync(format!(
                "change at {} removed {:?} but the known text has {:?}",
                change.from,
                change.removed,
                removed.to_string()
            )));
        }

        let mut operation = TextOperation::new(Some(self.client_id.clone()));
        operation.retain(offset);
        operation.delete(&change.removed);
        operation.insert(&change.inserted);
        operation.retain(length - offset - removed_len);

        self.snapshot.remove(offset..offset + removed_len);
        self.snapshot.insert(offset, &change.inserted);

        Ok(operation)
    }

    /// Apply `operation` to the live buffer
    ///
    /// Each insert and delete becomes a `replace_range` on the surface. With
    /// `move_cursor` the cursor ends up after the last edit; otherwise a
    /// cursor sitting exactly where text is inserted stays in front of it
    /// unless the operation wins the tie-break against this client.
    pub fn apply_operation<S>(
        &mut self,
        surface: &mut S,
        operation: &TextOperation,
        origin: ChangeOrigin,
        move_cursor: bool,
    ) -> Result<()>
    where
        S: EditorSurface + ?Sized,
    {
        let next = operation
            .apply(&self.snapshot.to_string())
            .map_err(SyncError::into_desync)?;

        let mut position = Position::default();
        for step in operation.steps() {
            match step {
                Step::Retain(amount) => {
                    position = advance(surface, position, *amount)?;
                }
                Step::Insert(text) => {
                    let cursor_at_insert = surface.cursor() == position;
                    surface
                        .replace_range(text, position, position, origin)
                        .map_err(SyncError::into_desync)?;
                    let end = position.advanced_by(text);

                    if move_cursor {
                        surface.set_cursor(end);
                    } else if cursor_at_insert {
                        if operation.got_priority(&self.client_id) {
                            surface.set_cursor(end);
                        } else {
                            surface.set_cursor(position);
                        }
                    }
                    position = end;
                }
                Step::Delete(text) => {
                    let end = position.advanced_by(text);
                    surface
                        .replace_range("", position, end, origin)
                        .map_err(SyncError::into_desync)?;
                    if move_cursor {
                        surface.set_cursor(position);
                    }
                }
            }
        }

        let expected = next.chars().count();
        if surface.len_chars() != expected {
            return Err(SyncError::Desync(format!(
                "buffer has {} characters after applying, expected {}",
                surface.len_chars(),
                expected
            )));
        }
        self.snapshot = Rope::from_str(&next);

        Ok(())
    }

    /// Line/column of a character offset in the snapshot
    pub fn position_of(&self, offset: usize) -> Result<Position> {
        if offset > self.snapshot.len_chars() {
            return Err(SyncError::Desync(format!(
                "offset {} is past the end of the known text",
                offset
            )));
        }
        Ok(super::buffer::char_to_position(&self.snapshot, offset))
    }

    /// Character offset of a line/column in the snapshot
    pub fn offset_of(&self, position: Position) -> Result<usize> {
        position_to_char(&self.snapshot, position)
            .ok_or_else(|| SyncError::Desync(format!("position {} is outside the known text", position)))
    }

    /// Length of a snapshot line, without its newline
    pub fn line_len(&self, line: usize) -> Option<usize> {
        line_len(&self.snapshot, line)
    }
}

/// Walk `amount` characters forward from `position` over the live buffer
fn advance<S>(surface: &S, position: Position, amount: usize) -> Result<Position>
where
    S: EditorSurface + ?Sized,
{
    let Position { mut line, mut ch } = position;
    let mut remaining = amount;

    loop {
        let length = surface.line_len(line).ok_or_else(|| {
            SyncError::Desync(format!("retain of {} walks off the end of the buffer", amount))
        })?;
        let available = length.saturating_sub(ch);
        if remaining <= available {
            return Ok(Position::new(line, ch + remaining));
        }
        remaining -= available + 1;
        line += 1;
        ch = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::RopeBuffer;

    fn translator(text: &str) -> EditTranslator {
        EditTranslator::new("me".to_string(), text)
    }

    #[test]
    fn test_translate_single_insert() {
        let mut translator = translator("ab\ncd");
        let batch = ChangeBatch::user(vec![EditorChange::new(Position::new(1, 1), "", "X")]);

        let op = translator.translate(&batch).unwrap().unwrap();
        assert_eq!(op.author_id(), Some("me"));
        assert_eq!(op.source_length(), 5);
        assert_eq!(op.apply("ab\ncd").unwrap(), "ab\ncXd");
        assert_eq!(translator.snapshot().to_string(), "ab\ncXd");
    }

    #[test]
    fn test_translate_composes_batch() {
        let mut translator = translator("hello");
        let batch = ChangeBatch::user(vec![
            EditorChange::new(Position::new(0, 0), "h", "H"),
            EditorChange::new(Position::new(0, 5), "", "!"),
            EditorChange::new(Position::new(0, 6), "", "\nnext"),
        ]);

        let op = translator.translate(&batch).unwrap().unwrap();
        assert_eq!(op.source_length(), 5);
        assert_eq!(op.apply("hello").unwrap(), "Hello!\nnext");
    }

    #[test]
    fn test_translate_multiline_delete() {
        let mut translator = translator("one\ntwo\nthree");
        let batch = ChangeBatch::user(vec![EditorChange::new(Position::new(0, 1), "ne\ntwo\nt", "")]);

        let op = translator.translate(&batch).unwrap().unwrap();
        assert_eq!(op.apply("one\ntwo\nthree").unwrap(), "ohree");
    }

    #[test]
    fn test_non_user_batches_are_ignored() {
        let mut translator = translator("abc");
        for origin in [ChangeOrigin::Network, ChangeOrigin::Undo, ChangeOrigin::Redo, ChangeOrigin::SetValue] {
            let batch = ChangeBatch::new(origin, vec![EditorChange::new(Position::new(0, 0), "", "x")]);
            assert!(translator.translate(&batch).unwrap().is_none());
        }
        assert_eq!(translator.snapshot().to_string(), "abc");
    }

    #[test]
    fn test_empty_change_is_noop() {
        let mut translator = translator("abc");
        let batch = ChangeBatch::user(vec![EditorChange::new(Position::new(0, 1), "", "")]);
        assert!(translator.translate(&batch).unwrap().is_none());
    }

    #[test]
    fn test_translate_out_of_bounds_is_desync() {
        let mut translator = translator("abc");
        let batch = ChangeBatch::user(vec![EditorChange::new(Position::new(4, 0), "", "x")]);
        assert!(matches!(translator.translate(&batch), Err(SyncError::Desync(_))));

        let batch = ChangeBatch::user(vec![EditorChange::new(Position::new(0, 1), "zz", "")]);
        assert!(matches!(translator.translate(&batch), Err(SyncError::Desync(_))));
    }

    #[test]
    fn test_apply_operation_to_buffer() {
        let mut translator = translator("ab\ncd\nef");
        let mut buffer = RopeBuffer::new("ab\ncd\nef");

        let op = TextOperation::from_steps(
            Some("other".to_string()),
            vec![
                Step::Retain(1),
                Step::Delete("b\nc".to_string()),
                Step::Insert("X\nY\n".to_string()),
                Step::Retain(2),
                Step::Insert("!".to_string()),
                Step::Retain(2),
            ],
        );
        translator
            .apply_operation(&mut buffer, &op, ChangeOrigin::Network, false)
            .unwrap();

        assert_eq!(buffer.value(), "aX\nY\nd\n!ef");
        assert_eq!(translator.snapshot().to_string(), buffer.value());
        assert_eq!(buffer.last_origin(), Some(ChangeOrigin::Network));
    }

    #[test]
    fn test_apply_operation_moves_cursor() {
        let mut translator = translator("hello");
        let mut buffer = RopeBuffer::new("hello");

        let op = TextOperation::from_steps(
            Some("me".to_string()),
            vec![Step::Retain(2), Step::Insert("XY".to_string()), Step::Retain(3)],
        );
        translator
            .apply_operation(&mut buffer, &op, ChangeOrigin::Undo, true)
            .unwrap();
        assert_eq!(buffer.cursor(), Position::new(0, 4));
    }

    #[test]
    fn test_cursor_tie_break_on_remote_insert() {
        // "me" sorts after "alpha" and before "zulu".
        let insert_at_cursor = |author: &str| {
            let mut translator = translator("ab");
            let mut buffer = RopeBuffer::new("ab");
            buffer.set_cursor(Position::new(0, 1));

            let op = TextOperation::from_steps(
                Some(author.to_string()),
                vec![Step::Retain(1), Step::Insert("--".to_string()), Step::Retain(1)],
            );
            translator
                .apply_operation(&mut buffer, &op, ChangeOrigin::Network, false)
                .unwrap();
            buffer.cursor()
        };

        assert_eq!(insert_at_cursor("alpha"), Position::new(0, 3));
        assert_eq!(insert_at_cursor("zulu"), Position::new(0, 1));
    }

    #[test]
    fn test_apply_operation_on_diverged_buffer_is_desync() {
        let mut translator = translator("abc");
        let mut buffer = RopeBuffer::new("a");

        let op = TextOperation::from_steps(
            Some("other".to_string()),
            vec![Step::Retain(3), Step::Insert("d".to_string())],
        );
        let result = translator.apply_operation(&mut buffer, &op, ChangeOrigin::Network, false);
        assert!(matches!(result, Err(SyncError::Desync(_))));
    }

    #[test]
    fn test_apply_operation_with_wrong_source_is_desync() {
        let mut translator = translator("abc");
        let mut buffer = RopeBuffer::new("abc");

        let op = TextOperation::from_steps(Some("other".to_string()), vec![Step::Retain(4)]);
        let result = translator.apply_operation(&mut buffer, &op, ChangeOrigin::Network, false);
        assert!(matches!(result, Err(SyncError::Desync(_))));
        assert_eq!(buffer.value(), "abc");
    }

    #[test]
    fn test_offset_position_round_trip() {
        let translator = translator("ab\ncd");
        assert_eq!(translator.position_of(4).unwrap(), Position::new(1, 1));
        assert_eq!(translator.offset_of(Position::new(1, 1)).unwrap(), 4);
        assert!(translator.position_of(6).is_err());
        assert_eq!(translator.line_len(1), Some(2));
    }
}
