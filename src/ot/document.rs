//! Server-side document: the single serialization point of the star topology
//!
//! Clients submit an operation together with the revision it was built
//! against. The document transforms it through everything applied since that
//! revision, applies it, records it, and hands back the transformed operation
//! to relay to every client (its author receives it as the acknowledgment).
//!
//! # Example
//!
//! ```rust
//! use otsync_core::ot::{Document, TextOperation};
//!
//! let mut doc = Document::new("hello".to_string(), 0);
//!
//! let mut a = TextOperation::new(Some("a".to_string()));
//! a.retain(5);
//! a.insert("!");
//!
//! let mut b = TextOperation::new(Some("b".to_string()));
//! b.insert(">");
//! b.retain(5);
//!
//! // Both were built against revision 0.
//! doc.apply(a, 0).unwrap();
//! doc.apply(b, 0).unwrap();
//!
//! assert_eq!(doc.text(), ">hello!");
//! assert_eq!(doc.revision(), 2);
//! ```

use super::operation::TextOperation;
use crate::error::{Result, SyncError};
use tracing::debug;

/// Revisioned text plus the history of operations applied to it
#[derive(Debug, Clone)]
pub struct Document {
    text: String,

    /// Operations applied since `base_revision`, in order
    operations: Vec<TextOperation>,

    /// Revision of `text` before the first entry of `operations`
    base_revision: u64,
}

impl Document {
    /// Create a document whose current content `text` is at `revision`
    pub fn new(text: String, revision: u64) -> Self {
        Self {
            text,
            operations: Vec::new(),
            base_revision: revision,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Current revision (number of operations ever applied)
    pub fn revision(&self) -> u64 {
        self.base_revision + self.operations.len() as u64
    }

    /// Operations applied after `revision`, oldest first
    pub fn operations_since(&self, revision: u64) -> Result<&[TextOperation]> {
        let index = self.history_index(revision)?;
        Ok(&self.operations[index..])
    }

    /// Integrate an operation built against `revision`
    ///
    /// Returns the operation as actually applied to the current text.
    pub fn apply(&mut self, operation: TextOperation, revision: u64) -> Result<TextOperation> {
        let index = self.history_index(revision)?;

        let mut operation = operation;
        for concurrent in &self.operations[index..] {
            let (transformed, _) = operation.transform(concurrent)?;
            operation = transformed;
        }

        self.text = operation.apply(&self.text)?;
        self.operations.push(operation.clone());

        debug!(
            author = operation.author_id().unwrap_or(""),
            base_revision = revision,
            revision = self.revision(),
            "applied operation to document"
        );

        Ok(operation)
    }

    /// Drop history up to (excluding) `revision`
    ///
    /// Operations built against an older revision are rejected afterwards.
    pub fn compact(&mut self, revision: u64) -> Result<()> {
        let index = self.history_index(revision)?;
        self.operations.drain(..index);
        self.base_revision = revision;
        Ok(())
    }

    fn history_index(&self, revision: u64) -> Result<usize> {
        let current = self.revision();
        if revision < self.base_revision || revision > current {
            return Err(SyncError::InvalidRevision { revision, current });
        }
        Ok((revision - self.base_revision) as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ot::Step;

    fn op(author: &str, steps: Vec<Step>) -> TextOperation {
        TextOperation::from_steps(Some(author.to_string()), steps)
    }

    #[test]
    fn test_new_document() {
        let doc = Document::new("abc".to_string(), 7);
        assert_eq!(doc.text(), "abc");
        assert_eq!(doc.revision(), 7);
        assert!(doc.operations_since(7).unwrap().is_empty());
    }

    #[test]
    fn test_apply_at_head() {
        let mut doc = Document::new("abc".to_string(), 0);
        let applied = doc
            .apply(op("a", vec![Step::Retain(3), Step::Insert("d".into())]), 0)
            .unwrap();

        assert_eq!(doc.text(), "abcd");
        assert_eq!(doc.revision(), 1);
        assert_eq!(applied.author_id(), Some("a"));
    }

    #[test]
    fn test_apply_transforms_stale_operation() {
        let mut doc = Document::new("abc".to_string(), 0);
        doc.apply(op("a", vec![Step::Delete("a".into()), Step::Retain(2)]), 0)
            .unwrap();

        // Built against revision 0, where "c" was at offset 2.
        let applied = doc
            .apply(
                op("b", vec![Step::Retain(2), Step::Delete("c".into())]),
                0,
            )
            .unwrap();

        assert_eq!(doc.text(), "b");
        assert_eq!(
            applied,
            op("b", vec![Step::Retain(1), Step::Delete("c".into())])
        );
    }

    #[test]
    fn test_future_revision_rejected() {
        let mut doc = Document::new(String::new(), 0);
        let result = doc.apply(op("a", vec![Step::Insert("x".into())]), 3);

        match result {
            Err(SyncError::InvalidRevision { revision, current }) => {
                assert_eq!(revision, 3);
                assert_eq!(current, 0);
            }
            other => panic!("Expected InvalidRevision, got {:?}", other),
        }
    }

    #[test]
    fn test_compact_rejects_older_revisions() {
        let mut doc = Document::new(String::new(), 0);
        doc.apply(op("a", vec![Step::Insert("x".into())]), 0).unwrap();
        doc.apply(op("a", vec![Step::Retain(1), Step::Insert("y".into())]), 1)
            .unwrap();

        doc.compact(1).unwrap();
        assert_eq!(doc.operations_since(1).unwrap().len(), 1);
        assert!(doc.operations_since(0).is_err());
        assert_eq!(doc.revision(), 2);
    }

    #[test]
    fn test_length_mismatch_leaves_document_untouched() {
        let mut doc = Document::new("abc".to_string(), 0);
        assert!(doc.apply(op("a", vec![Step::Retain(5)]), 0).is_err());
        assert_eq!(doc.text(), "abc");
        assert_eq!(doc.revision(), 0);
    }
}
