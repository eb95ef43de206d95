//! Compose and transform
//!
//! Both functions walk two step lists in lockstep. At each point the shorter
//! of the two current steps is consumed whole and the longer one is split,
//! so the result never loses or duplicates a character.
//!
//! # Properties
//!
//! - **Compose:** `apply(compose(a, b), s) == apply(b, apply(a, s))`
//! - **Transform (TP1):** with `(a', b') = transform(a, b)`,
//!   `apply(b', apply(a, s)) == apply(a', apply(b, s))`
//!
//! # Tie-break
//!
//! Two inserts at the same position are ordered by author id: the operation
//! whose author id is lexicographically smaller (or equal) goes first. An
//! operation without an author compares as the empty id. Every peer evaluates
//! the same comparison, so no coordination is needed.

use super::operation::{char_len, Step, TextOperation};
use crate::error::{Result, SyncError};

/// Whether an insert authored by `author` goes before a concurrent insert
/// authored by `other` at the same position
pub fn priority(author: Option<&str>, other: Option<&str>) -> bool {
    author.unwrap_or("") <= other.unwrap_or("")
}

/// Whether `op` wins the tie-break against `other_id`
pub fn got_priority(op: &TextOperation, other_id: &str) -> bool {
    priority(op.author_id(), Some(other_id))
}

/// The operation equivalent to applying `a` then `b`
///
/// The result keeps `a`'s author.
///
/// # Errors
///
/// `LengthMismatch` unless `a.target_length() == b.source_length()`;
/// `CorruptOperation` if `b` deletes text that `a` inserted under a
/// different content.
pub fn compose(a: &TextOperation, b: &TextOperation) -> Result<TextOperation> {
    if a.target_length() != b.source_length() {
        return Err(SyncError::LengthMismatch {
            operation: "compose",
            expected: a.target_length(),
            actual: b.source_length(),
        });
    }

    let mut composed = TextOperation::new(a.author_id().map(str::to_string));
    let mut steps_a = a.steps().iter().cloned();
    let mut steps_b = b.steps().iter().cloned();
    let mut step_a = steps_a.next();
    let mut step_b = steps_b.next();

    loop {
        match (&step_a, &step_b) {
            (None, None) => break,
            (Some(Step::Delete(text)), _) => {
                composed.delete(text);
                step_a = steps_a.next();
            }
            (_, Some(Step::Insert(text))) => {
                composed.insert(text);
                step_b = steps_b.next();
            }
            (None, Some(_)) | (Some(_), None) => {
                return Err(SyncError::LengthMismatch {
                    operation: "compose",
                    expected: a.target_length(),
                    actual: b.source_length(),
                });
            }
            (Some(current_a), Some(current_b)) => {
                let chunk = current_a.len().min(current_b.len());
                let (head_a, tail_a) = current_a.split_at(chunk);
                let (head_b, tail_b) = current_b.split_at(chunk);

                match (&head_a, &head_b) {
                    (Step::Retain(_), Step::Retain(_)) => composed.retain(chunk),
                    (Step::Insert(text), Step::Retain(_)) => composed.insert(text),
                    (Step::Retain(_), Step::Delete(text)) => composed.delete(text),
                    (Step::Insert(inserted), Step::Delete(deleted)) => {
                        // Inserted by `a`, removed again by `b`.
                        if inserted != deleted {
                            return Err(SyncError::CorruptOperation(format!(
                                "compose: delete {:?} does not match insert {:?}",
                                deleted, inserted
                            )));
                        }
                    }
                    _ => unreachable!("deletes of `a` and inserts of `b` are consumed above"),
                }

                step_a = if tail_a.is_empty() { steps_a.next() } else { Some(tail_a) };
                step_b = if tail_b.is_empty() { steps_b.next() } else { Some(tail_b) };
            }
        }
    }

    Ok(composed)
}

/// Transform two concurrent operations built against the same text
///
/// Returns `(a', b')` where `a'` applies after `b` and `b'` applies after
/// `a`, both leading to the same text. Each transformed operation keeps the
/// author of its input.
///
/// # Errors
///
/// `LengthMismatch` unless `a.source_length() == b.source_length()`.
pub fn transform(a: &TextOperation, b: &TextOperation) -> Result<(TextOperation, TextOperation)> {
    if a.source_length() != b.source_length() {
        return Err(SyncError::LengthMismatch {
            operation: "transform",
            expected: a.source_length(),
            actual: b.source_length(),
        });
    }

    let mut a_prime = TextOperation::new(a.author_id().map(str::to_string));
    let mut b_prime = TextOperation::new(b.author_id().map(str::to_string));
    let a_first = priority(a.author_id(), b.author_id());

    let mut steps_a = a.steps().iter().cloned();
    let mut steps_b = b.steps().iter().cloned();
    let mut step_a = steps_a.next();
    let mut step_b = steps_b.next();

    loop {
        match (&step_a, &step_b) {
            (None, None) => break,
            (Some(Step::Insert(text_a)), Some(Step::Insert(text_b))) => {
                if a_first {
                    a_prime.insert(text_a);
                    b_prime.retain(char_len(text_a));
                    step_a = steps_a.next();
                } else {
                    a_prime.retain(char_len(text_b));
                    b_prime.insert(text_b);
                    step_b = steps_b.next();
                }
            }
            (Some(Step::Insert(text)), _) => {
                a_prime.insert(text);
                b_prime.retain(char_len(text));
                step_a = steps_a.next();
            }
            (_, Some(Step::Insert(text))) => {
                a_prime.retain(char_len(text));
                b_prime.insert(text);
                step_b = steps_b.next();
            }
            (None, Some(_)) | (Some(_), None) => {
                return Err(SyncError::LengthMismatch {
                    operation: "transform",
                    expected: a.source_length(),
                    actual: b.source_length(),
                });
            }
            (Some(current_a), Some(current_b)) => {
                let chunk = current_a.len().min(current_b.len());
                let (head_a, tail_a) = current_a.split_at(chunk);
                let (head_b, tail_b) = current_b.split_at(chunk);

                match (&head_a, &head_b) {
                    (Step::Retain(_), Step::Retain(_)) => {
                        a_prime.retain(chunk);
                        b_prime.retain(chunk);
                    }
                    (Step::Delete(deleted_a), Step::Delete(deleted_b)) => {
                        // Deleted on both sides: nothing left to do for either.
                        if deleted_a != deleted_b {
                            return Err(SyncError::CorruptOperation(format!(
                                "transform: concurrent deletes disagree ({:?} vs {:?})",
                                deleted_a, deleted_b
                            )));
                        }
                    }
                    (Step::Delete(text), Step::Retain(_)) => a_prime.delete(text),
                    (Step::Retain(_), Step::Delete(text)) => b_prime.delete(text),
                    _ => unreachable!("inserts are consumed above"),
                }

                step_a = if tail_a.is_empty() { steps_a.next() } else { Some(tail_a) };
                step_b = if tail_b.is_empty() { steps_b.next() } else { Some(tail_b) };
            }
        }
    }

    Ok((a_prime, b_prime))
}

impl TextOperation {
    /// See [`compose`]
    pub fn compose(&self, other: &TextOperation) -> Result<TextOperation> {
        compose(self, other)
    }

    /// See [`transform`]
    pub fn transform(&self, other: &TextOperation) -> Result<(TextOperation, TextOperation)> {
        transform(self, other)
    }

    /// See [`got_priority`]
    pub fn got_priority(&self, other_id: &str) -> bool {
        got_priority(self, other_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn op(author: &str, steps: Vec<Step>) -> TextOperation {
        TextOperation::from_steps(Some(author.to_string()), steps)
    }

    fn ins(text: &str) -> Step {
        Step::Insert(text.to_string())
    }

    fn del(text: &str) -> Step {
        Step::Delete(text.to_string())
    }

    fn converge(a: &TextOperation, b: &TextOperation, text: &str) -> String {
        let (a_prime, b_prime) = transform(a, b).unwrap();
        let left = b_prime.apply(&a.apply(text).unwrap()).unwrap();
        let right = a_prime.apply(&b.apply(text).unwrap()).unwrap();
        assert_eq!(left, right);
        left
    }

    #[test]
    fn test_priority_is_lexicographic() {
        assert!(priority(Some("alice"), Some("bob")));
        assert!(!priority(Some("bob"), Some("alice")));
        assert!(priority(Some("same"), Some("same")));
        assert!(priority(None, Some("anyone")));

        let alice = op("alice", vec![ins("x")]);
        assert!(alice.got_priority("bob"));
        assert!(!alice.got_priority("aaron"));
    }

    #[test]
    fn test_compose_sequential_edits() {
        let a = op("c", vec![Step::Retain(5), ins(" world")]);
        let b = op("c", vec![del("h"), ins("H"), Step::Retain(10)]);

        let ab = compose(&a, &b).unwrap();
        assert_eq!(ab.source_length(), 5);
        assert_eq!(ab.target_length(), 11);
        assert_eq!(ab.apply("hello").unwrap(), "Hello world");
        assert_eq!(ab.author_id(), Some("c"));
    }

    #[test]
    fn test_compose_insert_then_delete_cancels() {
        let a = op("c", vec![Step::Retain(2), ins("abc")]);
        let b = op("c", vec![Step::Retain(3), del("b"), Step::Retain(1)]);

        let ab = compose(&a, &b).unwrap();
        assert_eq!(ab, op("c", vec![Step::Retain(2), ins("ac")]));
        assert_eq!(ab.apply("xy").unwrap(), "xyac");
    }

    #[test]
    fn test_compose_with_empty_identity() {
        let empty = TextOperation::new(None);
        let a = op("c", vec![ins("hi")]);

        assert_eq!(compose(&empty, &a).unwrap(), a);
        let tail = op("c", vec![Step::Retain(2)]);
        assert_eq!(compose(&a, &tail).unwrap(), a);
    }

    #[test]
    fn test_compose_length_mismatch() {
        let a = op("c", vec![Step::Retain(3)]);
        let b = op("c", vec![Step::Retain(4)]);
        assert!(matches!(
            compose(&a, &b),
            Err(SyncError::LengthMismatch {
                operation: "compose",
                expected: 3,
                actual: 4
            })
        ));
    }

    #[test]
    fn test_compose_detects_mismatched_delete() {
        let a = op("c", vec![ins("ab")]);
        let b = op("c", vec![del("ax")]);
        assert!(matches!(
            compose(&a, &b),
            Err(SyncError::CorruptOperation(_))
        ));
    }

    #[test]
    fn test_transform_insert_vs_full_delete() {
        // A appends " world" while B deletes everything.
        let a = op("a", vec![Step::Retain(5), ins(" world")]);
        let b = op("b", vec![del("hello")]);

        let (a_prime, b_prime) = transform(&a, &b).unwrap();
        assert_eq!(b_prime.apply("hello world").unwrap(), " world");
        assert_eq!(a_prime.apply("").unwrap(), " world");
        assert_eq!(a_prime, op("a", vec![ins(" world")]));
    }

    #[test]
    fn test_transform_concurrent_inserts_tie_break() {
        let a = op("alice", vec![ins("A"), Step::Retain(1)]);
        let b = op("bob", vec![ins("B"), Step::Retain(1)]);

        assert_eq!(converge(&a, &b, "x"), "ABx");
        // Argument order does not change the winner.
        assert_eq!(converge(&b, &a, "x"), "ABx");
    }

    #[test]
    fn test_transform_overlapping_deletes() {
        let a = op("a", vec![Step::Retain(1), del("bcd"), Step::Retain(2)]);
        let b = op("b", vec![Step::Retain(2), del("cdef")]);

        assert_eq!(converge(&a, &b, "abcdef"), "a");

        let (a_prime, b_prime) = transform(&a, &b).unwrap();
        assert_eq!(a_prime, op("a", vec![Step::Retain(1), del("b")]));
        assert_eq!(b_prime, op("b", vec![Step::Retain(1), del("ef")]));
    }

    #[test]
    fn test_transform_delete_vs_retain_and_insert() {
        let a = op("a", vec![Step::Retain(2), del("cd"), ins("XY"), Step::Retain(1)]);
        let b = op("b", vec![ins(">"), Step::Retain(3), ins("!"), Step::Retain(2)]);

        assert_eq!(converge(&a, &b, "abcde"), ">ab!XYe");
    }

    #[test]
    fn test_transform_keeps_authors() {
        let a = op("a", vec![ins("1")]);
        let b = op("b", vec![ins("2")]);
        let (a_prime, b_prime) = transform(&a, &b).unwrap();
        assert_eq!(a_prime.author_id(), Some("a"));
        assert_eq!(b_prime.author_id(), Some("b"));
    }

    #[test]
    fn test_transform_length_mismatch() {
        let a = op("a", vec![Step::Retain(1)]);
        let b = op("b", vec![Step::Retain(2)]);
        assert!(matches!(
            transform(&a, &b),
            Err(SyncError::LengthMismatch {
                operation: "transform",
                ..
            })
        ));
    }
}
