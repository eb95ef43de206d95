//! Grouped undo/redo history
//!
//! Both stacks hold operations that can be applied to the current buffer as
//! is. The undo stack stores the inverse of each local edit; the redo stack
//! stores the inverse of each undone operation. Edits are grouped into
//! actions: consecutive edits inside the coalescing window form one action,
//! and an action is closed early once it holds more than the configured
//! number of operations.
//!
//! Remote operations change the meaning of every stored entry, so
//! [`UndoManager::transform_stacks`] rewrites both stacks against each
//! incoming operation, newest entry first.

use super::config::SessionConfig;
use crate::error::Result;
use crate::ot::{transform, TextOperation};
use std::time::{Duration, Instant};

/// A stack of operations with a per-action operation count
///
/// The counts always sum to the number of stored operations. The undo
/// stack keeps an open action as its last count, which may be zero.
#[derive(Debug, Clone, Default)]
pub struct ActionStack {
    operations: Vec<TextOperation>,
    quantity_by_action: Vec<usize>,
}

impl ActionStack {
    fn with_open_action() -> Self {
        Self {
            operations: Vec::new(),
            quantity_by_action: vec![0],
        }
    }

    pub fn operations(&self) -> &[TextOperation] {
        &self.operations
    }

    pub fn quantity_by_action(&self) -> &[usize] {
        &self.quantity_by_action
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Rewrite every entry so it applies after `remote`
    ///
    /// Entries are visited from the top of the stack down. Each entry is
    /// transformed against the remote operation, and the remote operation is
    /// transformed past the entry before moving on to the older one.
    fn transform(&mut self, remote: &TextOperation) -> Result<()> {
        let mut remote = remote.clone();
        for entry in self.operations.iter_mut().rev() {
            let (entry_prime, remote_prime) = transform(entry, &remote)?;
            *entry = entry_prime;
            remote = remote_prime;
        }
        Ok(())
    }
}

/// Undo and redo stacks of one session
#[derive(Debug, Clone)]
pub struct UndoManager {
    undo: ActionStack,
    redo: ActionStack,

    /// Close of the coalescing window for the open action
    deadline: Option<Instant>,

    window: Duration,
    max_operations_per_action: usize,
}

impl UndoManager {
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            undo: ActionStack::with_open_action(),
            redo: ActionStack::default(),
            deadline: None,
            window: config.undo_coalesce_window,
            max_operations_per_action: config.max_operations_per_action,
        }
    }

    pub fn undo_stack(&self) -> &ActionStack {
        &self.undo
    }

    pub fn redo_stack(&self) -> &ActionStack {
        &self.redo
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    /// Drop all history
    pub fn clear(&mut self) {
        self.undo = ActionStack::with_open_action();
        self.redo = ActionStack::default();
        self.deadline = None;
    }

    /// Record a local edit made at `now`
    pub fn record(&mut self, operation: &TextOperation, now: Instant) {
        self.expire(now);
        self.deadline = None;

        self.undo.operations.push(operation.invert());
        let count = self.open_action_count();
        *count += 1;

        if *count > self.max_operations_per_action {
            self.undo.quantity_by_action.push(0);
        } else {
            self.deadline = Some(now + self.window);
        }

        self.redo = ActionStack::default();
    }

    /// Close the open action if its coalescing window has passed
    pub fn expire(&mut self, now: Instant) {
        if let Some(deadline) = self.deadline {
            if now >= deadline {
                self.deadline = None;
                self.undo.quantity_by_action.push(0);
            }
        }
    }

    /// Undo the most recent action
    ///
    /// `apply` is called with each operation in turn, newest first. Returns
    /// the number of operations undone.
    pub fn undo<F>(&mut self, mut apply: F) -> Result<usize>
    where
        F: FnMut(&TextOperation) -> Result<()>,
    {
        if self.undo.is_empty() {
            return Ok(0);
        }
        self.deadline = None;

        while self.undo.quantity_by_action.len() > 1 && self.undo.quantity_by_action.last() == Some(&0) {
            self.undo.quantity_by_action.pop();
        }
        let quantity = self.undo.quantity_by_action.last().copied().unwrap_or(0);

        for _ in 0..quantity {
            let Some(operation) = self.undo.operations.pop() else {
                break;
            };
            apply(&operation)?;
            self.redo.operations.push(operation.invert());
        }

        self.redo.quantity_by_action.push(quantity);
        *self.open_action_count() = 0;

        Ok(quantity)
    }

    /// Redo the most recently undone action
    ///
    /// Returns the number of operations redone.
    pub fn redo<F>(&mut self, mut apply: F) -> Result<usize>
    where
        F: FnMut(&TextOperation) -> Result<()>,
    {
        let Some(quantity) = self.redo.quantity_by_action.pop() else {
            return Ok(0);
        };
        self.deadline = None;

        for _ in 0..quantity {
            let Some(operation) = self.redo.operations.pop() else {
                break;
            };
            apply(&operation)?;
            self.undo.operations.push(operation.invert());
        }

        let count = self.open_action_count();
        if *count == 0 {
            *count = quantity;
        } else {
            self.undo.quantity_by_action.push(quantity);
        }
        self.undo.quantity_by_action.push(0);

        Ok(quantity)
    }

    /// Rewrite both stacks against an incoming remote operation
    pub fn transform_stacks(&mut self, remote: &TextOperation) -> Result<()> {
        self.undo.transform(remote)?;
        self.redo.transform(remote)
    }

    fn open_action_count(&mut self) -> &mut usize {
        if self.undo.quantity_by_action.is_empty() {
            self.undo.quantity_by_action.push(0);
        }
        let last = self.undo.quantity_by_action.len() - 1;
        &mut self.undo.quantity_by_action[last]
    }
}
