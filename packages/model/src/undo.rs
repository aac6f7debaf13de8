//! # Undo/Redo Stack
//!
//! Tracks batches applied to a document and reverts them on request.
//!
//! ## Design
//!
//! - Each recorded [`Batch`] is one undo step
//! - Undo reverses the batch operations last first, transforming each
//!   reversed operation by everything applied after the original, so
//!   changes made since (by this user or anyone else) are kept
//! - The operations applied by an undo form the redo step, and redo reverts
//!   those the same way
//! - Recording a new batch clears the redo stack
//!
//! ## Example
//!
//! ```rust,ignore
//! let mut stack = UndoStack::new();
//! let mut document = Document::new();
//!
//! stack.change(&mut document, |writer| writer.insert_text("foo", Attributes::new(), &position))?;
//! stack.undo(&mut document)?;
//! stack.redo(&mut document)?;
//! ```

use crate::document::Document;
use crate::error::ModelResult;
use crate::writer::{Batch, Writer};
use tracing::debug;

/// Undo and redo history of one editing session, one [`Batch`] per step
#[derive(Debug)]
pub struct UndoStack {
    /// Batches that can be undone (most recent last)
    undo_stack: Vec<Batch>,

    /// Batches applied by undo (most recent last)
    redo_stack: Vec<Batch>,

    /// Oldest steps are dropped past this many; 0 keeps everything
    max_levels: usize,
}

impl UndoStack {
    /// Stack keeping the last 100 steps
    pub fn new() -> Self {
        Self::with_max_levels(100)
    }

    pub fn with_max_levels(max_levels: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_levels,
        }
    }

    /// Run a change block on `document` and record its batch
    pub fn change<F, R>(&mut self, document: &mut Document, f: F) -> ModelResult<()>
    where
        F: FnOnce(&mut Writer<'_>) -> ModelResult<R>,
    {
        let batch = document.change(f)?;
        self.push(batch);
        Ok(())
    }

    /// Record a batch that was already applied
    pub fn push(&mut self, batch: Batch) {
        if batch.is_empty() {
            return;
        }

        self.undo_stack.push(batch);

        if self.max_levels > 0 && self.undo_stack.len() > self.max_levels {
            self.undo_stack.remove(0);
        }

        // New action invalidates the redo history
        self.redo_stack.clear();
    }

    /// Undo the most recent batch
    pub fn undo(&mut self, document: &mut Document) -> ModelResult<bool> {
        let Some(batch) = self.undo_stack.pop() else {
            return Ok(false);
        };

        let applied = revert(&batch, document)?;
        debug!(operations = applied.operations.len(), "undo");
        self.redo_stack.push(applied);
        Ok(true)
    }

    /// Redo the most recently undone batch
    pub fn redo(&mut self, document: &mut Document) -> ModelResult<bool> {
        let Some(batch) = self.redo_stack.pop() else {
            return Ok(false);
        };

        let applied = revert(&batch, document)?;
        debug!(operations = applied.operations.len(), "redo");
        self.undo_stack.push(applied);
        Ok(true)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_levels(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_levels(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }

    /// Description of the next undo step
    pub fn undo_description(&self) -> Option<&str> {
        self.undo_stack
            .last()
            .and_then(|batch| batch.description.as_deref())
    }

    /// Description of the next redo step
    pub fn redo_description(&self) -> Option<&str> {
        self.redo_stack
            .last()
            .and_then(|batch| batch.description.as_deref())
    }
}

impl Default for UndoStack {
    fn default() -> Self {
        Self::new()
    }
}

/// Apply the reversal of `batch` to the current document state
fn revert(batch: &Batch, document: &mut Document) -> ModelResult<Batch> {
    let mut applied = Batch {
        operations: Vec::with_capacity(batch.operations.len()),
        description: batch.description.clone(),
    };

    for operation in batch.operations.iter().rev() {
        let mut reversed = operation.reversed();
        for later in document.operations_since(operation.base_version + 1) {
            reversed = reversed.transformed_by(later);
        }
        if reversed.is_no_op() {
            continue;
        }

        reversed.base_version = document.version();
        document.apply_operation(reversed.clone())?;
        applied.operations.push(reversed);
    }

    Ok(applied)
}
