use crate::ops::Op;
use crate::selection::Selection;

/// One undoable step: the inverse ops of a content mutation plus the
/// selections on either side of it. Pure selection moves never become
/// records.
#[derive(Debug, Clone)]
pub struct UndoRecord {
    pub(crate) inverse_ops: Vec<Op>,
    pub(crate) selection_before: Selection,
    pub(crate) selection_after: Selection,
}

const DEFAULT_MAX_ENTRIES: usize = 200;

/// Linear undo/redo history. A new content mutation after an undo clears
/// the redo stack; there is no branching.
#[derive(Debug)]
pub struct History {
    undo: Vec<UndoRecord>,
    redo: Vec<UndoRecord>,
    max_entries: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ENTRIES)
    }
}

impl History {
    pub fn new(max_entries: usize) -> Self {
        Self {
            undo: Vec::new(),
            redo: Vec::new(),
            max_entries: max_entries.max(1),
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    /// Records a fresh content mutation: pushes onto the undo stack,
    /// clears the redo stack, and caps the history depth.
    pub(crate) fn record(&mut self, record: UndoRecord) {
        self.undo.push(record);
        self.redo.clear();
        if self.undo.len() > self.max_entries {
            self.undo.remove(0);
        }
    }

    pub(crate) fn pop_undo(&mut self) -> Option<UndoRecord> {
        self.undo.pop()
    }

    pub(crate) fn pop_redo(&mut self) -> Option<UndoRecord> {
        self.redo.pop()
    }

    /// Moves an undone step onto the redo stack, keeping redo intact.
    pub(crate) fn push_undone(&mut self, record: UndoRecord) {
        self.redo.push(record);
    }

    /// Moves a redone step back onto the undo stack without clearing redo.
    pub(crate) fn push_redone(&mut self, record: UndoRecord) {
        self.undo.push(record);
    }
}
