use thiserror::Error;

use crate::command::{self, Command};
use crate::document::{
    BlockFormat, Document, ElementNode, Mark, Marks, Node, StructuralViolation, TextNode,
};
use crate::history::{History, UndoRecord};
use crate::normalize;
use crate::ops::{Op, Transaction};
use crate::query;
use crate::selection::{self, Point, Selection};

#[derive(Debug, Error)]
pub enum ApplyError {
    #[error("invalid path: {0}")]
    InvalidPath(String),
    #[error(transparent)]
    Structural(#[from] StructuralViolation),
    #[error("normalization did not converge")]
    NormalizeDidNotConverge,
}

const MAX_NORMALIZE_ITERATIONS: usize = 100;

/// The single live editing instance: document, selection, pending caret
/// marks, and history. The host owns it and threads it through event
/// handlers; there is no global state.
pub struct Editor {
    doc: Document,
    selection: Selection,
    history: History,
    pending_marks: Option<Marks>,
}

impl Editor {
    pub fn new(doc: Document, selection: Selection) -> Self {
        let mut editor = Self {
            doc,
            selection,
            history: History::default(),
            pending_marks: None,
        };
        editor.normalize_in_place();
        editor
    }

    pub fn with_default_document() -> Self {
        let doc = Document::new(vec![Node::paragraph("")]);
        let selection = Selection::collapsed(Point::new(vec![0, 0], 0));
        Self::new(doc, selection)
    }

    pub fn doc(&self) -> &Document {
        &self.doc
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Pure selection move. Never recorded in history, and it drops any
    /// pending caret marks.
    pub fn set_selection(&mut self, selection: Selection) {
        self.selection = selection;
        self.pending_marks = None;
        self.normalize_selection_in_place();
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Runs a toggle command. Returns whether the content changed, which
    /// is what the host keys persistence on.
    pub fn run_command(&mut self, command: Command) -> Result<bool, ApplyError> {
        match command {
            Command::ToggleMark(mark) => self.toggle_mark(mark),
            Command::ToggleBlock(format) => self.toggle_block(format),
        }
    }

    pub fn toggle_mark(&mut self, mark: Mark) -> Result<bool, ApplyError> {
        if self.selection.is_collapsed() {
            // A caret toggle only flips the marks the next insertion will
            // carry; the tree is untouched.
            let mut marks = self
                .pending_marks
                .clone()
                .unwrap_or_else(|| self.marks_at_caret());
            marks.set(mark, !marks.get(mark));
            self.pending_marks = Some(marks);
            return Ok(false);
        }

        let Some(tx) = command::toggle_mark_tx(&self.doc, &self.selection, mark) else {
            return Ok(false);
        };
        self.apply(tx)?;
        Ok(true)
    }

    pub fn toggle_block(&mut self, format: BlockFormat) -> Result<bool, ApplyError> {
        let Some(tx) = command::toggle_block_tx(&self.doc, &self.selection, format) else {
            return Ok(false);
        };
        self.apply(tx)?;
        Ok(true)
    }

    /// Mark activation, honoring the pending caret marks when the
    /// selection is collapsed.
    pub fn is_mark_active(&self, mark: Mark) -> bool {
        if self.selection.is_collapsed() {
            if let Some(pending) = &self.pending_marks {
                return pending.get(mark);
            }
        }
        query::is_mark_active(&self.doc, &self.selection, mark)
    }

    pub fn is_block_active(&self, format: BlockFormat) -> bool {
        query::is_block_active(&self.doc, &self.selection, format)
    }

    fn marks_at_caret(&self) -> Marks {
        selection::leaf_at(&self.doc, &self.selection.focus.path)
            .map(|t| t.marks.clone())
            .unwrap_or_default()
    }

    /// Inserts text at the caret, consuming any pending marks; when those
    /// differ from the caret leaf's marks the leaf is split around a new
    /// run. Returns whether anything was inserted.
    pub fn insert_text(&mut self, text: &str) -> Result<bool, ApplyError> {
        if text.is_empty() {
            return Ok(false);
        }
        let Some(caret) = selection::normalize_point(&self.doc, &self.selection.focus)
            .or_else(|| selection::first_text_point(&self.doc))
        else {
            return Ok(false);
        };
        let Some(leaf) = selection::leaf_at(&self.doc, &caret.path) else {
            return Ok(false);
        };
        let marks = self
            .pending_marks
            .take()
            .unwrap_or_else(|| leaf.marks.clone());

        let tx = if marks == leaf.marks {
            let after = Point::new(caret.path.clone(), caret.offset + text.len());
            Transaction::new(vec![Op::InsertText {
                path: caret.path,
                offset: caret.offset,
                text: text.to_string(),
            }])
            .selection_after(Selection::collapsed(after))
        } else {
            let Some((&leaf_ix, block_path)) = caret.path.split_last() else {
                return Ok(false);
            };
            let offset = command::clamp_to_char_boundary(&leaf.text, caret.offset);
            let left = leaf.text[..offset].to_string();
            let right = leaf.text[offset..].to_string();
            let old_marks = leaf.marks.clone();

            let mut replacement: Vec<Node> = Vec::new();
            let mut caret_child_ix = leaf_ix;
            if !left.is_empty() {
                replacement.push(Node::text(left, old_marks.clone()));
                caret_child_ix += 1;
            }
            replacement.push(Node::text(text, marks));
            if !right.is_empty() {
                replacement.push(Node::text(right, old_marks));
            }

            let mut ops = vec![Op::RemoveNode {
                path: caret.path.clone(),
            }];
            for (i, node) in replacement.into_iter().enumerate() {
                let mut path = block_path.to_vec();
                path.push(leaf_ix + i);
                ops.push(Op::InsertNode { path, node });
            }

            let mut caret_path = block_path.to_vec();
            caret_path.push(caret_child_ix);
            Transaction::new(ops)
                .selection_after(Selection::collapsed(Point::new(caret_path, text.len())))
        };

        self.apply(tx)?;
        Ok(true)
    }

    /// Deletes the character before the caret. A caret at a block start
    /// is left alone; block merging is not part of this surface.
    pub fn delete_backward(&mut self) -> Result<bool, ApplyError> {
        let Some(caret) = selection::normalize_point(&self.doc, &self.selection.focus) else {
            return Ok(false);
        };
        let Some(leaf) = selection::leaf_at(&self.doc, &caret.path) else {
            return Ok(false);
        };
        let end = command::clamp_to_char_boundary(&leaf.text, caret.offset);
        if end == 0 {
            return Ok(false);
        }
        let start = leaf.text[..end]
            .char_indices()
            .last()
            .map(|(i, _)| i)
            .unwrap_or(0);
        self.pending_marks = None;

        let tx = Transaction::new(vec![Op::RemoveText {
            path: caret.path.clone(),
            range: start..end,
        }])
        .selection_after(Selection::collapsed(Point::new(caret.path, start)));
        self.apply(tx)?;
        Ok(true)
    }

    /// Applies a transaction atomically: ops, then normalization, then
    /// invariant validation. A structural violation rolls everything back
    /// and leaves the tree unchanged. Content mutations are recorded as
    /// one history entry; a transaction that ends up changing nothing is
    /// not recorded.
    pub fn apply(&mut self, tx: Transaction) -> Result<(), ApplyError> {
        let selection_before = self.selection.clone();

        let mut inverse_ops: Vec<Op> = Vec::new();
        for op in tx.ops {
            match self.apply_op(op) {
                Ok(inv) => inverse_ops.push(inv),
                Err(err) => {
                    self.rollback(inverse_ops, &selection_before);
                    return Err(err);
                }
            }
        }

        if let Some(sel) = tx.selection_after {
            self.selection = sel;
        }

        match self.normalize_with_inverse_ops() {
            Ok(mut more) => inverse_ops.append(&mut more),
            Err(err) => {
                self.rollback(inverse_ops, &selection_before);
                return Err(err);
            }
        }

        if let Err(violation) = self.doc.validate() {
            self.rollback(inverse_ops, &selection_before);
            return Err(violation.into());
        }

        inverse_ops.reverse();
        self.normalize_selection_in_place();
        let selection_after = self.selection.clone();

        if inverse_ops.is_empty() {
            return Ok(());
        }

        self.history.record(UndoRecord {
            inverse_ops,
            selection_before,
            selection_after,
        });
        Ok(())
    }

    pub fn undo(&mut self) -> bool {
        let Some(record) = self.history.pop_undo() else {
            return false;
        };
        let UndoRecord {
            inverse_ops,
            selection_before,
            selection_after,
        } = record;

        let mut redo_ops: Vec<Op> = Vec::new();
        for op in inverse_ops {
            if let Ok(inv) = self.apply_op(op) {
                redo_ops.push(inv);
            } else {
                // An inverse op that no longer applies means the stacks
                // are out of sync with the tree; stop mutating further.
                break;
            }
        }
        redo_ops.reverse();

        self.selection = selection_before.clone();
        self.pending_marks = None;
        self.normalize_in_place();

        self.history.push_undone(UndoRecord {
            inverse_ops: redo_ops,
            selection_before,
            selection_after,
        });
        true
    }

    pub fn redo(&mut self) -> bool {
        let Some(record) = self.history.pop_redo() else {
            return false;
        };
        let UndoRecord {
            inverse_ops,
            selection_before,
            selection_after,
        } = record;

        let mut undo_ops: Vec<Op> = Vec::new();
        for op in inverse_ops {
            if let Ok(inv) = self.apply_op(op) {
                undo_ops.push(inv);
            } else {
                break;
            }
        }
        undo_ops.reverse();

        self.selection = selection_after.clone();
        self.pending_marks = None;
        self.normalize_in_place();

        self.history.push_redone(UndoRecord {
            inverse_ops: undo_ops,
            selection_before,
            selection_after,
        });
        true
    }

    fn rollback(&mut self, applied_inverses: Vec<Op>, selection_before: &Selection) {
        for op in applied_inverses.into_iter().rev() {
            let _ = self.apply_op(op);
        }
        self.selection = selection_before.clone();
    }

    fn normalize_in_place(&mut self) {
        let _ = self.normalize_with_inverse_ops();
        self.normalize_selection_in_place();
    }

    fn normalize_selection_in_place(&mut self) {
        self.selection = selection::normalize_selection(&self.doc, &self.selection);
    }

    fn normalize_with_inverse_ops(&mut self) -> Result<Vec<Op>, ApplyError> {
        let mut inverse_ops: Vec<Op> = Vec::new();
        for _ in 0..MAX_NORMALIZE_ITERATIONS {
            let ops = normalize::normalize_ops(&self.doc);
            if ops.is_empty() {
                return Ok(inverse_ops);
            }
            for op in ops {
                let inv = self.apply_op(op)?;
                inverse_ops.push(inv);
            }
        }
        Err(ApplyError::NormalizeDidNotConverge)
    }

    fn apply_op(&mut self, op: Op) -> Result<Op, ApplyError> {
        apply_op_to(&mut self.doc, &mut self.selection, op)
    }
}

fn apply_op_to(doc: &mut Document, selection: &mut Selection, op: Op) -> Result<Op, ApplyError> {
    match op {
        Op::InsertText { path, offset, text } => {
            let leaf = node_text_mut(doc, &path)?;
            let offset = command::clamp_to_char_boundary(&leaf.text, offset);
            leaf.text.insert_str(offset, &text);
            transform_selection_insert_text(selection, &path, offset, text.len());
            Ok(Op::RemoveText {
                path,
                range: offset..offset + text.len(),
            })
        }
        Op::RemoveText { path, range } => {
            let leaf = node_text_mut(doc, &path)?;
            let start =
                command::clamp_to_char_boundary(&leaf.text, range.start.min(leaf.text.len()));
            let end = command::clamp_to_char_boundary(&leaf.text, range.end.min(leaf.text.len()));
            if start >= end {
                return Ok(Op::InsertText {
                    path,
                    offset: start,
                    text: String::new(),
                });
            }
            let removed = leaf.text[start..end].to_string();
            leaf.text.replace_range(start..end, "");
            transform_selection_remove_text(selection, &path, start..end);
            Ok(Op::InsertText {
                path,
                offset: start,
                text: removed,
            })
        }
        Op::InsertNode { path, node } => {
            insert_node(doc, &path, node)?;
            transform_selection_insert_node(selection, &path);
            Ok(Op::RemoveNode { path })
        }
        Op::RemoveNode { path } => {
            let removed = remove_node(doc, &path)?;
            transform_selection_remove_node(selection, &path, &removed, doc);
            Ok(Op::InsertNode {
                path,
                node: removed,
            })
        }
        Op::SetNodeKind { path, kind } => {
            let el = node_element_mut(doc, &path)?;
            let old = std::mem::replace(&mut el.kind, kind);
            Ok(Op::SetNodeKind { path, kind: old })
        }
        Op::SetNodeAlign { path, align } => {
            let el = node_element_mut(doc, &path)?;
            let old = std::mem::replace(&mut el.align, align);
            Ok(Op::SetNodeAlign { path, align: old })
        }
        Op::SetTextMarks { path, marks } => {
            let leaf = node_text_mut(doc, &path)?;
            let old = std::mem::replace(&mut leaf.marks, marks);
            Ok(Op::SetTextMarks { path, marks: old })
        }
    }
}

fn invalid(message: impl Into<String>) -> ApplyError {
    ApplyError::InvalidPath(message.into())
}

fn node_mut<'a>(doc: &'a mut Document, path: &[usize]) -> Result<&'a mut Node, ApplyError> {
    let (&first, rest) = path.split_first().ok_or_else(|| invalid("empty path"))?;
    let mut node = doc
        .children
        .get_mut(first)
        .ok_or_else(|| invalid(format!("index {first} out of bounds at document root")))?;
    for (depth, &ix) in rest.iter().enumerate() {
        node = match node {
            Node::Element(el) => el
                .children
                .get_mut(ix)
                .ok_or_else(|| invalid(format!("index {ix} out of bounds at depth {depth}")))?,
            Node::Text(_) => {
                return Err(invalid(format!("text leaf mid-path at depth {depth}")));
            }
        };
    }
    Ok(node)
}

fn node_text_mut<'a>(doc: &'a mut Document, path: &[usize]) -> Result<&'a mut TextNode, ApplyError> {
    match node_mut(doc, path)? {
        Node::Text(t) => Ok(t),
        Node::Element(_) => Err(invalid("expected a text leaf")),
    }
}

fn node_element_mut<'a>(
    doc: &'a mut Document,
    path: &[usize],
) -> Result<&'a mut ElementNode, ApplyError> {
    match node_mut(doc, path)? {
        Node::Element(el) => Ok(el),
        Node::Text(_) => Err(invalid("expected an element")),
    }
}

fn insert_node(doc: &mut Document, path: &[usize], node: Node) -> Result<(), ApplyError> {
    let (&index, parent_path) = path
        .split_last()
        .ok_or_else(|| invalid("empty insert path"))?;

    let children = if parent_path.is_empty() {
        &mut doc.children
    } else {
        match node_mut(doc, parent_path)? {
            Node::Element(el) => &mut el.children,
            Node::Text(_) => return Err(invalid("insert parent is not a container")),
        }
    };

    if index > children.len() {
        return Err(invalid(format!(
            "insert index out of bounds: {index} > {}",
            children.len()
        )));
    }
    children.insert(index, node);
    Ok(())
}

fn remove_node(doc: &mut Document, path: &[usize]) -> Result<Node, ApplyError> {
    let (&index, parent_path) = path
        .split_last()
        .ok_or_else(|| invalid("empty remove path"))?;

    let children = if parent_path.is_empty() {
        &mut doc.children
    } else {
        match node_mut(doc, parent_path)? {
            Node::Element(el) => &mut el.children,
            Node::Text(_) => return Err(invalid("remove parent is not a container")),
        }
    };

    if index >= children.len() {
        return Err(invalid(format!(
            "remove index out of bounds: {index} >= {}",
            children.len()
        )));
    }
    Ok(children.remove(index))
}

fn transform_selection_insert_text(
    selection: &mut Selection,
    path: &[usize],
    offset: usize,
    len: usize,
) {
    for point in [&mut selection.anchor, &mut selection.focus] {
        if point.path == path && point.offset >= offset {
            point.offset = point.offset.saturating_add(len);
        }
    }
}

fn transform_selection_remove_text(
    selection: &mut Selection,
    path: &[usize],
    range: std::ops::Range<usize>,
) {
    let removed_len = range.end.saturating_sub(range.start);
    for point in [&mut selection.anchor, &mut selection.focus] {
        if point.path != path {
            continue;
        }
        if point.offset <= range.start {
            continue;
        }
        if point.offset >= range.end {
            point.offset = point.offset.saturating_sub(removed_len);
        } else {
            point.offset = range.start;
        }
    }
}

fn transform_selection_insert_node(selection: &mut Selection, path: &[usize]) {
    if path.is_empty() {
        return;
    }
    let (parent_path, index) = path.split_at(path.len() - 1);
    let index = index[0];

    for point in [&mut selection.anchor, &mut selection.focus] {
        if point.path.len() <= parent_path.len() {
            continue;
        }
        if !point.path.starts_with(parent_path) {
            continue;
        }
        let depth = parent_path.len();
        if point.path[depth] >= index {
            point.path[depth] += 1;
        }
    }
}

fn transform_selection_remove_node(
    selection: &mut Selection,
    path: &[usize],
    removed: &Node,
    doc_after_remove: &Document,
) {
    if path.is_empty() {
        return;
    }
    let (parent_path, index) = path.split_at(path.len() - 1);
    let index = index[0];

    // When a leaf was merged into its left sibling (same marks, the left
    // leaf now ends with the removed text), points inside it map onto the
    // merged run instead of snapping to a block edge.
    let merge_prefix_len = match (removed, index.checked_sub(1)) {
        (Node::Text(removed_text), Some(left_index)) => {
            let mut left_path = parent_path.to_vec();
            left_path.push(left_index);
            match selection::node_at(doc_after_remove, &left_path) {
                Some(Node::Text(left_text))
                    if left_text.marks == removed_text.marks
                        && left_text.text.ends_with(&removed_text.text) =>
                {
                    Some(left_text.text.len().saturating_sub(removed_text.text.len()))
                }
                _ => None,
            }
        }
        _ => None,
    };

    for point in [&mut selection.anchor, &mut selection.focus] {
        if point.path.len() <= parent_path.len() {
            continue;
        }
        if !point.path.starts_with(parent_path) {
            continue;
        }
        let depth = parent_path.len();
        let ix = point.path[depth];
        if ix > index {
            point.path[depth] = ix - 1;
            continue;
        }
        if ix < index {
            continue;
        }

        // Point was inside the removed subtree. Map it to a nearby point.
        if let (Some(prefix), Node::Text(removed_text), Some(left_index)) =
            (merge_prefix_len, removed, index.checked_sub(1))
        {
            point.path.truncate(depth + 1);
            point.path[depth] = left_index;
            point.offset = (prefix + point.offset).min(prefix + removed_text.text.len());
        } else {
            point.path.truncate(depth + 1);
            point.path[depth] = index.saturating_sub(1);
            point.offset = 0;
        }
    }
}
