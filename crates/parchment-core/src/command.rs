use crate::document::{Align, BlockFormat, BlockKind, Document, ElementNode, Mark, Marks, Node};
use crate::ops::{Op, Path, Transaction};
use crate::query;
use crate::selection::{Point, Selection};

/// A structured editing command, decoupling input bindings from editing
/// semantics. The host turns button clicks and shortcuts into one of
/// these and hands it to the editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    ToggleMark(Mark),
    ToggleBlock(BlockFormat),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shortcut {
    pub ctrl: bool,
    pub key: char,
}

impl Shortcut {
    pub fn ctrl(key: char) -> Self {
        Self { ctrl: true, key }
    }
}

impl Command {
    /// The keyboard bindings of the editing surface. Unrecognized
    /// shortcuts map to nothing and the host ignores them.
    pub fn from_shortcut(shortcut: Shortcut) -> Option<Self> {
        if !shortcut.ctrl {
            return None;
        }
        match shortcut.key {
            'b' => Some(Command::ToggleMark(Mark::Bold)),
            'i' => Some(Command::ToggleMark(Mark::Italic)),
            '`' => Some(Command::ToggleMark(Mark::Code)),
            'u' => Some(Command::ToggleMark(Mark::Underline)),
            _ => None,
        }
    }
}

/// Builds the transaction for a mark toggle over an expanded selection.
/// Returns `None` when the selection is collapsed or empty, or when no
/// leaf would change; those cases are not content mutations.
pub(crate) fn toggle_mark_tx(
    doc: &Document,
    selection: &Selection,
    mark: Mark,
) -> Option<Transaction> {
    let (start, end) = selection.unhang(doc).ok()?;
    if start == end {
        return None;
    }

    // The first intersected leaf decides the direction for the whole
    // range; there is no unanimity vote.
    let target = !query::is_mark_active(doc, selection, mark);

    let (&start_inline_ix, start_block_path) = start.path.split_last()?;
    let (&end_inline_ix, end_block_path) = end.path.split_last()?;

    let blocks = text_blocks_in_order(doc);
    let start_index = blocks.iter().position(|b| b.path == start_block_path)?;
    let end_index = blocks.iter().position(|b| b.path == end_block_path)?;

    let mut ops: Vec<Op> = Vec::new();
    let mut new_anchor = selection.anchor.clone();
    let mut new_focus = selection.focus.clone();

    for (block_index, block) in blocks
        .iter()
        .enumerate()
        .take(end_index + 1)
        .skip(start_index)
    {
        let children = block.el.children.as_slice();
        let total_len = total_text_len(children);
        if total_len == 0 {
            continue;
        }

        let start_global = if block_index == start_index {
            point_global_offset(children, start_inline_ix, start.offset)
        } else {
            0
        };
        let end_global = if block_index == end_index {
            point_global_offset(children, end_inline_ix, end.offset)
        } else {
            total_len
        };
        if start_global >= end_global {
            continue;
        }

        let new_children = set_mark_in_block(children, start_global, end_global, mark, target);
        if new_children.as_slice() == children {
            continue;
        }

        for child_ix in (0..children.len()).rev() {
            let mut remove_path = block.path.clone();
            remove_path.push(child_ix);
            ops.push(Op::RemoveNode { path: remove_path });
        }
        for (child_ix, node) in new_children.iter().cloned().enumerate() {
            let mut insert_path = block.path.clone();
            insert_path.push(child_ix);
            ops.push(Op::InsertNode {
                path: insert_path,
                node,
            });
        }

        if is_point_in_block(&new_anchor, &block.path) {
            let global = point_global_offset(
                children,
                new_anchor.path.last().copied().unwrap_or(0),
                new_anchor.offset,
            );
            new_anchor = point_for_global_offset(&block.path, &new_children, global);
        }
        if is_point_in_block(&new_focus, &block.path) {
            let global = point_global_offset(
                children,
                new_focus.path.last().copied().unwrap_or(0),
                new_focus.offset,
            );
            new_focus = point_for_global_offset(&block.path, &new_children, global);
        }
    }

    if ops.is_empty() {
        return None;
    }
    Some(Transaction::new(ops).selection_after(Selection {
        anchor: new_anchor,
        focus: new_focus,
    }))
}

/// Builds the transaction for a block toggle: unwrap intersected list
/// containers (skipped for alignment), set the kind or alignment on the
/// selected blocks, then wrap fresh list items in a new container when
/// activating a list kind. Returns `None` for an empty selection or when
/// nothing would change.
pub(crate) fn toggle_block_tx(
    doc: &Document,
    selection: &Selection,
    format: BlockFormat,
) -> Option<Transaction> {
    let (start, end) = selection.unhang(doc).ok()?;
    let active = query::is_block_active(doc, selection, format);

    match format {
        BlockFormat::Align(align) => toggle_align_tx(doc, selection, &start, &end, align, active),
        BlockFormat::Kind(kind) => toggle_kind_tx(doc, selection, &start, &end, kind, active),
    }
}

/// Alignment never touches list nesting: it flips on the lowest text
/// blocks in the range, list items included, leaving structure alone.
fn toggle_align_tx(
    doc: &Document,
    selection: &Selection,
    start: &Point,
    end: &Point,
    align: Align,
    active: bool,
) -> Option<Transaction> {
    let (_, start_block_path) = start.path.split_last()?;
    let (_, end_block_path) = end.path.split_last()?;

    let blocks = text_blocks_in_order(doc);
    let start_index = blocks.iter().position(|b| b.path == start_block_path)?;
    let end_index = blocks.iter().position(|b| b.path == end_block_path)?;

    let target = if active { None } else { Some(align) };
    let mut ops: Vec<Op> = Vec::new();
    for block in blocks.iter().take(end_index + 1).skip(start_index) {
        if block.el.align == target {
            continue;
        }
        ops.push(Op::SetNodeAlign {
            path: block.path.clone(),
            align: target,
        });
    }

    if ops.is_empty() {
        return None;
    }
    Some(Transaction::new(ops).selection_after(selection.clone()))
}

fn toggle_kind_tx(
    doc: &Document,
    selection: &Selection,
    start: &Point,
    end: &Point,
    kind: BlockKind,
    active: bool,
) -> Option<Transaction> {
    let s0 = *start.path.first()?;
    let e0 = *end.path.first()?;
    let old_span: Vec<Node> = doc.children.get(s0..=e0)?.to_vec();

    let span_has_list = old_span
        .iter()
        .any(|n| matches!(n, Node::Element(el) if el.kind.is_list()));

    // Plain kind flip: no list container to unwrap and none to create, so
    // the structure stands and the kinds change in place.
    if !kind.is_list() && !span_has_list {
        let target = if active { BlockKind::Paragraph } else { kind };
        let mut ops: Vec<Op> = Vec::new();
        for (i, node) in old_span.iter().enumerate() {
            if let Node::Element(el) = node {
                if el.kind != target {
                    ops.push(Op::SetNodeKind {
                        path: vec![s0 + i],
                        kind: target,
                    });
                }
            }
        }
        if ops.is_empty() {
            return None;
        }
        return Some(Transaction::new(ops).selection_after(selection.clone()));
    }

    // Unwrap phase: flatten intersected list containers, splitting them
    // at the selection boundaries so only the selected portion is
    // affected. Container fragments keep `selected = false` and are
    // untouched by the later phases.
    let mut rewritten: Vec<(Node, bool)> = Vec::new();

    for (i, node) in old_span.iter().cloned().enumerate() {
        let top = s0 + i;
        let Node::Element(el) = node else {
            rewritten.push((node, true));
            continue;
        };
        if !el.kind.is_list() || el.children.is_empty() {
            rewritten.push((Node::Element(el), true));
            continue;
        }

        let last = el.children.len() - 1;
        let child_start = if top == s0 {
            start.path.get(1).copied().unwrap_or(0).min(last)
        } else {
            0
        };
        let child_end = if top == e0 {
            end.path.get(1).copied().unwrap_or(last).min(last)
        } else {
            last
        };

        let container_kind = el.kind;
        let mut before = el.children;
        let mut rest = before.split_off(child_start);
        let after = rest.split_off(child_end - child_start + 1);
        if !before.is_empty() {
            rewritten.push((Node::element(container_kind, before), false));
        }
        for item in rest {
            rewritten.push((item, true));
        }
        if !after.is_empty() {
            rewritten.push((Node::element(container_kind, after), false));
        }
    }

    // Set phase.
    for (node, selected) in rewritten.iter_mut() {
        if !*selected {
            continue;
        }
        let Node::Element(el) = node else {
            continue;
        };
        el.kind = if active {
            BlockKind::Paragraph
        } else if kind.is_list() {
            BlockKind::ListItem
        } else {
            kind
        };
    }

    // Wrap phase.
    let wrap_kind = if !active && kind.is_list() {
        Some(kind)
    } else {
        None
    };
    let mut new_span: Vec<Node> = Vec::new();
    match wrap_kind {
        Some(kind) => {
            let mut run: Vec<Node> = Vec::new();
            for (node, selected) in rewritten {
                if selected {
                    run.push(node);
                } else {
                    if !run.is_empty() {
                        new_span.push(Node::element(kind, std::mem::take(&mut run)));
                    }
                    new_span.push(node);
                }
            }
            if !run.is_empty() {
                new_span.push(Node::element(kind, run));
            }
        }
        None => new_span.extend(rewritten.into_iter().map(|(node, _)| node)),
    }

    if new_span == old_span {
        return None;
    }

    let mut ops: Vec<Op> = Vec::new();
    for top in (s0..=e0).rev() {
        ops.push(Op::RemoveNode { path: vec![top] });
    }
    for (offset, node) in new_span.iter().cloned().enumerate() {
        ops.push(Op::InsertNode {
            path: vec![s0 + offset],
            node,
        });
    }

    // Leaf order and text are untouched by all three phases, so a point
    // inside the span maps to the leaf with the same ordinal.
    let old_leaves = span_leaf_paths(&old_span);
    let new_leaves = span_leaf_paths(&new_span);
    let delta = new_span.len() as isize - old_span.len() as isize;

    let map_point = |point: &Point| -> Point {
        let Some(&top) = point.path.first() else {
            return point.clone();
        };
        if top < s0 {
            return point.clone();
        }
        if top > e0 {
            let mut path = point.path.clone();
            path[0] = (path[0] as isize + delta).max(0) as usize;
            return Point::new(path, point.offset);
        }
        let mut rel = point.path.clone();
        rel[0] = top - s0;
        let Some(ordinal) = old_leaves.iter().position(|p| *p == rel) else {
            return point.clone();
        };
        let Some(new_rel) = new_leaves.get(ordinal) else {
            return point.clone();
        };
        let mut path = new_rel.clone();
        path[0] += s0;
        Point::new(path, point.offset)
    };

    let selection_after = Selection {
        anchor: map_point(&selection.anchor),
        focus: map_point(&selection.focus),
    };

    Some(Transaction::new(ops).selection_after(selection_after))
}

struct TextBlock<'a> {
    path: Path,
    el: &'a ElementNode,
}

/// The lowest blocks holding text, in document order; list containers are
/// descended into, everything else is a text block.
fn text_blocks_in_order(doc: &Document) -> Vec<TextBlock<'_>> {
    fn walk<'a>(nodes: &'a [Node], path: &mut Vec<usize>, out: &mut Vec<TextBlock<'a>>) {
        for (ix, node) in nodes.iter().enumerate() {
            let Node::Element(el) = node else {
                continue;
            };
            path.push(ix);
            if el.kind.is_list() {
                walk(&el.children, path, out);
            } else {
                out.push(TextBlock {
                    path: path.clone(),
                    el,
                });
            }
            path.pop();
        }
    }

    let mut out = Vec::new();
    walk(&doc.children, &mut Vec::new(), &mut out);
    out
}

fn span_leaf_paths(nodes: &[Node]) -> Vec<Path> {
    fn walk(children: &[Node], path: &mut Vec<usize>, out: &mut Vec<Path>) {
        for (ix, node) in children.iter().enumerate() {
            path.push(ix);
            match node {
                Node::Text(_) => out.push(path.clone()),
                Node::Element(el) => walk(&el.children, path, out),
            }
            path.pop();
        }
    }

    let mut out = Vec::new();
    walk(nodes, &mut Vec::new(), &mut out);
    out
}

fn total_text_len(children: &[Node]) -> usize {
    children
        .iter()
        .map(|n| match n {
            Node::Text(t) => t.text.len(),
            Node::Element(_) => 0,
        })
        .sum()
}

fn is_point_in_block(point: &Point, block_path: &[usize]) -> bool {
    point.path.len() == block_path.len() + 1 && point.path.starts_with(block_path)
}

/// Splits the block's leaves at the range boundaries and sets the mark on
/// exactly the intersected runs. Leaves outside the range come through
/// untouched.
fn set_mark_in_block(
    children: &[Node],
    start_global: usize,
    end_global: usize,
    mark: Mark,
    target: bool,
) -> Vec<Node> {
    let mut out: Vec<Node> = Vec::new();
    let mut cursor = 0usize;

    for node in children {
        let Node::Text(t) = node else {
            out.push(node.clone());
            continue;
        };
        let node_start = cursor;
        let node_end = cursor + t.text.len();
        cursor = node_end;

        if end_global <= node_start || start_global >= node_end {
            out.push(node.clone());
            continue;
        }

        let sel_start = clamp_to_char_boundary(
            &t.text,
            start_global.saturating_sub(node_start).min(t.text.len()),
        );
        let sel_end = clamp_to_char_boundary(
            &t.text,
            end_global.saturating_sub(node_start).min(t.text.len()),
        );

        if sel_start == 0 && sel_end == t.text.len() {
            let mut next = t.clone();
            next.marks.set(mark, target);
            out.push(Node::Text(next));
            continue;
        }

        let prefix = &t.text[..sel_start];
        let middle = &t.text[sel_start..sel_end];
        let suffix = &t.text[sel_end..];

        if !prefix.is_empty() {
            out.push(Node::text(prefix, t.marks.clone()));
        }
        if !middle.is_empty() {
            let mut marks = t.marks.clone();
            marks.set(mark, target);
            out.push(Node::text(middle, marks));
        }
        if !suffix.is_empty() {
            out.push(Node::text(suffix, t.marks.clone()));
        }
    }

    if out.is_empty() {
        out.push(Node::text("", Marks::default()));
    }
    out
}

pub(crate) fn point_global_offset(children: &[Node], child_ix: usize, offset: usize) -> usize {
    let mut global = 0usize;
    for (ix, node) in children.iter().enumerate() {
        let Node::Text(t) = node else {
            continue;
        };
        if ix < child_ix {
            global += t.text.len();
            continue;
        }
        if ix == child_ix {
            global += clamp_to_char_boundary(&t.text, offset);
        }
        break;
    }
    global
}

pub(crate) fn point_for_global_offset(
    block_path: &[usize],
    children: &[Node],
    global_offset: usize,
) -> Point {
    let mut remaining = global_offset;
    for (child_ix, node) in children.iter().enumerate() {
        let Node::Text(t) = node else {
            continue;
        };
        if remaining < t.text.len() {
            let mut path = block_path.to_vec();
            path.push(child_ix);
            return Point::new(path, clamp_to_char_boundary(&t.text, remaining));
        }
        if remaining == t.text.len() {
            if matches!(children.get(child_ix + 1), Some(Node::Text(_))) {
                let mut path = block_path.to_vec();
                path.push(child_ix + 1);
                return Point::new(path, 0);
            }
            let mut path = block_path.to_vec();
            path.push(child_ix);
            return Point::new(path, t.text.len());
        }
        remaining -= t.text.len();
    }

    // Fallback to the end of the last leaf.
    for (child_ix, node) in children.iter().enumerate().rev() {
        if let Node::Text(t) = node {
            let mut path = block_path.to_vec();
            path.push(child_ix);
            return Point::new(path, t.text.len());
        }
    }

    let mut path = block_path.to_vec();
    path.push(0);
    Point::new(path, 0)
}

pub(crate) fn clamp_to_char_boundary(s: &str, mut ix: usize) -> usize {
    ix = ix.min(s.len());
    while ix > 0 && !s.is_char_boundary(ix) {
        ix -= 1;
    }
    ix
}
