use std::cmp::Ordering;

use crate::document::{BlockFormat, Document, Mark, Node, TextNode};
use crate::selection::{self, Point, Selection};

/// True iff the first leaf in document order intersecting the unhung
/// selection carries the mark. The first match governs; a heterogeneous
/// selection is not put to a vote.
pub fn is_mark_active(doc: &Document, selection: &Selection, mark: Mark) -> bool {
    let Ok((start, end)) = selection.unhang(doc) else {
        return false;
    };

    if start == end {
        return selection::leaf_at(doc, &start.path)
            .map(|t| t.marks.get(mark))
            .unwrap_or(false);
    }

    first_leaf_in_range(doc, &start, &end)
        .map(|t| t.marks.get(mark))
        .unwrap_or(false)
}

/// True iff at least one element whose subtree intersects the unhung
/// selection matches the wanted kind or alignment. An ancestor on the
/// enclosing path counts as intersecting.
pub fn is_block_active(doc: &Document, selection: &Selection, format: BlockFormat) -> bool {
    let Ok((start, end)) = selection.unhang(doc) else {
        return false;
    };

    fn walk(
        children: &[Node],
        path: &mut Vec<usize>,
        start: &Point,
        end: &Point,
        format: BlockFormat,
    ) -> bool {
        for (ix, node) in children.iter().enumerate() {
            let Node::Element(el) = node else {
                continue;
            };
            path.push(ix);
            let overlaps = path_overlaps(path, &start.path, &end.path);
            let matched = overlaps
                && match format {
                    BlockFormat::Kind(kind) => el.kind == kind,
                    BlockFormat::Align(align) => el.align == Some(align),
                };
            if matched || (overlaps && walk(&el.children, path, start, end, format)) {
                path.pop();
                return true;
            }
            path.pop();
        }
        false
    }

    walk(&doc.children, &mut Vec::new(), &start, &end, format)
}

fn first_leaf_in_range<'a>(doc: &'a Document, start: &Point, end: &Point) -> Option<&'a TextNode> {
    for path in selection::leaf_paths(doc) {
        if path < start.path {
            continue;
        }
        if path > end.path {
            break;
        }
        let leaf = selection::leaf_at(doc, &path)?;
        // The start leaf intersects with zero width when the range begins
        // at its very end; the first covered leaf is the next one.
        if path == start.path && path != end.path && start.offset >= leaf.text.len() {
            continue;
        }
        return Some(leaf);
    }
    None
}

/// Lexicographic path order with an ancestor comparing equal to its
/// descendants, so a containing element overlaps the range its leaves
/// span.
fn prefix_cmp(a: &[usize], b: &[usize]) -> Ordering {
    for (x, y) in a.iter().zip(b.iter()) {
        match x.cmp(y) {
            Ordering::Equal => continue,
            other => return other,
        }
    }
    Ordering::Equal
}

fn path_overlaps(path: &[usize], start: &[usize], end: &[usize]) -> bool {
    prefix_cmp(path, start) != Ordering::Less && prefix_cmp(path, end) != Ordering::Greater
}
