use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::document::{Document, Node, TextNode};
use crate::ops::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    #[serde(default)]
    pub path: Path,
    pub offset: usize,
}

impl Point {
    pub fn new(path: Path, offset: usize) -> Self {
        Self { path, offset }
    }
}

/// The selection does not touch any text; commands treat this as a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("selection does not touch any text")]
pub struct EmptySelection;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub anchor: Point,
    pub focus: Point,
}

impl Selection {
    pub fn collapsed(point: Point) -> Self {
        Self {
            anchor: point.clone(),
            focus: point,
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.focus
    }

    /// Endpoints in document order, regardless of drag direction.
    pub fn ordered(&self) -> (Point, Point) {
        let mut start = self.anchor.clone();
        let mut end = self.focus.clone();

        if start.path == end.path {
            if end.offset < start.offset {
                std::mem::swap(&mut start, &mut end);
            }
            return (start, end);
        }
        if end.path < start.path {
            std::mem::swap(&mut start, &mut end);
        }
        (start, end)
    }

    /// Ordered endpoints clamped to existing leaves, with the unhang
    /// adjustment: a non-collapsed range whose end sits at offset 0 of a
    /// leaf is pulled back to the end of the previous leaf, so block
    /// queries do not spuriously include the node the cursor merely
    /// touches at its edge.
    pub fn unhang(&self, doc: &Document) -> Result<(Point, Point), EmptySelection> {
        let leaves = leaf_paths(doc);
        if leaves.is_empty() {
            return Err(EmptySelection);
        }

        let (start, end) = self.ordered();
        let start = normalize_point(doc, &start).ok_or(EmptySelection)?;
        let mut end = normalize_point(doc, &end).ok_or(EmptySelection)?;

        if start != end && end.offset == 0 {
            if let Some(pos) = leaves.iter().position(|p| *p == end.path) {
                if pos > 0 {
                    let prev = leaves[pos - 1].clone();
                    let len = leaf_at(doc, &prev).map(|t| t.text.len()).unwrap_or(0);
                    let pulled = Point::new(prev, len);
                    if pulled >= start {
                        end = pulled;
                    }
                }
            }
        }

        Ok((start, end))
    }
}

impl PartialOrd for Point {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Point {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.path
            .cmp(&other.path)
            .then(self.offset.cmp(&other.offset))
    }
}

pub(crate) fn node_at<'a>(doc: &'a Document, path: &[usize]) -> Option<&'a Node> {
    if path.is_empty() {
        return None;
    }

    let mut node = doc.children.get(path[0])?;
    for &ix in path.iter().skip(1) {
        node = match node {
            Node::Element(el) => el.children.get(ix)?,
            Node::Text(_) => return None,
        };
    }
    Some(node)
}

pub(crate) fn leaf_at<'a>(doc: &'a Document, path: &[usize]) -> Option<&'a TextNode> {
    match node_at(doc, path)? {
        Node::Text(t) => Some(t),
        Node::Element(_) => None,
    }
}

/// Paths of all text leaves in document order.
pub(crate) fn leaf_paths(doc: &Document) -> Vec<Path> {
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
    walk(&doc.children, &mut Vec::new(), &mut out);
    out
}

pub(crate) fn first_text_point(doc: &Document) -> Option<Point> {
    leaf_paths(doc).into_iter().next().map(|p| Point::new(p, 0))
}

/// Clamps a point to the nearest existing text leaf, descending into
/// elements and capping the offset to the leaf length.
pub(crate) fn normalize_point(doc: &Document, point: &Point) -> Option<Point> {
    if point.path.is_empty() || doc.children.is_empty() {
        return None;
    }

    fn first_text_descendant(children: &[Node], path: &mut Vec<usize>) -> Option<Point> {
        for (ix, node) in children.iter().enumerate() {
            path.push(ix);
            match node {
                Node::Text(_) => {
                    let point = Point::new(path.clone(), 0);
                    path.pop();
                    return Some(point);
                }
                Node::Element(el) => {
                    if let Some(point) = first_text_descendant(&el.children, path) {
                        path.pop();
                        return Some(point);
                    }
                }
            }
            path.pop();
        }
        None
    }

    let mut resolved: Vec<usize> = Vec::new();
    let mut children: &[Node] = &doc.children;

    for &wanted in &point.path {
        if children.is_empty() {
            break;
        }
        let ix = wanted.min(children.len() - 1);
        resolved.push(ix);
        match &children[ix] {
            Node::Text(t) => {
                return Some(Point::new(resolved, point.offset.min(t.text.len())));
            }
            Node::Element(el) => {
                children = &el.children;
            }
        }
    }

    match node_at(doc, &resolved)? {
        Node::Text(t) => Some(Point::new(resolved, point.offset.min(t.text.len()))),
        Node::Element(el) => first_text_descendant(&el.children, &mut resolved),
    }
}

/// Clamps both endpoints onto existing text, falling back to the first
/// leaf of the document. Used after structural edits so the editor always
/// holds a valid selection.
pub(crate) fn normalize_selection(doc: &Document, selection: &Selection) -> Selection {
    let fallback = first_text_point(doc).unwrap_or(Point::new(vec![0], 0));

    let anchor = normalize_point(doc, &selection.anchor).unwrap_or_else(|| {
        normalize_point(doc, &selection.focus).unwrap_or_else(|| fallback.clone())
    });
    let focus = normalize_point(doc, &selection.focus).unwrap_or_else(|| anchor.clone());

    Selection { anchor, focus }
}
