use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The structural role of a block element. Closed set: adding a kind is a
/// compile-time extension point, exhaustively matched at the query and
/// command boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlockKind {
    Paragraph,
    ListItem,
    BulletedList,
    NumberedList,
}

impl BlockKind {
    /// List container kinds. Their immediate children are exclusively
    /// `ListItem` elements.
    pub fn is_list(self) -> bool {
        matches!(self, BlockKind::BulletedList | BlockKind::NumberedList)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Align {
    Left,
    Right,
    Center,
    Justify,
}

/// A boolean text-level formatting attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mark {
    Bold,
    Italic,
    Code,
    Underline,
}

impl Mark {
    /// All marks, in the outer-to-inner wrapper precedence a renderer
    /// applies them in.
    pub const ALL: [Mark; 4] = [Mark::Bold, Mark::Italic, Mark::Code, Mark::Underline];
}

fn is_false(v: &bool) -> bool {
    !*v
}

/// The set of active marks on a leaf. Serialized flat on the leaf object
/// with `false` omitted, so absence means inactive.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Marks {
    #[serde(default, skip_serializing_if = "is_false")]
    pub bold: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub italic: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub code: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub underline: bool,
}

impl Marks {
    pub fn get(&self, mark: Mark) -> bool {
        match mark {
            Mark::Bold => self.bold,
            Mark::Italic => self.italic,
            Mark::Code => self.code,
            Mark::Underline => self.underline,
        }
    }

    pub fn set(&mut self, mark: Mark, value: bool) {
        match mark {
            Mark::Bold => self.bold = value,
            Mark::Italic => self.italic = value,
            Mark::Code => self.code = value,
            Mark::Underline => self.underline = value,
        }
    }

    pub fn with(mark: Mark) -> Self {
        let mut marks = Self::default();
        marks.set(mark, true);
        marks
    }

    pub fn is_empty(&self) -> bool {
        !(self.bold || self.italic || self.code || self.underline)
    }
}

/// A run of text carrying a set of active marks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextNode {
    pub text: String,
    #[serde(flatten)]
    pub marks: Marks,
}

/// A block-level element. `align` is unset by default and never present on
/// list containers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementNode {
    #[serde(rename = "type")]
    pub kind: BlockKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub align: Option<Align>,
    #[serde(default)]
    pub children: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Node {
    Element(ElementNode),
    Text(TextNode),
}

impl Node {
    pub fn text(text: impl Into<String>, marks: Marks) -> Self {
        Node::Text(TextNode {
            text: text.into(),
            marks,
        })
    }

    pub fn element(kind: BlockKind, children: Vec<Node>) -> Self {
        Node::Element(ElementNode {
            kind,
            align: None,
            children,
        })
    }

    pub fn paragraph(text: impl Into<String>) -> Self {
        Node::element(
            BlockKind::Paragraph,
            vec![Node::text(text, Marks::default())],
        )
    }

    pub fn list_item(text: impl Into<String>) -> Self {
        Node::element(BlockKind::ListItem, vec![Node::text(text, Marks::default())])
    }
}

/// The document: an ordered sequence of top-level block elements.
/// Serializes as the bare array, matching the persisted snapshot format.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document {
    pub children: Vec<Node>,
}

/// An attempted mutation would break the nesting invariant between list
/// containers and list items.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("structural violation: {0}")]
pub struct StructuralViolation(pub String);

impl Document {
    pub fn new(children: Vec<Node>) -> Self {
        Self { children }
    }

    /// Checks the nesting invariants: every leaf sits inside a block
    /// element, list containers hold only list items (and at least one),
    /// non-list elements hold only text leaves, and alignment never sits
    /// on a list container.
    pub fn validate(&self) -> Result<(), StructuralViolation> {
        for node in &self.children {
            if matches!(node, Node::Text(_)) {
                return Err(StructuralViolation(
                    "text leaf at document root".to_string(),
                ));
            }
            validate_node(node)?;
        }
        Ok(())
    }
}

fn validate_node(node: &Node) -> Result<(), StructuralViolation> {
    let Node::Element(el) = node else {
        return Ok(());
    };

    if el.kind.is_list() {
        if el.align.is_some() {
            return Err(StructuralViolation(format!(
                "alignment set on list container {:?}",
                el.kind
            )));
        }
        if el.children.is_empty() {
            return Err(StructuralViolation(format!(
                "empty list container {:?}",
                el.kind
            )));
        }
        for child in &el.children {
            match child {
                Node::Element(item) if item.kind == BlockKind::ListItem => {
                    validate_node(child)?;
                }
                Node::Element(item) => {
                    return Err(StructuralViolation(format!(
                        "{:?} inside list container {:?}",
                        item.kind, el.kind
                    )));
                }
                Node::Text(_) => {
                    return Err(StructuralViolation(format!(
                        "text leaf directly inside list container {:?}",
                        el.kind
                    )));
                }
            }
        }
        return Ok(());
    }

    for child in &el.children {
        if let Node::Element(inner) = child {
            return Err(StructuralViolation(format!(
                "{:?} nested inside {:?}",
                inner.kind, el.kind
            )));
        }
    }
    Ok(())
}

/// What a block toggle targets: either the structural kind of a block or
/// its text alignment. Alignment toggles never touch list nesting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlockFormat {
    Kind(BlockKind),
    Align(Align),
}

impl BlockFormat {
    pub fn is_align(self) -> bool {
        matches!(self, BlockFormat::Align(_))
    }
}
