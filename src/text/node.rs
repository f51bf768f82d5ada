//! Persistent paragraph tree.
//!
//! Nodes are immutable and shared through `Rc`. [`TextNode::replace`] builds
//! a new branch that reuses every untouched child, so holders of an old root
//! keep a valid snapshot and views can detect unchanged children with
//! [`Rc::ptr_eq`].

use crate::error::{Error, Result};
use crate::text::position::TextPosition;
use std::fmt;
use std::ops::Index;
use std::rc::Rc;

/// Terminal node spanning `[start, end)`.
///
/// Both ends are live positions, so a leaf's range follows edits without the
/// tree being rebuilt.
#[derive(Clone, PartialEq, Eq)]
pub struct Leaf {
    start: TextPosition,
    end: TextPosition,
}

impl Leaf {
    /// Create a leaf from its boundary positions.
    #[must_use]
    pub fn new(start: TextPosition, end: TextPosition) -> Self {
        Self { start, end }
    }

    /// Start position.
    #[must_use]
    pub fn start(&self) -> &TextPosition {
        &self.start
    }

    /// End position (exclusive).
    #[must_use]
    pub fn end(&self) -> &TextPosition {
        &self.end
    }
}

/// Composite node over a contiguous run of children.
#[derive(Clone, PartialEq, Eq)]
pub struct Branch {
    children: Vec<Rc<TextNode>>,
}

impl Branch {
    /// Create a branch, checking the children are non-empty and contiguous.
    pub fn new(children: Vec<Rc<TextNode>>) -> Result<Self> {
        check_children(&children)?;
        Ok(Self { children })
    }

    /// Children in offset order.
    #[must_use]
    pub fn children(&self) -> &[Rc<TextNode>] {
        &self.children
    }
}

/// A node of the paragraph tree.
#[derive(Clone, PartialEq, Eq)]
pub enum TextNode {
    Leaf(Leaf),
    Branch(Branch),
}

impl TextNode {
    /// Create a shared leaf node.
    #[must_use]
    pub fn leaf(start: TextPosition, end: TextPosition) -> Rc<Self> {
        Rc::new(Self::Leaf(Leaf::new(start, end)))
    }

    /// Create a shared branch node.
    pub fn branch(children: Vec<Rc<Self>>) -> Result<Rc<Self>> {
        Ok(Rc::new(Self::Branch(Branch::new(children)?)))
    }

    /// Build a branch from children already known to be contiguous.
    pub(crate) fn from_children(children: Vec<Rc<Self>>) -> Rc<Self> {
        debug_assert!(check_children(&children).is_ok());
        Rc::new(Self::Branch(Branch { children }))
    }

    /// Start offset. For a branch, the first child's start.
    #[must_use]
    pub fn offset(&self) -> usize {
        match self {
            Self::Leaf(leaf) => leaf.start.offset(),
            Self::Branch(branch) => branch.children.first().map_or(0, |c| c.offset()),
        }
    }

    /// End offset (exclusive). For a branch, the last child's end.
    #[must_use]
    pub fn end_offset(&self) -> usize {
        match self {
            Self::Leaf(leaf) => leaf.end.offset(),
            Self::Branch(branch) => branch.children.last().map_or(0, |c| c.end_offset()),
        }
    }

    /// Number of characters spanned.
    #[must_use]
    pub fn len(&self) -> usize {
        self.end_offset().saturating_sub(self.offset())
    }

    /// Check if the node spans no characters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn is_leaf(&self) -> bool {
        matches!(self, Self::Leaf(_))
    }

    /// Child nodes. Empty for a leaf.
    #[must_use]
    pub fn children(&self) -> &[Rc<Self>] {
        match self {
            Self::Leaf(_) => &[],
            Self::Branch(branch) => &branch.children,
        }
    }

    /// Number of children.
    #[must_use]
    pub fn child_count(&self) -> usize {
        self.children().len()
    }

    /// Child at `index`.
    #[must_use]
    pub fn child(&self, index: usize) -> Option<&Rc<Self>> {
        self.children().get(index)
    }

    /// Index of the child containing `offset`.
    ///
    /// A boundary offset belongs to the child that starts there. Offsets at
    /// or past the end map to the last child. Returns 0 for a leaf.
    #[must_use]
    pub fn element_index(&self, offset: usize) -> usize {
        let children = self.children();
        if children.is_empty() {
            return 0;
        }
        children
            .partition_point(|child| child.end_offset() <= offset)
            .min(children.len() - 1)
    }

    /// Build a new branch with `remove_count` children at `index` replaced by
    /// `new_nodes`.
    ///
    /// Children outside the replaced span are shared with `self`, not copied.
    pub fn replace(
        &self,
        index: usize,
        remove_count: usize,
        new_nodes: &[Rc<Self>],
    ) -> Result<Rc<Self>> {
        let Self::Branch(branch) = self else {
            return Err(Error::StructuralInvariant(
                "replace called on a leaf".to_string(),
            ));
        };
        let len = branch.children.len();
        let Some(tail) = index.checked_add(remove_count).filter(|&end| end <= len) else {
            return Err(Error::StructuralInvariant(format!(
                "replace {index}+{remove_count} exceeds {len} children"
            )));
        };

        let mut children = Vec::with_capacity(len - remove_count + new_nodes.len());
        children.extend_from_slice(&branch.children[..index]);
        children.extend_from_slice(new_nodes);
        children.extend_from_slice(&branch.children[tail..]);
        Self::branch(children)
    }
}

impl Index<usize> for TextNode {
    type Output = Rc<Self>;

    fn index(&self, index: usize) -> &Self::Output {
        &self.children()[index]
    }
}

impl fmt::Debug for TextNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Leaf(_) => write!(f, "Leaf({}..{})", self.offset(), self.end_offset()),
            Self::Branch(branch) => f
                .debug_struct("Branch")
                .field("range", &(self.offset()..self.end_offset()))
                .field("children", &branch.children)
                .finish(),
        }
    }
}

fn check_children(children: &[Rc<TextNode>]) -> Result<()> {
    if children.is_empty() {
        return Err(Error::StructuralInvariant(
            "branch must have at least one child".to_string(),
        ));
    }
    for (i, child) in children.iter().enumerate() {
        if child.offset() > child.end_offset() {
            return Err(Error::StructuralInvariant(format!(
                "child {i} ends before it starts ({}..{})",
                child.offset(),
                child.end_offset()
            )));
        }
    }
    for (i, pair) in children.windows(2).enumerate() {
        let (prev_end, next_start) = (pair[0].end_offset(), pair[1].offset());
        if prev_end != next_start {
            return Err(Error::StructuralInvariant(format!(
                "children {i} and {} not contiguous ({prev_end} != {next_start})",
                i + 1
            )));
        }
    }
    Ok(())
}
