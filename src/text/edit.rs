//! Undoable edit records and undo history.
//!
//! Every mutation of a [`Document`] produces one [`UndoableEdit`]: a
//! compound of the content change and, when paragraph structure changed, an
//! [`ElementEdit`] naming the replaced children. Redo replays a compound
//! front to back, undo back to front.
//!
//! # Examples
//!
//! ```
//! use std::cell::RefCell;
//! use std::rc::Rc;
//! use textdoc::{Document, UndoManager};
//!
//! let mut doc = Document::new();
//! let history = Rc::new(RefCell::new(UndoManager::new()));
//! doc.track_undo(&history);
//!
//! doc.insert_at(0, "Hello").unwrap();
//! doc.insert_at(5, "\nWorld").unwrap();
//! assert_eq!(doc.root().child_count(), 2);
//!
//! history.borrow_mut().undo(&mut doc).unwrap();
//! assert_eq!(doc.text(), "Hello");
//! assert_eq!(doc.root().child_count(), 1);
//!
//! history.borrow_mut().redo(&mut doc).unwrap();
//! assert_eq!(doc.text(), "Hello\nWorld");
//! ```

use crate::error::{Error, Result};
use crate::event::{LogLevel, emit_log_with};
use crate::text::document::Document;
use crate::text::node::TextNode;
use crate::text::position::RecordedPosition;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

/// Whether a content edit added or removed text.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContentChange {
    Insert,
    Remove,
}

/// Text added to or removed from the content buffer.
pub struct ContentEdit {
    change: ContentChange,
    offset: usize,
    text: String,
    chars: usize,
    // Offsets of positions caught in the removed range, restored when the
    // text comes back. Filled at creation for a removal, at undo for an insert.
    positions: RefCell<Vec<RecordedPosition>>,
    done: Cell<bool>,
}

impl ContentEdit {
    pub(crate) fn insert(offset: usize, text: String) -> Self {
        Self::new(ContentChange::Insert, offset, text, Vec::new())
    }

    pub(crate) fn remove(offset: usize, text: String, positions: Vec<RecordedPosition>) -> Self {
        Self::new(ContentChange::Remove, offset, text, positions)
    }

    fn new(
        change: ContentChange,
        offset: usize,
        text: String,
        positions: Vec<RecordedPosition>,
    ) -> Self {
        let chars = text.chars().count();
        Self {
            change,
            offset,
            text,
            chars,
            positions: RefCell::new(positions),
            done: Cell::new(true),
        }
    }

    #[must_use]
    pub fn change(&self) -> ContentChange {
        self.change
    }

    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Inserted or removed text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Length of [`text`](Self::text) in chars.
    #[must_use]
    pub fn len(&self) -> usize {
        self.chars
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chars == 0
    }

    fn add_text(&self, doc: &mut Document) -> Result<()> {
        let core = doc.core_mut();
        core.apply_insert(self.offset, &self.text)?;
        core.restore_positions(self.offset, self.chars, &self.positions.borrow());
        Ok(())
    }

    fn remove_text(&self, doc: &mut Document) -> Result<Vec<RecordedPosition>> {
        doc.core_mut().apply_remove(self.offset, self.chars)
    }

    fn undo(&self, doc: &mut Document) -> Result<()> {
        match self.change {
            ContentChange::Insert => {
                let recorded = self.remove_text(doc)?;
                *self.positions.borrow_mut() = recorded;
            }
            ContentChange::Remove => self.add_text(doc)?,
        }
        Ok(())
    }

    fn redo(&self, doc: &mut Document) -> Result<()> {
        match self.change {
            ContentChange::Insert => self.add_text(doc),
            ContentChange::Remove => self.remove_text(doc).map(drop),
        }
    }
}

impl fmt::Debug for ContentEdit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContentEdit")
            .field("change", &self.change)
            .field("offset", &self.offset)
            .field("text", &self.text)
            .finish_non_exhaustive()
    }
}

/// Replacement of a run of root children.
///
/// `added` took the place of `removed` at `index`. Both arrays are fixed at
/// creation; undo and redo only read them.
pub struct ElementEdit {
    old_root: Rc<TextNode>,
    new_root: Rc<TextNode>,
    index: usize,
    added: Vec<Rc<TextNode>>,
    removed: Vec<Rc<TextNode>>,
    done: Cell<bool>,
}

impl ElementEdit {
    pub(crate) fn new(
        old_root: Rc<TextNode>,
        new_root: Rc<TextNode>,
        index: usize,
        added: Vec<Rc<TextNode>>,
        removed: Vec<Rc<TextNode>>,
    ) -> Self {
        Self {
            old_root,
            new_root,
            index,
            added,
            removed,
            done: Cell::new(true),
        }
    }

    /// Root before the edit.
    #[must_use]
    pub fn old_root(&self) -> &Rc<TextNode> {
        &self.old_root
    }

    /// Root after the edit.
    #[must_use]
    pub fn new_root(&self) -> &Rc<TextNode> {
        &self.new_root
    }

    /// Index of the first replaced child.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Children inserted by the edit.
    #[must_use]
    pub fn added(&self) -> &[Rc<TextNode>] {
        &self.added
    }

    /// Children removed by the edit.
    #[must_use]
    pub fn removed(&self) -> &[Rc<TextNode>] {
        &self.removed
    }

    fn undo(&self, doc: &mut Document) -> Result<()> {
        doc.core_mut()
            .apply_replace(self.index, self.added.len(), &self.removed)
    }

    fn redo(&self, doc: &mut Document) -> Result<()> {
        doc.core_mut()
            .apply_replace(self.index, self.removed.len(), &self.added)
    }
}

impl fmt::Debug for ElementEdit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ElementEdit")
            .field("index", &self.index)
            .field("added", &self.added)
            .field("removed", &self.removed)
            .finish_non_exhaustive()
    }
}

/// Ordered group of edits applied as one.
pub struct CompoundEdit {
    edits: Vec<Rc<UndoableEdit>>,
    done: Cell<bool>,
}

impl Default for CompoundEdit {
    fn default() -> Self {
        Self::new()
    }
}

impl CompoundEdit {
    /// Create an empty group.
    #[must_use]
    pub fn new() -> Self {
        Self {
            edits: Vec::new(),
            done: Cell::new(true),
        }
    }

    /// Append an edit. Redo replays edits in the order they were added.
    pub fn add(&mut self, edit: Rc<UndoableEdit>) {
        self.edits.push(edit);
    }

    /// Grouped edits in redo order.
    #[must_use]
    pub fn edits(&self) -> &[Rc<UndoableEdit>] {
        &self.edits
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    /// Undo back to front. On failure the edits already undone are redone,
    /// so the group is left fully applied.
    fn undo(&self, doc: &mut Document) -> Result<()> {
        for (i, edit) in self.edits.iter().enumerate().rev() {
            if let Err(err) = edit.undo(doc) {
                for undone in &self.edits[i + 1..] {
                    if let Err(rollback) = undone.redo(doc) {
                        log_rollback_failure(&rollback);
                    }
                }
                return Err(err);
            }
        }
        Ok(())
    }

    /// Redo front to back. On failure the edits already redone are undone
    /// again, so the group is left fully reverted.
    fn redo(&self, doc: &mut Document) -> Result<()> {
        for (i, edit) in self.edits.iter().enumerate() {
            if let Err(err) = edit.redo(doc) {
                for redone in self.edits[..i].iter().rev() {
                    if let Err(rollback) = redone.undo(doc) {
                        log_rollback_failure(&rollback);
                    }
                }
                return Err(err);
            }
        }
        Ok(())
    }
}

fn log_rollback_failure(err: &Error) {
    emit_log_with(LogLevel::Warn, || {
        format!("compound edit rollback failed: {err}")
    });
}

impl fmt::Debug for CompoundEdit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(&self.edits).finish()
    }
}

/// An edit that can be reverted and re-applied.
#[derive(Debug)]
pub enum UndoableEdit {
    Content(ContentEdit),
    Element(ElementEdit),
    Compound(CompoundEdit),
}

impl UndoableEdit {
    /// True while the edit is applied (not undone).
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.done_flag().get()
    }

    /// All edits here are significant to an undo history.
    #[must_use]
    pub fn is_significant(&self) -> bool {
        true
    }

    /// Short label for menus ("Undo typing").
    #[must_use]
    pub fn presentation_name(&self) -> &'static str {
        match self {
            Self::Content(edit) => match edit.change {
                ContentChange::Insert => "insertion",
                ContentChange::Remove => "deletion",
            },
            Self::Element(_) => "structure change",
            Self::Compound(group) => match group.edits.first() {
                Some(first) if group.edits.len() <= 2 => first.presentation_name(),
                _ => "edit",
            },
        }
    }

    /// First structural edit in this edit, depth first.
    #[must_use]
    pub fn element_edit(&self) -> Option<&ElementEdit> {
        match self {
            Self::Content(_) => None,
            Self::Element(edit) => Some(edit),
            Self::Compound(group) => group.edits.iter().find_map(|e| e.element_edit()),
        }
    }

    /// First content edit in this edit, depth first.
    #[must_use]
    pub fn content_edit(&self) -> Option<&ContentEdit> {
        match self {
            Self::Content(edit) => Some(edit),
            Self::Element(_) => None,
            Self::Compound(group) => group.edits.iter().find_map(|e| e.content_edit()),
        }
    }

    /// Revert the edit.
    ///
    /// Fails with [`Error::InvalidOperation`] if the edit is already undone.
    pub fn undo(&self, doc: &mut Document) -> Result<()> {
        if !self.is_done() {
            return Err(Error::InvalidOperation("undo of an edit that is not done"));
        }
        match self {
            Self::Content(edit) => edit.undo(doc)?,
            Self::Element(edit) => edit.undo(doc)?,
            Self::Compound(group) => group.undo(doc)?,
        }
        self.done_flag().set(false);
        Ok(())
    }

    /// Re-apply an undone edit.
    ///
    /// Fails with [`Error::InvalidOperation`] if the edit is currently done.
    pub fn redo(&self, doc: &mut Document) -> Result<()> {
        if self.is_done() {
            return Err(Error::InvalidOperation("redo of an edit that is not undone"));
        }
        match self {
            Self::Content(edit) => edit.redo(doc)?,
            Self::Element(edit) => edit.redo(doc)?,
            Self::Compound(group) => group.redo(doc)?,
        }
        self.done_flag().set(true);
        Ok(())
    }

    fn done_flag(&self) -> &Cell<bool> {
        match self {
            Self::Content(edit) => &edit.done,
            Self::Element(edit) => &edit.done,
            Self::Compound(group) => &group.done,
        }
    }
}

/// Default maximum number of undo groups to retain.
const DEFAULT_MAX_HISTORY_DEPTH: usize = 1000;

/// Undo history with bounded memory usage.
///
/// Edits arrive through [`add_edit`](Self::add_edit), usually from a
/// [`Document::track_undo`] listener. Edits added between
/// [`begin_group`](Self::begin_group) and [`end_group`](Self::end_group)
/// are undone and redone as one step.
#[derive(Debug)]
pub struct UndoManager {
    undo_stack: Vec<Rc<UndoableEdit>>,
    redo_stack: Vec<Rc<UndoableEdit>>,
    current_group: Option<CompoundEdit>,
    /// Maximum number of undo groups to retain. Oldest entries are dropped when exceeded.
    max_depth: usize,
}

impl Default for UndoManager {
    fn default() -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            current_group: None,
            max_depth: DEFAULT_MAX_HISTORY_DEPTH,
        }
    }
}

impl UndoManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a history with a custom maximum depth.
    #[must_use]
    pub fn with_max_depth(max_depth: usize) -> Self {
        Self {
            max_depth,
            ..Self::default()
        }
    }

    /// Set the maximum depth. Excess groups are pruned on the next push.
    pub fn set_max_depth(&mut self, max_depth: usize) {
        self.max_depth = max_depth;
    }

    #[must_use]
    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Record a new edit. Clears the redo stack.
    pub fn add_edit(&mut self, edit: Rc<UndoableEdit>) {
        self.redo_stack.clear();
        if let Some(group) = self.current_group.as_mut() {
            group.add(edit);
        } else {
            self.push_undo(edit);
        }
    }

    /// Start collecting edits into one undo step. Nested calls are flattened.
    pub fn begin_group(&mut self) {
        if self.current_group.is_none() {
            self.current_group = Some(CompoundEdit::new());
        }
    }

    /// Close the current group. Empty groups leave no undo step.
    pub fn end_group(&mut self) {
        if let Some(group) = self.current_group.take() {
            if !group.is_empty() {
                self.push_undo(Rc::new(UndoableEdit::Compound(group)));
            }
        }
    }

    /// Undo the most recent step. Returns `false` when there is nothing to undo.
    pub fn undo(&mut self, doc: &mut Document) -> Result<bool> {
        self.end_group();
        let Some(edit) = self.undo_stack.pop() else {
            return Ok(false);
        };
        if let Err(err) = edit.undo(doc) {
            self.undo_stack.push(edit);
            return Err(err);
        }
        self.redo_stack.push(edit);
        Ok(true)
    }

    /// Redo the most recently undone step. Returns `false` when there is nothing to redo.
    pub fn redo(&mut self, doc: &mut Document) -> Result<bool> {
        let Some(edit) = self.redo_stack.pop() else {
            return Ok(false);
        };
        if let Err(err) = edit.redo(doc) {
            self.redo_stack.push(edit);
            return Err(err);
        }
        self.undo_stack.push(edit);
        Ok(true)
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty() || self.current_group.as_ref().is_some_and(|g| !g.is_empty())
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Drop all history.
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.current_group = None;
    }

    fn push_undo(&mut self, edit: Rc<UndoableEdit>) {
        self.undo_stack.push(edit);
        // Enforce depth limit by dropping oldest entries
        if self.undo_stack.len() > self.max_depth {
            let excess = self.undo_stack.len() - self.max_depth;
            self.undo_stack.drain(..excess);
        }
    }
}
