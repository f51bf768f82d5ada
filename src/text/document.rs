//! The editable document.
//!
//! A [`Document`] ties the content buffer, the position registry and the
//! paragraph tree together and sequences every mutation:
//!
//! 1. the filter chain sees the request and may rewrite or drop it
//! 2. the buffer mutates and live positions shift
//! 3. the break classifier re-scans the dirty window
//! 4. the paragraphs overlapping the window are rebuilt and the root replaced
//! 5. listeners receive `DocumentModified` and the undoable edit
//!
//! The root is a branch of paragraph leaves. Adjacent leaves share one
//! `Backward` boundary position and the last leaf ends at a `Forward`
//! position at the document end, so an insert without line breaks moves
//! every boundary correctly and leaves the tree untouched.

use crate::error::{Error, Result};
use crate::event::{LogLevel, emit_event_with, emit_log_with};
use crate::text::breaks::{self, is_line_break_char, line_ends};
use crate::text::content::ContentBuffer;
use crate::text::edit::{CompoundEdit, ContentEdit, ElementEdit, UndoManager, UndoableEdit};
use crate::text::filter::{
    CharFilter, DocumentFilter, FilterBypass, FilterStack, LineBreakFilter, MaxLengthFilter,
};
use crate::text::node::TextNode;
use crate::text::position::{Bias, PositionRegistry, RecordedPosition, TextPosition};
use std::cell::RefCell;
use std::fmt;
use std::ops::Range;
use std::rc::Rc;

/// Kind of change reported by [`DocumentModified`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ModificationType {
    Insert,
    Delete,
    /// Paragraph structure changed without a content change (undo/redo of
    /// a structural edit).
    Change,
}

impl ModificationType {
    fn as_str(self) -> &'static str {
        match self {
            Self::Insert => "insert",
            Self::Delete => "delete",
            Self::Change => "change",
        }
    }
}

/// Notification that a range of the document changed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DocumentModified {
    pub offset: usize,
    pub length: usize,
    pub kind: ModificationType,
}

/// Construction options for a [`Document`].
#[derive(Clone, Debug, Default)]
pub struct DocumentOptions {
    /// Text loaded before any filter is installed.
    pub initial_text: String,
    /// Drop line breaks from every insert.
    pub single_line: bool,
    /// Cap the document length in chars.
    pub max_length: Option<usize>,
    /// Drop control characters other than tab and line breaks.
    pub strip_control: bool,
}

type ModifiedListener = Box<dyn FnMut(&DocumentModified)>;
type EditListener = Box<dyn FnMut(&Rc<UndoableEdit>, bool)>;

/// Everything a mutation touches except the filter chain.
///
/// Split from [`Document`] so a [`FilterBypass`] can hold the core mutably
/// while walking the filters.
pub(crate) struct DocumentCore {
    content: ContentBuffer,
    positions: PositionRegistry,
    root: Rc<TextNode>,
    pending: Option<CompoundEdit>,
    modified_listeners: Vec<ModifiedListener>,
    edit_listeners: Vec<EditListener>,
}

impl DocumentCore {
    fn new(text: &str) -> Self {
        let content = ContentBuffer::from_str(text);
        let positions = PositionRegistry::new();
        let root = build_root(&content, &positions);
        Self {
            content,
            positions,
            root,
            pending: None,
            modified_listeners: Vec::new(),
            edit_listeners: Vec::new(),
        }
    }

    pub(crate) fn content(&self) -> &ContentBuffer {
        &self.content
    }

    /// Insert at the end of the filter chain.
    pub(crate) fn insert(&mut self, offset: usize, text: &str) -> Result<()> {
        self.content.check_range(offset, 0)?;
        if text.is_empty() {
            return Ok(());
        }
        let length = text.chars().count();
        let last = self.root.element_index(offset);
        let first = self.extend_over_cr(last, offset);

        self.content.insert_at(offset, text)?;
        self.positions.insert_at(offset, length);
        let window = self.scan_window();
        let structure = self.rebuild(first, last, window)?;

        emit_log_with(LogLevel::Debug, || {
            format!("inserted {length} chars at {offset}")
        });
        self.commit(
            ContentEdit::insert(offset, text.to_string()),
            structure,
            DocumentModified {
                offset,
                length,
                kind: ModificationType::Insert,
            },
        );
        Ok(())
    }

    /// Remove at the end of the filter chain.
    pub(crate) fn remove(&mut self, offset: usize, length: usize) -> Result<()> {
        self.content.check_range(offset, length)?;
        if length == 0 {
            return Ok(());
        }
        let first = self.root.element_index(offset);
        let last = self.root.element_index(offset + length);

        let removed = self.content.delete_at(offset, length)?;
        let recorded = self.positions.remove_at(offset, length);
        let first = self.extend_over_cr(first, offset);
        let window = self.scan_window();
        let structure = self.rebuild(first, last, window)?;

        emit_log_with(LogLevel::Debug, || {
            format!("removed {length} chars at {offset}")
        });
        self.commit(
            ContentEdit::remove(offset, removed, recorded),
            structure,
            DocumentModified {
                offset,
                length,
                kind: ModificationType::Delete,
            },
        );
        Ok(())
    }

    /// Remove then insert, reported as one undoable edit.
    pub(crate) fn replace(&mut self, offset: usize, length: usize, text: &str) -> Result<()> {
        self.content.check_range(offset, length)?;
        let outermost = self.pending.is_none();
        if outermost {
            self.pending = Some(CompoundEdit::new());
        }
        let result = self
            .remove(offset, length)
            .and_then(|()| self.insert(offset, text));
        if outermost {
            if let Some(group) = self.pending.take().filter(|group| !group.is_empty()) {
                self.publish(&Rc::new(UndoableEdit::Compound(group)));
            }
        }
        result
    }

    /// Insert text during undo/redo: no filters, no tree rebuild, no new edit.
    pub(crate) fn apply_insert(&mut self, offset: usize, text: &str) -> Result<()> {
        self.content.insert_at(offset, text)?;
        let length = text.chars().count();
        self.positions.insert_at(offset, length);
        self.content.take_dirty();
        self.notify(&DocumentModified {
            offset,
            length,
            kind: ModificationType::Insert,
        });
        Ok(())
    }

    /// Remove text during undo/redo. Returns the positions caught in the range.
    pub(crate) fn apply_remove(
        &mut self,
        offset: usize,
        length: usize,
    ) -> Result<Vec<RecordedPosition>> {
        self.content.delete_at(offset, length)?;
        let recorded = self.positions.remove_at(offset, length);
        self.content.take_dirty();
        self.notify(&DocumentModified {
            offset,
            length,
            kind: ModificationType::Delete,
        });
        Ok(recorded)
    }

    pub(crate) fn restore_positions(
        &mut self,
        offset: usize,
        length: usize,
        recorded: &[RecordedPosition],
    ) {
        self.positions.restore(offset, length, recorded);
    }

    /// Swap root children during undo/redo.
    pub(crate) fn apply_replace(
        &mut self,
        index: usize,
        remove_count: usize,
        nodes: &[Rc<TextNode>],
    ) -> Result<()> {
        let root = self.root.replace(index, remove_count, nodes)?;
        self.check_root(&root)?;
        let span = nodes
            .first()
            .zip(nodes.last())
            .map_or(0..0, |(first, last)| first.offset()..last.end_offset());
        self.root = root;
        self.notify(&DocumentModified {
            offset: span.start,
            length: span.len(),
            kind: ModificationType::Change,
        });
        Ok(())
    }

    /// Widen `index` to the previous paragraph when `offset` starts a
    /// paragraph right after a CR, which a following LF may join.
    fn extend_over_cr(&self, index: usize, offset: usize) -> usize {
        if index > 0
            && self.root[index].offset() == offset
            && self.content.char_or_nul(offset - 1) == '\r'
        {
            index - 1
        } else {
            index
        }
    }

    /// Characters whose line-break classification may have changed: the
    /// dirty range plus one character of context on each side.
    fn scan_window(&mut self) -> Range<usize> {
        let dirty = self.content.take_dirty().unwrap_or(0..0);
        dirty.start.saturating_sub(1)..(dirty.end + 1).min(self.content.len())
    }

    /// Recompute paragraphs `first..=last` after a mutation and install the
    /// new root. Returns `None` when the paragraph spans did not change.
    fn rebuild(
        &mut self,
        first: usize,
        mut last: usize,
        mut window: Range<usize>,
    ) -> Result<Option<ElementEdit>> {
        let count = self.root.child_count();
        let len = self.content.len();
        let start = self.root[first].offset();
        let mut end = self.root[last].end_offset();
        // A paragraph ending in CR followed by one starting with LF now
        // forms a single break.
        while last + 1 < count
            && end > 0
            && self.content.char_or_nul(end - 1) == '\r'
            && self.content.char_or_nul(end) == '\n'
        {
            window = window.start.min(end - 1)..window.end.max(end + 1);
            last += 1;
            end = self.root[last].end_offset();
        }
        let window = window.start.max(start)..window.end.min(end);

        let old: Vec<Rc<TextNode>> = self.root.children()[first..=last].to_vec();
        let mut bounds: Vec<usize> = old[..old.len() - 1]
            .iter()
            .map(|node| node.end_offset())
            .filter(|&b| start < b && b < end && !(window.start < b && b <= window.end))
            .collect();
        bounds.extend(
            line_ends(&self.content, window.start, window.end)
                .into_iter()
                .filter(|&b| start < b && b < end),
        );
        bounds.sort_unstable();
        bounds.dedup();
        let trailing = last + 1 == count
            && end == len
            && end > start
            && is_line_break_char(self.content.char_or_nul(end - 1));

        let mut spans = Vec::with_capacity(bounds.len() + 2);
        let mut at = start;
        for &b in &bounds {
            spans.push((at, b));
            at = b;
        }
        spans.push((at, end));
        if trailing {
            spans.push((end, end));
        }
        let unchanged = spans.len() == old.len()
            && spans
                .iter()
                .zip(&old)
                .all(|(&(s, e), node)| node.offset() == s && node.end_offset() == e);
        if unchanged {
            return Ok(None);
        }

        let (head, tail) = match (&*old[0], &*old[old.len() - 1]) {
            (TextNode::Leaf(head), TextNode::Leaf(tail)) => {
                (head.start().clone(), tail.end().clone())
            }
            _ => {
                return Err(Error::StructuralInvariant(
                    "paragraph is not a leaf".to_string(),
                ));
            }
        };
        let mut edges: Vec<TextPosition> = Vec::with_capacity(spans.len() + 1);
        edges.push(head);
        for &(_, e) in &spans[..spans.len() - 1] {
            edges.push(self.positions.create(e, Bias::Backward));
        }
        edges.push(tail);

        let new: Vec<Rc<TextNode>> = edges
            .windows(2)
            .map(|pair| reuse_leaf(&old, &pair[0], &pair[1]))
            .collect();

        // Trim paragraphs that came through unchanged.
        let prefix = new
            .iter()
            .zip(&old)
            .take_while(|(a, b)| Rc::ptr_eq(a, b))
            .count();
        let suffix = new[prefix..]
            .iter()
            .rev()
            .zip(old[prefix..].iter().rev())
            .take_while(|(a, b)| Rc::ptr_eq(a, b))
            .count();
        let added = new[prefix..new.len() - suffix].to_vec();
        let removed = old[prefix..old.len() - suffix].to_vec();
        let index = first + prefix;

        let old_root = Rc::clone(&self.root);
        let new_root = old_root.replace(index, removed.len(), &added)?;
        self.check_root(&new_root)?;
        self.root = Rc::clone(&new_root);

        emit_log_with(LogLevel::Debug, || {
            format!(
                "replaced {} paragraphs at {index} with {}",
                removed.len(),
                added.len()
            )
        });
        let edit = ElementEdit::new(old_root, new_root, index, added, removed);
        Ok(Some(edit))
    }

    fn check_root(&self, root: &TextNode) -> Result<()> {
        let len = self.content.len();
        if root.offset() != 0 || root.end_offset() != len {
            return Err(Error::StructuralInvariant(format!(
                "root spans {}..{} but text has {len} chars",
                root.offset(),
                root.end_offset()
            )));
        }
        Ok(())
    }

    fn commit(
        &mut self,
        content: ContentEdit,
        structure: Option<ElementEdit>,
        event: DocumentModified,
    ) {
        let mut edit = CompoundEdit::new();
        edit.add(Rc::new(UndoableEdit::Content(content)));
        if let Some(structure) = structure {
            edit.add(Rc::new(UndoableEdit::Element(structure)));
        }
        self.notify(&event);

        let edit = Rc::new(UndoableEdit::Compound(edit));
        match self.pending.as_mut() {
            Some(group) => group.add(edit),
            None => self.publish(&edit),
        }
    }

    fn notify(&mut self, event: &DocumentModified) {
        emit_event_with("document_modified", || {
            format!(
                "offset={} length={} type={}",
                event.offset,
                event.length,
                event.kind.as_str()
            )
        });
        for listener in &mut self.modified_listeners {
            listener(event);
        }
    }

    fn publish(&mut self, edit: &Rc<UndoableEdit>) {
        emit_event_with("undoable_edit", || {
            format!(
                "name={} structural={}",
                edit.presentation_name(),
                edit.element_edit().is_some()
            )
        });
        for listener in &mut self.edit_listeners {
            listener(edit, edit.is_significant());
        }
    }
}

/// Build the initial paragraph tree for `content`.
fn build_root(content: &ContentBuffer, positions: &PositionRegistry) -> Rc<TextNode> {
    let len = content.len();
    let mut edges = vec![positions.create(0, Bias::Backward)];
    edges.extend(
        line_ends(content, 0, len)
            .into_iter()
            .map(|b| positions.create(b, Bias::Backward)),
    );
    edges.push(positions.create(len, Bias::Forward));
    let leaves = edges
        .windows(2)
        .map(|pair| TextNode::leaf(pair[0].clone(), pair[1].clone()))
        .collect();
    TextNode::from_children(leaves)
}

/// The old leaf with exactly these edges, or a new one.
fn reuse_leaf(old: &[Rc<TextNode>], start: &TextPosition, end: &TextPosition) -> Rc<TextNode> {
    old.iter()
        .find(|node| match &***node {
            TextNode::Leaf(leaf) => leaf.start() == start && leaf.end() == end,
            TextNode::Branch(_) => false,
        })
        .map_or_else(|| TextNode::leaf(start.clone(), end.clone()), Rc::clone)
}

/// An editable text document.
///
/// # Examples
///
/// ```
/// use textdoc::{Bias, Document};
///
/// let mut doc = Document::new();
/// doc.insert_at(0, "Hello World").unwrap();
/// let caret = doc.create_position(6, Bias::Forward).unwrap();
///
/// doc.insert_at(5, "\n").unwrap();
/// assert_eq!(doc.paragraph_count(), 2);
/// assert_eq!(doc.paragraph_range(1), Some(6..12));
/// assert_eq!(caret.offset(), 7);
/// ```
pub struct Document {
    core: DocumentCore,
    filters: FilterStack,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create an empty document.
    #[must_use]
    pub fn new() -> Self {
        Self::with_text("")
    }

    /// Create a document holding `text`.
    #[must_use]
    pub fn with_text(text: &str) -> Self {
        Self {
            core: DocumentCore::new(text),
            filters: FilterStack::new(),
        }
    }

    /// Create a document from options. The initial text bypasses the
    /// filters the options install.
    #[must_use]
    pub fn with_options(options: DocumentOptions) -> Self {
        let mut doc = Self::with_text(&options.initial_text);
        if options.strip_control {
            doc.push_filter(Box::new(CharFilter::strip_control()));
        }
        if options.single_line {
            doc.push_filter(Box::new(LineBreakFilter));
        }
        if let Some(max_length) = options.max_length {
            doc.push_filter(Box::new(MaxLengthFilter::new(max_length)));
        }
        doc
    }

    /// Insert `text` at `offset` through the filter chain.
    ///
    /// Succeeds when a filter drops or truncates the text; check
    /// [`text_length`](Self::text_length) for what was applied.
    pub fn insert_at(&mut self, offset: usize, text: &str) -> Result<()> {
        self.core.content.check_range(offset, 0)?;
        FilterBypass::new(&mut self.core, self.filters.as_slice()).insert_string(offset, text)
    }

    /// Insert a single character at `offset` through the filter chain.
    pub fn insert_char_at(&mut self, offset: usize, ch: char) -> Result<()> {
        self.core.content.check_range(offset, 0)?;
        FilterBypass::new(&mut self.core, self.filters.as_slice()).insert_char(offset, ch)
    }

    /// Delete `length` chars at `offset` through the filter chain.
    pub fn delete_at(&mut self, offset: usize, length: usize) -> Result<()> {
        self.core.content.check_range(offset, length)?;
        FilterBypass::new(&mut self.core, self.filters.as_slice()).delete(offset, length)
    }

    /// Replace `length` chars at `offset` with `text` through the filter chain.
    pub fn replace_at(&mut self, offset: usize, length: usize, text: &str) -> Result<()> {
        self.core.content.check_range(offset, length)?;
        FilterBypass::new(&mut self.core, self.filters.as_slice()).replace(offset, length, text)
    }

    /// Create a live position at `offset`.
    pub fn create_position(&self, offset: usize, bias: Bias) -> Result<TextPosition> {
        self.core.content.check_range(offset, 0)?;
        Ok(self.core.positions.create(offset, bias))
    }

    pub fn text_at(&self, offset: usize, length: usize) -> Result<String> {
        self.core.content.text_at(offset, length)
    }

    pub fn char_at(&self, offset: usize) -> Result<char> {
        self.core.content.char_at(offset)
    }

    /// The whole text.
    #[must_use]
    pub fn text(&self) -> String {
        self.core.content.to_string()
    }

    /// Length in chars.
    #[must_use]
    pub fn text_length(&self) -> usize {
        self.core.content.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.core.content.is_empty()
    }

    /// Bumped on every content change, including undo and redo.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.core.content.revision()
    }

    /// Current root. Holding it keeps a snapshot of the structure.
    #[must_use]
    pub fn root(&self) -> Rc<TextNode> {
        Rc::clone(&self.core.root)
    }

    /// Live positions of this document.
    ///
    /// The registry can be queried but not shifted from outside; only edits
    /// to the text move positions.
    ///
    /// ```compile_fail
    /// let doc = textdoc::Document::with_text("ab\ncd");
    /// doc.positions().insert_at(0, 5);
    /// ```
    #[must_use]
    pub fn positions(&self) -> &PositionRegistry {
        &self.core.positions
    }

    #[must_use]
    pub fn paragraph_count(&self) -> usize {
        self.core.root.child_count()
    }

    /// Character range of paragraph `index`, including its line break.
    #[must_use]
    pub fn paragraph_range(&self, index: usize) -> Option<Range<usize>> {
        self.core
            .root
            .child(index)
            .map(|node| node.offset()..node.end_offset())
    }

    /// Index of the paragraph containing `offset`.
    #[must_use]
    pub fn paragraph_index(&self, offset: usize) -> usize {
        self.core.root.element_index(offset)
    }

    #[must_use]
    pub fn next_word_start(&self, offset: usize) -> usize {
        breaks::next_word_start(&self.core.content, offset)
    }

    #[must_use]
    pub fn previous_word_start(&self, offset: usize) -> usize {
        breaks::previous_word_start(&self.core.content, offset)
    }

    /// Append a filter. Filters see requests in the order they were pushed.
    pub fn push_filter(&mut self, filter: Box<dyn DocumentFilter>) {
        self.filters.push(filter);
    }

    /// Remove the most recently pushed filter.
    pub fn pop_filter(&mut self) -> Result<Box<dyn DocumentFilter>> {
        self.filters.pop()
    }

    #[must_use]
    pub fn filters(&self) -> &FilterStack {
        &self.filters
    }

    /// Register a listener for content and structure changes.
    pub fn on_modified(&mut self, listener: impl FnMut(&DocumentModified) + 'static) {
        self.core.modified_listeners.push(Box::new(listener));
    }

    /// Register a listener for new undoable edits.
    pub fn on_undoable_edit(&mut self, listener: impl FnMut(&Rc<UndoableEdit>, bool) + 'static) {
        self.core.edit_listeners.push(Box::new(listener));
    }

    /// Feed every new undoable edit into `manager`.
    pub fn track_undo(&mut self, manager: &Rc<RefCell<UndoManager>>) {
        let manager = Rc::clone(manager);
        self.on_undoable_edit(move |edit, _| match manager.try_borrow_mut() {
            Ok(mut manager) => manager.add_edit(Rc::clone(edit)),
            Err(_) => emit_log_with(LogLevel::Warn, || {
                "undo manager busy, edit not recorded".to_string()
            }),
        });
    }

    pub(crate) fn core_mut(&mut self) -> &mut DocumentCore {
        &mut self.core
    }
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("len", &self.text_length())
            .field("root", &self.core.root)
            .field("filters", &self.filters)
            .finish_non_exhaustive()
    }
}
