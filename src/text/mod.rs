//! Editable text document model.
//!
//! Components, leaf first:
//!
//! - [`ContentBuffer`]: rope-backed character store addressed by char offset
//! - [`breaks`]: line and word break classification with [`BreakIterator`]
//! - [`PositionRegistry`]: live [`TextPosition`]s that follow edits
//! - [`TextNode`]: persistent paragraph tree sharing untouched children
//! - [`DocumentFilter`]: interceptors that rewrite or drop mutations
//! - [`UndoableEdit`]: edit records, replayable through an [`UndoManager`]
//!
//! [`Document`] owns one of each and sequences every mutation.
//!
//! # Examples
//!
//! ```
//! use std::rc::Rc;
//! use textdoc::Document;
//!
//! let mut doc = Document::new();
//! doc.insert_at(0, "first\nsecond").unwrap();
//! let before = doc.root();
//!
//! // Typing inside the second paragraph leaves the structure untouched.
//! doc.insert_at(12, "!").unwrap();
//! assert!(Rc::ptr_eq(&before, &doc.root()));
//!
//! // A line break splits the paragraph and shares the first one.
//! doc.insert_at(9, "\n").unwrap();
//! let after = doc.root();
//! assert_eq!(after.child_count(), 3);
//! assert!(Rc::ptr_eq(&before[0], &after[0]));
//! ```

pub mod breaks;
mod content;
mod document;
mod edit;
mod filter;
mod node;
mod position;

pub use breaks::{BreakIterator, LineBreak, WordBreak, classify_line_break, classify_word_break};
pub use content::ContentBuffer;
pub use document::{Document, DocumentModified, DocumentOptions, ModificationType};
pub use edit::{CompoundEdit, ContentChange, ContentEdit, ElementEdit, UndoManager, UndoableEdit};
pub use filter::{
    CharFilter, DocumentFilter, FilterBypass, FilterStack, LineBreakFilter, MaxLengthFilter,
    NfcFilter,
};
pub use node::{Branch, Leaf, TextNode};
pub use position::{Bias, PositionId, PositionRegistry, RecordedPosition, TextPosition};
