//! `textdoc` - editable text document model
//!
//! A character buffer with a persistent paragraph tree, live positions that
//! follow edits, a pluggable filter chain and undoable edit records.

// Crate-level lint configuration
#![forbid(unsafe_code)]
#![allow(clippy::module_name_repetitions)] // Allow text::TextNode etc
#![allow(clippy::missing_errors_doc)] // Errors are the crate Error enum throughout
#![allow(clippy::missing_panics_doc)] // Docs WIP
#![allow(clippy::missing_const_for_fn)] // Many functions could be const, not critical
#![allow(clippy::doc_markdown)] // Allow technical names without backticks
#![allow(clippy::use_self)] // Allow explicit type names in impl blocks
#![allow(clippy::inherent_to_string)] // to_string methods are convenient
#![allow(clippy::should_implement_trait)] // from_str naming is intentional
#![allow(clippy::collapsible_if)] // Sometimes nested ifs are clearer
#![allow(clippy::items_after_statements)] // Common pattern in tests
#![allow(clippy::redundant_clone)] // Clones in tests for clarity are fine
#![allow(clippy::semicolon_if_nothing_returned)] // Style preference
#![allow(clippy::needless_collect)] // Collect for assertions is clear

pub mod error;
pub mod event;
pub mod text;

// Re-export core types at crate root
pub use error::{Error, Result};
pub use event::{
    LogLevel, clear_event_callback, clear_log_callback, emit_event, emit_log, set_event_callback,
    set_log_callback,
};
pub use text::{
    Bias, CharFilter, CompoundEdit, ContentBuffer, Document, DocumentFilter, DocumentModified,
    DocumentOptions, ElementEdit, FilterBypass, LineBreakFilter, MaxLengthFilter,
    ModificationType, NfcFilter, PositionId, PositionRegistry, TextNode, TextPosition,
    UndoManager, UndoableEdit,
};
