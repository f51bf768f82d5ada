//! Error types for the document model.

use std::fmt;

/// Result type alias for document operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for document operations.
///
/// Filter vetoes are not errors: a filter that drops or truncates an insert
/// leaves the call successful, and callers observe the applied text through
/// [`Document::text_length`](crate::Document::text_length).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Offset or range outside `[0, len]`.
    OutOfRange {
        offset: usize,
        length: usize,
        len: usize,
    },
    /// Operation not valid in the current state (empty filter stack,
    /// undo/redo out of sequence).
    InvalidOperation(&'static str),
    /// The node tree would violate one of its invariants. Indicates a bug in
    /// the caller of [`TextNode::replace`](crate::TextNode::replace) or in
    /// the document algorithms, never bad user input.
    StructuralInvariant(String),
}

impl Error {
    pub(crate) fn out_of_range(offset: usize, length: usize, len: usize) -> Self {
        Self::OutOfRange {
            offset,
            length,
            len,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfRange {
                offset,
                length,
                len,
            } => {
                write!(
                    f,
                    "range {offset}..{} out of bounds for text of length {len}",
                    offset.saturating_add(*length)
                )
            }
            Self::InvalidOperation(what) => write!(f, "invalid operation: {what}"),
            Self::StructuralInvariant(what) => write!(f, "structural invariant violated: {what}"),
        }
    }
}

impl std::error::Error for Error {}
