//! Rope-backed character store.

use crate::error::{Error, Result};
use ropey::Rope;
use std::ops::Range;

/// Linear character store addressed by char offset.
///
/// `ContentBuffer` is the ground truth for the document's characters. It
/// knows nothing about positions or paragraphs: the owning
/// [`Document`](super::Document) sequences position shifts and tree updates
/// around each mutation. Every mutation widens a dirty range that the
/// document drains to decide which characters need their line-break
/// classification recomputed.
#[derive(Clone, Debug, Default)]
pub struct ContentBuffer {
    rope: Rope,
    dirty: Option<Range<usize>>,
    revision: u64,
}

impl ContentBuffer {
    /// Create an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rope: Rope::new(),
            dirty: None,
            revision: 0,
        }
    }

    /// Create a buffer holding `text`.
    #[must_use]
    pub fn from_str(text: &str) -> Self {
        Self {
            rope: Rope::from_str(text),
            dirty: None,
            revision: 0,
        }
    }

    /// Number of characters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rope.len_chars()
    }

    /// Check if empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rope.len_chars() == 0
    }

    /// Revision counter, bumped on every successful mutation.
    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Insert `text` at a char offset.
    pub fn insert_at(&mut self, offset: usize, text: &str) -> Result<()> {
        self.check_range(offset, 0)?;
        if text.is_empty() {
            return Ok(());
        }
        let added = text.chars().count();
        self.rope.insert(offset, text);
        self.mark_inserted(offset, added);
        self.bump_revision();
        Ok(())
    }

    /// Remove `length` chars starting at `offset`, returning the removed text.
    pub fn delete_at(&mut self, offset: usize, length: usize) -> Result<String> {
        self.check_range(offset, length)?;
        if length == 0 {
            return Ok(String::new());
        }
        let removed = self.rope.slice(offset..offset + length).to_string();
        self.rope.remove(offset..offset + length);
        self.mark_removed(offset, length);
        self.bump_revision();
        Ok(removed)
    }

    /// Copy out `length` chars starting at `offset`.
    pub fn text_at(&self, offset: usize, length: usize) -> Result<String> {
        self.check_range(offset, length)?;
        Ok(self.rope.slice(offset..offset + length).to_string())
    }

    /// The character at `offset`. Fails at `offset == len`.
    pub fn char_at(&self, offset: usize) -> Result<char> {
        self.rope
            .get_char(offset)
            .ok_or_else(|| Error::out_of_range(offset, 1, self.len()))
    }

    /// The character at `offset`, or `'\0'` outside the buffer.
    ///
    /// `'\0'` is the break classifier's "no character" sentinel.
    #[must_use]
    pub fn char_or_nul(&self, offset: usize) -> char {
        self.rope.get_char(offset).unwrap_or('\0')
    }

    /// Iterate chars starting at `offset` (clamped to the buffer end).
    pub fn chars_at(&self, offset: usize) -> ropey::iter::Chars<'_> {
        self.rope.chars_at(offset.min(self.len()))
    }

    /// Take the range of characters touched since the last call.
    ///
    /// The range is in post-mutation offsets. A pure removal yields an empty
    /// range at the removal point.
    pub fn take_dirty(&mut self) -> Option<Range<usize>> {
        self.dirty.take()
    }

    /// Validate that `offset..offset + length` lies within `[0, len]`.
    pub fn check_range(&self, offset: usize, length: usize) -> Result<()> {
        let len = self.len();
        match offset.checked_add(length) {
            Some(end) if end <= len => Ok(()),
            _ => Err(Error::out_of_range(offset, length, len)),
        }
    }

    /// Convert to string.
    #[must_use]
    pub fn to_string(&self) -> String {
        self.rope.to_string()
    }

    fn mark_inserted(&mut self, offset: usize, added: usize) {
        let dirty = match self.dirty.take() {
            None => offset..offset + added,
            Some(prev) => {
                let shift = |p: usize| if p >= offset { p + added } else { p };
                shift(prev.start).min(offset)..shift(prev.end).max(offset + added)
            }
        };
        self.dirty = Some(dirty);
    }

    fn mark_removed(&mut self, offset: usize, removed: usize) {
        let end = offset + removed;
        let dirty = match self.dirty.take() {
            None => offset..offset,
            Some(prev) => {
                let shift = |p: usize| {
                    if p >= end {
                        p - removed
                    } else {
                        p.min(offset)
                    }
                };
                shift(prev.start).min(offset)..shift(prev.end).max(offset)
            }
        };
        self.dirty = Some(dirty);
    }

    fn bump_revision(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }
}

impl From<&str> for ContentBuffer {
    fn from(s: &str) -> Self {
        Self::from_str(s)
    }
}
