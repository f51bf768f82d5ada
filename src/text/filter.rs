//! Document filters: interceptors for every mutation request.
//!
//! Filters form a chain in registration order. Each filter receives a
//! [`FilterBypass`] that forwards to the next filter, or to the raw mutation
//! once the chain is exhausted. A filter may pass a request through, rewrite
//! its text, split it into several requests, or drop it by returning
//! without calling the bypass.
//!
//! # Examples
//!
//! ```
//! use textdoc::{Document, MaxLengthFilter};
//!
//! let mut doc = Document::new();
//! doc.push_filter(Box::new(MaxLengthFilter::new(5)));
//! doc.insert_at(0, "abcdefgh").unwrap();
//! assert_eq!(doc.text(), "abcde");
//! ```

use crate::error::{Error, Result};
use crate::event::{LogLevel, emit_log_with};
use crate::text::breaks::is_line_break_char;
use crate::text::document::DocumentCore;
use std::fmt;
use unicode_normalization::UnicodeNormalization;
use unicode_segmentation::UnicodeSegmentation;

/// Interceptor for document mutations.
///
/// Every method defaults to forwarding the request unchanged.
pub trait DocumentFilter {
    /// Name used in diagnostics.
    fn name(&self) -> &'static str {
        "filter"
    }

    fn insert_string(
        &self,
        bypass: &mut FilterBypass<'_>,
        offset: usize,
        text: &str,
    ) -> Result<()> {
        bypass.insert_string(offset, text)
    }

    fn insert_char(&self, bypass: &mut FilterBypass<'_>, offset: usize, ch: char) -> Result<()> {
        bypass.insert_char(offset, ch)
    }

    fn delete(&self, bypass: &mut FilterBypass<'_>, offset: usize, length: usize) -> Result<()> {
        bypass.delete(offset, length)
    }

    fn replace(
        &self,
        bypass: &mut FilterBypass<'_>,
        offset: usize,
        length: usize,
        text: &str,
    ) -> Result<()> {
        bypass.replace(offset, length, text)
    }
}

/// Handle a filter uses to continue a request down the chain.
pub struct FilterBypass<'a> {
    core: &'a mut DocumentCore,
    rest: &'a [Box<dyn DocumentFilter>],
}

impl<'a> FilterBypass<'a> {
    pub(crate) fn new(core: &'a mut DocumentCore, rest: &'a [Box<dyn DocumentFilter>]) -> Self {
        Self { core, rest }
    }

    /// Current document length in chars.
    #[must_use]
    pub fn text_length(&self) -> usize {
        self.core.content().len()
    }

    /// Current document text in `offset..offset + length`.
    pub fn text_at(&self, offset: usize, length: usize) -> Result<String> {
        self.core.content().text_at(offset, length)
    }

    pub fn insert_string(&mut self, offset: usize, text: &str) -> Result<()> {
        match self.rest.split_first() {
            Some((next, rest)) => {
                let mut bypass = FilterBypass::new(self.core, rest);
                next.insert_string(&mut bypass, offset, text)
            }
            None => self.core.insert(offset, text),
        }
    }

    pub fn insert_char(&mut self, offset: usize, ch: char) -> Result<()> {
        match self.rest.split_first() {
            Some((next, rest)) => {
                let mut bypass = FilterBypass::new(self.core, rest);
                next.insert_char(&mut bypass, offset, ch)
            }
            None => self.core.insert(offset, ch.encode_utf8(&mut [0; 4])),
        }
    }

    pub fn delete(&mut self, offset: usize, length: usize) -> Result<()> {
        match self.rest.split_first() {
            Some((next, rest)) => {
                let mut bypass = FilterBypass::new(self.core, rest);
                next.delete(&mut bypass, offset, length)
            }
            None => self.core.remove(offset, length),
        }
    }

    pub fn replace(&mut self, offset: usize, length: usize, text: &str) -> Result<()> {
        match self.rest.split_first() {
            Some((next, rest)) => {
                let mut bypass = FilterBypass::new(self.core, rest);
                next.replace(&mut bypass, offset, length, text)
            }
            None => self.core.replace(offset, length, text),
        }
    }
}

impl fmt::Debug for FilterBypass<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterBypass")
            .field("remaining", &self.rest.len())
            .finish_non_exhaustive()
    }
}

/// Ordered filter chain. The first pushed filter sees requests first.
#[derive(Default)]
pub struct FilterStack {
    filters: Vec<Box<dyn DocumentFilter>>,
}

impl FilterStack {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a filter to the end of the chain.
    pub fn push(&mut self, filter: Box<dyn DocumentFilter>) {
        self.filters.push(filter);
    }

    /// Remove the most recently pushed filter.
    pub fn pop(&mut self) -> Result<Box<dyn DocumentFilter>> {
        self.filters
            .pop()
            .ok_or(Error::InvalidOperation("filter stack is empty"))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    pub fn clear(&mut self) {
        self.filters.clear();
    }

    pub(crate) fn as_slice(&self) -> &[Box<dyn DocumentFilter>] {
        &self.filters
    }
}

impl fmt::Debug for FilterStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.filters.iter().map(|filter| filter.name()))
            .finish()
    }
}

fn log_veto(filter: &'static str, offset: usize, requested: usize) {
    emit_log_with(LogLevel::Debug, || {
        format!("{filter} dropped {requested} chars at {offset}")
    });
}

/// Filter that keeps or drops inserted characters by predicate.
pub struct CharFilter {
    name: &'static str,
    keep: Box<dyn Fn(char) -> bool>,
}

impl CharFilter {
    /// Keep only characters matching `predicate`.
    pub fn allow(predicate: impl Fn(char) -> bool + 'static) -> Self {
        Self {
            name: "char_allow",
            keep: Box::new(predicate),
        }
    }

    /// Drop characters matching `predicate`.
    pub fn deny(predicate: impl Fn(char) -> bool + 'static) -> Self {
        Self {
            name: "char_deny",
            keep: Box::new(move |ch| !predicate(ch)),
        }
    }

    /// Drop control characters other than tab and line breaks.
    #[must_use]
    pub fn strip_control() -> Self {
        Self {
            name: "strip_control",
            keep: Box::new(|ch| !ch.is_control() || ch == '\t' || is_line_break_char(ch)),
        }
    }

    fn filter(&self, text: &str) -> String {
        text.chars().filter(|&ch| (self.keep)(ch)).collect()
    }
}

impl DocumentFilter for CharFilter {
    fn name(&self) -> &'static str {
        self.name
    }

    fn insert_string(
        &self,
        bypass: &mut FilterBypass<'_>,
        offset: usize,
        text: &str,
    ) -> Result<()> {
        let kept = self.filter(text);
        if kept.is_empty() {
            log_veto(self.name, offset, text.chars().count());
            return Ok(());
        }
        bypass.insert_string(offset, &kept)
    }

    fn insert_char(&self, bypass: &mut FilterBypass<'_>, offset: usize, ch: char) -> Result<()> {
        if (self.keep)(ch) {
            bypass.insert_char(offset, ch)
        } else {
            log_veto(self.name, offset, 1);
            Ok(())
        }
    }

    fn replace(
        &self,
        bypass: &mut FilterBypass<'_>,
        offset: usize,
        length: usize,
        text: &str,
    ) -> Result<()> {
        bypass.replace(offset, length, &self.filter(text))
    }
}

impl fmt::Debug for CharFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CharFilter")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Filter that caps the document length.
///
/// [`new`](Self::new) truncates insertions on a grapheme boundary, so a
/// cluster such as `e` + combining accent or CR LF is never split; the kept
/// text may then be shorter than the remaining capacity.
/// [`chars`](Self::chars) truncates to exactly the remaining capacity in
/// chars. Either way an insertion with no room left is dropped.
#[derive(Clone, Copy, Debug)]
pub struct MaxLengthFilter {
    max_length: usize,
    whole_graphemes: bool,
}

impl MaxLengthFilter {
    /// Cap at `max_length` chars, cutting only between grapheme clusters.
    #[must_use]
    pub fn new(max_length: usize) -> Self {
        Self {
            max_length,
            whole_graphemes: true,
        }
    }

    /// Cap at `max_length` chars, cutting at any char.
    #[must_use]
    pub fn chars(max_length: usize) -> Self {
        Self {
            max_length,
            whole_graphemes: false,
        }
    }

    #[must_use]
    pub fn max_length(&self) -> usize {
        self.max_length
    }

    fn truncate<'t>(&self, text: &'t str, capacity: usize) -> &'t str {
        if !self.whole_graphemes {
            let bytes = text
                .char_indices()
                .nth(capacity)
                .map_or(text.len(), |(at, _)| at);
            return &text[..bytes];
        }
        let mut chars = 0;
        let mut bytes = 0;
        for grapheme in text.graphemes(true) {
            let width = grapheme.chars().count();
            if chars + width > capacity {
                break;
            }
            chars += width;
            bytes += grapheme.len();
        }
        &text[..bytes]
    }
}

impl DocumentFilter for MaxLengthFilter {
    fn name(&self) -> &'static str {
        "max_length"
    }

    fn insert_string(
        &self,
        bypass: &mut FilterBypass<'_>,
        offset: usize,
        text: &str,
    ) -> Result<()> {
        let capacity = self.max_length.saturating_sub(bypass.text_length());
        let kept = self.truncate(text, capacity);
        if kept.is_empty() {
            log_veto(self.name(), offset, text.chars().count());
            return Ok(());
        }
        bypass.insert_string(offset, kept)
    }

    fn insert_char(&self, bypass: &mut FilterBypass<'_>, offset: usize, ch: char) -> Result<()> {
        if bypass.text_length() >= self.max_length {
            log_veto(self.name(), offset, 1);
            return Ok(());
        }
        bypass.insert_char(offset, ch)
    }

    fn replace(
        &self,
        bypass: &mut FilterBypass<'_>,
        offset: usize,
        length: usize,
        text: &str,
    ) -> Result<()> {
        let remaining = bypass.text_length().saturating_sub(length);
        let capacity = self.max_length.saturating_sub(remaining);
        bypass.replace(offset, length, self.truncate(text, capacity))
    }
}

/// Filter that keeps the document on a single line by dropping line breaks.
#[derive(Clone, Copy, Debug, Default)]
pub struct LineBreakFilter;

impl LineBreakFilter {
    fn strip(text: &str) -> String {
        text.chars().filter(|&ch| !is_line_break_char(ch)).collect()
    }
}

impl DocumentFilter for LineBreakFilter {
    fn name(&self) -> &'static str {
        "single_line"
    }

    fn insert_string(
        &self,
        bypass: &mut FilterBypass<'_>,
        offset: usize,
        text: &str,
    ) -> Result<()> {
        let kept = Self::strip(text);
        if kept.is_empty() {
            log_veto(self.name(), offset, text.chars().count());
            return Ok(());
        }
        bypass.insert_string(offset, &kept)
    }

    fn insert_char(&self, bypass: &mut FilterBypass<'_>, offset: usize, ch: char) -> Result<()> {
        if is_line_break_char(ch) {
            log_veto(self.name(), offset, 1);
            return Ok(());
        }
        bypass.insert_char(offset, ch)
    }

    fn replace(
        &self,
        bypass: &mut FilterBypass<'_>,
        offset: usize,
        length: usize,
        text: &str,
    ) -> Result<()> {
        bypass.replace(offset, length, &Self::strip(text))
    }
}

/// Filter that normalizes inserted text to NFC.
#[derive(Clone, Copy, Debug, Default)]
pub struct NfcFilter;

impl DocumentFilter for NfcFilter {
    fn name(&self) -> &'static str {
        "nfc"
    }

    fn insert_string(
        &self,
        bypass: &mut FilterBypass<'_>,
        offset: usize,
        text: &str,
    ) -> Result<()> {
        let normalized: String = text.nfc().collect();
        bypass.insert_string(offset, &normalized)
    }

    fn insert_char(&self, bypass: &mut FilterBypass<'_>, offset: usize, ch: char) -> Result<()> {
        let mut normalized = std::iter::once(ch).nfc();
        match (normalized.next(), normalized.next()) {
            (Some(single), None) => bypass.insert_char(offset, single),
            _ => bypass.insert_string(offset, &std::iter::once(ch).nfc().collect::<String>()),
        }
    }

    fn replace(
        &self,
        bypass: &mut FilterBypass<'_>,
        offset: usize,
        length: usize,
        text: &str,
    ) -> Result<()> {
        let normalized: String = text.nfc().collect();
        bypass.replace(offset, length, &normalized)
    }
}
