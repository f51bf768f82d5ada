//! Filter chain tests: requested text versus applied text.
//!
//! Vetoes and truncation are normal outcomes, so every test compares what
//! was asked for with what the document ended up holding.

use std::cell::RefCell;
use std::rc::Rc;

use textdoc::{
    CharFilter, Document, DocumentFilter, DocumentOptions, Error, FilterBypass, LineBreakFilter,
    MaxLengthFilter, NfcFilter, Result, UndoManager,
};

/// Drops every delete request.
struct ReadOnly;

impl DocumentFilter for ReadOnly {
    fn name(&self) -> &'static str {
        "read_only"
    }

    fn delete(&self, _bypass: &mut FilterBypass<'_>, _offset: usize, _length: usize) -> Result<()> {
        Ok(())
    }
}

/// Expands a tab into four spaces by issuing a different request.
struct ExpandTabs;

impl DocumentFilter for ExpandTabs {
    fn insert_char(&self, bypass: &mut FilterBypass<'_>, offset: usize, ch: char) -> Result<()> {
        if ch == '\t' {
            bypass.insert_string(offset, "    ")
        } else {
            bypass.insert_char(offset, ch)
        }
    }
}

/// Counts calls that reach it.
struct Probe(Rc<RefCell<usize>>);

impl DocumentFilter for Probe {
    fn insert_string(
        &self,
        bypass: &mut FilterBypass<'_>,
        offset: usize,
        text: &str,
    ) -> Result<()> {
        *self.0.borrow_mut() += 1;
        bypass.insert_string(offset, text)
    }
}

#[test]
fn veto_is_not_an_error() {
    let mut doc = Document::with_text("keep me");
    doc.push_filter(Box::new(ReadOnly));
    let requested = 4;
    doc.delete_at(0, requested).unwrap();
    assert_eq!(doc.text(), "keep me");
    assert_eq!(doc.text_length(), 7);
}

#[test]
fn vetoed_request_produces_no_edit() {
    let mut doc = Document::with_text("abc");
    let history = Rc::new(RefCell::new(UndoManager::new()));
    doc.track_undo(&history);
    doc.push_filter(Box::new(LineBreakFilter));
    doc.insert_at(1, "\n\r\n").unwrap();
    assert_eq!(doc.text(), "abc");
    assert!(!history.borrow().can_undo());
}

#[test]
fn earlier_filter_can_stop_later_ones() {
    let count = Rc::new(RefCell::new(0));
    let mut doc = Document::new();
    doc.push_filter(Box::new(CharFilter::allow(|ch| ch.is_ascii_alphabetic())));
    doc.push_filter(Box::new(Probe(Rc::clone(&count))));

    doc.insert_at(0, "123").unwrap();
    assert_eq!(*count.borrow(), 0);
    doc.insert_at(0, "a1b").unwrap();
    assert_eq!(*count.borrow(), 1);
    assert_eq!(doc.text(), "ab");
}

#[test]
fn filter_may_rewrite_request_kind() {
    let mut doc = Document::new();
    doc.push_filter(Box::new(ExpandTabs));
    doc.insert_char_at(0, '\t').unwrap();
    doc.insert_char_at(4, 'x').unwrap();
    assert_eq!(doc.text(), "    x");
}

#[test]
fn max_length_counts_text_after_earlier_filters() {
    let mut doc = Document::new();
    doc.push_filter(Box::new(CharFilter::deny(|ch| ch == '-')));
    doc.push_filter(Box::new(MaxLengthFilter::new(6)));
    let requested = "12-34-56-78";
    doc.insert_at(0, requested).unwrap();
    assert_eq!(doc.text(), "123456");
    assert!(doc.text_length() < requested.chars().count());
}

#[test]
fn max_length_drops_char_at_capacity() {
    let mut doc = Document::with_text("abc");
    doc.push_filter(Box::new(MaxLengthFilter::new(3)));
    doc.insert_char_at(1, 'x').unwrap();
    assert_eq!(doc.text(), "abc");
    doc.delete_at(0, 1).unwrap();
    doc.insert_char_at(0, 'x').unwrap();
    assert_eq!(doc.text(), "xbc");
}

#[test]
fn pop_is_lifo_and_fails_when_empty() {
    let mut doc = Document::new();
    doc.push_filter(Box::new(LineBreakFilter));
    doc.push_filter(Box::new(NfcFilter));
    assert_eq!(doc.pop_filter().unwrap().name(), "nfc");
    assert_eq!(doc.pop_filter().unwrap().name(), "single_line");
    assert!(matches!(doc.pop_filter(), Err(Error::InvalidOperation(_))));

    // With the filters gone, line breaks are accepted again.
    doc.insert_at(0, "a\nb").unwrap();
    assert_eq!(doc.paragraph_count(), 2);
}

#[test]
fn single_line_options() {
    let mut doc = Document::with_options(DocumentOptions {
        single_line: true,
        ..DocumentOptions::default()
    });
    doc.insert_at(0, "user\n@example.com").unwrap();
    doc.replace_at(4, 0, "\u{2028}name").unwrap();
    assert_eq!(doc.text(), "username@example.com");
    assert_eq!(doc.paragraph_count(), 1);
}

#[test]
fn range_is_checked_before_filters_run() {
    let count = Rc::new(RefCell::new(0));
    let mut doc = Document::with_text("abc");
    doc.push_filter(Box::new(Probe(Rc::clone(&count))));
    assert!(matches!(
        doc.insert_at(9, "x"),
        Err(Error::OutOfRange { offset: 9, .. })
    ));
    assert_eq!(*count.borrow(), 0);
}

#[test]
fn strip_control_keeps_layout_characters() {
    let mut doc = Document::with_options(DocumentOptions {
        strip_control: true,
        ..DocumentOptions::default()
    });
    doc.insert_at(0, "a\u{0}\tb\r\nc\u{7f}").unwrap();
    assert_eq!(doc.text(), "a\tb\r\nc");
    assert_eq!(doc.paragraph_count(), 2);
}
