//! Fuzz target for document edit sequences.
//!
//! Drives arbitrary inserts, deletes, replaces and undo/redo through a
//! document and checks that the paragraph tree stays contiguous and covers
//! the whole text.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use std::cell::RefCell;
use std::rc::Rc;
use textdoc::{Bias, Document, LineBreakFilter, MaxLengthFilter, UndoManager};

#[derive(Arbitrary, Debug)]
enum Op {
    Insert { at: u16, text: String },
    InsertChar { at: u16, ch: char },
    Delete { at: u16, len: u8 },
    Replace { at: u16, len: u8, text: String },
    Position { at: u16, forward: bool },
    Undo,
    Redo,
    PushMaxLength(u16),
    PushSingleLine,
    PopFilter,
}

#[derive(Arbitrary, Debug)]
struct Input {
    initial: String,
    ops: Vec<Op>,
}

fn check(doc: &Document) {
    let root = doc.root();
    assert!(root.child_count() >= 1);
    assert_eq!(root.offset(), 0);
    assert_eq!(root.end_offset(), doc.text_length());
    for pair in root.children().windows(2) {
        assert_eq!(pair[0].end_offset(), pair[1].offset());
    }
}

fuzz_target!(|input: Input| {
    let mut doc = Document::with_text(&input.initial);
    let history = Rc::new(RefCell::new(UndoManager::with_max_depth(64)));
    doc.track_undo(&history);
    let mut positions = Vec::new();

    for op in input.ops.iter().take(256) {
        let len = doc.text_length();
        let clamp = |at: u16| usize::from(at) % (len + 1);
        match op {
            Op::Insert { at, text } => doc.insert_at(clamp(*at), text).unwrap(),
            Op::InsertChar { at, ch } => doc.insert_char_at(clamp(*at), *ch).unwrap(),
            Op::Delete { at, len: n } => {
                let at = clamp(*at);
                doc.delete_at(at, usize::from(*n).min(len - at)).unwrap();
            }
            Op::Replace { at, len: n, text } => {
                let at = clamp(*at);
                doc.replace_at(at, usize::from(*n).min(len - at), text).unwrap();
            }
            Op::Position { at, forward } => {
                let bias = if *forward { Bias::Forward } else { Bias::Backward };
                let position = doc.create_position(clamp(*at), bias).unwrap();
                positions.push(position);
            }
            Op::Undo => {
                let _ = history.borrow_mut().undo(&mut doc).unwrap();
            }
            Op::Redo => {
                let _ = history.borrow_mut().redo(&mut doc).unwrap();
            }
            Op::PushMaxLength(max) => {
                doc.push_filter(Box::new(MaxLengthFilter::new(usize::from(*max))));
            }
            Op::PushSingleLine => doc.push_filter(Box::new(LineBreakFilter)),
            Op::PopFilter => {
                let _ = doc.pop_filter();
            }
        }
        check(&doc);
        for position in &positions {
            assert!(position.offset() <= doc.text_length());
        }
    }
});
