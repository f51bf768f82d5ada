//! Undo/redo tests: replay order, structure restoration and live positions.

use std::cell::RefCell;
use std::rc::Rc;

use textdoc::{Bias, CompoundEdit, Document, Error, ModificationType, UndoManager, UndoableEdit};

fn spans(doc: &Document) -> Vec<(usize, usize)> {
    doc.root()
        .children()
        .iter()
        .map(|node| (node.offset(), node.end_offset()))
        .collect()
}

fn tracked(text: &str) -> (Document, Rc<RefCell<UndoManager>>) {
    let mut doc = Document::with_text(text);
    let history = Rc::new(RefCell::new(UndoManager::new()));
    doc.track_undo(&history);
    (doc, history)
}

fn record_modifications(doc: &mut Document) -> Rc<RefCell<Vec<(ModificationType, usize, usize)>>> {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    doc.on_modified(move |e| sink.borrow_mut().push((e.kind, e.offset, e.length)));
    seen
}

#[test]
fn compound_undo_runs_in_reverse_and_redo_in_order() {
    let mut doc = Document::new();
    let edits = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&edits);
    doc.on_undoable_edit(move |edit, _| sink.borrow_mut().push(Rc::clone(edit)));

    doc.insert_at(0, "ab").unwrap();
    doc.insert_at(2, "cd").unwrap();
    doc.insert_at(4, "ef").unwrap();

    let mut group = CompoundEdit::new();
    for edit in edits.borrow().iter() {
        group.add(Rc::clone(edit));
    }
    let group = UndoableEdit::Compound(group);
    let seen = record_modifications(&mut doc);

    group.undo(&mut doc).unwrap();
    assert_eq!(doc.text(), "");
    assert_eq!(
        *seen.borrow(),
        vec![
            (ModificationType::Delete, 4, 2),
            (ModificationType::Delete, 2, 2),
            (ModificationType::Delete, 0, 2),
        ]
    );

    seen.borrow_mut().clear();
    group.redo(&mut doc).unwrap();
    assert_eq!(doc.text(), "abcdef");
    assert_eq!(
        *seen.borrow(),
        vec![
            (ModificationType::Insert, 0, 2),
            (ModificationType::Insert, 2, 2),
            (ModificationType::Insert, 4, 2),
        ]
    );
}

#[test]
fn out_of_sequence_calls_are_rejected() {
    let (mut doc, history) = tracked("");
    doc.insert_at(0, "x").unwrap();
    assert!(!history.borrow_mut().redo(&mut doc).unwrap());

    let mut doc2 = Document::new();
    let edits = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&edits);
    doc2.on_undoable_edit(move |edit, _| sink.borrow_mut().push(Rc::clone(edit)));
    doc2.insert_at(0, "abc").unwrap();
    let edit = Rc::clone(&edits.borrow()[0]);

    assert!(matches!(edit.redo(&mut doc2), Err(Error::InvalidOperation(_))));
    edit.undo(&mut doc2).unwrap();
    assert!(matches!(edit.undo(&mut doc2), Err(Error::InvalidOperation(_))));
    assert_eq!(doc2.text(), "");
}

#[test]
fn failed_compound_undo_leaves_group_applied() {
    let mut doc = Document::new();
    let edits = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&edits);
    doc.on_undoable_edit(move |edit, _| sink.borrow_mut().push(Rc::clone(edit)));
    doc.insert_at(0, "ab").unwrap();
    doc.insert_at(2, "cd").unwrap();
    let (first, second) = {
        let edits = edits.borrow();
        (Rc::clone(&edits[0]), Rc::clone(&edits[1]))
    };

    // Recorded out of order: undoing `first` succeeds, then `second` no
    // longer fits in the shortened text.
    let mut group = CompoundEdit::new();
    group.add(Rc::clone(&second));
    group.add(Rc::clone(&first));
    let group = UndoableEdit::Compound(group);

    assert!(matches!(group.undo(&mut doc), Err(Error::OutOfRange { .. })));
    assert_eq!(doc.text(), "abcd");
    assert!(group.is_done());
    assert!(first.is_done());
    assert!(second.is_done());

    // Both inner edits are still undoable in their real order.
    second.undo(&mut doc).unwrap();
    first.undo(&mut doc).unwrap();
    assert_eq!(doc.text(), "");
}

#[test]
fn structural_undo_restores_paragraph_identity() {
    let (mut doc, history) = tracked("first\nsecond\nthird");
    let original = doc.root();
    doc.delete_at(3, 8).unwrap();
    assert_eq!(doc.text(), "fird\nthird");
    assert_eq!(doc.paragraph_count(), 2);

    let seen = record_modifications(&mut doc);
    history.borrow_mut().undo(&mut doc).unwrap();
    assert_eq!(doc.text(), "first\nsecond\nthird");
    assert_eq!(spans(&doc), vec![(0, 6), (6, 13), (13, 18)]);
    // The removed paragraphs come back as the very same nodes.
    let restored = doc.root();
    for i in 0..3 {
        assert!(Rc::ptr_eq(&original[i], &restored[i]));
    }
    // Structure is restored before the text comes back.
    let seen = seen.borrow();
    assert_eq!(seen[0].0, ModificationType::Change);
    assert_eq!(seen[1], (ModificationType::Insert, 3, 8));
}

#[test]
fn positions_return_after_undo_of_delete() {
    let (mut doc, history) = tracked("0123456789");
    let caret = doc.create_position(6, Bias::Forward).unwrap();
    let anchor = doc.create_position(3, Bias::Backward).unwrap();
    doc.delete_at(2, 6).unwrap();
    assert_eq!(caret.offset(), 2);
    assert_eq!(anchor.offset(), 2);

    history.borrow_mut().undo(&mut doc).unwrap();
    assert_eq!(caret.offset(), 6);
    assert_eq!(anchor.offset(), 3);

    history.borrow_mut().redo(&mut doc).unwrap();
    assert_eq!(caret.offset(), 2);
    assert_eq!(doc.text(), "0189");
}

#[test]
fn undo_of_split_then_redo() {
    let (mut doc, history) = tracked("Hello World");
    doc.insert_at(5, "\n").unwrap();
    let split = spans(&doc);

    history.borrow_mut().undo(&mut doc).unwrap();
    assert_eq!(spans(&doc), vec![(0, 11)]);
    history.borrow_mut().redo(&mut doc).unwrap();
    assert_eq!(spans(&doc), split);
    assert_eq!(split, vec![(0, 6), (6, 12)]);
}

#[test]
fn grouped_typing_and_indent_undo_together() {
    let (mut doc, history) = tracked("fn main() {}");
    history.borrow_mut().begin_group();
    doc.insert_at(11, "\n").unwrap();
    doc.insert_at(12, "    ").unwrap();
    doc.insert_at(16, "\n").unwrap();
    history.borrow_mut().end_group();
    assert_eq!(doc.text(), "fn main() {\n    \n}");
    assert_eq!(doc.paragraph_count(), 3);

    let mut history = history.borrow_mut();
    assert!(history.undo(&mut doc).unwrap());
    assert_eq!(doc.text(), "fn main() {}");
    assert_eq!(doc.paragraph_count(), 1);
    assert!(!history.can_undo());

    assert!(history.redo(&mut doc).unwrap());
    assert_eq!(doc.text(), "fn main() {\n    \n}");
    assert_eq!(doc.paragraph_count(), 3);
}

#[test]
fn clear_drops_history() {
    let (mut doc, history) = tracked("");
    doc.insert_at(0, "a").unwrap();
    doc.insert_at(1, "b").unwrap();
    history.borrow_mut().undo(&mut doc).unwrap();
    history.borrow_mut().clear();
    assert!(!history.borrow().can_undo());
    assert!(!history.borrow().can_redo());
    assert_eq!(doc.text(), "a");
}

#[test]
fn undo_does_not_create_new_edits() {
    let (mut doc, history) = tracked("");
    let count = Rc::new(RefCell::new(0));
    let sink = Rc::clone(&count);
    doc.on_undoable_edit(move |_, _| *sink.borrow_mut() += 1);
    doc.insert_at(0, "abc\ndef").unwrap();
    history.borrow_mut().undo(&mut doc).unwrap();
    history.borrow_mut().redo(&mut doc).unwrap();
    assert_eq!(*count.borrow(), 1);
}
