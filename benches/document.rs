//! Document editing performance benchmarks.

#![allow(clippy::semicolon_if_nothing_returned)]

use criterion::{BatchSize, Criterion, criterion_group, criterion_main};
use std::cell::RefCell;
use std::hint::black_box;
use std::rc::Rc;
use textdoc::{Bias, Document, MaxLengthFilter, UndoManager};

fn sample_text(lines: usize) -> String {
    (0..lines)
        .map(|i| format!("Line number {i} with some content\n"))
        .collect()
}

fn document_creation(c: &mut Criterion) {
    c.bench_function("document_new", |b| {
        b.iter(|| Document::new());
    });

    let text = sample_text(1_000);
    c.bench_function("document_with_text_1k_lines", |b| {
        b.iter(|| Document::with_text(black_box(&text)));
    });
}

fn document_typing(c: &mut Criterion) {
    c.bench_function("document_insert_char", |b| {
        let mut doc = Document::with_text(&sample_text(100));
        b.iter(|| {
            let at = doc.text_length() / 2;
            doc.insert_char_at(black_box(at), 'x').unwrap();
        });
    });

    c.bench_function("document_insert_char_filtered", |b| {
        let mut doc = Document::with_text(&sample_text(100));
        doc.push_filter(Box::new(MaxLengthFilter::new(usize::MAX)));
        b.iter(|| {
            let at = doc.text_length() / 2;
            doc.insert_char_at(black_box(at), 'x').unwrap();
        });
    });

    c.bench_function("document_insert_with_positions", |b| {
        let mut doc = Document::with_text(&sample_text(100));
        let len = doc.text_length();
        let _carets: Vec<_> = (0..len)
            .step_by(7)
            .map(|offset| doc.create_position(offset, Bias::Forward).unwrap())
            .collect();
        b.iter(|| {
            doc.insert_at(black_box(10), "x").unwrap();
        });
    });
}

fn document_structure(c: &mut Criterion) {
    c.bench_function("document_split_paragraph", |b| {
        b.iter_batched(
            || Document::with_text(&sample_text(1_000)),
            |mut doc| {
                doc.insert_at(black_box(15_000), "\n").unwrap();
                doc
            },
            BatchSize::SmallInput,
        );
    });

    c.bench_function("document_delete_half", |b| {
        b.iter_batched(
            || Document::with_text(&sample_text(1_000)),
            |mut doc| {
                let len = doc.text_length();
                doc.delete_at(black_box(len / 4), len / 2).unwrap();
                doc
            },
            BatchSize::SmallInput,
        );
    });
}

fn document_undo_redo(c: &mut Criterion) {
    c.bench_function("document_undo_redo_cycle", |b| {
        let mut doc = Document::with_text(&sample_text(100));
        let history = Rc::new(RefCell::new(UndoManager::new()));
        doc.track_undo(&history);
        doc.insert_at(40, "Hello\nWorld").unwrap();
        b.iter(|| {
            let mut history = history.borrow_mut();
            history.undo(&mut doc).unwrap();
            history.redo(&mut doc).unwrap();
        });
    });
}

criterion_group!(
    benches,
    document_creation,
    document_typing,
    document_structure,
    document_undo_redo
);
criterion_main!(benches);
