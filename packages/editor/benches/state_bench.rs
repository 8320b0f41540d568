use criterion::{black_box, criterion_group, criterion_main, Criterion};
use folio_editor::{derive_state, insert_menu, EditorContext};
use folio_model::{Document, ListKind, Mark, Node, Point, Selection};

fn sample_document(sections: usize) -> Document {
    let mut children = Vec::new();
    for i in 0..sections {
        children.push(Node::heading(2, vec![Node::text(format!("Section {}", i))]));
        children.push(Node::paragraph(vec![
            Node::text("Some "),
            Node::marked_text("bold", [Mark::Bold]),
            Node::text(" and "),
            Node::marked_text("italic", [Mark::Italic]),
            Node::text(" text."),
        ]));
        children.push(Node::list(
            ListKind::Unordered,
            vec![
                Node::list_item(vec![Node::paragraph(vec![Node::text("first")])]),
                Node::list_item(vec![Node::paragraph(vec![Node::text("second")])]),
            ],
        ));
    }
    Document::new(children)
}

fn derive_collapsed(c: &mut Criterion) {
    let ctx = EditorContext::default();
    let doc = sample_document(50);
    let selection = Selection::collapsed(Point::new(vec![76, 1], 2));

    c.bench_function("derive_state_collapsed", |b| {
        b.iter(|| derive_state(black_box(&doc), Some(black_box(&selection)), &ctx))
    });
}

fn derive_whole_document(c: &mut Criterion) {
    let ctx = EditorContext::default();
    let doc = sample_document(50);
    let selection = Selection::new(Point::new(vec![0, 0], 0), Point::new(vec![149, 1, 0, 0], 6));

    c.bench_function("derive_state_whole_document", |b| {
        b.iter(|| derive_state(black_box(&doc), Some(black_box(&selection)), &ctx))
    });
}

fn rank_insert_menu(c: &mut Criterion) {
    let ctx = EditorContext::default();
    let doc = Document::new(vec![Node::paragraph(vec![Node::text("/he")])]);
    let selection = Selection::collapsed(Point::new(vec![0, 0], 3));
    let state = derive_state(&doc, Some(&selection), &ctx);

    c.bench_function("rank_insert_menu", |b| {
        b.iter(|| {
            let commands = insert_menu::available_commands(black_box(&state), &ctx);
            insert_menu::rank(commands, black_box("he"))
        })
    });
}

criterion_group!(benches, derive_collapsed, derive_whole_document, rank_insert_menu);
criterion_main!(benches);
