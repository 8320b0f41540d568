use super::{not_allowed, Anchor, Transaction, TransformError, TransformResult};
use crate::rules::in_code;
use folio_model::{byte_index, Node, NodeKind, Point};

/// Type `text` at a collapsed cursor. Pending marks that differ from the
/// run under the cursor start a new run.
pub(super) fn insert_text(tx: &mut Transaction<'_>, text: &str) -> TransformResult {
    if text.is_empty() {
        return Err(TransformError::NoChange);
    }
    let mut cursor = tx.cursor()?;

    if matches!(tx.node(&cursor.path)?.kind, NodeKind::Relationship { .. }) {
        // typing on an inline void continues in the run after it
        let next = cursor
            .path
            .next_sibling()
            .filter(|next| tx.doc.node(next).map_or(false, Node::is_text))
            .ok_or_else(|| not_allowed("no text run after the relationship"))?;
        cursor = Point::new(next, 0);
    }

    let leaf = tx.node(&cursor.path)?;
    if !leaf.is_text() {
        return Err(not_allowed("cannot type into a void node"));
    }
    let leaf_marks = leaf.marks().cloned().unwrap_or_default();
    let marks = match &tx.pending_marks {
        Some(pending) if !in_code(&tx.doc, &cursor.path) => pending.clone(),
        _ => leaf_marks.clone(),
    };
    let typed = text.chars().count();

    if marks == leaf_marks {
        let leaf = tx.node_mut(&cursor.path)?;
        let id = leaf.id;
        if let NodeKind::Text { text: content, .. } = &mut leaf.kind {
            let at = byte_index(content, cursor.offset);
            content.insert_str(at, text);
        }
        tx.select_anchor(Anchor::new(id, cursor.offset + typed));
        return Ok(());
    }

    let insert_at = match tx.split_text(&cursor.path, cursor.offset)? {
        Some(right) => right,
        None if cursor.offset == 0 => cursor.path.clone(),
        None => cursor
            .path
            .next_sibling()
            .ok_or_else(|| not_allowed("text run without a parent"))?,
    };
    let run = Node::marked_text(text, marks);
    let id = run.id;
    tx.doc.insert_node(&insert_at, run)?;
    tx.select_anchor(Anchor::new(id, typed));
    Ok(())
}

/// Delete one character before a collapsed cursor. At the start of a run,
/// an inline relationship or the last character of the previous run is
/// removed instead. Blocks are never merged.
pub(super) fn delete_backward(tx: &mut Transaction<'_>) -> TransformResult {
    let cursor = tx.cursor()?;
    let node = tx.node(&cursor.path)?;

    match &node.kind {
        NodeKind::Relationship { .. } => {
            let after = cursor.path.next_sibling().map(|next| Point::new(next, 0));
            tx.set_fallback(after);
            tx.doc.remove_node(&cursor.path)?;
            Ok(())
        }
        NodeKind::Text { .. } if cursor.offset > 0 => {
            let id = node.id;
            remove_char_before(tx.node_mut(&cursor.path)?, cursor.offset);
            tx.select_anchor(Anchor::new(id, cursor.offset - 1));
            Ok(())
        }
        NodeKind::Text { .. } => {
            let previous = cursor
                .path
                .previous_sibling()
                .ok_or(TransformError::NoChange)?;
            match &tx.node(&previous)?.kind {
                NodeKind::Relationship { .. } => {
                    tx.doc.remove_node(&previous)?;
                    Ok(())
                }
                NodeKind::Text { text, .. } if !text.is_empty() => {
                    let len = text.chars().count();
                    remove_char_before(tx.node_mut(&previous)?, len);
                    Ok(())
                }
                _ => Err(TransformError::NoChange),
            }
        }
        _ => Err(TransformError::NoChange),
    }
}

fn remove_char_before(node: &mut Node, offset: usize) {
    if let NodeKind::Text { text, .. } = &mut node.kind {
        let start = byte_index(text, offset - 1);
        let end = byte_index(text, offset);
        text.replace_range(start..end, "");
    }
}

#[cfg(test)]
mod tests {
    use super::super::{run, Command};
    use super::*;
    use crate::editor::EditorContext;
    use folio_model::{Document, Mark, RelationshipData, Selection};
    use std::collections::BTreeSet;

    fn apply(
        doc: &Document,
        at: Point,
        pending: Option<BTreeSet<Mark>>,
        command: Command,
    ) -> TransformResult<(Document, Option<Selection>)> {
        let ctx = EditorContext::default();
        let mut tx = Transaction::begin(doc, Some(&Selection::collapsed(at)), &ctx, pending)?;
        run(&mut tx, &command)?;
        Ok(tx.finish())
    }

    fn typed(text: &str) -> Command {
        Command::InsertText { text: text.to_string() }
    }

    #[test]
    fn test_insert_in_run() {
        let doc = Document::new(vec![Node::paragraph(vec![Node::text("helo")])]);
        let (doc, selection) = apply(&doc, Point::new(vec![0, 0], 3), None, typed("l")).unwrap();

        assert_eq!(doc.plain_text(), "hello");
        assert_eq!(selection, Some(Selection::collapsed(Point::new(vec![0, 0], 4))));
    }

    #[test]
    fn test_pending_marks_start_new_run() {
        let doc = Document::new(vec![Node::paragraph(vec![Node::text("ab")])]);
        let pending = Some(BTreeSet::from([Mark::Bold]));
        let (doc, selection) = apply(&doc, Point::new(vec![0, 0], 1), pending, typed("X")).unwrap();

        assert_eq!(
            doc.children[0],
            Node::paragraph(vec![
                Node::text("a"),
                Node::marked_text("X", [Mark::Bold]),
                Node::text("b"),
            ])
        );
        assert_eq!(selection, Some(Selection::collapsed(Point::new(vec![0, 1], 1))));
    }

    #[test]
    fn test_delete_backward() {
        let doc = Document::new(vec![Node::paragraph(vec![Node::text("abc")])]);
        let (doc, selection) = apply(&doc, Point::new(vec![0, 0], 2), None, Command::DeleteBackward).unwrap();
        assert_eq!(doc.plain_text(), "ac");
        assert_eq!(selection, Some(Selection::collapsed(Point::new(vec![0, 0], 1))));

        assert!(matches!(
            apply(&doc, Point::new(vec![0, 0], 0), None, Command::DeleteBackward),
            Err(TransformError::NoChange)
        ));
    }

    #[test]
    fn test_delete_backward_removes_relationship() {
        let doc = Document::new(vec![Node::paragraph(vec![
            Node::text("a"),
            Node::relationship("post", Some(RelationshipData::new("1", "Post"))),
            Node::text("b"),
        ])]);
        let (doc, _) = apply(&doc, Point::new(vec![0, 2], 0), None, Command::DeleteBackward).unwrap();

        let runs = doc.children[0].children().unwrap();
        assert_eq!(runs.len(), 2);
        assert!(runs.iter().all(Node::is_text));
    }
}
