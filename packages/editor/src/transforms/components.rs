use super::blocks::insert_nodes;
use super::{not_allowed, Anchor, Transaction, TransformError, TransformResult};
use crate::component::{apply_change, PropsChange, PropsError};
use crate::rules::in_code;
use folio_model::{Node, NodeKind, Path, RelationshipData};

pub(super) fn insert_component_block(tx: &mut Transaction<'_>, component: &str) -> TransformResult {
    let definition = tx
        .ctx
        .components
        .get(component)
        .cloned()
        .ok_or_else(|| PropsError::UnknownComponent(component.to_string()))?;
    insert_nodes(tx, vec![definition.create_node()], 0)?;
    Ok(())
}

/// The single write path for component props: validate `change` against the
/// block's schema and store the result
pub(super) fn update_component_props(tx: &mut Transaction<'_>, path: &Path, change: &PropsChange) -> TransformResult {
    let NodeKind::ComponentBlock { component, props, .. } = &tx.node(path)?.kind else {
        return Err(not_allowed(format!("no component block at {}", path)));
    };
    let definition = tx
        .ctx
        .components
        .get(component)
        .ok_or_else(|| PropsError::UnknownComponent(component.clone()))?;
    let updated = apply_change(&definition.schema, props, change)?;
    if updated == *props {
        return Err(TransformError::NoChange);
    }

    if let NodeKind::ComponentBlock { props, .. } = &mut tx.node_mut(path)?.kind {
        *props = updated;
    }
    Ok(())
}

/// Insert an unlinked relationship at a collapsed cursor; the cursor ends
/// up just after it
pub(super) fn insert_relationship(tx: &mut Transaction<'_>, relationship: &str) -> TransformResult {
    if tx.ctx.relationships.get(relationship).is_none() {
        return Err(not_allowed(format!("unknown relationship '{}'", relationship)));
    }
    let cursor = tx.cursor()?;
    if in_code(&tx.doc, &cursor.path) {
        return Err(not_allowed("relationships are not allowed in code"));
    }
    let inside_link = cursor
        .path
        .parent()
        .and_then(|parent| tx.doc.node(&parent))
        .map_or(false, |parent| matches!(parent.kind, NodeKind::Link { .. }));
    if inside_link {
        return Err(not_allowed("relationships are not allowed in links"));
    }

    let leaf = tx.node(&cursor.path)?;
    let insert_at = if matches!(leaf.kind, NodeKind::Relationship { .. }) {
        cursor.path.next_sibling()
    } else if !leaf.is_text() {
        return Err(not_allowed("relationships go inside text"));
    } else {
        match tx.split_text(&cursor.path, cursor.offset)? {
            Some(right) => Some(right),
            None if cursor.offset == 0 => Some(cursor.path.clone()),
            None => cursor.path.next_sibling(),
        }
    };
    let insert_at = insert_at.ok_or_else(|| not_allowed("cursor has no parent block"))?;

    tx.doc.insert_node(&insert_at, Node::relationship(relationship, None))?;

    let after = insert_at.next_sibling().ok_or_else(|| not_allowed("cursor has no parent block"))?;
    let next = match tx.doc.node(&after) {
        Some(node) if node.is_text() => node.id,
        _ => {
            let run = Node::text("");
            let id = run.id;
            tx.doc.insert_node(&after, run)?;
            id
        }
    };
    tx.select_anchor(Anchor::new(next, 0));
    Ok(())
}

/// Link a record to the relationship at `path`, or delete the node when
/// `data` is `None`
pub(super) fn set_relationship(
    tx: &mut Transaction<'_>,
    path: &Path,
    data: Option<RelationshipData>,
) -> TransformResult {
    if !matches!(tx.node(path)?.kind, NodeKind::Relationship { .. }) {
        return Err(not_allowed(format!("no relationship at {}", path)));
    }
    match data {
        Some(data) => {
            if let NodeKind::Relationship { data: current, .. } = &mut tx.node_mut(path)?.kind {
                if current.as_ref() == Some(&data) {
                    return Err(TransformError::NoChange);
                }
                *current = Some(data);
            }
        }
        None => {
            let fallback = tx.doc.point_before(path).or_else(|| tx.doc.point_after(path));
            tx.set_fallback(fallback);
            tx.doc.remove_node(path)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::super::{run, Command};
    use super::*;
    use crate::component::{fields, ComponentBlockDefinition, ComponentRegistry, PropPath};
    use crate::editor::EditorContext;
    use crate::relationship::{RelationshipRegistry, RelationshipTarget, StaticResolver};
    use folio_model::{Document, Point, Selection};
    use serde_json::json;

    fn context() -> EditorContext {
        let components = ComponentRegistry::new().with(ComponentBlockDefinition::new(
            "callout",
            "Callout",
            [("tone", fields::select("Tone", &[("info", "Info"), ("warn", "Warning")], "info"))],
        ));
        let relationships =
            RelationshipRegistry::new().with(RelationshipTarget::new("post", "Post", StaticResolver::default()));
        EditorContext::default()
            .with_components(components)
            .with_relationships(relationships)
    }

    fn apply(
        ctx: &EditorContext,
        doc: &Document,
        selection: Selection,
        command: Command,
    ) -> TransformResult<(Document, Option<Selection>)> {
        let mut tx = Transaction::begin(doc, Some(&selection), ctx, None)?;
        run(&mut tx, &command)?;
        Ok(tx.finish())
    }

    #[test]
    fn test_insert_and_update_component() {
        let ctx = context();
        let doc = Document::empty();
        let at = Selection::collapsed(Point::new(vec![0, 0], 0));

        let (doc, selection) = apply(
            &ctx,
            &doc,
            at,
            Command::InsertComponentBlock {
                component: "callout".into(),
            },
        )
        .unwrap();
        assert!(matches!(&doc.children[0].kind, NodeKind::ComponentBlock { props, .. } if props["tone"] == "info"));

        let change = PropsChange::new(PropPath::root().field("tone"), crate::component::PropsOp::Set { value: json!("warn") });
        let update = Command::UpdateComponentProps {
            path: Path::new(vec![0]),
            change: change.clone(),
        };
        let (doc, _) = apply(&ctx, &doc, selection.clone().unwrap(), update).unwrap();
        assert!(matches!(&doc.children[0].kind, NodeKind::ComponentBlock { props, .. } if props["tone"] == "warn"));

        let invalid = PropsChange::new(PropPath::root().field("tone"), crate::component::PropsOp::Set { value: json!("loud") });
        let result = apply(
            &ctx,
            &doc,
            selection.unwrap(),
            Command::UpdateComponentProps {
                path: Path::new(vec![0]),
                change: invalid,
            },
        );
        assert!(matches!(result, Err(TransformError::Props(PropsError::InvalidValue(_)))));
    }

    #[test]
    fn test_unknown_component_is_left_alone() {
        let ctx = context();
        let doc = Document::new(vec![Node::component_block("legacy", json!({ "x": 1 }), vec![])]);
        let at = Selection::collapsed(Point::new(vec![0], 0));
        let change = PropsChange::set_root(json!({ "x": 2 }));

        let result = apply(
            &ctx,
            &doc,
            at.clone(),
            Command::UpdateComponentProps {
                path: Path::new(vec![0]),
                change,
            },
        );
        assert!(matches!(result, Err(TransformError::Props(PropsError::UnknownComponent(_)))));

        let result = apply(
            &ctx,
            &doc,
            at,
            Command::InsertComponentBlock {
                component: "legacy".into(),
            },
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_relationship_lifecycle() {
        let ctx = context();
        let doc = Document::new(vec![Node::paragraph(vec![Node::text("see ")])]);
        let at = Selection::collapsed(Point::new(vec![0, 0], 4));

        let (doc, selection) = apply(
            &ctx,
            &doc,
            at,
            Command::InsertRelationship {
                relationship: "post".into(),
            },
        )
        .unwrap();
        assert_eq!(
            doc.children[0],
            Node::paragraph(vec![Node::text("see "), Node::relationship("post", None), Node::text("")])
        );
        assert_eq!(selection, Some(Selection::collapsed(Point::new(vec![0, 2], 0))));

        let record = RelationshipData::new("7", "Seven");
        let (doc, selection) = apply(
            &ctx,
            &doc,
            selection.unwrap(),
            Command::SetRelationship {
                path: Path::new(vec![0, 1]),
                data: Some(record.clone()),
            },
        )
        .unwrap();
        assert!(matches!(&doc.children[0].children().unwrap()[1].kind, NodeKind::Relationship { data: Some(d), .. } if *d == record));

        let (doc, _) = apply(
            &ctx,
            &doc,
            selection.unwrap(),
            Command::SetRelationship {
                path: Path::new(vec![0, 1]),
                data: None,
            },
        )
        .unwrap();
        assert_eq!(doc.children[0].text_content(), "see ");
        assert_eq!(doc.children[0].children().map(Vec::len), Some(2));
    }

    #[test]
    fn test_relationship_rejected_in_code() {
        let ctx = context();
        let doc = Document::new(vec![Node::code("x")]);
        let at = Selection::collapsed(Point::new(vec![0, 0], 1));
        let result = apply(
            &ctx,
            &doc,
            at,
            Command::InsertRelationship {
                relationship: "post".into(),
            },
        );
        assert!(matches!(result, Err(TransformError::NotAllowed(_))));
    }
}
