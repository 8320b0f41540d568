use super::{disabled, not_allowed, parent_and_index, Transaction, TransformError, TransformResult};
use crate::rules::{can_wrap_in_list, sibling_range};
use folio_model::{ListKind, Node, NodeKind, Path};

/// Unwrap the surrounding list when it already has `kind`, switch its kind
/// when it has the other one, and wrap the selected blocks otherwise
pub(super) fn toggle_list(tx: &mut Transaction<'_>, kind: ListKind) -> TransformResult {
    if !tx.ctx.features.allows_list(kind) {
        return Err(disabled("lists"));
    }
    match enclosing_list(tx)? {
        Some((path, current)) if current == kind => unwrap_list(tx, &path),
        Some((path, _)) => set_kind(tx, &path, kind),
        None => wrap_list(tx, kind),
    }
}

/// Like [`toggle_list`], but never unwraps
pub(super) fn set_list(tx: &mut Transaction<'_>, kind: ListKind) -> TransformResult {
    if !tx.ctx.features.allows_list(kind) {
        return Err(disabled("lists"));
    }
    match enclosing_list(tx)? {
        Some((_, current)) if current == kind => Err(TransformError::NoChange),
        Some((path, _)) => set_kind(tx, &path, kind),
        None => wrap_list(tx, kind),
    }
}

/// Nearest list around the start of the selection
fn enclosing_list(tx: &Transaction<'_>) -> TransformResult<Option<(Path, ListKind)>> {
    let selection = tx.selection()?;
    Ok(tx
        .doc
        .closest(&selection.start().path, |node| matches!(node.kind, NodeKind::List { .. }))
        .and_then(|(path, node)| match node.kind {
            NodeKind::List { kind, .. } => Some((path, kind)),
            _ => None,
        }))
}

fn set_kind(tx: &mut Transaction<'_>, path: &Path, kind: ListKind) -> TransformResult {
    if let NodeKind::List { kind: current, .. } = &mut tx.node_mut(path)?.kind {
        *current = kind;
    }
    Ok(())
}

/// Replace the list with the content of its items
fn unwrap_list(tx: &mut Transaction<'_>, path: &Path) -> TransformResult {
    let (parent, index) = parent_and_index(path)?;
    let mut list = tx.doc.remove_node(path)?;
    let content: Vec<Node> = list
        .take_children()
        .into_iter()
        .flat_map(|mut item| item.take_children())
        .collect();
    let siblings = tx.children_mut(&parent)?;
    for (offset, node) in content.into_iter().enumerate() {
        siblings.insert(index + offset, node);
    }
    Ok(())
}

fn wrap_list(tx: &mut Transaction<'_>, kind: ListKind) -> TransformResult {
    let selection = tx.selection()?;
    let range = sibling_range(&tx.doc, selection.start(), selection.end()).ok_or(TransformError::StaleSelection)?;
    if !can_wrap_in_list(&tx.doc, &range) {
        return Err(not_allowed("the selected blocks cannot form a list here"));
    }
    tx.wrap_range(&range.parent, range.start, range.end, |nodes| {
        Node::list(kind, nodes.into_iter().map(into_item).collect())
    })?;
    Ok(())
}

/// Wrap a block in a list item; headings become paragraphs
fn into_item(mut node: Node) -> Node {
    let kind = std::mem::replace(&mut node.kind, NodeKind::Divider);
    node.kind = match kind {
        NodeKind::Heading {
            text_align, children, ..
        } => NodeKind::Paragraph { text_align, children },
        other => other,
    };
    Node::list_item(vec![node])
}

/// Nearest list item around the focus
fn focused_item(tx: &Transaction<'_>) -> TransformResult<Path> {
    let focus = tx.focus()?;
    tx.doc
        .closest(&focus.path, |node| matches!(node.kind, NodeKind::ListItem { .. }))
        .map(|(path, _)| path)
        .ok_or_else(|| not_allowed("not in a list item"))
}

fn list_kind(tx: &Transaction<'_>, path: &Path) -> TransformResult<ListKind> {
    match tx.node(path)?.kind {
        NodeKind::List { kind, .. } => Ok(kind),
        _ => Err(not_allowed("list item outside a list")),
    }
}

/// Move the focused item into its previous sibling, as the last item of a
/// trailing nested list
pub(super) fn indent_list_item(tx: &mut Transaction<'_>) -> TransformResult {
    let item = focused_item(tx)?;
    let (list, index) = parent_and_index(&item)?;
    if index == 0 {
        return Err(not_allowed("the first item cannot be indented"));
    }
    let kind = list_kind(tx, &list)?;
    let previous = list.child(index - 1);

    let moved = tx.doc.remove_node(&item)?;
    let children = tx.children_mut(&previous)?;
    match children.last_mut() {
        Some(Node {
            kind: NodeKind::List { children: nested, .. },
            ..
        }) => nested.push(moved),
        _ => children.push(Node::list(kind, vec![moved])),
    }
    Ok(())
}

/// Lift a nested item out to follow the item that holds its list. Items
/// after it move along as its own nested list so the reading order stays.
pub(super) fn outdent_list_item(tx: &mut Transaction<'_>) -> TransformResult {
    let item = focused_item(tx)?;
    let (list, index) = parent_and_index(&item)?;
    let kind = list_kind(tx, &list)?;
    let owner = list
        .parent()
        .filter(|owner| {
            tx.doc
                .node(owner)
                .map_or(false, |node| matches!(node.kind, NodeKind::ListItem { .. }))
        })
        .ok_or_else(|| not_allowed("the item is not nested"))?;
    let destination = owner.next_sibling().ok_or_else(|| not_allowed("the item is not nested"))?;

    let trailing: Vec<Node> = tx.children_mut(&list)?.drain(index + 1..).collect();
    let mut moved = tx.doc.remove_node(&item)?;
    if !trailing.is_empty() {
        if let Some(children) = moved.children_mut() {
            match children.last_mut() {
                Some(Node {
                    kind: NodeKind::List { children: nested, .. },
                    ..
                }) => nested.extend(trailing),
                _ => children.push(Node::list(kind, trailing)),
            }
        }
    }
    tx.doc.insert_node(&destination, moved)?;
    Ok(())
}
