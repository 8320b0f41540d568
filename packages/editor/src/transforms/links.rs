use super::{disabled, not_allowed, Anchor, Transaction, TransformError, TransformResult};
use crate::rules::in_code;
use folio_model::{Node, NodeKind, Path};

/// Wrap the selected text in a link. The selection must lie within one
/// paragraph or heading and must not cross an existing link or an inline
/// relationship.
pub(super) fn wrap_link(tx: &mut Transaction<'_>, href: &str) -> TransformResult {
    if !tx.ctx.features.links {
        return Err(disabled("links"));
    }
    let href = href.trim();
    if href.is_empty() {
        return Err(not_allowed("links need a target"));
    }
    let selection = tx.selection()?;
    if selection.is_collapsed() {
        return Err(not_allowed("select the text to link"));
    }
    let (start, end) = (selection.start().clone(), selection.end().clone());

    let block = tx
        .doc
        .text_block_of(&start.path)
        .map(|(path, _)| path)
        .ok_or(TransformError::StaleSelection)?;
    if start.path.parent().as_ref() != Some(&block) || end.path.parent().as_ref() != Some(&block) {
        return Err(not_allowed("links cannot span blocks or nest"));
    }
    if in_code(&tx.doc, &start.path) {
        return Err(not_allowed("links are not allowed in code"));
    }

    let (Some(first), Some(last)) = (start.path.last(), end.path.last()) else {
        return Err(TransformError::StaleSelection);
    };
    for index in first..=last {
        let node = tx.node(&block.child(index))?;
        if !node.is_text() {
            return Err(not_allowed(format!("cannot link across a {}", node.kind_name())));
        }
    }

    tx.split_text(&end.path, end.offset)?;
    let start_len = tx.node(&start.path)?.text_len();
    let mut last = if end.offset == 0 { last.saturating_sub(1) } else { last };
    let first = if tx.split_text(&start.path, start.offset)?.is_some() {
        last += 1;
        first + 1
    } else if start.offset >= start_len {
        first + 1
    } else {
        first
    };
    if first > last {
        return Err(TransformError::NoChange);
    }

    let link = tx.wrap_range(&block, first, last, |runs| Node::link(href, runs))?;
    let runs = tx.node(&link)?.children().cloned().unwrap_or_default();
    if let (Some(head), Some(tail)) = (runs.first(), runs.last()) {
        tx.anchors.anchor = Some(Anchor::new(head.id, 0));
        tx.anchors.focus = Some(Anchor::new(tail.id, tail.text_len()));
    }
    Ok(())
}

/// Remove every link the selection touches, keeping its text
pub(super) fn unwrap_link(tx: &mut Transaction<'_>) -> TransformResult {
    let selection = tx.selection()?;
    let (start, end) = (selection.start(), selection.end());

    let mut links: Vec<Path> = Vec::new();
    for position in tx.doc.positions() {
        if position < start.path || position > end.path {
            continue;
        }
        let link = tx
            .doc
            .closest(&position, |node| matches!(node.kind, NodeKind::Link { .. }))
            .map(|(path, _)| path);
        if let Some(link) = link {
            if !links.contains(&link) {
                links.push(link);
            }
        }
    }
    if links.is_empty() {
        return Err(TransformError::NoChange);
    }
    // later siblings first so earlier paths stay valid
    for link in links.iter().rev() {
        tx.unwrap_node(link)?;
    }
    Ok(())
}
