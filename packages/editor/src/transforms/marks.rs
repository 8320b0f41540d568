use super::{disabled, not_allowed, Transaction, TransformError, TransformResult};
use crate::rules::{blocks_in_range, in_code, text_leaves_in_range};
use folio_model::{Mark, NodeId, NodeKind};

/// Add `mark` to every covered run unless all of them already carry it, in
/// which case remove it from all of them. Runs only partly covered are split
/// at the selection edges first.
pub(super) fn toggle_mark(tx: &mut Transaction<'_>, mark: Mark) -> TransformResult {
    if !tx.ctx.features.allows_mark(mark) {
        return Err(disabled(mark.as_str()));
    }
    let selection = tx.selection()?;
    if selection.is_collapsed() {
        return Err(not_allowed("collapsed selections toggle pending marks"));
    }
    let (start, end) = selection.ordered();
    let (start, end) = (start.clone(), end.clone());

    if blocks_in_range(&tx.doc, &start, &end)
        .iter()
        .any(|block| in_code(&tx.doc, block))
    {
        return Err(not_allowed("formatting inside a code block"));
    }

    let leaves = text_leaves_in_range(&tx.doc, &start, &end);
    if leaves.is_empty() {
        return Err(TransformError::NoChange);
    }
    let all_marked = leaves.iter().all(|path| {
        tx.doc
            .node(path)
            .and_then(|node| node.marks())
            .map_or(false, |marks| marks.contains(&mark))
    });

    let mut ids: Vec<NodeId> = leaves
        .iter()
        .map(|path| tx.node(path).map(|node| node.id))
        .collect::<Result<_, _>>()?;

    // end first: splitting it never moves the start run
    if leaves.last() == Some(&end.path) {
        tx.split_text(&end.path, end.offset)?;
    }
    if leaves.first() == Some(&start.path) {
        if let Some(right) = tx.split_text(&start.path, start.offset)? {
            ids[0] = tx.node(&right)?.id;
        }
    }

    for id in ids {
        let path = tx
            .doc
            .path_of(id)
            .ok_or_else(|| not_allowed("text run vanished while splitting"))?;
        if let NodeKind::Text { marks, .. } = &mut tx.node_mut(&path)?.kind {
            if all_marked {
                marks.remove(&mark);
            } else {
                marks.insert(mark);
            }
        }
    }
    Ok(())
}
