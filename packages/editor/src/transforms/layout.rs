use super::blocks::{dissolve_layout, insert_nodes};
use super::{disabled, not_allowed, Transaction, TransformError, TransformResult};
use crate::normalize::fit_areas;
use folio_model::{Node, NodeKind, Path};

fn check_ratios(ratios: &[u32]) -> TransformResult {
    if ratios.is_empty() || ratios.contains(&0) {
        return Err(not_allowed("layout ratios must be non-empty and positive"));
    }
    Ok(())
}

/// The layout at `path`, or the one around the focus
fn target_layout(tx: &Transaction<'_>, path: Option<&Path>) -> TransformResult<Path> {
    match path {
        Some(path) => match tx.node(path)?.kind {
            NodeKind::Layout { .. } => Ok(path.clone()),
            _ => Err(not_allowed(format!("no layout at {}", path))),
        },
        None => {
            let focus = tx.focus()?;
            tx.doc
                .layout_of(&focus.path)
                .map(|(path, _)| path)
                .ok_or_else(|| not_allowed("not in a layout"))
        }
    }
}

pub(super) fn insert_layout(tx: &mut Transaction<'_>, ratios: Option<Vec<u32>>) -> TransformResult {
    let ratios = match ratios {
        Some(ratios) => ratios,
        None => tx
            .ctx
            .features
            .default_layout()
            .cloned()
            .ok_or_else(|| disabled("layouts"))?,
    };
    if tx.ctx.features.layouts.is_empty() {
        return Err(disabled("layouts"));
    }
    check_ratios(&ratios)?;

    let focus = tx.focus()?;
    if tx.doc.layout_of(&focus.path).is_some() {
        return Err(not_allowed("layouts cannot be nested"));
    }

    let areas = ratios
        .iter()
        .map(|_| Node::layout_area(vec![Node::empty_paragraph()]))
        .collect();
    insert_nodes(tx, vec![Node::layout(ratios, areas)], 0)?;
    Ok(())
}

/// Change a layout's ratios. Added columns start empty; content of dropped
/// columns moves into the last remaining one.
pub(super) fn set_layout(tx: &mut Transaction<'_>, path: Option<&Path>, ratios: &[u32]) -> TransformResult {
    check_ratios(ratios)?;
    let path = target_layout(tx, path)?;
    if matches!(&tx.node(&path)?.kind, NodeKind::Layout { ratios: current, .. } if current.as_slice() == ratios) {
        return Err(TransformError::NoChange);
    }

    let keep = ratios.len().min(tx.node(&path)?.children().map_or(0, Vec::len));
    if keep > 0 {
        let fallback = tx.doc.last_point_in(&path.child(keep - 1));
        tx.set_fallback(fallback);
    }

    if let NodeKind::Layout {
        ratios: current,
        children,
    } = &mut tx.node_mut(&path)?.kind
    {
        *current = ratios.to_vec();
        fit_areas(children, ratios.len());
    }
    Ok(())
}

/// Replace a layout with its areas' content, in order
pub(super) fn remove_layout(tx: &mut Transaction<'_>, path: Option<&Path>) -> TransformResult {
    let path = target_layout(tx, path)?;
    dissolve_layout(tx, &path)
}
