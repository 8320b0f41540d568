use super::{disabled, lists, not_allowed, parent_and_index, Anchor, Transaction, TransformError, TransformResult};
use crate::config::FeatureConfig;
use crate::normalize::flatten_inline;
use crate::rules::{block_of, blocks_in_range, can_become_code, can_contain, can_wrap_in_blockquote, sibling_range};
use folio_model::{ListKind, Node, NodeKind, Path, TextAlign};
use serde::{Deserialize, Serialize};

/// Target of [`super::Command::SetBlockType`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum BlockType {
    Paragraph,
    Heading { level: u8 },
    Code,
    Blockquote,
    List { kind: ListKind },
}

pub(super) fn set_block_type(tx: &mut Transaction<'_>, block: BlockType) -> TransformResult {
    match block {
        BlockType::Paragraph => set_text_blocks(tx, None),
        BlockType::Heading { level } => {
            if !tx.ctx.features.allows_heading(level) {
                return Err(disabled(&format!("heading {}", level)));
            }
            set_text_blocks(tx, Some(level))
        }
        BlockType::Code => {
            if !tx.ctx.features.code {
                return Err(disabled("code"));
            }
            convert_to_code(tx)
        }
        BlockType::Blockquote => {
            if !tx.ctx.features.blockquote {
                return Err(disabled("blockquote"));
            }
            if enclosing_blockquote(tx).is_some() {
                return Err(TransformError::NoChange);
            }
            wrap_blockquote(tx)
        }
        BlockType::List { kind } => lists::set_list(tx, kind),
    }
}

pub(super) fn toggle_heading(tx: &mut Transaction<'_>, level: u8) -> TransformResult {
    if !tx.ctx.features.allows_heading(level) {
        return Err(disabled(&format!("heading {}", level)));
    }
    let blocks = text_blocks(tx)?;
    let all_at_level = !blocks.is_empty()
        && blocks.iter().all(|path| {
            matches!(tx.doc.node(path).map(|n| &n.kind), Some(NodeKind::Heading { level: l, .. }) if *l == level)
        });
    set_text_blocks(tx, if all_at_level { None } else { Some(level) })
}

/// Turn every text block in the selection into a paragraph (`None`) or a
/// heading of the given level, keeping children and alignment
fn set_text_blocks(tx: &mut Transaction<'_>, level: Option<u8>) -> TransformResult {
    let blocks = text_blocks(tx)?;
    if blocks.is_empty() {
        return Err(not_allowed("selection holds no text blocks"));
    }

    for path in &blocks {
        let node = tx.node(path)?;
        if level.is_some() {
            if matches!(node.kind, NodeKind::Code { .. }) {
                return Err(not_allowed("code blocks cannot become headings"));
            }
            let in_item = path
                .parent()
                .and_then(|parent| tx.doc.node(&parent))
                .map_or(false, |parent| matches!(parent.kind, NodeKind::ListItem { .. }));
            if in_item {
                return Err(not_allowed("headings are not allowed in list items"));
            }
        }
    }

    let mut changed = false;
    for path in &blocks {
        let node = tx.node_mut(path)?;
        let kind = std::mem::replace(&mut node.kind, NodeKind::Divider);
        node.kind = match (kind, level) {
            (NodeKind::Heading { level: current, text_align, children }, Some(level)) => {
                changed |= current != level;
                NodeKind::Heading { level, text_align, children }
            }
            (NodeKind::Heading { text_align, children, .. }, None) => {
                changed = true;
                NodeKind::Paragraph { text_align, children }
            }
            (NodeKind::Paragraph { text_align, children }, Some(level)) => {
                changed = true;
                NodeKind::Heading { level, text_align, children }
            }
            (NodeKind::Code { children }, None) => {
                changed = true;
                NodeKind::Paragraph { text_align: None, children }
            }
            (kind, _) => kind,
        };
    }

    if changed {
        Ok(())
    } else {
        Err(TransformError::NoChange)
    }
}

pub(super) fn set_text_align(tx: &mut Transaction<'_>, align: Option<TextAlign>) -> TransformResult {
    if !tx.ctx.features.allows_alignment(align) {
        return Err(disabled("alignment"));
    }
    let blocks = text_blocks(tx)?;
    let mut aligned = 0;
    let mut changed = false;
    for path in &blocks {
        match &mut tx.node_mut(path)?.kind {
            NodeKind::Paragraph { text_align, .. } | NodeKind::Heading { text_align, .. } => {
                aligned += 1;
                changed |= *text_align != align;
                *text_align = align;
            }
            _ => {}
        }
    }
    if aligned == 0 {
        return Err(not_allowed("alignment applies to paragraphs and headings"));
    }
    if !changed {
        return Err(TransformError::NoChange);
    }
    Ok(())
}

pub(super) fn toggle_code(tx: &mut Transaction<'_>) -> TransformResult {
    if !tx.ctx.features.code {
        return Err(disabled("code"));
    }
    let focus = tx.focus()?;
    let code = tx
        .doc
        .text_block_of(&focus.path)
        .filter(|(_, node)| matches!(node.kind, NodeKind::Code { .. }))
        .map(|(path, _)| path);

    match code {
        Some(path) => {
            let node = tx.node_mut(&path)?;
            let children = node.take_children();
            node.kind = NodeKind::Paragraph {
                text_align: None,
                children,
            };
            Ok(())
        }
        None => convert_to_code(tx),
    }
}

/// Flatten the single paragraph or heading under the selection into a code
/// block, keeping the cursor at the same character
fn convert_to_code(tx: &mut Transaction<'_>) -> TransformResult {
    let blocks = text_blocks(tx)?;
    let [path] = blocks.as_slice() else {
        return Err(not_allowed("code applies to a single block"));
    };
    let path = path.clone();

    if matches!(tx.node(&path)?.kind, NodeKind::Code { .. }) {
        return Err(TransformError::NoChange);
    }
    if !can_become_code(&tx.doc, &path) {
        return Err(not_allowed("this block cannot become code"));
    }
    let children = tx.node(&path)?.children().cloned().unwrap_or_default();
    let (text, offsets) = flatten_inline(&children);
    let run = Node::text(text);
    let run_id = run.id;
    for (id, base) in offsets {
        tx.anchors.remap(id, |offset| Anchor::new(run_id, base + offset));
    }
    tx.node_mut(&path)?.kind = NodeKind::Code { children: vec![run] };
    Ok(())
}

pub(super) fn toggle_blockquote(tx: &mut Transaction<'_>) -> TransformResult {
    if !tx.ctx.features.blockquote {
        return Err(disabled("blockquote"));
    }
    match enclosing_blockquote(tx) {
        Some(path) => tx.unwrap_node(&path),
        None => wrap_blockquote(tx),
    }
}

fn enclosing_blockquote(tx: &Transaction<'_>) -> Option<Path> {
    let selection = tx.selection().ok()?;
    tx.doc
        .closest(&selection.start().path, |node| matches!(node.kind, NodeKind::Blockquote { .. }))
        .map(|(path, _)| path)
}

fn wrap_blockquote(tx: &mut Transaction<'_>) -> TransformResult {
    let selection = tx.selection()?;
    let range = sibling_range(&tx.doc, selection.start(), selection.end()).ok_or(TransformError::StaleSelection)?;
    if !can_wrap_in_blockquote(&tx.doc, &range) {
        return Err(not_allowed("the selected blocks cannot be quoted here"));
    }
    tx.wrap_range(&range.parent, range.start, range.end, Node::blockquote)?;
    Ok(())
}

pub(super) fn insert_block(tx: &mut Transaction<'_>, mut node: Node) -> TransformResult {
    node.refresh_ids();
    if node.is_inline()
        || matches!(
            node.kind,
            NodeKind::ListItem { .. } | NodeKind::LayoutArea { .. } | NodeKind::ComponentSlot { .. }
        )
    {
        return Err(not_allowed(format!("cannot insert a {} as a block", node.kind_name())));
    }
    check_block_feature(&tx.ctx.features, &node)?;
    if matches!(node.kind, NodeKind::Layout { .. }) {
        let focus = tx.focus()?;
        if tx.doc.layout_of(&focus.path).is_some() {
            return Err(not_allowed("layouts cannot be nested"));
        }
    }
    insert_nodes(tx, vec![node], 0)?;
    Ok(())
}

/// Whether the configuration offers the kind of block `node` is
pub(crate) fn check_block_feature(features: &FeatureConfig, node: &Node) -> TransformResult {
    match &node.kind {
        NodeKind::Heading { level, .. } if !features.allows_heading(*level) => {
            Err(disabled(&format!("heading {}", level)))
        }
        NodeKind::Code { .. } if !features.code => Err(disabled("code")),
        NodeKind::Divider if !features.dividers => Err(disabled("dividers")),
        NodeKind::Blockquote { .. } if !features.blockquote => Err(disabled("blockquote")),
        NodeKind::List { kind, .. } if !features.allows_list(*kind) => Err(disabled("lists")),
        NodeKind::Layout { .. } if features.layouts.is_empty() => Err(disabled("layouts")),
        _ => Ok(()),
    }
}

/// Insert blocks at the selection focus.
///
/// A collapsed cursor in an empty paragraph or heading is replaced by the
/// nodes when its container accepts them. Otherwise the nodes go after the
/// focused block, or after the nearest ancestor whose container accepts
/// them. The cursor moves to the start of `nodes[cursor_index]`, or just
/// past it when that node is void.
pub(super) fn insert_nodes(
    tx: &mut Transaction<'_>,
    nodes: Vec<Node>,
    cursor_index: usize,
) -> TransformResult<Vec<Path>> {
    let selection = tx.selection()?;
    let block = block_of(&tx.doc, &selection.focus.path).ok_or(TransformError::StaleSelection)?;
    let accepts = |doc: &folio_model::Document, parent: &Path| nodes.iter().all(|node| can_contain(doc, parent, node));

    let (parent, index) = parent_and_index(&block)?;
    let replace = selection.is_collapsed() && is_empty_text_block(tx.node(&block)?) && accepts(&tx.doc, &parent);

    let (parent, index) = if replace {
        tx.doc.remove_node(&block)?;
        (parent, index)
    } else {
        let mut candidate = block.clone();
        loop {
            let (parent, index) = parent_and_index(&candidate)?;
            if accepts(&tx.doc, &parent) {
                break (parent, index + 1);
            }
            if parent.is_root() {
                return Err(not_allowed("no container accepts the inserted blocks"));
            }
            candidate = parent;
        }
    };

    let target = nodes
        .get(cursor_index)
        .map(|node| (node.id, node.is_void()));
    let count = nodes.len();
    let siblings = tx.children_mut(&parent)?;
    for (offset, node) in nodes.into_iter().enumerate() {
        siblings.insert(index + offset, node);
    }
    let paths: Vec<Path> = (index..index + count).map(|i| parent.child(i)).collect();

    if let Some((id, void)) = target {
        let path = tx.doc.path_of(id).ok_or_else(|| not_allowed("inserted node vanished"))?;
        match tx.doc.point_after(&path) {
            Some(after) if void => tx.select(&after)?,
            _ => tx.select_start_of(id),
        }
    }
    Ok(paths)
}

/// Paragraph or heading without text or inline elements
fn is_empty_text_block(node: &Node) -> bool {
    matches!(node.kind, NodeKind::Paragraph { .. } | NodeKind::Heading { .. })
        && node
            .children()
            .map_or(true, |children| children.iter().all(|c| c.is_text() && c.text_len() == 0))
}

/// Delete the block at `path`. Lists, items and blockquotes left empty go
/// with it; an emptied area or slot gets a fresh paragraph. Removing a
/// layout area dissolves the whole layout.
pub(super) fn remove_block(tx: &mut Transaction<'_>, path: &Path) -> TransformResult {
    let node = tx.node(path)?;
    if node.is_inline() {
        return Err(not_allowed("inline nodes are not blocks"));
    }
    if matches!(node.kind, NodeKind::ComponentSlot { .. }) {
        return Err(not_allowed("slots are removed with their component block"));
    }
    let is_area = matches!(node.kind, NodeKind::LayoutArea { .. });

    let fallback = tx.doc.point_before(path).or_else(|| tx.doc.point_after(path));
    tx.set_fallback(fallback);
    tx.doc.remove_node(path)?;

    let mut parent = path.parent().ok_or_else(|| TransformError::StaleReference(path.clone()))?;
    if is_area {
        return dissolve_layout(tx, &parent);
    }

    while !parent.is_root() {
        let node = tx.node(&parent)?;
        if !node.children().map_or(false, Vec::is_empty) {
            break;
        }
        let wrapper = matches!(
            node.kind,
            NodeKind::List { .. } | NodeKind::ListItem { .. } | NodeKind::Blockquote { .. }
        );
        let padded = matches!(node.kind, NodeKind::LayoutArea { .. } | NodeKind::ComponentSlot { .. });

        if wrapper {
            tx.doc.remove_node(&parent)?;
            parent = match parent.parent() {
                Some(next) => next,
                None => break,
            };
            continue;
        }
        if padded {
            tx.children_mut(&parent)?.push(Node::empty_paragraph());
        }
        break;
    }
    Ok(())
}

/// Replace the layout at `path` with the content of its areas
pub(super) fn dissolve_layout(tx: &mut Transaction<'_>, path: &Path) -> TransformResult {
    let (parent, index) = parent_and_index(path)?;
    let mut layout = tx.doc.remove_node(path)?;
    let content: Vec<Node> = layout
        .take_children()
        .into_iter()
        .flat_map(|mut area| area.take_children())
        .collect();
    let siblings = tx.children_mut(&parent)?;
    for (offset, node) in content.into_iter().enumerate() {
        siblings.insert(index + offset, node);
    }
    Ok(())
}

pub(super) fn insert_divider(tx: &mut Transaction<'_>) -> TransformResult {
    if !tx.ctx.features.dividers {
        return Err(disabled("dividers"));
    }
    insert_nodes(tx, vec![Node::divider(), Node::empty_paragraph()], 1)?;
    Ok(())
}

/// Paths of the text blocks the selection touches
fn text_blocks(tx: &Transaction<'_>) -> TransformResult<Vec<Path>> {
    let selection = tx.selection()?;
    Ok(blocks_in_range(&tx.doc, selection.start(), selection.end())
        .into_iter()
        .filter(|path| tx.doc.node(path).map_or(false, Node::is_text_block))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::super::{run, Command};
    use super::*;
    use crate::editor::EditorContext;
    use folio_model::{Document, Point, Selection};

    fn apply(doc: &Document, selection: Selection, command: Command) -> TransformResult<(Document, Option<Selection>)> {
        let ctx = EditorContext::default();
        let mut tx = Transaction::begin(doc, Some(&selection), &ctx, None)?;
        run(&mut tx, &command)?;
        Ok(tx.finish())
    }

    #[test]
    fn test_heading_toggle_keeps_children() {
        let doc = Document::new(vec![Node::paragraph(vec![Node::text("Title")])]);
        let at = Selection::collapsed(Point::new(vec![0, 0], 2));

        let (doc, _) = apply(&doc, at.clone(), Command::ToggleHeading { level: 2 }).unwrap();
        assert_eq!(doc.children[0], Node::heading(2, vec![Node::text("Title")]));

        let (doc, _) = apply(&doc, at, Command::ToggleHeading { level: 2 }).unwrap();
        assert_eq!(doc.children[0], Node::paragraph(vec![Node::text("Title")]));
    }

    #[test]
    fn test_heading_rejected_in_list_item_and_code() {
        let doc = Document::new(vec![
            Node::list(ListKind::Unordered, vec![Node::list_item(vec![Node::paragraph(vec![Node::text("a")])])]),
            Node::code("b"),
        ]);
        let in_item = Selection::collapsed(Point::new(vec![0, 0, 0, 0], 0));
        let in_code = Selection::collapsed(Point::new(vec![1, 0], 0));
        let heading = Command::SetBlockType {
            block: BlockType::Heading { level: 1 },
        };

        assert!(matches!(apply(&doc, in_item, heading.clone()), Err(TransformError::NotAllowed(_))));
        assert!(matches!(apply(&doc, in_code, heading), Err(TransformError::NotAllowed(_))));
    }

    #[test]
    fn test_code_round_trip_keeps_cursor() {
        let doc = Document::new(vec![Node::paragraph(vec![
            Node::text("let "),
            Node::marked_text("x", [folio_model::Mark::Bold]),
        ])]);
        let at = Selection::collapsed(Point::new(vec![0, 1], 1));

        let (doc, selection) = apply(&doc, at, Command::ToggleCode).unwrap();
        assert_eq!(doc.children[0], Node::code("let x"));
        assert_eq!(selection, Some(Selection::collapsed(Point::new(vec![0, 0], 5))));

        let (doc, _) = apply(&doc, selection.unwrap(), Command::ToggleCode).unwrap();
        assert_eq!(doc.children[0], Node::paragraph(vec![Node::text("let x")]));
    }

    #[test]
    fn test_insert_block_replaces_empty_paragraph() {
        let doc = Document::new(vec![Node::paragraph(vec![Node::text("a")]), Node::empty_paragraph()]);
        let at = Selection::collapsed(Point::new(vec![1, 0], 0));

        let (doc, selection) = apply(&doc, at, Command::InsertBlock { node: Node::code("x") }).unwrap();
        assert_eq!(doc.children.len(), 2);
        assert_eq!(doc.children[1], Node::code("x"));
        assert_eq!(selection, Some(Selection::collapsed(Point::new(vec![1, 0], 0))));
    }

    #[test]
    fn test_insert_block_walks_out_of_list() {
        let doc = Document::new(vec![Node::list(
            ListKind::Ordered,
            vec![Node::list_item(vec![Node::paragraph(vec![Node::text("item")])])],
        )]);
        let at = Selection::collapsed(Point::new(vec![0, 0, 0, 0], 4));

        let (doc, selection) = apply(&doc, at, Command::InsertBlock { node: Node::divider() }).unwrap();
        assert_eq!(doc.children[1], Node::divider());
        // nothing follows the divider yet, so the cursor sits on it
        assert_eq!(selection, Some(Selection::collapsed(Point::new(vec![1], 0))));
    }

    #[test]
    fn test_remove_last_item_removes_list() {
        let doc = Document::new(vec![
            Node::paragraph(vec![Node::text("before")]),
            Node::list(
                ListKind::Unordered,
                vec![Node::list_item(vec![Node::paragraph(vec![Node::text("only")])])],
            ),
        ]);
        let at = Selection::collapsed(Point::new(vec![1, 0, 0, 0], 2));

        let (doc, selection) = apply(
            &doc,
            at,
            Command::RemoveBlock {
                path: Path::new(vec![1, 0, 0]),
            },
        )
        .unwrap();
        assert_eq!(doc.children.len(), 1);
        assert_eq!(selection, Some(Selection::collapsed(Point::new(vec![0, 0], 6))));
    }

    #[test]
    fn test_remove_area_dissolves_layout() {
        let doc = Document::new(vec![Node::layout(
            vec![1, 1],
            vec![
                Node::layout_area(vec![Node::paragraph(vec![Node::text("left")])]),
                Node::layout_area(vec![Node::paragraph(vec![Node::text("right")])]),
            ],
        )]);
        let at = Selection::collapsed(Point::new(vec![0, 1, 0, 0], 0));

        let (doc, _) = apply(
            &doc,
            at,
            Command::RemoveBlock {
                path: Path::new(vec![0, 0]),
            },
        )
        .unwrap();
        assert_eq!(doc.children, vec![Node::paragraph(vec![Node::text("right")])]);
    }

    #[test]
    fn test_blockquote_wrap_and_unwrap() {
        let doc = Document::new(vec![
            Node::paragraph(vec![Node::text("a")]),
            Node::paragraph(vec![Node::text("b")]),
        ]);
        let both = Selection::new(Point::new(vec![0, 0], 0), Point::new(vec![1, 0], 1));

        let (doc, selection) = apply(&doc, both, Command::ToggleBlockquote).unwrap();
        assert_eq!(doc.children.len(), 1);
        assert_eq!(doc.children[0].children().map(Vec::len), Some(2));

        let (doc, _) = apply(&doc, selection.unwrap(), Command::ToggleBlockquote).unwrap();
        assert_eq!(doc.children.len(), 2);
    }

    #[test]
    fn test_alignment_only_on_text_blocks() {
        let doc = Document::new(vec![Node::divider(), Node::paragraph(vec![Node::text("a")])]);
        let on_divider = Selection::collapsed(Point::new(vec![0], 0));
        let align = Command::SetTextAlign {
            align: Some(TextAlign::Center),
        };
        assert!(apply(&doc, on_divider, align.clone()).is_err());

        let (doc, _) = apply(&doc, Selection::collapsed(Point::new(vec![1, 0], 0)), align.clone()).unwrap();
        assert!(matches!(
            doc.children[1].kind,
            NodeKind::Paragraph {
                text_align: Some(TextAlign::Center),
                ..
            }
        ));
        let at = Selection::collapsed(Point::new(vec![1, 0], 0));
        assert_eq!(apply(&doc, at, align).unwrap_err(), TransformError::NoChange);
    }
}
