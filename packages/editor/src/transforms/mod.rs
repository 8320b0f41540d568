//! # Transforms
//!
//! Semantic editing commands. Each one validates its preconditions against
//! the current document and selection, then mutates a working copy held by a
//! [`Transaction`]. The editor commits the copy only when the command
//! succeeds, so every command either fully applies or changes nothing.
//!
//! ## Selection anchoring
//!
//! While a transaction runs, the selection is held as `(node id, offset)`
//! anchors instead of paths. Moving, wrapping or unwrapping nodes therefore
//! never invalidates it; splitting and merging text runs re-points the
//! anchors explicitly. On commit the anchors are resolved back to paths. If
//! an anchored node was removed, the selection falls back to the point the
//! command nominated, or to the start of the document.

mod blocks;
mod components;
mod layout;
mod links;
mod lists;
mod marks;
mod text;

pub use blocks::BlockType;

use crate::component::{PropsChange, PropsError};
use crate::editor::EditorContext;
use crate::rules::in_placeholder;
use folio_model::{
    byte_index, Document, ListKind, Mark, ModelError, Node, NodeId, NodeKind, Path, Point, RelationshipData,
    Selection, TextAlign,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransformError {
    #[error("No selection")]
    NoSelection,

    #[error("Selection does not point into the document")]
    StaleSelection,

    #[error("No node at {0}")]
    StaleReference(Path),

    #[error("Feature disabled: {0}")]
    FeatureDisabled(String),

    #[error("Not allowed: {0}")]
    NotAllowed(String),

    #[error("Nothing to change")]
    NoChange,

    #[error("Model error: {0}")]
    Model(String),

    #[error("Props error: {0}")]
    Props(#[from] PropsError),
}

impl From<ModelError> for TransformError {
    fn from(e: ModelError) -> Self {
        TransformError::Model(e.to_string())
    }
}

pub type TransformResult<T = ()> = Result<T, TransformError>;

pub(crate) fn not_allowed(reason: impl Into<String>) -> TransformError {
    TransformError::NotAllowed(reason.into())
}

pub(crate) fn disabled(feature: &str) -> TransformError {
    TransformError::FeatureDisabled(feature.to_string())
}

/// Editing commands issued by toolbars, key handlers and the insert menu
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "camelCase")]
pub enum Command {
    /// Type at a collapsed cursor, using pending marks if any
    InsertText { text: String },

    /// Delete the character (or inline relationship) before the cursor
    DeleteBackward,

    ToggleMark { mark: Mark },

    SetBlockType { block: BlockType },

    /// Heading of `level` if not already, paragraph otherwise
    ToggleHeading { level: u8 },

    SetTextAlign { align: Option<TextAlign> },

    InsertBlock { node: Node },

    RemoveBlock { path: Path },

    /// Divider followed by an empty paragraph
    InsertDivider,

    ToggleBlockquote,

    ToggleCode,

    ToggleList { kind: ListKind },

    IndentListItem,

    OutdentListItem,

    /// `None` uses the first configured preset
    InsertLayout { ratios: Option<Vec<u32>> },

    /// `None` targets the layout around the cursor
    SetLayout { path: Option<Path>, ratios: Vec<u32> },

    RemoveLayout { path: Option<Path> },

    WrapLink { href: String },

    UnwrapLink,

    InsertComponentBlock { component: String },

    UpdateComponentProps { path: Path, change: PropsChange },

    /// Unlinked relationship node at the cursor, ready for its picker
    InsertRelationship { relationship: String },

    /// Link a record, or delete the node with `None`
    SetRelationship {
        path: Path,
        data: Option<RelationshipData>,
    },
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::InsertText { .. } => "insert_text",
            Command::DeleteBackward => "delete_backward",
            Command::ToggleMark { .. } => "toggle_mark",
            Command::SetBlockType { .. } => "set_block_type",
            Command::ToggleHeading { .. } => "toggle_heading",
            Command::SetTextAlign { .. } => "set_text_align",
            Command::InsertBlock { .. } => "insert_block",
            Command::RemoveBlock { .. } => "remove_block",
            Command::InsertDivider => "insert_divider",
            Command::ToggleBlockquote => "toggle_blockquote",
            Command::ToggleCode => "toggle_code",
            Command::ToggleList { .. } => "toggle_list",
            Command::IndentListItem => "indent_list_item",
            Command::OutdentListItem => "outdent_list_item",
            Command::InsertLayout { .. } => "insert_layout",
            Command::SetLayout { .. } => "set_layout",
            Command::RemoveLayout { .. } => "remove_layout",
            Command::WrapLink { .. } => "wrap_link",
            Command::UnwrapLink => "unwrap_link",
            Command::InsertComponentBlock { .. } => "insert_component_block",
            Command::UpdateComponentProps { .. } => "update_component_props",
            Command::InsertRelationship { .. } => "insert_relationship",
            Command::SetRelationship { .. } => "set_relationship",
        }
    }
}

/// Run `command` against the transaction's working copy
pub(crate) fn run(tx: &mut Transaction<'_>, command: &Command) -> TransformResult {
    match command {
        Command::InsertText { text } => text::insert_text(tx, text),
        Command::DeleteBackward => text::delete_backward(tx),
        Command::ToggleMark { mark } => marks::toggle_mark(tx, *mark),
        Command::SetBlockType { block } => blocks::set_block_type(tx, *block),
        Command::ToggleHeading { level } => blocks::toggle_heading(tx, *level),
        Command::SetTextAlign { align } => blocks::set_text_align(tx, *align),
        Command::InsertBlock { node } => blocks::insert_block(tx, node.clone()),
        Command::RemoveBlock { path } => blocks::remove_block(tx, path),
        Command::InsertDivider => blocks::insert_divider(tx),
        Command::ToggleBlockquote => blocks::toggle_blockquote(tx),
        Command::ToggleCode => blocks::toggle_code(tx),
        Command::ToggleList { kind } => lists::toggle_list(tx, *kind),
        Command::IndentListItem => lists::indent_list_item(tx),
        Command::OutdentListItem => lists::outdent_list_item(tx),
        Command::InsertLayout { ratios } => layout::insert_layout(tx, ratios.clone()),
        Command::SetLayout { path, ratios } => layout::set_layout(tx, path.as_ref(), ratios),
        Command::RemoveLayout { path } => layout::remove_layout(tx, path.as_ref()),
        Command::WrapLink { href } => links::wrap_link(tx, href),
        Command::UnwrapLink => links::unwrap_link(tx),
        Command::InsertComponentBlock { component } => components::insert_component_block(tx, component),
        Command::UpdateComponentProps { path, change } => {
            components::update_component_props(tx, path, change)
        }
        Command::InsertRelationship { relationship } => {
            components::insert_relationship(tx, relationship)
        }
        Command::SetRelationship { path, data } => components::set_relationship(tx, path, data.clone()),
    }
}

/// Selection endpoint held by node identity while a transaction runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Anchor {
    pub node: NodeId,
    pub offset: usize,
}

impl Anchor {
    pub fn new(node: NodeId, offset: usize) -> Self {
        Self { node, offset }
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct Anchors {
    pub anchor: Option<Anchor>,
    pub focus: Option<Anchor>,
    /// Where the selection goes if an endpoint's node is removed
    pub fallback: Option<Anchor>,
}

impl Anchors {
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Anchor> {
        [&mut self.anchor, &mut self.focus, &mut self.fallback]
            .into_iter()
            .flatten()
    }

    /// Re-point every anchor on `from` through `map(offset)`
    pub fn remap(&mut self, from: NodeId, map: impl Fn(usize) -> Anchor) {
        for anchor in self.iter_mut() {
            if anchor.node == from {
                *anchor = map(anchor.offset);
            }
        }
    }
}

/// Working copy of the document plus the anchored selection
pub(crate) struct Transaction<'a> {
    pub(crate) doc: Document,
    pub(crate) anchors: Anchors,
    pub(crate) ctx: &'a EditorContext,
    pub(crate) pending_marks: Option<BTreeSet<Mark>>,
}

impl<'a> Transaction<'a> {
    pub(crate) fn begin(
        doc: &Document,
        selection: Option<&Selection>,
        ctx: &'a EditorContext,
        pending_marks: Option<BTreeSet<Mark>>,
    ) -> TransformResult<Self> {
        let mut anchors = Anchors::default();
        if let Some(selection) = selection {
            if [&selection.anchor, &selection.focus]
                .iter()
                .any(|point| in_placeholder(doc, &point.path, &ctx.components))
            {
                return Err(not_allowed("content of an unknown component is read-only"));
            }
            anchors.anchor = Some(anchor_at(doc, &selection.anchor)?);
            anchors.focus = Some(anchor_at(doc, &selection.focus)?);
        }
        Ok(Self {
            doc: doc.clone(),
            anchors,
            ctx,
            pending_marks,
        })
    }

    pub(crate) fn node(&self, path: &Path) -> TransformResult<&Node> {
        self.doc
            .node(path)
            .ok_or_else(|| TransformError::StaleReference(path.clone()))
    }

    pub(crate) fn node_mut(&mut self, path: &Path) -> TransformResult<&mut Node> {
        self.doc
            .node_mut(path)
            .ok_or_else(|| TransformError::StaleReference(path.clone()))
    }

    pub(crate) fn children_mut(&mut self, parent: &Path) -> TransformResult<&mut Vec<Node>> {
        self.doc
            .children_of_mut(parent)
            .ok_or_else(|| TransformError::StaleReference(parent.clone()))
    }

    /// Current selection resolved against the working copy
    pub(crate) fn selection(&self) -> TransformResult<Selection> {
        let (Some(anchor), Some(focus)) = (self.anchors.anchor, self.anchors.focus) else {
            return Err(TransformError::NoSelection);
        };
        match (resolve(&self.doc, anchor), resolve(&self.doc, focus)) {
            (Some(anchor), Some(focus)) => Ok(Selection::new(anchor, focus)),
            _ => Err(TransformError::StaleSelection),
        }
    }

    pub(crate) fn focus(&self) -> TransformResult<Point> {
        Ok(self.selection()?.focus)
    }

    /// Focus of a collapsed selection
    pub(crate) fn cursor(&self) -> TransformResult<Point> {
        let selection = self.selection()?;
        if !selection.is_collapsed() {
            return Err(not_allowed("selection must be collapsed"));
        }
        Ok(selection.focus)
    }

    pub(crate) fn select(&mut self, point: &Point) -> TransformResult {
        let anchor = anchor_at(&self.doc, point)?;
        self.anchors.anchor = Some(anchor);
        self.anchors.focus = Some(anchor);
        Ok(())
    }

    pub(crate) fn select_anchor(&mut self, anchor: Anchor) {
        self.anchors.anchor = Some(anchor);
        self.anchors.focus = Some(anchor);
    }

    /// Cursor at the first position inside the node with `id`
    pub(crate) fn select_start_of(&mut self, id: NodeId) {
        self.select_anchor(Anchor::new(id, 0));
    }

    pub(crate) fn set_fallback(&mut self, point: Option<Point>) {
        self.anchors.fallback = point.and_then(|point| anchor_at(&self.doc, &point).ok());
    }

    /// Split the text run at `path` at a character offset. Returns the path
    /// of the right half, or `None` when the offset is at either edge and
    /// nothing was split.
    pub(crate) fn split_text(&mut self, path: &Path, offset: usize) -> TransformResult<Option<Path>> {
        let node = self.node_mut(path)?;
        let left_id = node.id;
        let NodeKind::Text { text, marks } = &mut node.kind else {
            return Err(not_allowed("can only split text runs"));
        };
        let len = text.chars().count();
        if offset == 0 || offset >= len {
            return Ok(None);
        }

        let at = byte_index(text, offset);
        let right_text = text.split_off(at);
        let right = Node::marked_text(right_text, marks.iter().copied());
        let right_id = right.id;
        let right_path = path
            .next_sibling()
            .ok_or_else(|| not_allowed("text run without a parent"))?;
        self.doc.insert_node(&right_path, right)?;

        for anchor in self.anchors.iter_mut() {
            if anchor.node == left_id && anchor.offset > offset {
                *anchor = Anchor::new(right_id, anchor.offset - offset);
            }
        }
        Ok(Some(right_path))
    }

    /// Replace `parent[index]` with its own children
    pub(crate) fn unwrap_node(&mut self, path: &Path) -> TransformResult {
        let (parent, index) = parent_and_index(path)?;
        let mut node = self.doc.remove_node(path)?;
        let children = node.take_children();
        let siblings = self.children_mut(&parent)?;
        for (offset, child) in children.into_iter().enumerate() {
            siblings.insert(index + offset, child);
        }
        Ok(())
    }

    /// Move `parent[start..=end]` into a new node built by `wrap`
    pub(crate) fn wrap_range(
        &mut self,
        parent: &Path,
        start: usize,
        end: usize,
        wrap: impl FnOnce(Vec<Node>) -> Node,
    ) -> TransformResult<Path> {
        let siblings = self.children_mut(parent)?;
        if start > end || end >= siblings.len() {
            return Err(TransformError::StaleReference(parent.child(end)));
        }
        let wrapped: Vec<Node> = siblings.drain(start..=end).collect();
        siblings.insert(start, wrap(wrapped));
        Ok(parent.child(start))
    }

    pub(crate) fn finish(self) -> (Document, Option<Selection>) {
        let doc = self.doc;
        let fallback = self
            .anchors
            .fallback
            .and_then(|anchor| resolve(&doc, anchor))
            .or_else(|| doc.start_point());

        let selection = match (self.anchors.anchor, self.anchors.focus) {
            (Some(anchor), Some(focus)) => {
                let anchor = resolve(&doc, anchor).or_else(|| fallback.clone());
                let focus = resolve(&doc, focus).or_else(|| fallback.clone());
                match (anchor, focus) {
                    (Some(anchor), Some(focus)) => Some(Selection::new(anchor, focus)),
                    _ => None,
                }
            }
            _ => None,
        };
        (doc, selection)
    }
}

pub(crate) fn parent_and_index(path: &Path) -> TransformResult<(Path, usize)> {
    match (path.parent(), path.last()) {
        (Some(parent), Some(index)) => Ok((parent, index)),
        _ => Err(TransformError::StaleReference(path.clone())),
    }
}

fn anchor_at(doc: &Document, point: &Point) -> TransformResult<Anchor> {
    if !doc.is_valid_point(point) {
        return Err(TransformError::StaleSelection);
    }
    let node = doc.node(&point.path).ok_or(TransformError::StaleSelection)?;
    Ok(Anchor::new(node.id, point.offset))
}

/// Point for an anchor in `doc`; anchors on containers resolve to their
/// first position
fn resolve(doc: &Document, anchor: Anchor) -> Option<Point> {
    let path = doc.path_of(anchor.node)?;
    let node = doc.node(&path)?;
    if node.is_text() {
        Some(Point::new(path, anchor.offset.min(node.text_len())))
    } else if node.is_void() {
        Some(Point::new(path, 0))
    } else {
        doc.first_point_in(&path)
    }
}
