//! # Feature State
//!
//! What the toolbar shows for the current selection: which formats are
//! active and which commands are available. [`derive_state`] is a pure
//! function of the document, the selection and the editor context, and it
//! relies on the same containment checks the transforms enforce.
//!
//! The derivation never fails. A missing or stale selection yields the
//! all-disabled state.

use crate::editor::EditorContext;
use crate::rules::{
    blocks_in_range, can_become_code, can_wrap_in_blockquote, can_wrap_in_list, in_code, in_placeholder,
    sibling_range, text_leaves_in_range,
};
use folio_model::{Document, ListKind, Mark, Node, NodeKind, Path, Selection, TextAlign};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleState {
    pub is_selected: bool,
    pub is_disabled: bool,
}

impl ToggleState {
    pub const DISABLED: ToggleState = ToggleState {
        is_selected: false,
        is_disabled: true,
    };

    pub fn new(is_selected: bool, is_disabled: bool) -> Self {
        Self {
            is_selected,
            is_disabled,
        }
    }

    pub fn is_available(&self) -> bool {
        !self.is_disabled
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum HeadingSelection {
    Normal,
    Level(u8),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeadingState {
    pub selected: HeadingSelection,
    /// Configured levels that are legal where the selection is
    pub allowed_heading_levels: Vec<u8>,
    pub is_disabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlignmentState {
    /// Shared alignment of the selected blocks; `None` is start or mixed
    pub selected: Option<TextAlign>,
    pub allowed: Vec<TextAlign>,
    pub is_disabled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListsState {
    pub ordered: ToggleState,
    pub unordered: ToggleState,
}

impl ListsState {
    pub fn get(&self, kind: ListKind) -> ToggleState {
        match kind {
            ListKind::Ordered => self.ordered,
            ListKind::Unordered => self.unordered,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutState {
    pub is_selected: bool,
    /// Inserting a layout is not possible here
    pub is_disabled: bool,
    /// Ratios of the layout around the focus
    pub ratios: Option<Vec<u32>>,
    pub presets: Vec<Vec<u32>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureState {
    pub marks: BTreeMap<Mark, ToggleState>,
    pub headings: HeadingState,
    pub alignment: AlignmentState,
    pub lists: ListsState,
    pub blockquote: ToggleState,
    pub code: ToggleState,
    pub divider: ToggleState,
    pub link: ToggleState,
    pub layout: LayoutState,
    pub components: BTreeMap<String, ToggleState>,
    pub relationships: BTreeMap<String, ToggleState>,
}

impl FeatureState {
    /// State with every control off
    pub fn disabled(ctx: &EditorContext) -> Self {
        Self {
            marks: Mark::ALL.iter().map(|mark| (*mark, ToggleState::DISABLED)).collect(),
            headings: HeadingState {
                selected: HeadingSelection::Normal,
                allowed_heading_levels: Vec::new(),
                is_disabled: true,
            },
            alignment: AlignmentState {
                selected: None,
                allowed: Vec::new(),
                is_disabled: true,
            },
            lists: ListsState {
                ordered: ToggleState::DISABLED,
                unordered: ToggleState::DISABLED,
            },
            blockquote: ToggleState::DISABLED,
            code: ToggleState::DISABLED,
            divider: ToggleState::DISABLED,
            link: ToggleState::DISABLED,
            layout: LayoutState {
                is_selected: false,
                is_disabled: true,
                ratios: None,
                presets: ctx.features.layouts.clone(),
            },
            components: ctx
                .components
                .iter()
                .map(|definition| (definition.key.clone(), ToggleState::DISABLED))
                .collect(),
            relationships: ctx
                .relationships
                .iter()
                .map(|target| (target.key.clone(), ToggleState::DISABLED))
                .collect(),
        }
    }

    pub fn mark(&self, mark: Mark) -> ToggleState {
        self.marks.get(&mark).copied().unwrap_or(ToggleState::DISABLED)
    }

    /// Show pending marks of a collapsed cursor as the active ones
    pub fn with_pending_marks(mut self, pending: &BTreeSet<Mark>) -> Self {
        for (mark, state) in self.marks.iter_mut() {
            if !state.is_disabled {
                state.is_selected = pending.contains(mark);
            }
        }
        self
    }
}

pub fn derive_state(doc: &Document, selection: Option<&Selection>, ctx: &EditorContext) -> FeatureState {
    let Some(selection) = selection else {
        return FeatureState::disabled(ctx);
    };
    if !doc.is_valid_point(&selection.anchor) || !doc.is_valid_point(&selection.focus) {
        warn!(
            anchor = %selection.anchor,
            focus = %selection.focus,
            "feature state requested for a stale selection"
        );
        return FeatureState::disabled(ctx);
    }

    if [&selection.anchor, &selection.focus]
        .iter()
        .any(|point| in_placeholder(doc, &point.path, &ctx.components))
    {
        debug!(focus = %selection.focus, "selection inside an unknown component");
        return FeatureState::disabled(ctx);
    }

    let features = &ctx.features;
    let (start, end) = selection.ordered();
    let focus = &selection.focus;
    let focus_node = doc.node(&focus.path);

    let leaves = text_leaves_in_range(doc, start, end);
    let blocks = blocks_in_range(doc, start, end);
    let text_blocks: Vec<(&Path, &Node)> = blocks
        .iter()
        .filter_map(|path| doc.node(path).filter(|node| node.is_text_block()).map(|node| (path, node)))
        .collect();
    let in_void = selection.is_collapsed() && focus_node.map_or(false, Node::is_void);
    let any_code = blocks.iter().any(|block| in_code(doc, block));
    let range = sibling_range(doc, start, end);

    let marks = Mark::ALL
        .iter()
        .map(|mark| {
            let is_disabled = !features.allows_mark(*mark) || in_void || any_code || leaves.is_empty();
            let is_selected = !is_disabled
                && leaves.iter().all(|path| {
                    doc.node(path)
                        .and_then(Node::marks)
                        .map_or(false, |marks| marks.contains(mark))
                });
            (*mark, ToggleState::new(is_selected, is_disabled))
        })
        .collect();

    let headings = heading_state(doc, &text_blocks, ctx);
    let alignment = alignment_state(&text_blocks, ctx);

    let current_list = doc
        .closest(&start.path, |node| matches!(node.kind, NodeKind::List { .. }))
        .and_then(|(_, node)| match node.kind {
            NodeKind::List { kind, .. } => Some(kind),
            _ => None,
        });
    let can_list = range.as_ref().map_or(false, |range| can_wrap_in_list(doc, range));
    let list_state = |kind: ListKind| {
        ToggleState::new(
            current_list == Some(kind),
            !features.allows_list(kind) || any_code || (current_list.is_none() && !can_list),
        )
    };
    let lists = ListsState {
        ordered: list_state(ListKind::Ordered),
        unordered: list_state(ListKind::Unordered),
    };

    let quoted = doc
        .closest(&start.path, |node| matches!(node.kind, NodeKind::Blockquote { .. }))
        .is_some();
    let can_quote = range.as_ref().map_or(false, |range| can_wrap_in_blockquote(doc, range));
    let blockquote = ToggleState::new(quoted, !features.blockquote || (!quoted && !can_quote));

    let in_code_block = in_code(doc, &focus.path);
    let can_code = match text_blocks.as_slice() {
        [(path, _)] => can_become_code(doc, path),
        _ => false,
    };
    let code = ToggleState::new(in_code_block, !features.code || (!in_code_block && !can_code));

    let on_divider = focus_node.map_or(false, |node| matches!(node.kind, NodeKind::Divider));
    let divider = ToggleState::new(on_divider, !features.dividers);

    let in_link = doc
        .closest(&focus.path, |node| matches!(node.kind, NodeKind::Link { .. }))
        .is_some();
    let link = ToggleState::new(
        in_link,
        !features.links || any_code || (!in_link && (selection.is_collapsed() || text_blocks.len() != 1)),
    );

    let current_layout = doc.layout_of(&focus.path).and_then(|(_, node)| match &node.kind {
        NodeKind::Layout { ratios, .. } => Some(ratios.clone()),
        _ => None,
    });
    let layout = LayoutState {
        is_selected: current_layout.is_some(),
        is_disabled: features.layouts.is_empty() || current_layout.is_some(),
        ratios: current_layout,
        presets: features.layouts.clone(),
    };

    let components = ctx
        .components
        .iter()
        .map(|definition| {
            let inside = doc
                .closest(&focus.path, |node| {
                    matches!(&node.kind, NodeKind::ComponentBlock { component, .. } if *component == definition.key)
                })
                .is_some();
            (definition.key.clone(), ToggleState::new(inside, false))
        })
        .collect();

    let in_link_run = focus
        .path
        .parent()
        .and_then(|parent| doc.node(&parent))
        .map_or(false, |parent| matches!(parent.kind, NodeKind::Link { .. }));
    let inline_cursor = focus_node.map_or(false, |node| {
        node.is_text() || matches!(node.kind, NodeKind::Relationship { .. })
    });
    let relationships = ctx
        .relationships
        .iter()
        .map(|target| {
            let on_it = focus_node.map_or(false, |node| {
                matches!(&node.kind, NodeKind::Relationship { relationship, .. } if *relationship == target.key)
            });
            let is_disabled = any_code || in_link_run || !inline_cursor || !selection.is_collapsed();
            (target.key.clone(), ToggleState::new(on_it, is_disabled))
        })
        .collect();

    FeatureState {
        marks,
        headings,
        alignment,
        lists,
        blockquote,
        code,
        divider,
        link,
        layout,
        components,
        relationships,
    }
}

/// Levels spanning several headings read as normal text
fn heading_state(doc: &Document, text_blocks: &[(&Path, &Node)], ctx: &EditorContext) -> HeadingState {
    let levels: Vec<Option<u8>> = text_blocks
        .iter()
        .map(|(_, node)| match node.kind {
            NodeKind::Heading { level, .. } => Some(level),
            _ => None,
        })
        .collect();
    let selected = match levels.split_first() {
        Some((Some(first), rest)) if rest.iter().all(|level| *level == Some(*first)) => {
            HeadingSelection::Level(*first)
        }
        _ => HeadingSelection::Normal,
    };

    let forbidden = text_blocks.iter().any(|(path, node)| {
        matches!(node.kind, NodeKind::Code { .. })
            || path
                .parent()
                .and_then(|parent| doc.node(&parent))
                .map_or(false, |parent| matches!(parent.kind, NodeKind::ListItem { .. }))
    });
    let allowed_heading_levels = if text_blocks.is_empty() || forbidden {
        Vec::new()
    } else {
        ctx.features.heading_levels.clone()
    };

    HeadingState {
        selected,
        is_disabled: allowed_heading_levels.is_empty(),
        allowed_heading_levels,
    }
}

fn alignment_state(text_blocks: &[(&Path, &Node)], ctx: &EditorContext) -> AlignmentState {
    let aligns: Vec<Option<TextAlign>> = text_blocks
        .iter()
        .filter_map(|(_, node)| match node.kind {
            NodeKind::Paragraph { text_align, .. } | NodeKind::Heading { text_align, .. } => Some(text_align),
            _ => None,
        })
        .collect();
    let selected = match aligns.split_first() {
        Some((first, rest)) if rest.iter().all(|align| align == first) => *first,
        _ => None,
    };
    let allowed: Vec<TextAlign> = [TextAlign::Center, TextAlign::End]
        .into_iter()
        .filter(|align| ctx.features.allows_alignment(Some(*align)))
        .collect();

    AlignmentState {
        selected,
        is_disabled: aligns.is_empty() || allowed.is_empty(),
        allowed,
    }
}
