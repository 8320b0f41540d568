//! # Normalization
//!
//! Brings a tree back in line with the data model after every committed
//! transform and when a document is loaded. Transforms only have to produce
//! a tree that is correct up to these rules:
//!
//! - adjacent text runs with the same marks merge, empty runs are absorbed
//! - links and relationships have a text run on both sides
//! - text blocks are never empty; code holds a single unmarked run
//! - lists hold list items; empty lists, items and blockquotes disappear
//! - layouts have exactly one area per ratio and never nest
//! - component slots are never empty and registered props match their schema
//! - the document always has at least one block
//!
//! Whenever runs are merged or flattened, selection anchors on the old runs
//! are moved onto the surviving run at the equivalent offset.

use crate::component::{coerce, ComponentRegistry};
use crate::editor::EditorContext;
use crate::transforms::{Anchor, Anchors};
use folio_model::{Document, Node, NodeId, NodeKind};
use serde_json::Value;
use tracing::{debug, debug_span};

/// Normalize `doc` in place
pub fn normalize_document(doc: &mut Document, ctx: &EditorContext) {
    normalize(doc, &mut Anchors::default(), ctx);
}

pub(crate) fn normalize(doc: &mut Document, anchors: &mut Anchors, ctx: &EditorContext) {
    let _span = debug_span!("normalize", blocks = doc.children.len()).entered();
    let mut normalizer = Normalizer {
        anchors,
        components: &ctx.components,
    };
    normalizer.blocks(&mut doc.children, false);
    if doc.children.is_empty() {
        doc.children.push(Node::empty_paragraph());
    }
}

/// Bring a layout's areas to `count`: pad with empty areas, or move the
/// content of overflow areas into the last retained one. Overflow areas
/// holding nothing but one empty paragraph are dropped.
pub(crate) fn fit_areas(areas: &mut Vec<Node>, count: usize) {
    let count = count.max(1);
    while areas.len() < count {
        areas.push(Node::layout_area(vec![Node::empty_paragraph()]));
    }
    if areas.len() > count {
        let overflow: Vec<Node> = areas.drain(count..).collect();
        let Some(last) = areas.last_mut() else {
            return;
        };
        for mut area in overflow {
            if is_blank_area(&area) {
                continue;
            }
            let content = area.take_children();
            if let Some(children) = last.children_mut() {
                children.extend(content);
            }
        }
    }
}

fn is_blank_area(area: &Node) -> bool {
    match area.children().map(Vec::as_slice) {
        Some([only]) => is_blank_paragraph(only),
        _ => false,
    }
}

/// Paragraph with no text and no inline elements
pub(crate) fn is_blank_paragraph(node: &Node) -> bool {
    matches!(node.kind, NodeKind::Paragraph { .. })
        && node
            .children()
            .map_or(true, |children| children.iter().all(|c| c.is_text() && c.text_len() == 0))
}

/// Concatenated text of inline content plus the character offset at which
/// each run (or relationship) starts
pub(crate) fn flatten_inline(children: &[Node]) -> (String, Vec<(NodeId, usize)>) {
    fn walk(nodes: &[Node], text: &mut String, len: &mut usize, offsets: &mut Vec<(NodeId, usize)>) {
        for node in nodes {
            match &node.kind {
                NodeKind::Text { text: run, .. } => {
                    offsets.push((node.id, *len));
                    text.push_str(run);
                    *len += run.chars().count();
                }
                NodeKind::Relationship { data, .. } => {
                    offsets.push((node.id, *len));
                    if let Some(label) = data.as_ref().and_then(|d| d.label.as_deref()) {
                        text.push_str(label);
                        *len += label.chars().count();
                    }
                }
                _ => {
                    if let Some(children) = node.children() {
                        walk(children, text, len, offsets);
                    }
                }
            }
        }
    }

    let mut text = String::new();
    let mut offsets = Vec::new();
    walk(children, &mut text, &mut 0, &mut offsets);
    (text, offsets)
}

struct Normalizer<'a> {
    anchors: &'a mut Anchors,
    components: &'a ComponentRegistry,
}

impl<'a> Normalizer<'a> {
    /// Children of the root, blockquotes, list items, areas and slots
    fn blocks(&mut self, children: &mut Vec<Node>, in_layout: bool) {
        let drained = std::mem::take(children);
        let mut out = Vec::with_capacity(drained.len());
        let mut inline_run: Vec<Node> = Vec::new();

        for mut child in drained {
            if child.is_inline() {
                inline_run.push(child);
                continue;
            }
            self.flush_inlines(&mut inline_run, &mut out, in_layout);

            match &child.kind {
                NodeKind::Layout { .. } if in_layout => {
                    debug!("unwrapping nested layout");
                    self.node(&mut child, true);
                    for mut area in child.take_children() {
                        out.extend(area.take_children());
                    }
                    continue;
                }
                NodeKind::ListItem { .. } | NodeKind::LayoutArea { .. } | NodeKind::ComponentSlot { .. } => {
                    let mut inner = child.take_children();
                    self.blocks(&mut inner, in_layout);
                    out.extend(inner);
                    continue;
                }
                _ => {}
            }

            self.node(&mut child, in_layout);
            if is_empty_wrapper(&child) {
                continue;
            }
            out.push(child);
        }
        self.flush_inlines(&mut inline_run, &mut out, in_layout);

        *children = out;
    }

    fn flush_inlines(&mut self, run: &mut Vec<Node>, out: &mut Vec<Node>, in_layout: bool) {
        if run.is_empty() {
            return;
        }
        let mut paragraph = Node::paragraph(std::mem::take(run));
        self.node(&mut paragraph, in_layout);
        out.push(paragraph);
    }

    fn node(&mut self, node: &mut Node, in_layout: bool) {
        match &mut node.kind {
            NodeKind::Paragraph { children, .. } => self.inlines(children),
            NodeKind::Heading { level, children, .. } => {
                *level = (*level).clamp(1, 6);
                self.inlines(children);
            }
            NodeKind::Code { children } => {
                self.code(children);
                self.inlines(children);
            }
            NodeKind::Blockquote { children } | NodeKind::ListItem { children } => {
                self.blocks(children, in_layout)
            }
            NodeKind::LayoutArea { children } | NodeKind::ComponentSlot { children, .. } => {
                self.blocks(children, in_layout);
                if children.is_empty() {
                    children.push(Node::empty_paragraph());
                }
            }
            NodeKind::List { children, .. } => self.list_items(children, in_layout),
            NodeKind::Layout { ratios, children } => self.layout(ratios, children),
            NodeKind::ComponentBlock {
                component,
                props,
                children,
            } => self.component(component, props, children, in_layout),
            NodeKind::Link { children, .. } => self.link_children(children),
            NodeKind::Divider | NodeKind::Relationship { .. } | NodeKind::Text { .. } => {}
        }
    }

    fn list_items(&mut self, children: &mut Vec<Node>, in_layout: bool) {
        let drained = std::mem::take(children);
        for child in drained {
            let mut item = match child.kind {
                NodeKind::ListItem { .. } => child,
                _ if child.is_inline() => Node::list_item(vec![Node::paragraph(vec![child])]),
                _ => Node::list_item(vec![child]),
            };
            self.node(&mut item, in_layout);
            if !is_empty_wrapper(&item) {
                children.push(item);
            }
        }
    }

    fn layout(&mut self, ratios: &mut Vec<u32>, children: &mut Vec<Node>) {
        if ratios.is_empty() {
            *ratios = vec![1; children.len().max(1)];
        }
        for ratio in ratios.iter_mut().filter(|r| **r == 0) {
            *ratio = 1;
        }

        let drained = std::mem::take(children);
        let mut loose: Vec<Node> = Vec::new();
        for child in drained {
            if matches!(child.kind, NodeKind::LayoutArea { .. }) {
                if !loose.is_empty() {
                    children.push(Node::layout_area(std::mem::take(&mut loose)));
                }
                children.push(child);
            } else {
                loose.push(child);
            }
        }
        if !loose.is_empty() {
            children.push(Node::layout_area(loose));
        }

        for area in children.iter_mut() {
            self.node(area, true);
        }
        fit_areas(children, ratios.len());
    }

    fn component(&mut self, component: &str, props: &mut Value, children: &mut Vec<Node>, in_layout: bool) {
        if children.iter().any(|c| !matches!(c.kind, NodeKind::ComponentSlot { .. })) {
            let drained = std::mem::take(children);
            let mut loose: Vec<Node> = Vec::new();
            for child in drained {
                if matches!(child.kind, NodeKind::ComponentSlot { .. }) {
                    children.push(child);
                } else {
                    loose.push(child);
                }
            }
            children.push(Node::component_slot("children", loose));
        }

        if let Some(definition) = self.components.get(component) {
            let coerced = coerce(&definition.schema, props);
            if coerced != *props {
                debug!(component, "coerced component props to schema");
                *props = coerced;
            }
            for slot in &definition.slots {
                let present = children.iter().any(|child| {
                    matches!(&child.kind, NodeKind::ComponentSlot { name, .. } if name == slot)
                });
                if !present {
                    children.push(Node::component_slot(slot.as_str(), vec![Node::empty_paragraph()]));
                }
            }
        }

        for slot in children.iter_mut() {
            self.node(slot, in_layout);
        }
    }

    /// Children of paragraphs, headings and code blocks
    fn inlines(&mut self, children: &mut Vec<Node>) {
        let drained = std::mem::take(children);
        let mut out: Vec<Node> = Vec::with_capacity(drained.len());
        for child in drained {
            self.push_inline(&mut out, child);
        }

        let mut padded: Vec<Node> = Vec::with_capacity(out.len() + 2);
        for node in out {
            if !node.is_text() && !padded.last().map_or(false, Node::is_text) {
                padded.push(Node::text(""));
            }
            padded.push(node);
        }
        if !padded.last().map_or(false, Node::is_text) {
            padded.push(Node::text(""));
        }
        *children = padded;
    }

    fn push_inline(&mut self, out: &mut Vec<Node>, mut child: Node) {
        let text_block = child.is_text_block();
        match &mut child.kind {
            NodeKind::Text { .. } => self.push_text(out, child),
            NodeKind::Link { children, .. } => {
                self.link_children(children);
                out.push(child);
            }
            NodeKind::Relationship { .. } => out.push(child),
            _ if text_block => {
                for inner in child.take_children() {
                    self.push_inline(out, inner);
                }
            }
            _ => {
                let (text, offsets) = flatten_inline(std::slice::from_ref(&child));
                let run = Node::text(text);
                self.remap_flattened(&offsets, run.id);
                self.push_text(out, run);
            }
        }
    }

    /// Append a run, merging it into a preceding run when the marks match
    /// or either side is empty
    fn push_text(&mut self, out: &mut Vec<Node>, child: Node) {
        if let Some(prev) = out.last_mut() {
            let prev_id = prev.id;
            if let (
                NodeKind::Text {
                    text: prev_text,
                    marks: prev_marks,
                },
                NodeKind::Text { text, marks },
            ) = (&mut prev.kind, &child.kind)
            {
                if prev_marks == marks || text.is_empty() || prev_text.is_empty() {
                    let prev_len = prev_text.chars().count();
                    if prev_text.is_empty() && !text.is_empty() {
                        *prev_marks = marks.clone();
                    }
                    prev_text.push_str(text);
                    self.anchors
                        .remap(child.id, |offset| Anchor::new(prev_id, prev_len + offset));
                    return;
                }
            }
        }
        out.push(child);
    }

    fn link_children(&mut self, children: &mut Vec<Node>) {
        let drained = std::mem::take(children);
        let mut out: Vec<Node> = Vec::with_capacity(drained.len());
        for mut child in drained {
            match &child.kind {
                NodeKind::Text { .. } => self.push_text(&mut out, child),
                NodeKind::Link { .. } => {
                    let mut inner = child.take_children();
                    self.link_children(&mut inner);
                    for run in inner {
                        self.push_text(&mut out, run);
                    }
                }
                _ => {
                    let (text, offsets) = flatten_inline(std::slice::from_ref(&child));
                    let run = Node::text(text);
                    self.remap_flattened(&offsets, run.id);
                    self.push_text(&mut out, run);
                }
            }
        }
        if out.is_empty() {
            out.push(Node::text(""));
        }
        *children = out;
    }

    /// Code holds one unmarked run; anything else is flattened into it
    fn code(&mut self, children: &mut Vec<Node>) {
        let plain = children
            .iter()
            .all(|child| matches!(&child.kind, NodeKind::Text { marks, .. } if marks.is_empty()));
        if plain {
            return;
        }
        let (text, offsets) = flatten_inline(children);
        let run = Node::text(text);
        self.remap_flattened(&offsets, run.id);
        *children = vec![run];
    }

    fn remap_flattened(&mut self, offsets: &[(NodeId, usize)], run: NodeId) {
        for (id, base) in offsets {
            self.anchors.remap(*id, |offset| Anchor::new(run, base + offset));
        }
    }
}

fn is_empty_wrapper(node: &Node) -> bool {
    matches!(
        &node.kind,
        NodeKind::List { children, .. } | NodeKind::ListItem { children } | NodeKind::Blockquote { children }
            if children.is_empty()
    )
}
