//! Structural invariant checks.
//!
//! Reports every place where a tree breaks the data model's rules. The
//! editor normalizes loaded documents so that this list is empty after every
//! committed transform; the check itself never mutates.

use crate::document::Document;
use crate::node::{Node, NodeKind};
use crate::path::Path;
use crate::visitor::{walk_document, walk_node, Visitor};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub path: Path,
    pub kind: ViolationKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ViolationKind {
    EmptyDocument,
    EmptyContainer,
    InlineInBlockContainer,
    BlockInTextBlock,
    ListChildNotItem,
    ItemOutsideList,
    LayoutAreaCount { ratios: usize, areas: usize },
    LayoutChildNotArea,
    AreaOutsideLayout,
    InvalidRatio,
    NestedLayout,
    ComponentChildNotSlot,
    SlotOutsideComponent,
    HeadingLevel { level: u8 },
    MarkedCodeText,
    InlineElementInCode,
    LinkChildNotText,
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViolationKind::EmptyDocument => write!(f, "document has no blocks"),
            ViolationKind::EmptyContainer => write!(f, "container has no children"),
            ViolationKind::InlineInBlockContainer => write!(f, "inline node where a block is required"),
            ViolationKind::BlockInTextBlock => write!(f, "block node inside a text block"),
            ViolationKind::ListChildNotItem => write!(f, "list child is not a list item"),
            ViolationKind::ItemOutsideList => write!(f, "list item outside a list"),
            ViolationKind::LayoutAreaCount { ratios, areas } => {
                write!(f, "layout has {} ratios but {} areas", ratios, areas)
            }
            ViolationKind::LayoutChildNotArea => write!(f, "layout child is not a layout area"),
            ViolationKind::AreaOutsideLayout => write!(f, "layout area outside a layout"),
            ViolationKind::InvalidRatio => write!(f, "layout ratios must be non-empty and positive"),
            ViolationKind::NestedLayout => write!(f, "layout nested inside a layout"),
            ViolationKind::ComponentChildNotSlot => write!(f, "component block child is not a slot"),
            ViolationKind::SlotOutsideComponent => write!(f, "slot outside a component block"),
            ViolationKind::HeadingLevel { level } => write!(f, "heading level {} out of range", level),
            ViolationKind::MarkedCodeText => write!(f, "formatted text inside a code block"),
            ViolationKind::InlineElementInCode => write!(f, "link or relationship inside a code block"),
            ViolationKind::LinkChildNotText => write!(f, "link child is not a text run"),
        }
    }
}

struct StructureChecker {
    violations: Vec<Violation>,
    layout_depth: usize,
}

impl StructureChecker {
    fn report(&mut self, path: &Path, kind: ViolationKind) {
        self.violations.push(Violation {
            path: path.clone(),
            kind,
        });
    }

    /// Children of root, blockquote, list item, layout area and slot
    fn check_block_children(&mut self, path: &Path, children: &[Node]) {
        if children.is_empty() {
            self.report(path, ViolationKind::EmptyContainer);
        }
        for (index, child) in children.iter().enumerate() {
            let child_path = path.child(index);
            match &child.kind {
                _ if child.is_inline() => {
                    self.report(&child_path, ViolationKind::InlineInBlockContainer)
                }
                NodeKind::ListItem { .. } => self.report(&child_path, ViolationKind::ItemOutsideList),
                NodeKind::LayoutArea { .. } => {
                    self.report(&child_path, ViolationKind::AreaOutsideLayout)
                }
                NodeKind::ComponentSlot { .. } => {
                    self.report(&child_path, ViolationKind::SlotOutsideComponent)
                }
                _ => {}
            }
        }
    }

    fn check_inline_children(&mut self, path: &Path, children: &[Node], in_code: bool) {
        if children.is_empty() {
            self.report(path, ViolationKind::EmptyContainer);
        }
        for (index, child) in children.iter().enumerate() {
            let child_path = path.child(index);
            if child.is_block() {
                self.report(&child_path, ViolationKind::BlockInTextBlock);
                continue;
            }
            if !in_code {
                continue;
            }
            match &child.kind {
                NodeKind::Text { marks, .. } if !marks.is_empty() => {
                    self.report(&child_path, ViolationKind::MarkedCodeText)
                }
                NodeKind::Link { .. } | NodeKind::Relationship { .. } => {
                    self.report(&child_path, ViolationKind::InlineElementInCode)
                }
                _ => {}
            }
        }
    }
}

impl Visitor for StructureChecker {
    fn visit_node(&mut self, path: &Path, node: &Node) {
        match &node.kind {
            NodeKind::Paragraph { children, .. } => self.check_inline_children(path, children, false),
            NodeKind::Heading { level, children, .. } => {
                if !(1..=6).contains(level) {
                    self.report(path, ViolationKind::HeadingLevel { level: *level });
                }
                self.check_inline_children(path, children, false);
            }
            NodeKind::Code { children } => self.check_inline_children(path, children, true),
            NodeKind::Blockquote { children }
            | NodeKind::ListItem { children }
            | NodeKind::LayoutArea { children }
            | NodeKind::ComponentSlot { children, .. } => self.check_block_children(path, children),
            NodeKind::List { children, .. } => {
                if children.is_empty() {
                    self.report(path, ViolationKind::EmptyContainer);
                }
                for (index, child) in children.iter().enumerate() {
                    if !matches!(child.kind, NodeKind::ListItem { .. }) {
                        self.report(&path.child(index), ViolationKind::ListChildNotItem);
                    }
                }
            }
            NodeKind::Layout { ratios, children } => {
                if self.layout_depth > 0 {
                    self.report(path, ViolationKind::NestedLayout);
                }
                if ratios.is_empty() || ratios.contains(&0) {
                    self.report(path, ViolationKind::InvalidRatio);
                }
                if ratios.len() != children.len() {
                    self.report(
                        path,
                        ViolationKind::LayoutAreaCount {
                            ratios: ratios.len(),
                            areas: children.len(),
                        },
                    );
                }
                for (index, child) in children.iter().enumerate() {
                    if !matches!(child.kind, NodeKind::LayoutArea { .. }) {
                        self.report(&path.child(index), ViolationKind::LayoutChildNotArea);
                    }
                }
                self.layout_depth += 1;
                walk_node(self, path, node);
                self.layout_depth -= 1;
                return;
            }
            NodeKind::ComponentBlock { children, .. } => {
                for (index, child) in children.iter().enumerate() {
                    if !matches!(child.kind, NodeKind::ComponentSlot { .. }) {
                        self.report(&path.child(index), ViolationKind::ComponentChildNotSlot);
                    }
                }
            }
            NodeKind::Link { children, .. } => {
                for (index, child) in children.iter().enumerate() {
                    if !child.is_text() {
                        self.report(&path.child(index), ViolationKind::LinkChildNotText);
                    }
                }
            }
            NodeKind::Divider | NodeKind::Relationship { .. } | NodeKind::Text { .. } => {}
        }
        walk_node(self, path, node);
    }
}

/// Every structural violation in the document, in document order
pub fn check_structure(doc: &Document) -> Vec<Violation> {
    let mut checker = StructureChecker {
        violations: Vec::new(),
        layout_depth: 0,
    };
    if doc.children.is_empty() {
        checker.report(&Path::root(), ViolationKind::EmptyDocument);
    }
    checker.check_block_children(&Path::root(), &doc.children);
    walk_document(&mut checker, doc);
    checker
        .violations
        .dedup_by(|a, b| a.path == b.path && a.kind == b.kind);
    checker.violations
}
