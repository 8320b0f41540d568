//! # Document Tree
//!
//! Root of the editable tree plus the addressing helpers every transform
//! builds on. The persisted form is the plain array of top-level nodes.

use crate::error::{ModelError, ModelResult};
use crate::id::NodeId;
use crate::node::{Node, NodeKind};
use crate::path::Path;
use crate::selection::Point;
use crate::visitor::{walk_document, walk_node, Visitor};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::trace;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document {
    pub children: Vec<Node>,
}

/// Collects cursor positions: text runs and void nodes
struct PositionCollector {
    positions: Vec<Path>,
}

impl Visitor for PositionCollector {
    fn visit_node(&mut self, path: &Path, node: &Node) {
        if node.is_text() || node.is_void() {
            self.positions.push(path.clone());
            return;
        }
        walk_node(self, path, node);
    }
}

impl Document {
    pub fn new(children: Vec<Node>) -> Self {
        Self { children }
    }

    /// A document holding one empty paragraph
    pub fn empty() -> Self {
        Self::new(vec![Node::empty_paragraph()])
    }

    pub fn from_json(source: &str) -> ModelResult<Self> {
        let doc: Document = serde_json::from_str(source)?;
        trace!(blocks = doc.children.len(), bytes = source.len(), "parsed document");
        Ok(doc)
    }

    pub fn to_json(&self) -> ModelResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_value(value: Value) -> ModelResult<Self> {
        Ok(serde_json::from_value(value)?)
    }

    pub fn to_value(&self) -> ModelResult<Value> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn node(&self, path: &Path) -> Option<&Node> {
        let (first, rest) = path.indices().split_first()?;
        let mut node = self.children.get(*first)?;
        for index in rest {
            node = node.children()?.get(*index)?;
        }
        Some(node)
    }

    pub fn node_mut(&mut self, path: &Path) -> Option<&mut Node> {
        let (first, rest) = path.indices().split_first()?;
        let mut node = self.children.get_mut(*first)?;
        for index in rest {
            node = node.children_mut()?.get_mut(*index)?;
        }
        Some(node)
    }

    pub fn has_node(&self, path: &Path) -> bool {
        self.node(path).is_some()
    }

    /// Children of the node at `parent`; the root path yields the top level
    pub fn children_of(&self, parent: &Path) -> Option<&Vec<Node>> {
        if parent.is_root() {
            return Some(&self.children);
        }
        self.node(parent)?.children()
    }

    pub fn children_of_mut(&mut self, parent: &Path) -> Option<&mut Vec<Node>> {
        if parent.is_root() {
            return Some(&mut self.children);
        }
        self.node_mut(parent)?.children_mut()
    }

    /// Insert `node` so that it ends up at `path`
    pub fn insert_node(&mut self, path: &Path, node: Node) -> ModelResult<()> {
        let (parent, index) = split_path(path)?;
        let children = self
            .children_of_mut(&parent)
            .ok_or_else(|| ModelError::NotAContainer(parent.clone()))?;
        if index > children.len() {
            return Err(ModelError::NodeNotFound(path.clone()));
        }
        children.insert(index, node);
        Ok(())
    }

    pub fn remove_node(&mut self, path: &Path) -> ModelResult<Node> {
        let (parent, index) = split_path(path)?;
        let children = self
            .children_of_mut(&parent)
            .ok_or_else(|| ModelError::NodeNotFound(path.clone()))?;
        if index >= children.len() {
            return Err(ModelError::NodeNotFound(path.clone()));
        }
        Ok(children.remove(index))
    }

    pub fn replace_node(&mut self, path: &Path, node: Node) -> ModelResult<Node> {
        let slot = self
            .node_mut(path)
            .ok_or_else(|| ModelError::NodeNotFound(path.clone()))?;
        Ok(std::mem::replace(slot, node))
    }

    /// Current path of the node with the given id
    pub fn path_of(&self, id: NodeId) -> Option<Path> {
        fn find(children: &[Node], id: NodeId, path: &mut Vec<usize>) -> bool {
            for (index, child) in children.iter().enumerate() {
                path.push(index);
                if child.id == id {
                    return true;
                }
                if let Some(grandchildren) = child.children() {
                    if find(grandchildren, id, path) {
                        return true;
                    }
                }
                path.pop();
            }
            false
        }

        let mut path = Vec::new();
        find(&self.children, id, &mut path).then(|| Path::new(path))
    }

    /// Existing ancestors of `path`, nearest first
    pub fn ancestors(&self, path: &Path) -> Vec<(Path, &Node)> {
        path.ancestors()
            .into_iter()
            .filter_map(|ancestor| self.node(&ancestor).map(|node| (ancestor, node)))
            .collect()
    }

    /// Nearest node at or above `path` matching the predicate
    pub fn closest(&self, path: &Path, predicate: impl Fn(&Node) -> bool) -> Option<(Path, &Node)> {
        if let Some(node) = self.node(path) {
            if predicate(node) {
                return Some((path.clone(), node));
            }
        }
        self.ancestors(path)
            .into_iter()
            .find(|entry| predicate(entry.1))
    }

    /// Every cursor position (text runs and void nodes) in document order
    pub fn positions(&self) -> Vec<Path> {
        let mut collector = PositionCollector {
            positions: Vec::new(),
        };
        walk_document(&mut collector, self);
        collector.positions
    }

    /// Cursor positions inside the subtree at `path`
    pub fn positions_within(&self, path: &Path) -> Vec<Path> {
        let Some(node) = self.node(path) else {
            return Vec::new();
        };
        let mut collector = PositionCollector {
            positions: Vec::new(),
        };
        collector.visit_node(path, node);
        collector.positions
    }

    pub fn is_valid_point(&self, point: &Point) -> bool {
        match self.node(&point.path) {
            Some(node) if node.is_text() => point.offset <= node.text_len(),
            Some(node) if node.is_void() => point.offset == 0,
            _ => false,
        }
    }

    pub fn start_point(&self) -> Option<Point> {
        self.positions().into_iter().next().map(|path| Point::new(path, 0))
    }

    pub fn first_point_in(&self, path: &Path) -> Option<Point> {
        self.positions_within(path)
            .into_iter()
            .next()
            .map(|path| Point::new(path, 0))
    }

    pub fn last_point_in(&self, path: &Path) -> Option<Point> {
        let last = self.positions_within(path).pop()?;
        let offset = self.node(&last).map(Node::text_len).unwrap_or(0);
        Some(Point::new(last, offset))
    }

    /// First cursor position after the subtree at `path`
    pub fn point_after(&self, path: &Path) -> Option<Point> {
        self.positions()
            .into_iter()
            .find(|position| position > path && !path.contains(position))
            .map(|position| Point::new(position, 0))
    }

    /// Last cursor position before the subtree at `path`
    pub fn point_before(&self, path: &Path) -> Option<Point> {
        let position = self
            .positions()
            .into_iter()
            .filter(|position| position < path && !position.contains(path))
            .last()?;
        let offset = self.node(&position).map(Node::text_len).unwrap_or(0);
        Some(Point::new(position, offset))
    }

    /// Text of every text block, one line per block
    pub fn plain_text(&self) -> String {
        struct Lines(Vec<String>);

        impl Visitor for Lines {
            fn visit_node(&mut self, path: &Path, node: &Node) {
                if node.is_text_block() {
                    self.0.push(node.text_content());
                    return;
                }
                walk_node(self, path, node);
            }
        }

        let mut lines = Lines(Vec::new());
        walk_document(&mut lines, self);
        lines.0.join("\n")
    }

    /// Number of text characters in the document, ignoring structure
    pub fn text_len(&self) -> usize {
        self.children
            .iter()
            .map(|child| child.text_content().chars().count())
            .sum()
    }

    /// Nearest enclosing text block (paragraph, heading, code) of a position
    pub fn text_block_of(&self, path: &Path) -> Option<(Path, &Node)> {
        self.closest(path, Node::is_text_block)
    }

    /// Nearest enclosing layout
    pub fn layout_of(&self, path: &Path) -> Option<(Path, &Node)> {
        self.closest(path, |node| matches!(node.kind, NodeKind::Layout { .. }))
    }
}

fn split_path(path: &Path) -> ModelResult<(Path, usize)> {
    match (path.parent(), path.last()) {
        (Some(parent), Some(index)) => Ok((parent, index)),
        _ => Err(ModelError::invalid_path("the document root has no parent")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{ListKind, Mark};

    fn sample() -> Document {
        Document::new(vec![
            Node::heading(1, vec![Node::text("Title")]),
            Node::list(
                ListKind::Unordered,
                vec![
                    Node::list_item(vec![Node::paragraph(vec![Node::text("one")])]),
                    Node::list_item(vec![Node::paragraph(vec![
                        Node::text("two "),
                        Node::marked_text("bold", [Mark::Bold]),
                    ])]),
                ],
            ),
            Node::divider(),
        ])
    }

    #[test]
    fn test_node_lookup() {
        let doc = sample();
        let node = doc.node(&Path::new(vec![1, 1, 0, 1])).unwrap();
        assert_eq!(node.text_content(), "bold");
        assert!(doc.node(&Path::new(vec![5])).is_none());
        assert!(doc.node(&Path::root()).is_none());
    }

    #[test]
    fn test_path_of_follows_moves() {
        let mut doc = sample();
        let id = doc.node(&Path::new(vec![2])).unwrap().id;

        doc.insert_node(&Path::new(vec![0]), Node::empty_paragraph()).unwrap();
        assert_eq!(doc.path_of(id), Some(Path::new(vec![3])));

        doc.remove_node(&Path::new(vec![3])).unwrap();
        assert_eq!(doc.path_of(id), None);
    }

    #[test]
    fn test_positions_in_document_order() {
        let doc = sample();
        let positions: Vec<String> = doc.positions().iter().map(|p| p.to_string()).collect();
        assert_eq!(positions, vec!["0.0", "1.0.0.0", "1.1.0.0", "1.1.0.1", "2"]);
    }

    #[test]
    fn test_points_around_subtrees() {
        let doc = sample();
        let list = Path::new(vec![1]);

        assert_eq!(doc.point_before(&list), Some(Point::new(vec![0, 0], 5)));
        assert_eq!(doc.point_after(&list), Some(Point::new(vec![2], 0)));
        assert_eq!(doc.first_point_in(&list), Some(Point::new(vec![1, 0, 0, 0], 0)));
        assert_eq!(doc.last_point_in(&list), Some(Point::new(vec![1, 1, 0, 1], 4)));
    }

    #[test]
    fn test_point_validity() {
        let doc = sample();
        assert!(doc.is_valid_point(&Point::new(vec![0, 0], 5)));
        assert!(!doc.is_valid_point(&Point::new(vec![0, 0], 6)));
        assert!(doc.is_valid_point(&Point::new(vec![2], 0)));
        assert!(!doc.is_valid_point(&Point::new(vec![0], 0)));
    }

    #[test]
    fn test_json_round_trip() {
        let doc = sample();
        let json = doc.to_json().unwrap();
        let parsed = Document::from_json(&json).unwrap();
        assert_eq!(parsed, doc);
        assert_eq!(parsed.plain_text(), "Title\none\ntwo bold");
    }
}
