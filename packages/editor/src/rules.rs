//! Containment rules and selection-range queries.
//!
//! Transforms check these before mutating, and feature-state derivation uses
//! the same functions to decide what the toolbar offers. Keeping one source
//! for both means a control is enabled exactly when its command would apply.

use crate::component::ComponentRegistry;
use folio_model::{Document, ListKind, Node, NodeKind, Path, Point};

/// Whether `child` may be placed directly inside the node at `parent`
pub fn can_contain(doc: &Document, parent: &Path, child: &Node) -> bool {
    if matches!(child.kind, NodeKind::Layout { .. }) && doc.layout_of(parent).is_some() {
        return false;
    }
    if parent.is_root() {
        return block_container_accepts(child);
    }
    match doc.node(parent) {
        Some(node) => kind_accepts(&node.kind, child),
        None => false,
    }
}

/// Children allowed in the root, layout areas and component slots
fn block_container_accepts(child: &Node) -> bool {
    child.is_block()
        && !matches!(
            child.kind,
            NodeKind::ListItem { .. } | NodeKind::LayoutArea { .. } | NodeKind::ComponentSlot { .. }
        )
}

/// Whether a node of kind `parent` may hold `child`, ignoring where the
/// parent itself sits
pub fn kind_accepts(parent: &NodeKind, child: &Node) -> bool {
    match parent {
        NodeKind::LayoutArea { .. } | NodeKind::ComponentSlot { .. } => block_container_accepts(child),
        NodeKind::Blockquote { .. } => matches!(
            child.kind,
            NodeKind::Paragraph { .. }
                | NodeKind::Heading { .. }
                | NodeKind::List { .. }
                | NodeKind::Code { .. }
                | NodeKind::Divider
        ),
        NodeKind::ListItem { .. } => matches!(
            child.kind,
            NodeKind::Paragraph { .. } | NodeKind::List { .. } | NodeKind::Code { .. }
        ),
        NodeKind::List { .. } => matches!(child.kind, NodeKind::ListItem { .. }),
        NodeKind::Layout { .. } => matches!(child.kind, NodeKind::LayoutArea { .. }),
        NodeKind::ComponentBlock { .. } => matches!(child.kind, NodeKind::ComponentSlot { .. }),
        NodeKind::Paragraph { .. } | NodeKind::Heading { .. } => child.is_inline(),
        NodeKind::Code { .. } | NodeKind::Link { .. } => child.is_text(),
        NodeKind::Divider | NodeKind::Relationship { .. } | NodeKind::Text { .. } => false,
    }
}

/// Nearest block at or above a position: its text block, or the void block
/// itself
pub fn block_of(doc: &Document, path: &Path) -> Option<Path> {
    doc.closest(path, Node::is_block).map(|(path, _)| path)
}

/// Inside a component block whose key is not registered. Such content is
/// kept verbatim and never edited.
pub fn in_placeholder(doc: &Document, path: &Path, components: &ComponentRegistry) -> bool {
    doc.closest(path, |node| {
        matches!(&node.kind, NodeKind::ComponentBlock { component, .. } if components.get(component).is_none())
    })
    .is_some()
}

pub fn in_code(doc: &Document, path: &Path) -> bool {
    matches!(
        doc.text_block_of(path),
        Some((_, Node { kind: NodeKind::Code { .. }, .. }))
    )
}

/// Text runs a range actually covers, in document order.
///
/// A collapsed range covers the run it sits in. Otherwise the start run is
/// skipped when the range starts at its very end, and the end run when the
/// range stops at its very beginning. Void nodes are never included.
pub fn text_leaves_in_range(doc: &Document, start: &Point, end: &Point) -> Vec<Path> {
    if start == end {
        return match doc.node(&start.path) {
            Some(node) if node.is_text() => vec![start.path.clone()],
            _ => Vec::new(),
        };
    }

    let same_leaf = start.path == end.path;
    doc.positions()
        .into_iter()
        .filter(|path| *path >= start.path && *path <= end.path)
        .filter(|path| {
            let Some(node) = doc.node(path) else {
                return false;
            };
            if !node.is_text() {
                return false;
            }
            if same_leaf {
                return true;
            }
            if *path == start.path {
                return start.offset < node.text_len();
            }
            if *path == end.path {
                return end.offset > 0;
            }
            true
        })
        .collect()
}

/// Blocks holding the positions of a range, in document order
pub fn blocks_in_range(doc: &Document, start: &Point, end: &Point) -> Vec<Path> {
    let mut blocks: Vec<Path> = Vec::new();
    for position in doc.positions() {
        if position < start.path || position > end.path {
            continue;
        }
        if let Some(block) = block_of(doc, &position) {
            if blocks.last() != Some(&block) {
                blocks.push(block);
            }
        }
    }
    blocks
}

/// Contiguous run of siblings `parent[start..=end]` covering a range
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiblingRange {
    pub parent: Path,
    pub start: usize,
    pub end: usize,
}

impl SiblingRange {
    pub fn paths(&self) -> Vec<Path> {
        (self.start..=self.end).map(|i| self.parent.child(i)).collect()
    }
}

/// The siblings a wrapping command (list, blockquote) operates on. Lists,
/// layouts and component blocks are never split; a range inside them is
/// widened to the whole container.
pub fn sibling_range(doc: &Document, start: &Point, end: &Point) -> Option<SiblingRange> {
    let first = block_of(doc, &start.path)?;
    let last = block_of(doc, &end.path)?;

    let mut range = if first == last {
        let index = first.last()?;
        SiblingRange {
            parent: first.parent()?,
            start: index,
            end: index,
        }
    } else {
        let parent = first.common_ancestor(&last);
        let depth = parent.len();
        SiblingRange {
            start: *first.indices().get(depth)?,
            end: *last.indices().get(depth)?,
            parent,
        }
    };

    while !range.parent.is_root() {
        let structural = matches!(
            doc.node(&range.parent).map(|node| &node.kind),
            Some(NodeKind::List { .. }) | Some(NodeKind::Layout { .. }) | Some(NodeKind::ComponentBlock { .. })
        );
        if !structural {
            break;
        }
        let index = range.parent.last()?;
        range = SiblingRange {
            parent: range.parent.parent()?,
            start: index,
            end: index,
        };
    }

    Some(range)
}

/// Whether every sibling in `range` can become a list item, in a place that
/// accepts a list
pub fn can_wrap_in_list(doc: &Document, range: &SiblingRange) -> bool {
    can_contain(doc, &range.parent, &Node::list(ListKind::Unordered, Vec::new()))
        && range.paths().iter().all(|path| {
            doc.node(path).map_or(false, |node| {
                matches!(
                    node.kind,
                    NodeKind::Paragraph { .. } | NodeKind::Heading { .. } | NodeKind::Code { .. } | NodeKind::List { .. }
                )
            })
        })
}

pub fn can_wrap_in_blockquote(doc: &Document, range: &SiblingRange) -> bool {
    let quote = NodeKind::Blockquote { children: Vec::new() };
    can_contain(doc, &range.parent, &Node::blockquote(Vec::new()))
        && range
            .paths()
            .iter()
            .all(|path| doc.node(path).map_or(false, |node| kind_accepts(&quote, node)))
}

/// A paragraph or heading without inline relationships, in a container that
/// accepts code
pub fn can_become_code(doc: &Document, path: &Path) -> bool {
    let Some(node) = doc.node(path) else {
        return false;
    };
    let has_relationship = node.children().map_or(false, |children| {
        children
            .iter()
            .any(|child| matches!(child.kind, NodeKind::Relationship { .. }))
    });
    matches!(node.kind, NodeKind::Paragraph { .. } | NodeKind::Heading { .. })
        && !has_relationship
        && path
            .parent()
            .map_or(false, |parent| can_contain(doc, &parent, &Node::code("")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_model::{ListKind, Mark};

    fn doc() -> Document {
        Document::new(vec![
            Node::paragraph(vec![Node::text("plain "), Node::marked_text("bold", [Mark::Bold])]),
            Node::list(
                ListKind::Unordered,
                vec![
                    Node::list_item(vec![Node::paragraph(vec![Node::text("one")])]),
                    Node::list_item(vec![Node::paragraph(vec![Node::text("two")])]),
                ],
            ),
            Node::layout(vec![1], vec![Node::layout_area(vec![Node::empty_paragraph()])]),
            Node::code("let x;"),
        ])
    }

    #[test]
    fn test_containment() {
        let doc = doc();
        let layout = Node::layout(vec![1], vec![]);

        assert!(can_contain(&doc, &Path::root(), &layout));
        assert!(!can_contain(&doc, &Path::new(vec![2, 0]), &layout));
        assert!(can_contain(&doc, &Path::new(vec![2, 0]), &Node::divider()));
        assert!(!can_contain(&doc, &Path::new(vec![1, 0]), &Node::heading(1, vec![])));
        assert!(can_contain(&doc, &Path::new(vec![1, 0]), &Node::code("")));
        assert!(!can_contain(&doc, &Path::new(vec![1]), &Node::empty_paragraph()));
        assert!(!can_contain(&doc, &Path::new(vec![3]), &Node::link("x", vec![])));
        assert!(!can_contain(&doc, &Path::new(vec![9]), &Node::text("")));
    }

    #[test]
    fn test_leaves_skip_touching_edges() {
        let doc = doc();
        // from the end of "plain " to the middle of "bold"
        let leaves = text_leaves_in_range(&doc, &Point::new(vec![0, 0], 6), &Point::new(vec![0, 1], 2));
        assert_eq!(leaves, vec![Path::new(vec![0, 1])]);

        // from the middle of "plain " to the start of "one"
        let leaves = text_leaves_in_range(&doc, &Point::new(vec![0, 0], 1), &Point::new(vec![1, 0, 0, 0], 0));
        assert_eq!(leaves, vec![Path::new(vec![0, 0]), Path::new(vec![0, 1])]);

        let leaves = text_leaves_in_range(&doc, &Point::new(vec![0, 1], 2), &Point::new(vec![0, 1], 2));
        assert_eq!(leaves, vec![Path::new(vec![0, 1])]);
    }

    #[test]
    fn test_blocks_and_code_detection() {
        let doc = doc();
        let blocks = blocks_in_range(&doc, &Point::new(vec![0, 0], 0), &Point::new(vec![1, 1, 0, 0], 1));
        assert_eq!(
            blocks,
            vec![Path::new(vec![0]), Path::new(vec![1, 0, 0]), Path::new(vec![1, 1, 0])]
        );
        assert!(in_code(&doc, &Path::new(vec![3, 0])));
        assert!(!in_code(&doc, &Path::new(vec![0, 0])));
    }

    #[test]
    fn test_sibling_range_widens_to_list() {
        let doc = doc();
        let range = sibling_range(&doc, &Point::new(vec![1, 0, 0, 0], 0), &Point::new(vec![1, 1, 0, 0], 0)).unwrap();
        assert_eq!(
            range,
            SiblingRange {
                parent: Path::root(),
                start: 1,
                end: 1
            }
        );

        let range = sibling_range(&doc, &Point::new(vec![0, 0], 0), &Point::new(vec![1, 0, 0, 0], 0)).unwrap();
        assert_eq!((range.start, range.end), (0, 1));

        let single = sibling_range(&doc, &Point::new(vec![1, 0, 0, 0], 0), &Point::new(vec![1, 0, 0, 0], 2)).unwrap();
        assert_eq!(single.parent, Path::new(vec![1, 0]));
    }

    #[test]
    fn test_wrapping_checks() {
        let doc = doc();
        let item = sibling_range(&doc, &Point::new(vec![1, 0, 0, 0], 0), &Point::new(vec![1, 0, 0, 0], 0)).unwrap();
        assert!(can_wrap_in_list(&doc, &item));
        assert!(!can_wrap_in_blockquote(&doc, &item));

        let with_layout = sibling_range(&doc, &Point::new(vec![0, 0], 0), &Point::new(vec![2, 0, 0, 0], 0)).unwrap();
        assert!(!can_wrap_in_list(&doc, &with_layout));
        assert!(!can_wrap_in_blockquote(&doc, &with_layout));

        assert!(can_become_code(&doc, &Path::new(vec![0])));
        assert!(!can_become_code(&doc, &Path::new(vec![3])));
    }
}
