use crate::document::Document;
use crate::node::Node;
use crate::path::Path;

/// Visitor pattern for traversing document nodes immutably
///
/// The default implementation walks the entire tree in document order.
/// Override `visit_node` to act on nodes; call [`walk_node`] to descend.
pub trait Visitor: Sized {
    fn visit_node(&mut self, path: &Path, node: &Node) {
        walk_node(self, path, node);
    }
}

/// Mutable visitor for rewriting nodes in place
pub trait VisitorMut: Sized {
    fn visit_node_mut(&mut self, node: &mut Node) {
        walk_node_mut(self, node);
    }
}

pub fn walk_document<V: Visitor>(visitor: &mut V, doc: &Document) {
    for (index, child) in doc.children.iter().enumerate() {
        visitor.visit_node(&Path::new(vec![index]), child);
    }
}

pub fn walk_node<V: Visitor>(visitor: &mut V, path: &Path, node: &Node) {
    if let Some(children) = node.children() {
        for (index, child) in children.iter().enumerate() {
            visitor.visit_node(&path.child(index), child);
        }
    }
}

pub fn walk_document_mut<V: VisitorMut>(visitor: &mut V, doc: &mut Document) {
    for child in doc.children.iter_mut() {
        visitor.visit_node_mut(child);
    }
}

pub fn walk_node_mut<V: VisitorMut>(visitor: &mut V, node: &mut Node) {
    if let Some(children) = node.children_mut() {
        for child in children.iter_mut() {
            visitor.visit_node_mut(child);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::NodeKind;

    struct KindCollector(Vec<(String, &'static str)>);

    impl Visitor for KindCollector {
        fn visit_node(&mut self, path: &Path, node: &Node) {
            self.0.push((path.to_string(), node.kind_name()));
            walk_node(self, path, node);
        }
    }

    struct Uppercase;

    impl VisitorMut for Uppercase {
        fn visit_node_mut(&mut self, node: &mut Node) {
            if let NodeKind::Text { text, .. } = &mut node.kind {
                *text = text.to_uppercase();
            }
            walk_node_mut(self, node);
        }
    }

    #[test]
    fn test_walk_in_document_order() {
        let doc = Document::new(vec![
            Node::paragraph(vec![Node::text("a")]),
            Node::blockquote(vec![Node::paragraph(vec![Node::text("b")])]),
        ]);

        let mut collector = KindCollector(Vec::new());
        walk_document(&mut collector, &doc);

        let visited: Vec<_> = collector.0.iter().map(|(p, k)| format!("{}={}", p, k)).collect();
        assert_eq!(
            visited,
            vec![
                "0=paragraph",
                "0.0=text",
                "1=blockquote",
                "1.0=paragraph",
                "1.0.0=text"
            ]
        );
    }

    #[test]
    fn test_mutable_walk() {
        let mut doc = Document::new(vec![Node::paragraph(vec![Node::text("shout")])]);
        walk_document_mut(&mut Uppercase, &mut doc);
        assert_eq!(doc.plain_text(), "SHOUT");
    }
}
