use crate::id::NodeId;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::collections::BTreeSet;

/// Boolean formatting attribute applied to a text run
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Mark {
    Bold,
    Italic,
    Underline,
    Strikethrough,
    Code,
    Keyboard,
    Subscript,
    Superscript,
}

impl Mark {
    pub const ALL: [Mark; 8] = [
        Mark::Bold,
        Mark::Italic,
        Mark::Underline,
        Mark::Strikethrough,
        Mark::Code,
        Mark::Keyboard,
        Mark::Subscript,
        Mark::Superscript,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Mark::Bold => "bold",
            Mark::Italic => "italic",
            Mark::Underline => "underline",
            Mark::Strikethrough => "strikethrough",
            Mark::Code => "code",
            Mark::Keyboard => "keyboard",
            Mark::Subscript => "subscript",
            Mark::Superscript => "superscript",
        }
    }
}

/// Non-default alignment of a paragraph or heading. Start alignment is the
/// absence of a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TextAlign {
    Center,
    End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ListKind {
    Ordered,
    Unordered,
}

impl ListKind {
    pub fn other(self) -> Self {
        match self {
            ListKind::Ordered => ListKind::Unordered,
            ListKind::Unordered => ListKind::Ordered,
        }
    }
}

/// Linked external record stored on a relationship node or field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipData {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub data: Value,
}

impl RelationshipData {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: Some(label.into()),
            data: Value::Null,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }
}

/// Node payload. The serialized form is `{type, ...attrs, children?}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum NodeKind {
    Paragraph {
        #[serde(rename = "textAlign", default, skip_serializing_if = "Option::is_none")]
        text_align: Option<TextAlign>,
        #[serde(default)]
        children: Vec<Node>,
    },

    Heading {
        level: u8,
        #[serde(rename = "textAlign", default, skip_serializing_if = "Option::is_none")]
        text_align: Option<TextAlign>,
        #[serde(default)]
        children: Vec<Node>,
    },

    Blockquote {
        #[serde(default)]
        children: Vec<Node>,
    },

    /// Code block; holds unmarked text runs only
    Code {
        #[serde(default)]
        children: Vec<Node>,
    },

    Divider,

    List {
        kind: ListKind,
        #[serde(default)]
        children: Vec<Node>,
    },

    ListItem {
        #[serde(default)]
        children: Vec<Node>,
    },

    Layout {
        ratios: Vec<u32>,
        #[serde(default)]
        children: Vec<Node>,
    },

    LayoutArea {
        #[serde(default)]
        children: Vec<Node>,
    },

    /// Typed custom block. `props` is kept verbatim so that blocks whose
    /// component is not registered survive a round trip untouched.
    ComponentBlock {
        component: String,
        #[serde(default)]
        props: Value,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        children: Vec<Node>,
    },

    /// Named slot of a component block
    ComponentSlot {
        name: String,
        #[serde(default)]
        children: Vec<Node>,
    },

    Relationship {
        relationship: String,
        #[serde(default)]
        data: Option<RelationshipData>,
    },

    Link {
        href: String,
        #[serde(default)]
        children: Vec<Node>,
    },

    Text {
        #[serde(default)]
        text: String,
        #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
        marks: BTreeSet<Mark>,
    },
}

impl NodeKind {
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Paragraph { .. } => "paragraph",
            NodeKind::Heading { .. } => "heading",
            NodeKind::Blockquote { .. } => "blockquote",
            NodeKind::Code { .. } => "code",
            NodeKind::Divider => "divider",
            NodeKind::List { .. } => "list",
            NodeKind::ListItem { .. } => "list-item",
            NodeKind::Layout { .. } => "layout",
            NodeKind::LayoutArea { .. } => "layout-area",
            NodeKind::ComponentBlock { .. } => "component-block",
            NodeKind::ComponentSlot { .. } => "component-slot",
            NodeKind::Relationship { .. } => "relationship",
            NodeKind::Link { .. } => "link",
            NodeKind::Text { .. } => "text",
        }
    }
}

/// A document node: identity plus payload.
///
/// Equality and serialization only consider the payload, so two documents
/// with the same structure compare equal regardless of their ids.
#[derive(Debug, Clone)]
pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
    }
}

impl Serialize for Node {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.kind.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Node {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        NodeKind::deserialize(deserializer).map(Node::new)
    }
}

impl Node {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            id: NodeId::next(),
            kind,
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::new(NodeKind::Text {
            text: text.into(),
            marks: BTreeSet::new(),
        })
    }

    pub fn marked_text(text: impl Into<String>, marks: impl IntoIterator<Item = Mark>) -> Self {
        Self::new(NodeKind::Text {
            text: text.into(),
            marks: marks.into_iter().collect(),
        })
    }

    pub fn paragraph(children: Vec<Node>) -> Self {
        Self::new(NodeKind::Paragraph {
            text_align: None,
            children,
        })
    }

    pub fn empty_paragraph() -> Self {
        Self::paragraph(vec![Node::text("")])
    }

    pub fn heading(level: u8, children: Vec<Node>) -> Self {
        Self::new(NodeKind::Heading {
            level,
            text_align: None,
            children,
        })
    }

    pub fn blockquote(children: Vec<Node>) -> Self {
        Self::new(NodeKind::Blockquote { children })
    }

    pub fn code(text: impl Into<String>) -> Self {
        Self::new(NodeKind::Code {
            children: vec![Node::text(text)],
        })
    }

    pub fn divider() -> Self {
        Self::new(NodeKind::Divider)
    }

    pub fn list(kind: ListKind, items: Vec<Node>) -> Self {
        Self::new(NodeKind::List {
            kind,
            children: items,
        })
    }

    pub fn list_item(children: Vec<Node>) -> Self {
        Self::new(NodeKind::ListItem { children })
    }

    pub fn layout(ratios: Vec<u32>, areas: Vec<Node>) -> Self {
        Self::new(NodeKind::Layout {
            ratios,
            children: areas,
        })
    }

    pub fn layout_area(children: Vec<Node>) -> Self {
        Self::new(NodeKind::LayoutArea { children })
    }

    pub fn component_block(component: impl Into<String>, props: Value, slots: Vec<Node>) -> Self {
        Self::new(NodeKind::ComponentBlock {
            component: component.into(),
            props,
            children: slots,
        })
    }

    pub fn component_slot(name: impl Into<String>, children: Vec<Node>) -> Self {
        Self::new(NodeKind::ComponentSlot {
            name: name.into(),
            children,
        })
    }

    pub fn relationship(relationship: impl Into<String>, data: Option<RelationshipData>) -> Self {
        Self::new(NodeKind::Relationship {
            relationship: relationship.into(),
            data,
        })
    }

    pub fn link(href: impl Into<String>, children: Vec<Node>) -> Self {
        Self::new(NodeKind::Link {
            href: href.into(),
            children,
        })
    }

    /// Child nodes, or `None` for leaves (text, divider, relationship)
    pub fn children(&self) -> Option<&Vec<Node>> {
        match &self.kind {
            NodeKind::Paragraph { children, .. }
            | NodeKind::Heading { children, .. }
            | NodeKind::Blockquote { children }
            | NodeKind::Code { children }
            | NodeKind::List { children, .. }
            | NodeKind::ListItem { children }
            | NodeKind::Layout { children, .. }
            | NodeKind::LayoutArea { children }
            | NodeKind::ComponentBlock { children, .. }
            | NodeKind::ComponentSlot { children, .. }
            | NodeKind::Link { children, .. } => Some(children),
            NodeKind::Divider | NodeKind::Relationship { .. } | NodeKind::Text { .. } => None,
        }
    }

    pub fn children_mut(&mut self) -> Option<&mut Vec<Node>> {
        match &mut self.kind {
            NodeKind::Paragraph { children, .. }
            | NodeKind::Heading { children, .. }
            | NodeKind::Blockquote { children }
            | NodeKind::Code { children }
            | NodeKind::List { children, .. }
            | NodeKind::ListItem { children }
            | NodeKind::Layout { children, .. }
            | NodeKind::LayoutArea { children }
            | NodeKind::ComponentBlock { children, .. }
            | NodeKind::ComponentSlot { children, .. }
            | NodeKind::Link { children, .. } => Some(children),
            NodeKind::Divider | NodeKind::Relationship { .. } | NodeKind::Text { .. } => None,
        }
    }

    /// Take the children out, leaving an empty list behind
    pub fn take_children(&mut self) -> Vec<Node> {
        self.children_mut().map(std::mem::take).unwrap_or_default()
    }

    pub fn is_text(&self) -> bool {
        matches!(self.kind, NodeKind::Text { .. })
    }

    pub fn is_inline(&self) -> bool {
        matches!(
            self.kind,
            NodeKind::Text { .. } | NodeKind::Link { .. } | NodeKind::Relationship { .. }
        )
    }

    pub fn is_block(&self) -> bool {
        !self.is_inline()
    }

    /// Blocks whose children are inline content
    pub fn is_text_block(&self) -> bool {
        matches!(
            self.kind,
            NodeKind::Paragraph { .. } | NodeKind::Heading { .. } | NodeKind::Code { .. }
        )
    }

    /// Nodes with no directly editable text. A component block without slots
    /// is void: its props only change through setter chains.
    pub fn is_void(&self) -> bool {
        match &self.kind {
            NodeKind::Divider | NodeKind::Relationship { .. } => true,
            NodeKind::ComponentBlock { children, .. } => children.is_empty(),
            _ => false,
        }
    }

    pub fn marks(&self) -> Option<&BTreeSet<Mark>> {
        match &self.kind {
            NodeKind::Text { marks, .. } => Some(marks),
            _ => None,
        }
    }

    /// Length of a text run in characters; zero for everything else
    pub fn text_len(&self) -> usize {
        match &self.kind {
            NodeKind::Text { text, .. } => text.chars().count(),
            _ => 0,
        }
    }

    /// Concatenated text of all descendant runs
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match &self.kind {
            NodeKind::Text { text, .. } => out.push_str(text),
            _ => {
                if let Some(children) = self.children() {
                    for child in children {
                        child.collect_text(out);
                    }
                }
            }
        }
    }

    /// Re-mint the ids of this node and all descendants
    pub fn refresh_ids(&mut self) {
        self.id = NodeId::next();
        if let Some(children) = self.children_mut() {
            for child in children {
                child.refresh_ids();
            }
        }
    }

    pub fn kind_name(&self) -> &'static str {
        self.kind.name()
    }
}

/// Byte index of the `offset`-th character, clamped to the end
pub fn byte_index(text: &str, offset: usize) -> usize {
    text.char_indices()
        .nth(offset)
        .map(|(index, _)| index)
        .unwrap_or(text.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_serialized_shape() {
        let node = Node::heading(2, vec![Node::marked_text("Title", [Mark::Bold])]);
        let value = serde_json::to_value(&node).unwrap();

        assert_eq!(
            value,
            json!({
                "type": "heading",
                "level": 2,
                "children": [{ "type": "text", "text": "Title", "marks": ["bold"] }]
            })
        );
    }

    #[test]
    fn test_deserialize_mints_fresh_ids() {
        let node = Node::paragraph(vec![Node::text("a")]);
        let json = serde_json::to_string(&node).unwrap();

        let copy: Node = serde_json::from_str(&json).unwrap();
        assert_eq!(copy, node);
        assert_ne!(copy.id, node.id);
    }

    #[test]
    fn test_void_classification() {
        assert!(Node::divider().is_void());
        assert!(Node::relationship("post", None).is_void());
        assert!(Node::component_block("hero", json!({}), vec![]).is_void());
        assert!(!Node::component_block(
            "hero",
            json!({}),
            vec![Node::component_slot("content", vec![Node::empty_paragraph()])]
        )
        .is_void());
        assert!(!Node::empty_paragraph().is_void());
    }

    #[test]
    fn test_text_content_and_length() {
        let node = Node::paragraph(vec![
            Node::text("héllo "),
            Node::link("https://example.com", vec![Node::text("world")]),
            Node::relationship("post", Some(RelationshipData::new("1", "First"))),
        ]);

        assert_eq!(node.text_content(), "héllo world");
        assert_eq!(Node::text("héllo").text_len(), 5);
        assert_eq!(byte_index("héllo", 2), 3);
        assert_eq!(byte_index("héllo", 99), "héllo".len());
    }
}
