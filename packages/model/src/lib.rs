//! # Folio Document Model
//!
//! The schema-governed tree edited by `folio-editor`.
//!
//! ```text
//! Document
//!  ├─ paragraph / heading / code        (inline children)
//!  │    └─ text · link(text+) · relationship (void)
//!  ├─ blockquote                         (blocks)
//!  ├─ list ─ list-item+                  (blocks)
//!  ├─ layout ─ layout-area[ratios.len()] (blocks)
//!  ├─ component-block ─ component-slot*  (blocks)
//!  └─ divider (void)
//! ```
//!
//! Nodes are addressed by [`Path`]; cursor locations are [`Point`]s on text
//! runs or void nodes. Every node carries a [`NodeId`] that survives moves,
//! which is what selections are re-anchored through after a mutation.

pub mod document;
pub mod error;
pub mod id;
pub mod invariants;
pub mod node;
pub mod path;
pub mod selection;
pub mod visitor;

pub use document::Document;
pub use error::{ModelError, ModelResult};
pub use id::NodeId;
pub use invariants::{check_structure, Violation, ViolationKind};
pub use node::{byte_index, ListKind, Mark, Node, NodeKind, RelationshipData, TextAlign};
pub use path::Path;
pub use selection::{Point, Selection};
pub use visitor::{walk_document, walk_document_mut, walk_node, walk_node_mut, Visitor, VisitorMut};
