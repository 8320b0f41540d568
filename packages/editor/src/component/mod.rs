//! # Component Blocks
//!
//! Typed custom blocks: a schema per registered component, the descriptor
//! tree renderers bind to, and the change path back into the document.
//!
//! ```text
//! ComponentSchema ──derive_preview──▶ PreviewProps (Arc tree)
//!        ▲                                  │ setter
//!        │                                  ▼
//!   coerce/validate ◀──apply_change──── PropsChange
//! ```
//!
//! A block whose component key is not registered is shown as a
//! [`ComponentView::Placeholder`] and its raw props are never touched.

pub mod change;
pub mod fields;
pub mod preview;
pub mod registry;
pub mod schema;

pub use change::{apply_change, PropPath, PropPathSegment, PropsChange, PropsError, PropsOp};
pub use preview::{
    derive_preview, ArrayProps, ConditionalProps, FormProps, ObjectProps, PreviewProps, PropsEditor,
    RelationshipProps,
};
pub use registry::{ComponentBlockDefinition, ComponentRegistry, DefaultPropsFactory};
pub use schema::{
    coerce, initial_value, validate, ArrayField, ComponentSchema, ConditionalField, FormField,
    FormFieldKind, ObjectField, RelationshipField, SelectOption,
};

use serde_json::Value;
use std::sync::Arc;

/// What the rendering surface shows for a component block node
#[derive(Debug, Clone)]
pub enum ComponentView {
    Block {
        definition: Arc<ComponentBlockDefinition>,
        props: PropsEditor,
    },
    /// Inert diagnostic for an unregistered component
    Placeholder { component: String, props: Value },
}

impl ComponentView {
    pub fn resolve(registry: &ComponentRegistry, component: &str, props: &Value) -> Self {
        match registry.get(component) {
            Some(definition) => ComponentView::Block {
                props: definition.props_editor(props),
                definition: Arc::clone(definition),
            },
            None => ComponentView::Placeholder {
                component: component.to_string(),
                props: props.clone(),
            },
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, ComponentView::Placeholder { .. })
    }
}
