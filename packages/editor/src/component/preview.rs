//! # Preview Props
//!
//! A tree of bound descriptors mirroring a component's schema. Renderers
//! read values from it and call its setters, which return [`PropsChange`]s
//! for the editor to apply.
//!
//! [`PropsEditor`] keeps a derived tree in sync with the props value. After a
//! change only the descriptors along the changed path are rebuilt; every
//! untouched sibling is the same `Arc` as before.

use super::change::{apply_change, PropPath, PropPathSegment, PropsChange, PropsError, PropsOp};
use super::schema::{coerce, ComponentSchema, ConditionalField, FormField};
use folio_model::RelationshipData;
use serde_json::Value;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub enum PreviewProps {
    Form(FormProps),
    Object(ObjectProps),
    Array(ArrayProps),
    Conditional(ConditionalProps),
    Relationship(RelationshipProps),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FormProps {
    pub path: PropPath,
    pub field: FormField,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectProps {
    pub path: PropPath,
    pub fields: Vec<(String, Arc<PreviewProps>)>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArrayProps {
    pub path: PropPath,
    pub elements: Vec<Arc<PreviewProps>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConditionalProps {
    pub path: PropPath,
    pub discriminant: Value,
    pub value: Arc<PreviewProps>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RelationshipProps {
    pub path: PropPath,
    pub relationship: String,
    pub many: bool,
    pub value: Vec<RelationshipData>,
}

impl PreviewProps {
    pub fn path(&self) -> &PropPath {
        match self {
            PreviewProps::Form(p) => &p.path,
            PreviewProps::Object(p) => &p.path,
            PreviewProps::Array(p) => &p.path,
            PreviewProps::Conditional(p) => &p.path,
            PreviewProps::Relationship(p) => &p.path,
        }
    }

    pub fn as_form(&self) -> Option<&FormProps> {
        match self {
            PreviewProps::Form(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectProps> {
        match self {
            PreviewProps::Object(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ArrayProps> {
        match self {
            PreviewProps::Array(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_conditional(&self) -> Option<&ConditionalProps> {
        match self {
            PreviewProps::Conditional(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_relationship(&self) -> Option<&RelationshipProps> {
        match self {
            PreviewProps::Relationship(p) => Some(p),
            _ => None,
        }
    }
}

impl FormProps {
    pub fn set(&self, value: Value) -> PropsChange {
        PropsChange::new(self.path.clone(), PropsOp::Set { value })
    }
}

impl ObjectProps {
    pub fn field(&self, key: &str) -> Option<&Arc<PreviewProps>> {
        self.fields
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, props)| props)
    }

    /// Replace the whole object
    pub fn set(&self, value: Value) -> PropsChange {
        PropsChange::new(self.path.clone(), PropsOp::Set { value })
    }
}

impl ArrayProps {
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn element(&self, index: usize) -> Option<&Arc<PreviewProps>> {
        self.elements.get(index)
    }

    /// Insert the element schema's initial value at `index`
    pub fn insert(&self, index: usize) -> PropsChange {
        PropsChange::new(self.path.clone(), PropsOp::Insert { index, value: None })
    }

    pub fn insert_value(&self, index: usize, value: Value) -> PropsChange {
        PropsChange::new(
            self.path.clone(),
            PropsOp::Insert {
                index,
                value: Some(value),
            },
        )
    }

    pub fn push(&self) -> PropsChange {
        self.insert(self.elements.len())
    }

    pub fn remove(&self, index: usize) -> PropsChange {
        PropsChange::new(self.path.clone(), PropsOp::Remove { index })
    }

    pub fn move_item(&self, from: usize, to: usize) -> PropsChange {
        PropsChange::new(self.path.clone(), PropsOp::Move { from, to })
    }
}

impl ConditionalProps {
    /// Switch to another branch; its value starts at the branch defaults
    pub fn switch(&self, discriminant: Value) -> PropsChange {
        PropsChange::new(self.path.clone(), PropsOp::Switch { discriminant })
    }
}

impl RelationshipProps {
    /// Link a single record, or clear the field with `None`
    pub fn set(&self, data: Option<RelationshipData>) -> PropsChange {
        let value = match (self.many, data) {
            (true, data) => Value::Array(data.into_iter().filter_map(to_value).collect()),
            (false, Some(data)) => to_value(data).unwrap_or(Value::Null),
            (false, None) => Value::Null,
        };
        PropsChange::new(self.path.clone(), PropsOp::Set { value })
    }

    pub fn set_many(&self, data: Vec<RelationshipData>) -> PropsChange {
        let value = Value::Array(data.into_iter().filter_map(to_value).collect());
        PropsChange::new(self.path.clone(), PropsOp::Set { value })
    }

    /// `(id, label)` of every linked record
    pub fn linked(&self) -> Vec<(&str, Option<&str>)> {
        self.value
            .iter()
            .map(|data| (data.id.as_str(), data.label.as_deref()))
            .collect()
    }
}

fn to_value(data: RelationshipData) -> Option<Value> {
    serde_json::to_value(data).ok()
}

/// Derive the descriptor tree for a (coerced) value
pub fn derive_preview(schema: &ComponentSchema, value: &Value, path: PropPath) -> PreviewProps {
    match schema {
        ComponentSchema::Form(field) => PreviewProps::Form(FormProps {
            path,
            field: field.clone(),
            value: value.clone(),
        }),
        ComponentSchema::Object(object) => PreviewProps::Object(ObjectProps {
            fields: object
                .fields
                .iter()
                .map(|(key, field)| {
                    let child = derive_preview(field, &value[key.as_str()], path.field(key));
                    (key.clone(), Arc::new(child))
                })
                .collect(),
            path,
        }),
        ComponentSchema::Array(array) => PreviewProps::Array(ArrayProps {
            elements: derive_elements(&array.element, value, &path, 0),
            path,
        }),
        ComponentSchema::Conditional(conditional) => derive_conditional(conditional, value, path),
        ComponentSchema::Relationship(field) => {
            let value = match value {
                Value::Array(items) => items.iter().filter_map(parse_relationship).collect(),
                Value::Null => Vec::new(),
                other => parse_relationship(other).into_iter().collect(),
            };
            PreviewProps::Relationship(RelationshipProps {
                path,
                relationship: field.relationship.clone(),
                many: field.many,
                value,
            })
        }
    }
}

fn parse_relationship(value: &Value) -> Option<RelationshipData> {
    serde_json::from_value(value.clone()).ok()
}

fn derive_elements(
    element: &ComponentSchema,
    value: &Value,
    path: &PropPath,
    from: usize,
) -> Vec<Arc<PreviewProps>> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .enumerate()
                .skip(from)
                .map(|(index, item)| Arc::new(derive_preview(element, item, path.index(index))))
                .collect()
        })
        .unwrap_or_default()
}

fn derive_conditional(conditional: &ConditionalField, value: &Value, path: PropPath) -> PreviewProps {
    let discriminant = value["discriminant"].clone();
    let branch = match conditional.branch(&discriminant) {
        Some(schema) => derive_preview(schema, &value["value"], path.branch()),
        None => PreviewProps::Object(ObjectProps {
            path: path.branch(),
            fields: Vec::new(),
        }),
    };
    PreviewProps::Conditional(ConditionalProps {
        path,
        discriminant,
        value: Arc::new(branch),
    })
}

/// Re-derive only what `change` touched, sharing everything else with `old`
fn rederive(
    old: &Arc<PreviewProps>,
    schema: &ComponentSchema,
    value: &Value,
    rest: &[PropPathSegment],
    op: &PropsOp,
) -> Arc<PreviewProps> {
    let path = old.path().clone();

    let Some((segment, rest)) = rest.split_first() else {
        // the changed node itself; arrays keep the elements before the edit
        if let (PreviewProps::Array(array), ComponentSchema::Array(array_schema)) = (&**old, schema) {
            let unchanged = match op {
                PropsOp::Insert { index, .. } | PropsOp::Remove { index } => *index,
                PropsOp::Move { from, to } => (*from).min(*to),
                _ => 0,
            };
            let unchanged = unchanged.min(array.elements.len());
            let mut elements: Vec<_> = array.elements[..unchanged].to_vec();
            elements.extend(derive_elements(&array_schema.element, value, &path, unchanged));
            return Arc::new(PreviewProps::Array(ArrayProps { path, elements }));
        }
        return Arc::new(derive_preview(schema, value, path));
    };

    match (segment, &**old, schema) {
        (PropPathSegment::Field(key), PreviewProps::Object(object), ComponentSchema::Object(object_schema)) => {
            let mut fields = Vec::with_capacity(object.fields.len());
            for (name, child) in &object.fields {
                let child = match object_schema.get(name) {
                    Some(child_schema) if name == key => {
                        rederive(child, child_schema, &value[name.as_str()], rest, op)
                    }
                    _ => Arc::clone(child),
                };
                fields.push((name.clone(), child));
            }
            Arc::new(PreviewProps::Object(ObjectProps { path, fields }))
        }
        (PropPathSegment::Index(index), PreviewProps::Array(array), ComponentSchema::Array(array_schema)) => {
            let elements = array
                .elements
                .iter()
                .enumerate()
                .map(|(i, child)| {
                    if i == *index {
                        rederive(child, &array_schema.element, &value[i], rest, op)
                    } else {
                        Arc::clone(child)
                    }
                })
                .collect();
            Arc::new(PreviewProps::Array(ArrayProps { path, elements }))
        }
        (PropPathSegment::Branch, PreviewProps::Conditional(conditional), ComponentSchema::Conditional(conditional_schema)) => {
            match conditional_schema.branch(&conditional.discriminant) {
                Some(branch_schema) if conditional.discriminant == value["discriminant"] => {
                    Arc::new(PreviewProps::Conditional(ConditionalProps {
                        path,
                        discriminant: conditional.discriminant.clone(),
                        value: rederive(&conditional.value, branch_schema, &value["value"], rest, op),
                    }))
                }
                _ => Arc::new(derive_conditional(conditional_schema, value, path)),
            }
        }
        _ => Arc::new(derive_preview(schema, value, path)),
    }
}

/// Props value plus its derived descriptors, kept in sync through
/// [`PropsEditor::apply`]
#[derive(Debug, Clone)]
pub struct PropsEditor {
    schema: ComponentSchema,
    value: Value,
    preview: Arc<PreviewProps>,
}

impl PropsEditor {
    /// Invalid parts of `value` are replaced with their defaults first
    pub fn new(schema: ComponentSchema, value: &Value) -> Self {
        let value = coerce(&schema, value);
        let preview = Arc::new(derive_preview(&schema, &value, PropPath::root()));
        Self {
            schema,
            value,
            preview,
        }
    }

    pub fn schema(&self) -> &ComponentSchema {
        &self.schema
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn preview(&self) -> &Arc<PreviewProps> {
        &self.preview
    }

    pub fn apply(&mut self, change: &PropsChange) -> Result<&Value, PropsError> {
        let value = apply_change(&self.schema, &self.value, change)?;
        self.preview = rederive(&self.preview, &self.schema, &value, change.path.segments(), &change.op);
        self.value = value;
        Ok(&self.value)
    }
}
