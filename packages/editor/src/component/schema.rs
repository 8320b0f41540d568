//! # Component Field Schemas
//!
//! A schema describes the shape of a component block's `props`. Every
//! operation over it (initial value, validation, coercion) is a total
//! recursive function over [`ComponentSchema`]: any JSON value goes in, and
//! coercion always yields a value that validates.

use folio_model::RelationshipData;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub enum ComponentSchema {
    Form(FormField),
    Object(ObjectField),
    Array(ArrayField),
    Conditional(ConditionalField),
    Relationship(RelationshipField),
}

/// Primitive leaf field
#[derive(Debug, Clone, PartialEq)]
pub struct FormField {
    pub label: String,
    pub kind: FormFieldKind,
    pub default: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FormFieldKind {
    Text { multiline: bool },
    Integer,
    Checkbox,
    Select { options: Vec<SelectOption> },
    Url,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
}

/// Ordered named fields
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectField {
    pub fields: Vec<(String, ComponentSchema)>,
}

/// Homogeneous list
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayField {
    pub label: String,
    pub element: Box<ComponentSchema>,
}

/// A discriminant form field selecting one of several branch schemas.
/// Stored as `{ "discriminant": ..., "value": ... }`.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionalField {
    pub discriminant: FormField,
    pub values: BTreeMap<String, ComponentSchema>,
}

/// Link to external records of a relationship target
#[derive(Debug, Clone, PartialEq)]
pub struct RelationshipField {
    pub label: String,
    pub relationship: String,
    pub many: bool,
}

impl FormField {
    pub fn validate(&self, value: &Value) -> bool {
        match &self.kind {
            FormFieldKind::Text { .. } => value.is_string(),
            FormFieldKind::Integer => value.is_i64() || value.is_u64(),
            FormFieldKind::Checkbox => value.is_boolean(),
            FormFieldKind::Select { options } => value
                .as_str()
                .map_or(false, |v| options.iter().any(|option| option.value == v)),
            FormFieldKind::Url => value.as_str().map_or(false, is_url),
        }
    }

    fn coerce(&self, value: &Value) -> Value {
        if self.validate(value) {
            value.clone()
        } else {
            self.default.clone()
        }
    }
}

fn is_url(s: &str) -> bool {
    s.is_empty()
        || s.starts_with("https://")
        || s.starts_with("http://")
        || s.starts_with("mailto:")
        || s.starts_with('/')
}

impl ObjectField {
    pub fn get(&self, key: &str) -> Option<&ComponentSchema> {
        self.fields
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, schema)| schema)
    }
}

impl ConditionalField {
    /// Branch key of a discriminant value: the select value itself, or
    /// `"true"`/`"false"` for a checkbox
    pub fn branch_key(&self, discriminant: &Value) -> Option<String> {
        if !self.discriminant.validate(discriminant) {
            return None;
        }
        match discriminant {
            Value::Bool(b) => Some(b.to_string()),
            Value::String(s) => Some(s.clone()),
            _ => None,
        }
    }

    pub fn branch(&self, discriminant: &Value) -> Option<&ComponentSchema> {
        self.values.get(&self.branch_key(discriminant)?)
    }

    /// Stored value for a discriminant with its branch at defaults
    pub fn initial_for(&self, discriminant: &Value) -> Value {
        let value = self
            .branch(discriminant)
            .map(initial_value)
            .unwrap_or(Value::Null);
        conditional_value(discriminant.clone(), value)
    }
}

pub(crate) fn conditional_value(discriminant: Value, value: Value) -> Value {
    let mut map = Map::new();
    map.insert("discriminant".to_string(), discriminant);
    map.insert("value".to_string(), value);
    Value::Object(map)
}

/// Value a freshly inserted field starts with
pub fn initial_value(schema: &ComponentSchema) -> Value {
    match schema {
        ComponentSchema::Form(field) => field.default.clone(),
        ComponentSchema::Object(object) => Value::Object(
            object
                .fields
                .iter()
                .map(|(key, field)| (key.clone(), initial_value(field)))
                .collect(),
        ),
        ComponentSchema::Array(_) => Value::Array(Vec::new()),
        ComponentSchema::Conditional(conditional) => {
            conditional.initial_for(&conditional.discriminant.default)
        }
        ComponentSchema::Relationship(field) => {
            if field.many {
                Value::Array(Vec::new())
            } else {
                Value::Null
            }
        }
    }
}

/// Whether `value` conforms to `schema`. Keys an object schema does not
/// declare are ignored.
pub fn validate(schema: &ComponentSchema, value: &Value) -> bool {
    match schema {
        ComponentSchema::Form(field) => field.validate(value),
        ComponentSchema::Object(object) => match value.as_object() {
            Some(map) => object
                .fields
                .iter()
                .all(|(key, field)| validate(field, map.get(key).unwrap_or(&Value::Null))),
            None => false,
        },
        ComponentSchema::Array(array) => match value.as_array() {
            Some(items) => items.iter().all(|item| validate(&array.element, item)),
            None => false,
        },
        ComponentSchema::Conditional(conditional) => {
            let Some(map) = value.as_object() else {
                return false;
            };
            let discriminant = map.get("discriminant").unwrap_or(&Value::Null);
            match conditional.branch(discriminant) {
                Some(branch) => validate(branch, map.get("value").unwrap_or(&Value::Null)),
                None => false,
            }
        }
        ComponentSchema::Relationship(field) => {
            if field.many {
                value
                    .as_array()
                    .map_or(false, |items| items.iter().all(is_relationship_data))
            } else {
                value.is_null() || is_relationship_data(value)
            }
        }
    }
}

fn is_relationship_data(value: &Value) -> bool {
    value.is_object() && serde_json::from_value::<RelationshipData>(value.clone()).is_ok()
}

/// Replace every invalid part of `value` with that field's default, keeping
/// whatever is valid
pub fn coerce(schema: &ComponentSchema, value: &Value) -> Value {
    match schema {
        ComponentSchema::Form(field) => field.coerce(value),
        ComponentSchema::Object(object) => {
            let Some(map) = value.as_object() else {
                return initial_value(schema);
            };
            let mut out = map.clone();
            for (key, field) in &object.fields {
                let coerced = coerce(field, map.get(key).unwrap_or(&Value::Null));
                out.insert(key.clone(), coerced);
            }
            Value::Object(out)
        }
        ComponentSchema::Array(array) => match value.as_array() {
            Some(items) => Value::Array(
                items
                    .iter()
                    .map(|item| coerce(&array.element, item))
                    .collect(),
            ),
            None => Value::Array(Vec::new()),
        },
        ComponentSchema::Conditional(conditional) => {
            let Some(map) = value.as_object() else {
                return initial_value(schema);
            };
            let discriminant = map.get("discriminant").unwrap_or(&Value::Null);
            match conditional.branch(discriminant) {
                Some(branch) => conditional_value(
                    discriminant.clone(),
                    coerce(branch, map.get("value").unwrap_or(&Value::Null)),
                ),
                None => initial_value(schema),
            }
        }
        ComponentSchema::Relationship(field) => {
            if validate(schema, value) {
                value.clone()
            } else if field.many {
                // keep the entries that are still well-formed
                Value::Array(
                    value
                        .as_array()
                        .map(|items| {
                            items
                                .iter()
                                .filter(|item| is_relationship_data(item))
                                .cloned()
                                .collect()
                        })
                        .unwrap_or_default(),
                )
            } else {
                Value::Null
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::fields;
    use serde_json::json;

    fn hero() -> ComponentSchema {
        fields::object([
            ("title", fields::text("Title")),
            ("count", fields::integer("Count", 3)),
            (
                "tone",
                fields::select("Tone", &[("info", "Info"), ("warning", "Warning")], "info"),
            ),
            ("items", fields::array("Items", fields::text("Item"))),
            (
                "media",
                fields::conditional(
                    fields::select_field("Kind", &[("none", "None"), ("image", "Image")], "none"),
                    [
                        ("none", fields::empty()),
                        ("image", fields::object([("src", fields::url("Source"))])),
                    ],
                ),
            ),
            ("author", fields::relationship("Author", "author", false)),
        ])
    }

    #[test]
    fn test_initial_value() {
        assert_eq!(
            initial_value(&hero()),
            json!({
                "title": "",
                "count": 3,
                "tone": "info",
                "items": [],
                "media": { "discriminant": "none", "value": {} },
                "author": null
            })
        );
    }

    #[test]
    fn test_initial_value_validates() {
        let schema = hero();
        assert!(validate(&schema, &initial_value(&schema)));
    }

    #[test]
    fn test_validate_rejects_wrong_types() {
        let schema = hero();
        let mut value = initial_value(&schema);
        value["count"] = json!("three");
        assert!(!validate(&schema, &value));

        let mut value = initial_value(&schema);
        value["tone"] = json!("loud");
        assert!(!validate(&schema, &value));

        let mut value = initial_value(&schema);
        value["media"] = json!({ "discriminant": "video", "value": {} });
        assert!(!validate(&schema, &value));
    }

    #[test]
    fn test_coerce_substitutes_per_field() {
        let schema = hero();
        let value = json!({
            "title": "Kept",
            "count": "bad",
            "items": ["a", 2, "c"],
            "media": { "discriminant": "image", "value": { "src": 7 } },
            "author": { "id": "9", "label": "Grace" },
            "extra": true
        });

        let coerced = coerce(&schema, &value);
        assert!(validate(&schema, &coerced));
        assert_eq!(coerced["title"], "Kept");
        assert_eq!(coerced["count"], 3);
        assert_eq!(coerced["tone"], "info");
        assert_eq!(coerced["items"], json!(["a", "", "c"]));
        assert_eq!(coerced["media"], json!({ "discriminant": "image", "value": { "src": "" } }));
        assert_eq!(coerced["author"]["id"], "9");
        assert_eq!(coerced["extra"], true);
    }

    #[test]
    fn test_coerce_non_object_root() {
        let schema = hero();
        assert_eq!(coerce(&schema, &json!(42)), initial_value(&schema));
    }

    #[test]
    fn test_checkbox_discriminant() {
        let ComponentSchema::Conditional(conditional) = fields::conditional(
            fields::checkbox_field("Show caption", false),
            [("false", fields::empty()), ("true", fields::text("Caption"))],
        ) else {
            panic!("expected conditional");
        };

        assert_eq!(conditional.branch_key(&json!(true)), Some("true".to_string()));
        assert_eq!(
            conditional.initial_for(&json!(true)),
            json!({ "discriminant": true, "value": "" })
        );
        assert_eq!(conditional.branch_key(&json!("true")), None);
    }
}
