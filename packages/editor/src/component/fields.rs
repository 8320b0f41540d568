//! Schema builders.
//!
//! ```
//! use folio_editor::component::fields;
//!
//! let schema = fields::object([
//!     ("title", fields::text("Title")),
//!     ("links", fields::array("Links", fields::url("Link"))),
//! ]);
//! # let _ = schema;
//! ```

use super::schema::{
    ArrayField, ComponentSchema, ConditionalField, FormField, FormFieldKind, ObjectField,
    RelationshipField, SelectOption,
};
use serde_json::Value;

fn form(label: &str, kind: FormFieldKind, default: Value) -> ComponentSchema {
    ComponentSchema::Form(FormField {
        label: label.to_string(),
        kind,
        default,
    })
}

pub fn text(label: &str) -> ComponentSchema {
    text_with_default(label, "")
}

pub fn text_with_default(label: &str, default: &str) -> ComponentSchema {
    form(
        label,
        FormFieldKind::Text { multiline: false },
        Value::String(default.to_string()),
    )
}

pub fn multiline_text(label: &str) -> ComponentSchema {
    form(
        label,
        FormFieldKind::Text { multiline: true },
        Value::String(String::new()),
    )
}

pub fn url(label: &str) -> ComponentSchema {
    form(label, FormFieldKind::Url, Value::String(String::new()))
}

pub fn integer(label: &str, default: i64) -> ComponentSchema {
    form(label, FormFieldKind::Integer, Value::from(default))
}

pub fn checkbox(label: &str, default: bool) -> ComponentSchema {
    ComponentSchema::Form(checkbox_field(label, default))
}

pub fn checkbox_field(label: &str, default: bool) -> FormField {
    FormField {
        label: label.to_string(),
        kind: FormFieldKind::Checkbox,
        default: Value::Bool(default),
    }
}

/// `options` are `(value, label)` pairs; `default` must be one of the values
pub fn select(label: &str, options: &[(&str, &str)], default: &str) -> ComponentSchema {
    ComponentSchema::Form(select_field(label, options, default))
}

pub fn select_field(label: &str, options: &[(&str, &str)], default: &str) -> FormField {
    FormField {
        label: label.to_string(),
        kind: FormFieldKind::Select {
            options: options
                .iter()
                .map(|(value, label)| SelectOption {
                    value: value.to_string(),
                    label: label.to_string(),
                })
                .collect(),
        },
        default: Value::String(default.to_string()),
    }
}

pub fn object<K: Into<String>>(fields: impl IntoIterator<Item = (K, ComponentSchema)>) -> ComponentSchema {
    ComponentSchema::Object(ObjectField {
        fields: fields.into_iter().map(|(k, v)| (k.into(), v)).collect(),
    })
}

/// Object without fields, for conditional branches that carry no data
pub fn empty() -> ComponentSchema {
    ComponentSchema::Object(ObjectField { fields: Vec::new() })
}

pub fn array(label: &str, element: ComponentSchema) -> ComponentSchema {
    ComponentSchema::Array(ArrayField {
        label: label.to_string(),
        element: Box::new(element),
    })
}

pub fn conditional<K: Into<String>>(
    discriminant: FormField,
    values: impl IntoIterator<Item = (K, ComponentSchema)>,
) -> ComponentSchema {
    ComponentSchema::Conditional(ConditionalField {
        discriminant,
        values: values.into_iter().map(|(k, v)| (k.into(), v)).collect(),
    })
}

pub fn relationship(label: &str, relationship: &str, many: bool) -> ComponentSchema {
    ComponentSchema::Relationship(RelationshipField {
        label: label.to_string(),
        relationship: relationship.to_string(),
        many,
    })
}
