//! # Props Changes
//!
//! Every setter on a preview descriptor produces a [`PropsChange`]: a path
//! from the props root plus one operation. [`apply_change`] is the single
//! place where such a change becomes a new props value, so one user edit is
//! always exactly one document mutation.

use super::schema::{initial_value, validate, ComponentSchema};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PropsError {
    #[error("Unknown component: {0}")]
    UnknownComponent(String),

    #[error("No field at {0}")]
    InvalidPath(PropPath),

    #[error("Invalid value for {0}")]
    InvalidValue(PropPath),

    #[error("Operation not supported by the field at {0}")]
    UnsupportedOperation(PropPath),

    #[error("Index {index} out of bounds at {path}")]
    IndexOutOfBounds { path: PropPath, index: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PropPathSegment {
    /// Object field
    Field(String),
    /// Array element
    Index(usize),
    /// Active branch of a conditional
    Branch,
}

/// Location of a field inside a props value
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropPath(pub Vec<PropPathSegment>);

impl PropPath {
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn segments(&self) -> &[PropPathSegment] {
        &self.0
    }

    pub fn field(&self, key: &str) -> Self {
        self.with(PropPathSegment::Field(key.to_string()))
    }

    pub fn index(&self, index: usize) -> Self {
        self.with(PropPathSegment::Index(index))
    }

    pub fn branch(&self) -> Self {
        self.with(PropPathSegment::Branch)
    }

    fn with(&self, segment: PropPathSegment) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment);
        Self(segments)
    }

    fn prefix(&self, len: usize) -> Self {
        Self(self.0[..len].to_vec())
    }
}

impl fmt::Display for PropPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "props");
        }
        for (i, segment) in self.0.iter().enumerate() {
            match segment {
                PropPathSegment::Field(key) if i == 0 => write!(f, "{}", key)?,
                PropPathSegment::Field(key) => write!(f, ".{}", key)?,
                PropPathSegment::Index(index) => write!(f, "[{}]", index)?,
                PropPathSegment::Branch => write!(f, ".value")?,
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum PropsOp {
    /// Replace the value at the path
    Set { value: Value },
    /// Insert into an array; `None` inserts the element schema's initial value
    Insert { index: usize, value: Option<Value> },
    Remove { index: usize },
    Move { from: usize, to: usize },
    /// Change a conditional's discriminant, re-initializing the new branch
    Switch { discriminant: Value },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropsChange {
    pub path: PropPath,
    #[serde(flatten)]
    pub op: PropsOp,
}

impl PropsChange {
    pub fn new(path: PropPath, op: PropsOp) -> Self {
        Self { path, op }
    }

    /// Replace the whole props value
    pub fn set_root(value: Value) -> Self {
        Self::new(PropPath::root(), PropsOp::Set { value })
    }
}

/// Apply `change` to `root`, returning the new props value. The input is
/// never modified; an invalid change leaves nothing half-applied.
pub fn apply_change(
    schema: &ComponentSchema,
    root: &Value,
    change: &PropsChange,
) -> Result<Value, PropsError> {
    let mut value = root.clone();
    let (target_schema, target) = locate_mut(schema, &mut value, &change.path)?;
    apply_op(target_schema, target, &change.op, &change.path)?;
    Ok(value)
}

fn locate_mut<'s, 'v>(
    schema: &'s ComponentSchema,
    value: &'v mut Value,
    path: &PropPath,
) -> Result<(&'s ComponentSchema, &'v mut Value), PropsError> {
    let mut schema = schema;
    let mut value = value;

    for (depth, segment) in path.segments().iter().enumerate() {
        let invalid = || PropsError::InvalidPath(path.prefix(depth + 1));
        match (schema, segment) {
            (ComponentSchema::Object(object), PropPathSegment::Field(key)) => {
                let field = object.get(key).ok_or_else(invalid)?;
                let map = value.as_object_mut().ok_or_else(invalid)?;
                value = map.entry(key.clone()).or_insert(Value::Null);
                schema = field;
            }
            (ComponentSchema::Array(array), PropPathSegment::Index(index)) => {
                let items = value.as_array_mut().ok_or_else(invalid)?;
                value = items.get_mut(*index).ok_or(PropsError::IndexOutOfBounds {
                    path: path.prefix(depth),
                    index: *index,
                })?;
                schema = &array.element;
            }
            (ComponentSchema::Conditional(conditional), PropPathSegment::Branch) => {
                let discriminant = value.get("discriminant").cloned().unwrap_or(Value::Null);
                let branch = conditional.branch(&discriminant).ok_or_else(invalid)?;
                let map = value.as_object_mut().ok_or_else(invalid)?;
                value = map.entry("value".to_string()).or_insert(Value::Null);
                schema = branch;
            }
            _ => return Err(invalid()),
        }
    }

    Ok((schema, value))
}

fn apply_op(
    schema: &ComponentSchema,
    target: &mut Value,
    op: &PropsOp,
    path: &PropPath,
) -> Result<(), PropsError> {
    match (op, schema) {
        (PropsOp::Set { value }, _) => {
            if !validate(schema, value) {
                return Err(PropsError::InvalidValue(path.clone()));
            }
            *target = value.clone();
        }

        (PropsOp::Insert { index, value }, ComponentSchema::Array(array)) => {
            let items = target
                .as_array_mut()
                .ok_or_else(|| PropsError::InvalidPath(path.clone()))?;
            if *index > items.len() {
                return Err(PropsError::IndexOutOfBounds {
                    path: path.clone(),
                    index: *index,
                });
            }
            let item = value.clone().unwrap_or_else(|| initial_value(&array.element));
            if !validate(&array.element, &item) {
                return Err(PropsError::InvalidValue(path.index(*index)));
            }
            items.insert(*index, item);
        }

        (PropsOp::Remove { index }, ComponentSchema::Array(_)) => {
            let items = target
                .as_array_mut()
                .ok_or_else(|| PropsError::InvalidPath(path.clone()))?;
            if *index >= items.len() {
                return Err(PropsError::IndexOutOfBounds {
                    path: path.clone(),
                    index: *index,
                });
            }
            items.remove(*index);
        }

        (PropsOp::Move { from, to }, ComponentSchema::Array(_)) => {
            let items = target
                .as_array_mut()
                .ok_or_else(|| PropsError::InvalidPath(path.clone()))?;
            let out_of_bounds = [*from, *to].into_iter().find(|i| *i >= items.len());
            if let Some(index) = out_of_bounds {
                return Err(PropsError::IndexOutOfBounds {
                    path: path.clone(),
                    index,
                });
            }
            let item = items.remove(*from);
            items.insert(*to, item);
        }

        (PropsOp::Switch { discriminant }, ComponentSchema::Conditional(conditional)) => {
            if conditional.branch(discriminant).is_none() {
                return Err(PropsError::InvalidValue(path.clone()));
            }
            *target = conditional.initial_for(discriminant);
        }

        _ => return Err(PropsError::UnsupportedOperation(path.clone())),
    }
    Ok(())
}
