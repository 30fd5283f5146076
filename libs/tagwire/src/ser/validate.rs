use serde_json::{Map, Value};

use super::{Error, FieldPath, Violation};
use crate::MAX_DEPTH;
use crate::schema::{FieldDescriptor, FieldOption, FieldType, SchemaTree, TypeId};

/// Checks `object` against the declared fields of a message type.
///
/// This only looks at the shape: required fields must be present, repeated
/// fields must be arrays and message fields must be objects. Repeated fields
/// must be present too, as an empty array if there is nothing to write.
/// `null` counts as a present value, which is never valid. Scalar values are
/// checked while writing.
pub(super) fn message(
    tree: &SchemaTree,
    id: TypeId,
    object: &Map<String, Value>,
    path: FieldPath<'_>,
    depth: usize,
) -> Result<(), Error> {
    if depth > MAX_DEPTH {
        return Err(Error::RecursionLimit(MAX_DEPTH));
    }

    for (name, field) in tree.message(id).fields() {
        let path = path.field(name);
        match (field.option(), object.get(name)) {
            (FieldOption::Required, None) => {
                let object = serde_json::to_string(object).unwrap_or_default();
                return Err(violation(Violation::MissingRequired, path, field, object));
            },
            (FieldOption::Repeated, None) => {
                let value = "(absent)".to_owned();
                return Err(violation(Violation::NotAnArray, path, field, value));
            },
            (FieldOption::Optional, None) => {},
            (FieldOption::Repeated, Some(value)) => {
                let Some(items) = value.as_array() else {
                    return Err(violation(Violation::NotAnArray, path, field, value.to_string()));
                };

                if let FieldType::Message(child) = field.ty() {
                    for (index, item) in items.iter().enumerate() {
                        element(tree, *child, field, item, path.index(index), depth)?;
                    }
                }
            },
            (_, Some(value)) => {
                if let FieldType::Message(child) = field.ty() {
                    element(tree, *child, field, value, path, depth)?;
                }
            },
        }
    }

    Ok(())
}

fn element(
    tree: &SchemaTree,
    id: TypeId,
    field: &FieldDescriptor,
    value: &Value,
    path: FieldPath<'_>,
    depth: usize,
) -> Result<(), Error> {
    let Some(object) = value.as_object() else {
        return Err(violation(Violation::NotAMessage, path, field, value.to_string()));
    };

    message(tree, id, object, path, depth + 1)
}

pub(super) fn violation(
    violation: Violation,
    path: FieldPath<'_>,
    field: &FieldDescriptor,
    value: String,
) -> Error {
    Error::Validation {
        violation,
        field: path.to_string(),
        expected: format!("{} {}", field.option(), field.type_name()),
        value,
    }
}
