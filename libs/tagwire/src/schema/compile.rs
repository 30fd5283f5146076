//! Turns raw schema declarations into a [`SchemaTree`].
//!
//! Declaration keys are either `"<option> <type> <name>"` with an integer tag
//! as the value, or `"message <name>"` with an object of declarations as the
//! value. Compilation is best-effort: anything else is dropped and recorded in
//! the [`CompileReport`].

use std::collections::HashMap;
use std::fmt;

use indexmap::IndexMap;
use serde_json::{Map, Value};

use super::{
    FieldDescriptor, FieldOption, FieldType, GLOBAL_MESSAGE_PREFIX, MAX_TAG, MessageType,
    SchemaTree, TypeId,
};
use crate::scalar::ScalarType;

/// Why a declaration was not accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum DropReason {
    /// The schema itself is not an object.
    RootNotAnObject,
    /// A message declaration's value is not an object.
    NotAnObject,
    /// The key has the wrong amount of space-separated parts.
    Malformed,
    /// The key starts with neither `message` nor a field option.
    UnknownKind,
    /// The tag is not an integer between 1 and [`MAX_TAG`].
    InvalidTag,
    /// Another field of the same message already uses the tag.
    DuplicateTag { existing: String },
    /// Another field of the same message already uses the name.
    DuplicateField,
    /// The field's type is neither simple nor a reachable message type.
    ///
    /// Unlike the other reasons, the field is kept, but it cannot carry data.
    UnresolvedType { type_name: String },
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RootNotAnObject => f.write_str("schema root is not an object"),
            Self::NotAnObject => f.write_str("message body is not an object"),
            Self::Malformed => f.write_str("malformed declaration"),
            Self::UnknownKind => f.write_str("not a message or field declaration"),
            Self::InvalidTag => write!(f, "tag must be an integer in 1..={MAX_TAG}"),
            Self::DuplicateTag { existing } => write!(f, "tag already used by `{existing}`"),
            Self::DuplicateField => f.write_str("field name already declared"),
            Self::UnresolvedType { type_name } => write!(f, "unknown type `{type_name}`"),
        }
    }
}

/// A declaration that was not accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dropped {
    /// Qualified name of the message declaring it. Empty at the top level.
    pub message: String,
    /// The declaration key.
    pub key: String,
    pub reason: DropReason,
}

impl fmt::Display for Dropped {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "`{}`: {}", self.key, self.reason)
        } else {
            write!(f, "`{}` in `{}`: {}", self.key, self.message, self.reason)
        }
    }
}

/// The declarations dropped while compiling a schema.
#[derive(Debug, Clone, Default)]
pub struct CompileReport {
    dropped: Vec<Dropped>,
}

impl CompileReport {
    /// Whether every declaration was accepted.
    pub fn is_empty(&self) -> bool {
        self.dropped.is_empty()
    }

    /// The amount of dropped declarations.
    pub fn len(&self) -> usize {
        self.dropped.len()
    }

    /// Iterates over the dropped declarations, in schema order.
    pub fn iter(&self) -> std::slice::Iter<'_, Dropped> {
        self.dropped.iter()
    }
}

impl<'a> IntoIterator for &'a CompileReport {
    type Item = &'a Dropped;
    type IntoIter = std::slice::Iter<'a, Dropped>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[derive(Default)]
struct Compiler {
    types: Vec<MessageType>,
    report: CompileReport,
}

pub(super) fn compile(raw: &Value) -> (SchemaTree, CompileReport) {
    let mut compiler = Compiler::default();
    let mut routes = IndexMap::new();

    if let Some(root) = raw.as_object() {
        for (key, value) in root {
            match value.as_object() {
                Some(decls) => {
                    let id = compiler.message(key.clone(), None, decls);
                    routes.insert(key.clone(), id);
                },
                None => compiler.reject(String::new(), key, DropReason::NotAnObject),
            }
        }
    } else {
        compiler.reject(String::new(), "", DropReason::RootNotAnObject);
    }

    let Compiler { types, mut report } = compiler;
    let mut tree = SchemaTree { types, routes };
    resolve(&mut tree, &mut report);
    (tree, report)
}

impl Compiler {
    fn message(
        &mut self,
        name: String,
        parent: Option<TypeId>,
        decls: &Map<String, Value>,
    ) -> TypeId {
        let id = TypeId(self.types.len());
        self.types.push(MessageType {
            name,
            parent,
            fields: IndexMap::new(),
            tag_index: HashMap::new(),
            nested_types: HashMap::new(),
        });

        for (key, value) in decls {
            let parts: Vec<&str> = key.split(' ').collect();
            if parts.iter().any(|p| p.is_empty()) {
                self.reject_in(id, key, DropReason::Malformed);
                continue;
            }

            match parts.as_slice() {
                ["message", type_name] => self.nested(id, key, type_name, value),
                ["message", ..] => self.reject_in(id, key, DropReason::Malformed),
                [option, type_name, field_name] => match FieldOption::from_name(option) {
                    Some(option) => self.field(id, key, option, type_name, field_name, value),
                    None => self.reject_in(id, key, DropReason::UnknownKind),
                },
                [option, ..] if FieldOption::from_name(option).is_some() => {
                    self.reject_in(id, key, DropReason::Malformed);
                },
                _ => self.reject_in(id, key, DropReason::UnknownKind),
            }
        }

        id
    }

    fn nested(&mut self, id: TypeId, key: &str, type_name: &str, value: &Value) {
        let Some(decls) = value.as_object() else {
            self.reject_in(id, key, DropReason::NotAnObject);
            return;
        };

        let name = format!("{}.{type_name}", self.types[id.0].name);
        let child = self.message(name, Some(id), decls);
        self.types[id.0]
            .nested_types
            .insert(type_name.to_owned(), child);
    }

    fn field(
        &mut self,
        id: TypeId,
        key: &str,
        option: FieldOption,
        type_name: &str,
        field_name: &str,
        value: &Value,
    ) {
        let tag = value
            .as_u64()
            .and_then(|t| u32::try_from(t).ok())
            .filter(|t| (1..=MAX_TAG).contains(t));

        let Some(tag) = tag else {
            self.reject_in(id, key, DropReason::InvalidTag);
            return;
        };

        let message = &self.types[id.0];
        let conflict = if let Some(existing) = message.tag_index.get(&tag) {
            Some(DropReason::DuplicateTag {
                existing: existing.clone(),
            })
        } else if message.fields.contains_key(field_name) {
            Some(DropReason::DuplicateField)
        } else {
            None
        };

        if let Some(reason) = conflict {
            self.reject_in(id, key, reason);
            return;
        }

        // message references are filled in once every type is known
        let ty = ScalarType::from_name(type_name).map_or(FieldType::Unresolved, FieldType::Scalar);

        let message = &mut self.types[id.0];
        message.fields.insert(
            field_name.to_owned(),
            FieldDescriptor {
                option,
                ty,
                type_name: type_name.to_owned(),
                tag,
            },
        );
        message.tag_index.insert(tag, field_name.to_owned());
    }

    fn reject_in(&mut self, id: TypeId, key: &str, reason: DropReason) {
        let message = self.types[id.0].name.clone();
        self.reject(message, key, reason);
    }

    fn reject(&mut self, message: String, key: &str, reason: DropReason) {
        self.report.dropped.push(Dropped {
            message,
            key: key.to_owned(),
            reason,
        });
    }
}

/// Resolves every message type reference in the tree.
///
/// A name is looked up among the types nested in the declaring message, then
/// in each enclosing message, and finally among the top-level `message <name>`
/// declarations.
fn resolve(tree: &mut SchemaTree, report: &mut CompileReport) {
    for index in 0..tree.types.len() {
        let targets: Vec<(usize, Option<TypeId>)> = tree.types[index]
            .fields
            .values()
            .enumerate()
            .filter(|(_, f)| f.ty == FieldType::Unresolved)
            .map(|(i, f)| (i, lookup(tree, TypeId(index), &f.type_name)))
            .collect();

        let message = &mut tree.types[index];
        for (i, target) in targets {
            let Some((name, field)) = message.fields.get_index_mut(i) else {
                continue;
            };

            match target {
                Some(target) => field.ty = FieldType::Message(target),
                None => report.dropped.push(Dropped {
                    message: message.name.clone(),
                    key: format!("{} {} {name}", field.option, field.type_name),
                    reason: DropReason::UnresolvedType {
                        type_name: field.type_name.clone(),
                    },
                }),
            }
        }
    }
}

fn lookup(tree: &SchemaTree, from: TypeId, type_name: &str) -> Option<TypeId> {
    let mut scope = Some(from);
    while let Some(id) = scope {
        let message = tree.message(id);
        if let Some(found) = message.nested_type(type_name) {
            return Some(found);
        }

        scope = message.parent;
    }

    tree.route(&format!("{GLOBAL_MESSAGE_PREFIX}{type_name}"))
}
