//! The compiled schema: message types and the fields they declare.
//!
//! A [`SchemaTree`] owns every message type it knows about in one arena.
//! Message types refer to each other by [`TypeId`], which is only meaningful
//! for the tree that handed it out. References are resolved when the tree is
//! compiled, so encoding and decoding never look up names.

use std::collections::HashMap;
use std::fmt;

use indexmap::IndexMap;
use serde_json::Value;

use crate::scalar::{ScalarType, WireCode};

mod compile;

pub use compile::{CompileReport, DropReason, Dropped};

/// The largest tag that still fits a wire tag once shifted.
pub const MAX_TAG: u32 = u32::MAX >> 3;

/// Prefix of top-level keys that declare globally visible message types.
pub const GLOBAL_MESSAGE_PREFIX: &str = "message ";

/// Index of a [`MessageType`] within its [`SchemaTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeId(usize);

/// How often a field may occur in a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldOption {
    /// Must be present when encoding.
    Required,
    /// May be absent.
    Optional,
    /// A list of values. May be absent, which is the same as an empty list.
    Repeated,
}

impl FieldOption {
    /// Parses the option keyword of a field declaration.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "required" => Some(Self::Required),
            "optional" => Some(Self::Optional),
            "repeated" => Some(Self::Repeated),
            _ => None,
        }
    }

    /// The keyword used in schemas.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Required => "required",
            Self::Optional => "optional",
            Self::Repeated => "repeated",
        }
    }
}

impl fmt::Display for FieldOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The type of a field's values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    /// A simple type.
    Scalar(ScalarType),
    /// A message type of the same tree.
    Message(TypeId),
    /// A message type name that did not resolve when compiling.
    Unresolved,
}

impl FieldType {
    /// The wire code written into tags for fields of this type.
    pub const fn wire_code(&self) -> WireCode {
        match self {
            Self::Scalar(scalar) => scalar.wire_code(),
            Self::Message(_) | Self::Unresolved => WireCode::LengthDelimited,
        }
    }
}

/// A field declared by a message type.
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    option: FieldOption,
    ty: FieldType,
    type_name: String,
    tag: u32,
}

impl FieldDescriptor {
    /// How often the field may occur.
    pub fn option(&self) -> FieldOption {
        self.option
    }

    /// The resolved type.
    pub fn ty(&self) -> &FieldType {
        &self.ty
    }

    /// The type name as written in the schema.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// The field number.
    pub fn tag(&self) -> u32 {
        self.tag
    }

    /// The varint value of this field's wire tag.
    pub fn wire_tag(&self) -> u32 {
        (self.tag << 3) | u32::from(self.ty.wire_code().bits())
    }
}

/// One compiled message shape.
#[derive(Debug, Clone)]
pub struct MessageType {
    name: String,
    parent: Option<TypeId>,
    fields: IndexMap<String, FieldDescriptor>,
    tag_index: HashMap<u32, String>,
    nested_types: HashMap<String, TypeId>,
}

impl MessageType {
    /// The qualified name, f.e. `onChat.Sender`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Gets a field by name.
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.get(name)
    }

    /// Gets a field and its name by field number.
    pub fn field_by_tag(&self, tag: u32) -> Option<(&str, &FieldDescriptor)> {
        let name = self.tag_index.get(&tag)?;
        let field = self.fields.get(name)?;
        Some((name, field))
    }

    /// Iterates over the fields in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldDescriptor)> {
        self.fields.iter().map(|(n, f)| (n.as_str(), f))
    }

    /// Gets a message type declared inside this one.
    pub fn nested_type(&self, name: &str) -> Option<TypeId> {
        self.nested_types.get(name).copied()
    }
}

/// A compiled schema, mapping routes to message types.
///
/// The tree is immutable once compiled and may be shared freely between
/// threads, f.e. through an [`Arc`](std::sync::Arc).
#[derive(Debug, Clone, Default)]
pub struct SchemaTree {
    types: Vec<MessageType>,
    routes: IndexMap<String, TypeId>,
}

impl SchemaTree {
    /// Compiles a raw schema.
    ///
    /// Declarations that cannot be understood are dropped and logged. Use
    /// [`Self::compile_with_report`] to inspect them instead.
    pub fn compile(raw: &Value) -> Self {
        let (tree, report) = Self::compile_with_report(raw);
        for dropped in report.iter() {
            log::warn!("Dropped schema declaration {dropped}");
        }

        tree
    }

    /// Compiles a raw schema, also returning which declarations were dropped.
    pub fn compile_with_report(raw: &Value) -> (Self, CompileReport) {
        compile::compile(raw)
    }

    /// Gets the message type for a route.
    pub fn route(&self, route: &str) -> Option<TypeId> {
        self.routes.get(route).copied()
    }

    /// Iterates over the route names.
    pub fn routes(&self) -> impl Iterator<Item = &str> {
        self.routes.keys().map(String::as_str)
    }

    /// Gets the message type with the given id.
    ///
    /// # Panics
    ///
    /// Panics if `id` was not handed out by this tree.
    pub fn message(&self, id: TypeId) -> &MessageType {
        &self.types[id.0]
    }

    /// Gets the message type for a route.
    pub fn get(&self, route: &str) -> Option<&MessageType> {
        self.route(route).map(|id| self.message(id))
    }

    /// The amount of message types, including nested ones.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Whether the tree has no message types at all.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}
