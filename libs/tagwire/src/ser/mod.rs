//! Exposes an encoder that turns values into binary data.
//!
//! Encoding happens in two passes: the value is first validated against the
//! schema as a whole, and only then written. Writing follows the key order of
//! the value, not the declaration order of the schema.

use std::sync::Arc;
use std::{fmt, io};

use bytes::{BufMut as _, Bytes, BytesMut};
use serde_json::{Map, Value};

use crate::schema::{FieldDescriptor, FieldOption, FieldType, SchemaTree, TypeId};
use crate::varint;

mod error;
mod validate;

pub use error::{Error, Violation};

/// Encodes values for the routes of a [`SchemaTree`].
#[derive(Debug, Clone)]
pub struct Encoder {
    tree: Arc<SchemaTree>,
}

impl Encoder {
    /// Creates an encoder for the given tree.
    pub fn new(tree: Arc<SchemaTree>) -> Self {
        Self { tree }
    }

    /// Gets the schema tree.
    pub fn tree(&self) -> &SchemaTree {
        &self.tree
    }

    /// Encodes `value` as a message for `route`.
    ///
    /// Failures are logged and result in [`None`]. Use [`Self::try_encode`]
    /// to handle the error instead.
    pub fn encode(&self, route: &str, value: &Value) -> Option<Bytes> {
        #[cold]
        #[inline(never)]
        fn log_error(route: &str, why: &Error) {
            log::warn!("Failed to encode `{route}`: {why}");
        }

        match self.try_encode(route, value) {
            Ok(buf) => Some(buf),
            Err(why) => {
                log_error(route, &why);
                None
            },
        }
    }

    /// Encodes `value` as a message for `route`.
    ///
    /// The returned buffer has exactly the length of the encoded message.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the route is unknown, or the value does not fit the
    /// schema.
    pub fn try_encode(&self, route: &str, value: &Value) -> Result<Bytes, Error> {
        if route.is_empty() {
            return Err(Error::EmptyRoute);
        }

        if value.is_null() {
            return Err(Error::NullValue(route.to_owned()));
        }

        let id = self
            .tree
            .route(route)
            .ok_or_else(|| Error::UnknownRoute(route.to_owned()))?;

        let Some(object) = value.as_object() else {
            return Err(Error::Validation {
                violation: Violation::NotAMessage,
                field: FieldPath::Root.to_string(),
                expected: format!("message {route}"),
                value: value.to_string(),
            });
        };

        validate::message(&self.tree, id, object, FieldPath::Root, 0)?;

        let mut buf = BytesMut::with_capacity(capacity_hint(value));
        self.write_message(&mut buf, id, object, FieldPath::Root)?;
        Ok(buf.freeze())
    }

    fn write_message(
        &self,
        buf: &mut BytesMut,
        id: TypeId,
        object: &Map<String, Value>,
        path: FieldPath<'_>,
    ) -> Result<(), Error> {
        let message = self.tree.message(id);
        for (name, value) in object {
            let Some(field) = message.field(name) else {
                continue;
            };

            let field_path = path.field(name);
            if *field.ty() == FieldType::Unresolved {
                log::debug!(
                    "Skipping field {field_path} of unknown type `{}`",
                    field.type_name()
                );
                continue;
            }

            match field.option() {
                FieldOption::Required | FieldOption::Optional => {
                    varint::write(buf, field.wire_tag());
                    self.write_value(buf, field, value, field_path)?;
                },
                FieldOption::Repeated => {
                    let Some(items) = value.as_array() else {
                        return Err(validate::violation(
                            Violation::NotAnArray,
                            field_path,
                            field,
                            value.to_string(),
                        ));
                    };

                    self.write_repeated(buf, field, items, field_path)?;
                },
            }
        }

        Ok(())
    }

    fn write_repeated(
        &self,
        buf: &mut BytesMut,
        field: &FieldDescriptor,
        items: &[Value],
        path: FieldPath<'_>,
    ) -> Result<(), Error> {
        if items.is_empty() {
            return Ok(());
        }

        match field.ty() {
            FieldType::Scalar(scalar) if scalar.is_packable() => {
                varint::write(buf, field.wire_tag());
                varint::write(buf, items.len());
                for (index, item) in items.iter().enumerate() {
                    scalar
                        .write(buf, item)
                        .ok_or_else(|| invalid_value(path.index(index), field, item))?;
                }
            },
            _ => {
                for (index, item) in items.iter().enumerate() {
                    varint::write(buf, field.wire_tag());
                    self.write_value(buf, field, item, path.index(index))?;
                }
            },
        }

        Ok(())
    }

    fn write_value(
        &self,
        buf: &mut BytesMut,
        field: &FieldDescriptor,
        value: &Value,
        path: FieldPath<'_>,
    ) -> Result<(), Error> {
        match field.ty() {
            FieldType::Scalar(scalar) => scalar
                .write(buf, value)
                .ok_or_else(|| invalid_value(path, field, value)),
            FieldType::Message(id) => {
                let Some(object) = value.as_object() else {
                    return Err(validate::violation(
                        Violation::NotAMessage,
                        path,
                        field,
                        value.to_string(),
                    ));
                };

                // the length prefix comes first, so the message is written separately
                let mut scratch = BytesMut::with_capacity(capacity_hint(value));
                self.write_message(&mut scratch, *id, object, path)?;
                varint::write(buf, scratch.len());
                buf.put_slice(&scratch);
                Ok(())
            },
            // callers skip these before writing the tag
            FieldType::Unresolved => Ok(()),
        }
    }
}

/// Location of a value within the encoded message, for error messages.
#[derive(Debug, Clone, Copy)]
enum FieldPath<'a> {
    Root,
    Field(&'a FieldPath<'a>, &'a str),
    Index(&'a FieldPath<'a>, usize),
}

impl FieldPath<'_> {
    fn field<'b>(&'b self, name: &'b str) -> FieldPath<'b> {
        FieldPath::Field(self, name)
    }

    fn index(&self, index: usize) -> FieldPath<'_> {
        FieldPath::Index(self, index)
    }
}

impl fmt::Display for FieldPath<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Root => f.write_str("(root)"),
            Self::Field(Self::Root, name) => f.write_str(name),
            Self::Field(parent, name) => write!(f, "{parent}.{name}"),
            Self::Index(parent, index) => write!(f, "{parent}[{index}]"),
        }
    }
}

fn invalid_value(path: FieldPath<'_>, field: &FieldDescriptor, value: &Value) -> Error {
    Error::InvalidValue {
        field: path.to_string(),
        type_name: field.type_name().to_owned(),
        value: value.to_string(),
    }
}

/// Estimates the buffer size needed to encode `value`.
///
/// This is twice the length of its JSON text, which is more than the binary
/// form needs. It is only used to pre-allocate.
fn capacity_hint(value: &Value) -> usize {
    struct ByteCount(usize);

    impl io::Write for ByteCount {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0 += buf.len();
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    let mut count = ByteCount(0);
    match serde_json::to_writer(&mut count, value) {
        Ok(()) => count.0.saturating_mul(2),
        Err(_) => 0,
    }
}
