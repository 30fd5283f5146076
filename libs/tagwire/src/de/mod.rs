//! Exposes a decoder that turns binary data back into values.
//!
//! Decoding is driven by the schema: the wire code in a tag is only used to
//! skip fields the schema does not know.
//!
//! Unknown fields with wire code 0 are not skipped. A packed repeated field
//! has that code too, but is followed by an element count instead of a byte
//! length, so its extent depends on a schema the decoder doesn't have.
//! Decoding fails with [`Error::UnknownVarintField`] instead of misreading
//! the rest of the message.

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::MAX_DEPTH;
use crate::scalar::WireCode;
use crate::schema::{FieldDescriptor, FieldOption, FieldType, SchemaTree, TypeId};

mod error;
mod read;

pub use error::Error;
pub use read::Cursor;

/// Decodes binary data for the routes of a [`SchemaTree`].
#[derive(Debug, Clone)]
pub struct Decoder {
    tree: Arc<SchemaTree>,
}

impl Decoder {
    /// Creates a decoder for the given tree.
    pub fn new(tree: Arc<SchemaTree>) -> Self {
        Self { tree }
    }

    /// Gets the schema tree.
    pub fn tree(&self) -> &SchemaTree {
        &self.tree
    }

    /// Decodes a message for `route`.
    ///
    /// Returns `Ok(None)` if the route is unknown. Repeated fields missing
    /// from `buf` decode as empty arrays, so the result can be encoded again.
    ///
    /// # Errors
    ///
    /// Returns `Err` if `buf` isn't a valid message for the route, or has an
    /// unknown field that can't be skipped.
    pub fn decode(&self, route: &str, buf: &[u8]) -> Result<Option<Value>, Error> {
        let Some(id) = self.tree.route(route) else {
            log::debug!("Cannot decode unknown route `{route}`");
            return Ok(None);
        };

        let mut cursor = Cursor::new(buf);
        let message = self.read_message(&mut cursor, id, 0)?;
        Ok(Some(Value::Object(message)))
    }

    fn read_message(
        &self,
        cursor: &mut Cursor<'_>,
        id: TypeId,
        depth: usize,
    ) -> Result<Map<String, Value>, Error> {
        if depth > MAX_DEPTH {
            return Err(Error::RecursionLimit(MAX_DEPTH));
        }

        let message = self.tree.message(id);
        let mut out = Map::new();

        while !cursor.is_empty() {
            let offset = cursor.offset();
            let wire_tag: u32 = cursor.read_varint()?;
            let field_number = wire_tag >> 3;
            let [code, ..] = wire_tag.to_le_bytes();
            let code = code & 0x7;

            if field_number == 0 {
                return Err(Error::InvalidTag { offset });
            }

            let Some((name, field)) = message.field_by_tag(field_number) else {
                log::debug!(
                    "Skipping unknown field {field_number} in `{}` at offset {offset}",
                    message.name()
                );
                skip_value(cursor, field_number, code)?;
                continue;
            };

            match field.option() {
                FieldOption::Required | FieldOption::Optional => {
                    let value = self.read_value(cursor, name, field, depth)?;
                    out.insert(name.to_owned(), value);
                },
                FieldOption::Repeated => {
                    let slot = out
                        .entry(name)
                        .or_insert_with(|| Value::Array(Vec::new()));
                    if let Value::Array(items) = slot {
                        self.read_repeated(cursor, name, field, items, depth)?;
                    }
                },
            }
        }

        // empty repeated fields aren't written, but encoding requires them
        for (name, field) in message.fields() {
            if field.option() == FieldOption::Repeated {
                out.entry(name).or_insert_with(|| Value::Array(Vec::new()));
            }
        }

        Ok(out)
    }

    fn read_repeated(
        &self,
        cursor: &mut Cursor<'_>,
        name: &str,
        field: &FieldDescriptor,
        items: &mut Vec<Value>,
        depth: usize,
    ) -> Result<(), Error> {
        match field.ty() {
            FieldType::Scalar(scalar) if scalar.is_packable() => {
                let count: usize = cursor.read_varint()?;
                // every element takes at least one byte
                if count > cursor.remaining() {
                    return Err(Error::UnexpectedEof);
                }

                items.reserve(count);
                for _ in 0..count {
                    items.push(scalar.read(cursor)?);
                }
            },
            _ => items.push(self.read_value(cursor, name, field, depth)?),
        }

        Ok(())
    }

    fn read_value(
        &self,
        cursor: &mut Cursor<'_>,
        name: &str,
        field: &FieldDescriptor,
        depth: usize,
    ) -> Result<Value, Error> {
        match field.ty() {
            FieldType::Scalar(scalar) => scalar.read(cursor),
            FieldType::Message(id) => {
                let len: usize = cursor.read_varint()?;
                let mut inner = cursor.split(len)?;
                let message = self.read_message(&mut inner, *id, depth + 1)?;
                Ok(Value::Object(message))
            },
            FieldType::Unresolved => Err(Error::UnresolvedType {
                field: name.to_owned(),
                type_name: field.type_name().to_owned(),
            }),
        }
    }
}

/// Skips the value of a field the schema doesn't know, based on its wire code.
///
/// Varint fields fail with [`Error::UnknownVarintField`] since they may be
/// packed lists.
fn skip_value(cursor: &mut Cursor<'_>, field_number: u32, code: u8) -> Result<(), Error> {
    match WireCode::from_bits(code) {
        Some(WireCode::Varint) => Err(Error::UnknownVarintField { field_number }),
        Some(WireCode::Fixed64) => cursor.skip(8),
        Some(WireCode::LengthDelimited) => {
            let len: usize = cursor.read_varint()?;
            cursor.skip(len)
        },
        Some(WireCode::Fixed32) => cursor.skip(4),
        None => Err(Error::UnsupportedWireCode { field_number, code }),
    }
}
