/// Potential errors to encounter when decoding binary data.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The data ended before the value or the enclosing message did.
    #[error("unexpected end of message data")]
    UnexpectedEof,
    /// A varint overflowed the target type.
    #[error("varint overflows target type")]
    IntegerOverflow,
    /// A string field contained invalid UTF-8.
    #[error("invalid utf-8 in data for string")]
    InvalidUtf8,
    /// A wire tag had field number 0.
    ///
    /// `offset` counts from the start of the whole payload, also for tags
    /// within nested messages.
    #[error("invalid field number 0 at offset {offset}")]
    InvalidTag { offset: usize },
    /// An unknown field used a wire code that cannot be skipped.
    #[error("cannot skip unknown field {field_number} with wire code {code}")]
    UnsupportedWireCode { field_number: u32, code: u8 },
    /// An unknown field used wire code 0.
    ///
    /// Packed repeated fields also use wire code 0, followed by an element
    /// count rather than a byte length. Their extent can't be known without
    /// the schema, so such fields are never skipped.
    #[error("cannot skip unknown varint field {field_number}, it may be a packed list")]
    UnknownVarintField { field_number: u32 },
    /// A known field's type did not resolve when the schema was compiled.
    #[error("field `{field}` has unknown message type `{type_name}`")]
    UnresolvedType { field: String, type_name: String },
    /// Messages were nested deeper than the decoder allows.
    #[error("messages are nested deeper than {0} levels")]
    RecursionLimit(usize),
}
