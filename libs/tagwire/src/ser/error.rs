use std::fmt;

/// Potential errors to encounter when encoding a value.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The route was empty.
    #[error("route must not be empty")]
    EmptyRoute,
    /// The value to encode was `null`.
    #[error("value for route `{0}` must not be null")]
    NullValue(String),
    /// The route is not part of the schema.
    #[error("unknown route `{0}`")]
    UnknownRoute(String),
    /// The value does not have the shape the schema requires.
    #[error("{violation}! field: {field}, proto: {expected}, value: {value}")]
    Validation {
        violation: Violation,
        /// Path of the offending field, f.e. `items[2].id`.
        field: String,
        /// The declared option and type, f.e. `repeated Item`.
        expected: String,
        /// The offending value as JSON.
        value: String,
    },
    /// A value could not be represented as its declared type.
    #[error("cannot encode {value} as `{type_name}` for field {field}")]
    InvalidValue {
        field: String,
        type_name: String,
        value: String,
    },
    /// Messages were nested deeper than the encoder allows.
    #[error("messages are nested deeper than {0} levels")]
    RecursionLimit(usize),
}

/// The kind of a [`Error::Validation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Violation {
    /// A required field is missing or `null`.
    MissingRequired,
    /// A repeated field is not an array.
    NotAnArray,
    /// A message-typed value is not an object.
    NotAMessage,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::MissingRequired => "no property exists for required field",
            Self::NotAnArray => "repeated field should be an array",
            Self::NotAMessage => "message field should be an object",
        })
    }
}
