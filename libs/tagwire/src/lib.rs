//! # Tagged Wire Encoding
//!
//! Schema-driven binary format for JSON-like values, following the shape of
//! protocol buffers without needing generated code. A schema maps route names
//! to message types, and messages are encoded as a sequence of tagged fields.
//!
//! Schemas are JSON objects. Keys declare fields as `"<option> <type> <name>"`
//! with the tag as the value, or nested message types as `"message <name>"`
//! with an object as the value:
//!
//! ```json
//! {
//!     "onChat": {
//!         "message Sender": { "required string name": 1 },
//!         "required Sender from": 1,
//!         "repeated uInt32 targets": 2
//!     }
//! }
//! ```
//!
//! Every field is written as a wire tag, `tag << 3 | code`, followed by its
//! value. The codes are:
//!
//! - `0`: varint, for `uInt32`, `uInt64`, `int32`, `sInt32`, and `sInt64`
//! - `1`: 8 bytes little-endian, for `double`
//! - `2`: varint length followed by that many bytes, for `string` and messages
//! - `5`: 4 bytes little-endian, for `float`
//!
//! `uInt64` and `sInt64` use code `0` because they are written as varints,
//! like the 32-bit types. They don't fall back to code `2`, which would claim
//! a length prefix their values don't have.
//!
//! Signed integers use zig-zag encoding, so `int32` and `sInt32` are the same.
//! Repeated numeric fields are packed: one tag, the element count, and then
//! the bare elements. Repeated strings and messages repeat the tag for every
//! element instead.
//!
//! Optional fields absent from the value are not written. Repeated fields must
//! be given, as an empty array if needed, and `null` is never a valid field
//! value. Decoding yields empty arrays for repeated fields missing from the
//! data.
//!
//! Unknown fields are skipped while decoding, except those with code `0`: a
//! packed list has that code but is followed by its element count, not its
//! byte length, so such fields make decoding fail. Adding integer fields to a
//! schema therefore breaks decoders that still use the older one.

pub mod codec;
pub mod de;
pub mod scalar;
pub mod schema;
pub mod ser;
pub mod varint;


pub use codec::Codec;
pub use de::Decoder;
pub use schema::SchemaTree;
pub use ser::Encoder;
pub use serde_json::{Map, Value};

/// The deepest messages may be nested, in either direction.
pub const MAX_DEPTH: usize = 100;
