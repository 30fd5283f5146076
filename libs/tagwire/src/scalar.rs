//! Simple field types and their wire representation.

use std::fmt;

use bytes::BufMut;
use serde_json::Value;

use crate::de::{Cursor, Error};
use crate::varint;

/// The framing of a field's payload, stored in the low 3 bits of a wire tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum WireCode {
    /// A single varint.
    Varint = 0,
    /// 8 bytes, little-endian.
    Fixed64 = 1,
    /// A varint byte length followed by that many bytes.
    LengthDelimited = 2,
    /// 4 bytes, little-endian.
    Fixed32 = 5,
}

impl WireCode {
    /// Gets the code from the low 3 bits of a wire tag, if it is known.
    pub const fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            0 => Some(Self::Varint),
            1 => Some(Self::Fixed64),
            2 => Some(Self::LengthDelimited),
            5 => Some(Self::Fixed32),
            _ => None,
        }
    }

    /// The numeric code.
    pub const fn bits(self) -> u8 {
        self as u8
    }
}

/// A primitive field type, as opposed to a message reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarType {
    UInt32,
    SInt32,
    Int32,
    UInt64,
    SInt64,
    Float,
    Double,
    String,
}

impl ScalarType {
    /// All simple types.
    pub const ALL: [Self; 8] = [
        Self::UInt32,
        Self::SInt32,
        Self::Int32,
        Self::UInt64,
        Self::SInt64,
        Self::Float,
        Self::Double,
        Self::String,
    ];

    /// Looks up a simple type by its schema name, f.e. `uInt32`.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.name() == name)
    }

    /// The name used for this type in schemas.
    pub const fn name(self) -> &'static str {
        match self {
            Self::UInt32 => "uInt32",
            Self::SInt32 => "sInt32",
            Self::Int32 => "int32",
            Self::UInt64 => "uInt64",
            Self::SInt64 => "sInt64",
            Self::Float => "float",
            Self::Double => "double",
            Self::String => "string",
        }
    }

    /// The wire code written into tags for fields of this type.
    pub const fn wire_code(self) -> WireCode {
        match self {
            Self::UInt32 | Self::SInt32 | Self::Int32 | Self::UInt64 | Self::SInt64 => {
                WireCode::Varint
            },
            Self::Float => WireCode::Fixed32,
            Self::Double => WireCode::Fixed64,
            Self::String => WireCode::LengthDelimited,
        }
    }

    /// Whether repeated fields of this type are written as one tag, an element
    /// count, and the bare elements.
    ///
    /// Strings are not: like messages, every element gets its own tag.
    pub const fn is_packable(self) -> bool {
        !matches!(self, Self::String)
    }

    /// Writes `value` as this type.
    ///
    /// Returns [`None`] without writing anything if the value cannot be
    /// represented, f.e. a negative number for an unsigned type.
    pub(crate) fn write<B: BufMut + ?Sized>(self, buf: &mut B, value: &Value) -> Option<()> {
        match self {
            Self::UInt32 => varint::write(buf, u32::try_from(to_u64(value)?).ok()?),
            Self::UInt64 => varint::write(buf, to_u64(value)?),
            Self::SInt32 | Self::Int32 => varint::write(buf, i32::try_from(to_i64(value)?).ok()?),
            Self::SInt64 => varint::write(buf, to_i64(value)?),
            #[allow(clippy::cast_possible_truncation)]
            Self::Float => buf.put_f32_le(to_f64(value)? as f32),
            Self::Double => buf.put_f64_le(to_f64(value)?),
            Self::String => {
                let s = value.as_str()?;
                varint::write(buf, s.len());
                buf.put_slice(s.as_bytes());
            },
        }

        Some(())
    }

    /// Reads a value of this type.
    ///
    /// Non-finite floats become [`Value::Null`] since JSON cannot hold them.
    pub(crate) fn read(self, cursor: &mut Cursor<'_>) -> Result<Value, Error> {
        let value = match self {
            Self::UInt32 => Value::from(cursor.read_varint::<u32>()?),
            Self::UInt64 => Value::from(cursor.read_varint::<u64>()?),
            Self::SInt32 | Self::Int32 => Value::from(cursor.read_varint::<i32>()?),
            Self::SInt64 => Value::from(cursor.read_varint::<i64>()?),
            Self::Float => Value::from(f64::from(f32::from_le_bytes(cursor.read_bytes()?))),
            Self::Double => Value::from(f64::from_le_bytes(cursor.read_bytes()?)),
            Self::String => {
                let len: usize = cursor.read_varint()?;
                let bytes = cursor.read_slice(len)?;
                let s = std::str::from_utf8(bytes).map_err(|_| Error::InvalidUtf8)?;
                Value::from(s)
            },
        };

        Ok(value)
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Converts a value to an unsigned integer.
///
/// Accepts integers, floats (rounded down) and strings holding a number.
fn to_u64(value: &Value) -> Option<u64> {
    if let Some(n) = value.as_u64() {
        return Some(n);
    }

    let f = to_f64(value)?.floor();
    if !(0.0..18_446_744_073_709_551_616.0).contains(&f) {
        return None;
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let n = f as u64;
    Some(n)
}

/// Converts a value to a signed integer. See [`to_u64`].
fn to_i64(value: &Value) -> Option<i64> {
    if let Some(n) = value.as_i64() {
        return Some(n);
    }

    let f = to_f64(value)?.floor();
    if !(-9_223_372_036_854_775_808.0..9_223_372_036_854_775_808.0).contains(&f) {
        return None;
    }

    #[allow(clippy::cast_possible_truncation)]
    let n = f as i64;
    Some(n)
}

fn to_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
