//! Combines an encoder and a decoder into one handle.
//!
//! The two directions may use different schemas, f.e. when the messages a
//! server sends differ from the ones it receives.

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use serde_json::Value;

use crate::de::{self, Decoder};
use crate::schema::SchemaTree;
use crate::ser::Encoder;

/// Potential errors to encounter when decoding text input.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The input was not valid base64.
    #[error("invalid base64 input: {0}")]
    Base64(#[from] base64::DecodeError),
    /// The decoded bytes were not a valid message.
    #[error(transparent)]
    Decode(#[from] de::Error),
}

/// Encodes and decodes messages by route.
#[derive(Debug, Clone)]
pub struct Codec {
    encoder: Encoder,
    decoder: Decoder,
}

impl Codec {
    /// Creates a codec from already compiled trees.
    ///
    /// Pass the same tree twice to use one schema for both directions.
    pub fn new(encode_tree: Arc<SchemaTree>, decode_tree: Arc<SchemaTree>) -> Self {
        Self {
            encoder: Encoder::new(encode_tree),
            decoder: Decoder::new(decode_tree),
        }
    }

    /// Compiles both raw schemas and creates a codec from them.
    pub fn from_schemas(encode: &Value, decode: &Value) -> Self {
        Self::new(
            Arc::new(Self::parse(encode)),
            Arc::new(Self::parse(decode)),
        )
    }

    /// Compiles a raw schema. Dropped declarations are logged.
    pub fn parse(raw: &Value) -> SchemaTree {
        SchemaTree::compile(raw)
    }

    pub fn encoder(&self) -> &Encoder {
        &self.encoder
    }

    pub fn decoder(&self) -> &Decoder {
        &self.decoder
    }

    /// Encodes `value` as a message for `route`.
    ///
    /// See [`Encoder::encode`].
    pub fn encode(&self, route: &str, value: &Value) -> Option<Bytes> {
        self.encoder.encode(route, value)
    }

    /// Encodes `value` into an owned buffer.
    ///
    /// Unlike [`Self::encode`], an empty payload is treated as a failure.
    pub fn encode_to_vec(&self, route: &str, value: &Value) -> Option<Vec<u8>> {
        let buf = self.encode(route, value)?;
        if buf.is_empty() {
            log::warn!("Encoding `{route}` produced an empty payload");
            return None;
        }

        Some(buf.into())
    }

    /// Encodes `value` and returns it as standard base64.
    ///
    /// Returns an empty string if encoding fails.
    pub fn encode_str(&self, route: &str, value: &Value) -> String {
        self.encode_str_with(route, value, &STANDARD)
    }

    /// Encodes `value` and returns it as base64 of the given engine.
    ///
    /// Returns an empty string if encoding fails.
    pub fn encode_str_with<E: Engine>(&self, route: &str, value: &Value, engine: &E) -> String {
        self.encode(route, value)
            .map(|buf| engine.encode(buf))
            .unwrap_or_default()
    }

    /// Decodes a message for `route`.
    ///
    /// # Errors
    ///
    /// See [`Decoder::decode`].
    pub fn decode(&self, route: &str, buf: &[u8]) -> Result<Option<Value>, de::Error> {
        self.decoder.decode(route, buf)
    }

    /// Decodes a standard base64 message for `route`.
    ///
    /// # Errors
    ///
    /// Returns `Err` if `input` isn't base64 or doesn't hold a valid message.
    pub fn decode_str(&self, route: &str, input: &str) -> Result<Option<Value>, Error> {
        self.decode_str_with(route, input, &STANDARD)
    }

    /// Decodes a message for `route` from base64 of the given engine.
    ///
    /// # Errors
    ///
    /// Returns `Err` if `input` isn't base64 or doesn't hold a valid message.
    pub fn decode_str_with<E: Engine>(
        &self,
        route: &str,
        input: &str,
        engine: &E,
    ) -> Result<Option<Value>, Error> {
        let buf = engine.decode(input)?;
        Ok(self.decode(route, &buf)?)
    }
}

#[cfg(test)]
mod tests {
    use base64::engine::general_purpose::URL_SAFE_NO_PAD;
    use serde_json::json;

    use super::*;

    fn codec() -> Codec {
        let schema = json!({
            "Foo": {
                "required uInt32 id": 1,
                "optional string name": 2,
            },
            "Empty": {
                "optional uInt32 id": 1,
            },
        });

        Codec::from_schemas(&schema, &schema)
    }

    #[test]
    fn base64_round_trip() {
        let codec = codec();
        let value = json!({ "id": 5, "name": "ok" });

        let text = codec.encode_str("Foo", &value);
        assert_eq!(text, "CAUSAm9r");

        let rev = codec.decode_str("Foo", &text).expect("valid base64 message");
        assert_eq!(rev, Some(value));
    }

    #[test]
    fn other_engine() {
        let codec = codec();
        let value = json!({ "id": 300, "name": "??>" });

        let text = codec.encode_str_with("Foo", &value, &URL_SAFE_NO_PAD);
        assert!(!text.contains(['+', '/', '=']), "{text}");

        let rev = codec
            .decode_str_with("Foo", &text, &URL_SAFE_NO_PAD)
            .expect("valid base64 message");
        assert_eq!(rev, Some(value));
    }

    #[test]
    fn failures() {
        let codec = codec();
        assert_eq!(codec.encode_str("Foo", &json!({})), "");
        assert_eq!(codec.encode_str("Bar", &json!({ "id": 1 })), "");
        assert_eq!(codec.encode_to_vec("Empty", &json!({})), None);
        assert_eq!(
            codec.encode_to_vec("Foo", &json!({ "id": 1 })),
            Some(vec![0x08, 0x01])
        );

        let res = codec.decode_str("Foo", "not base64!");
        assert!(matches!(res, Err(Error::Base64(_))), "{res:?}");

        let res = codec.decode_str("Foo", "EgU=");
        assert!(
            matches!(res, Err(Error::Decode(de::Error::UnexpectedEof))),
            "{res:?}"
        );
    }

    #[test]
    fn directions_use_own_schema() {
        let codec = Codec::from_schemas(
            &json!({ "onChat": { "required string msg": 1 } }),
            &json!({ "chat": { "required uInt32 target": 1 } }),
        );

        assert!(codec.encoder().tree().route("onChat").is_some());
        assert!(codec.encoder().tree().route("chat").is_none());
        assert!(codec.decoder().tree().route("chat").is_some());

        let buf = codec.encode("onChat", &json!({ "msg": "hi" })).expect("valid value");
        assert_eq!(codec.decode("onChat", &buf).expect("not an error"), None);
        assert_eq!(
            codec.decode("chat", &[0x08, 0x07]).expect("valid message"),
            Some(json!({ "target": 7 }))
        );
    }
}
