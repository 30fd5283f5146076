//! Text forms of encoded payloads.

use anyhow::{Context as _, Result};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use clap::ValueEnum;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    /// Standard base64.
    Base64,
    /// Lowercase hexadecimal.
    Hex,
    /// The bytes as-is.
    Raw,
}

impl Format {
    /// Formats a payload for output. Text forms end with a newline.
    pub fn to_output(self, buf: &[u8]) -> Vec<u8> {
        let mut text = match self {
            Self::Base64 => STANDARD.encode(buf),
            Self::Hex => hex::encode(buf),
            Self::Raw => return buf.to_vec(),
        };

        text.push('\n');
        text.into_bytes()
    }

    /// Parses a payload from input. Surrounding whitespace of text forms is
    /// ignored.
    pub fn parse_input(self, input: &[u8]) -> Result<Vec<u8>> {
        match self {
            Self::Base64 => STANDARD
                .decode(input.trim_ascii())
                .context("input is not valid base64"),
            Self::Hex => hex::decode(input.trim_ascii()).context("input is not valid hex"),
            Self::Raw => Ok(input.to_vec()),
        }
    }
}
