use std::path::{Path, PathBuf};

use serde::Deserialize;

pub mod setup;

/// Configuration used when no other layer overrides it.
pub const DEFAULT_CONFIG: &str = include_str!("../../assets/default_config.toml");

#[derive(Debug, Deserialize)]
pub struct Config {
    pub schema: SchemaConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Deserialize)]
pub struct SchemaConfig {
    /// JSON schema for values that get encoded.
    pub encode: PathBuf,
    /// JSON schema for payloads that get decoded.
    ///
    /// Uses the encode schema if absent.
    pub decode: Option<PathBuf>,
}

impl SchemaConfig {
    pub fn decode_path(&self) -> &Path {
        self.decode.as_deref().unwrap_or(&self.encode)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct LogConfig {
    /// Whether to route panics through the logger.
    #[serde(default)]
    pub panic: bool,
    #[serde(default)]
    pub log4rs: log4rs::config::RawConfig,
}
