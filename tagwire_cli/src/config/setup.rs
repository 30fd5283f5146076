//! Reads the configuration from an ordered list of sources.

use std::ffi::OsString;
use std::path::Path;
use std::{env, fs, io};

use anyhow::{Context as _, Result};
use serde::de::DeserializeOwned;
use smallvec::SmallVec;
use toml::map::Entry;
use toml::{Table, Value};

/// Where configuration values come from.
#[derive(Debug, Clone, Copy)]
pub enum Source<'a> {
    /// TOML text compiled into the binary.
    Text(&'a str),
    /// A TOML file. A missing file is only an error if it is `required`.
    File { path: &'a Path, required: bool },
    /// Environment variables whose names start with `prefix`.
    ///
    /// `__` splits a name into nested keys, so with the prefix `TAGWIRE_` the
    /// variable `TAGWIRE_SCHEMA__ENCODE` sets `schema.encode`.
    Env { prefix: &'a str },
}

impl Source<'_> {
    /// Reads this source into a table. `None` means it has nothing to add.
    fn read(self) -> Result<Option<Table>> {
        match self {
            Self::Text(text) => toml::from_str(text)
                .context("embedded config is invalid")
                .map(Some),
            Self::File { path, required } => match fs::read_to_string(path) {
                Ok(text) => toml::from_str(&text)
                    .with_context(|| format!("config {path:?} is invalid"))
                    .map(Some),
                Err(why) if !required && why.kind() == io::ErrorKind::NotFound => {
                    log::trace!("Optional config {path:?} not found");
                    Ok(None)
                },
                Err(why) => Err(why).with_context(|| format!("cannot read config {path:?}")),
            },
            Self::Env { prefix } => Ok(Some(env_table(prefix, env::vars_os()))),
        }
    }
}

/// Merges `sources` in order and deserializes the result.
///
/// Values of later sources replace those of earlier ones. Tables are merged
/// key by key.
pub fn load<T: DeserializeOwned>(sources: &[Source<'_>]) -> Result<T> {
    let mut table = Table::new();
    for source in sources {
        if let Some(layer) = source.read()? {
            merge_tables(&mut table, layer);
        }
    }

    T::deserialize(table).context("cannot deserialize config")
}

/// Builds a table from the variables starting with `prefix`.
///
/// Names are lowercased after the prefix is removed. Names that aren't UTF-8
/// are ignored, values that aren't UTF-8 are converted lossily.
fn env_table<I>(prefix: &str, vars: I) -> Table
where
    I: IntoIterator<Item = (OsString, OsString)>,
{
    let mut table = Table::new();
    for (name, value) in vars {
        let Some(name) = name.to_str().and_then(|n| n.strip_prefix(prefix)) else {
            continue;
        };

        if name.is_empty() {
            continue;
        }

        let name = name.to_ascii_lowercase();
        let value = value
            .into_string()
            .unwrap_or_else(|o| o.to_string_lossy().into_owned());

        let path = name.split("__").collect::<SmallVec<[&str; 4]>>();
        insert_at(&mut table, &path, Value::String(value));
    }

    table
}

fn merge_tables(target: &mut Table, source: Table) {
    for (key, value) in source {
        match target.entry(key) {
            Entry::Vacant(entry) => _ = entry.insert(value),
            Entry::Occupied(mut entry) => match (entry.get_mut(), value) {
                (Value::Table(a), Value::Table(b)) => merge_tables(a, b),
                (a, b) => *a = b,
            },
        }
    }
}

/// Sets the value at a key path, replacing anything that isn't a table on
/// the way.
fn insert_at(table: &mut Table, path: &[&str], value: Value) {
    let [first, rest @ ..] = path else {
        return;
    };

    match table.entry(*first) {
        Entry::Vacant(entry) => _ = entry.insert(nested_value(rest, value)),
        Entry::Occupied(mut entry) => match entry.get_mut() {
            Value::Table(inner) if !rest.is_empty() => insert_at(inner, rest, value),
            slot => *slot = nested_value(rest, value),
        },
    }
}

fn nested_value(path: &[&str], value: Value) -> Value {
    path.iter().rev().fold(value, |value, segment| {
        let mut table = Table::new();
        table.insert((*segment).to_owned(), value);
        Value::Table(table)
    })
}
