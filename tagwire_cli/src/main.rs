use std::fs;
use std::io::{self, Read as _, Write as _};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use tagwire::{Codec, SchemaTree, Value};

mod config;
mod payload;

use config::{Config, SchemaConfig};
use payload::Format;

/// Encodes JSON values as tagged binary messages and back.
#[derive(Debug, Parser)]
#[command(version)]
struct Cli {
    /// Config file to load instead of `tagwire.toml`.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Compiles the configured schemas and lists their routes.
    ///
    /// Fails if any schema declaration had to be dropped.
    Check,

    /// Encodes a JSON value as a message.
    Encode {
        /// The route whose message type to encode as.
        route: String,

        /// File holding the JSON value. Reads stdin if absent.
        #[arg(long)]
        value: Option<PathBuf>,

        /// How to write the payload.
        #[arg(short, long, value_enum, default_value_t = Format::Base64)]
        format: Format,
    },

    /// Decodes a message and prints it as JSON.
    Decode {
        /// The route whose message type to decode as.
        route: String,

        /// File holding the payload. Reads stdin if absent.
        #[arg(long)]
        input: Option<PathBuf>,

        /// How the payload is written.
        #[arg(short, long, value_enum, default_value_t = Format::Base64)]
        format: Format,

        /// Print the JSON on a single line.
        #[arg(long)]
        compact: bool,
    },
}

fn main() -> Result<()> {
    use std::panic;

    let cli = Cli::parse();
    let config = build_config(cli.config.as_deref())?;
    init_logging(config.log.log4rs)?;

    if config.log.panic {
        // register the custom panic handler after logging is set up
        panic::set_hook(Box::new(on_panic));
    }

    let res = run(cli.command, &config.schema);
    if let Err(why) = &res {
        log::error!("Exiting due to error: {why:?}");
    }

    log::logger().flush();
    res
}

fn run(command: Command, schema: &SchemaConfig) -> Result<()> {
    match command {
        Command::Check => check(schema),
        Command::Encode {
            route,
            value,
            format,
        } => {
            let codec = load_codec(schema)?;
            let input = read_input(value.as_deref())?;
            let value: Value =
                serde_json::from_slice(&input).context("value to encode is not valid json")?;

            let buf = codec
                .encoder()
                .try_encode(&route, &value)
                .with_context(|| format!("cannot encode `{route}`"))?;

            log::info!("Encoded `{route}` into {} bytes", buf.len());
            write_output(&format.to_output(&buf))
        },
        Command::Decode {
            route,
            input,
            format,
            compact,
        } => {
            let codec = load_codec(schema)?;
            let input = read_input(input.as_deref())?;
            let buf = format.parse_input(&input)?;

            let value = codec
                .decode(&route, &buf)
                .with_context(|| format!("cannot decode `{route}`"))?
                .with_context(|| format!("unknown route `{route}`"))?;

            let mut text = if compact {
                serde_json::to_string(&value)?
            } else {
                serde_json::to_string_pretty(&value)?
            };

            text.push('\n');
            write_output(text.as_bytes())
        },
    }
}

fn check(schema: &SchemaConfig) -> Result<()> {
    let mut out = io::stdout().lock();
    let mut dropped = 0usize;

    for (direction, path) in [
        ("encode", schema.encode.as_path()),
        ("decode", schema.decode_path()),
    ] {
        let raw = load_schema(path)?;
        let (tree, report) = SchemaTree::compile_with_report(&raw);

        writeln!(
            out,
            "{direction} schema {path:?}: {} routes, {} message types",
            tree.routes().count(),
            tree.len()
        )?;

        for route in tree.routes() {
            writeln!(out, "  route {route}")?;
        }

        for entry in &report {
            writeln!(out, "  dropped {entry}")?;
        }

        dropped += report.len();
    }

    anyhow::ensure!(dropped == 0, "{dropped} schema declarations were dropped");
    Ok(())
}

fn load_codec(schema: &SchemaConfig) -> Result<Codec> {
    let encode = Arc::new(compile_schema(&schema.encode)?);
    let decode = match &schema.decode {
        Some(path) => Arc::new(compile_schema(path)?),
        None => Arc::clone(&encode),
    };

    Ok(Codec::new(encode, decode))
}

fn compile_schema(path: &Path) -> Result<SchemaTree> {
    let raw = load_schema(path)?;
    let tree = SchemaTree::compile(&raw);
    log::debug!("Compiled schema {path:?} with {} message types", tree.len());
    Ok(tree)
}

fn load_schema(path: &Path) -> Result<Value> {
    let text =
        fs::read_to_string(path).with_context(|| format!("cannot read schema {path:?}"))?;
    serde_json::from_str(&text).with_context(|| format!("schema {path:?} is not valid json"))
}

fn read_input(path: Option<&Path>) -> Result<Vec<u8>> {
    if let Some(path) = path {
        return fs::read(path).with_context(|| format!("cannot read input {path:?}"));
    }

    let mut buf = Vec::new();
    io::stdin()
        .lock()
        .read_to_end(&mut buf)
        .context("cannot read stdin")?;
    Ok(buf)
}

fn write_output(buf: &[u8]) -> Result<()> {
    let mut out = io::stdout().lock();
    out.write_all(buf)
        .and_then(|()| out.flush())
        .context("cannot write to stdout")
}

fn build_config(path: Option<&Path>) -> Result<Config> {
    use crate::config::setup::{self, Source};

    let file = match path {
        Some(path) => Source::File {
            path,
            required: true,
        },
        None => Source::File {
            path: Path::new("tagwire.toml"),
            required: false,
        },
    };

    setup::load(&[
        Source::Text(config::DEFAULT_CONFIG),
        file,
        Source::Env { prefix: "TAGWIRE_" },
    ])
}

fn init_logging(config: log4rs::config::RawConfig) -> Result<()> {
    let deserializers = log4rs::config::Deserializers::default();
    let (appenders, errors) = config.appenders_lossy(&deserializers);
    if !errors.is_empty() {
        return Err(errors.into());
    }

    let config = log4rs::Config::builder()
        .appenders(appenders)
        .loggers(config.loggers())
        .build(config.root())?;

    log4rs::init_config(config)?;
    Ok(())
}

/// Writes panics to the logger and flushes it.
///
/// If the logger itself panicked, this doesn't make error reporting any worse.
fn on_panic(info: &std::panic::PanicHookInfo<'_>) {
    use std::backtrace::Backtrace;

    // the backtrace is always wanted once this hook is opted into
    let backtrace = Backtrace::force_capture();
    let thread = std::thread::current();
    let name = thread.name().unwrap_or("<unnamed>");

    // stdout carries payloads, and the loggers may be broken or empty
    _ = writeln!(io::stderr(), "thread '{name}' {info}");
    log::error!("thread '{name}' {info}\n{backtrace}");
    log::logger().flush();
}
