// Command-line interface for quill
//
// This binary drives the quill-babel converter from the shell: markdown goes through a markdown
// engine into a token stream, the token stream is read into a document tree, and the tree is
// written back out. Each stage can be looked at on its own.
//
// Usage:
//  quill tokens <input> [--treeviz]                 - Token stream produced by the engine
//  quill to-tree <input> [--treeviz]                - Document tree as JSON
//  quill from-tree <tree.json> [--api-version V]    - Markdown rendered from a saved tree
//  quill round-trip <input>                         - markdown → tree → markdown
//
// Every command writes to stdout unless -o/--output is given.
//
// Global options:
//  --config PATH      Layer a configuration file over quill.toml and the built-in defaults
//  --engine NAME      Pick the markdown engine (pandoc or comrak), overriding the configuration
//  --log-level LEVEL  Log verbosity on stderr, overriding RUST_LOG and the configuration

mod logging;

use clap::{Arg, ArgAction, ArgMatches, Command, ValueHint};
use quill_babel::formats::markdown::ComrakEngine;
use quill_babel::formats::pandoc::PandocEngine;
use quill_babel::formats::treeviz::{document_to_treeviz, tokens_to_treeviz};
use quill_babel::{ApiVersion, Document, MarkdownEngine, Session, FORMAT_SPECIFIER};
use quill_config::{EngineKind, Loader, PandocConfig, QuillConfig, PROJECT_FILE};
use std::fs;

/// Stamp used by `from-tree` when no `--api-version` is given.
const DEFAULT_API_VERSION: &str = "1.23.1";

const ENGINES: &[&str] = &["pandoc", "comrak"];

fn input_arg(help: &'static str) -> Arg {
    Arg::new("input")
        .help(help)
        .required(true)
        .index(1)
        .value_hint(ValueHint::FilePath)
}

fn output_arg() -> Arg {
    Arg::new("output")
        .long("output")
        .short('o')
        .help("Output file path (defaults to stdout)")
        .value_hint(ValueHint::FilePath)
}

fn treeviz_arg() -> Arg {
    Arg::new("treeviz")
        .long("treeviz")
        .help("Print a tree visualization instead of JSON")
        .action(ArgAction::SetTrue)
}

fn build_cli() -> Command {
    Command::new("quill")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Convert markdown to rich-text document trees and back")
        .long_about(
            "quill converts markdown into the document tree a rich-text editor works on,\n\
            and renders edited trees back to markdown through a Pandoc-compatible engine.\n\n\
            Engines:\n  \
            - pandoc: the external pandoc binary (reads and writes JSON token streams)\n  \
            - comrak: an in-process CommonMark engine, no external tools needed\n\n\
            Examples:\n  \
            quill tokens notes.md --treeviz          # What the engine produced\n  \
            quill to-tree notes.md -o notes.json     # Save the document tree\n  \
            quill from-tree notes.json               # Render a saved tree\n  \
            quill round-trip notes.md --engine comrak",
        )
        .arg_required_else_help(true)
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .long("config")
                .value_name("PATH")
                .help("Path to a quill.toml configuration file")
                .value_hint(ValueHint::FilePath)
                .global(true),
        )
        .arg(
            Arg::new("engine")
                .long("engine")
                .help("Markdown engine to use (overrides the configuration)")
                .value_parser(clap::builder::PossibleValuesParser::new(ENGINES))
                .global(true),
        )
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .value_name("LEVEL")
                .help("Log level on stderr: off, error, warn, info, debug, trace")
                .global(true),
        )
        .subcommand(
            Command::new("tokens")
                .about("Print the token stream the engine produces for a markdown file")
                .arg(input_arg("Markdown file"))
                .arg(treeviz_arg())
                .arg(output_arg()),
        )
        .subcommand(
            Command::new("to-tree")
                .about("Convert a markdown file into a document tree")
                .arg(input_arg("Markdown file"))
                .arg(treeviz_arg())
                .arg(output_arg()),
        )
        .subcommand(
            Command::new("from-tree")
                .about("Render a document tree (JSON) back to markdown")
                .long_about(
                    "Render a document tree saved by `quill to-tree` back to markdown.\n\n\
                    A saved tree does not remember which token stream version it was read\n\
                    from, so the stream is stamped with --api-version (default 1.23.1).",
                )
                .arg(input_arg("Document tree JSON file"))
                .arg(
                    Arg::new("api-version")
                        .long("api-version")
                        .value_name("VERSION")
                        .help("Token stream API version to stamp, e.g. 1.23.1")
                        .default_value(DEFAULT_API_VERSION),
                )
                .arg(output_arg()),
        )
        .subcommand(
            Command::new("round-trip")
                .about("Convert markdown to a tree and straight back to markdown")
                .arg(input_arg("Markdown file"))
                .arg(output_arg()),
        )
}

#[tokio::main]
async fn main() {
    let matches = build_cli().get_matches();

    let config = load_cli_config(
        matches.get_one::<String>("config").map(|s| s.as_str()),
        matches.get_one::<String>("engine").map(|s| s.as_str()),
    );

    let _logger = logging::resolve_level(
        matches.get_one::<String>("log-level").map(|s| s.as_str()),
        &config.logging.level,
    )
    .and_then(logging::init)
    .unwrap_or_else(|err| {
        eprintln!("Failed to start logging: {err}");
        std::process::exit(1);
    });

    log::debug!("using the {} engine", config.convert.engine.as_str());

    let (name, sub_matches) = match matches.subcommand() {
        Some(pair) => pair,
        None => {
            eprintln!("Unknown subcommand. Use --help for usage information.");
            std::process::exit(1);
        }
    };

    let result = match config.convert.engine {
        EngineKind::Comrak => run(ComrakEngine::new(), name, sub_matches, &config).await,
        EngineKind::Pandoc => run(pandoc_engine(&config.pandoc), name, sub_matches, &config).await,
    };

    let text = result.unwrap_or_else(|err| {
        eprintln!("Error: {err}");
        std::process::exit(1);
    });

    let output = sub_matches.get_one::<String>("output").map(|s| s.as_str());
    write_output(output, &text);
}

/// Dispatch a subcommand against one engine, returning the text to emit.
async fn run<E: MarkdownEngine>(
    engine: E,
    command: &str,
    matches: &ArgMatches,
    config: &QuillConfig,
) -> Result<String, String> {
    let input = matches
        .get_one::<String>("input")
        .map(|s| s.as_str())
        .ok_or("an input file is required")?;
    let source = read_input(input)?;

    match command {
        "tokens" => handle_tokens_command(&engine, &source, matches.get_flag("treeviz")).await,
        "to-tree" => {
            let mut session = new_session(engine, config)?;
            let doc = session.to_tree(&source).await.map_err(|e| e.to_string())?;
            render_tree(&doc, matches.get_flag("treeviz"))
        }
        "from-tree" => {
            let raw = matches
                .get_one::<String>("api-version")
                .map(|s| s.as_str())
                .unwrap_or(DEFAULT_API_VERSION);
            let version: ApiVersion = raw.parse()?;
            let doc: Document = serde_json::from_str(&source)
                .map_err(|e| format!("'{input}' is not a document tree: {e}"))?;

            let registry = config.convert.registry().map_err(|e| e.to_string())?;
            let session = Session::with_format_version(engine, registry, version);
            session.from_tree(&doc).await.map_err(|e| e.to_string())
        }
        "round-trip" => {
            let mut session = new_session(engine, config)?;
            let doc = session.to_tree(&source).await.map_err(|e| e.to_string())?;
            session.from_tree(&doc).await.map_err(|e| e.to_string())
        }
        other => Err(format!("Unknown subcommand '{other}'")),
    }
}

/// Handle the tokens command
async fn handle_tokens_command<E: MarkdownEngine>(
    engine: &E,
    source: &str,
    treeviz: bool,
) -> Result<String, String> {
    let stream = engine
        .markdown_to_ast(FORMAT_SPECIFIER, source)
        .await
        .map_err(|e| format!("{} failed: {e}", engine.name()))?;

    if treeviz {
        Ok(tokens_to_treeviz(&stream.blocks))
    } else {
        serde_json::to_string_pretty(&stream)
            .map(|json| json + "\n")
            .map_err(|e| e.to_string())
    }
}

fn render_tree(doc: &Document, treeviz: bool) -> Result<String, String> {
    if treeviz {
        Ok(document_to_treeviz(doc))
    } else {
        serde_json::to_string_pretty(doc)
            .map(|json| json + "\n")
            .map_err(|e| e.to_string())
    }
}

fn new_session<E: MarkdownEngine>(engine: E, config: &QuillConfig) -> Result<Session<E>, String> {
    let registry = config
        .convert
        .registry()
        .map_err(|e| format!("Invalid schema configuration: {e}"))?;
    Ok(Session::new(engine, registry).with_options((&config.convert).into()))
}

fn pandoc_engine(config: &PandocConfig) -> PandocEngine {
    PandocEngine::new()
        .with_binary(&config.binary)
        .with_args(config.extra_args.iter().cloned())
}

fn read_input(path: &str) -> Result<String, String> {
    fs::read_to_string(path).map_err(|e| format!("Error reading file '{path}': {e}"))
}

fn write_output(output: Option<&str>, text: &str) {
    match output {
        Some(path) => {
            fs::write(path, text).unwrap_or_else(|e| {
                eprintln!("Error writing file '{path}': {e}");
                std::process::exit(1);
            });
        }
        None => print!("{text}"),
    }
}

fn load_cli_config(explicit_path: Option<&str>, engine: Option<&str>) -> QuillConfig {
    try_load_config(explicit_path, engine).unwrap_or_else(|err| {
        eprintln!("Failed to load configuration: {err}");
        std::process::exit(1);
    })
}

fn try_load_config(
    explicit_path: Option<&str>,
    engine: Option<&str>,
) -> Result<QuillConfig, quill_config::ConfigError> {
    let loader = Loader::new().with_optional_file(PROJECT_FILE);
    let loader = if let Some(path) = explicit_path {
        loader.with_file(path)
    } else {
        loader
    };
    let loader = if let Some(engine) = engine {
        loader.set_override("convert.engine", engine)?
    } else {
        loader
    };
    loader.build()
}
