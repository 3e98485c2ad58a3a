//! Lossless interchange between an editor's document tree and Pandoc token streams
//!
//!     A rich-text editor keeps its documents as a tree of typed nodes carrying marks. Markdown
//!     engines (Pandoc, comrak) speak a linear, recursively nested token stream instead. This crate
//!     converts between the two so that content can round-trip through edits without losing
//!     structure, formatting, attributes or footnote references.
//!
//!     This is a pure lib, that is, it powers quill-cli but is shell agnostic: no code here should
//!     suppose a shell environment, be it std printing, env vars (the pandoc binary override being
//!     the one exception) etc.
//!
//! Architecture
//!
//!     The conversion itself knows nothing about individual constructs. Node and mark types are
//!     declared as specs (./schema) and assembled into a validated [`registry::Registry`], which
//!     the reader and writer (./common) consult per token and per node.
//!
//!     The file structure :
//!     .
//!     ├── error.rs                # Shared error types
//!     ├── engine.rs               # MarkdownEngine trait
//!     ├── registry.rs             # Type rule registry
//!     ├── session.rs              # Converter façade
//!     ├── ir
//!     │   ├── tokens.rs           # Token stream
//!     │   └── nodes.rs            # Document tree
//!     ├── common
//!     │   ├── attr.rs             # Pandoc attribute codec
//!     │   ├── reader.rs           # Tokens → tree
//!     │   └── writer.rs           # Tree → tokens
//!     ├── schema                  # Built-in node and mark types
//!     └── formats
//!         ├── pandoc              # Out-of-process engine
//!         ├── markdown            # In-process comrak engine
//!         └── treeviz             # Debug rendering
//!
//! Testing
//!     tests
//!     ├── lib.rs                  # Aggregates the modules below
//!     ├── <area>.rs
//!     └── common/mod.rs           # Shared builders
//!
//!     Note that rust does not by default discover tests in subdirectories, so we need to include
//!     these in the mod.
//!
//! Core Algorithms
//!
//!     Reading is a single walk over the stream with an explicit frame stack and an open-mark
//!     set. Marks in the stream are wrappers (`Strong [..]`); in the tree they are sets carried
//!     by each text node. Writing reverses this by grouping runs of siblings that share the
//!     outermost residual mark, see ./common/writer.rs.
//!
//!     Footnote bodies are pulled out of the flow into a side collection ([`ir::nodes::Notes`])
//!     and replaced by a placeholder that keeps a snapshot of the body, so that a placeholder
//!     copied without its note can still be written.

pub mod common;
pub mod engine;
pub mod error;
pub mod formats;
pub mod ir;
pub mod registry;
pub mod schema;
pub mod session;

pub use common::reader::{ReadError, Reader, ReaderOptions};
pub use common::writer::{WriteError, Writer};
pub use engine::{MarkdownEngine, FORMAT_SPECIFIER};
pub use error::{SessionError, ShapeError};
pub use ir::nodes::{Document, Mark, Node, Notes};
pub use ir::tokens::{ApiVersion, Token, TokenStream};
pub use registry::{Registry, RegistryError};
pub use session::Session;

/// Reads a token stream into a document tree with default reader options.
pub fn read_tokens(stream: &TokenStream, registry: &Registry) -> Result<Document, ReadError> {
    Reader::new(registry, ReaderOptions::default()).read(&stream.blocks)
}

/// Writes a document tree into a token stream stamped with `api_version`.
///
/// The stream's metadata is left empty; use a [`Session`] to carry metadata across a round
/// trip.
pub fn write_tokens(
    doc: &Document,
    registry: &Registry,
    api_version: ApiVersion,
) -> Result<TokenStream, WriteError> {
    let blocks = Writer::new(registry, &doc.notes).write_blocks(&doc.body)?;
    Ok(TokenStream::new(api_version, blocks))
}
