//! Converter façade
//!
//! A [`Session`] pairs a markdown engine with a registry for the lifetime of one edit
//! session. Reading records the token stream's API version (and metadata) so that the
//! stream produced on write is stamped the same way the engine produced it.

use crate::common::reader::{Reader, ReaderOptions};
use crate::common::writer::Writer;
use crate::engine::{MarkdownEngine, FORMAT_SPECIFIER};
use crate::error::SessionError;
use crate::ir::nodes::Document;
use crate::ir::tokens::{ApiVersion, TokenStream};
use crate::registry::Registry;
use log::debug;

pub struct Session<E> {
    engine: E,
    registry: Registry,
    options: ReaderOptions,
    api_version: Option<ApiVersion>,
    meta: serde_json::Value,
}

impl<E: MarkdownEngine> Session<E> {
    pub fn new(engine: E, registry: Registry) -> Self {
        Session {
            engine,
            registry,
            options: ReaderOptions::default(),
            api_version: None,
            meta: serde_json::Value::Object(serde_json::Map::new()),
        }
    }

    /// A session that can write before reading, for trees restored from storage.
    pub fn with_format_version(engine: E, registry: Registry, version: ApiVersion) -> Self {
        Session {
            api_version: Some(version),
            ..Session::new(engine, registry)
        }
    }

    pub fn with_options(mut self, options: ReaderOptions) -> Self {
        self.options = options;
        self
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn format_version(&self) -> Option<&ApiVersion> {
        self.api_version.as_ref()
    }

    /// Parses markdown into a document tree.
    pub async fn to_tree(&mut self, source: &str) -> Result<Document, SessionError<E::Error>> {
        debug!("{}: markdown to tree ({} bytes)", self.engine.name(), source.len());
        let stream = self
            .engine
            .markdown_to_ast(FORMAT_SPECIFIER, source)
            .await
            .map_err(SessionError::Engine)?;
        Ok(self.read_stream(stream)?)
    }

    /// Renders a document tree back to markdown.
    pub async fn from_tree(&self, doc: &Document) -> Result<String, SessionError<E::Error>> {
        let stream = self.write_stream(doc)?;
        debug!(
            "{}: tree to markdown ({} blocks, api {})",
            self.engine.name(),
            stream.blocks.len(),
            stream.api_version
        );
        self.engine
            .ast_to_markdown(FORMAT_SPECIFIER, &stream)
            .await
            .map_err(SessionError::Engine)
    }

    /// Records the stream's version and metadata, then reads it.
    pub fn read_stream(
        &mut self,
        stream: TokenStream,
    ) -> Result<Document, crate::common::reader::ReadError> {
        let doc = Reader::new(&self.registry, self.options).read(&stream.blocks)?;
        self.api_version = Some(stream.api_version);
        self.meta = stream.meta;
        Ok(doc)
    }

    /// Writes a tree into a stream stamped with the recorded version and metadata.
    pub fn write_stream(&self, doc: &Document) -> Result<TokenStream, SessionError<E::Error>> {
        let api_version = self
            .api_version
            .clone()
            .ok_or(SessionError::MissingFormatVersion)?;
        let blocks = Writer::new(&self.registry, &doc.notes).write_blocks(&doc.body)?;
        Ok(TokenStream {
            api_version,
            meta: self.meta.clone(),
            blocks,
        })
    }
}
