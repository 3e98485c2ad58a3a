//! Converts a document tree into a Pandoc token stream.
//!
//! # The High-Level Concept
//!
//! The writer walks the tree in pre-order and hands every node to the writer function its
//! type registered. Those functions build tokens through a small sink API: [`Writer::token`]
//! opens a token whose payload list is filled by a callback, and the scalar helpers
//! (`text_payload`, `integer`, `attr`, ...) append to whichever payload list is open.
//!
//! # Marks
//!
//! Marks are flat on the tree side and nested on the token side. Inside an inline sequence
//! the writer picks, for each child, the marks not already open (the *residual* set), opens
//! the outermost one by (priority, rank), and hands it the maximal run of consecutive
//! children that carry it. Nested runs resolve recursively through [`Writer::inlines`],
//! so `strong` always wraps `em` regardless of the order the marks were applied in.
//!
//! # Context
//!
//! Everything the walk needs besides the sink lives in [`WriteContext`]: the registry, the
//! notes collection (borrowed from the document), the currently open marks and the stack of
//! tight flags of enclosing lists.

use crate::common::attr::{self, PandocAttr};
use crate::common::reader::{CHECKED, UNCHECKED};
use crate::ir::nodes::{Mark, Node, Notes, PARAGRAPH, REF, SNAPSHOT};
use crate::ir::tokens::{self, Payload, Token, PARA, PLAIN, SPACE, STR};
use crate::registry::{MarkWriter, Registry};
use log::{debug, warn};
use serde_json::Value;
use std::fmt;

/// Error type for tree-to-token conversion
#[derive(Debug, Clone, PartialEq)]
pub enum WriteError {
    /// A node type the registry does not know
    UnknownNodeType(String),
    /// A mark type the registry does not know
    UnknownMarkType(String),
    /// A footnote whose body is neither in the notes collection nor in its snapshot
    MissingNote(String),
    /// A node attribute required by its writer is absent or ill-typed
    InvalidAttr { node_type: String, attr: String },
    /// A writer left a scalar payload at block level
    StrayPayload,
}

impl fmt::Display for WriteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriteError::UnknownNodeType(name) => write!(f, "No writer for node type '{name}'"),
            WriteError::UnknownMarkType(name) => write!(f, "No writer for mark type '{name}'"),
            WriteError::MissingNote(reference) => {
                write!(f, "Footnote '{reference}' has no body and no usable snapshot")
            }
            WriteError::InvalidAttr { node_type, attr } => {
                write!(f, "Node '{node_type}' has a missing or invalid '{attr}' attribute")
            }
            WriteError::StrayPayload => write!(f, "Writer produced a non-token block"),
        }
    }
}

impl std::error::Error for WriteError {}

/// Walk state shared by every node and mark writer
pub struct WriteContext<'a> {
    registry: &'a Registry,
    notes: &'a Notes,
    active_marks: Vec<Mark>,
    tight: Vec<bool>,
}

impl<'a> WriteContext<'a> {
    pub fn new(registry: &'a Registry, notes: &'a Notes) -> Self {
        WriteContext {
            registry,
            notes,
            active_marks: Vec::new(),
            tight: Vec::new(),
        }
    }

    pub fn registry(&self) -> &'a Registry {
        self.registry
    }

    pub fn notes(&self) -> &'a Notes {
        self.notes
    }

    pub fn active_marks(&self) -> &[Mark] {
        &self.active_marks
    }

    pub fn push_mark(&mut self, mark: Mark) {
        self.active_marks.push(mark);
    }

    pub fn pop_mark(&mut self) -> Option<Mark> {
        self.active_marks.pop()
    }

    pub fn push_tight(&mut self, tight: bool) {
        self.tight.push(tight);
    }

    pub fn pop_tight(&mut self) -> Option<bool> {
        self.tight.pop()
    }

    /// Whether the innermost enclosing list is tight (false outside lists).
    pub fn is_tight(&self) -> bool {
        self.tight.last().copied().unwrap_or(false)
    }

    /// Marks of `node` not yet open, outermost first.
    pub fn residual_marks<'n>(
        &self,
        node: &'n Node,
    ) -> Result<Vec<(&'n Mark, MarkWriter)>, WriteError> {
        let mut residual = Vec::new();
        for mark in &node.marks {
            if self.active_marks.contains(mark) {
                continue;
            }
            let writer = self
                .registry
                .mark_writer(&mark.mark_type)
                .ok_or_else(|| WriteError::UnknownMarkType(mark.mark_type.clone()))?;
            residual.push((mark, writer));
        }
        let registry = self.registry;
        residual.sort_by_key(|(mark, writer)| {
            (
                writer.priority,
                registry.mark_rank(&mark.mark_type).unwrap_or(usize::MAX),
            )
        });
        Ok(residual)
    }
}

/// Single-use document writer
pub struct Writer<'a> {
    cx: WriteContext<'a>,
    root: Vec<Payload>,
    open: Vec<Vec<Payload>>,
}

impl<'a> Writer<'a> {
    pub fn new(registry: &'a Registry, notes: &'a Notes) -> Self {
        Writer {
            cx: WriteContext::new(registry, notes),
            root: Vec::new(),
            open: Vec::new(),
        }
    }

    pub fn context(&self) -> &WriteContext<'a> {
        &self.cx
    }

    /// Writes the given top-level nodes and returns the block tokens.
    pub fn write_blocks(mut self, body: &[Node]) -> Result<Vec<Token>, WriteError> {
        debug!("writing {} top-level nodes", body.len());
        for node in body {
            self.node(node)?;
        }
        let blocks = self
            .root
            .into_iter()
            .map(|payload| match payload {
                Payload::Token(token) => Ok(*token),
                _ => Err(WriteError::StrayPayload),
            })
            .collect::<Result<Vec<_>, _>>()?;
        debug!("wrote {} top-level tokens", blocks.len());
        Ok(blocks)
    }

    fn push(&mut self, payload: Payload) {
        match self.open.last_mut() {
            Some(list) => list.push(payload),
            None => self.root.push(payload),
        }
    }

    fn collect<F>(&mut self, f: F) -> Result<Vec<Payload>, WriteError>
    where
        F: FnOnce(&mut Self) -> Result<(), WriteError>,
    {
        self.open.push(Vec::new());
        let result = f(self);
        let items = self.open.pop().unwrap_or_default();
        result.map(|()| items)
    }

    /// Emits a token whose payload list is filled by `f`.
    pub fn token<F>(&mut self, tag: &str, f: F) -> Result<(), WriteError>
    where
        F: FnOnce(&mut Self) -> Result<(), WriteError>,
    {
        let items = self.collect(f)?;
        self.push(Token::with_args(tag, items).into());
        Ok(())
    }

    pub fn token_text(&mut self, tag: &str, text: impl Into<String>) {
        self.push(Token::with_text(tag, text).into());
    }

    pub fn token_empty(&mut self, tag: &str) {
        self.push(Token::empty(tag).into());
    }

    pub fn token_with_payload(&mut self, tag: &str, payload: Payload) {
        self.push(
            Token {
                tag: tag.to_string(),
                content: Some(payload),
            }
            .into(),
        );
    }

    /// Emits an anonymous list payload filled by `f`.
    pub fn list<F>(&mut self, f: F) -> Result<(), WriteError>
    where
        F: FnOnce(&mut Self) -> Result<(), WriteError>,
    {
        let items = self.collect(f)?;
        self.push(Payload::List(items));
        Ok(())
    }

    pub fn text_payload(&mut self, text: impl Into<String>) {
        self.push(Payload::text(text));
    }

    pub fn integer(&mut self, value: i64) {
        self.push(Payload::Integer(value));
    }

    pub fn attr(&mut self, attr: &PandocAttr) {
        self.push(attr::encode(attr));
    }

    /// Emits literal text as alternating `Str` and `Space` tokens.
    pub fn write_text(&mut self, text: &str) {
        for token in tokens::split_words(text) {
            self.push(token.into());
        }
    }

    /// Writes one node with its type's writer, ignoring its marks.
    pub fn node(&mut self, node: &Node) -> Result<(), WriteError> {
        let writer = self
            .cx
            .registry
            .node_writer(&node.node_type)
            .ok_or_else(|| WriteError::UnknownNodeType(node.node_type.clone()))?;
        writer(self, node)
    }

    /// Writes the children of a block container.
    pub fn blocks(&mut self, parent: &Node) -> Result<(), WriteError> {
        for child in &parent.content {
            self.node(child)?;
        }
        Ok(())
    }

    /// Writes an inline sequence, turning flat marks back into nested mark tokens.
    pub fn inlines(&mut self, nodes: &[Node]) -> Result<(), WriteError> {
        let mut index = 0;
        while index < nodes.len() {
            let node = &nodes[index];
            let residual = self.cx.residual_marks(node)?;
            let Some(&(mark, writer)) = residual.first() else {
                self.node(node)?;
                index += 1;
                continue;
            };
            let end = nodes[index..]
                .iter()
                .position(|next| !next.has_mark(mark))
                .map_or(nodes.len(), |offset| index + offset);
            self.write_mark(mark, writer, &nodes[index..end])?;
            index = end;
        }
        Ok(())
    }

    fn write_mark(
        &mut self,
        mark: &Mark,
        writer: MarkWriter,
        span: &[Node],
    ) -> Result<(), WriteError> {
        if !writer.expel_whitespace {
            return self.with_mark(mark, writer, span);
        }
        let (leading, trailing, trimmed) = expel_whitespace(span);
        if leading {
            self.token_empty(SPACE);
        }
        if !trimmed.is_empty() {
            self.with_mark(mark, writer, &trimmed)?;
        }
        if trailing {
            self.token_empty(SPACE);
        }
        Ok(())
    }

    fn with_mark(
        &mut self,
        mark: &Mark,
        writer: MarkWriter,
        span: &[Node],
    ) -> Result<(), WriteError> {
        self.cx.push_mark(mark.clone());
        let result = (writer.write)(self, mark, span);
        self.cx.pop_mark();
        result
    }

    /// Runs `f` with `tight` as the innermost list's tightness.
    pub fn list_container<F>(&mut self, tight: bool, f: F) -> Result<(), WriteError>
    where
        F: FnOnce(&mut Self) -> Result<(), WriteError>,
    {
        self.cx.push_tight(tight);
        let result = f(self);
        self.cx.pop_tight();
        result
    }

    /// Writes a list item's blocks; paragraphs become `Plain` inside tight lists.
    pub fn list_item_blocks(&mut self, item: &Node) -> Result<(), WriteError> {
        let tag = if self.cx.is_tight() { PLAIN } else { PARA };
        let checked = item.attr("checked").and_then(Value::as_bool);
        let starts_with_paragraph = item
            .content
            .first()
            .is_some_and(|first| first.node_type == PARAGRAPH);
        if checked.is_some() && !starts_with_paragraph {
            debug!("checkbox dropped: list item does not start with a paragraph");
        }
        for (position, child) in item.content.iter().enumerate() {
            if child.node_type != PARAGRAPH {
                self.node(child)?;
                continue;
            }
            self.token(tag, |w| {
                if let (0, Some(checked)) = (position, checked) {
                    w.token_text(STR, if checked { CHECKED } else { UNCHECKED });
                    w.token_empty(SPACE);
                }
                w.inlines(&child.content)
            })?;
        }
        Ok(())
    }

    /// Writes a footnote placeholder as a `Note` token holding the note body.
    pub fn note(&mut self, placeholder: &Node) -> Result<(), WriteError> {
        let reference = placeholder
            .attr_str(REF)
            .ok_or_else(|| WriteError::InvalidAttr {
                node_type: placeholder.node_type.clone(),
                attr: REF.to_string(),
            })?;
        let notes = self.cx.notes;
        if let Some(body) = notes.get(reference) {
            return self.detached(|w| w.token(tokens::NOTE, |w| w.blocks(body)));
        }

        warn!("note '{reference}' missing from the notes collection, using its snapshot");
        let content = placeholder
            .attr_str(SNAPSHOT)
            .and_then(|snapshot| serde_json::from_str::<Vec<Node>>(snapshot).ok())
            .ok_or_else(|| WriteError::MissingNote(reference.to_string()))?;
        self.detached(|w| {
            w.token(tokens::NOTE, |w| {
                for child in &content {
                    w.node(child)?;
                }
                Ok(())
            })
        })
    }

    /// Runs `f` outside the enclosing marks and lists, as a note body is its own flow.
    fn detached<F>(&mut self, f: F) -> Result<(), WriteError>
    where
        F: FnOnce(&mut Self) -> Result<(), WriteError>,
    {
        let marks = std::mem::take(&mut self.cx.active_marks);
        let tight = std::mem::take(&mut self.cx.tight);
        let result = f(self);
        self.cx.active_marks = marks;
        self.cx.tight = tight;
        result
    }
}

fn is_space(c: char) -> bool {
    c.is_ascii_whitespace()
}

/// Splits whitespace off the edges of a mark span.
///
/// Returns whether leading and trailing whitespace was found, and the span without it.
/// Text nodes at the edges are trimmed; whitespace-only edge nodes disappear and the next
/// node in is trimmed in turn.
fn expel_whitespace(span: &[Node]) -> (bool, bool, Vec<Node>) {
    let mut trimmed = span.to_vec();
    let mut leading = false;
    let mut trailing = false;

    while let Some(first) = trimmed.first_mut().filter(|n| n.is_text()) {
        let text = first.text.take().unwrap_or_default();
        let kept = text.trim_start_matches(is_space);
        leading |= kept.len() != text.len();
        if !kept.is_empty() {
            first.text = Some(kept.to_string());
            break;
        }
        trimmed.remove(0);
    }

    while let Some(last) = trimmed.last_mut().filter(|n| n.is_text()) {
        let text = last.text.take().unwrap_or_default();
        let kept = text.trim_end_matches(is_space);
        trailing |= kept.len() != text.len();
        if !kept.is_empty() {
            last.text = Some(kept.to_string());
            break;
        }
        trimmed.pop();
    }

    (leading, trailing, trimmed)
}
