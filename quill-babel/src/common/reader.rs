//! Converts a Pandoc token stream into a document tree.
//!
//! # The High-Level Concept
//!
//! Pandoc nests content inside token payloads, while the document tree nests it inside
//! node `content` lists and expresses inline formatting as *marks* on text rather than as
//! wrapper nodes. The reader walks the token stream recursively and keeps two pieces of
//! state that mirror those differences:
//!
//! - a stack of open **frames**, one per node under construction. Finished nodes are
//!   appended to the frame below them.
//! - the set of **open marks**. A mark token (`Emph`, `Link`, ...) does not create a frame;
//!   it adds its mark to the open set while its children are read, and every text node
//!   created meanwhile carries that set.
//!
//! # Dispatch
//!
//! Each token's tag is looked up in the [`Registry`]. The rule's [`ReadAction`] decides what
//! happens:
//!
//! ```text
//! Text   -> append text to the current frame (merging with an equally marked neighbour)
//! Mark   -> open mark, read children, restore the previous open set
//! Block  -> open frame, read children, close frame into parent
//! Node   -> same as Block; inline nodes also carry the open marks
//! List   -> open list frame (+tight), one item frame per item (+checked)
//! Note   -> read the body into a note frame kept aside, leave a placeholder inline
//! ```
//!
//! Tags whose type was disabled are skipped; any other unknown tag aborts the read.

use crate::error::ShapeError;
use crate::ir::nodes::{
    Attrs, Document, Mark, Node, Notes, BODY, NOTE, NUMBER, REF, SNAPSHOT,
};
use crate::ir::tokens::{Payload, Token, PARA, PLAIN, SPACE, STR};
use crate::registry::{AttrsFn, Content, ItemsFn, NodeGroup, ReadAction, Registry};
use log::{debug, trace};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

pub const CHECKED: &str = "☒";
pub const UNCHECKED: &str = "☐";

/// Tuning knobs for a read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReaderOptions {
    /// Deepest nesting of token payloads accepted before the read is aborted
    pub max_depth: usize,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        ReaderOptions { max_depth: 256 }
    }
}

/// Error type for token-to-tree conversion
#[derive(Debug, Clone, PartialEq)]
pub enum ReadError {
    /// A token tag that no installed type handles
    NoHandler(String),
    /// A token payload with an unexpected shape
    Shape(ShapeError),
    /// Nesting exceeded the configured maximum
    NestingTooDeep { limit: usize },
    /// A frame was closed with no parent to receive it
    UnexpectedClose(String),
    /// A note body could not be snapshotted
    Snapshot(String),
}

impl fmt::Display for ReadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadError::NoHandler(tag) => write!(f, "No handler for token type '{tag}'"),
            ReadError::Shape(err) => write!(f, "{err}"),
            ReadError::NestingTooDeep { limit } => {
                write!(f, "Document nesting exceeds the limit of {limit} levels")
            }
            ReadError::UnexpectedClose(node_type) => {
                write!(f, "Closed '{node_type}' with no enclosing container")
            }
            ReadError::Snapshot(msg) => write!(f, "Could not snapshot note body: {msg}"),
        }
    }
}

impl std::error::Error for ReadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ReadError::Shape(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ShapeError> for ReadError {
    fn from(err: ShapeError) -> Self {
        ReadError::Shape(err)
    }
}

/// A node under construction
#[derive(Debug)]
struct Frame {
    node_type: &'static str,
    attrs: Attrs,
    content: Vec<Node>,
    /// Open marks at the time the frame was opened, restored when it closes
    saved_marks: Vec<Mark>,
}

impl Frame {
    fn new(node_type: &'static str, attrs: Attrs, saved_marks: Vec<Mark>) -> Self {
        Frame {
            node_type,
            attrs,
            content: Vec::new(),
            saved_marks,
        }
    }
}

/// Single-use token stream reader
pub struct Reader<'r> {
    registry: &'r Registry,
    options: ReaderOptions,
    current: Frame,
    parents: Vec<Frame>,
    marks: Vec<Mark>,
    notes: Notes,
    next_note_number: u64,
    depth: usize,
}

impl<'r> Reader<'r> {
    pub fn new(registry: &'r Registry, options: ReaderOptions) -> Self {
        Reader {
            registry,
            options,
            current: Frame::new(BODY, Attrs::new(), Vec::new()),
            parents: Vec::new(),
            marks: Vec::new(),
            notes: Notes::new(),
            next_note_number: 1,
            depth: 0,
        }
    }

    /// Reads a complete block sequence into a document.
    pub fn read(mut self, blocks: &[Token]) -> Result<Document, ReadError> {
        debug!("reading {} top-level tokens", blocks.len());
        self.parse_tokens(blocks.iter())?;
        if !self.parents.is_empty() {
            return Err(ReadError::UnexpectedClose(self.current.node_type.to_string()));
        }
        debug!(
            "read {} top-level nodes and {} notes",
            self.current.content.len(),
            self.notes.len()
        );
        Ok(Document {
            body: self.current.content,
            notes: self.notes,
        })
    }

    fn parse_tokens<'t, I>(&mut self, tokens: I) -> Result<(), ReadError>
    where
        I: IntoIterator<Item = &'t Token>,
    {
        for token in tokens {
            self.parse_token(token)?;
        }
        Ok(())
    }

    fn parse_token(&mut self, token: &Token) -> Result<(), ReadError> {
        let Some(rule) = self.registry.reader_rule(&token.tag).copied() else {
            if self.registry.is_ignored(&token.tag) {
                debug!("skipping '{}' token of a disabled type", token.tag);
                return Ok(());
            }
            return Err(ReadError::NoHandler(token.tag.clone()));
        };
        trace!("read {} as {} '{}'", token.tag, rule.action.kind(), rule.target);

        match rule.action {
            ReadAction::Text(text) => {
                let text = text(token)?;
                self.add_text(text);
                Ok(())
            }
            ReadAction::Mark { attrs, content } => {
                let mark = Mark::with_attrs(rule.target, extract_attrs(attrs, token)?);
                let opened = self.registry.add_mark_to_set(&self.marks, mark);
                let saved = std::mem::replace(&mut self.marks, opened);
                let result = self.parse_content(token, content);
                self.marks = saved;
                result
            }
            ReadAction::Block { attrs, content } | ReadAction::Node { attrs, content } => {
                self.open_frame(rule.target, extract_attrs(attrs, token)?);
                self.parse_content(token, content)?;
                self.close_node()
            }
            ReadAction::List { item, attrs, items } => {
                self.parse_list(token, rule.target, item, attrs, items)
            }
            ReadAction::Note { children } => {
                let children = children(token)?;
                self.parse_note(rule.target, &children)
            }
        }
    }

    fn parse_content(&mut self, token: &Token, content: Content) -> Result<(), ReadError> {
        match content {
            Content::Children(children) => {
                let children = children(token)?;
                self.descend()?;
                self.parse_tokens(children)?;
                self.ascend();
                Ok(())
            }
            Content::Text(text) => {
                let text = text(token)?;
                self.add_text(text);
                Ok(())
            }
            Content::Empty => Ok(()),
        }
    }

    fn parse_list(
        &mut self,
        token: &Token,
        list_type: &'static str,
        item_type: &'static str,
        attrs: Option<AttrsFn>,
        items: ItemsFn,
    ) -> Result<(), ReadError> {
        let items = items(token)?;
        let mut attrs = extract_attrs(attrs, token)?;
        let tight = items
            .first()
            .and_then(|blocks| blocks.first())
            .is_some_and(|block| block.is(PLAIN));
        attrs.insert("tight".to_string(), Value::Bool(tight));

        self.open_frame(list_type, attrs);
        self.descend()?;
        for blocks in &items {
            let checkbox = blocks.first().and_then(|first| strip_checkbox(first));
            let mut item_attrs = Attrs::new();
            item_attrs.insert(
                "checked".to_string(),
                checkbox.as_ref().map_or(Value::Null, |(checked, _)| Value::Bool(*checked)),
            );

            self.open_frame(item_type, item_attrs);
            match &checkbox {
                Some((_, rewritten)) => {
                    self.parse_token(rewritten)?;
                    self.parse_tokens(blocks.iter().skip(1).copied())?;
                }
                None => self.parse_tokens(blocks.iter().copied())?,
            }
            self.close_node()?;
        }
        self.ascend();
        self.close_node()
    }

    fn parse_note(
        &mut self,
        placeholder_type: &'static str,
        children: &[&Token],
    ) -> Result<(), ReadError> {
        let reference = Uuid::new_v4().to_string();
        let number = self.next_note_number;
        self.next_note_number += 1;

        let mut attrs = Attrs::new();
        attrs.insert(REF.to_string(), Value::String(reference.clone()));
        attrs.insert(NUMBER.to_string(), Value::from(number));

        self.open_frame(NOTE, attrs.clone());
        self.descend()?;
        self.parse_tokens(children.iter().copied())?;
        self.ascend();
        let frame = self.pop_frame()?;

        let snapshot = serde_json::to_string(&frame.content)
            .map_err(|err| ReadError::Snapshot(err.to_string()))?;
        let body = Node {
            attrs: frame.attrs,
            content: frame.content,
            ..Node::new(NOTE)
        };
        self.notes.insert(reference, body);
        debug!("read note {number}");

        attrs.insert(SNAPSHOT.to_string(), Value::String(snapshot));
        self.current.content.push(Node {
            attrs,
            marks: self.marks.clone(),
            ..Node::new(placeholder_type)
        });
        Ok(())
    }

    /// Appends text with the open marks, merging into an equally marked predecessor.
    fn add_text(&mut self, text: String) {
        if text.is_empty() {
            return;
        }
        if let Some(last) = self.current.content.last_mut() {
            if last.is_text() && last.marks == self.marks {
                last.text.get_or_insert_with(String::new).push_str(&text);
                return;
            }
        }
        self.current
            .content
            .push(Node::marked_text(text, self.marks.clone()));
    }

    /// Pushes a frame; content read inside it starts without open marks.
    fn open_frame(&mut self, node_type: &'static str, attrs: Attrs) {
        let saved = std::mem::take(&mut self.marks);
        let frame = Frame::new(node_type, attrs, saved);
        let parent = std::mem::replace(&mut self.current, frame);
        self.parents.push(parent);
    }

    fn pop_frame(&mut self) -> Result<Frame, ReadError> {
        let parent = self
            .parents
            .pop()
            .ok_or_else(|| ReadError::UnexpectedClose(self.current.node_type.to_string()))?;
        let frame = std::mem::replace(&mut self.current, parent);
        self.marks = frame.saved_marks.clone();
        Ok(frame)
    }

    fn close_node(&mut self) -> Result<(), ReadError> {
        let frame = self.pop_frame()?;
        let marks = match self.registry.node_group(frame.node_type) {
            Some(NodeGroup::Inline) => self.marks.clone(),
            _ => Vec::new(),
        };
        self.current.content.push(Node {
            attrs: frame.attrs,
            content: frame.content,
            marks,
            ..Node::new(frame.node_type)
        });
        Ok(())
    }

    fn descend(&mut self) -> Result<(), ReadError> {
        self.depth += 1;
        if self.depth > self.options.max_depth {
            return Err(ReadError::NestingTooDeep {
                limit: self.options.max_depth,
            });
        }
        Ok(())
    }

    fn ascend(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }
}

fn extract_attrs(attrs: Option<AttrsFn>, token: &Token) -> Result<Attrs, ShapeError> {
    match attrs {
        Some(extract) => extract(token),
        None => Ok(Attrs::new()),
    }
}

/// Detects a leading checkbox sentinel in a list item's first block.
///
/// Returns the checked state and the block rewritten without the sentinel (and without the
/// space that follows it).
fn strip_checkbox(block: &Token) -> Option<(bool, Token)> {
    if !block.is(PLAIN) && !block.is(PARA) {
        return None;
    }
    let inlines = block.args().ok()?;
    let head = inlines.first()?.as_token()?;
    if !head.is(STR) {
        return None;
    }
    let text = head.text_content().ok()?;
    let (checked, rest) = if let Some(rest) = text.strip_prefix(CHECKED) {
        (true, rest)
    } else if let Some(rest) = text.strip_prefix(UNCHECKED) {
        (false, rest)
    } else {
        return None;
    };

    let mut rewritten = Vec::with_capacity(inlines.len());
    let mut tail = inlines[1..].iter().peekable();
    let rest = rest.strip_prefix(' ').unwrap_or(rest);
    if rest.is_empty() {
        if tail
            .peek()
            .and_then(|next| next.as_token())
            .is_some_and(|next| next.is(SPACE))
        {
            tail.next();
        }
    } else {
        rewritten.push(Payload::from(Token::with_text(STR, rest)));
    }
    rewritten.extend(tail.cloned());
    Some((checked, Token::with_args(block.tag.clone(), rewritten)))
}
