//! The rich-text document tree.
//!
//! Nodes are typed by name rather than by Rust variant: the set of node and mark types is
//! open and owned by the [`Registry`](crate::registry::Registry), so the tree only carries
//! `type` strings, an attribute bag and children. The JSON shape follows the
//! ProseMirror convention (`{"type", "attrs", "content", "text", "marks"}`) with empty
//! fields omitted.
//!
//! Footnote bodies do not live in the main flow. The body holds an inline `footnote`
//! placeholder, and the body content is kept in [`Notes`], keyed by the placeholder's
//! `ref` attribute.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

pub const DOC: &str = "doc";
pub const BODY: &str = "body";
pub const NOTES: &str = "notes";
pub const TEXT: &str = "text";
pub const PARAGRAPH: &str = "paragraph";
pub const LIST_ITEM: &str = "list_item";
pub const NOTE: &str = "note";
pub const FOOTNOTE: &str = "footnote";

/// Attribute keys used by the note machinery.
pub const REF: &str = "ref";
pub const NUMBER: &str = "number";
pub const SNAPSHOT: &str = "content";

pub type Attrs = BTreeMap<String, Value>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mark {
    #[serde(rename = "type")]
    pub mark_type: String,
    #[serde(default, skip_serializing_if = "Attrs::is_empty")]
    pub attrs: Attrs,
}

impl Mark {
    pub fn new(mark_type: impl Into<String>) -> Self {
        Mark {
            mark_type: mark_type.into(),
            attrs: Attrs::new(),
        }
    }

    pub fn with_attrs(mark_type: impl Into<String>, attrs: Attrs) -> Self {
        Mark {
            mark_type: mark_type.into(),
            attrs,
        }
    }

    pub fn attr_str(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).and_then(Value::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default, skip_serializing_if = "Attrs::is_empty")]
    pub attrs: Attrs,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub content: Vec<Node>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub marks: Vec<Mark>,
}

impl Node {
    pub fn new(node_type: impl Into<String>) -> Self {
        Node {
            node_type: node_type.into(),
            attrs: Attrs::new(),
            content: Vec::new(),
            text: None,
            marks: Vec::new(),
        }
    }

    pub fn with_content(node_type: impl Into<String>, content: Vec<Node>) -> Self {
        Node {
            content,
            ..Node::new(node_type)
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Node {
            text: Some(text.into()),
            ..Node::new(TEXT)
        }
    }

    pub fn marked_text(text: impl Into<String>, marks: Vec<Mark>) -> Self {
        Node {
            marks,
            ..Node::text(text)
        }
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attrs.insert(key.into(), value.into());
        self
    }

    pub fn is_text(&self) -> bool {
        self.node_type == TEXT
    }

    pub fn attr(&self, key: &str) -> Option<&Value> {
        self.attrs.get(key)
    }

    pub fn attr_str(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).and_then(Value::as_str)
    }

    pub fn has_mark(&self, mark: &Mark) -> bool {
        self.marks.contains(mark)
    }

    /// Concatenated text of this node and all of its descendants.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        if let Some(text) = &self.text {
            out.push_str(text);
        }
        for child in &self.content {
            child.collect_text(out);
        }
    }
}

/// The side collection of note bodies, ordered by insertion and indexed by ref.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<Node>", into = "Vec<Node>")]
pub struct Notes {
    entries: Vec<Node>,
    index: HashMap<String, usize>,
}

impl Notes {
    pub fn new() -> Self {
        Notes::default()
    }

    /// Stores `note` under `reference`, stamping the ref onto the node.
    ///
    /// An existing entry with the same ref is replaced in place and returned.
    pub fn insert(&mut self, reference: impl Into<String>, mut note: Node) -> Option<Node> {
        let reference = reference.into();
        note.attrs
            .insert(REF.to_string(), Value::String(reference.clone()));
        match self.index.get(&reference) {
            Some(&position) => Some(std::mem::replace(&mut self.entries[position], note)),
            None => {
                self.index.insert(reference, self.entries.len());
                self.entries.push(note);
                None
            }
        }
    }

    pub fn get(&self, reference: &str) -> Option<&Node> {
        self.index
            .get(reference)
            .and_then(|&position| self.entries.get(position))
    }

    pub fn get_mut(&mut self, reference: &str) -> Option<&mut Node> {
        match self.index.get(reference) {
            Some(&position) => self.entries.get_mut(position),
            None => None,
        }
    }

    pub fn remove(&mut self, reference: &str) -> Option<Node> {
        let position = self.index.remove(reference)?;
        let removed = self.entries.remove(position);
        self.reindex();
        Some(removed)
    }

    pub fn contains(&self, reference: &str) -> bool {
        self.index.contains_key(reference)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn reindex(&mut self) {
        self.index = self
            .entries
            .iter()
            .enumerate()
            .filter_map(|(position, note)| {
                note.attr_str(REF)
                    .map(|reference| (reference.to_string(), position))
            })
            .collect();
    }
}

impl From<Vec<Node>> for Notes {
    fn from(entries: Vec<Node>) -> Self {
        let mut notes = Notes {
            entries,
            index: HashMap::new(),
        };
        notes.reindex();
        notes
    }
}

impl From<Notes> for Vec<Node> {
    fn from(notes: Notes) -> Self {
        notes.entries
    }
}

/// An owned document: the main flow plus its note bodies.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Node", into = "Node")]
pub struct Document {
    pub body: Vec<Node>,
    pub notes: Notes,
}

impl Document {
    pub fn new(body: Vec<Node>) -> Self {
        Document {
            body,
            notes: Notes::new(),
        }
    }

    /// The top-level `doc` container holding `body` and `notes`.
    pub fn to_node(&self) -> Node {
        Node::from(self.clone())
    }

    /// Footnote placeholders of the main flow, in document order.
    pub fn footnotes(&self) -> Vec<&Node> {
        let mut found = Vec::new();
        for node in &self.body {
            collect_footnotes(node, &mut found);
        }
        found
    }

    /// Reassigns note numbers 1, 2, ... following placeholder order in the main flow.
    ///
    /// Both the placeholder and the matching note body get the new number.
    pub fn renumber_notes(&mut self) {
        let mut counter = 0u64;
        let mut assigned = Vec::new();
        for node in &mut self.body {
            renumber(node, &mut counter, &mut assigned);
        }
        for (reference, number) in assigned {
            if let Some(note) = self.notes.get_mut(&reference) {
                note.attrs.insert(NUMBER.to_string(), Value::from(number));
            }
        }
    }
}

fn collect_footnotes<'a>(node: &'a Node, found: &mut Vec<&'a Node>) {
    if node.node_type == FOOTNOTE {
        found.push(node);
    }
    for child in &node.content {
        collect_footnotes(child, found);
    }
}

fn renumber(node: &mut Node, counter: &mut u64, assigned: &mut Vec<(String, u64)>) {
    if node.node_type == FOOTNOTE {
        *counter += 1;
        node.attrs
            .insert(NUMBER.to_string(), Value::from(*counter));
        if let Some(reference) = node.attr_str(REF) {
            assigned.push((reference.to_string(), *counter));
        }
    }
    for child in &mut node.content {
        renumber(child, counter, assigned);
    }
}

impl From<Document> for Node {
    fn from(doc: Document) -> Self {
        Node::with_content(
            DOC,
            vec![
                Node::with_content(BODY, doc.body),
                Node::with_content(NOTES, doc.notes.into()),
            ],
        )
    }
}

/// A node tree that is not a `doc` container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidDocument(pub String);

impl fmt::Display for InvalidDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid document: {}", self.0)
    }
}

impl std::error::Error for InvalidDocument {}

impl TryFrom<Node> for Document {
    type Error = InvalidDocument;

    fn try_from(node: Node) -> Result<Self, Self::Error> {
        if node.node_type != DOC {
            return Err(InvalidDocument(format!(
                "expected a '{DOC}' node, found '{}'",
                node.node_type
            )));
        }
        let mut body = None;
        let mut notes = Notes::new();
        for child in node.content {
            match child.node_type.as_str() {
                BODY => body = Some(child.content),
                NOTES => notes = Notes::from(child.content),
                other => {
                    return Err(InvalidDocument(format!(
                        "unexpected '{other}' container inside '{DOC}'"
                    )))
                }
            }
        }
        let body = body.ok_or_else(|| InvalidDocument(format!("missing '{BODY}' container")))?;
        Ok(Document { body, notes })
    }
}
