//! Treeviz formatter for token streams and document trees
//!
//! Treeviz is a visual representation of a tree, one node per line, meant for eyeballing what a
//! conversion produced. It encodes the node structure as indentation, with 2 white spaces per
//! level of nesting.
//!
//! So the format is :
//! <indentation>(per level) <name><space><label> (label truncated to 30 characters)
//!
//! Example for a token stream:
//!
//! ```text
//! Header 1
//!   Str Title
//! BulletList
//!   •
//!     Plain
//!       Str ☒
//!       Space
//!       Str Done
//! ```
//!
//! Example for a document tree:
//!
//! ```text
//! body
//!   paragraph
//!     text "Hello "
//!     text "world" +strong
//! notes
//!   note number=1
//!     paragraph
//!       text "The note."
//! ```
//!
//! In token lines the label gathers the scalar arguments (levels, urls, enumeration tags); nested
//! token lists become child lines, and list items are grouped under a `•` line. In tree lines,
//! numeric and boolean attributes show as `key=value` and marks as `+type`. References and
//! snapshots are left out as they are noise when reading a tree.

use crate::ir::nodes::{Document, Node, BODY, NOTES};
use crate::ir::tokens::{Payload, Token};
use serde_json::Value;

const INDENT: &str = "  ";
const MAX_LABEL: usize = 30;
const ITEM: &str = "•";

/// Render a token list (typically `TokenStream::blocks`) as treeviz.
pub fn tokens_to_treeviz(tokens: &[Token]) -> String {
    let mut output = String::new();
    for token in tokens {
        write_token(token, 0, &mut output);
    }
    output
}

/// Render a document tree (body followed by notes) as treeviz.
pub fn document_to_treeviz(doc: &Document) -> String {
    let mut output = String::new();
    push_line(&mut output, 0, BODY);
    for node in &doc.body {
        write_node(node, 1, &mut output);
    }
    if !doc.notes.is_empty() {
        push_line(&mut output, 0, NOTES);
        for note in doc.notes.iter() {
            write_node(note, 1, &mut output);
        }
    }
    output
}

fn push_line(output: &mut String, depth: usize, line: &str) {
    for _ in 0..depth {
        output.push_str(INDENT);
    }
    output.push_str(line);
    output.push('\n');
}

fn truncate(label: &str) -> String {
    if label.chars().count() <= MAX_LABEL {
        return label.to_string();
    }
    let mut short: String = label.chars().take(MAX_LABEL - 1).collect();
    short.push('…');
    short
}

enum Child<'t> {
    Token(&'t Token),
    Item(Vec<&'t Token>),
}

#[derive(Default)]
struct Parts<'t> {
    label: Vec<String>,
    children: Vec<Child<'t>>,
}

impl<'t> Parts<'t> {
    fn collect(&mut self, payload: &'t Payload) {
        match payload {
            Payload::Text(text) => {
                if !text.is_empty() {
                    self.label.push(text.clone());
                }
            }
            Payload::Integer(value) => self.label.push(value.to_string()),
            Payload::Float(value) => self.label.push(value.to_string()),
            Payload::Null => {}
            Payload::Token(token) if token.content.is_none() => self.label.push(token.tag.clone()),
            Payload::Token(token) => self.children.push(Child::Token(token)),
            Payload::List(items) => {
                if items.is_empty() {
                    return;
                }
                if let Some(tokens) = payload.token_list() {
                    self.children.extend(tokens.into_iter().map(Child::Token));
                } else if let Some(groups) = token_groups(items) {
                    self.children.extend(groups.into_iter().map(Child::Item));
                } else {
                    for item in items {
                        self.collect(item);
                    }
                }
            }
        }
    }
}

/// A list of list items: every entry is a non-empty list of tokens.
fn token_groups(items: &[Payload]) -> Option<Vec<Vec<&Token>>> {
    items
        .iter()
        .map(|item| match item.as_list() {
            Some(inner) if !inner.is_empty() => item.token_list(),
            _ => None,
        })
        .collect()
}

fn write_token(token: &Token, depth: usize, output: &mut String) {
    let mut parts = Parts::default();
    if let Some(payload) = &token.content {
        parts.collect(payload);
    }

    let label = parts.label.join(" ");
    if label.is_empty() {
        push_line(output, depth, &token.tag);
    } else {
        push_line(output, depth, &format!("{} {}", token.tag, truncate(&label)));
    }

    for child in parts.children {
        match child {
            Child::Token(child) => write_token(child, depth + 1, output),
            Child::Item(blocks) => {
                push_line(output, depth + 1, ITEM);
                for block in blocks {
                    write_token(block, depth + 2, output);
                }
            }
        }
    }
}

fn write_node(node: &Node, depth: usize, output: &mut String) {
    let mut line = node.node_type.clone();
    for (key, value) in &node.attrs {
        match value {
            Value::Number(number) => line.push_str(&format!(" {key}={number}")),
            Value::Bool(flag) => line.push_str(&format!(" {key}={flag}")),
            _ => {}
        }
    }
    if let Some(text) = &node.text {
        line.push_str(&format!(" \"{}\"", truncate(text)));
    }
    for mark in &node.marks {
        line.push_str(&format!(" +{}", mark.mark_type));
    }
    push_line(output, depth, &line);

    for child in &node.content {
        write_node(child, depth + 1, output);
    }
}
