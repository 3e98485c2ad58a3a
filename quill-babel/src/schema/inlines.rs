//! Inline node types: text, hard breaks, images, math, raw inlines and footnotes.

use crate::common::attr::{self, PandocAttr};
use crate::common::writer::{WriteError, Writer};
use crate::error::ShapeError;
use crate::ir::nodes::{Attrs, Node, FOOTNOTE, NOTE, TEXT};
use crate::ir::tokens::{self, Token, LINE_BREAK, SOFT_BREAK, SPACE, STR};
use crate::registry::{Content, NodeGroup, NodeSpec, ReadAction, ReaderRule};
use serde_json::Value;

use super::blocks::raw_format;
use super::{children, required_str, second_text};

pub(super) fn text() -> NodeSpec {
    NodeSpec {
        name: TEXT,
        group: NodeGroup::Text,
        readers: vec![
            ReaderRule::new(STR, ReadAction::Text(str_text)),
            ReaderRule::new(SPACE, ReadAction::Text(space)),
            ReaderRule::new(SOFT_BREAK, ReadAction::Text(space)),
        ],
        writer: |w, node| {
            w.write_text(node.text.as_deref().unwrap_or_default());
            Ok(())
        },
    }
}

fn str_text(token: &Token) -> Result<String, ShapeError> {
    token.text_content().map(str::to_string)
}

fn space(_: &Token) -> Result<String, ShapeError> {
    Ok(" ".to_string())
}

pub(super) fn hard_break() -> NodeSpec {
    NodeSpec {
        name: "hard_break",
        group: NodeGroup::Inline,
        readers: vec![ReaderRule::new(
            LINE_BREAK,
            ReadAction::Node {
                attrs: None,
                content: Content::Empty,
            },
        )],
        writer: |w, _| {
            w.token_empty(LINE_BREAK);
            Ok(())
        },
    }
}

pub(super) fn image() -> NodeSpec {
    NodeSpec {
        name: "image",
        group: NodeGroup::Inline,
        readers: vec![ReaderRule::new(
            "Image",
            ReadAction::Node {
                attrs: Some(image_attrs),
                content: Content::Empty,
            },
        )],
        writer: write_image,
    }
}

fn image_attrs(token: &Token) -> Result<Attrs, ShapeError> {
    let mut attrs = attr::attrs_at(token, 0)?;
    let alt = tokens::stringify(&token.tokens_at(1)?);
    let target = token
        .arg(2)?
        .as_list()
        .ok_or_else(|| ShapeError::new(&token.tag, "a [src, title] target at position 2"))?;
    let part = |index: usize| {
        target
            .get(index)
            .and_then(|p| p.as_text())
            .map(str::to_string)
            .ok_or_else(|| ShapeError::new(&token.tag, "a [src, title] target at position 2"))
    };
    attrs.insert("src".to_string(), Value::from(part(0)?));
    attrs.insert("title".to_string(), Value::from(part(1)?));
    attrs.insert("alt".to_string(), Value::from(alt));
    Ok(attrs)
}

fn write_image(w: &mut Writer<'_>, node: &Node) -> Result<(), WriteError> {
    let src = required_str(node, "src")?;
    let title = node.attr_str("title").unwrap_or_default();
    let alt = node.attr_str("alt").unwrap_or_default();
    w.token("Image", |w| {
        w.attr(&PandocAttr::from_attrs(&node.attrs));
        w.list(|w| {
            w.write_text(alt);
            Ok(())
        })?;
        w.list(|w| {
            w.text_payload(src);
            w.text_payload(title);
            Ok(())
        })
    })
}

pub(super) fn math() -> NodeSpec {
    NodeSpec {
        name: "math",
        group: NodeGroup::Inline,
        readers: vec![ReaderRule::new(
            "Math",
            ReadAction::Node {
                attrs: Some(math_attrs),
                content: Content::Text(second_text),
            },
        )],
        writer: |w, node| {
            let math_type = node.attr_str("type").unwrap_or("InlineMath");
            w.token("Math", |w| {
                w.token_empty(math_type);
                w.text_payload(node.text_content());
                Ok(())
            })
        },
    }
}

fn math_attrs(token: &Token) -> Result<Attrs, ShapeError> {
    let mut attrs = Attrs::new();
    attrs.insert("type".to_string(), Value::from(token.tag_at(0)?));
    Ok(attrs)
}

pub(super) fn raw_inline() -> NodeSpec {
    NodeSpec {
        name: "raw_inline",
        group: NodeGroup::Inline,
        readers: vec![ReaderRule::new(
            "RawInline",
            ReadAction::Node {
                attrs: Some(raw_format),
                content: Content::Text(second_text),
            },
        )],
        writer: |w, node| {
            let format = required_str(node, "format")?;
            w.token("RawInline", |w| {
                w.text_payload(format);
                w.text_payload(node.text_content());
                Ok(())
            })
        },
    }
}

/// The inline placeholder left where a note appeared.
pub(super) fn footnote() -> NodeSpec {
    NodeSpec {
        name: FOOTNOTE,
        group: NodeGroup::Inline,
        readers: vec![ReaderRule::new(
            tokens::NOTE,
            ReadAction::Note { children },
        )],
        writer: |w, node| w.note(node),
    }
}

/// The note body, stored in the document's notes collection.
pub(super) fn note() -> NodeSpec {
    NodeSpec {
        name: NOTE,
        group: NodeGroup::Note,
        readers: Vec::new(),
        writer: |w, node| w.blocks(node),
    }
}
