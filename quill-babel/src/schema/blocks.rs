//! Block-level node types: paragraphs, headings, quotes, code, rules, divs and raw blocks.

use crate::common::attr::{self, PandocAttr};
use crate::common::writer::{WriteError, Writer};
use crate::error::ShapeError;
use crate::ir::nodes::{Attrs, Node};
use crate::ir::tokens::{Token, PARA, PLAIN};
use crate::registry::{Content, NodeGroup, NodeSpec, ReadAction, ReaderRule};
use serde_json::Value;

use super::{children, leading_attr, required_str, second_text, second_tokens};

pub(super) fn paragraph() -> NodeSpec {
    let rule = |tag| {
        ReaderRule::new(
            tag,
            ReadAction::Block {
                attrs: None,
                content: Content::Children(children),
            },
        )
    };
    NodeSpec {
        name: "paragraph",
        group: NodeGroup::Block,
        readers: vec![rule(PARA), rule(PLAIN)],
        writer: write_paragraph,
    }
}

fn write_paragraph(w: &mut Writer<'_>, node: &Node) -> Result<(), WriteError> {
    w.token(PARA, |w| w.inlines(&node.content))
}

pub(super) fn heading() -> NodeSpec {
    NodeSpec {
        name: "heading",
        group: NodeGroup::Block,
        readers: vec![ReaderRule::new(
            "Header",
            ReadAction::Block {
                attrs: Some(heading_attrs),
                content: Content::Children(heading_children),
            },
        )],
        writer: write_heading,
    }
}

fn heading_attrs(token: &Token) -> Result<Attrs, ShapeError> {
    let mut attrs = attr::attrs_at(token, 1)?;
    attrs.insert("level".to_string(), Value::from(token.integer_at(0)?));
    Ok(attrs)
}

fn heading_children(token: &Token) -> Result<Vec<&Token>, ShapeError> {
    token.tokens_at(2)
}

fn write_heading(w: &mut Writer<'_>, node: &Node) -> Result<(), WriteError> {
    let level = node
        .attr("level")
        .and_then(Value::as_i64)
        .ok_or_else(|| WriteError::InvalidAttr {
            node_type: node.node_type.clone(),
            attr: "level".to_string(),
        })?;
    w.token("Header", |w| {
        w.integer(level);
        w.attr(&PandocAttr::from_attrs(&node.attrs));
        w.list(|w| w.inlines(&node.content))
    })
}

pub(super) fn blockquote() -> NodeSpec {
    NodeSpec {
        name: "blockquote",
        group: NodeGroup::Block,
        readers: vec![ReaderRule::new(
            "BlockQuote",
            ReadAction::Block {
                attrs: None,
                content: Content::Children(children),
            },
        )],
        writer: |w, node| w.token("BlockQuote", |w| w.blocks(node)),
    }
}

pub(super) fn code_block() -> NodeSpec {
    NodeSpec {
        name: "code_block",
        group: NodeGroup::Block,
        readers: vec![ReaderRule::new(
            "CodeBlock",
            ReadAction::Block {
                attrs: Some(leading_attr),
                content: Content::Text(second_text),
            },
        )],
        writer: write_code_block,
    }
}

fn write_code_block(w: &mut Writer<'_>, node: &Node) -> Result<(), WriteError> {
    w.token("CodeBlock", |w| {
        w.attr(&PandocAttr::from_attrs(&node.attrs));
        w.text_payload(node.text_content());
        Ok(())
    })
}

pub(super) fn horizontal_rule() -> NodeSpec {
    NodeSpec {
        name: "horizontal_rule",
        group: NodeGroup::Block,
        readers: vec![ReaderRule::new(
            "HorizontalRule",
            ReadAction::Block {
                attrs: None,
                content: Content::Empty,
            },
        )],
        writer: |w, _| {
            w.token_empty("HorizontalRule");
            Ok(())
        },
    }
}

pub(super) fn div() -> NodeSpec {
    NodeSpec {
        name: "div",
        group: NodeGroup::Block,
        readers: vec![ReaderRule::new(
            "Div",
            ReadAction::Block {
                attrs: Some(leading_attr),
                content: Content::Children(second_tokens),
            },
        )],
        writer: |w, node| {
            w.token("Div", |w| {
                w.attr(&PandocAttr::from_attrs(&node.attrs));
                w.list(|w| w.blocks(node))
            })
        },
    }
}

pub(super) fn raw_block() -> NodeSpec {
    NodeSpec {
        name: "raw_block",
        group: NodeGroup::Block,
        readers: vec![ReaderRule::new(
            "RawBlock",
            ReadAction::Block {
                attrs: Some(raw_format),
                content: Content::Text(second_text),
            },
        )],
        writer: |w, node| {
            let format = required_str(node, "format")?;
            w.token("RawBlock", |w| {
                w.text_payload(format);
                w.text_payload(node.text_content());
                Ok(())
            })
        },
    }
}

/// `format` attribute shared by raw blocks and raw inlines.
pub(super) fn raw_format(token: &Token) -> Result<Attrs, ShapeError> {
    let mut attrs = Attrs::new();
    attrs.insert("format".to_string(), Value::from(token.text_at(0)?));
    Ok(attrs)
}
