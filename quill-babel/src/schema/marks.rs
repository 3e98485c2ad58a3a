//! Mark types.
//!
//! Most marks wrap their span in a single token whose payload is the inline list. Links,
//! spans and quotes carry extra arguments; inline code is written from the span's text.

use crate::common::attr::{self, PandocAttr};
use crate::common::writer::{WriteError, Writer};
use crate::error::ShapeError;
use crate::ir::nodes::{Attrs, Mark, Node};
use crate::ir::tokens::{Token, CODE};
use crate::registry::{Content, MarkSpec, MarkWriteFn, MarkWriter, ReadAction, ReaderRule};
use serde_json::Value;

use super::{children, leading_attr, second_text, second_tokens};

fn spec(
    name: &'static str,
    tag: &'static str,
    priority: i32,
    expel_whitespace: bool,
    write: MarkWriteFn,
) -> MarkSpec {
    MarkSpec {
        name,
        readers: vec![ReaderRule::new(
            tag,
            ReadAction::Mark {
                attrs: None,
                content: Content::Children(children),
            },
        )],
        writer: MarkWriter {
            priority,
            expel_whitespace,
            write,
        },
    }
}

pub(super) fn link() -> MarkSpec {
    MarkSpec {
        name: "link",
        readers: vec![ReaderRule::new(
            "Link",
            ReadAction::Mark {
                attrs: Some(link_attrs),
                content: Content::Children(second_tokens),
            },
        )],
        writer: MarkWriter {
            priority: 1,
            expel_whitespace: false,
            write: write_link,
        },
    }
}

fn link_attrs(token: &Token) -> Result<Attrs, ShapeError> {
    let mut attrs = attr::attrs_at(token, 0)?;
    let target = token
        .arg(2)?
        .as_list()
        .ok_or_else(|| ShapeError::new(&token.tag, "a [href, title] target at position 2"))?;
    let href = target.first().and_then(|p| p.as_text()).unwrap_or_default();
    let title = target.get(1).and_then(|p| p.as_text()).unwrap_or_default();
    attrs.insert("href".to_string(), Value::from(href));
    attrs.insert("title".to_string(), Value::from(title));
    Ok(attrs)
}

fn write_link(w: &mut Writer<'_>, mark: &Mark, span: &[Node]) -> Result<(), WriteError> {
    let href = mark.attr_str("href").unwrap_or_default();
    let title = mark.attr_str("title").unwrap_or_default();
    w.token("Link", |w| {
        w.attr(&PandocAttr::from_attrs(&mark.attrs));
        w.list(|w| w.inlines(span))?;
        w.list(|w| {
            w.text_payload(href);
            w.text_payload(title);
            Ok(())
        })
    })
}

pub(super) fn span() -> MarkSpec {
    MarkSpec {
        name: "span",
        readers: vec![ReaderRule::new(
            "Span",
            ReadAction::Mark {
                attrs: Some(leading_attr),
                content: Content::Children(second_tokens),
            },
        )],
        writer: MarkWriter {
            priority: 2,
            expel_whitespace: false,
            write: |w, mark, span| {
                w.token("Span", |w| {
                    w.attr(&PandocAttr::from_attrs(&mark.attrs));
                    w.list(|w| w.inlines(span))
                })
            },
        },
    }
}

pub(super) fn quoted() -> MarkSpec {
    MarkSpec {
        name: "quoted",
        readers: vec![ReaderRule::new(
            "Quoted",
            ReadAction::Mark {
                attrs: Some(quote_type),
                content: Content::Children(second_tokens),
            },
        )],
        writer: MarkWriter {
            priority: 3,
            expel_whitespace: false,
            write: write_quoted,
        },
    }
}

fn quote_type(token: &Token) -> Result<Attrs, ShapeError> {
    let mut attrs = Attrs::new();
    attrs.insert("type".to_string(), Value::from(token.tag_at(0)?));
    Ok(attrs)
}

fn write_quoted(w: &mut Writer<'_>, mark: &Mark, span: &[Node]) -> Result<(), WriteError> {
    let quote = mark.attr_str("type").unwrap_or("DoubleQuote");
    w.token("Quoted", |w| {
        w.token_empty(quote);
        w.list(|w| w.inlines(span))
    })
}

pub(super) fn strong() -> MarkSpec {
    spec("strong", "Strong", 4, true, |w, _, span| {
        w.token("Strong", |w| w.inlines(span))
    })
}

pub(super) fn em() -> MarkSpec {
    spec("em", "Emph", 5, true, |w, _, span| {
        w.token("Emph", |w| w.inlines(span))
    })
}

pub(super) fn underline() -> MarkSpec {
    spec("underline", "Underline", 6, true, |w, _, span| {
        w.token("Underline", |w| w.inlines(span))
    })
}

pub(super) fn strikeout() -> MarkSpec {
    spec("strikeout", "Strikeout", 7, true, |w, _, span| {
        w.token("Strikeout", |w| w.inlines(span))
    })
}

pub(super) fn smallcaps() -> MarkSpec {
    spec("smallcaps", "SmallCaps", 8, true, |w, _, span| {
        w.token("SmallCaps", |w| w.inlines(span))
    })
}

pub(super) fn superscript() -> MarkSpec {
    spec("superscript", "Superscript", 9, true, |w, _, span| {
        w.token("Superscript", |w| w.inlines(span))
    })
}

pub(super) fn subscript() -> MarkSpec {
    spec("subscript", "Subscript", 10, true, |w, _, span| {
        w.token("Subscript", |w| w.inlines(span))
    })
}

pub(super) fn code() -> MarkSpec {
    MarkSpec {
        name: "code",
        readers: vec![ReaderRule::new(
            CODE,
            ReadAction::Mark {
                attrs: Some(leading_attr),
                content: Content::Text(second_text),
            },
        )],
        writer: MarkWriter {
            priority: 20,
            expel_whitespace: false,
            write: write_code,
        },
    }
}

/// Inline code is a leaf token, so marks nested inside the span are flattened into its text.
fn write_code(w: &mut Writer<'_>, mark: &Mark, span: &[Node]) -> Result<(), WriteError> {
    let text: String = span.iter().map(Node::text_content).collect();
    w.token(CODE, |w| {
        w.attr(&PandocAttr::from_attrs(&mark.attrs));
        w.text_payload(text);
        Ok(())
    })
}
