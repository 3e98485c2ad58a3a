//! Markdown serialization (token stream → Markdown)
//!
//! Pipeline: Pandoc tokens → Comrak AST → Markdown string
//!
//! Footnotes are numbered in the order their references are met. Comrak cannot format a
//! footnote reference it did not parse, so references go out as raw `[^n]` and the bodies
//! are rendered separately and appended as definitions after the main flow.

use super::{comrak_options, ComrakError};
use crate::common::reader::{CHECKED, UNCHECKED};
use crate::error::ShapeError;
use crate::ir::tokens::{
    Payload, Token, TokenStream, CODE, LINE_BREAK, NOTE, PARA, PLAIN, SOFT_BREAK, SPACE, STR,
};
use comrak::nodes::{
    Ast, AstNode, ListDelimType, ListType, NodeCode, NodeCodeBlock, NodeHeading, NodeHtmlBlock,
    NodeLink, NodeList, NodeValue,
};
use comrak::{format_commonmark, Arena};
use log::debug;
use std::cell::RefCell;

/// Serialize a token stream to CommonMark
pub fn tokens_to_markdown(stream: &TokenStream) -> Result<String, ComrakError> {
    let mut notes: Vec<Vec<&Token>> = Vec::new();
    let blocks: Vec<&Token> = stream.blocks.iter().collect();
    let mut markdown = render(&blocks, &mut notes)?;

    // Note bodies may reference further notes, which are appended as we go.
    let mut index = 0;
    while index < notes.len() {
        let body = notes[index].clone();
        let rendered = render(&body, &mut notes)?;
        markdown.push('\n');
        markdown.push_str(&definition(index + 1, &rendered));
        index += 1;
    }
    Ok(markdown)
}

fn render<'t>(
    blocks: &[&'t Token],
    notes: &mut Vec<Vec<&'t Token>>,
) -> Result<String, ComrakError> {
    let arena = Arena::new();
    let mut builder = AstBuilder {
        arena: &arena,
        notes,
    };
    let root = builder.alloc(NodeValue::Document);
    for &block in blocks {
        builder.block(root, block)?;
    }

    let mut output = Vec::new();
    format_commonmark(root, &comrak_options(), &mut output).map_err(ComrakError::Render)?;
    let markdown = String::from_utf8(output).map_err(ComrakError::Utf8)?;

    // Comrak separates consecutive lists with an HTML comment
    Ok(markdown.replace("<!-- end list -->\n\n", ""))
}

/// Formats a rendered note body as `[^n]: ...`, indenting continuation lines.
fn definition(number: usize, body: &str) -> String {
    let mut out = format!("[^{number}]: ");
    for (i, line) in body.trim_end().lines().enumerate() {
        if i > 0 {
            out.push('\n');
            if !line.is_empty() {
                out.push_str("    ");
            }
        }
        out.push_str(line);
    }
    out.push('\n');
    out
}

struct AstBuilder<'a, 'n, 't> {
    arena: &'a Arena<AstNode<'a>>,
    notes: &'n mut Vec<Vec<&'t Token>>,
}

impl<'a, 'n, 't> AstBuilder<'a, 'n, 't> {
    fn alloc(&self, value: NodeValue) -> &'a AstNode<'a> {
        self.arena
            .alloc(AstNode::new(RefCell::new(Ast::new(value, (0, 0).into()))))
    }

    fn append(&self, parent: &'a AstNode<'a>, value: NodeValue) -> &'a AstNode<'a> {
        let node = self.alloc(value);
        parent.append(node);
        node
    }

    fn block(&mut self, parent: &'a AstNode<'a>, token: &'t Token) -> Result<(), ComrakError> {
        match token.tag.as_str() {
            PARA | PLAIN => {
                let para = self.append(parent, NodeValue::Paragraph);
                self.inlines(para, &token.children()?)?;
            }
            "Header" => {
                let level = token.integer_at(0)?.clamp(1, 6) as u8;
                let heading = self.append(
                    parent,
                    NodeValue::Heading(NodeHeading {
                        level,
                        setext: false,
                    }),
                );
                self.inlines(heading, &token.tokens_at(2)?)?;
            }
            "CodeBlock" => {
                let attr = crate::common::attr::decode(token.arg(0)?);
                let mut literal = token.text_at(1)?.to_string();
                literal.push('\n');
                self.append(
                    parent,
                    NodeValue::CodeBlock(NodeCodeBlock {
                        fenced: true,
                        fence_char: b'`',
                        fence_length: 3,
                        fence_offset: 0,
                        info: attr.classes.first().cloned().unwrap_or_default(),
                        literal,
                    }),
                );
            }
            "BlockQuote" => {
                let quote = self.append(parent, NodeValue::BlockQuote);
                for child in token.children()? {
                    self.block(quote, child)?;
                }
            }
            "HorizontalRule" => {
                self.append(parent, NodeValue::ThematicBreak);
            }
            "BulletList" => {
                let items = token
                    .args()?
                    .iter()
                    .map(|item| item_blocks(token, item))
                    .collect::<Result<Vec<_>, _>>()?;
                self.list(parent, ListType::Bullet, 1, ListDelimType::Period, &items)?;
            }
            "OrderedList" => {
                let list_attrs = token
                    .arg(0)?
                    .as_list()
                    .ok_or_else(|| ShapeError::new(&token.tag, "list attributes at position 0"))?;
                let start = list_attrs
                    .first()
                    .and_then(Payload::as_integer)
                    .and_then(|start| usize::try_from(start).ok())
                    .unwrap_or(1);
                let delimiter = match list_attrs.get(2).and_then(Payload::as_token) {
                    Some(delim) if delim.is("OneParen") || delim.is("TwoParens") => {
                        ListDelimType::Paren
                    }
                    _ => ListDelimType::Period,
                };
                let items = token
                    .arg(1)?
                    .as_list()
                    .ok_or_else(|| ShapeError::new(&token.tag, "list items at position 1"))?
                    .iter()
                    .map(|item| item_blocks(token, item))
                    .collect::<Result<Vec<_>, _>>()?;
                self.list(parent, ListType::Ordered, start, delimiter, &items)?;
            }
            "RawBlock" => {
                if token.text_at(0)? == "html" {
                    let mut literal = token.text_at(1)?.to_string();
                    literal.push('\n');
                    self.append(
                        parent,
                        NodeValue::HtmlBlock(NodeHtmlBlock {
                            block_type: 0,
                            literal,
                        }),
                    );
                } else {
                    debug!("comrak: dropping raw {} block", token.text_at(0)?);
                }
            }
            "Div" => {
                for child in token.tokens_at(1)? {
                    self.block(parent, child)?;
                }
            }
            other => debug!("comrak: skipping unsupported block token {other}"),
        }
        Ok(())
    }

    fn list(
        &mut self,
        parent: &'a AstNode<'a>,
        list_type: ListType,
        start: usize,
        delimiter: ListDelimType,
        items: &[Vec<&'t Token>],
    ) -> Result<(), ComrakError> {
        let tight = items
            .first()
            .and_then(|blocks| blocks.first())
            .is_some_and(|block| block.is(PLAIN));
        let attrs = NodeList {
            list_type,
            marker_offset: 0,
            padding: 0,
            start,
            delimiter,
            bullet_char: b'-',
            tight,
        };
        let list = self.append(parent, NodeValue::List(attrs));

        for blocks in items {
            let item = self.append(list, NodeValue::Item(attrs));
            for (i, &block) in blocks.iter().enumerate() {
                if i == 0 && (block.is(PLAIN) || block.is(PARA)) {
                    let inlines = block.children()?;
                    if let Some((checked, rest)) = split_checkbox(&inlines) {
                        let para = self.append(item, NodeValue::Paragraph);
                        let marker = if checked { "[x] " } else { "[ ] " };
                        self.append(para, NodeValue::HtmlInline(marker.to_string()));
                        self.inlines(para, rest)?;
                        continue;
                    }
                }
                self.block(item, block)?;
            }
        }
        Ok(())
    }

    fn inlines(
        &mut self,
        parent: &'a AstNode<'a>,
        tokens: &[&'t Token],
    ) -> Result<(), ComrakError> {
        for &token in tokens {
            self.inline(parent, token)?;
        }
        Ok(())
    }

    fn wrap(
        &mut self,
        parent: &'a AstNode<'a>,
        value: NodeValue,
        children: &[&'t Token],
    ) -> Result<(), ComrakError> {
        let node = self.append(parent, value);
        self.inlines(node, children)
    }

    fn inline(&mut self, parent: &'a AstNode<'a>, token: &'t Token) -> Result<(), ComrakError> {
        match token.tag.as_str() {
            STR => {
                self.append(parent, NodeValue::Text(token.text_content()?.to_string()));
            }
            SPACE => {
                self.append(parent, NodeValue::Text(" ".to_string()));
            }
            SOFT_BREAK => {
                self.append(parent, NodeValue::SoftBreak);
            }
            LINE_BREAK => {
                self.append(parent, NodeValue::LineBreak);
            }
            "Emph" => self.wrap(parent, NodeValue::Emph, &token.children()?)?,
            "Strong" => self.wrap(parent, NodeValue::Strong, &token.children()?)?,
            "Strikeout" => self.wrap(parent, NodeValue::Strikethrough, &token.children()?)?,
            "Superscript" => self.wrap(parent, NodeValue::Superscript, &token.children()?)?,
            "Underline" | "SmallCaps" | "Subscript" => self.inlines(parent, &token.children()?)?,
            "Span" => self.inlines(parent, &token.tokens_at(1)?)?,
            "Quoted" => {
                let quote = if token.tag_at(0)? == "SingleQuote" { "'" } else { "\"" };
                self.append(parent, NodeValue::Text(quote.to_string()));
                self.inlines(parent, &token.tokens_at(1)?)?;
                self.append(parent, NodeValue::Text(quote.to_string()));
            }
            CODE => {
                self.append(
                    parent,
                    NodeValue::Code(NodeCode {
                        num_backticks: 1,
                        literal: token.text_at(1)?.to_string(),
                    }),
                );
            }
            "Link" | "Image" => {
                let target = link_target(token)?;
                let value = if token.is("Link") {
                    NodeValue::Link(target)
                } else {
                    NodeValue::Image(target)
                };
                self.wrap(parent, value, &token.tokens_at(1)?)?;
            }
            "Math" => {
                let fence = if token.tag_at(0)? == "DisplayMath" { "$$" } else { "$" };
                let text = format!("{fence}{}{fence}", token.text_at(1)?);
                self.append(parent, NodeValue::Text(text));
            }
            "RawInline" => {
                if token.text_at(0)? == "html" {
                    self.append(parent, NodeValue::HtmlInline(token.text_at(1)?.to_string()));
                } else {
                    debug!("comrak: dropping raw {} inline", token.text_at(0)?);
                }
            }
            NOTE => {
                self.notes.push(token.children()?);
                let reference = format!("[^{}]", self.notes.len());
                self.append(parent, NodeValue::HtmlInline(reference));
            }
            other => debug!("comrak: skipping unsupported inline token {other}"),
        }
        Ok(())
    }
}

fn item_blocks<'t>(list: &Token, item: &'t Payload) -> Result<Vec<&'t Token>, ShapeError> {
    item.token_list()
        .ok_or_else(|| ShapeError::new(&list.tag, "a list of blocks for each item"))
}

fn link_target(token: &Token) -> Result<NodeLink, ShapeError> {
    let target = token
        .arg(2)?
        .as_list()
        .ok_or_else(|| ShapeError::new(&token.tag, "a [url, title] target at position 2"))?;
    let text_at = |index: usize| {
        target
            .get(index)
            .and_then(Payload::as_text)
            .unwrap_or_default()
            .to_string()
    };
    Ok(NodeLink {
        url: text_at(0),
        title: text_at(1),
    })
}

/// Detects a leading checkbox sentinel, returning its state and the inlines after it.
fn split_checkbox<'i, 't>(inlines: &'i [&'t Token]) -> Option<(bool, &'i [&'t Token])> {
    let first = inlines.first()?;
    if !first.is(STR) {
        return None;
    }
    let checked = match first.text_content().ok()? {
        CHECKED => true,
        UNCHECKED => false,
        _ => return None,
    };
    let rest = &inlines[1..];
    let rest = match rest.first() {
        Some(space) if space.is(SPACE) => &rest[1..],
        _ => rest,
    };
    Some((checked, rest))
}
