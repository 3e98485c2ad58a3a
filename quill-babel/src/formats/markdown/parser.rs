//! Markdown parsing (Markdown → token stream)
//!
//! Pipeline: Markdown string → Comrak AST → Pandoc tokens

use super::{comrak_options, COMRAK_API_VERSION};
use crate::common::attr::{self, PandocAttr};
use crate::common::reader::{CHECKED, UNCHECKED};
use crate::ir::tokens::{
    split_words, ApiVersion, Payload, Token, TokenStream, CODE, LINE_BREAK, NOTE, PARA, PLAIN,
    SOFT_BREAK, SPACE, STR,
};
use comrak::nodes::{AstNode, ListDelimType, ListType, NodeList, NodeValue};
use comrak::{parse_document, Arena};
use log::debug;
use std::collections::HashMap;

/// Parse a Markdown string into a token stream
pub fn markdown_to_tokens(source: &str) -> TokenStream {
    let arena = Arena::new();
    let options = comrak_options();
    let root = parse_document(&arena, source, &options);

    let mut definitions = HashMap::new();
    for child in root.children() {
        if let NodeValue::FootnoteDefinition(definition) = &child.data.borrow().value {
            definitions.insert(definition.name.to_lowercase(), child);
        }
    }

    let mut builder = TokenBuilder {
        definitions,
        open_notes: Vec::new(),
    };
    let mut blocks = Vec::new();
    builder.block(root, false, &mut blocks);
    TokenStream::new(ApiVersion::new(&COMRAK_API_VERSION), blocks)
}

struct TokenBuilder<'a> {
    definitions: HashMap<String, &'a AstNode<'a>>,
    /// Notes being expanded, to stop self-referencing definitions
    open_notes: Vec<String>,
}

impl<'a> TokenBuilder<'a> {
    fn blocks(&mut self, parent: &'a AstNode<'a>, tight: bool) -> Vec<Token> {
        let mut out = Vec::new();
        for child in parent.children() {
            self.block(child, tight, &mut out);
        }
        out
    }

    fn block(&mut self, node: &'a AstNode<'a>, tight: bool, out: &mut Vec<Token>) {
        match &node.data.borrow().value {
            NodeValue::Document => {
                for child in node.children() {
                    self.block(child, tight, out);
                }
            }
            NodeValue::Paragraph => {
                let tag = if tight { PLAIN } else { PARA };
                out.push(Token::with_children(tag, self.inlines(node)));
            }
            NodeValue::Heading(heading) => out.push(Token::with_args(
                "Header",
                vec![
                    Payload::Integer(i64::from(heading.level)),
                    attr::encode(&PandocAttr::default()),
                    Payload::tokens(self.inlines(node)),
                ],
            )),
            NodeValue::CodeBlock(code) => {
                let attr = PandocAttr {
                    classes: code
                        .info
                        .split_whitespace()
                        .next()
                        .map(|language| vec![language.to_string()])
                        .unwrap_or_default(),
                    ..PandocAttr::default()
                };
                let literal = code.literal.strip_suffix('\n').unwrap_or(&code.literal);
                out.push(Token::with_args(
                    "CodeBlock",
                    vec![attr::encode(&attr), Payload::text(literal)],
                ));
            }
            NodeValue::BlockQuote => {
                out.push(Token::with_children("BlockQuote", self.blocks(node, false)));
            }
            NodeValue::ThematicBreak => out.push(Token::empty("HorizontalRule")),
            NodeValue::List(list) => out.push(self.list(node, list)),
            NodeValue::HtmlBlock(html) => out.push(Token::with_args(
                "RawBlock",
                vec![
                    Payload::text("html"),
                    Payload::text(html.literal.trim_end_matches('\n')),
                ],
            )),
            NodeValue::FootnoteDefinition(_) | NodeValue::FrontMatter(_) => {}
            other => debug!("comrak: skipping unsupported block {other:?}"),
        }
    }

    fn list(&mut self, node: &'a AstNode<'a>, list: &NodeList) -> Token {
        let mut items = Vec::new();
        for item in node.children() {
            let mut blocks = self.blocks(item, list.tight);
            if let NodeValue::TaskItem(symbol) = &item.data.borrow().value {
                prefix_checkbox(&mut blocks, symbol.is_some());
            }
            items.push(Payload::tokens(blocks));
        }

        match list.list_type {
            ListType::Bullet => Token::with_args("BulletList", items),
            ListType::Ordered => {
                let delimiter = match list.delimiter {
                    ListDelimType::Period => "Period",
                    ListDelimType::Paren => "OneParen",
                };
                let start = i64::try_from(list.start).unwrap_or(1);
                Token::with_args(
                    "OrderedList",
                    vec![
                        Payload::List(vec![
                            Payload::Integer(start),
                            Token::empty("Decimal").into(),
                            Token::empty(delimiter).into(),
                        ]),
                        Payload::List(items),
                    ],
                )
            }
        }
    }

    fn inlines(&mut self, parent: &'a AstNode<'a>) -> Vec<Token> {
        let mut out = Vec::new();
        for child in parent.children() {
            self.inline(child, &mut out);
        }
        out
    }

    fn inline(&mut self, node: &'a AstNode<'a>, out: &mut Vec<Token>) {
        match &node.data.borrow().value {
            NodeValue::Text(text) => out.extend(split_words(text)),
            NodeValue::SoftBreak => out.push(Token::empty(SOFT_BREAK)),
            NodeValue::LineBreak => out.push(Token::empty(LINE_BREAK)),
            NodeValue::Code(code) => out.push(Token::with_args(
                CODE,
                vec![
                    attr::encode(&PandocAttr::default()),
                    Payload::text(code.literal.clone()),
                ],
            )),
            NodeValue::Emph => out.push(Token::with_children("Emph", self.inlines(node))),
            NodeValue::Strong => out.push(Token::with_children("Strong", self.inlines(node))),
            NodeValue::Strikethrough => {
                out.push(Token::with_children("Strikeout", self.inlines(node)))
            }
            NodeValue::Superscript => {
                out.push(Token::with_children("Superscript", self.inlines(node)))
            }
            NodeValue::Link(link) => out.push(Token::with_args(
                "Link",
                vec![
                    attr::encode(&PandocAttr::default()),
                    Payload::tokens(self.inlines(node)),
                    Payload::List(vec![
                        Payload::text(link.url.clone()),
                        Payload::text(link.title.clone()),
                    ]),
                ],
            )),
            NodeValue::Image(link) => out.push(Token::with_args(
                "Image",
                vec![
                    attr::encode(&PandocAttr::default()),
                    Payload::tokens(self.inlines(node)),
                    Payload::List(vec![
                        Payload::text(link.url.clone()),
                        Payload::text(link.title.clone()),
                    ]),
                ],
            )),
            NodeValue::HtmlInline(html) => out.push(Token::with_args(
                "RawInline",
                vec![Payload::text("html"), Payload::text(html.clone())],
            )),
            NodeValue::FootnoteReference(reference) => self.note(&reference.name, out),
            other => debug!("comrak: skipping unsupported inline {other:?}"),
        }
    }

    fn note(&mut self, name: &str, out: &mut Vec<Token>) {
        let key = name.to_lowercase();
        let definition = self.definitions.get(&key).copied();
        match definition {
            Some(definition) if !self.open_notes.contains(&key) => {
                self.open_notes.push(key);
                let body = self.blocks(definition, false);
                self.open_notes.pop();
                out.push(Token::with_children(NOTE, body));
            }
            _ => {
                debug!("comrak: footnote '{name}' has no usable definition");
                out.push(Token::with_text(STR, format!("[^{name}]")));
            }
        }
    }
}

/// Re-encodes a task item's checkbox as the leading sentinel of its first block.
fn prefix_checkbox(blocks: &mut Vec<Token>, checked: bool) {
    let sentinel = Token::with_text(STR, if checked { CHECKED } else { UNCHECKED });
    if let Some(first) = blocks.first_mut() {
        if first.is(PLAIN) || first.is(PARA) {
            if let Some(Payload::List(inlines)) = &mut first.content {
                inlines.insert(0, Token::empty(SPACE).into());
                inlines.insert(0, sentinel.into());
                return;
            }
        }
    }
    blocks.insert(0, Token::with_children(PLAIN, vec![sentinel]));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(tokens: &[Token]) -> Vec<&str> {
        tokens.iter().map(|t| t.tag.as_str()).collect()
    }

    #[test]
    fn paragraphs_and_headings() {
        let stream = markdown_to_tokens("# Title\n\nHello *world*\n");
        assert_eq!(tags(&stream.blocks), vec!["Header", "Para"]);
        assert_eq!(stream.blocks[0].integer_at(0).unwrap(), 1);

        let para = stream.blocks[1].children().unwrap();
        let inline_tags: Vec<_> = para.iter().map(|t| t.tag.as_str()).collect();
        assert_eq!(inline_tags, vec!["Str", "Space", "Emph"]);
    }

    #[test]
    fn tight_lists_use_plain() {
        let stream = markdown_to_tokens("- a\n- b\n");
        let items = stream.blocks[0].args().unwrap();
        let first = items[0].token_list().unwrap();
        assert_eq!(first[0].tag, PLAIN);
    }

    #[test]
    fn task_items_become_sentinels() {
        let stream = markdown_to_tokens("- [x] Done\n- [ ] Todo\n");
        let items = stream.blocks[0].args().unwrap();
        let done = items[0].token_list().unwrap()[0].children().unwrap();
        assert_eq!(done[0].text_content().unwrap(), CHECKED);
        assert_eq!(done[1].tag, SPACE);
        let todo = items[1].token_list().unwrap()[0].children().unwrap();
        assert_eq!(todo[0].text_content().unwrap(), UNCHECKED);
    }

    #[test]
    fn footnote_references_carry_their_body() {
        let stream = markdown_to_tokens("Text[^1].\n\n[^1]: The note.\n");
        assert_eq!(stream.blocks.len(), 1);
        let para = stream.blocks[0].children().unwrap();
        let note = para.iter().find(|t| t.is(NOTE)).unwrap();
        assert_eq!(note.children().unwrap()[0].tag, PARA);
    }

    #[test]
    fn code_block_language_becomes_class() {
        let stream = markdown_to_tokens("```rust\nfn main() {}\n```\n");
        let block = &stream.blocks[0];
        assert_eq!(attr::decode(block.arg(0).unwrap()).classes, vec!["rust"]);
        assert_eq!(block.text_at(1).unwrap(), "fn main() {}");
    }
}
