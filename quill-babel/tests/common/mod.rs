//! Token and tree builders shared by the integration tests.

#![allow(dead_code)]

use quill_babel::common::attr::{self, PandocAttr};
use quill_babel::ir::nodes::{Document, Mark, Node};
use quill_babel::ir::tokens::{ApiVersion, Payload, Token, TokenStream};
use quill_babel::registry::Registry;
use quill_babel::schema::default_registry;
use quill_babel::{read_tokens, write_tokens};

pub fn registry() -> Registry {
    default_registry().expect("built-in schema is valid")
}

pub fn version() -> ApiVersion {
    ApiVersion::new(&[1, 23, 1])
}

pub fn stream(blocks: Vec<Token>) -> TokenStream {
    TokenStream::new(version(), blocks)
}

pub fn read(blocks: Vec<Token>) -> Document {
    read_tokens(&stream(blocks), &registry()).expect("read should succeed")
}

pub fn write(doc: &Document) -> Vec<Token> {
    write_tokens(doc, &registry(), version())
        .expect("write should succeed")
        .blocks
}

pub fn s(text: &str) -> Token {
    Token::with_text("Str", text)
}

pub fn space() -> Token {
    Token::empty("Space")
}

/// `Str`/`Space` tokens for a sentence.
pub fn words(text: &str) -> Vec<Token> {
    quill_babel::ir::tokens::split_words(text)
}

pub fn para(inlines: Vec<Token>) -> Token {
    Token::with_children("Para", inlines)
}

pub fn plain(inlines: Vec<Token>) -> Token {
    Token::with_children("Plain", inlines)
}

pub fn wrap(tag: &str, inlines: Vec<Token>) -> Token {
    Token::with_children(tag, inlines)
}

pub fn no_attr() -> Payload {
    attr::encode(&PandocAttr::default())
}

pub fn header(level: i64, inlines: Vec<Token>) -> Token {
    Token::with_args(
        "Header",
        vec![Payload::Integer(level), no_attr(), Payload::tokens(inlines)],
    )
}

pub fn bullet_list(items: Vec<Vec<Token>>) -> Token {
    Token::with_args("BulletList", items.into_iter().map(Payload::tokens).collect())
}

pub fn note(blocks: Vec<Token>) -> Token {
    Token::with_children("Note", blocks)
}

pub fn link(href: &str, inlines: Vec<Token>) -> Token {
    Token::with_args(
        "Link",
        vec![
            no_attr(),
            Payload::tokens(inlines),
            Payload::List(vec![Payload::text(href), Payload::text("")]),
        ],
    )
}

pub fn text(value: &str, marks: &[&str]) -> Node {
    Node::marked_text(value, marks.iter().map(|m| Mark::new(*m)).collect())
}

pub fn paragraph(content: Vec<Node>) -> Node {
    Node::with_content("paragraph", content)
}
