//! Document tree → token stream

use crate::common::*;
use quill_babel::common::writer::WriteError;
use quill_babel::ir::nodes::{Document, Mark, Node};
use quill_babel::ir::tokens::{Payload, Token};
use quill_babel::write_tokens;

fn write_paragraph(content: Vec<Node>) -> Vec<Token> {
    write(&Document::new(vec![paragraph(content)]))
}

fn try_write(body: Vec<Node>) -> Result<Vec<Token>, WriteError> {
    write_tokens(&Document::new(body), &registry(), version()).map(|stream| stream.blocks)
}

#[test]
fn test_mark_nesting_follows_priority() {
    let expected = vec![para(vec![wrap("Strong", vec![wrap("Emph", vec![s("a")])])])];

    assert_eq!(write_paragraph(vec![text("a", &["strong", "em"])]), expected);
    assert_eq!(write_paragraph(vec![text("a", &["em", "strong"])]), expected);
}

#[test]
fn test_mark_runs_share_one_token() {
    let tokens = write_paragraph(vec![text("a ", &["strong"]), text("b", &["strong", "em"])]);

    let expected = vec![para(vec![wrap(
        "Strong",
        vec![s("a"), space(), wrap("Emph", vec![s("b")])],
    )])];
    assert_eq!(tokens, expected);
}

#[test]
fn test_whitespace_is_expelled() {
    let tokens = write_paragraph(vec![
        text("a", &[]),
        text(" b ", &["strong"]),
        text("c", &[]),
    ]);

    let expected = vec![para(vec![
        s("a"),
        space(),
        wrap("Strong", vec![s("b")]),
        space(),
        s("c"),
    ])];
    assert_eq!(tokens, expected);
}

#[test]
fn test_whitespace_is_expelled_past_empty_edges() {
    let tokens = write_paragraph(vec![text(" ", &["strong"]), text(" x", &["strong", "em"])]);
    let expected = vec![para(vec![
        space(),
        wrap("Strong", vec![wrap("Emph", vec![s("x")])]),
    ])];
    assert_eq!(tokens, expected);
}

#[test]
fn test_whitespace_only_span_drops_the_mark() {
    let tokens = write_paragraph(vec![text("a", &[]), text(" ", &["em"]), text("b", &[])]);
    assert_eq!(tokens, vec![para(vec![s("a"), space(), s("b")])]);
}

#[test]
fn test_links_keep_their_whitespace() {
    let mark = Mark::with_attrs(
        "link",
        [("href".to_string(), serde_json::json!("https://example.com"))]
            .into_iter()
            .collect(),
    );
    let tokens = write_paragraph(vec![Node::marked_text(" x ", vec![mark])]);

    let expected = vec![para(vec![Token::with_args(
        "Link",
        vec![
            no_attr(),
            Payload::tokens(vec![space(), s("x"), space()]),
            Payload::List(vec![Payload::text("https://example.com"), Payload::text("")]),
        ],
    )])];
    assert_eq!(tokens, expected);
}

#[test]
fn test_tight_lists_write_plain() {
    let list = |tight: bool| {
        Node::with_content(
            "bullet_list",
            vec![Node::with_content("list_item", vec![paragraph(vec![text("one", &[])])])],
        )
        .with_attr("tight", tight)
    };

    let tight = write(&Document::new(vec![list(true)]));
    assert_eq!(tight, vec![bullet_list(vec![vec![plain(vec![s("one")])]])]);

    let loose = write(&Document::new(vec![list(false)]));
    assert_eq!(loose, vec![bullet_list(vec![vec![para(vec![s("one")])]])]);
}

#[test]
fn test_checked_items_get_a_sentinel() {
    let item = |checked: bool| {
        Node::with_content("list_item", vec![paragraph(vec![text("Done", &[])])])
            .with_attr("checked", checked)
    };
    let list = Node::with_content("bullet_list", vec![item(true), item(false)])
        .with_attr("tight", true);

    let tokens = write(&Document::new(vec![list]));
    assert_eq!(
        tokens,
        vec![bullet_list(vec![
            vec![plain(vec![s("☒"), space(), s("Done")])],
            vec![plain(vec![s("☐"), space(), s("Done")])],
        ])]
    );
}

#[test]
fn test_missing_note_uses_snapshot() {
    let snapshot = serde_json::to_string(&vec![paragraph(vec![text("kept", &[])])]).unwrap();
    let placeholder = Node::new("footnote")
        .with_attr("ref", "gone")
        .with_attr("number", 1)
        .with_attr("content", snapshot);

    let tokens = write_paragraph(vec![placeholder]);
    assert_eq!(tokens, vec![para(vec![note(vec![para(vec![s("kept")])])])]);
}

#[test]
fn test_missing_note_without_snapshot_fails() {
    let placeholder = Node::new("footnote").with_attr("ref", "gone");
    let result = try_write(vec![paragraph(vec![placeholder])]);
    assert_eq!(result.unwrap_err(), WriteError::MissingNote("gone".to_string()));
}

#[test]
fn test_unknown_types_are_fatal() {
    let result = try_write(vec![Node::new("widget")]);
    assert_eq!(result.unwrap_err(), WriteError::UnknownNodeType("widget".to_string()));

    let result = try_write(vec![paragraph(vec![text("a", &["glow"])])]);
    assert_eq!(result.unwrap_err(), WriteError::UnknownMarkType("glow".to_string()));
}

#[test]
fn test_heading_requires_level() {
    let result = try_write(vec![Node::with_content("heading", vec![text("Hi", &[])])]);
    assert_eq!(
        result.unwrap_err(),
        WriteError::InvalidAttr {
            node_type: "heading".to_string(),
            attr: "level".to_string(),
        }
    );
}

#[test]
fn test_inline_code_flattens_nested_marks() {
    let code = |text: &str| Token::with_args("Code", vec![no_attr(), Payload::text(text)]);

    let tokens = write_paragraph(vec![text("a", &["code"]), text("b", &["em", "code"])]);
    assert_eq!(tokens, vec![para(vec![code("ab")])]);

    let tokens = write_paragraph(vec![text("b", &["em", "code"])]);
    assert_eq!(tokens, vec![para(vec![wrap("Emph", vec![code("b")])])]);
}
