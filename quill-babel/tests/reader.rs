//! Token stream → document tree

use crate::common::*;
use quill_babel::common::reader::{ReadError, Reader, ReaderOptions};
use quill_babel::ir::nodes::Mark;
use quill_babel::ir::tokens::{Payload, Token};
use quill_babel::schema::registry_without;
use serde_json::{json, Value};

#[test]
fn test_marks_become_flat_sets() {
    let mut inlines = words("Hello ");
    inlines.push(wrap("Strong", words("big world")));
    let doc = read(vec![para(inlines)]);

    assert_eq!(doc.body.len(), 1);
    let content = &doc.body[0].content;
    assert_eq!(content.len(), 2);
    assert_eq!(content[0].text.as_deref(), Some("Hello "));
    assert!(content[0].marks.is_empty());
    assert_eq!(content[1].text.as_deref(), Some("big world"));
    assert_eq!(content[1].marks, vec![Mark::new("strong")]);
}

#[test]
fn test_mark_order_is_canonical() {
    let emph_outer = read(vec![para(vec![wrap("Emph", vec![wrap("Strong", vec![s("a")])])])]);
    let strong_outer = read(vec![para(vec![wrap("Strong", vec![wrap("Emph", vec![s("a")])])])]);

    let expected = vec![Mark::new("strong"), Mark::new("em")];
    assert_eq!(emph_outer.body[0].content[0].marks, expected);
    assert_eq!(strong_outer.body[0].content[0].marks, expected);
}

#[test]
fn test_adjacent_text_is_merged() {
    let doc = read(vec![para(vec![
        s("a"),
        space(),
        s("b"),
        Token::empty("SoftBreak"),
        s("c"),
    ])]);
    let content = &doc.body[0].content;
    assert_eq!(content.len(), 1);
    assert_eq!(content[0].text.as_deref(), Some("a b c"));
}

#[test]
fn test_heading_attrs() {
    let heading = Token::with_args(
        "Header",
        vec![
            Payload::Integer(2),
            Payload::List(vec![
                Payload::text("intro"),
                Payload::List(vec![Payload::text("lead")]),
                Payload::List(vec![Payload::List(vec![
                    Payload::text("k"),
                    Payload::text("v"),
                ])]),
            ]),
            Payload::tokens(vec![s("Hi")]),
        ],
    );
    let doc = read(vec![heading]);
    let node = &doc.body[0];

    assert_eq!(node.node_type, "heading");
    assert_eq!(node.attr("level"), Some(&json!(2)));
    assert_eq!(node.attr("id"), Some(&json!("intro")));
    assert_eq!(node.attr("classes"), Some(&json!(["lead"])));
    assert_eq!(node.attr("keyvalue"), Some(&json!([["k", "v"]])));
    assert_eq!(node.text_content(), "Hi");
}

#[test]
fn test_tight_list_detection() {
    let tight = read(vec![bullet_list(vec![
        vec![plain(words("one"))],
        vec![plain(words("two"))],
    ])]);
    let loose = read(vec![bullet_list(vec![
        vec![para(words("one"))],
        vec![para(words("two"))],
    ])]);

    assert_eq!(tight.body[0].node_type, "bullet_list");
    assert_eq!(tight.body[0].attr("tight"), Some(&Value::Bool(true)));
    assert_eq!(loose.body[0].attr("tight"), Some(&Value::Bool(false)));

    let item = &tight.body[0].content[0];
    assert_eq!(item.node_type, "list_item");
    assert_eq!(item.content[0].node_type, "paragraph");
}

#[test]
fn test_checkbox_extraction() {
    let doc = read(vec![bullet_list(vec![
        vec![plain(vec![s("☒"), space(), s("Done")])],
        vec![plain(vec![s("☐"), space(), s("Todo")])],
        vec![plain(vec![s("Todo")])],
    ])]);
    let items = &doc.body[0].content;

    assert_eq!(items[0].attr("checked"), Some(&Value::Bool(true)));
    assert_eq!(items[0].text_content(), "Done");
    assert_eq!(items[1].attr("checked"), Some(&Value::Bool(false)));
    assert_eq!(items[1].text_content(), "Todo");
    assert_eq!(items[2].attr("checked"), Some(&Value::Null));
    assert_eq!(items[2].text_content(), "Todo");
}

#[test]
fn test_ordered_list_attrs() {
    let list = Token::with_args(
        "OrderedList",
        vec![
            Payload::List(vec![
                Payload::Integer(3),
                Token::empty("LowerAlpha").into(),
                Token::empty("OneParen").into(),
            ]),
            Payload::List(vec![Payload::tokens(vec![plain(words("c"))])]),
        ],
    );
    let doc = read(vec![list]);
    let node = &doc.body[0];

    assert_eq!(node.node_type, "ordered_list");
    assert_eq!(node.attr("order"), Some(&json!(3)));
    assert_eq!(node.attr_str("number_style"), Some("LowerAlpha"));
    assert_eq!(node.attr_str("number_delim"), Some("OneParen"));
}

#[test]
fn test_footnote_goes_to_side_collection() {
    let doc = read(vec![para(vec![s("Text"), note(vec![para(words("The note."))])])]);

    let content = &doc.body[0].content;
    assert_eq!(content.len(), 2);
    let placeholder = &content[1];
    assert_eq!(placeholder.node_type, "footnote");
    assert_eq!(placeholder.attr("number"), Some(&json!(1)));

    let reference = placeholder.attr_str("ref").expect("placeholder has a ref");
    assert_eq!(reference.len(), 36);
    let snapshot = placeholder.attr_str("content").expect("placeholder has a snapshot");
    assert!(snapshot.contains("The note."));

    assert_eq!(doc.notes.len(), 1);
    let body = doc.notes.get(reference).expect("note body is stored");
    assert_eq!(body.node_type, "note");
    assert_eq!(body.attr("number"), Some(&json!(1)));
    assert_eq!(body.text_content(), "The note.");
}

#[test]
fn test_footnotes_are_numbered_in_order() {
    let doc = read(vec![
        para(vec![s("a"), note(vec![para(words("first"))])]),
        para(vec![s("b"), note(vec![para(words("second"))])]),
    ]);
    let numbers: Vec<_> = doc
        .notes
        .iter()
        .map(|note| note.attr("number").cloned())
        .collect();
    assert_eq!(numbers, vec![Some(json!(1)), Some(json!(2))]);

    let first = doc.body[0].content[1].attr_str("ref").unwrap();
    let second = doc.body[1].content[1].attr_str("ref").unwrap();
    assert_ne!(first, second);
}

#[test]
fn test_marks_do_not_leak_into_notes() {
    let doc = read(vec![para(vec![wrap(
        "Strong",
        vec![s("bold"), note(vec![para(words("plain"))])],
    )])]);

    let placeholder = &doc.body[0].content[1];
    assert_eq!(placeholder.marks, vec![Mark::new("strong")]);

    let body = doc.notes.iter().next().unwrap();
    assert!(body.content[0].content[0].marks.is_empty());
}

#[test]
fn test_unknown_tag_is_fatal() {
    let result = quill_babel::read_tokens(
        &stream(vec![para(words("a")), Token::with_args("Table", Vec::new())]),
        &registry(),
    );
    assert_eq!(result.unwrap_err(), ReadError::NoHandler("Table".to_string()));
}

#[test]
fn test_disabled_types_are_skipped() {
    let registry = registry_without(["math"]).unwrap();
    let math = Token::with_args(
        "Math",
        vec![Token::empty("InlineMath").into(), Payload::text("x")],
    );
    let doc = quill_babel::read_tokens(&stream(vec![para(vec![s("a"), math])]), &registry)
        .unwrap();

    let content = &doc.body[0].content;
    assert_eq!(content.len(), 1);
    assert_eq!(content[0].text.as_deref(), Some("a"));
}

#[test]
fn test_shape_errors_name_the_token() {
    let result = quill_babel::read_tokens(
        &stream(vec![Token::with_text("Header", "oops")]),
        &registry(),
    );
    match result {
        Err(ReadError::Shape(err)) => assert_eq!(err.tag, "Header"),
        other => panic!("expected a shape error, got {other:?}"),
    }
}

#[test]
fn test_depth_limit() {
    let mut block = para(words("deep"));
    for _ in 0..10 {
        block = Token::with_children("BlockQuote", vec![block]);
    }
    let registry = registry();
    let reader = Reader::new(&registry, ReaderOptions { max_depth: 5 });
    assert_eq!(
        reader.read(&[block.clone()]).unwrap_err(),
        ReadError::NestingTooDeep { limit: 5 }
    );

    let reader = Reader::new(&registry, ReaderOptions::default());
    assert!(reader.read(&[block]).is_ok());
}
