//! Bullet lists, ordered lists and their items.
//!
//! Pandoc list payloads are lists of items, each item a list of blocks. Ordered lists
//! prefix that with `[start, style, delimiter]`. Tightness and checkboxes are handled by the
//! reader and by [`Writer::list_item_blocks`].

use crate::common::writer::{WriteError, Writer};
use crate::error::ShapeError;
use crate::ir::nodes::{Attrs, Node, LIST_ITEM};
use crate::ir::tokens::{Payload, Token};
use crate::registry::{NodeGroup, NodeSpec, ReadAction, ReaderRule};
use serde_json::Value;

pub(super) fn bullet_list() -> NodeSpec {
    NodeSpec {
        name: "bullet_list",
        group: NodeGroup::List,
        readers: vec![ReaderRule::new(
            "BulletList",
            ReadAction::List {
                item: LIST_ITEM,
                attrs: None,
                items: bullet_items,
            },
        )],
        writer: write_bullet_list,
    }
}

fn bullet_items(token: &Token) -> Result<Vec<Vec<&Token>>, ShapeError> {
    items_of(token, token.args()?)
}

fn write_bullet_list(w: &mut Writer<'_>, node: &Node) -> Result<(), WriteError> {
    w.list_container(is_tight(node), |w| {
        w.token("BulletList", |w| write_items(w, node))
    })
}

pub(super) fn ordered_list() -> NodeSpec {
    NodeSpec {
        name: "ordered_list",
        group: NodeGroup::List,
        readers: vec![ReaderRule::new(
            "OrderedList",
            ReadAction::List {
                item: LIST_ITEM,
                attrs: Some(ordered_attrs),
                items: ordered_items,
            },
        )],
        writer: write_ordered_list,
    }
}

fn ordered_attrs(token: &Token) -> Result<Attrs, ShapeError> {
    let shape = || ShapeError::new(&token.tag, "[start, style, delimiter] list attributes");
    let parts = token.arg(0)?.as_list().ok_or_else(shape)?;
    let order = parts.first().and_then(Payload::as_integer).ok_or_else(shape)?;
    let style = parts.get(1).and_then(Payload::as_token).ok_or_else(shape)?;
    let delim = parts.get(2).and_then(Payload::as_token).ok_or_else(shape)?;

    let mut attrs = Attrs::new();
    attrs.insert("order".to_string(), Value::from(order));
    attrs.insert("number_style".to_string(), Value::from(style.tag.as_str()));
    attrs.insert("number_delim".to_string(), Value::from(delim.tag.as_str()));
    Ok(attrs)
}

fn ordered_items(token: &Token) -> Result<Vec<Vec<&Token>>, ShapeError> {
    let items = token
        .arg(1)?
        .as_list()
        .ok_or_else(|| ShapeError::new(&token.tag, "a list of items at position 1"))?;
    items_of(token, items)
}

fn write_ordered_list(w: &mut Writer<'_>, node: &Node) -> Result<(), WriteError> {
    let order = node.attr("order").and_then(Value::as_i64).unwrap_or(1);
    let style = node.attr_str("number_style").unwrap_or("Decimal");
    let delim = node.attr_str("number_delim").unwrap_or("Period");
    w.list_container(is_tight(node), |w| {
        w.token("OrderedList", |w| {
            w.list(|w| {
                w.integer(order);
                w.token_empty(style);
                w.token_empty(delim);
                Ok(())
            })?;
            w.list(|w| write_items(w, node))
        })
    })
}

pub(super) fn list_item() -> NodeSpec {
    NodeSpec {
        name: LIST_ITEM,
        group: NodeGroup::Block,
        readers: Vec::new(),
        writer: |w, node| w.list_item_blocks(node),
    }
}

fn items_of<'t>(token: &Token, items: &'t [Payload]) -> Result<Vec<Vec<&'t Token>>, ShapeError> {
    items
        .iter()
        .map(|item| {
            item.token_list()
                .ok_or_else(|| ShapeError::new(&token.tag, "each item to be a list of blocks"))
        })
        .collect()
}

fn write_items(w: &mut Writer<'_>, list: &Node) -> Result<(), WriteError> {
    for item in &list.content {
        w.list(|w| w.node(item))?;
    }
    Ok(())
}

fn is_tight(node: &Node) -> bool {
    node.attr("tight").and_then(Value::as_bool).unwrap_or(false)
}
