//! The built-in schema
//!
//! Reader rules and writers for the Pandoc constructs the editor supports. Each node or mark
//! type is one spec; [`builder`] collects them all so callers can disable types before
//! building, and [`default_registry`] builds the full set.
//!
//! Mark declaration order below is the canonical mark-set order (link outermost, code
//! innermost); writer priorities follow the same order.

mod blocks;
mod inlines;
mod lists;
mod marks;

use crate::common::attr;
use crate::common::writer::WriteError;
use crate::error::ShapeError;
use crate::ir::nodes::{Attrs, Node};
use crate::ir::tokens::Token;
use crate::registry::{Registry, RegistryBuilder, RegistryError};

/// All built-in node and mark specs, ready to build.
pub fn builder() -> RegistryBuilder {
    RegistryBuilder::new()
        .node(inlines::text())
        .node(blocks::paragraph())
        .node(blocks::heading())
        .node(blocks::blockquote())
        .node(blocks::code_block())
        .node(blocks::horizontal_rule())
        .node(blocks::div())
        .node(blocks::raw_block())
        .node(lists::bullet_list())
        .node(lists::ordered_list())
        .node(lists::list_item())
        .node(inlines::hard_break())
        .node(inlines::image())
        .node(inlines::math())
        .node(inlines::raw_inline())
        .node(inlines::footnote())
        .node(inlines::note())
        .mark(marks::link())
        .mark(marks::span())
        .mark(marks::quoted())
        .mark(marks::strong())
        .mark(marks::em())
        .mark(marks::underline())
        .mark(marks::strikeout())
        .mark(marks::smallcaps())
        .mark(marks::superscript())
        .mark(marks::subscript())
        .mark(marks::code())
}

/// The full built-in registry.
pub fn default_registry() -> Result<Registry, RegistryError> {
    builder().build()
}

/// The built-in registry without the named types.
pub fn registry_without<I, S>(disabled: I) -> Result<Registry, RegistryError>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    builder().disable_all(disabled).build()
}

fn children(token: &Token) -> Result<Vec<&Token>, ShapeError> {
    token.children()
}

fn second_tokens(token: &Token) -> Result<Vec<&Token>, ShapeError> {
    token.tokens_at(1)
}

fn second_text(token: &Token) -> Result<String, ShapeError> {
    token.text_at(1).map(str::to_string)
}

fn leading_attr(token: &Token) -> Result<Attrs, ShapeError> {
    attr::attrs_at(token, 0)
}

fn required_str<'n>(node: &'n Node, key: &str) -> Result<&'n str, WriteError> {
    node.attr_str(key).ok_or_else(|| WriteError::InvalidAttr {
        node_type: node.node_type.clone(),
        attr: key.to_string(),
    })
}
