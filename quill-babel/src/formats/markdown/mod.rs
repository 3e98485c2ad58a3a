//! In-process CommonMark engine
//!
//! A [`MarkdownEngine`] built on `comrak`, for environments without a `pandoc` binary (tests,
//! sandboxes, the CLI's `--engine comrak`). It speaks the same token vocabulary as Pandoc for
//! the constructs CommonMark (plus the GFM extensions below) can express.
//!
//! # Library Choice
//!
//! `comrak` gives us both directions in one crate: a parser producing an arena AST and a
//! CommonMark formatter consuming one.
//!
//! # Element Mapping Table
//!
//! | Markdown                | Comrak node           | Token                              |
//! |-------------------------|-----------------------|------------------------------------|
//! | Paragraph               | Paragraph             | `Para` (`Plain` in tight lists)    |
//! | `#` heading             | Heading               | `Header [level, attr, inlines]`    |
//! | Fenced / indented code  | CodeBlock             | `CodeBlock [attr, text]`           |
//! | `>` quote               | BlockQuote            | `BlockQuote [blocks]`              |
//! | `---`                   | ThematicBreak         | `HorizontalRule`                   |
//! | `-` / `1.` lists        | List / Item           | `BulletList` / `OrderedList`       |
//! | `- [x]` task item       | TaskItem              | item starting with `Str "☒"`       |
//! | HTML block / inline     | HtmlBlock / HtmlInline| `RawBlock` / `RawInline "html"`    |
//! | `*a*` `**a**` `~~a~~`   | Emph/Strong/Strike    | `Emph` / `Strong` / `Strikeout`    |
//! | `^a^`                   | Superscript           | `Superscript`                      |
//! | `` `a` ``               | Code                  | `Code [attr, text]`                |
//! | `[a](u)` `![a](u)`      | Link / Image          | `Link` / `Image`                   |
//! | `[^1]` + definition     | FootnoteReference     | `Note [blocks]`                    |
//!
//! # Lossy Conversions
//!
//! - Underline, small caps, subscript and spans have no CommonMark syntax; their content is
//!   written unwrapped.
//! - Divs are unwrapped; raw blocks in formats other than HTML are dropped.
//! - Math is written as `$...$` text and reads back as text.
//! - Attributes (ids, classes) are not representable and are dropped on write.

pub mod parser;
pub mod serializer;

use crate::engine::MarkdownEngine;
use crate::error::ShapeError;
use crate::ir::tokens::TokenStream;
use comrak::ComrakOptions;
use log::debug;
use std::fmt;

/// API version stamped on streams produced by this engine
pub const COMRAK_API_VERSION: [u32; 3] = [1, 23, 1];

/// Errors from rendering tokens back to markdown
#[derive(Debug)]
pub enum ComrakError {
    /// A token did not have the shape its tag implies
    Shape(ShapeError),
    /// The CommonMark formatter failed
    Render(std::io::Error),
    /// The formatter produced invalid UTF-8
    Utf8(std::string::FromUtf8Error),
}

impl fmt::Display for ComrakError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComrakError::Shape(err) => write!(f, "{err}"),
            ComrakError::Render(err) => write!(f, "Comrak serialization failed: {err}"),
            ComrakError::Utf8(err) => write!(f, "UTF-8 conversion failed: {err}"),
        }
    }
}

impl std::error::Error for ComrakError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ComrakError::Shape(err) => Some(err),
            ComrakError::Render(err) => Some(err),
            ComrakError::Utf8(err) => Some(err),
        }
    }
}

impl From<ShapeError> for ComrakError {
    fn from(err: ShapeError) -> Self {
        ComrakError::Shape(err)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ComrakEngine;

impl ComrakEngine {
    pub fn new() -> Self {
        ComrakEngine
    }
}

impl MarkdownEngine for ComrakEngine {
    type Error = ComrakError;

    fn name(&self) -> &str {
        "comrak"
    }

    async fn markdown_to_ast(
        &self,
        format: &str,
        source: &str,
    ) -> Result<TokenStream, ComrakError> {
        if !format.starts_with("markdown") {
            debug!("comrak engine reads CommonMark regardless of format '{format}'");
        }
        Ok(parser::markdown_to_tokens(source))
    }

    async fn ast_to_markdown(
        &self,
        format: &str,
        stream: &TokenStream,
    ) -> Result<String, ComrakError> {
        if !format.starts_with("markdown") {
            debug!("comrak engine writes CommonMark regardless of format '{format}'");
        }
        serializer::tokens_to_markdown(stream)
    }
}

fn comrak_options() -> ComrakOptions<'static> {
    let mut options = ComrakOptions::default();
    options.extension.strikethrough = true;
    options.extension.autolink = true;
    options.extension.tasklist = true;
    options.extension.superscript = true;
    options.extension.footnotes = true;
    options.render.unsafe_ = true;
    options
}
