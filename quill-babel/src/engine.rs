//! Markdown engine trait definition
//!
//! The converter never parses or renders markdown itself. An engine turns markdown text into a
//! token stream and back; the session drives it. Implementations live under
//! [`crate::formats`].
//!
//! # Examples
//!
//! ```ignore
//! struct Echo;
//!
//! impl MarkdownEngine for Echo {
//!     type Error = std::io::Error;
//!
//!     fn name(&self) -> &str {
//!         "echo"
//!     }
//!
//!     async fn markdown_to_ast(&self, _format: &str, _source: &str) -> Result<TokenStream, Self::Error> {
//!         Ok(TokenStream::new(ApiVersion::new(&[1, 23, 1]), Vec::new()))
//!     }
//!
//!     async fn ast_to_markdown(&self, _format: &str, _stream: &TokenStream) -> Result<String, Self::Error> {
//!         Ok(String::new())
//!     }
//! }
//! ```

use crate::ir::tokens::TokenStream;
use std::future::Future;

/// Pandoc format specifier used for every engine call.
///
/// `auto_identifiers` is disabled so that headings do not gain generated ids on each pass.
pub const FORMAT_SPECIFIER: &str = "markdown-auto_identifiers";

/// Converts between markdown text and token streams
pub trait MarkdownEngine: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Short name used in logs and configuration (e.g., "pandoc", "comrak")
    fn name(&self) -> &str;

    fn markdown_to_ast(
        &self,
        format: &str,
        source: &str,
    ) -> impl Future<Output = Result<TokenStream, Self::Error>> + Send;

    fn ast_to_markdown(
        &self,
        format: &str,
        stream: &TokenStream,
    ) -> impl Future<Output = Result<String, Self::Error>> + Send;
}
