//! The two document representations the converter moves between.
//!
//! [`tokens`] models the linear, recursively nested token stream exchanged with a markdown
//! engine (Pandoc's JSON AST). [`nodes`] models the editor's document tree. The reader and
//! writer in [`crate::common`] translate between them.

pub mod nodes;
pub mod tokens;
