//! Contains logic for mapping between the token stream and the document tree.

pub mod attr;
pub mod reader;
pub mod writer;
