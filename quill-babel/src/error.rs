//! Error types shared across the conversion pipeline
//!
//! Each stage owns its error enum ([`ReadError`](crate::common::reader::ReadError),
//! [`WriteError`](crate::common::writer::WriteError),
//! [`RegistryError`](crate::registry::RegistryError)); this module holds the ones that
//! cross stage boundaries.

use crate::common::reader::ReadError;
use crate::common::writer::WriteError;
use std::fmt;

/// A token payload did not have the shape a reader rule expected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapeError {
    /// Tag of the token whose payload was malformed
    pub tag: String,
    /// Human readable description of the expected shape
    pub expected: String,
}

impl ShapeError {
    pub fn new(tag: impl Into<String>, expected: impl Into<String>) -> Self {
        ShapeError {
            tag: tag.into(),
            expected: expected.into(),
        }
    }
}

impl fmt::Display for ShapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Malformed '{}' token: expected {}", self.tag, self.expected)
    }
}

impl std::error::Error for ShapeError {}

/// Errors surfaced by a [`Session`](crate::session::Session)
#[derive(Debug)]
pub enum SessionError<E> {
    /// The markdown engine failed; its error is passed through unchanged
    Engine(E),
    /// The token stream could not be turned into a document tree
    Read(ReadError),
    /// The document tree could not be turned into a token stream
    Write(WriteError),
    /// `from_tree` was called before any format version was recorded
    MissingFormatVersion,
}

impl<E: fmt::Display> fmt::Display for SessionError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::Engine(err) => write!(f, "Markdown engine error: {err}"),
            SessionError::Read(err) => write!(f, "Read error: {err}"),
            SessionError::Write(err) => write!(f, "Write error: {err}"),
            SessionError::MissingFormatVersion => write!(
                f,
                "No format version recorded: read a document (or seed a version) before writing"
            ),
        }
    }
}

impl<E> std::error::Error for SessionError<E>
where
    E: std::error::Error + 'static,
{
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SessionError::Engine(err) => Some(err),
            SessionError::Read(err) => Some(err),
            SessionError::Write(err) => Some(err),
            SessionError::MissingFormatVersion => None,
        }
    }
}

impl<E> From<ReadError> for SessionError<E> {
    fn from(err: ReadError) -> Self {
        SessionError::Read(err)
    }
}

impl<E> From<WriteError> for SessionError<E> {
    fn from(err: WriteError) -> Self {
        SessionError::Write(err)
    }
}
