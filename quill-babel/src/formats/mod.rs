//! Engine and inspection implementations
//!
//! This module contains the markdown engines the session can drive and the treeviz renderer
//! used to inspect what a conversion produced.

pub mod markdown;
#[cfg(feature = "native-engine")]
pub mod pandoc;
pub mod treeviz;

pub use markdown::{ComrakEngine, ComrakError};
#[cfg(feature = "native-engine")]
pub use pandoc::{PandocEngine, PandocError};
pub use treeviz::{document_to_treeviz, tokens_to_treeviz};
