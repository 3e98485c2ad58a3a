//! The Pandoc token stream.
//!
//! A token is a tag plus an optional payload, serialized exactly the way Pandoc's JSON AST
//! does it: `{"t": "Str", "c": "hello"}`. Payloads nest freely (scalars, lists, and other
//! tokens), so the tree structure of a Pandoc document is implicit in the payloads rather
//! than in dedicated fields.
//!
//! The helpers on [`Token`] narrow a payload to the shape a reader rule expects and report a
//! [`ShapeError`] naming the offending tag when the stream does not match.

use crate::error::ShapeError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const STR: &str = "Str";
pub const SPACE: &str = "Space";
pub const SOFT_BREAK: &str = "SoftBreak";
pub const LINE_BREAK: &str = "LineBreak";
pub const PLAIN: &str = "Plain";
pub const PARA: &str = "Para";
pub const NOTE: &str = "Note";
pub const CODE: &str = "Code";

/// A single unit of the interchange format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    #[serde(rename = "t")]
    pub tag: String,
    #[serde(rename = "c", default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Payload>,
}

/// The content carried by a token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Payload {
    Token(Box<Token>),
    Text(String),
    Integer(i64),
    Float(f64),
    List(Vec<Payload>),
    Null,
}

impl Token {
    /// A token without payload (`Space`, `HorizontalRule`, `Period`, ...).
    pub fn empty(tag: impl Into<String>) -> Self {
        Token {
            tag: tag.into(),
            content: None,
        }
    }

    /// A token whose payload is a single string (`Str`).
    pub fn with_text(tag: impl Into<String>, text: impl Into<String>) -> Self {
        Token {
            tag: tag.into(),
            content: Some(Payload::Text(text.into())),
        }
    }

    /// A token whose payload is a positional argument list (`Header`, `Link`, ...).
    pub fn with_args(tag: impl Into<String>, args: Vec<Payload>) -> Self {
        Token {
            tag: tag.into(),
            content: Some(Payload::List(args)),
        }
    }

    /// A token whose payload is a list of child tokens (`Para`, `Emph`, ...).
    pub fn with_children(tag: impl Into<String>, children: Vec<Token>) -> Self {
        Token::with_args(tag, children.into_iter().map(Payload::from).collect())
    }

    pub fn is(&self, tag: &str) -> bool {
        self.tag == tag
    }

    /// The payload as a positional argument list.
    pub fn args(&self) -> Result<&[Payload], ShapeError> {
        match &self.content {
            Some(Payload::List(items)) => Ok(items),
            _ => Err(ShapeError::new(&self.tag, "a list payload")),
        }
    }

    pub fn arg(&self, index: usize) -> Result<&Payload, ShapeError> {
        self.args()?
            .get(index)
            .ok_or_else(|| ShapeError::new(&self.tag, format!("an argument at position {index}")))
    }

    /// The payload as a list of child tokens.
    pub fn children(&self) -> Result<Vec<&Token>, ShapeError> {
        match &self.content {
            Some(payload) => payload
                .token_list()
                .ok_or_else(|| ShapeError::new(&self.tag, "a list of tokens")),
            None => Err(ShapeError::new(&self.tag, "a list of tokens")),
        }
    }

    /// The payload as a single string.
    pub fn text_content(&self) -> Result<&str, ShapeError> {
        self.content
            .as_ref()
            .and_then(Payload::as_text)
            .ok_or_else(|| ShapeError::new(&self.tag, "a text payload"))
    }

    pub fn tokens_at(&self, index: usize) -> Result<Vec<&Token>, ShapeError> {
        self.arg(index)?.token_list().ok_or_else(|| {
            ShapeError::new(&self.tag, format!("a list of tokens at position {index}"))
        })
    }

    pub fn text_at(&self, index: usize) -> Result<&str, ShapeError> {
        self.arg(index)?
            .as_text()
            .ok_or_else(|| ShapeError::new(&self.tag, format!("text at position {index}")))
    }

    pub fn integer_at(&self, index: usize) -> Result<i64, ShapeError> {
        self.arg(index)?
            .as_integer()
            .ok_or_else(|| ShapeError::new(&self.tag, format!("an integer at position {index}")))
    }

    /// The tag of the enumeration token found at `index` (`InlineMath`, `DoubleQuote`, ...).
    pub fn tag_at(&self, index: usize) -> Result<&str, ShapeError> {
        self.arg(index)?
            .as_token()
            .map(|token| token.tag.as_str())
            .ok_or_else(|| ShapeError::new(&self.tag, format!("a token at position {index}")))
    }
}

impl Payload {
    pub fn text(text: impl Into<String>) -> Self {
        Payload::Text(text.into())
    }

    pub fn tokens(tokens: Vec<Token>) -> Self {
        Payload::List(tokens.into_iter().map(Payload::from).collect())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Payload::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Payload::Integer(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Payload]> {
        match self {
            Payload::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_token(&self) -> Option<&Token> {
        match self {
            Payload::Token(token) => Some(token),
            _ => None,
        }
    }

    /// Narrows a list payload whose every item is a token.
    pub fn token_list(&self) -> Option<Vec<&Token>> {
        self.as_list()?.iter().map(Payload::as_token).collect()
    }
}

impl From<Token> for Payload {
    fn from(token: Token) -> Self {
        Payload::Token(Box::new(token))
    }
}

/// Splits literal text into alternating `Str` and `Space` tokens.
///
/// Every run of ASCII whitespace becomes exactly one `Space`; other characters (including
/// non-breaking spaces) stay inside the words.
pub fn split_words(text: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut word = String::new();
    let mut pending_space = false;
    for ch in text.chars() {
        if ch.is_ascii_whitespace() {
            if !word.is_empty() {
                tokens.push(Token::with_text(STR, std::mem::take(&mut word)));
            }
            pending_space = true;
        } else {
            if pending_space {
                tokens.push(Token::empty(SPACE));
                pending_space = false;
            }
            word.push(ch);
        }
    }
    if !word.is_empty() {
        tokens.push(Token::with_text(STR, word));
    }
    if pending_space {
        tokens.push(Token::empty(SPACE));
    }
    tokens
}

/// Flattens inline tokens to their plain text (used for image alt text and code spans).
pub fn stringify(tokens: &[&Token]) -> String {
    let mut text = String::new();
    for token in tokens {
        stringify_into(token, &mut text);
    }
    text
}

fn stringify_into(token: &Token, out: &mut String) {
    match token.tag.as_str() {
        STR => out.push_str(token.text_content().unwrap_or_default()),
        SPACE | SOFT_BREAK | LINE_BREAK => out.push(' '),
        CODE | "Math" | "RawInline" => out.push_str(token.text_at(1).unwrap_or_default()),
        _ => {
            if let Some(payload) = &token.content {
                stringify_payload(payload, out);
            }
        }
    }
}

fn stringify_payload(payload: &Payload, out: &mut String) {
    match payload {
        Payload::Token(token) => stringify_into(token, out),
        Payload::List(items) => {
            for item in items {
                stringify_payload(item, out);
            }
        }
        _ => {}
    }
}

/// The `pandoc-api-version` stamp carried by every token stream.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApiVersion(pub Vec<u32>);

impl ApiVersion {
    pub fn new(parts: &[u32]) -> Self {
        ApiVersion(parts.to_vec())
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(u32::to_string).collect();
        write!(f, "{}", parts.join("."))
    }
}

impl FromStr for ApiVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts = s
            .trim()
            .split('.')
            .map(|part| {
                part.parse::<u32>()
                    .map_err(|_| format!("invalid API version component '{part}' in '{s}'"))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ApiVersion(parts))
    }
}

/// A complete document as exchanged with the markdown engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenStream {
    #[serde(rename = "pandoc-api-version")]
    pub api_version: ApiVersion,
    #[serde(default = "empty_meta")]
    pub meta: serde_json::Value,
    pub blocks: Vec<Token>,
}

impl TokenStream {
    pub fn new(api_version: ApiVersion, blocks: Vec<Token>) -> Self {
        TokenStream {
            api_version,
            meta: empty_meta(),
            blocks,
        }
    }
}

fn empty_meta() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}
