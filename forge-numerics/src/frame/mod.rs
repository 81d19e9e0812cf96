//! Frames
//!
//! A frame is the unit of exchange: an ordered header of `(key, value)` token
//! pairs followed by an ordered payload of tokens, delimited by the reserved
//! start and end markers. Tokens are either bracket-delimited literals or
//! numerals (see [`crate::numeral`]).
//!
//! - `grammar`: reserved symbols and the lexer
//! - `parser`: the single-pass frame parser
//! - `fmt`: the serializer, inverse of the parser
//! - `canonical`: deterministic canonical rendering
//! - `schema`: validation of parsed frames against an external schema
//!
//! Header order is preserved verbatim but is not semantically significant:
//! two frames holding the same pairs in a different order compare equal.
//! Payload order always matters.
use strum::{EnumIs, EnumTryAs};

use crate::numeral::{NumeralToken, Profile};

pub mod canonical;
pub mod fmt;
pub mod grammar;
pub mod parser;
pub mod schema;

pub use canonical::{canonical_frame, canonicalize, is_canonical};
pub use fmt::serialize;
pub use parser::parse;

/// Header key conventionally naming the kind of a frame.
pub const TYPE_KEY: &str = "TYPE";

/// A single header or payload element.
#[derive(Debug, Clone, PartialEq, Eq, Hash, EnumIs, EnumTryAs)]
pub enum Token {
    Literal(String),
    Numeral(NumeralToken),
}

impl Token {
    pub fn literal(text: impl Into<String>) -> Self {
        Token::Literal(text.into())
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Token::Literal(text) => Some(text),
            Token::Numeral(_) => None,
        }
    }

    pub fn as_numeral(&self) -> Option<&NumeralToken> {
        match self {
            Token::Literal(_) => None,
            Token::Numeral(numeral) => Some(numeral),
        }
    }

    /// Profile of a numeral token, `None` for literals.
    pub fn profile(&self) -> Option<Profile> {
        self.as_numeral().map(NumeralToken::profile)
    }

    /// Short human-readable description of the token kind.
    pub fn kind_name(&self) -> String {
        match self {
            Token::Literal(_) => "a literal".to_string(),
            Token::Numeral(numeral) => format!("a {} numeral", numeral.profile()),
        }
    }
}

impl From<NumeralToken> for Token {
    fn from(value: NumeralToken) -> Self {
        Token::Numeral(value)
    }
}

impl From<&str> for Token {
    fn from(value: &str) -> Self {
        Token::Literal(value.to_string())
    }
}

impl From<String> for Token {
    fn from(value: String) -> Self {
        Token::Literal(value)
    }
}

/// Ordered header pairs plus ordered payload tokens.
#[derive(Debug, Clone, Default, Eq)]
pub struct Frame {
    pub header: Vec<(Token, Token)>,
    pub payload: Vec<Token>,
}

impl Frame {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`Self::push_header`].
    pub fn with_header(mut self, key: impl Into<Token>, value: impl Into<Token>) -> Self {
        self.push_header(key, value);
        self
    }

    /// Builder-style [`Self::push_payload`].
    pub fn with_payload(mut self, token: impl Into<Token>) -> Self {
        self.push_payload(token);
        self
    }

    pub fn push_header(&mut self, key: impl Into<Token>, value: impl Into<Token>) {
        self.header.push((key.into(), value.into()));
    }

    pub fn push_payload(&mut self, token: impl Into<Token>) {
        self.payload.push(token.into());
    }

    /// Value of the first header pair whose key is the literal `key`.
    pub fn header_value(&self, key: &str) -> Option<&Token> {
        self.header
            .iter()
            .find(|(k, _)| k.as_str() == Some(key))
            .map(|(_, v)| v)
    }

    /// The literal value of the `TYPE` header, if present.
    pub fn frame_type(&self) -> Option<&str> {
        self.header_value(TYPE_KEY).and_then(Token::as_str)
    }

    fn sorted_header(&self) -> Vec<(String, String)> {
        let mut pairs: Vec<_> = self
            .header
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        pairs.sort();
        pairs
    }
}

impl PartialEq for Frame {
    fn eq(&self, other: &Self) -> bool {
        self.payload == other.payload
            && self.header.len() == other.header.len()
            && self.sorted_header() == other.sorted_header()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_order_is_irrelevant_for_equality() {
        let a = Frame::new()
            .with_header("TYPE", "VECTOR")
            .with_header("UNIT", "m")
            .with_payload(NumeralToken::from(1u64));
        let b = Frame::new()
            .with_header("UNIT", "m")
            .with_header("TYPE", "VECTOR")
            .with_payload(NumeralToken::from(1u64));
        assert_eq!(a, b);
    }

    #[test]
    fn payload_order_matters() {
        let a = Frame::new().with_payload("x").with_payload("y");
        let b = Frame::new().with_payload("y").with_payload("x");
        assert_ne!(a, b);
    }

    #[test]
    fn header_lookup() {
        let frame = Frame::new()
            .with_header("TYPE", "VECTOR")
            .with_header(NumeralToken::from(3u64), "three");
        assert_eq!(frame.frame_type(), Some("VECTOR"));
        assert_eq!(frame.header_value("missing"), None);
    }
}
