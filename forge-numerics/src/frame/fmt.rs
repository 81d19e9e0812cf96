//! Frame serializer.
//!
//! The exact inverse of [`crate::frame::parse`]: `parse(serialize(f)) == f`
//! for every frame, and serializing a freshly parsed frame reproduces the
//! input up to whitespace and optional separators.
use std::{borrow::Cow, fmt};

use crate::frame::{
    Frame, Token,
    grammar::{
        FIELD_SEP, FRAME_END, FRAME_START, HEADER_SEP, LITERAL_CLOSE, LITERAL_ESCAPE,
        LITERAL_OPEN, TOKEN_SEP,
    },
};

/// Escape the closing bracket and the escape character inside literal text.
pub fn escape_literal(text: &str) -> Cow<'_, str> {
    if !text.contains([LITERAL_CLOSE, LITERAL_ESCAPE]) {
        return Cow::Borrowed(text);
    }

    let mut out = String::with_capacity(text.len() + 2);
    for c in text.chars() {
        if c == LITERAL_CLOSE || c == LITERAL_ESCAPE {
            out.push(LITERAL_ESCAPE);
        }
        out.push(c);
    }
    Cow::Owned(out)
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Literal(text) => {
                write!(f, "{}{}{}", LITERAL_OPEN, escape_literal(text), LITERAL_CLOSE)
            }
            Token::Numeral(numeral) => write!(f, "{}", numeral),
        }
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", FRAME_START)?;
        for (key, value) in &self.header {
            // adjacent digit runs would lex as one numeral
            let gap = if key.is_numeral() && value.is_numeral() { " " } else { "" };
            write!(f, "{}{}{}{}", key, gap, value, FIELD_SEP)?;
        }
        write!(f, "{}", HEADER_SEP)?;
        for (i, token) in self.payload.iter().enumerate() {
            if i > 0 {
                write!(f, "{}", TOKEN_SEP)?;
            }
            write!(f, "{}", token)?;
        }
        write!(f, "{}", FRAME_END)
    }
}

/// Render a frame in wire form: every header pair followed by a field
/// separator, payload tokens joined by the token separator.
pub fn serialize(frame: &Frame) -> String {
    frame.to_string()
}
