//! Frame grammar and lexer.
//!
//! ```text
//! frame   := START header* SEP payload* END
//! header  := KEY LITERAL_OR_NUMERAL (FIELD_SEP)?
//! payload := TOKEN (TOKEN_SEP)?
//! ```
//!
//! Reserved symbols are disjoint from the digit glyphs, and literal text only
//! appears between brackets, so a scanner never needs to backtrack. The lexer
//! is total: characters outside the grammar become [`Lexeme::Stray`] and an
//! unclosed literal becomes a literal with `closed == false`, leaving every
//! decision (and every error) to the parser's state machine.
use std::fmt;

use chumsky::prelude::*;

use crate::{
    frame::Token,
    numeral::{NumeralToken, glyph_digit, read_glyphs},
    utils::{CodecError, ParseErrorCode},
};

pub const FRAME_START: char = '≛';
pub const FRAME_END: char = '∎';
pub const HEADER_SEP: char = '⦙';
pub const FIELD_SEP: char = '⁝';
pub const TOKEN_SEP: char = '⋅';
pub const LITERAL_OPEN: char = '[';
pub const LITERAL_CLOSE: char = ']';
pub const LITERAL_ESCAPE: char = '\\';

pub type Spanned<T> = (T, SimpleSpan);

/// A raw lexical unit of a frame string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lexeme<'src> {
    Start,
    End,
    HeaderSep,
    FieldSep,
    TokenSep,
    Literal { text: String, closed: bool },
    Digits(&'src str),
    Stray(char),
}

impl fmt::Display for Lexeme<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lexeme::Start => write!(f, "frame start `{}`", FRAME_START),
            Lexeme::End => write!(f, "frame end `{}`", FRAME_END),
            Lexeme::HeaderSep => write!(f, "header/payload separator `{}`", HEADER_SEP),
            Lexeme::FieldSep => write!(f, "field separator `{}`", FIELD_SEP),
            Lexeme::TokenSep => write!(f, "token separator `{}`", TOKEN_SEP),
            Lexeme::Literal { .. } => write!(f, "literal"),
            Lexeme::Digits(run) => write!(f, "numeral `{}`", run),
            Lexeme::Stray(c) => write!(f, "symbol `{}`", c),
        }
    }
}

/// A grammar violation found while turning a lexeme into a [`Token`].
/// `offset` is relative to the start of the lexeme.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexemeError {
    pub offset: usize,
    pub code: ParseErrorCode,
    pub message: String,
}

impl<'src> Lexeme<'src> {
    /// Whether this lexeme can stand as a header key, header value or payload token.
    pub fn is_token(&self) -> bool {
        matches!(self, Lexeme::Literal { .. } | Lexeme::Digits(_))
    }

    /// Convert a literal or digit run into a [`Token`], decoding numerals
    /// through the numeral codec.
    pub fn into_token(self) -> Result<Token, LexemeError> {
        match self {
            Lexeme::Literal { text, closed: true } => Ok(Token::Literal(text)),
            Lexeme::Literal { closed: false, .. } => Err(LexemeError {
                offset: 0,
                code: ParseErrorCode::UnterminatedLiteral,
                message: format!("literal is missing its closing `{}`", LITERAL_CLOSE),
            }),
            Lexeme::Digits(run) => numeral(run).map(Token::Numeral),
            other => Err(LexemeError {
                offset: 0,
                code: ParseErrorCode::UnexpectedToken,
                message: format!("expected a literal or numeral, found {}", other),
            }),
        }
    }
}

/// Decode a run of digit glyphs as a tagged numeral.
pub fn numeral(run: &str) -> Result<NumeralToken, LexemeError> {
    let digits = read_glyphs(run).map_err(|e| LexemeError {
        offset: 0,
        code: ParseErrorCode::InvalidDigitSequence,
        message: e.to_string(),
    })?;

    NumeralToken::from_trits(&digits).map_err(|e| {
        let code = match e {
            CodecError::UnknownProfile { .. } => ParseErrorCode::UnknownNumeralProfile,
            _ => ParseErrorCode::InvalidDigitSequence,
        };
        let offset = e
            .position()
            .and_then(|position| run.char_indices().nth(position).map(|(i, _)| i))
            .unwrap_or(0);
        LexemeError {
            offset,
            code,
            message: e.to_string(),
        }
    })
}

/// Build the frame lexer. Whitespace between lexemes is skipped.
pub fn lexer<'src>()
-> impl Parser<'src, &'src str, Vec<Spanned<Lexeme<'src>>>, extra::Err<Rich<'src, char>>> {
    let marker = choice((
        just(FRAME_START).to(Lexeme::Start),
        just(FRAME_END).to(Lexeme::End),
        just(HEADER_SEP).to(Lexeme::HeaderSep),
        just(FIELD_SEP).to(Lexeme::FieldSep),
        just(TOKEN_SEP).to(Lexeme::TokenSep),
    ))
    .labelled("reserved symbol");

    let escaped = just(LITERAL_ESCAPE).ignore_then(any());
    let plain = any().filter(|c: &char| *c != LITERAL_CLOSE && *c != LITERAL_ESCAPE);
    let literal = just(LITERAL_OPEN)
        .ignore_then(choice((escaped, plain)).repeated().collect::<String>())
        .then(just(LITERAL_CLOSE).or_not())
        .map(|(text, close)| Lexeme::Literal {
            text,
            closed: close.is_some(),
        })
        .labelled("literal");

    let digits = any()
        .filter(|c: &char| glyph_digit(*c).is_some())
        .repeated()
        .at_least(1)
        .to_slice()
        .map(Lexeme::Digits)
        .labelled("numeral");

    let stray = any()
        .filter(|c: &char| !c.is_whitespace())
        .map(Lexeme::Stray);

    let lexeme = choice((marker, literal, digits, stray)).map_with(|lexeme, e| (lexeme, e.span()));

    text::whitespace()
        .ignore_then(
            lexeme
                .then_ignore(text::whitespace())
                .repeated()
                .collect::<Vec<_>>(),
        )
        .then_ignore(end())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(src: &str) -> Vec<Lexeme<'_>> {
        lexer()
            .parse(src)
            .into_result()
            .expect("lexer is total")
            .into_iter()
            .map(|(lexeme, _)| lexeme)
            .collect()
    }

    #[test]
    fn lexes_markers_literals_and_digits() {
        assert_eq!(
            lex("≛ [a b] ⊙⊙⊗ ⁝ ⦙ ⊗⊗ ⋅ [] ∎"),
            vec![
                Lexeme::Start,
                Lexeme::Literal {
                    text: "a b".to_string(),
                    closed: true
                },
                Lexeme::Digits("⊙⊙⊗"),
                Lexeme::FieldSep,
                Lexeme::HeaderSep,
                Lexeme::Digits("⊗⊗"),
                Lexeme::TokenSep,
                Lexeme::Literal {
                    text: String::new(),
                    closed: true
                },
                Lexeme::End,
            ]
        );
    }

    #[test]
    fn literal_escapes() {
        assert_eq!(
            lex(r"[a\]b\\c]"),
            vec![Lexeme::Literal {
                text: r"a]b\c".to_string(),
                closed: true
            }]
        );
    }

    #[test]
    fn literals_may_contain_reserved_symbols() {
        assert_eq!(
            lex("[≛⊙∎]"),
            vec![Lexeme::Literal {
                text: "≛⊙∎".to_string(),
                closed: true
            }]
        );
    }

    #[test]
    fn unclosed_literal_and_strays() {
        assert_eq!(
            lex("x [abc"),
            vec![
                Lexeme::Stray('x'),
                Lexeme::Literal {
                    text: "abc".to_string(),
                    closed: false
                }
            ]
        );
        assert!(lex("   ").is_empty());
    }

    #[test]
    fn spans_are_byte_offsets() {
        let spans: Vec<_> = lexer()
            .parse("≛[a]")
            .into_result()
            .unwrap()
            .into_iter()
            .map(|(_, span)| span.into_range())
            .collect();
        assert_eq!(spans, vec![0..3, 3..6]);
    }

    #[test]
    fn numeral_errors_point_at_the_bad_digit() {
        let err = numeral("⊙⊙⊗⊛").unwrap_err();
        assert_eq!(err.code, ParseErrorCode::InvalidDigitSequence);
        assert_eq!(err.offset, "⊙⊙⊗".len());

        let err = numeral("ΦΦ⊗").unwrap_err();
        assert_eq!(err.code, ParseErrorCode::UnknownNumeralProfile);
    }
}
