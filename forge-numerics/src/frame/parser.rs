//! Single-pass frame parser.
//!
//! The lexer output is driven through a small state machine:
//!
//! ```text
//! ExpectStart -> InHeader <-> HeaderValue -> ExpectSep -> InPayload <-> PayloadSep -> Done
//! ```
//!
//! Every token is decoded as soon as it is consumed, so the first error
//! reported is the first violation in reading order.
use chumsky::Parser as _;
use log::{debug, trace};

use crate::{
    frame::{
        Frame, Token,
        grammar::{FRAME_END, HEADER_SEP, Lexeme, Spanned, lexer},
    },
    utils::{ParseError, ParseErrorCode},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    ExpectStart,
    /// Waiting for a header key or the header/payload separator.
    InHeader,
    /// A key was read, its value must follow.
    HeaderValue,
    /// A pair was read; a field separator, another key or the header/payload separator may follow.
    ExpectSep,
    /// Waiting for a payload token or the end marker.
    InPayload,
    /// A payload token was read.
    PayloadSep,
    Done,
}

struct FrameParser<'src> {
    text: &'src str,
    state: State,
    frame: Frame,
    pending_key: Option<Token>,
}

impl<'src> FrameParser<'src> {
    fn new(text: &'src str) -> Self {
        Self {
            text,
            state: State::ExpectStart,
            frame: Frame::new(),
            pending_key: None,
        }
    }

    fn error(&self, offset: usize, code: ParseErrorCode, message: impl Into<String>) -> ParseError {
        ParseError::at(self.text, offset, code, message)
    }

    fn token(&self, lexeme: Lexeme<'src>, offset: usize) -> Result<Token, ParseError> {
        lexeme
            .into_token()
            .map_err(|e| self.error(offset + e.offset, e.code, e.message))
    }

    fn step(&mut self, lexeme: Lexeme<'src>, offset: usize) -> Result<(), ParseError> {
        use ParseErrorCode::*;
        use State::*;

        match (self.state, lexeme) {
            (ExpectStart, Lexeme::Start) => self.state = InHeader,
            (ExpectStart, other) => {
                return Err(self.error(
                    offset,
                    InvalidFrameStart,
                    format!("expected the frame start marker, found {}", other),
                ));
            }
            (Done, other) => {
                return Err(self.error(
                    offset,
                    UnexpectedToken,
                    format!("unexpected {} after the frame end marker", other),
                ));
            }
            (_, Lexeme::Literal { closed: false, .. }) => {
                return Err(self.error(
                    offset,
                    UnterminatedLiteral,
                    "literal is not closed before the end of input",
                ));
            }
            (_, Lexeme::Stray(c)) => {
                return Err(self.error(
                    offset,
                    UnexpectedToken,
                    format!("symbol `{}` is not part of the frame grammar", c),
                ));
            }
            (_, Lexeme::Start) => {
                return Err(self.error(
                    offset,
                    UnexpectedToken,
                    "frame start marker inside an open frame",
                ));
            }

            // header
            (InHeader | ExpectSep, Lexeme::HeaderSep) => self.state = InPayload,
            (InHeader | HeaderValue | ExpectSep, lexeme @ (Lexeme::End | Lexeme::TokenSep)) => {
                return Err(self.error(
                    offset,
                    MissingHeaderSeparator,
                    format!(
                        "found {} before the header/payload separator `{}`",
                        lexeme, HEADER_SEP
                    ),
                ));
            }
            (InHeader | ExpectSep, lexeme) if lexeme.is_token() => {
                self.pending_key = Some(self.token(lexeme, offset)?);
                self.state = HeaderValue;
            }
            (HeaderValue, lexeme) if lexeme.is_token() => {
                let value = self.token(lexeme, offset)?;
                if let Some(key) = self.pending_key.take() {
                    self.frame.push_header(key, value);
                }
                self.state = ExpectSep;
            }
            (HeaderValue, lexeme) => {
                return Err(self.error(
                    offset,
                    MalformedHeaderField,
                    format!("header key has no value, found {}", lexeme),
                ));
            }
            (ExpectSep, Lexeme::FieldSep) => self.state = InHeader,
            (InHeader, lexeme) => {
                return Err(self.error(
                    offset,
                    MalformedHeaderField,
                    format!("expected a header key, found {}", lexeme),
                ));
            }

            // payload
            (InPayload | PayloadSep, Lexeme::End) => self.state = Done,
            (InPayload | PayloadSep, lexeme) if lexeme.is_token() => {
                let token = self.token(lexeme, offset)?;
                self.frame.push_payload(token);
                self.state = PayloadSep;
            }
            (PayloadSep, Lexeme::TokenSep) => self.state = InPayload,
            (_, lexeme) => {
                return Err(self.error(
                    offset,
                    UnexpectedToken,
                    format!("unexpected {} in the payload", lexeme),
                ));
            }
        }
        Ok(())
    }

    fn finish(self) -> Result<Frame, ParseError> {
        match self.state {
            State::Done => Ok(self.frame),
            State::ExpectStart => Err(self.error(
                0,
                ParseErrorCode::InvalidFrameStart,
                "input holds no frame start marker",
            )),
            _ => Err(self.error(
                self.text.len(),
                ParseErrorCode::InvalidFrameEnd,
                format!("input ended before the frame end marker `{}`", FRAME_END),
            )),
        }
    }

    fn run(mut self, lexemes: Vec<Spanned<Lexeme<'src>>>) -> Result<Frame, ParseError> {
        for (lexeme, span) in lexemes {
            self.step(lexeme, span.into_range().start)?;
        }
        self.finish()
    }
}

/// Parse a frame string into a [`Frame`].
///
/// Whitespace between lexemes is ignored. On failure the returned
/// [`ParseError`] carries the location of the first violation, a context
/// snippet and a suggestion.
///
/// ```
/// use forge_numerics::frame::parse;
///
/// let frame = parse("≛[TYPE][VECTOR]⁝⦙⊙⊙⊗⊗Φ⊙⋅⊙⊙⊗⊙⊙∎").unwrap();
/// assert_eq!(frame.frame_type(), Some("VECTOR"));
/// assert_eq!(frame.payload.len(), 2);
/// ```
pub fn parse(text: &str) -> Result<Frame, ParseError> {
    let lexemes = match lexer().parse(text).into_result() {
        Ok(lexemes) => lexemes,
        Err(errors) => {
            let offset = errors
                .first()
                .map(|e| e.span().into_range().start)
                .unwrap_or(0);
            let error = ParseError::at(
                text,
                offset,
                ParseErrorCode::UnexpectedToken,
                "input could not be split into frame lexemes",
            );
            debug!("frame parse failed: {}", error);
            return Err(error);
        }
    };
    trace!("frame lexed into {} lexemes", lexemes.len());

    FrameParser::new(text).run(lexemes).inspect_err(|error| {
        debug!("frame parse failed: {}", error);
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::numeral::NumeralToken;

    fn code_of(text: &str) -> (ParseErrorCode, usize) {
        let err = parse(text).unwrap_err();
        (err.code, err.location.offset)
    }

    #[test]
    fn parses_reference_frame() {
        let frame = parse("≛[TYPE][VECTOR]⁝⦙⊙⊙⊗⊗Φ⊙⋅⊙⊙⊗⊙⊙∎").unwrap();
        assert_eq!(
            frame,
            Frame::new()
                .with_header("TYPE", "VECTOR")
                .with_payload(NumeralToken::from(42u64))
                .with_payload(NumeralToken::from(9u64))
        );
    }

    #[test]
    fn optional_separators_and_whitespace() {
        let a = parse("≛[A][1][B][2]⦙[x][y]∎").unwrap();
        let b = parse(" ≛ [A] [1] ⁝ [B] [2] ⁝ ⦙ [x] ⋅ [y] ⋅ ∎ \n").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.header.len(), 2);
        assert_eq!(a.payload.len(), 2);
    }

    #[test]
    fn empty_frame() {
        let frame = parse("≛⦙∎").unwrap();
        assert!(frame.header.is_empty());
        assert!(frame.payload.is_empty());
    }

    #[test]
    fn start_errors() {
        assert_eq!(code_of(""), (ParseErrorCode::InvalidFrameStart, 0));
        assert_eq!(code_of("hello"), (ParseErrorCode::InvalidFrameStart, 0));
        assert_eq!(code_of("[TYPE]∎"), (ParseErrorCode::InvalidFrameStart, 0));
    }

    #[test]
    fn end_errors() {
        let text = "≛[TYPE][VECTOR]⦙⊙⊙⊗";
        assert_eq!(code_of(text), (ParseErrorCode::InvalidFrameEnd, text.len()));
        assert_eq!(code_of("≛[a][b]"), (ParseErrorCode::InvalidFrameEnd, "≛[a][b]".len()));
    }

    #[test]
    fn header_errors() {
        assert_eq!(
            code_of("≛[TYPE][VECTOR]∎").0,
            ParseErrorCode::MissingHeaderSeparator
        );
        assert_eq!(
            code_of("≛[TYPE]⁝[x]⦙∎"),
            (ParseErrorCode::MalformedHeaderField, "≛[TYPE]".len())
        );
        assert_eq!(code_of("≛⁝⦙∎").0, ParseErrorCode::MalformedHeaderField);
        assert_eq!(code_of("≛[TYPE]⦙∎").0, ParseErrorCode::MalformedHeaderField);
    }

    #[test]
    fn token_errors() {
        assert_eq!(code_of("≛⦙[a]∎[b]").0, ParseErrorCode::UnexpectedToken);
        assert_eq!(code_of("≛⦙[a]x∎").0, ParseErrorCode::UnexpectedToken);
        assert_eq!(code_of("≛⦙⋅[a]∎").0, ParseErrorCode::UnexpectedToken);
        assert_eq!(code_of("≛⦙[a]⦙∎").0, ParseErrorCode::UnexpectedToken);
        assert_eq!(code_of("≛⦙≛⦙∎∎").0, ParseErrorCode::UnexpectedToken);
        assert_eq!(
            code_of("≛⦙[open∎"),
            (ParseErrorCode::UnterminatedLiteral, "≛⦙".len())
        );
    }

    #[test]
    fn numeral_errors() {
        // tag 22 is not a profile
        assert_eq!(
            code_of("≛⦙ΦΦ⊗∎"),
            (ParseErrorCode::UnknownNumeralProfile, "≛⦙".len())
        );
        // leading zero in an unsigned magnitude
        let (code, offset) = code_of("≛⦙⊙⊙⊙⊗∎");
        assert_eq!(code, ParseErrorCode::InvalidDigitSequence);
        assert_eq!(offset, "≛⦙⊙⊙".len());
        // base-4 digit outside a blob
        assert_eq!(code_of("≛⦙⊙⊙⊛∎").0, ParseErrorCode::InvalidDigitSequence);
    }

    #[test]
    fn errors_carry_context_and_suggestion() {
        let err = parse("≛[TYPE][VECTOR]⦙⊙⊙⊗").unwrap_err();
        assert_eq!(err.location.line, 1);
        assert!(err.suggestion.unwrap().contains('∎'));
        assert!(err.context.is_some());
    }
}
