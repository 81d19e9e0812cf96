use std::fmt;

use strum::{EnumIs, EnumIter, IntoStaticStr};
use thiserror::Error;

use crate::numeral::Profile;

/// Failure of a numeral codec (encode or decode direction).
#[derive(Debug, Clone, PartialEq, Eq, EnumIs, Error)]
pub enum CodecError {
    /// The value cannot be represented by the requested profile.
    #[error("value {value} is out of range for the {profile} profile: {reason}")]
    OutOfRange {
        profile: Profile,
        value: String,
        reason: &'static str,
    },

    /// Encoding parameters are unusable (bad field widths, non-finite floats, ...).
    #[error("invalid argument for the {profile} profile: {reason}")]
    InvalidArgument { profile: Profile, reason: String },

    /// A digit sequence does not decode under the rules of its profile.
    #[error("invalid {what} digits at position {position}: {reason}")]
    InvalidInput {
        what: &'static str,
        position: usize,
        reason: String,
    },

    /// The two-trit profile tag does not name any known profile.
    #[error("unknown numeral profile tag `{tag}`")]
    UnknownProfile { tag: String },

    /// A checked blob carried a digest that does not match its content.
    #[error("blob checksum mismatch: expected {expected}, found {found}")]
    ChecksumMismatch { expected: String, found: String },
}

impl CodecError {
    /// Stable, upper-case code of this failure.
    pub fn code(&self) -> &'static str {
        match self {
            CodecError::OutOfRange { .. } => "ENCODE_OUT_OF_RANGE",
            CodecError::InvalidArgument { .. } => "ENCODE_INVALID_ARGUMENT",
            CodecError::InvalidInput { .. } => "DECODE_INVALID_INPUT",
            CodecError::UnknownProfile { .. } => "DECODE_UNKNOWN_PROFILE",
            CodecError::ChecksumMismatch { .. } => "DECODE_CHECKSUM_MISMATCH",
        }
    }

    /// Digit index (within the decoded sequence) the failure points at, if any.
    pub fn position(&self) -> Option<usize> {
        match self {
            CodecError::InvalidInput { position, .. } => Some(*position),
            _ => None,
        }
    }

    pub(crate) fn invalid(what: &'static str, position: usize, reason: impl Into<String>) -> Self {
        CodecError::InvalidInput {
            what,
            position,
            reason: reason.into(),
        }
    }

    /// Shift the reported position, used when a body is decoded after a prefix.
    pub(crate) fn offset_by(self, prefix: usize) -> Self {
        match self {
            CodecError::InvalidInput {
                what,
                position,
                reason,
            } => CodecError::InvalidInput {
                what,
                position: position + prefix,
                reason,
            },
            other => other,
        }
    }
}

pub type CodecResult<T> = Result<T, CodecError>;

/// Classification of parse failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIs, EnumIter, IntoStaticStr, strum::Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ParseErrorCode {
    InvalidFrameStart,
    InvalidFrameEnd,
    MissingHeaderSeparator,
    MalformedHeaderField,
    UnknownNumeralProfile,
    InvalidDigitSequence,
    UnexpectedToken,
    UnterminatedLiteral,
}

impl ParseErrorCode {
    /// A short, actionable hint attached to every error with this code.
    pub fn suggestion(self) -> &'static str {
        match self {
            ParseErrorCode::InvalidFrameStart => "begin the frame with the start marker `≛`",
            ParseErrorCode::InvalidFrameEnd => "add the closing frame marker `∎`",
            ParseErrorCode::MissingHeaderSeparator => {
                "insert the header/payload separator `⦙` after the last header pair"
            }
            ParseErrorCode::MalformedHeaderField => {
                "every header key must be followed by exactly one literal or numeral value"
            }
            ParseErrorCode::UnknownNumeralProfile => {
                "numeral tags are `⊙⊙` unsigned, `⊙⊗` signed, `⊙Φ` decimal, `⊗⊙` float, `⊗⊗` blob"
            }
            ParseErrorCode::InvalidDigitSequence => {
                "re-encode the value; the digits do not match the layout of their profile"
            }
            ParseErrorCode::UnexpectedToken => {
                "remove the symbol or wrap free text in a `[...]` literal"
            }
            ParseErrorCode::UnterminatedLiteral => {
                "close the literal with `]` (escape embedded brackets as `\\]`)"
            }
        }
    }
}

/// Position of a failure inside the parsed text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Location {
    /// Byte offset from the start of the input.
    pub offset: usize,
    /// 1-based line number.
    pub line: usize,
    /// 1-based column, counted in characters.
    pub column: usize,
}

impl Location {
    /// Compute the location of byte `offset` in `text`. Offsets past the end
    /// or inside a multi-byte character are clamped to the previous boundary.
    pub fn locate(text: &str, offset: usize) -> Self {
        let mut offset = offset.min(text.len());
        while !text.is_char_boundary(offset) {
            offset -= 1;
        }

        let consumed = &text[..offset];
        let line = consumed.matches('\n').count() + 1;
        let line_start = consumed.rfind('\n').map(|i| i + 1).unwrap_or(0);
        let column = consumed[line_start..].chars().count() + 1;

        Self {
            offset,
            line,
            column,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "line {}, column {} (offset {})",
            self.line, self.column, self.offset
        )
    }
}

/// Bounded window of the input around a failure, with the failure point marked.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ErrorContext {
    /// The excerpt, newlines replaced by `␤`.
    pub snippet: String,
    /// Character index of the failure point inside `snippet`.
    pub marker: usize,
}

impl ErrorContext {
    pub const RADIUS: usize = 24;

    pub fn around(text: &str, location: &Location) -> Self {
        let before: Vec<char> = text[..location.offset].chars().rev().take(Self::RADIUS).collect();
        let after = text[location.offset..].chars().take(Self::RADIUS);

        let marker = before.len();
        let snippet = before
            .into_iter()
            .rev()
            .chain(after)
            .map(|c| if c == '\n' { '␤' } else { c })
            .collect();

        Self { snippet, marker }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.snippet)?;
        write!(f, "{}^", " ".repeat(self.marker))
    }
}

/// A location-aware frame parsing failure. Produced at the first point of failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{code} at {location}: {message}")]
pub struct ParseError {
    pub code: ParseErrorCode,
    pub message: String,
    pub location: Location,
    pub context: Option<ErrorContext>,
    pub suggestion: Option<&'static str>,
}

impl ParseError {
    /// Build an error at byte `offset` of `text`, attaching context and the
    /// suggestion associated with `code`.
    pub fn at(text: &str, offset: usize, code: ParseErrorCode, message: impl Into<String>) -> Self {
        let location = Location::locate(text, offset);
        Self {
            code,
            message: message.into(),
            context: Some(ErrorContext::around(text, &location)),
            suggestion: Some(code.suggestion()),
            location,
        }
    }

    /// Render a human-facing diagnostic for this error using `ariadne`.
    ///
    /// `text` must be the input the error was produced from.
    pub fn report(&self, source_name: &str, text: &str) -> String {
        use ariadne::{Config, Label, Report, ReportKind, Source};

        // point at the last char when the failure is at end of input
        let total = text.chars().count();
        let start = text[..self.location.offset.min(text.len())]
            .chars()
            .count()
            .min(total.saturating_sub(1));
        let span = (source_name, start..(start + 1).min(total));

        let mut report = Report::build(ReportKind::Error, span.clone())
            .with_config(Config::default().with_color(false))
            .with_message(format!("{}: {}", self.code, self.message))
            .with_label(Label::new(span).with_message("the frame stops being valid here"));
        if let Some(suggestion) = self.suggestion {
            report = report.with_help(suggestion);
        }

        let mut buffer = Vec::new();
        match report
            .finish()
            .write((source_name, Source::from(text)), &mut buffer)
        {
            Ok(()) => String::from_utf8_lossy(&buffer).into_owned(),
            Err(_) => self.to_string(),
        }
    }
}

/// Failure of a frame against an externally supplied schema.
#[derive(Debug, Clone, PartialEq, Eq, EnumIs, Error)]
pub enum ValidateError {
    #[error("header `{key}` holds `{value}`, which is not a known dictionary code")]
    UnknownDictionaryCode { key: String, value: String },

    #[error("{location} uses the {profile} profile, which the schema does not allow")]
    UnsupportedProfile { location: String, profile: Profile },

    #[error("{location} must be {expected}, found {found}")]
    TypeMismatch {
        location: String,
        expected: String,
        found: String,
    },

    #[error("required header `{key}` is missing")]
    RequiredFieldMissing { key: String },

    #[error("frame does not match the schema: {reason}")]
    SchemaMismatch { reason: String },
}

impl ValidateError {
    pub fn code(&self) -> &'static str {
        match self {
            ValidateError::UnknownDictionaryCode { .. } => "VALIDATE_UNKNOWN_DICTIONARY_CODE",
            ValidateError::UnsupportedProfile { .. } => "VALIDATE_UNSUPPORTED_PROFILE",
            ValidateError::TypeMismatch { .. } => "VALIDATE_TYPE_MISMATCH",
            ValidateError::RequiredFieldMissing { .. } => "VALIDATE_REQUIRED_FIELD_MISSING",
            ValidateError::SchemaMismatch { .. } => "VALIDATE_SCHEMA_MISMATCH",
        }
    }
}

/// Failure to bring a frame into canonical form.
#[derive(Debug, Clone, PartialEq, Eq, EnumIs, Error)]
pub enum CanonicalizeError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("normalization failed: {reason}")]
    NormalizationFailed { reason: String },

    #[error("header key `{key}` appears more than once; the canonical order would be ambiguous")]
    AmbiguousFormat { key: String },
}

impl CanonicalizeError {
    pub fn code(&self) -> &'static str {
        match self {
            CanonicalizeError::Parse(error) => error.code.into(),
            CanonicalizeError::NormalizationFailed { .. } => "CANONICALIZE_NORMALIZATION_FAILED",
            CanonicalizeError::AmbiguousFormat { .. } => "CANONICALIZE_AMBIGUOUS_FORMAT",
        }
    }
}

/// Any failure produced by this crate, tagged by kind.
#[derive(Debug, Clone, PartialEq, Eq, EnumIs, Error)]
pub enum ForgeError {
    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Validate(#[from] ValidateError),

    #[error(transparent)]
    Canonicalize(#[from] CanonicalizeError),
}

pub type ForgeResult<T> = Result<T, ForgeError>;
