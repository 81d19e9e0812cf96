//! Schema validation of parsed frames.
//!
//! A [`FrameSchema`] describes which header keys a frame of some type carries,
//! what kind of token each holds, and which profiles its payload may use.
//! Schemas are plain data and (with the `serde` feature) can be loaded from
//! JSON or TOML.
use std::collections::BTreeSet;

use bitflags::bitflags;
use log::debug;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    frame::{Frame, TYPE_KEY, Token},
    numeral::Profile,
    utils::ValidateError,
};

bitflags! {
    /// A set of numeral profiles.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
    pub struct ProfileSet: u8 {
        const UNSIGNED = 1 << 0;
        const SIGNED = 1 << 1;
        const DECIMAL = 1 << 2;
        const FLOAT = 1 << 3;
        const BLOB = 1 << 4;

        const INTEGERS = Self::UNSIGNED.bits() | Self::SIGNED.bits();
        const EXACT = Self::INTEGERS.bits() | Self::DECIMAL.bits();
    }
}

impl From<Profile> for ProfileSet {
    fn from(profile: Profile) -> Self {
        match profile {
            Profile::Unsigned => ProfileSet::UNSIGNED,
            Profile::Signed => ProfileSet::SIGNED,
            Profile::Decimal => ProfileSet::DECIMAL,
            Profile::Float => ProfileSet::FLOAT,
            Profile::Blob => ProfileSet::BLOB,
        }
    }
}

impl ProfileSet {
    pub fn allows(self, profile: Profile) -> bool {
        self.contains(profile.into())
    }
}

/// What a header value must be.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ValueKind {
    Literal,
    Numeral(ProfileSet),
    Any,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FieldSchema {
    pub key: String,
    pub kind: ValueKind,
    #[cfg_attr(feature = "serde", serde(default))]
    pub required: bool,
    /// Closed set of codes a literal value must belong to.
    #[cfg_attr(feature = "serde", serde(default))]
    pub vocabulary: Option<BTreeSet<String>>,
}

impl FieldSchema {
    pub fn new(key: impl Into<String>, kind: ValueKind) -> Self {
        Self {
            key: key.into(),
            kind,
            required: false,
            vocabulary: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_vocabulary<I, S>(mut self, codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.vocabulary = Some(codes.into_iter().map(Into::into).collect());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PayloadSchema {
    pub literals: bool,
    pub profiles: ProfileSet,
    pub min_len: Option<usize>,
    pub max_len: Option<usize>,
    /// Tokens per record; the payload length must be a multiple of it.
    pub arity: Option<usize>,
}

impl Default for PayloadSchema {
    fn default() -> Self {
        Self {
            literals: true,
            profiles: ProfileSet::all(),
            min_len: None,
            max_len: None,
            arity: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FrameSchema {
    /// Required literal value of the `TYPE` header.
    #[cfg_attr(feature = "serde", serde(default))]
    pub frame_type: Option<String>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub fields: Vec<FieldSchema>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub payload: PayloadSchema,
    /// Accept header keys the schema does not declare.
    #[cfg_attr(feature = "serde", serde(default))]
    pub allow_unknown_fields: bool,
}

impl FrameSchema {
    pub fn for_type(frame_type: impl Into<String>) -> Self {
        Self {
            frame_type: Some(frame_type.into()),
            ..Default::default()
        }
    }

    pub fn field(mut self, field: FieldSchema) -> Self {
        self.fields.push(field);
        self
    }

    pub fn payload(mut self, payload: PayloadSchema) -> Self {
        self.payload = payload;
        self
    }

    fn declares(&self, key: &Token) -> bool {
        match key.as_str() {
            Some(key) => {
                (self.frame_type.is_some() && key == TYPE_KEY)
                    || self.fields.iter().any(|f| f.key == key)
            }
            None => false,
        }
    }

    /// Check `frame` against this schema, reporting the first violation.
    pub fn validate(&self, frame: &Frame) -> Result<(), ValidateError> {
        validate(frame, self)
    }
}

fn check_field(field: &FieldSchema, value: &Token) -> Result<(), ValidateError> {
    let location = || format!("header `{}`", field.key);
    match (&field.kind, value) {
        (ValueKind::Any, _) | (ValueKind::Literal, Token::Literal(_)) => {}
        (ValueKind::Numeral(allowed), Token::Numeral(numeral)) => {
            if !allowed.allows(numeral.profile()) {
                return Err(ValidateError::UnsupportedProfile {
                    location: location(),
                    profile: numeral.profile(),
                });
            }
        }
        (ValueKind::Literal, other) => {
            return Err(ValidateError::TypeMismatch {
                location: location(),
                expected: "a literal".to_string(),
                found: other.kind_name(),
            });
        }
        (ValueKind::Numeral(_), other) => {
            return Err(ValidateError::TypeMismatch {
                location: location(),
                expected: "a numeral".to_string(),
                found: other.kind_name(),
            });
        }
    }

    if let (Some(vocabulary), Token::Literal(code)) = (&field.vocabulary, value)
        && !vocabulary.contains(code)
    {
        return Err(ValidateError::UnknownDictionaryCode {
            key: field.key.clone(),
            value: code.clone(),
        });
    }
    Ok(())
}

fn check_payload(schema: &PayloadSchema, payload: &[Token]) -> Result<(), ValidateError> {
    if let Some(min) = schema.min_len
        && payload.len() < min
    {
        return Err(ValidateError::SchemaMismatch {
            reason: format!("payload holds {} tokens, at least {} required", payload.len(), min),
        });
    }
    if let Some(max) = schema.max_len
        && payload.len() > max
    {
        return Err(ValidateError::SchemaMismatch {
            reason: format!("payload holds {} tokens, at most {} allowed", payload.len(), max),
        });
    }
    if let Some(arity) = schema.arity
        && arity > 0
        && payload.len() % arity != 0
    {
        return Err(ValidateError::SchemaMismatch {
            reason: format!(
                "payload holds {} tokens, not a whole number of {}-token records",
                payload.len(),
                arity
            ),
        });
    }

    for (index, token) in payload.iter().enumerate() {
        match token {
            Token::Literal(_) if !schema.literals => {
                return Err(ValidateError::TypeMismatch {
                    location: format!("payload token {}", index),
                    expected: "a numeral".to_string(),
                    found: token.kind_name(),
                });
            }
            Token::Numeral(numeral) if !schema.profiles.allows(numeral.profile()) => {
                return Err(ValidateError::UnsupportedProfile {
                    location: format!("payload token {}", index),
                    profile: numeral.profile(),
                });
            }
            _ => {}
        }
    }
    Ok(())
}

/// Check `frame` against `schema`, reporting the first violation.
///
/// Checks run in order: frame type, declared fields, undeclared keys, payload.
pub fn validate(frame: &Frame, schema: &FrameSchema) -> Result<(), ValidateError> {
    let result = (|| {
        if let Some(expected) = &schema.frame_type {
            match frame.header_value(TYPE_KEY) {
                None => {
                    return Err(ValidateError::RequiredFieldMissing {
                        key: TYPE_KEY.to_string(),
                    });
                }
                Some(Token::Literal(found)) if found == expected => {}
                Some(other) => {
                    return Err(ValidateError::SchemaMismatch {
                        reason: format!("frame type is {}, expected [{}]", other, expected),
                    });
                }
            }
        }

        for field in &schema.fields {
            match frame.header_value(&field.key) {
                Some(value) => check_field(field, value)?,
                None if field.required => {
                    return Err(ValidateError::RequiredFieldMissing {
                        key: field.key.clone(),
                    });
                }
                None => {}
            }
        }

        if !schema.allow_unknown_fields
            && let Some((key, _)) = frame.header.iter().find(|(key, _)| !schema.declares(key))
        {
            return Err(ValidateError::SchemaMismatch {
                reason: format!("header key {} is not declared", key),
            });
        }

        check_payload(&schema.payload, &frame.payload)
    })();

    if let Err(error) = &result {
        debug!("frame failed validation: {}", error);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{frame::parse, numeral::NumeralToken};

    fn vector_schema() -> FrameSchema {
        FrameSchema::for_type("VECTOR")
            .field(
                FieldSchema::new("UNIT", ValueKind::Literal)
                    .required()
                    .with_vocabulary(["m", "s", "kg"]),
            )
            .field(FieldSchema::new("DIM", ValueKind::Numeral(ProfileSet::UNSIGNED)))
            .payload(PayloadSchema {
                literals: false,
                profiles: ProfileSet::EXACT,
                min_len: Some(1),
                max_len: None,
                arity: None,
            })
    }

    #[test]
    fn accepts_conforming_frame() {
        let frame = parse("≛[TYPE][VECTOR]⁝[UNIT][m]⁝[DIM]⊙⊙Φ⁝⦙⊙⊙⊗⋅⊙⊗⊗⊗∎").unwrap();
        assert_eq!(vector_schema().validate(&frame), Ok(()));
    }

    #[test]
    fn reports_each_violation_kind() {
        let schema = vector_schema();
        let base = || Frame::new().with_header("TYPE", "VECTOR").with_header("UNIT", "m");

        let err = validate(&Frame::new().with_header("TYPE", "VECTOR"), &schema).unwrap_err();
        assert_eq!(err, ValidateError::RequiredFieldMissing { key: "UNIT".into() });

        let err = validate(
            &Frame::new().with_header("TYPE", "VECTOR").with_header("UNIT", "parsec"),
            &schema,
        )
        .unwrap_err();
        assert!(err.is_unknown_dictionary_code());

        let err = validate(&base().with_header("DIM", "three"), &schema).unwrap_err();
        assert!(err.is_type_mismatch());

        let err = validate(&base().with_header("DIM", NumeralToken::from(-3i64)), &schema)
            .unwrap_err();
        assert!(err.is_unsupported_profile());

        let err = validate(
            &base()
                .with_header("EXTRA", "x")
                .with_payload(NumeralToken::from(1u64)),
            &schema,
        )
        .unwrap_err();
        assert!(err.is_schema_mismatch());

        let err = validate(&base(), &schema).unwrap_err();
        assert_eq!(err.code(), "VALIDATE_SCHEMA_MISMATCH");

        let err = validate(&base().with_payload(NumeralToken::Blob(vec![1])), &schema).unwrap_err();
        assert!(err.is_unsupported_profile());

        let err = validate(&base().with_payload("text"), &schema).unwrap_err();
        assert!(err.is_type_mismatch());
    }

    #[test]
    fn wrong_frame_type() {
        let frame = Frame::new().with_header("TYPE", "MATRIX").with_header("UNIT", "m");
        let err = vector_schema().validate(&frame).unwrap_err();
        assert!(err.is_schema_mismatch());
    }

    #[test]
    fn payload_arity() {
        let schema = FrameSchema {
            allow_unknown_fields: true,
            payload: PayloadSchema {
                arity: Some(2),
                ..Default::default()
            },
            ..Default::default()
        };
        let pair = Frame::new().with_payload("a").with_payload("b");
        assert!(schema.validate(&pair).is_ok());
        let err = schema.validate(&pair.with_payload("c")).unwrap_err();
        assert!(err.is_schema_mismatch());
    }

    #[test]
    fn unknown_fields_can_be_allowed() {
        let mut schema = FrameSchema::default();
        let frame = Frame::new().with_header("ANY", "thing");
        assert!(schema.validate(&frame).is_err());
        schema.allow_unknown_fields = true;
        assert!(schema.validate(&frame).is_ok());
    }
}
