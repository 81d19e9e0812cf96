//! Numeral codecs
//!
//! A numeral is a sequence of digits drawn from the trit alphabet. Digits
//! `0`, `1` and `2` are shared by every profile; digit `3` is reserved for
//! the byte-oriented blob profile. On the wire every digit is rendered as one
//! glyph (see [`DIGIT_GLYPHS`]).
//!
//! Five profiles are supported, each a pure encode/decode pair:
//!
//! - `int`: unsigned and signed integers (big-endian base 3)
//! - `decimal`: exact `(sign, scale, magnitude)` decimals
//! - `float`: approximate floats with caller-chosen field widths (lossy)
//! - `blob`: arbitrary bytes, four base-4 digits per byte
//!
//! The raw helpers (`encode_u3`, `decode_blob`, ...) work on profile *bodies*.
//! A [`NumeralToken`] on the wire is the 2-trit profile tag followed by the body;
//! use [`encode_profile`] and [`decode_profile`] for tagged sequences.
use std::fmt;

use num_bigint::{BigInt, BigUint};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use strum::{EnumIs, EnumIter, EnumTryAs, IntoEnumIterator, IntoStaticStr};

use crate::utils::{CodecError, CodecResult};

pub mod blob;
pub mod decimal;
pub mod float;
pub mod int;

pub use blob::{decode_blob, decode_blob_checked, encode_blob, encode_blob_checked};
pub use decimal::{ExactDecimal, decode_decimal, encode_decimal};
pub use float::{ApproxFloat, FloatParams, decode_float, encode_float};
pub use int::{decode_s3, decode_u3, encode_s3, encode_u3};

/// A digit buffer. Most numerals fit inline; blobs spill to the heap.
pub type Trits = SmallVec<u8, 32>;

/// Glyph used on the wire for each digit value.
pub const DIGIT_GLYPHS: [char; 4] = ['⊙', '⊗', 'Φ', '⊛'];

/// Digit value of a wire glyph, if it is one.
#[inline]
pub const fn glyph_digit(c: char) -> Option<u8> {
    match c {
        '⊙' => Some(0),
        '⊗' => Some(1),
        'Φ' => Some(2),
        '⊛' => Some(3),
        _ => None,
    }
}

/// Wire glyph of a digit value.
#[inline]
pub fn digit_glyph(digit: u8) -> char {
    debug_assert!(digit <= 3, "digit {} is outside the trit alphabet", digit);
    DIGIT_GLYPHS[(digit & 3) as usize]
}

/// Render digits as wire glyphs.
pub fn render_digits(digits: &[u8]) -> String {
    digits.iter().map(|d| digit_glyph(*d)).collect()
}

/// Read wire glyphs back into digits. Fails on the first non-digit character.
pub fn read_glyphs(text: &str) -> CodecResult<Trits> {
    text.chars()
        .enumerate()
        .map(|(position, c)| {
            glyph_digit(c).ok_or_else(|| {
                CodecError::invalid("glyph", position, format!("`{}` is not a digit glyph", c))
            })
        })
        .collect()
}

/// The five numeral encodings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, EnumIter, IntoStaticStr, strum::Display)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[strum(serialize_all = "snake_case")]
pub enum Profile {
    Unsigned,
    Signed,
    Decimal,
    Float,
    Blob,
}

impl Profile {
    /// Number of trits in the profile tag prefixing every numeral token.
    pub const TAG_WIDTH: usize = 2;

    /// Numeric value of the profile tag.
    pub const fn tag(self) -> u8 {
        match self {
            Profile::Unsigned => 0,
            Profile::Signed => 1,
            Profile::Decimal => 2,
            Profile::Float => 3,
            Profile::Blob => 4,
        }
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        Profile::iter().find(|profile| profile.tag() == tag)
    }

    /// Whether the profile body may use digit `3`.
    pub const fn uses_fourth_trit(self) -> bool {
        matches!(self, Profile::Blob)
    }

    fn push_tag(self, out: &mut Trits) {
        push_fixed(out, self.tag() as u64, Self::TAG_WIDTH);
    }

    fn read_tag(digits: &[u8]) -> CodecResult<Self> {
        if digits.len() < Self::TAG_WIDTH {
            return Err(CodecError::invalid(
                "numeral tag",
                digits.len(),
                "numeral is shorter than its 2-trit profile tag",
            ));
        }

        let tag = &digits[..Self::TAG_WIDTH];
        let unknown = || CodecError::UnknownProfile {
            tag: render_digits(tag),
        };
        if tag.iter().any(|d| *d > 2) {
            return Err(unknown());
        }
        let value = tag.iter().fold(0u8, |acc, d| acc * 3 + d);
        Self::from_tag(value).ok_or_else(unknown)
    }
}

/// A raw value to encode under a given profile.
#[derive(Debug, Clone, PartialEq)]
pub enum NumeralValue<'a> {
    Unsigned(BigInt),
    Signed(BigInt),
    Decimal {
        negative: bool,
        scale: u32,
        magnitude: BigUint,
    },
    Float(f64),
    Blob(&'a [u8]),
}

impl NumeralValue<'_> {
    pub fn profile(&self) -> Profile {
        match self {
            NumeralValue::Unsigned(_) => Profile::Unsigned,
            NumeralValue::Signed(_) => Profile::Signed,
            NumeralValue::Decimal { .. } => Profile::Decimal,
            NumeralValue::Float(_) => Profile::Float,
            NumeralValue::Blob(_) => Profile::Blob,
        }
    }
}

/// A decoded, tagged numeral. Always round-trips to and from its digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash, EnumIs, EnumTryAs)]
pub enum NumeralToken {
    Unsigned(BigUint),
    Signed(BigInt),
    Decimal(ExactDecimal),
    Float(ApproxFloat),
    Blob(Vec<u8>),
}

impl NumeralToken {
    pub fn profile(&self) -> Profile {
        match self {
            NumeralToken::Unsigned(_) => Profile::Unsigned,
            NumeralToken::Signed(_) => Profile::Signed,
            NumeralToken::Decimal(_) => Profile::Decimal,
            NumeralToken::Float(_) => Profile::Float,
            NumeralToken::Blob(_) => Profile::Blob,
        }
    }

    /// Convert a raw value, checking it against the range of its profile.
    /// `params` is only consulted for floats.
    pub fn from_value(value: &NumeralValue<'_>, params: &FloatParams) -> CodecResult<Self> {
        Ok(match value {
            NumeralValue::Unsigned(n) => {
                let magnitude = n.to_biguint().ok_or_else(|| CodecError::OutOfRange {
                    profile: Profile::Unsigned,
                    value: n.to_string(),
                    reason: "unsigned integers cannot be negative",
                })?;
                NumeralToken::Unsigned(magnitude)
            }
            NumeralValue::Signed(n) => NumeralToken::Signed(n.clone()),
            NumeralValue::Decimal {
                negative,
                scale,
                magnitude,
            } => NumeralToken::Decimal(ExactDecimal::new(*negative, *scale, magnitude.clone())?),
            NumeralValue::Float(v) => NumeralToken::Float(ApproxFloat::from_f64(*v, *params)?),
            NumeralValue::Blob(bytes) => NumeralToken::Blob(bytes.to_vec()),
        })
    }

    /// Tagged digit sequence of this numeral.
    pub fn to_trits(&self) -> Trits {
        let mut out = Trits::new();
        self.profile().push_tag(&mut out);
        match self {
            NumeralToken::Unsigned(n) => push_magnitude(&mut out, n),
            NumeralToken::Signed(n) => int::push_signed(&mut out, n),
            NumeralToken::Decimal(d) => d.push_body(&mut out),
            NumeralToken::Float(f) => f.push_body(&mut out),
            NumeralToken::Blob(bytes) => out.extend(blob::blob_digits(bytes)),
        }
        out
    }

    /// Decode a tagged digit sequence.
    pub fn from_trits(digits: &[u8]) -> CodecResult<Self> {
        let profile = Profile::read_tag(digits)?;
        let body = &digits[Profile::TAG_WIDTH..];

        let decoded = match profile {
            Profile::Unsigned => read_magnitude(body, "unsigned", 0).map(NumeralToken::Unsigned),
            Profile::Signed => decode_s3(body).map(NumeralToken::Signed),
            Profile::Decimal => decode_decimal(body).map(NumeralToken::Decimal),
            Profile::Float => decode_float(body).map(NumeralToken::Float),
            Profile::Blob => decode_blob(body).map(NumeralToken::Blob),
        };
        decoded.map_err(|e| e.offset_by(Profile::TAG_WIDTH))
    }
}

impl fmt::Display for NumeralToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for digit in self.to_trits().iter() {
            write!(f, "{}", digit_glyph(*digit))?;
        }
        Ok(())
    }
}

impl From<BigUint> for NumeralToken {
    fn from(value: BigUint) -> Self {
        NumeralToken::Unsigned(value)
    }
}

impl From<u64> for NumeralToken {
    fn from(value: u64) -> Self {
        NumeralToken::Unsigned(value.into())
    }
}

impl From<BigInt> for NumeralToken {
    fn from(value: BigInt) -> Self {
        NumeralToken::Signed(value)
    }
}

impl From<i64> for NumeralToken {
    fn from(value: i64) -> Self {
        NumeralToken::Signed(value.into())
    }
}

impl From<ExactDecimal> for NumeralToken {
    fn from(value: ExactDecimal) -> Self {
        NumeralToken::Decimal(value)
    }
}

impl From<ApproxFloat> for NumeralToken {
    fn from(value: ApproxFloat) -> Self {
        NumeralToken::Float(value)
    }
}

/// Encode `value` under its profile, returning the tagged digit sequence.
pub fn encode_profile(value: &NumeralValue<'_>, params: &FloatParams) -> CodecResult<Trits> {
    NumeralToken::from_value(value, params).map(|token| token.to_trits())
}

/// Decode a tagged digit sequence into its numeral.
pub fn decode_profile(trits: &[u8]) -> CodecResult<NumeralToken> {
    NumeralToken::from_trits(trits)
}

/// Append `value` as exactly `width` big-endian base-3 digits.
pub(crate) fn push_fixed(out: &mut Trits, value: u64, width: usize) {
    debug_assert!(
        width >= 64 || value < 3u64.saturating_pow(width as u32),
        "value {} does not fit in {} trits",
        value,
        width
    );
    let start = out.len();
    let mut rest = value;
    for _ in 0..width {
        out.push((rest % 3) as u8);
        rest /= 3;
    }
    out[start..].reverse();
}

/// Read a fixed-width big-endian base-3 field.
pub(crate) fn read_fixed(digits: &[u8], what: &'static str, offset: usize) -> CodecResult<u64> {
    digits.iter().enumerate().try_fold(0u64, |acc, (i, d)| {
        if *d > 2 {
            Err(CodecError::invalid(
                what,
                offset + i,
                format!("digit {} is not a trit", d),
            ))
        } else {
            Ok(acc * 3 + *d as u64)
        }
    })
}

/// Append the canonical base-3 expansion of `value` (`0` for zero).
pub(crate) fn push_magnitude(out: &mut Trits, value: &BigUint) {
    if value.bits() == 0 {
        out.push(0);
    } else {
        out.extend(value.to_radix_be(3));
    }
}

/// Read a canonical base-3 magnitude spanning all of `digits`.
pub(crate) fn read_magnitude(
    digits: &[u8],
    what: &'static str,
    offset: usize,
) -> CodecResult<BigUint> {
    if digits.is_empty() {
        return Err(CodecError::invalid(what, offset, "magnitude has no digits"));
    }
    if let Some(i) = digits.iter().position(|d| *d > 2) {
        return Err(CodecError::invalid(
            what,
            offset + i,
            format!("digit {} is not a trit", digits[i]),
        ));
    }
    if digits.len() > 1 && digits[0] == 0 {
        return Err(CodecError::invalid(
            what,
            offset,
            "magnitude has a leading zero",
        ));
    }

    BigUint::from_radix_be(digits, 3)
        .ok_or_else(|| CodecError::invalid(what, offset, "magnitude is not base 3"))
}
