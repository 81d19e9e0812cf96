//! Exact decimal profile.
//!
//! A decimal is the triple `(sign, scale, magnitude)` with
//! `value = sign * magnitude * 10^(-scale)`. Keeping the triple (rather than
//! a binary float) makes measurement and money values round-trip exactly,
//! including their number of fractional digits: `1.50` and `1.5` are distinct
//! decimals.
//!
//! Body layout: one sign trit, a fixed 4-trit scale, then the base-3 magnitude.
use std::fmt;

use bigdecimal::BigDecimal;
use num_bigint::{BigInt, BigUint, Sign};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    numeral::{Profile, Trits, push_fixed, push_magnitude, read_fixed, read_magnitude},
    utils::{CodecError, CodecResult},
};

/// An exact `(sign, scale, magnitude)` decimal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ExactDecimal {
    negative: bool,
    scale: u32,
    magnitude: BigUint,
}

impl ExactDecimal {
    /// Width of the scale field in trits.
    pub const SCALE_WIDTH: usize = 4;
    /// Largest representable scale (`3^4 - 1`).
    pub const MAX_SCALE: u32 = 80;

    pub fn new(negative: bool, scale: u32, magnitude: BigUint) -> CodecResult<Self> {
        if scale > Self::MAX_SCALE {
            return Err(CodecError::OutOfRange {
                profile: Profile::Decimal,
                value: format!("scale {}", scale),
                reason: "decimal scale must be at most 80",
            });
        }
        Ok(Self {
            negative,
            scale,
            magnitude,
        })
    }

    /// Build a decimal from an arbitrary-precision [`BigDecimal`], keeping its
    /// scale. Negative scales are expanded into the magnitude.
    pub fn from_bigdecimal(value: &BigDecimal) -> CodecResult<Self> {
        let (mut digits, exponent) = value.as_bigint_and_exponent();
        let scale = if exponent < 0 {
            let shift =
                u32::try_from(exponent.unsigned_abs()).map_err(|_| CodecError::OutOfRange {
                    profile: Profile::Decimal,
                    value: format!("exponent {}", -(exponent as i128)),
                    reason: "decimal magnitude is too large",
                })?;
            digits *= BigInt::from(10u32).pow(shift);
            0
        } else {
            u32::try_from(exponent).map_err(|_| CodecError::OutOfRange {
                profile: Profile::Decimal,
                value: format!("scale {}", exponent),
                reason: "decimal scale must be at most 80",
            })?
        };

        Self::new(
            digits.sign() == Sign::Minus,
            scale,
            digits.magnitude().clone(),
        )
    }

    pub fn is_negative(&self) -> bool {
        self.negative
    }

    pub fn scale(&self) -> u32 {
        self.scale
    }

    pub fn magnitude(&self) -> &BigUint {
        &self.magnitude
    }

    /// The `(negative, scale, magnitude)` triple.
    pub fn into_parts(self) -> (bool, u32, BigUint) {
        (self.negative, self.scale, self.magnitude)
    }

    pub fn to_bigdecimal(&self) -> BigDecimal {
        let sign = if self.negative { Sign::Minus } else { Sign::Plus };
        BigDecimal::new(
            BigInt::from_biguint(sign, self.magnitude.clone()),
            self.scale as i64,
        )
    }

    pub(crate) fn push_body(&self, out: &mut Trits) {
        out.push(self.negative as u8);
        push_fixed(out, self.scale as u64, Self::SCALE_WIDTH);
        push_magnitude(out, &self.magnitude);
    }
}

impl fmt::Display for ExactDecimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digits = self.magnitude.to_string();
        let scale = self.scale as usize;
        let sign = if self.negative { "-" } else { "" };
        if scale == 0 {
            return write!(f, "{}{}", sign, digits);
        }

        let padded = if digits.len() <= scale {
            format!("{}{}", "0".repeat(scale + 1 - digits.len()), digits)
        } else {
            digits
        };
        let (int_part, frac_part) = padded.split_at(padded.len() - scale);
        write!(f, "{}{}.{}", sign, int_part, frac_part)
    }
}

/// Encode the triple `(negative, scale, magnitude)` as a decimal body.
pub fn encode_decimal(negative: bool, scale: u32, magnitude: &BigUint) -> CodecResult<Trits> {
    let decimal = ExactDecimal::new(negative, scale, magnitude.clone())?;
    let mut out = Trits::new();
    decimal.push_body(&mut out);
    Ok(out)
}

/// Decode a decimal body produced by [`encode_decimal`].
pub fn decode_decimal(digits: &[u8]) -> CodecResult<ExactDecimal> {
    let header = 1 + ExactDecimal::SCALE_WIDTH;
    if digits.len() <= header {
        return Err(CodecError::invalid(
            "decimal",
            digits.len(),
            "decimal body needs a sign, a 4-trit scale and at least one magnitude digit",
        ));
    }

    let negative = match digits[0] {
        0 => false,
        1 => true,
        other => {
            return Err(CodecError::invalid(
                "decimal",
                0,
                format!("sign trit must be 0 or 1, found {}", other),
            ));
        }
    };
    let scale = read_fixed(&digits[1..header], "decimal scale", 1)?;
    let magnitude = read_magnitude(&digits[header..], "decimal", header)?;

    // A 4-trit field never exceeds MAX_SCALE.
    ExactDecimal::new(negative, scale as u32, magnitude)
}
