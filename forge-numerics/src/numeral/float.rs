//! Approximate float profile.
//!
//! **This profile is lossy.** A value is stored as
//! `mantissa / 3^mantissa_width * 3^exponent`, with the mantissa normalized to
//! `[3^(mantissa_width - 1), 3^mantissa_width)` and rounded to nearest. The
//! field widths are chosen by the caller through [`FloatParams`] and recorded
//! in the body, so decoding needs no parameters.
//!
//! Body layout:
//! - 1 sign trit
//! - 2 trits holding `exponent_width - 1`
//! - `exponent_width` trits holding the exponent biased by `(3^w - 1) / 2`
//! - `mantissa_width` trits holding the mantissa (the rest of the body)
//!
//! Zero is the all-zero mantissa with the smallest exponent field. Exponents
//! above the representable range fail; exponents below it flush to zero.
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{
    numeral::{Profile, Trits, push_fixed, read_fixed},
    utils::{CodecError, CodecResult},
};

/// Field widths of the float profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FloatParams {
    pub exponent_width: u8,
    pub mantissa_width: u8,
}

impl Default for FloatParams {
    /// Covers the full `f64` exponent range with slightly more than `f64` precision.
    fn default() -> Self {
        Self {
            exponent_width: 7,
            mantissa_width: 34,
        }
    }
}

impl FloatParams {
    pub const MAX_EXPONENT_WIDTH: u8 = 9;
    pub const MAX_MANTISSA_WIDTH: u8 = 40;
    const WIDTH_FIELD: usize = 2;

    pub const fn new(exponent_width: u8, mantissa_width: u8) -> Self {
        Self {
            exponent_width,
            mantissa_width,
        }
    }

    pub fn validate(&self) -> CodecResult<()> {
        if !(1..=Self::MAX_EXPONENT_WIDTH).contains(&self.exponent_width) {
            return Err(CodecError::InvalidArgument {
                profile: Profile::Float,
                reason: format!(
                    "exponent width must be between 1 and {}, got {}",
                    Self::MAX_EXPONENT_WIDTH,
                    self.exponent_width
                ),
            });
        }
        if !(1..=Self::MAX_MANTISSA_WIDTH).contains(&self.mantissa_width) {
            return Err(CodecError::InvalidArgument {
                profile: Profile::Float,
                reason: format!(
                    "mantissa width must be between 1 and {}, got {}",
                    Self::MAX_MANTISSA_WIDTH,
                    self.mantissa_width
                ),
            });
        }
        Ok(())
    }

    /// Exponent bias, `(3^w - 1) / 2`.
    pub fn bias(&self) -> i64 {
        (3i64.pow(self.exponent_width as u32) - 1) / 2
    }

    /// Inclusive range of representable exponents.
    pub fn exponent_range(&self) -> (i64, i64) {
        let bias = self.bias();
        (-bias, bias)
    }

    fn mantissa_limit(&self) -> u64 {
        3u64.pow(self.mantissa_width as u32)
    }

    /// Number of digits in a float body with these widths.
    pub fn body_len(&self) -> usize {
        1 + Self::WIDTH_FIELD + self.exponent_width as usize + self.mantissa_width as usize
    }
}

/// A decoded approximate float: sign, base-3 exponent and mantissa.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ApproxFloat {
    negative: bool,
    exponent: i64,
    mantissa: u64,
    params: FloatParams,
}

impl ApproxFloat {
    fn zero(negative: bool, params: FloatParams) -> Self {
        Self {
            negative,
            exponent: params.exponent_range().0,
            mantissa: 0,
            params,
        }
    }

    /// Round `value` to the nearest representable float under `params`.
    pub fn from_f64(value: f64, params: FloatParams) -> CodecResult<Self> {
        params.validate()?;
        if !value.is_finite() {
            return Err(CodecError::InvalidArgument {
                profile: Profile::Float,
                reason: format!("{} is not a finite number", value),
            });
        }

        let negative = value.is_sign_negative();
        let magnitude = value.abs();
        if magnitude == 0.0 {
            return Ok(Self::zero(negative, params));
        }

        let mut exponent = magnitude.log(3.0).floor() as i64 + 1;
        let mut fraction = mul_pow3(magnitude, -exponent);
        while fraction >= 1.0 {
            fraction /= 3.0;
            exponent += 1;
        }
        while fraction < 1.0 / 3.0 {
            fraction *= 3.0;
            exponent -= 1;
        }

        let limit = params.mantissa_limit();
        let mut mantissa = (fraction * limit as f64).round() as u64;
        if mantissa >= limit {
            mantissa = limit / 3;
            exponent += 1;
        }
        mantissa = mantissa.max(limit / 3);

        let (min, max) = params.exponent_range();
        if exponent > max {
            return Err(CodecError::OutOfRange {
                profile: Profile::Float,
                value: value.to_string(),
                reason: "exponent exceeds the configured exponent width",
            });
        }
        if exponent < min {
            return Ok(Self::zero(negative, params));
        }

        Ok(Self {
            negative,
            exponent,
            mantissa,
            params,
        })
    }

    pub fn to_f64(&self) -> f64 {
        let magnitude = if self.mantissa == 0 {
            0.0
        } else {
            mul_pow3(
                self.mantissa as f64,
                self.exponent - self.params.mantissa_width as i64,
            )
        };
        if self.negative { -magnitude } else { magnitude }
    }

    pub fn is_negative(&self) -> bool {
        self.negative
    }

    pub fn exponent(&self) -> i64 {
        self.exponent
    }

    pub fn mantissa(&self) -> u64 {
        self.mantissa
    }

    pub fn params(&self) -> FloatParams {
        self.params
    }

    pub(crate) fn push_body(&self, out: &mut Trits) {
        let params = self.params;
        out.push(self.negative as u8);
        push_fixed(
            out,
            (params.exponent_width - 1) as u64,
            FloatParams::WIDTH_FIELD,
        );
        push_fixed(
            out,
            (self.exponent + params.bias()) as u64,
            params.exponent_width as usize,
        );
        push_fixed(out, self.mantissa, params.mantissa_width as usize);
    }
}

/// Multiply by `3^k` in exact steps so intermediate values neither overflow
/// nor underflow before the final scaling.
fn mul_pow3(mut value: f64, mut k: i64) -> f64 {
    const STEP: i64 = 30; // 3^30 < 2^53
    while k > 0 {
        let step = k.min(STEP);
        value *= 3f64.powi(step as i32);
        k -= step;
    }
    while k < 0 {
        let step = (-k).min(STEP);
        value /= 3f64.powi(step as i32);
        k += step;
    }
    value
}

/// Encode `value` as a float body using the widths in `params`.
pub fn encode_float(value: f64, params: FloatParams) -> CodecResult<Trits> {
    let float = ApproxFloat::from_f64(value, params)?;
    let mut out = Trits::new();
    float.push_body(&mut out);
    Ok(out)
}

/// Decode a float body produced by [`encode_float`].
pub fn decode_float(digits: &[u8]) -> CodecResult<ApproxFloat> {
    let prefix = 1 + FloatParams::WIDTH_FIELD;
    if digits.len() <= prefix {
        return Err(CodecError::invalid(
            "float",
            digits.len(),
            "float body is shorter than its sign and width fields",
        ));
    }

    let negative = match digits[0] {
        0 => false,
        1 => true,
        other => {
            return Err(CodecError::invalid(
                "float",
                0,
                format!("sign trit must be 0 or 1, found {}", other),
            ));
        }
    };
    let exponent_width = read_fixed(&digits[1..prefix], "float width", 1)? as usize + 1;
    let mantissa_start = prefix + exponent_width;
    if digits.len() <= mantissa_start {
        return Err(CodecError::invalid(
            "float",
            digits.len(),
            "float body ends before its mantissa",
        ));
    }
    let mantissa_width = digits.len() - mantissa_start;
    let params = FloatParams::new(exponent_width as u8, mantissa_width.min(u8::MAX as usize) as u8);
    params
        .validate()
        .map_err(|e| CodecError::invalid("float", mantissa_start, e.to_string()))?;

    let exponent_field = read_fixed(&digits[prefix..mantissa_start], "float exponent", prefix)?;
    let mantissa = read_fixed(&digits[mantissa_start..], "float mantissa", mantissa_start)?;
    let exponent = exponent_field as i64 - params.bias();

    if mantissa == 0 {
        if exponent_field != 0 {
            return Err(CodecError::invalid(
                "float",
                prefix,
                "zero must use the smallest exponent",
            ));
        }
    } else if mantissa < params.mantissa_limit() / 3 {
        return Err(CodecError::invalid(
            "float",
            mantissa_start,
            "mantissa is not normalized",
        ));
    }

    Ok(ApproxFloat {
        negative,
        exponent,
        mantissa,
        params,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn relative_error(a: f64, b: f64) -> f64 {
        ((a - b) / b).abs()
    }

    #[test]
    fn approximate_roundtrip() {
        let params = FloatParams::default();
        for value in [1.0, 1.5, -2.75, 3.0, 1e-300, 6.02214076e23, -9.81, 0.1] {
            let body = encode_float(value, params).unwrap();
            assert_eq!(body.len(), params.body_len());
            let decoded = decode_float(&body).unwrap().to_f64();
            assert!(
                relative_error(decoded, value) < 1e-13,
                "{} decoded as {}",
                value,
                decoded
            );
        }
    }

    #[test]
    fn exact_for_powers_of_three() {
        let params = FloatParams::new(3, 5);
        for value in [1.0, 3.0, 9.0, 1.0 / 3.0, 27.0] {
            let decoded = decode_float(&encode_float(value, params).unwrap()).unwrap();
            assert_eq!(decoded.to_f64(), value);
        }
    }

    #[test]
    fn narrow_mantissa_is_lossy() {
        let params = FloatParams::new(3, 2);
        let decoded = decode_float(&encode_float(1.4, params).unwrap())
            .unwrap()
            .to_f64();
        assert_ne!(decoded, 1.4);
        assert!(relative_error(decoded, 1.4) < 0.2);
    }

    #[test]
    fn zero_keeps_sign() {
        let params = FloatParams::default();
        let positive = decode_float(&encode_float(0.0, params).unwrap()).unwrap();
        let negative = decode_float(&encode_float(-0.0, params).unwrap()).unwrap();
        assert_eq!(positive.to_f64(), 0.0);
        assert!(!positive.is_negative());
        assert!(negative.is_negative());
        assert!(negative.to_f64().is_sign_negative());
    }

    #[test]
    fn overflow_and_underflow() {
        let params = FloatParams::new(1, 4);
        // exponent range is [-1, 1]
        let err = encode_float(100.0, params).unwrap_err();
        assert!(err.is_out_of_range());

        let flushed = decode_float(&encode_float(1e-6, params).unwrap()).unwrap();
        assert_eq!(flushed.to_f64(), 0.0);
    }

    #[test]
    fn rejects_non_finite_and_bad_widths() {
        let params = FloatParams::default();
        assert!(encode_float(f64::NAN, params).unwrap_err().is_invalid_argument());
        assert!(encode_float(f64::INFINITY, params).unwrap_err().is_invalid_argument());
        assert!(encode_float(1.0, FloatParams::new(0, 5)).unwrap_err().is_invalid_argument());
        assert!(encode_float(1.0, FloatParams::new(2, 41)).unwrap_err().is_invalid_argument());
    }

    #[test]
    fn rejects_non_canonical_bodies() {
        let params = FloatParams::new(1, 2);
        // sign 0, width field 00, exponent field 1, mantissa 00 (zero with non-minimal exponent)
        assert!(decode_float(&[0, 0, 0, 1, 0, 0]).is_err());
        // mantissa 01 is below 3^(2-1)
        assert!(decode_float(&[0, 0, 0, 1, 0, 1]).is_err());
        // valid: mantissa 10
        let value = decode_float(&[0, 0, 0, 1, 1, 0]).unwrap();
        assert_eq!(value.params(), params);
        assert_eq!(value.to_f64(), 1.0 / 3.0);
    }
}
