//! Unsigned and signed integer profiles.
//!
//! Unsigned bodies are the big-endian base-3 expansion of the value with no
//! leading zero (zero itself is the single digit `0`). Signed bodies prefix
//! the unsigned body of `|value|` with one sign trit: `0` for non-negative,
//! `1` for negative. A negative zero is not a valid signed body.
use num_bigint::{BigInt, Sign};

use crate::{
    numeral::{Profile, Trits, push_magnitude, read_magnitude},
    utils::{CodecError, CodecResult},
};

/// Encode a non-negative integer as its base-3 digits.
///
/// ```rust
/// # use forge_numerics::numeral::encode_u3;
/// assert_eq!(&encode_u3(42).unwrap()[..], &[1, 1, 2, 0]);
/// assert!(encode_u3(-1).is_err());
/// ```
pub fn encode_u3(value: impl Into<BigInt>) -> CodecResult<Trits> {
    let value = value.into();
    let magnitude = value.to_biguint().ok_or_else(|| CodecError::OutOfRange {
        profile: Profile::Unsigned,
        value: value.to_string(),
        reason: "unsigned integers cannot be negative",
    })?;

    let mut out = Trits::new();
    push_magnitude(&mut out, &magnitude);
    Ok(out)
}

/// Decode base-3 digits produced by [`encode_u3`].
pub fn decode_u3(digits: &[u8]) -> CodecResult<BigInt> {
    read_magnitude(digits, "unsigned", 0).map(BigInt::from)
}

/// Encode any integer as a sign trit followed by the digits of its magnitude.
pub fn encode_s3(value: impl Into<BigInt>) -> CodecResult<Trits> {
    let mut out = Trits::new();
    push_signed(&mut out, &value.into());
    Ok(out)
}

/// Decode digits produced by [`encode_s3`].
pub fn decode_s3(digits: &[u8]) -> CodecResult<BigInt> {
    let Some((&sign, magnitude)) = digits.split_first() else {
        return Err(CodecError::invalid("signed", 0, "missing sign trit"));
    };

    let magnitude = read_magnitude(magnitude, "signed", 1)?;
    match sign {
        0 => Ok(BigInt::from(magnitude)),
        1 if magnitude.bits() == 0 => Err(CodecError::invalid(
            "signed",
            0,
            "negative zero is not a canonical signed integer",
        )),
        1 => Ok(BigInt::from_biguint(Sign::Minus, magnitude)),
        other => Err(CodecError::invalid(
            "signed",
            0,
            format!("sign trit must be 0 or 1, found {}", other),
        )),
    }
}

pub(crate) fn push_signed(out: &mut Trits, value: &BigInt) {
    out.push((value.sign() == Sign::Minus) as u8);
    push_magnitude(out, value.magnitude());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsigned_known_vectors() {
        assert_eq!(&encode_u3(0).unwrap()[..], &[0]);
        assert_eq!(&encode_u3(1).unwrap()[..], &[1]);
        assert_eq!(&encode_u3(3).unwrap()[..], &[1, 0]);
        assert_eq!(&encode_u3(42).unwrap()[..], &[1, 1, 2, 0]);
        assert_eq!(decode_u3(&[1, 1, 2, 0]), Ok(BigInt::from(42)));
    }

    #[test]
    fn unsigned_rejects_negative() {
        let err = encode_u3(-5).unwrap_err();
        assert!(err.is_out_of_range());
        assert_eq!(err.code(), "ENCODE_OUT_OF_RANGE");
    }

    #[test]
    fn unsigned_rejects_non_canonical_digits() {
        assert!(decode_u3(&[]).is_err());
        assert!(decode_u3(&[0, 1]).is_err());
        assert_eq!(decode_u3(&[1, 3]).unwrap_err().position(), Some(1));
    }

    #[test]
    fn signed_known_vectors() {
        assert_eq!(&encode_s3(0).unwrap()[..], &[0, 0]);
        assert_eq!(&encode_s3(-42).unwrap()[..], &[1, 1, 1, 2, 0]);
        assert_eq!(decode_s3(&[1, 1, 1, 2, 0]), Ok(BigInt::from(-42)));
    }

    #[test]
    fn signed_rejects_bad_sign() {
        assert!(decode_s3(&[]).is_err());
        assert!(decode_s3(&[2, 1]).is_err());
        assert!(decode_s3(&[1, 0]).is_err());
    }

    #[test]
    fn roundtrip_range() {
        for n in -1000i64..=1000 {
            assert_eq!(decode_s3(&encode_s3(n).unwrap()), Ok(BigInt::from(n)));
            if n >= 0 {
                assert_eq!(decode_u3(&encode_u3(n).unwrap()), Ok(BigInt::from(n)));
            }
        }
    }

    #[test]
    fn roundtrip_beyond_64_bits() {
        let big: BigInt = BigInt::from(u64::MAX) * BigInt::from(u64::MAX) + 7;
        assert_eq!(decode_u3(&encode_u3(big.clone()).unwrap()), Ok(big.clone()));
        let negative = -big;
        assert_eq!(decode_s3(&encode_s3(negative.clone()).unwrap()), Ok(negative));
    }
}
