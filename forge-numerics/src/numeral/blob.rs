//! Binary blob profile.
//!
//! Every byte maps to exactly four base-4 digits (`4^4 = 256`), most
//! significant first, using all four trit glyphs. The mapping is a bijection
//! between byte strings and digit strings whose length is a multiple of four,
//! so externally compressed data passes through the symbolic channel intact.
use sha2::{Digest, Sha256};

use crate::{
    numeral::Trits,
    utils::{CodecError, CodecResult},
};

pub const DIGITS_PER_BYTE: usize = 4;

/// Number of digest bytes appended by [`encode_blob_checked`].
pub const CHECKSUM_LEN: usize = 4;

/// The four base-4 digits of one byte.
#[inline]
pub const fn byte_digits(byte: u8) -> [u8; DIGITS_PER_BYTE] {
    [byte >> 6, (byte >> 4) & 3, (byte >> 2) & 3, byte & 3]
}

/// Iterate over the digits of `bytes` without allocating.
pub fn blob_digits(bytes: &[u8]) -> impl Iterator<Item = u8> + '_ {
    bytes.iter().flat_map(|byte| byte_digits(*byte))
}

/// Encode bytes as base-4 digits. The empty blob encodes to no digits.
pub fn encode_blob(bytes: &[u8]) -> Trits {
    let mut out = Trits::with_capacity(bytes.len() * DIGITS_PER_BYTE);
    out.extend(blob_digits(bytes));
    out
}

/// Decode digits produced by [`encode_blob`].
pub fn decode_blob(digits: &[u8]) -> CodecResult<Vec<u8>> {
    if digits.len() % DIGITS_PER_BYTE != 0 {
        return Err(CodecError::invalid(
            "blob",
            digits.len() - digits.len() % DIGITS_PER_BYTE,
            format!(
                "blob digit count {} is not a multiple of {}",
                digits.len(),
                DIGITS_PER_BYTE
            ),
        ));
    }

    digits
        .chunks_exact(DIGITS_PER_BYTE)
        .enumerate()
        .map(|(index, chunk)| {
            chunk.iter().enumerate().try_fold(0u8, |acc, (i, digit)| {
                if *digit > 3 {
                    Err(CodecError::invalid(
                        "blob",
                        index * DIGITS_PER_BYTE + i,
                        format!("digit {} is outside the blob alphabet", digit),
                    ))
                } else {
                    Ok((acc << 2) | digit)
                }
            })
        })
        .collect()
}

fn checksum(bytes: &[u8]) -> [u8; CHECKSUM_LEN] {
    let digest = Sha256::digest(bytes);
    let mut out = [0u8; CHECKSUM_LEN];
    out.copy_from_slice(&digest[..CHECKSUM_LEN]);
    out
}

/// Encode bytes followed by the first four bytes of their SHA-256 digest.
pub fn encode_blob_checked(bytes: &[u8]) -> Trits {
    let mut out = Trits::with_capacity((bytes.len() + CHECKSUM_LEN) * DIGITS_PER_BYTE);
    out.extend(blob_digits(bytes));
    out.extend(blob_digits(&checksum(bytes)));
    out
}

/// Decode digits produced by [`encode_blob_checked`], verifying the digest.
pub fn decode_blob_checked(digits: &[u8]) -> CodecResult<Vec<u8>> {
    let mut bytes = decode_blob(digits)?;
    if bytes.len() < CHECKSUM_LEN {
        return Err(CodecError::invalid(
            "checked blob",
            digits.len(),
            "checked blob is shorter than its checksum",
        ));
    }

    let found = bytes.split_off(bytes.len() - CHECKSUM_LEN);
    let expected = checksum(&bytes);
    if found != expected {
        return Err(CodecError::ChecksumMismatch {
            expected: hex::encode(expected),
            found: hex::encode(&found),
        });
    }
    Ok(bytes)
}
