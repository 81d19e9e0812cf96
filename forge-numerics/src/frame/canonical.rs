//! Canonical frame rendering.
//!
//! Canonical form is the serialization of a frame whose literals have been
//! trimmed and whose header pairs are sorted by the wire rendering of their
//! keys. Numerals are already canonical once decoded (the decoders reject
//! leading zeros, negative zero and unnormalized floats), so they pass
//! through unchanged. Two frames that differ only in header order,
//! whitespace or optional separators canonicalize to the same string.
use log::trace;

use crate::{
    frame::{Frame, Token, parse},
    utils::CanonicalizeError,
};

fn trim_token(token: Token) -> Token {
    match token {
        Token::Literal(text) if text.trim() != text => Token::Literal(text.trim().to_string()),
        other => other,
    }
}

/// Normalize an already-built frame.
///
/// Fails with `NormalizationFailed` when a literal header key is empty after
/// trimming, and with `AmbiguousFormat` when two header pairs share a key.
pub fn canonical_frame(frame: Frame) -> Result<Frame, CanonicalizeError> {
    let mut header: Vec<(String, Token, Token)> = Vec::with_capacity(frame.header.len());
    for (key, value) in frame.header {
        let key = trim_token(key);
        if key.as_str().is_some_and(str::is_empty) {
            return Err(CanonicalizeError::NormalizationFailed {
                reason: "header key is empty after trimming".to_string(),
            });
        }
        header.push((key.to_string(), key, trim_token(value)));
    }

    header.sort_by(|a, b| a.0.cmp(&b.0));
    if let Some(pair) = header.windows(2).find(|pair| pair[0].0 == pair[1].0) {
        return Err(CanonicalizeError::AmbiguousFormat {
            key: pair[0].0.clone(),
        });
    }

    Ok(Frame {
        header: header.into_iter().map(|(_, k, v)| (k, v)).collect(),
        payload: frame.payload.into_iter().map(trim_token).collect(),
    })
}

/// Parse `text` and return its canonical serialization.
///
/// Idempotent: `canonicalize(canonicalize(s)?) == canonicalize(s)`.
pub fn canonicalize(text: &str) -> Result<String, CanonicalizeError> {
    let frame = canonical_frame(parse(text)?)?;
    let out = frame.to_string();
    trace!("canonicalized frame into {} bytes", out.len());
    Ok(out)
}

/// Whether `text` (ignoring surrounding whitespace) is already canonical.
pub fn is_canonical(text: &str) -> bool {
    canonicalize(text).is_ok_and(|canonical| canonical == text.trim())
}
