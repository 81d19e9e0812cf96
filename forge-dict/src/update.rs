//! Dictionary update frames.
//!
//! A batch of assignments travels as an auditable frame:
//!
//! ```text
//! ≛[TYPE][DICT_UPDATE]⁝[DICT][<id>]⁝[COUNT]<unsigned>⁝[CHECKSUM]<blob>⁝⦙
//!   [word]⋅[combo]⋅<freq or []>⋅[source or []]⋅ ... ∎
//! ```
//!
//! `CHECKSUM` holds the first eight bytes of the SHA-256 digest of the
//! entries, so a receiver can detect entries dropped or altered in transit.
//!
//! A missing frequency or source is written as the empty literal `[]`, so an
//! empty source reads back as `None`.
use forge_numerics::{
    ForgeError,
    frame::{
        Frame, TYPE_KEY, Token,
        schema::{FieldSchema, FrameSchema, PayloadSchema, ProfileSet, ValueKind},
    },
    numeral::NumeralToken,
    utils::{CodecError, ValidateError},
};
use num_bigint::BigUint;
use sha2::{Digest, Sha256};

use crate::{
    dictionary::{DictEntry, DictionaryId},
    magic::{
        CHECKSUM_BYTES, CHECKSUM_HEADER_KEY, COUNT_HEADER_KEY, DICT_HEADER_KEY, DICT_UPDATE_TYPE,
        ENTRY_ARITY,
    },
    utils::error::DictResult,
};

const UNIT_SEP: u8 = 0x1F;
const RECORD_SEP: u8 = 0x1E;

/// First bytes of the SHA-256 digest over the entries, each rendered as
/// `word US combo US freq US source RS`.
pub fn entries_checksum(entries: &[DictEntry]) -> Vec<u8> {
    let mut hasher = Sha256::new();
    for entry in entries {
        hasher.update(entry.word.as_bytes());
        hasher.update([UNIT_SEP]);
        hasher.update(entry.combo.as_bytes());
        hasher.update([UNIT_SEP]);
        if let Some(freq) = entry.freq {
            hasher.update(freq.to_string().as_bytes());
        }
        hasher.update([UNIT_SEP]);
        if let Some(source) = &entry.source {
            hasher.update(source.as_bytes());
        }
        hasher.update([RECORD_SEP]);
    }
    hasher.finalize()[..CHECKSUM_BYTES].to_vec()
}

/// Schema every dictionary update frame satisfies.
pub fn dict_update_schema() -> FrameSchema {
    FrameSchema::for_type(DICT_UPDATE_TYPE)
        .field(FieldSchema::new(DICT_HEADER_KEY, ValueKind::Literal).required())
        .field(
            FieldSchema::new(COUNT_HEADER_KEY, ValueKind::Numeral(ProfileSet::UNSIGNED)).required(),
        )
        .field(FieldSchema::new(CHECKSUM_HEADER_KEY, ValueKind::Numeral(ProfileSet::BLOB)).required())
        .payload(PayloadSchema {
            literals: true,
            profiles: ProfileSet::UNSIGNED,
            min_len: None,
            max_len: None,
            arity: Some(ENTRY_ARITY),
        })
}

/// Render a batch of assignments into dictionary `id` as a frame.
pub fn make_dict_update_frame(id: &DictionaryId, entries: &[DictEntry]) -> Frame {
    let mut frame = Frame::new()
        .with_header(TYPE_KEY, DICT_UPDATE_TYPE)
        .with_header(DICT_HEADER_KEY, id.as_str())
        .with_header(COUNT_HEADER_KEY, NumeralToken::from(entries.len() as u64))
        .with_header(
            CHECKSUM_HEADER_KEY,
            NumeralToken::Blob(entries_checksum(entries)),
        );

    for entry in entries {
        frame.push_payload(entry.word.as_str());
        frame.push_payload(entry.combo.as_str());
        frame.push_payload(match entry.freq {
            Some(freq) => Token::Numeral(NumeralToken::from(freq)),
            None => Token::literal(""),
        });
        frame.push_payload(entry.source.clone().unwrap_or_default());
    }
    frame
}

fn mismatch(reason: impl Into<String>) -> ForgeError {
    ValidateError::SchemaMismatch {
        reason: reason.into(),
    }
    .into()
}

fn literal(token: &Token, what: &str, index: usize) -> Result<String, ForgeError> {
    token.as_str().map(str::to_string).ok_or_else(|| {
        ValidateError::TypeMismatch {
            location: format!("{} of entry {}", what, index),
            expected: "a literal".to_string(),
            found: token.kind_name(),
        }
        .into()
    })
}

fn freq(token: &Token, index: usize) -> Result<Option<u64>, ForgeError> {
    match token {
        Token::Literal(text) if text.is_empty() => Ok(None),
        Token::Numeral(NumeralToken::Unsigned(n)) => u64::try_from(n)
            .map(Some)
            .map_err(|_| mismatch(format!("frequency of entry {} does not fit in 64 bits", index))),
        other => Err(ValidateError::TypeMismatch {
            location: format!("frequency of entry {}", index),
            expected: "an unsigned numeral or `[]`".to_string(),
            found: other.kind_name(),
        }
        .into()),
    }
}

/// Read a dictionary update frame back, checking its shape, its `COUNT` and
/// its `CHECKSUM`.
pub fn parse_dict_update_frame(frame: &Frame) -> DictResult<(DictionaryId, Vec<DictEntry>)> {
    dict_update_schema()
        .validate(frame)
        .map_err(ForgeError::from)?;

    let id = frame
        .header_value(DICT_HEADER_KEY)
        .and_then(Token::as_str)
        .unwrap_or_default();
    let id = DictionaryId::new(id)?;

    let entries = frame
        .payload
        .chunks_exact(ENTRY_ARITY)
        .enumerate()
        .map(|(index, chunk)| {
            let source = literal(&chunk[3], "source", index)?;
            Ok(DictEntry {
                word: literal(&chunk[0], "word", index)?,
                combo: literal(&chunk[1], "combo", index)?,
                freq: freq(&chunk[2], index)?,
                source: (!source.is_empty()).then_some(source),
            })
        })
        .collect::<Result<Vec<_>, ForgeError>>()?;

    let count = match frame.header_value(COUNT_HEADER_KEY) {
        Some(Token::Numeral(NumeralToken::Unsigned(count))) => count.clone(),
        _ => BigUint::default(),
    };
    if count != BigUint::from(entries.len()) {
        return Err(mismatch(format!(
            "COUNT is {} but the payload holds {} entries",
            count,
            entries.len()
        ))
        .into());
    }

    let found: &[u8] = match frame.header_value(CHECKSUM_HEADER_KEY) {
        Some(Token::Numeral(NumeralToken::Blob(bytes))) => bytes.as_slice(),
        _ => &[],
    };
    let expected = entries_checksum(&entries);
    if found != expected.as_slice() {
        return Err(ForgeError::from(CodecError::ChecksumMismatch {
            expected: hex::encode(&expected),
            found: hex::encode(found),
        })
        .into());
    }

    Ok((id, entries))
}
