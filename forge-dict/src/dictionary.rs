//! Extension dictionaries and their persisted form.
use std::{collections::BTreeMap, fmt, str::FromStr};

use chrono::{DateTime, Utc};
use semver::Version;
use serde::{Deserialize, Serialize};

use crate::{
    magic::MAX_DICTIONARY_ID_LEN,
    utils::error::{DictError, DictResult},
};

/// Name of an extension dictionary. Also used as a file stem, so it is
/// restricted to `[A-Za-z0-9_.-]` and may not start with a dot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DictionaryId(String);

impl DictionaryId {
    pub fn new(id: impl Into<String>) -> DictResult<Self> {
        let id = id.into();
        let valid = !id.is_empty()
            && id.len() <= MAX_DICTIONARY_ID_LEN
            && !id.starts_with('.')
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
        if valid {
            Ok(Self(id))
        } else {
            Err(DictError::InvalidDictionaryId(id))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DictionaryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for DictionaryId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for DictionaryId {
    type Err = DictError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for DictionaryId {
    type Error = DictError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<DictionaryId> for String {
    fn from(value: DictionaryId) -> Self {
        value.0
    }
}

/// One assignment as carried by dictionary update frames.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DictEntry {
    pub word: String,
    pub combo: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub freq: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl DictEntry {
    pub fn new(word: impl Into<String>, combo: impl Into<String>) -> Self {
        Self {
            word: word.into(),
            combo: combo.into(),
            freq: None,
            source: None,
        }
    }

    pub fn with_freq(mut self, freq: u64) -> Self {
        self.freq = Some(freq);
        self
    }

    /// An empty source is the same as no source.
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        let source = source.into();
        self.source = (!source.is_empty()).then_some(source);
        self
    }
}

/// On-disk form of an extension dictionary.
///
/// Both halves of the mapping are stored. A record missing either half fails
/// to deserialize, and [`ExtensionDictionary::from_record`] rejects halves
/// that are not inverse of each other.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DictionaryRecord {
    pub id: DictionaryId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_version: Option<Version>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    pub word_to_combo: BTreeMap<String, String>,
    pub combo_to_word: BTreeMap<String, String>,
}

/// A conflict-free word to combo mapping layered on the base vocabulary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionDictionary {
    id: DictionaryId,
    word_to_combo: BTreeMap<String, String>,
    combo_to_word: BTreeMap<String, String>,
}

impl ExtensionDictionary {
    pub fn empty(id: DictionaryId) -> Self {
        Self {
            id,
            word_to_combo: BTreeMap::new(),
            combo_to_word: BTreeMap::new(),
        }
    }

    /// Rebuild a dictionary from its record, checking that both halves
    /// describe the same bijection.
    pub fn from_record(record: DictionaryRecord) -> DictResult<Self> {
        let corrupt = |reason: String| DictError::CorruptDictionary {
            id: record.id.to_string(),
            reason,
        };

        if record.word_to_combo.len() != record.combo_to_word.len() {
            return Err(corrupt(format!(
                "word_to_combo holds {} entries but combo_to_word holds {}",
                record.word_to_combo.len(),
                record.combo_to_word.len()
            )));
        }
        if let Some((word, combo)) = record
            .word_to_combo
            .iter()
            .find(|(word, combo)| record.combo_to_word.get(*combo) != Some(*word))
        {
            return Err(corrupt(format!(
                "word {:?} maps to combo {:?}, which does not map back to it",
                word, combo
            )));
        }

        Ok(Self {
            id: record.id,
            word_to_combo: record.word_to_combo,
            combo_to_word: record.combo_to_word,
        })
    }

    pub fn to_record(&self, base_version: Option<Version>) -> DictionaryRecord {
        DictionaryRecord {
            id: self.id.clone(),
            base_version,
            updated_at: Some(Utc::now()),
            word_to_combo: self.word_to_combo.clone(),
            combo_to_word: self.combo_to_word.clone(),
        }
    }

    pub fn id(&self) -> &DictionaryId {
        &self.id
    }

    pub fn combo_of(&self, word: &str) -> Option<&str> {
        self.word_to_combo.get(word).map(String::as_str)
    }

    pub fn word_of(&self, combo: &str) -> Option<&str> {
        self.combo_to_word.get(combo).map(String::as_str)
    }

    /// Record a new pair. Callers check that neither side is taken.
    pub(crate) fn insert(&mut self, word: String, combo: String) {
        debug_assert!(!self.word_to_combo.contains_key(&word));
        debug_assert!(!self.combo_to_word.contains_key(&combo));
        self.combo_to_word.insert(combo.clone(), word.clone());
        self.word_to_combo.insert(word, combo);
    }

    /// `(word, combo)` pairs ordered by word.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.word_to_combo
            .iter()
            .map(|(word, combo)| (word.as_str(), combo.as_str()))
    }

    pub fn combos(&self) -> impl Iterator<Item = &str> {
        self.combo_to_word.keys().map(String::as_str)
    }

    pub fn entries(&self) -> Vec<DictEntry> {
        self.iter()
            .map(|(word, combo)| DictEntry::new(word, combo))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.word_to_combo.len()
    }

    pub fn is_empty(&self) -> bool {
        self.word_to_combo.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> DictionaryId {
        DictionaryId::new(s).unwrap()
    }

    #[test]
    fn id_validation() {
        assert!(DictionaryId::new("medical-v2.1_en").is_ok());
        for bad in ["", ".hidden", "a/b", "../x", "with space", "ünï"] {
            assert!(
                DictionaryId::new(bad).unwrap_err().is_invalid_dictionary_id(),
                "{:?} should be rejected",
                bad
            );
        }
        assert!(DictionaryId::new("x".repeat(MAX_DICTIONARY_ID_LEN + 1)).is_err());
    }

    #[test]
    fn record_roundtrip() {
        let mut dict = ExtensionDictionary::empty(id("ext"));
        dict.insert("word".into(), "c".into());
        dict.insert("other".into(), "aa".into());

        let record = dict.to_record(Some(Version::new(1, 2, 3)));
        let json = serde_json::to_string(&record).unwrap();
        let back: DictionaryRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, record);
        assert_eq!(ExtensionDictionary::from_record(back).unwrap(), dict);
    }

    #[test]
    fn rejects_missing_half() {
        let json = r#"{"id": "ext", "word_to_combo": {"w": "c"}}"#;
        assert!(serde_json::from_str::<DictionaryRecord>(json).is_err());
    }

    #[test]
    fn rejects_invalid_id_in_record() {
        let json = r#"{"id": "../ext", "word_to_combo": {}, "combo_to_word": {}}"#;
        assert!(serde_json::from_str::<DictionaryRecord>(json).is_err());
    }

    #[test]
    fn rejects_inconsistent_halves() {
        let record = DictionaryRecord {
            id: id("ext"),
            base_version: None,
            updated_at: None,
            word_to_combo: BTreeMap::from([("w".to_string(), "c".to_string())]),
            combo_to_word: BTreeMap::from([("c".to_string(), "v".to_string())]),
        };
        let err = ExtensionDictionary::from_record(record).unwrap_err();
        assert!(err.is_corrupt_dictionary());

        let record = DictionaryRecord {
            id: id("ext"),
            base_version: None,
            updated_at: None,
            word_to_combo: BTreeMap::new(),
            combo_to_word: BTreeMap::from([("c".to_string(), "v".to_string())]),
        };
        assert!(ExtensionDictionary::from_record(record).is_err());
    }
}
