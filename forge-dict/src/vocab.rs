//! Base vocabulary and the combo space.
//!
//! The base vocabulary is the fixed, externally supplied dictionary every
//! extension dictionary is layered on: a word list, the full list of known
//! combos and the word to combo mapping, tagged with a version. It is loaded
//! once and never mutated.
use std::{
    cmp::Ordering,
    collections::{BTreeMap, HashMap, HashSet},
    path::Path,
};

use either::Either;
use log::{debug, warn};
use semver::Version;

use crate::utils::{
    conf::VocabularyConf,
    error::{DictError, DictResult},
};

/// Case-fold and trim a word. Returns `None` when nothing is left.
pub fn normalize_word(word: &str) -> Option<String> {
    let word = word.trim().to_lowercase();
    (!word.is_empty()).then_some(word)
}

/// Allocation order of combos: shorter first, then by code point.
pub fn combo_order(a: &str, b: &str) -> Ordering {
    a.chars()
        .count()
        .cmp(&b.chars().count())
        .then_with(|| a.cmp(b))
}

/// Every string over an alphabet with a length in `min_len..=max_len`,
/// produced in [`combo_order`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComboSpace {
    alphabet: Vec<char>,
    min_len: usize,
    max_len: usize,
}

impl ComboSpace {
    /// The alphabet is sorted and deduplicated so the output follows
    /// [`combo_order`] whatever order the symbols are given in.
    pub fn new(alphabet: impl IntoIterator<Item = char>, min_len: usize, max_len: usize) -> Self {
        let mut alphabet: Vec<char> = alphabet.into_iter().collect();
        alphabet.sort_unstable();
        alphabet.dedup();
        Self {
            alphabet,
            min_len: min_len.max(1),
            max_len,
        }
    }

    /// Collect the whole space.
    pub fn enumerate(
        alphabet: impl IntoIterator<Item = char>,
        min_len: usize,
        max_len: usize,
    ) -> Vec<String> {
        Self::new(alphabet, min_len, max_len).iter().collect()
    }

    /// Number of combos in the space, saturating at `usize::MAX`.
    pub fn len(&self) -> usize {
        (self.min_len..=self.max_len)
            .map(|len| {
                u32::try_from(len)
                    .ok()
                    .and_then(|len| self.alphabet.len().checked_pow(len))
                    .unwrap_or(usize::MAX)
            })
            .fold(0usize, usize::saturating_add)
    }

    pub fn is_empty(&self) -> bool {
        self.alphabet.is_empty() || self.min_len > self.max_len
    }

    pub fn iter(&self) -> impl Iterator<Item = String> + '_ {
        if self.is_empty() {
            return Either::Left(std::iter::empty());
        }

        let mut digits = vec![0usize; self.min_len];
        let mut exhausted = false;
        Either::Right(std::iter::from_fn(move || {
            if exhausted {
                return None;
            }
            let combo: String = digits.iter().map(|d| self.alphabet[*d]).collect();

            // odometer step; grow the length once every position wrapped
            let mut position = digits.len();
            loop {
                if position == 0 {
                    if digits.len() == self.max_len {
                        exhausted = true;
                    } else {
                        digits = vec![0; digits.len() + 1];
                    }
                    break;
                }
                position -= 1;
                digits[position] += 1;
                if digits[position] < self.alphabet.len() {
                    break;
                }
                digits[position] = 0;
            }
            Some(combo)
        }))
    }
}

/// The fixed base dictionary.
#[derive(Debug, Clone)]
pub struct BaseVocabulary {
    version: Version,
    words: HashSet<String>,
    combos: Vec<String>,
    word_to_combo: HashMap<String, String>,
    combo_to_word: HashMap<String, String>,
}

impl BaseVocabulary {
    /// Build a vocabulary from in-memory lists. Words are normalized; mapped
    /// words missing from `words` are added; combos are deduplicated and kept
    /// in [`combo_order`].
    pub fn new<W, C, M>(version: Version, words: W, combos: C, mapping: M) -> Self
    where
        W: IntoIterator,
        W::Item: AsRef<str>,
        C: IntoIterator,
        C::Item: Into<String>,
        M: IntoIterator<Item = (String, String)>,
    {
        let mut word_set: HashSet<String> = words
            .into_iter()
            .filter_map(|w| normalize_word(w.as_ref()))
            .collect();

        let mut word_to_combo = HashMap::new();
        let mut combo_to_word = HashMap::new();
        for (word, combo) in mapping {
            let Some(word) = normalize_word(&word) else {
                warn!("Skipping base mapping entry with an empty word (combo {:?})", combo);
                continue;
            };
            if let Some(previous) = combo_to_word.get(&combo) {
                warn!(
                    "Base combo {:?} is mapped to both {:?} and {:?}; keeping the first",
                    combo, previous, word
                );
                continue;
            }
            word_set.insert(word.clone());
            combo_to_word.insert(combo.clone(), word.clone());
            word_to_combo.insert(word, combo);
        }

        let mut combos: Vec<String> = combos.into_iter().map(Into::into).collect();
        combos.sort_by(|a, b| combo_order(a, b));
        combos.dedup();

        debug!(
            "Base vocabulary {}: {} words, {} combos, {} mapped",
            version,
            word_set.len(),
            combos.len(),
            word_to_combo.len()
        );
        Self {
            version,
            words: word_set,
            combos,
            word_to_combo,
            combo_to_word,
        }
    }

    /// Load the source lists named by a configuration section.
    ///
    /// `words` and `combos` are plain text files with one entry per line
    /// (blank lines and lines starting with `#` are skipped); `mapping` is a
    /// JSON object from word to combo.
    pub fn load(conf: &VocabularyConf) -> DictResult<Self> {
        let words = read_lines(&conf.words)?;
        let combos = read_lines(&conf.combos)?;
        let mapping: BTreeMap<String, String> =
            serde_json::from_str(&std::fs::read_to_string(&conf.mapping)?)?;
        Ok(Self::new(conf.version.clone(), words, combos, mapping))
    }

    pub fn version(&self) -> &Version {
        &self.version
    }

    /// Whether a persisted dictionary written against `version` may be used.
    pub fn is_compatible(&self, version: &Version) -> bool {
        version.major == self.version.major
    }

    /// Whether the normalized `word` belongs to the base vocabulary.
    pub fn contains(&self, word: &str) -> bool {
        self.words.contains(word)
    }

    /// Base combo of the normalized `word`.
    pub fn combo_of(&self, word: &str) -> Option<&str> {
        self.word_to_combo.get(word).map(String::as_str)
    }

    pub fn word_of(&self, combo: &str) -> Option<&str> {
        self.combo_to_word.get(combo).map(String::as_str)
    }

    pub fn word_count(&self) -> usize {
        self.words.len()
    }

    /// All known combos in allocation order.
    pub fn combos(&self) -> &[String] {
        &self.combos
    }

    /// Known combos not used by the base mapping, in allocation order.
    pub fn free_combos(&self) -> Vec<String> {
        self.combos
            .iter()
            .filter(|combo| !self.combo_to_word.contains_key(*combo))
            .cloned()
            .collect()
    }
}

fn read_lines(path: &Path) -> DictResult<Vec<String>> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        warn!("Failed to read vocabulary list {}: {}", path.display(), e);
        DictError::Io(e)
    })?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect())
}
