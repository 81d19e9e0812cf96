//! The extension-dictionary allocator.
//!
//! The allocator assigns combos to new words inside named extension
//! dictionaries, never shadowing the base vocabulary and never reusing a
//! combo. Free combos are handed out in a deterministic order (shorter first,
//! then by code point), so replaying the same allocations against the same
//! base vocabulary reproduces the same assignments.
//!
//! Every [`Allocator::allocate`] call for a dictionary id runs as one
//! transaction: the per-id writer lock and the store lock are held while the
//! persisted record is reloaded, extended and saved. The in-memory cache is
//! only updated once the save succeeded.
use std::{
    collections::{BTreeSet, HashMap},
    sync::Arc,
};

use forge_numerics::frame::Frame;
use log::{debug, info, warn};
use parking_lot::{Mutex, RwLock};
use strum::EnumIs;

use crate::{
    dictionary::{DictEntry, DictionaryId, ExtensionDictionary},
    store::{DictionaryStore, FileStore},
    update::make_dict_update_frame,
    utils::{
        conf::ForgeConfig,
        error::{DictError, DictResult},
    },
    vocab::{BaseVocabulary, combo_order, normalize_word},
};

/// Outcome of an allocation request.
#[derive(Debug, Clone, PartialEq, Eq, EnumIs)]
pub enum Allocation {
    /// A new combo was assigned and persisted.
    Assigned(String),
    /// The word already had this combo in the dictionary; nothing changed.
    Existing(String),
    /// The word belongs to the base vocabulary.
    AlreadyExists { base_combo: Option<String> },
    /// No free combo is left.
    Exhausted,
    /// The forced combo is not available. `holder` is the word of this
    /// dictionary holding it, if any.
    Conflict {
        combo: String,
        holder: Option<String>,
    },
}

impl Allocation {
    /// The combo now mapped to the word, for `Assigned` and `Existing`.
    pub fn combo(&self) -> Option<&str> {
        match self {
            Allocation::Assigned(combo) | Allocation::Existing(combo) => Some(combo),
            _ => None,
        }
    }
}

/// Free and allocated combos shared by every dictionary of an allocator.
#[derive(Debug)]
struct ComboPool {
    /// Combos not used by the base vocabulary, in allocation order.
    free: Vec<String>,
    /// Index before which every free combo is allocated.
    cursor: usize,
    allocated: BTreeSet<String>,
}

impl ComboPool {
    fn new(free: Vec<String>) -> Self {
        Self {
            free,
            cursor: 0,
            allocated: BTreeSet::new(),
        }
    }

    fn position(&self, combo: &str) -> Option<usize> {
        self.free
            .binary_search_by(|probe| combo_order(probe, combo))
            .ok()
    }

    fn is_available(&self, combo: &str) -> bool {
        self.position(combo).is_some() && !self.allocated.contains(combo)
    }

    fn mark<'a>(&mut self, combos: impl IntoIterator<Item = &'a str>) {
        for combo in combos {
            if !self.allocated.contains(combo) {
                self.allocated.insert(combo.to_string());
            }
        }
    }

    fn claim_next(&mut self) -> Option<String> {
        while let Some(combo) = self.free.get(self.cursor) {
            if !self.allocated.contains(combo) {
                let combo = combo.clone();
                self.allocated.insert(combo.clone());
                return Some(combo);
            }
            self.cursor += 1;
        }
        None
    }

    fn claim(&mut self, combo: &str) -> bool {
        self.is_available(combo) && self.allocated.insert(combo.to_string())
    }

    fn release(&mut self, combo: &str) {
        if self.allocated.remove(combo)
            && let Some(position) = self.position(combo)
        {
            self.cursor = self.cursor.min(position);
        }
    }

    fn free_count(&self) -> usize {
        let allocated_free = self
            .allocated
            .iter()
            .filter(|combo| self.position(combo).is_some())
            .count();
        self.free.len() - allocated_free
    }
}

pub struct Allocator {
    base: BaseVocabulary,
    store: Arc<dyn DictionaryStore>,
    pool: Mutex<ComboPool>,
    dictionaries: RwLock<HashMap<DictionaryId, Arc<ExtensionDictionary>>>,
    writers: Mutex<HashMap<DictionaryId, Arc<Mutex<()>>>>,
}

impl Allocator {
    /// Build an allocator over `store`. Every dictionary already persisted is
    /// loaded so that its combos are known to be taken.
    pub fn new(base: BaseVocabulary, store: Arc<dyn DictionaryStore>) -> DictResult<Self> {
        let allocator = Self {
            pool: Mutex::new(ComboPool::new(base.free_combos())),
            base,
            store,
            dictionaries: RwLock::new(HashMap::new()),
            writers: Mutex::new(HashMap::new()),
        };

        for id in allocator.store.ids()? {
            allocator.dictionary(&id)?;
        }
        info!(
            "Allocator ready: base vocabulary {}, {} dictionaries, {} free combos",
            allocator.base.version(),
            allocator.dictionaries.read().len(),
            allocator.free_count()
        );
        Ok(allocator)
    }

    /// Build a file-backed allocator from a configuration.
    pub fn from_config(conf: &ForgeConfig) -> DictResult<Self> {
        let base = BaseVocabulary::load(&conf.vocabulary)?;
        let store = FileStore::new(&conf.dictionary.store_dir);
        Self::new(base, Arc::new(store))
    }

    pub fn base(&self) -> &BaseVocabulary {
        &self.base
    }

    /// Number of combos that can still be assigned.
    pub fn free_count(&self) -> usize {
        self.pool.lock().free_count()
    }

    fn normalize(word: &str) -> DictResult<String> {
        normalize_word(word).ok_or_else(|| DictError::InvalidWord(word.to_string()))
    }

    fn writer(&self, id: &DictionaryId) -> Arc<Mutex<()>> {
        self.writers.lock().entry(id.clone()).or_default().clone()
    }

    /// Turn a persisted record into a dictionary, checking it against the
    /// base vocabulary. A missing record yields an empty dictionary.
    fn read_persisted(&self, id: &DictionaryId) -> DictResult<ExtensionDictionary> {
        let Some(record) = self.store.load(id)? else {
            return Ok(ExtensionDictionary::empty(id.clone()));
        };

        if let Some(version) = &record.base_version
            && !self.base.is_compatible(version)
        {
            return Err(DictError::IncompatibleBase {
                id: id.to_string(),
                found: version.clone(),
                expected: self.base.version().clone(),
            });
        }

        let dictionary = ExtensionDictionary::from_record(record)?;
        if let Some((word, _)) = dictionary.iter().find(|(word, _)| self.base.contains(word)) {
            warn!(
                "Dictionary '{}' shadows base word {:?}; base vocabulary wins on lookup",
                id, word
            );
        }
        Ok(dictionary)
    }

    /// Cached dictionary of `id`, loading it on first reference.
    fn dictionary(&self, id: &DictionaryId) -> DictResult<Arc<ExtensionDictionary>> {
        if let Some(dictionary) = self.dictionaries.read().get(id) {
            return Ok(dictionary.clone());
        }

        let dictionary = Arc::new(self.read_persisted(id)?);
        self.pool.lock().mark(dictionary.combos());
        debug!(
            "Loaded dictionary '{}' with {} entries",
            id,
            dictionary.len()
        );

        Ok(self
            .dictionaries
            .write()
            .entry(id.clone())
            .or_insert(dictionary)
            .clone())
    }

    /// Assign a combo to `word` in dictionary `id`.
    ///
    /// The word is trimmed and case-folded first. With `force_combo`, only
    /// that combo is considered, and it must be free, unused by the base
    /// vocabulary and not yet allocated.
    ///
    /// Soft outcomes ([`Allocation::AlreadyExists`], [`Allocation::Exhausted`],
    /// [`Allocation::Conflict`]) are returned as values; errors are reserved
    /// for invalid words and storage failures.
    pub fn allocate(
        &self,
        word: &str,
        id: &DictionaryId,
        force_combo: Option<&str>,
    ) -> DictResult<Allocation> {
        let word = Self::normalize(word)?;
        if self.base.contains(&word) {
            debug!("Refusing to allocate base word {:?} in '{}'", word, id);
            return Ok(Allocation::AlreadyExists {
                base_combo: self.base.combo_of(&word).map(str::to_string),
            });
        }

        let writer = self.writer(id);
        let _writer = writer.lock();
        let _lock = self.store.lock(id)?;

        // Another process may have written since the cache was filled.
        let mut dictionary = self.read_persisted(id)?;
        self.pool.lock().mark(dictionary.combos());

        if let Some(combo) = dictionary.combo_of(&word) {
            let combo = combo.to_string();
            self.dictionaries
                .write()
                .insert(id.clone(), Arc::new(dictionary));
            return Ok(Allocation::Existing(combo));
        }

        let combo = match force_combo.map(str::trim) {
            Some(forced) => {
                if !self.pool.lock().claim(forced) {
                    let holder = dictionary.word_of(forced).map(str::to_string);
                    debug!(
                        "Forced combo {:?} for {:?} in '{}' is not available",
                        forced, word, id
                    );
                    return Ok(Allocation::Conflict {
                        combo: forced.to_string(),
                        holder,
                    });
                }
                forced.to_string()
            }
            None => match self.pool.lock().claim_next() {
                Some(combo) => combo,
                None => {
                    warn!("No free combo left for {:?} in '{}'", word, id);
                    return Ok(Allocation::Exhausted);
                }
            },
        };

        dictionary.insert(word.clone(), combo.clone());
        let record = dictionary.to_record(Some(self.base.version().clone()));
        if let Err(e) = self.store.save(&record) {
            self.pool.lock().release(&combo);
            warn!(
                "Failed to persist dictionary '{}', released combo {:?}: {}",
                id, combo, e
            );
            return Err(e);
        }

        self.dictionaries
            .write()
            .insert(id.clone(), Arc::new(dictionary));
        info!("Allocated {:?} -> {:?} in '{}'", word, combo, id);
        Ok(Allocation::Assigned(combo))
    }

    /// Combo of `word`, from the base vocabulary first, then from dictionary `id`.
    pub fn lookup_word(&self, word: &str, id: &DictionaryId) -> DictResult<Option<String>> {
        let word = Self::normalize(word)?;
        if let Some(combo) = self.base.combo_of(&word) {
            return Ok(Some(combo.to_string()));
        }
        Ok(self.dictionary(id)?.combo_of(&word).map(str::to_string))
    }

    /// Word of `combo`, from the base vocabulary first, then from dictionary `id`.
    pub fn lookup_combo(&self, combo: &str, id: &DictionaryId) -> DictResult<Option<String>> {
        let combo = combo.trim();
        if let Some(word) = self.base.word_of(combo) {
            return Ok(Some(word.to_string()));
        }
        Ok(self.dictionary(id)?.word_of(combo).map(str::to_string))
    }

    /// All entries of dictionary `id`, ordered by word.
    pub fn get_entries(&self, id: &DictionaryId) -> DictResult<Vec<DictEntry>> {
        Ok(self.dictionary(id)?.entries())
    }

    /// Dictionary update frame describing every entry of dictionary `id`.
    pub fn dict_update_frame(&self, id: &DictionaryId) -> DictResult<Frame> {
        Ok(make_dict_update_frame(id, &self.get_entries(id)?))
    }
}
