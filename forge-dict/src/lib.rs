//! Extension dictionaries for ForgeNumerics-S.
//!
//! The base vocabulary maps a fixed set of words to short symbol
//! combinations ("combos"). Words outside of it get a combo from the
//! [`Allocator`], which records the assignment in a named extension
//! dictionary persisted by a [`DictionaryStore`]. Batches of assignments are
//! exchanged as `DICT_UPDATE` frames (see [`update`]).

pub mod allocator;
pub mod dictionary;
pub mod magic;
pub mod store;
pub mod update;
pub mod utils;
pub mod vocab;

pub use allocator::{Allocation, Allocator};
pub use dictionary::{DictEntry, DictionaryId, DictionaryRecord, ExtensionDictionary};
pub use store::{DictionaryStore, FileStore, MemoryStore};
pub use update::{make_dict_update_frame, parse_dict_update_frame};
pub use utils::{
    conf::ForgeConfig,
    error::{DictError, DictResult},
};
pub use vocab::{BaseVocabulary, ComboSpace};

pub extern crate chrono;
