use std::{collections::HashSet, sync::Arc, thread};

use forge_dict::{
    Allocation, Allocator, BaseVocabulary, ComboSpace, DictEntry, DictionaryId, DictionaryStore,
    FileStore, ForgeConfig, MemoryStore, parse_dict_update_frame,
};
use forge_numerics::frame::{parse, serialize};
use semver::Version;

fn base(version: Version, alphabet: &[char], max_len: usize) -> BaseVocabulary {
    BaseVocabulary::new(
        version,
        ["alpha", "beta", "gamma"],
        ComboSpace::enumerate(alphabet.iter().copied(), 1, max_len),
        [
            ("alpha".to_string(), "a".to_string()),
            ("beta".to_string(), "b".to_string()),
        ],
    )
}

fn small_base() -> BaseVocabulary {
    base(Version::new(1, 0, 0), &['a', 'b', 'c'], 2)
}

fn id(name: &str) -> DictionaryId {
    DictionaryId::new(name).unwrap()
}

fn memory_allocator() -> Allocator {
    Allocator::new(small_base(), Arc::new(MemoryStore::new())).unwrap()
}

#[test]
fn allocation_is_case_insensitive_and_stable() {
    let allocator = memory_allocator();
    let ext = id("ext");

    assert_eq!(
        allocator.allocate("Word", &ext, None).unwrap(),
        Allocation::Assigned("c".into())
    );
    assert_eq!(
        allocator.allocate("  word ", &ext, None).unwrap(),
        Allocation::Existing("c".into())
    );
    assert_eq!(
        allocator.allocate("other", &ext, None).unwrap(),
        Allocation::Assigned("aa".into())
    );

    assert_eq!(allocator.lookup_word("WORD", &ext).unwrap().as_deref(), Some("c"));
    assert_eq!(allocator.lookup_combo("aa", &ext).unwrap().as_deref(), Some("other"));
    assert_eq!(allocator.lookup_word("missing", &ext).unwrap(), None);
}

#[test]
fn base_words_are_never_allocated() {
    let allocator = memory_allocator();
    let ext = id("ext");

    assert_eq!(
        allocator.allocate("Alpha", &ext, None).unwrap(),
        Allocation::AlreadyExists {
            base_combo: Some("a".into())
        }
    );
    // listed in the base words without a combo
    assert_eq!(
        allocator.allocate("gamma", &ext, None).unwrap(),
        Allocation::AlreadyExists { base_combo: None }
    );
    assert!(allocator.get_entries(&ext).unwrap().is_empty());

    assert_eq!(allocator.lookup_word("alpha", &ext).unwrap().as_deref(), Some("a"));
    assert_eq!(allocator.lookup_combo("b", &ext).unwrap().as_deref(), Some("beta"));
}

#[test]
fn invalid_words_are_errors() {
    let allocator = memory_allocator();
    let err = allocator.allocate("   ", &id("ext"), None).unwrap_err();
    assert!(err.is_invalid_word());
}

#[test]
fn forced_combos() {
    let allocator = memory_allocator();
    let ext = id("ext");

    assert_eq!(
        allocator.allocate("one", &ext, Some("ab")).unwrap(),
        Allocation::Assigned("ab".into())
    );
    assert_eq!(
        allocator.allocate("two", &ext, Some("ab")).unwrap(),
        Allocation::Conflict {
            combo: "ab".into(),
            holder: Some("one".into())
        }
    );
    // used by the base vocabulary
    assert_eq!(
        allocator.allocate("two", &ext, Some("a")).unwrap(),
        Allocation::Conflict {
            combo: "a".into(),
            holder: None
        }
    );
    // outside the combo space
    assert!(allocator.allocate("two", &ext, Some("zzz")).unwrap().is_conflict());

    // the next free combo skips the forced one
    assert_eq!(
        allocator.allocate("two", &ext, None).unwrap(),
        Allocation::Assigned("c".into())
    );
}

#[test]
fn combos_are_unique_across_dictionaries() {
    let allocator = memory_allocator();
    let first = allocator.allocate("word", &id("first"), None).unwrap();
    let second = allocator.allocate("word", &id("second"), None).unwrap();
    assert_eq!(first, Allocation::Assigned("c".into()));
    assert_eq!(second, Allocation::Assigned("aa".into()));

    assert_eq!(
        allocator.allocate("else", &id("second"), Some("c")).unwrap(),
        Allocation::Conflict {
            combo: "c".into(),
            holder: None
        }
    );
}

#[test]
fn exhaustion() {
    let base = BaseVocabulary::new(
        Version::new(1, 0, 0),
        Vec::<String>::new(),
        ComboSpace::enumerate(['x'], 1, 1),
        Vec::new(),
    );
    let allocator = Allocator::new(base, Arc::new(MemoryStore::new())).unwrap();
    let ext = id("ext");

    assert_eq!(allocator.free_count(), 1);
    assert_eq!(
        allocator.allocate("first", &ext, None).unwrap(),
        Allocation::Assigned("x".into())
    );
    assert_eq!(allocator.free_count(), 0);
    assert_eq!(
        allocator.allocate("second", &ext, None).unwrap(),
        Allocation::Exhausted
    );
    assert_eq!(
        allocator.allocate("first", &ext, None).unwrap(),
        Allocation::Existing("x".into())
    );
}

#[test]
fn file_store_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let ext = id("ext");

    let entries = {
        let allocator =
            Allocator::new(small_base(), Arc::new(FileStore::new(dir.path()))).unwrap();
        allocator.allocate("word", &ext, None).unwrap();
        allocator.allocate("other", &ext, Some("cc")).unwrap();
        allocator.allocate("more", &id("side"), None).unwrap();
        allocator.get_entries(&ext).unwrap()
    };
    assert_eq!(
        entries,
        vec![DictEntry::new("other", "cc"), DictEntry::new("word", "c")]
    );

    let allocator = Allocator::new(small_base(), Arc::new(FileStore::new(dir.path()))).unwrap();
    assert_eq!(allocator.get_entries(&ext).unwrap(), entries);
    assert_eq!(allocator.lookup_combo("cc", &ext).unwrap().as_deref(), Some("other"));
    // every persisted combo is taken again after the restart
    assert_eq!(
        allocator.allocate("fresh", &ext, None).unwrap(),
        Allocation::Assigned("ab".into())
    );
}

#[test]
fn writers_in_another_allocator_are_seen_under_lock() {
    let dir = tempfile::tempdir().unwrap();
    let ext = id("ext");
    let left = Allocator::new(small_base(), Arc::new(FileStore::new(dir.path()))).unwrap();
    let right = Allocator::new(small_base(), Arc::new(FileStore::new(dir.path()))).unwrap();

    assert_eq!(
        left.allocate("word", &ext, None).unwrap(),
        Allocation::Assigned("c".into())
    );
    assert_eq!(
        right.allocate("word", &ext, None).unwrap(),
        Allocation::Existing("c".into())
    );
    assert_eq!(
        right.allocate("other", &ext, None).unwrap(),
        Allocation::Assigned("aa".into())
    );

    let store = FileStore::new(dir.path());
    let record = store.load(&ext).unwrap().unwrap();
    assert_eq!(record.word_to_combo.len(), 2);
    assert_eq!(record.base_version, Some(Version::new(1, 0, 0)));
}

#[test]
fn corrupt_dictionaries_are_reported() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("ext.json"), "{ nope").unwrap();
    let err = Allocator::new(small_base(), Arc::new(FileStore::new(dir.path())))
        .err()
        .unwrap();
    assert!(err.is_corrupt_dictionary());

    // both halves present but not inverse of each other
    std::fs::write(
        dir.path().join("ext.json"),
        r#"{
  "id": "ext",
  "word_to_combo": { "word": "c" },
  "combo_to_word": { "c": "other" }
}"#,
    )
    .unwrap();
    let err = Allocator::new(small_base(), Arc::new(FileStore::new(dir.path())))
        .err()
        .unwrap();
    assert!(err.is_corrupt_dictionary());
}

#[test]
fn incompatible_base_versions() {
    let dir = tempfile::tempdir().unwrap();
    let ext = id("ext");
    {
        let allocator =
            Allocator::new(small_base(), Arc::new(FileStore::new(dir.path()))).unwrap();
        allocator.allocate("word", &ext, None).unwrap();
    }

    let minor = base(Version::new(1, 4, 2), &['a', 'b', 'c'], 2);
    assert!(Allocator::new(minor, Arc::new(FileStore::new(dir.path()))).is_ok());

    let major = base(Version::new(2, 0, 0), &['a', 'b', 'c'], 2);
    let err = Allocator::new(major, Arc::new(FileStore::new(dir.path())))
        .err()
        .unwrap();
    assert!(err.is_incompatible_base());
}

#[test]
fn concurrent_allocations_get_distinct_combos() {
    const THREADS: usize = 8;
    const WORDS: usize = 8;

    let allocator = Arc::new(
        Allocator::new(
            base(Version::new(1, 0, 0), &['a', 'b', 'c', 'd'], 3),
            Arc::new(MemoryStore::new()),
        )
        .unwrap(),
    );

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let allocator = allocator.clone();
            thread::spawn(move || {
                let dict = id(if t % 2 == 0 { "even" } else { "odd" });
                (0..WORDS)
                    .map(|w| {
                        allocator
                            .allocate(&format!("word-{}-{}", t, w), &dict, None)
                            .unwrap()
                            .combo()
                            .unwrap()
                            .to_string()
                    })
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let combos: Vec<String> = handles
        .into_iter()
        .flat_map(|h| h.join().unwrap())
        .collect();
    let distinct: HashSet<_> = combos.iter().collect();
    assert_eq!(combos.len(), THREADS * WORDS);
    assert_eq!(distinct.len(), combos.len());

    let stored = allocator.get_entries(&id("even")).unwrap().len()
        + allocator.get_entries(&id("odd")).unwrap().len();
    assert_eq!(stored, THREADS * WORDS);
}

#[test]
fn dictionary_update_frames() {
    let allocator = memory_allocator();
    let ext = id("ext");
    allocator.allocate("word", &ext, None).unwrap();
    allocator.allocate("other", &ext, None).unwrap();

    let text = serialize(&allocator.dict_update_frame(&ext).unwrap());
    let (parsed_id, entries) = parse_dict_update_frame(&parse(&text).unwrap()).unwrap();
    assert_eq!(parsed_id, ext);
    assert_eq!(entries, allocator.get_entries(&ext).unwrap());
}

#[test]
fn from_config_files() {
    let dir = tempfile::tempdir().unwrap();
    let base_dir = dir.path().join("base");
    std::fs::create_dir_all(&base_dir).unwrap();
    std::fs::write(base_dir.join("words.txt"), "# base words\nalpha\n\nBeta\n").unwrap();
    std::fs::write(base_dir.join("combos.txt"), "a\nb\nc\naa\n").unwrap();
    std::fs::write(
        base_dir.join("mapping.json"),
        r#"{ "alpha": "a", "beta": "b" }"#,
    )
    .unwrap();

    let config_path = dir.path().join("forge.toml");
    std::fs::write(
        &config_path,
        r#"
[dictionary]
store_dir = "dicts"

[vocabulary]
version = "1.2.0"
words = "base/words.txt"
combos = "base/combos.txt"
mapping = "base/mapping.json"
"#,
    )
    .unwrap();

    let conf = ForgeConfig::load_from_toml(&config_path).unwrap();
    let allocator = Allocator::from_config(&conf).unwrap();
    assert_eq!(allocator.base().version(), &Version::new(1, 2, 0));
    assert_eq!(allocator.free_count(), 2);

    let ext = id("ext");
    assert_eq!(
        allocator.allocate("word", &ext, None).unwrap(),
        Allocation::Assigned("c".into())
    );
    assert!(dir.path().join("dicts").join("ext.json").exists());
}
