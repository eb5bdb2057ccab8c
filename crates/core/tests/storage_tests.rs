// ═══════════════════════════════════════════════════════════════════
// Storage Tests — file store, memory store, typed Store facade
// ═══════════════════════════════════════════════════════════════════

use serde::{Deserialize, Serialize};

use fund_tracker_core::errors::CoreError;
use fund_tracker_core::storage::keys;
use fund_tracker_core::storage::store::{FileStore, MemoryStore, Store, StoreBackend};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct Blob {
    label: String,
    value: i64,
}

// ═══════════════════════════════════════════════════════════════════
// MemoryStore
// ═══════════════════════════════════════════════════════════════════

mod memory_store {
    use super::*;

    #[test]
    fn set_get_remove() {
        let store = MemoryStore::new();
        assert_eq!(store.get_raw("k").unwrap(), None);
        store.set_raw("k", r#"{"x":1}"#).unwrap();
        assert_eq!(store.get_raw("k").unwrap().as_deref(), Some(r#"{"x":1}"#));
        store.remove("k").unwrap();
        assert_eq!(store.get_raw("k").unwrap(), None);
    }
}

// ═══════════════════════════════════════════════════════════════════
// FileStore
// ═══════════════════════════════════════════════════════════════════

mod file_store {
    use super::*;

    #[test]
    fn roundtrip_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        store.set_raw("accounts", r#"[{"id":"a","name":"A"}]"#).unwrap();
        assert!(dir.path().join("accounts.json").exists());
        assert_eq!(
            store.get_raw("accounts").unwrap().as_deref(),
            Some(r#"[{"id":"a","name":"A"}]"#)
        );
    }

    #[test]
    fn missing_key_reads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        assert_eq!(store.get_raw("never_written").unwrap(), None);
    }

    #[test]
    fn remove_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        store.set_raw("k", "1").unwrap();
        store.remove("k").unwrap();
        store.remove("k").unwrap();
    }

    #[test]
    fn open_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("deep").join("data");
        let _store = FileStore::open(&nested).unwrap();
        assert!(nested.is_dir());
    }
}

// ═══════════════════════════════════════════════════════════════════
// Typed Store facade
// ═══════════════════════════════════════════════════════════════════

mod typed_store {
    use super::*;

    #[test]
    fn typed_roundtrip() {
        let store = Store::in_memory();
        let blob = Blob {
            label: "hello".into(),
            value: 7,
        };
        store.save("blob", &blob);
        assert_eq!(store.load::<Blob>("blob").unwrap(), Some(blob));
    }

    #[test]
    fn load_missing_is_none_and_default() {
        let store = Store::in_memory();
        assert_eq!(store.load::<Blob>("missing").unwrap(), None);
        assert_eq!(store.load_or_default::<Blob>("missing"), Blob::default());
    }

    #[test]
    fn corrupted_blob_degrades_to_default() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("blob.json"), "{definitely not json").unwrap();
        let store = Store::open(dir.path()).unwrap();

        assert!(store.load::<Blob>("blob").is_err());
        assert_eq!(store.load_or_default::<Blob>("blob"), Blob::default());
    }

    #[test]
    fn clones_share_the_backend() {
        let store = Store::in_memory();
        let other = store.clone();
        store.save("k", &Blob {
            label: "shared".into(),
            value: 1,
        });
        assert_eq!(other.load::<Blob>("k").unwrap().unwrap().label, "shared");
    }

    /// A backend that rejects every write, as a stand-in for quota and
    /// permission failures.
    struct ReadOnlyBackend;

    impl StoreBackend for ReadOnlyBackend {
        fn get_raw(&self, _key: &str) -> Result<Option<String>, CoreError> {
            Ok(None)
        }
        fn set_raw(&self, _key: &str, _value: &str) -> Result<(), CoreError> {
            Err(CoreError::Storage("read-only".into()))
        }
        fn remove(&self, _key: &str) -> Result<(), CoreError> {
            Err(CoreError::Storage("read-only".into()))
        }
    }

    #[test]
    fn write_failures_are_swallowed() {
        let store = Store::new(ReadOnlyBackend);
        // Must not panic or error — the app keeps its in-memory state.
        store.save("k", &Blob::default());
        assert_eq!(store.load::<Blob>("k").unwrap(), None);
    }
}

// ═══════════════════════════════════════════════════════════════════
// Storage keys
// ═══════════════════════════════════════════════════════════════════

mod storage_keys {
    use super::*;

    #[test]
    fn keys_are_distinct() {
        let all = [
            keys::ACCOUNTS,
            keys::HOLDINGS,
            keys::WATCHLIST,
            keys::SEARCH_HISTORY,
            keys::RESPONSE_CACHE,
            keys::NAME_HINTS,
            keys::EMPTY_SECTORS,
        ];
        let mut deduped = all.to_vec();
        deduped.sort_unstable();
        deduped.dedup();
        assert_eq!(deduped.len(), all.len());
    }
}
