//! Key-scoped durable storage.
//!
//! `DurableStore` is the only persistent source of truth for the queue, the
//! search history, the playback snapshot and the settings. Values are JSON
//! encoded; a value is fully encoded before the backend is touched, so a
//! failed write leaves the previously stored value in place.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::rc::Rc;
use tracing::warn;

mod memory;
#[cfg(not(target_arch = "wasm32"))]
mod sqlite;
#[cfg(target_arch = "wasm32")]
mod local;

pub use memory::MemoryBackend;
#[cfg(not(target_arch = "wasm32"))]
pub use sqlite::SqliteBackend;
#[cfg(target_arch = "wasm32")]
pub use local::LocalBackend;

pub const SEARCH_HISTORY_KEY: &str = "searchHistory";
pub const QUEUE_KEY: &str = "queue";
pub const PLAYER_STATE_KEY: &str = "playerState";
pub const SETTINGS_KEY: &str = "podsearch.settings";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("storage is unavailable: {0}")]
    Unavailable(String),
    #[error("failed to encode value for `{key}`: {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to decode value for `{key}`: {message}")]
    Decode { key: String, message: String },
    #[error("failed to write `{key}`: {message}")]
    Write { key: String, message: String },
}

/// Synchronous key/value backend holding JSON documents.
///
/// `load` reports a missing key as `Ok(None)`; errors are reserved for a
/// backend that could not be read at all.
pub trait StorageBackend {
    fn load(&self, key: &str) -> Result<Option<Value>, StoreError>;
    fn save(&self, key: &str, value: Value) -> Result<(), StoreError>;
    fn delete(&self, key: &str) -> Result<(), StoreError>;
}

/// Cheaply cloneable handle to the application's storage backend.
#[derive(Clone)]
pub struct DurableStore {
    backend: Rc<dyn StorageBackend>,
}

impl fmt::Debug for DurableStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DurableStore").finish_non_exhaustive()
    }
}

impl PartialEq for DurableStore {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.backend, &other.backend)
    }
}

impl DurableStore {
    pub fn new(backend: impl StorageBackend + 'static) -> Self {
        Self {
            backend: Rc::new(backend),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(MemoryBackend::default())
    }

    /// Reads the value stored under `key`.
    ///
    /// Missing keys, unreadable storage and undecodable values all read as
    /// `None`: absence is the common "no prior state" case.
    pub fn read<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = match self.backend.load(key) {
            Ok(Some(value)) => value,
            Ok(None) => return None,
            Err(err) => {
                warn!(key, error = %err, "storage read failed");
                return None;
            }
        };
        match serde_json::from_value(value) {
            Ok(decoded) => Some(decoded),
            Err(err) => {
                warn!(key, error = %err, "discarding undecodable stored value");
                None
            }
        }
    }

    pub fn write<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let encoded = serde_json::to_value(value).map_err(|source| StoreError::Encode {
            key: key.to_string(),
            source,
        })?;
        self.backend.save(key, encoded)
    }

    /// Deletes `key`. Deleting a missing key succeeds.
    pub fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.backend.delete(key)
    }
}

/// Opens the platform's persistent store, falling back to memory when the
/// platform store cannot be opened.
#[cfg(target_arch = "wasm32")]
pub fn open_default_store() -> DurableStore {
    DurableStore::new(LocalBackend)
}

/// Opens the platform's persistent store, falling back to memory when the
/// platform store cannot be opened.
#[cfg(not(target_arch = "wasm32"))]
pub fn open_default_store() -> DurableStore {
    let data_dir = dirs::data_dir()
        .map(|dir| dir.join("podsearch"))
        .unwrap_or_else(|| std::path::PathBuf::from(".podsearch"));
    match SqliteBackend::open(&data_dir.join("podsearch.db")) {
        Ok(backend) => DurableStore::new(backend),
        Err(err) => {
            warn!(error = %err, "falling back to in-memory storage");
            DurableStore::in_memory()
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Sample {
        name: String,
        position: f64,
    }

    #[test]
    fn missing_key_reads_as_absent() {
        let store = DurableStore::in_memory();
        assert_eq!(store.read::<Vec<String>>(QUEUE_KEY), None);
    }

    #[test]
    fn write_then_read_returns_equivalent_value() {
        let store = DurableStore::in_memory();
        let sample = Sample {
            name: "Episode 12".to_string(),
            position: 42.5,
        };
        store.write("sample", &sample).unwrap();
        assert_eq!(store.read::<Sample>("sample"), Some(sample));
    }

    #[test]
    fn undecodable_value_reads_as_absent() {
        let store = DurableStore::in_memory();
        store.write("sample", &vec![1, 2, 3]).unwrap();
        assert_eq!(store.read::<Sample>("sample"), None);
    }

    #[test]
    fn remove_clears_the_key() {
        let store = DurableStore::in_memory();
        store.write(SEARCH_HISTORY_KEY, &["rust"]).unwrap();
        store.remove(SEARCH_HISTORY_KEY).unwrap();
        assert_eq!(store.read::<Vec<String>>(SEARCH_HISTORY_KEY), None);
        // removing twice is harmless
        store.remove(SEARCH_HISTORY_KEY).unwrap();
    }

    #[test]
    fn failed_remove_is_reported_and_keeps_the_value() {
        let backend = testing::ReadOnlyBackend::default();
        backend
            .inner
            .save(SEARCH_HISTORY_KEY, serde_json::json!(["kept"]))
            .unwrap();
        let store = DurableStore::new(backend);
        assert!(matches!(
            store.remove(SEARCH_HISTORY_KEY),
            Err(StoreError::Write { .. })
        ));
        assert_eq!(
            store.read::<Vec<String>>(SEARCH_HISTORY_KEY),
            Some(vec!["kept".to_string()])
        );
    }

    #[test]
    fn failed_write_keeps_prior_value() {
        let backend = testing::ReadOnlyBackend::default();
        backend
            .inner
            .save(QUEUE_KEY, serde_json::json!(["kept"]))
            .unwrap();
        let store = DurableStore::new(backend);
        assert!(store.write(QUEUE_KEY, &["lost"]).is_err());
        assert_eq!(
            store.read::<Vec<String>>(QUEUE_KEY),
            Some(vec!["kept".to_string()])
        );
    }

    #[test]
    fn clones_share_one_backend() {
        let store = DurableStore::in_memory();
        let other = store.clone();
        store.write("k", &7u32).unwrap();
        assert_eq!(other.read::<u32>("k"), Some(7));
        assert_eq!(store, other);
        assert_ne!(store, DurableStore::in_memory());
    }
}
