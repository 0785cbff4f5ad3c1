use super::{StorageBackend, StoreError};
use gloo_storage::{errors::StorageError, LocalStorage, Storage};
use serde_json::Value;

/// Browser `localStorage` backend.
pub struct LocalBackend;

impl StorageBackend for LocalBackend {
    fn load(&self, key: &str) -> Result<Option<Value>, StoreError> {
        match LocalStorage::get::<Value>(key) {
            Ok(value) => Ok(Some(value)),
            Err(StorageError::KeyNotFound(_)) => Ok(None),
            Err(StorageError::SerdeError(e)) => Err(StoreError::Decode {
                key: key.to_string(),
                message: e.to_string(),
            }),
            Err(e) => Err(StoreError::Unavailable(e.to_string())),
        }
    }

    fn save(&self, key: &str, value: Value) -> Result<(), StoreError> {
        LocalStorage::set(key, value).map_err(|e| StoreError::Write {
            key: key.to_string(),
            message: e.to_string(),
        })
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        LocalStorage::delete(key);
        Ok(())
    }
}
