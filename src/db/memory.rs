use super::{StorageBackend, StoreError};
use serde_json::Value;
use std::cell::RefCell;
use std::collections::HashMap;

/// Process-local backend. Values are kept as encoded text so reads go
/// through the same decode path as the persistent backends.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: RefCell<HashMap<String, String>>,
}

impl StorageBackend for MemoryBackend {
    fn load(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let entries = self.entries.borrow();
        let Some(text) = entries.get(key) else {
            return Ok(None);
        };
        serde_json::from_str(text)
            .map(Some)
            .map_err(|e| StoreError::Decode {
                key: key.to_string(),
                message: e.to_string(),
            })
    }

    fn save(&self, key: &str, value: Value) -> Result<(), StoreError> {
        let text = value.to_string();
        self.entries.borrow_mut().insert(key.to_string(), text);
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.entries.borrow_mut().remove(key);
        Ok(())
    }
}
