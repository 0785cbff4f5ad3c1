use crate::db::{DurableStore, StoreError, SEARCH_HISTORY_KEY};

/// Past search terms, deduplicated, in insertion order. Unbounded.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHistoryStore {
    store: DurableStore,
    entries: Vec<String>,
}

impl SearchHistoryStore {
    pub fn load(store: DurableStore) -> Self {
        let entries = store.read(SEARCH_HISTORY_KEY).unwrap_or_default();
        Self { store, entries }
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Records a query; returns `false` when it was already present.
    pub fn append(&mut self, query: &str) -> Result<bool, StoreError> {
        if self.entries.iter().any(|entry| entry == query) {
            return Ok(false);
        }
        self.entries.push(query.to_string());
        if let Err(err) = self.store.write(SEARCH_HISTORY_KEY, &self.entries) {
            self.entries.pop();
            return Err(err);
        }
        Ok(true)
    }

    /// Forgets every query. Memory is only cleared once storage is.
    pub fn reset_all(&mut self) -> Result<(), StoreError> {
        self.store.remove(SEARCH_HISTORY_KEY)?;
        self.entries.clear();
        Ok(())
    }
}
