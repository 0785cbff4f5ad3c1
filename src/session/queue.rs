use crate::api::MediaItem;
use crate::db::{DurableStore, StoreError, QUEUE_KEY};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    Queued,
    AlreadyQueued,
}

/// Episodes queued for playback, in insertion order.
///
/// The store is the source of truth: every mutation is written through
/// before it returns, and a failed write rolls the cached list back.
#[derive(Debug, Clone, PartialEq)]
pub struct QueueStore {
    store: DurableStore,
    entries: Vec<MediaItem>,
}

impl QueueStore {
    pub fn load(store: DurableStore) -> Self {
        let entries = store.read(QUEUE_KEY).unwrap_or_default();
        Self { store, entries }
    }

    /// Rebuilds the cached list from the store.
    pub fn reload(&mut self) -> &[MediaItem] {
        self.entries = self.store.read(QUEUE_KEY).unwrap_or_default();
        &self.entries
    }

    pub fn list(&self) -> &[MediaItem] {
        &self.entries
    }

    pub fn contains(&self, item: &MediaItem) -> bool {
        self.entries
            .iter()
            .any(|entry| entry.dedup_key() == item.dedup_key())
    }

    pub fn enqueue(&mut self, item: MediaItem) -> Result<EnqueueOutcome, StoreError> {
        if self.contains(&item) {
            debug!(title = %item.title, "already queued");
            return Ok(EnqueueOutcome::AlreadyQueued);
        }
        self.entries.push(item);
        if let Err(err) = self.store.write(QUEUE_KEY, &self.entries) {
            self.entries.pop();
            return Err(err);
        }
        Ok(EnqueueOutcome::Queued)
    }

    /// Removes every entry with the item's id (its title when it has no id);
    /// returns how many were removed.
    pub fn dequeue(&mut self, item: &MediaItem) -> Result<usize, StoreError> {
        let before = self.entries.len();
        let kept: Vec<MediaItem> = self
            .entries
            .iter()
            .filter(|entry| !same_entry(entry, item))
            .cloned()
            .collect();
        let removed = before - kept.len();
        if removed == 0 {
            return Ok(0);
        }
        self.store.write(QUEUE_KEY, &kept)?;
        self.entries = kept;
        Ok(removed)
    }
}

fn same_entry(entry: &MediaItem, item: &MediaItem) -> bool {
    if item.id.is_empty() {
        entry.dedup_key() == item.dedup_key()
    } else {
        entry.id == item.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing::ReadOnlyBackend;

    fn episode(id: &str, title: &str) -> MediaItem {
        MediaItem {
            id: id.to_string(),
            title: title.to_string(),
            enclosure_url: Some(format!("https://cdn.example/{id}.mp3")),
            ..MediaItem::default()
        }
    }

    #[test]
    fn persisted_queue_reloads_in_order() {
        let store = DurableStore::in_memory();
        let mut queue = QueueStore::load(store.clone());
        for (id, title) in [("1", "One"), ("2", "Two"), ("3", "Three")] {
            assert_eq!(queue.enqueue(episode(id, title)).unwrap(), EnqueueOutcome::Queued);
        }

        let reloaded = QueueStore::load(store);
        assert_eq!(reloaded.list(), queue.list());
        let titles: Vec<&str> = reloaded.list().iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, ["One", "Two", "Three"]);
    }

    #[test]
    fn same_title_is_rejected() {
        let mut queue = QueueStore::load(DurableStore::in_memory());
        queue.enqueue(episode("1", "Pilot")).unwrap();
        let outcome = queue.enqueue(episode("99", "Pilot")).unwrap();
        assert_eq!(outcome, EnqueueOutcome::AlreadyQueued);
        assert_eq!(queue.list().len(), 1);
    }

    #[test]
    fn dequeue_removes_by_id_and_persists() {
        let store = DurableStore::in_memory();
        let mut queue = QueueStore::load(store.clone());
        queue.enqueue(episode("1", "One")).unwrap();
        queue.enqueue(episode("2", "Two")).unwrap();

        assert_eq!(queue.dequeue(&episode("1", "One")).unwrap(), 1);
        assert_eq!(queue.dequeue(&episode("404", "Missing")).unwrap(), 0);
        assert_eq!(QueueStore::load(store).list(), &[episode("2", "Two")]);
    }

    #[test]
    fn dequeue_without_id_matches_title() {
        let mut queue = QueueStore::load(DurableStore::in_memory());
        queue.enqueue(episode("", "Untitled feed")).unwrap();
        queue.enqueue(episode("5", "Five")).unwrap();

        assert_eq!(queue.dequeue(&episode("", "Untitled feed")).unwrap(), 1);
        assert_eq!(queue.list(), &[episode("5", "Five")]);
    }

    #[test]
    fn reload_picks_up_changes_made_elsewhere() {
        let store = DurableStore::in_memory();
        let mut first = QueueStore::load(store.clone());
        let mut second = QueueStore::load(store);
        second.enqueue(episode("7", "Seven")).unwrap();
        assert!(first.list().is_empty());
        assert_eq!(first.reload().len(), 1);
    }

    #[test]
    fn untitled_entry_does_not_lose_the_stored_queue() {
        let store = DurableStore::in_memory();
        store
            .write(
                QUEUE_KEY,
                &serde_json::json!([
                    {"id": "1", "title": "One", "enclosureUrl": "https://cdn.example/1.mp3"},
                    {"id": "2", "enclosureUrl": "https://cdn.example/2.mp3"}
                ]),
            )
            .unwrap();

        let mut queue = QueueStore::load(store.clone());
        assert_eq!(queue.list().len(), 2);
        assert_eq!(queue.list()[1].title, "");

        queue.enqueue(episode("3", "Three")).unwrap();
        let ids: Vec<String> = QueueStore::load(store)
            .list()
            .iter()
            .map(|entry| entry.id.clone())
            .collect();
        assert_eq!(ids, ["1", "2", "3"]);
    }

    #[test]
    fn failed_write_leaves_queue_unchanged() {
        let mut queue = QueueStore::load(DurableStore::new(ReadOnlyBackend::default()));
        assert!(queue.enqueue(episode("1", "One")).is_err());
        assert!(queue.list().is_empty());
    }
}
