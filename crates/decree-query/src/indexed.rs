//! Store wrapper keeping the index in step with every mutation.

use decree_core::model::{DecisionRecord, RecordId};
use decree_core::storage::RecordStore;

use crate::error::QueryError;
use crate::search::SearchEngine;

/// A [`RecordStore`] paired with a [`SearchEngine`]. Writes go to the
/// store first and then to the index, so a crash between the two
/// leaves the index stale, never the store. `reindex` repairs that.
pub struct IndexedStore {
    store: RecordStore,
    engine: SearchEngine,
}

impl IndexedStore {
    pub fn new(store: RecordStore, engine: SearchEngine) -> Self {
        Self { store, engine }
    }

    pub fn store(&self) -> &RecordStore {
        &self.store
    }

    pub fn engine(&self) -> &SearchEngine {
        &self.engine
    }

    pub fn get(&self, id: &RecordId) -> Result<DecisionRecord, QueryError> {
        Ok(self.store.get(id)?)
    }

    pub fn list(&self) -> Result<Vec<RecordId>, QueryError> {
        Ok(self.store.list()?)
    }

    pub fn records(&self) -> Result<Vec<DecisionRecord>, QueryError> {
        Ok(self.store.records()?)
    }

    pub fn put(&self, record: &DecisionRecord) -> Result<(), QueryError> {
        self.store.put(record)?;
        self.engine.note_put(record)
    }

    /// Write several records in one store transaction and one index
    /// write. Linked updates, like marking a record superseded while
    /// creating its successor, cannot land half-applied this way.
    pub fn put_many(&self, records: &[DecisionRecord]) -> Result<(), QueryError> {
        self.store.put_many(records)?;
        self.engine.note_put_many(records)
    }

    pub fn delete(&self, id: &RecordId) -> Result<(), QueryError> {
        self.store.delete(id)?;
        self.engine.note_delete(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::SearchOptions;
    use decree_core::model::RecordStatus;
    use decree_core::runner::GitRunner;
    use tempfile::TempDir;

    fn fixture() -> (TempDir, IndexedStore) {
        let dir = TempDir::new().unwrap();
        let git = GitRunner::new(dir.path());
        git.check(&["init", "-q"]).unwrap();
        git.check(&["config", "user.name", "Test User"]).unwrap();
        git.check(&["config", "user.email", "test@example.com"])
            .unwrap();
        let store = RecordStore::new(git.clone(), "refs/notes/decree");
        let engine = SearchEngine::new(git, "refs/notes/decree-index");
        (dir, IndexedStore::new(store, engine))
    }

    #[test]
    fn test_put_is_searchable_immediately() {
        let (_dir, store) = fixture();
        let record = DecisionRecord::new(RecordId::from("DR-0001"), "use sqlite for caching");
        store.put(&record).unwrap();

        let hits = store
            .engine()
            .search("sqlite", &SearchOptions::default())
            .unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id.as_str(), "DR-0001");
    }

    #[test]
    fn test_delete_drops_the_index_entry() {
        let (_dir, store) = fixture();
        let record = DecisionRecord::new(RecordId::from("DR-0001"), "use sqlite for caching");
        store.put(&record).unwrap();
        store.delete(&record.id).unwrap();

        assert!(store.list().unwrap().is_empty());
        assert!(store
            .engine()
            .search("sqlite", &SearchOptions::default())
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_put_many_applies_linked_updates_together() {
        let (_dir, store) = fixture();
        let mut old = DecisionRecord::new(RecordId::from("DR-0001"), "choose rabbitmq");
        store.put(&old).unwrap();

        let mut replacement =
            DecisionRecord::new(RecordId::from("DR-0002"), "choose kafka instead");
        replacement.metadata.supersedes = Some(old.id.clone());
        old.metadata.superseded_by = Some(replacement.id.clone());
        old.metadata.status = RecordStatus::Superseded;
        old.touch();

        store.put_many(&[old.clone(), replacement.clone()]).unwrap();

        assert_eq!(
            store.get(&old.id).unwrap().metadata.status,
            RecordStatus::Superseded
        );
        assert_eq!(
            store.get(&replacement.id).unwrap().metadata.supersedes,
            Some(old.id.clone())
        );
        let hits = store
            .engine()
            .search("kafka", &SearchOptions::default())
            .unwrap();
        assert_eq!(hits[0].id.as_str(), "DR-0002");
        assert!(store.engine().verify(store.store()).unwrap());
    }

    #[test]
    fn test_update_replaces_the_index_text() {
        let (_dir, store) = fixture();
        let mut record = DecisionRecord::new(RecordId::from("DR-0001"), "choose redis");
        store.put(&record).unwrap();

        record.body = "choose memcached".to_string();
        record.touch();
        store.put(&record).unwrap();

        let opts = SearchOptions::default();
        assert!(store.engine().search("redis", &opts).unwrap().is_empty());
        assert_eq!(store.engine().search("memcached", &opts).unwrap().len(), 1);
        assert!(store.engine().verify(store.store()).unwrap());
    }
}
