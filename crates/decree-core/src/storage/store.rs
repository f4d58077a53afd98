//! Record CRUD over a single annotation ref.
//!
//! Every mutation is one optimistic transaction: snapshot the ref,
//! decode, apply the change in memory, re-encode, and compare-and-swap
//! the ref with the snapshot commit as the expected prior. A losing
//! writer gets [`CoreError::Conflict`] and decides for itself whether
//! to re-read and retry; the store never retries, since a blind retry
//! could overwrite the concurrent edit that won.

use crate::error::CoreError;
use crate::model::{DecisionRecord, RecordId};
use crate::runner::GitRunner;
use crate::storage::container::Container;
use crate::storage::refs::{self, RefSnapshot};

pub struct RecordStore {
    git: GitRunner,
    ref_name: String,
}

/// A decoded view of the ref at one commit, used as the prior for the
/// write that follows it.
struct LoadedState {
    container: Container<DecisionRecord>,
    prior: Option<String>,
}

impl RecordStore {
    pub fn new(git: GitRunner, ref_name: impl Into<String>) -> Self {
        Self {
            git,
            ref_name: ref_name.into(),
        }
    }

    pub fn git(&self) -> &GitRunner {
        &self.git
    }

    pub fn ref_name(&self) -> &str {
        &self.ref_name
    }

    pub fn get(&self, id: &RecordId) -> Result<DecisionRecord, CoreError> {
        let state = self.load()?;
        state
            .container
            .get(id.as_str())
            .cloned()
            .ok_or_else(|| CoreError::NotFound {
                id: id.to_string(),
            })
    }

    /// Create or update a record.
    pub fn put(&self, record: &DecisionRecord) -> Result<(), CoreError> {
        self.put_many(std::slice::from_ref(record))
    }

    /// Create or update several records in one container write, so a
    /// losing compare-and-swap leaves either all of them or none of
    /// them. Supersede chains go through here.
    pub fn put_many(&self, records: &[DecisionRecord]) -> Result<(), CoreError> {
        let mut state = self.load()?;
        for record in records {
            state.container.insert(record.clone())?;
        }
        self.commit(&state)
    }

    /// Remove a record; [`CoreError::NotFound`] if it was never there.
    pub fn delete(&self, id: &RecordId) -> Result<(), CoreError> {
        let mut state = self.load()?;
        if !state.container.remove(id.as_str()) {
            return Err(CoreError::NotFound {
                id: id.to_string(),
            });
        }
        self.commit(&state)
    }

    /// Record ids in container (insertion) order.
    pub fn list(&self) -> Result<Vec<RecordId>, CoreError> {
        let state = self.load()?;
        Ok(state
            .container
            .keys()
            .into_iter()
            .map(RecordId::from)
            .collect())
    }

    /// All records, in container order.
    pub fn records(&self) -> Result<Vec<DecisionRecord>, CoreError> {
        let state = self.load()?;
        Ok(state.container.entries().cloned().collect())
    }

    /// Records plus the corrupt-line report, for callers that surface
    /// container damage instead of just logging it.
    pub fn records_checked(&self) -> Result<(Vec<DecisionRecord>, usize), CoreError> {
        let state = self.load()?;
        Ok((
            state.container.entries().cloned().collect(),
            state.container.corrupt_lines().len(),
        ))
    }

    fn load(&self) -> Result<LoadedState, CoreError> {
        let snapshot = refs::read_ref(&self.git, &self.ref_name)?;
        let state = match snapshot {
            Some(RefSnapshot { commit, data }) => LoadedState {
                container: Container::decode(&data)
                    .map_err(|e| e.in_reference(&self.ref_name))?,
                prior: Some(commit),
            },
            None => LoadedState {
                container: Container::new(),
                prior: None,
            },
        };
        for line in state.container.corrupt_lines() {
            tracing::warn!(
                reference = %self.ref_name,
                line = line.line_no,
                error = %line.error,
                "skipping corrupt container line"
            );
        }
        Ok(state)
    }

    fn commit(&self, state: &LoadedState) -> Result<(), CoreError> {
        refs::write_ref(
            &self.git,
            &self.ref_name,
            &state.container.encode(),
            state.prior.as_deref(),
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::testutil::test_repo;
    use crate::storage::refs::read_ref;
    use tempfile::TempDir;

    const REF: &str = "refs/notes/decree";

    fn store() -> (TempDir, RecordStore) {
        let (dir, git) = test_repo();
        (dir, RecordStore::new(git, REF))
    }

    fn record(id: &str, body: &str) -> DecisionRecord {
        DecisionRecord::new(RecordId::from(id), body)
    }

    #[test]
    fn test_put_get_round_trip() {
        let (_dir, store) = store();
        let r = record("DR-0001", "Use annotation refs");
        store.put(&r).unwrap();
        assert_eq!(store.get(&r.id).unwrap(), r);
    }

    #[test]
    fn test_get_missing_is_not_found() {
        let (_dir, store) = store();
        assert!(matches!(
            store.get(&RecordId::from("DR-0404")),
            Err(CoreError::NotFound { .. })
        ));
    }

    #[test]
    fn test_put_is_idempotent_on_content() {
        let (_dir, store) = store();
        let r = record("DR-0001", "same");
        store.put(&r).unwrap();
        let first = read_ref(store.git(), REF).unwrap().unwrap().data;
        store.put(&r).unwrap();
        let second = read_ref(store.git(), REF).unwrap().unwrap().data;
        assert_eq!(first, second);
    }

    #[test]
    fn test_delete_missing_is_not_found() {
        let (_dir, store) = store();
        store.put(&record("DR-0001", "x")).unwrap();
        assert!(matches!(
            store.delete(&RecordId::from("DR-0002")),
            Err(CoreError::NotFound { .. })
        ));
    }

    #[test]
    fn test_list_preserves_insertion_order_across_delete() {
        let (_dir, store) = store();
        store.put(&record("DR-0001", "a")).unwrap();
        store.put(&record("DR-0002", "b")).unwrap();
        store.put(&record("DR-0003", "c")).unwrap();
        store.delete(&RecordId::from("DR-0002")).unwrap();

        assert_eq!(
            store.list().unwrap(),
            vec![RecordId::from("DR-0001"), RecordId::from("DR-0003")]
        );
    }

    #[test]
    fn test_racing_writers_one_loses() {
        let (_dir, git) = test_repo();
        let a = RecordStore::new(git.clone(), REF);
        let b = RecordStore::new(git, REF);

        a.put(&record("DR-0001", "seed")).unwrap();

        // Writer B snapshots, then writer A lands first.
        let b_snapshot = read_ref(b.git(), REF).unwrap().unwrap();
        a.put(&record("DR-0002", "from A")).unwrap();

        // Replaying B's write against its stale snapshot must conflict.
        let mut container = Container::decode(&b_snapshot.data).unwrap();
        container.insert(record("DR-0003", "from B")).unwrap();
        let err = refs::write_ref(
            b.git(),
            REF,
            &container.encode(),
            Some(&b_snapshot.commit),
        );
        assert!(matches!(err, Err(CoreError::Conflict { .. })));

        // Nothing was lost: A's write is intact, and B succeeds after
        // re-reading.
        b.put(&record("DR-0003", "from B")).unwrap();
        assert_eq!(
            b.list().unwrap(),
            vec![
                RecordId::from("DR-0001"),
                RecordId::from("DR-0002"),
                RecordId::from("DR-0003"),
            ]
        );
    }

    #[test]
    fn test_put_many_lands_as_one_write() {
        let (_dir, store) = store();
        store.put(&record("DR-0001", "seed")).unwrap();
        let before = read_ref(store.git(), REF).unwrap().unwrap().commit;

        let a = record("DR-0002", "first of pair");
        let b = record("DR-0003", "second of pair");
        store.put_many(&[a.clone(), b.clone()]).unwrap();

        // Exactly one new commit on the ref, carrying both records.
        let after = read_ref(store.git(), REF).unwrap().unwrap().commit;
        let parent = store
            .git()
            .check(&["rev-parse", &format!("{after}^")])
            .unwrap()
            .line();
        assert_eq!(parent, before);
        assert_eq!(store.get(&a.id).unwrap(), a);
        assert_eq!(store.get(&b.id).unwrap(), b);
    }

    #[test]
    fn test_fully_corrupt_ref_surfaces_corrupt_container() {
        let (_dir, store) = store();
        refs::write_ref(store.git(), REF, b"{broken one\n{broken two\n", None).unwrap();

        match store.list() {
            Err(CoreError::CorruptContainer { reference, .. }) => {
                assert_eq!(reference, REF);
            }
            other => panic!("expected CorruptContainer, got {other:?}"),
        }
    }

    #[test]
    fn test_corrupt_line_does_not_block_crud() {
        let (_dir, store) = store();
        store.put(&record("DR-0001", "good")).unwrap();

        // Damage the container by hand.
        let snap = read_ref(store.git(), REF).unwrap().unwrap();
        let mut bytes = snap.data.clone();
        bytes.extend_from_slice(b"{broken\n");
        refs::write_ref(store.git(), REF, &bytes, Some(&snap.commit)).unwrap();

        let (records, corrupt) = store.records_checked().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(corrupt, 1);

        // A write keeps the corrupt line instead of merging it away.
        store.put(&record("DR-0002", "more")).unwrap();
        let data = read_ref(store.git(), REF).unwrap().unwrap().data;
        let text = String::from_utf8(data).unwrap();
        assert!(text.contains("{broken"));
        assert!(text.contains("DR-0002"));
    }
}
