//! Search over the ref-stored index.
//!
//! The index is a container of [`IndexEntry`] in its own annotation
//! ref, kept sorted by id. Ranking uses filter groups first, then
//! literal match count, then id. Nothing depends on the clock or on
//! local state, so the same store yields the same results on every
//! clone.

use regex::{Regex, RegexBuilder};

use decree_core::error::CoreError;
use decree_core::model::{content_hash, DecisionRecord, IndexEntry, RecordId, RecordStatus};
use decree_core::runner::GitRunner;
use decree_core::storage::container::Container;
use decree_core::storage::refs;
use decree_core::storage::RecordStore;

use crate::error::QueryError;

#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    /// Treat the query as a regular expression. An invalid pattern
    /// falls back to a literal search rather than erroring.
    pub regex: bool,
    pub case_sensitive: bool,
    /// Status filters, acting as ranking groups in the order given.
    pub statuses: Vec<RecordStatus>,
    /// Tag filters, ranked after the status filters.
    pub tags: Vec<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub id: RecordId,
    /// First line of the entry's text containing a match.
    pub snippet: String,
    /// Number of pattern matches in the entry's text.
    pub score: usize,
}

pub struct SearchEngine {
    git: GitRunner,
    index_ref: String,
}

impl SearchEngine {
    pub fn new(git: GitRunner, index_ref: impl Into<String>) -> Self {
        Self {
            git,
            index_ref: index_ref.into(),
        }
    }

    pub fn index_ref(&self) -> &str {
        &self.index_ref
    }

    /// Decode the current index container; empty when the ref is
    /// absent.
    pub fn load(&self) -> Result<Container<IndexEntry>, QueryError> {
        Ok(self.load_state()?.0)
    }

    pub fn search(&self, query: &str, opts: &SearchOptions) -> Result<Vec<SearchHit>, QueryError> {
        let pattern = compile_pattern(query, opts)?;
        let container = self.load()?;

        struct Ranked {
            group: usize,
            score: usize,
            id: RecordId,
            snippet: String,
        }

        let mut ranked: Vec<Ranked> = container
            .entries()
            .filter_map(|entry| {
                let score = pattern.find_iter(&entry.text).count();
                if score == 0 {
                    return None;
                }
                Some(Ranked {
                    group: filter_group(entry, opts),
                    score,
                    id: entry.id.clone(),
                    snippet: snippet_for(&pattern, &entry.text),
                })
            })
            .collect();

        ranked.sort_by(|a, b| {
            a.group
                .cmp(&b.group)
                .then(b.score.cmp(&a.score))
                .then(a.id.cmp(&b.id))
        });
        if let Some(limit) = opts.limit {
            ranked.truncate(limit);
        }

        Ok(ranked
            .into_iter()
            .map(|r| SearchHit {
                id: r.id,
                snippet: r.snippet,
                score: r.score,
            })
            .collect())
    }

    /// Recompute the index from a full store scan and replace the
    /// index ref atomically. Works regardless of how damaged the
    /// current index content is. Returns the number of indexed
    /// records.
    pub fn rebuild(&self, store: &RecordStore) -> Result<usize, QueryError> {
        let records = store.records()?;
        let mut container: Container<IndexEntry> = Container::new();
        for record in &records {
            container.insert(IndexEntry::from_record(record))?;
        }
        container.sort();

        // The prior commit is resolved without decoding, so a corrupt
        // index is still replaceable.
        let out = self
            .git
            .check_allowing(&["rev-parse", "--verify", "--quiet", &self.index_ref], &[1])?;
        let prior = if out.exit_code == 1 {
            None
        } else {
            Some(out.line())
        };
        refs::write_ref(
            &self.git,
            &self.index_ref,
            &container.encode(),
            prior.as_deref(),
        )?;
        tracing::info!(count = records.len(), reference = %self.index_ref, "index rebuilt");
        Ok(records.len())
    }

    /// Whether the index is exactly the projection of the store:
    /// same id set, matching content hashes, no corrupt lines. An
    /// index too damaged to decode counts as stale, not as an error,
    /// since a rebuild replaces it wholesale.
    pub fn verify(&self, store: &RecordStore) -> Result<bool, QueryError> {
        let records = store.records()?;
        let container = match self.load() {
            Ok(container) => container,
            Err(QueryError::Core(CoreError::CorruptContainer { .. })) => return Ok(false),
            Err(e) => return Err(e),
        };
        if !container.corrupt_lines().is_empty() || container.len() != records.len() {
            return Ok(false);
        }
        Ok(records.iter().all(|record| {
            container
                .get(record.id.as_str())
                .is_some_and(|entry| entry.content_hash == content_hash(record))
        }))
    }

    /// Write-through update for one record. Called inside the same
    /// logical operation as the store mutation.
    pub fn note_put(&self, record: &DecisionRecord) -> Result<(), QueryError> {
        self.note_put_many(std::slice::from_ref(record))
    }

    /// Write-through update for a batch of records, as one index write.
    pub fn note_put_many(&self, records: &[DecisionRecord]) -> Result<(), QueryError> {
        let (mut container, prior) = self.load_state()?;
        for record in records {
            container.insert(IndexEntry::from_record(record))?;
        }
        container.sort();
        self.write(&container, prior.as_deref())
    }

    /// Write-through removal. Removing an unindexed id writes nothing.
    pub fn note_delete(&self, id: &RecordId) -> Result<(), QueryError> {
        let (mut container, prior) = self.load_state()?;
        if !container.remove(id.as_str()) {
            return Ok(());
        }
        self.write(&container, prior.as_deref())
    }

    fn load_state(&self) -> Result<(Container<IndexEntry>, Option<String>), QueryError> {
        match refs::read_ref(&self.git, &self.index_ref)? {
            Some(snapshot) => {
                let container = Container::decode(&snapshot.data)
                    .map_err(|e| e.in_reference(&self.index_ref))?;
                for line in container.corrupt_lines() {
                    tracing::warn!(
                        reference = %self.index_ref,
                        line = line.line_no,
                        error = %line.error,
                        "corrupt index line (run reindex)"
                    );
                }
                Ok((container, Some(snapshot.commit)))
            }
            None => Ok((Container::new(), None)),
        }
    }

    fn write(
        &self,
        container: &Container<IndexEntry>,
        prior: Option<&str>,
    ) -> Result<(), QueryError> {
        refs::write_ref(&self.git, &self.index_ref, &container.encode(), prior)?;
        Ok(())
    }
}

/// Compile the query. Literal queries are escaped; an invalid regex
/// degrades to a literal search for its own source text.
fn compile_pattern(query: &str, opts: &SearchOptions) -> Result<Regex, QueryError> {
    let build = |source: &str| {
        RegexBuilder::new(source)
            .case_insensitive(!opts.case_sensitive)
            .build()
    };
    if opts.regex {
        if let Ok(pattern) = build(query) {
            return Ok(pattern);
        }
        tracing::debug!(query, "invalid regex, falling back to literal search");
    }
    build(&regex::escape(query)).map_err(|e| QueryError::Index(e.to_string()))
}

/// Position of the first filter this entry satisfies: status filters
/// rank before tag filters, entries matching none come last. Filters
/// order results rather than excluding them.
fn filter_group(entry: &IndexEntry, opts: &SearchOptions) -> usize {
    let mut group = 0;
    for status in &opts.statuses {
        if entry.status == *status {
            return group;
        }
        group += 1;
    }
    for tag in &opts.tags {
        if entry.tags.iter().any(|t| t == tag) {
            return group;
        }
        group += 1;
    }
    group
}

fn snippet_for(pattern: &Regex, text: &str) -> String {
    text.lines()
        .find(|line| pattern.is_match(line))
        .or_else(|| text.lines().find(|line| !line.trim().is_empty()))
        .unwrap_or_default()
        .trim()
        .to_string()
}
