//! Push/pull/bidirectional sync of annotation refs against a remote.
//!
//! Pushes go straight through `git push`; a non-fast-forward rejection
//! surfaces as a conflict and is never retried here; the caller
//! chooses between pull-then-retry and force. Pulls fetch the remote
//! ref into a private staging ref, merge it with the local container
//! under the ref's conflict policy, and compare-and-swap the result
//! into place, so a concurrent local write during the merge loses
//! nothing.
//!
//! Remotes are synchronized independently; there is no cross-remote
//! transaction and no implicit retry anywhere on this path.

use std::time::Duration;

use decree_core::error::CoreError;
use decree_core::model::{DecisionRecord, IndexEntry};
use decree_core::runner::GitRunner;
use decree_core::storage::refs;

use crate::error::ProtocolError;
use crate::policy::ConflictPolicy;

/// Staging area for fetched refs, cleaned up after every merge.
const STAGING_PREFIX: &str = "refs/decree/staging";

/// What a ref's container holds, for policy dispatch during merges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefContent {
    Records,
    Index,
}

/// One ref under sync management with its conflict policy.
#[derive(Debug, Clone)]
pub struct SyncRef {
    pub name: String,
    pub policy: ConflictPolicy,
    pub content: RefContent,
}

impl SyncRef {
    pub fn records(name: impl Into<String>, policy: ConflictPolicy) -> Self {
        Self {
            name: name.into(),
            policy,
            content: RefContent::Records,
        }
    }

    pub fn index(name: impl Into<String>, policy: ConflictPolicy) -> Self {
        Self {
            name: name.into(),
            policy,
            content: RefContent::Index,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncDirection {
    Push,
    Pull,
    Both,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    Pushed,
    /// Nothing local to push for this ref.
    LocalAbsent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullOutcome {
    /// The ref did not exist locally; the merged container created it.
    Created,
    Updated,
    /// The merge changed nothing; no write happened.
    Unchanged,
    /// The remote does not have this ref yet.
    RemoteAbsent,
}

#[derive(Debug)]
pub struct PushResult {
    pub remote: String,
    pub refs: Vec<(String, PushOutcome)>,
}

#[derive(Debug)]
pub struct PullResult {
    pub remote: String,
    pub refs: Vec<(String, PullOutcome)>,
}

#[derive(Debug, Default)]
pub struct SyncResult {
    pub pulled: Option<PullResult>,
    pub pushed: Option<PushResult>,
}

pub struct SyncEngine {
    git: GitRunner,
    timeout: Duration,
}

impl SyncEngine {
    pub fn new(git: GitRunner, timeout: Duration) -> Self {
        Self { git, timeout }
    }

    /// Push each managed ref to `remote`. `force` requests a forced
    /// update per refspec; without it a diverged remote ref is a
    /// conflict and the remaining refs are not attempted.
    pub fn push(
        &self,
        remote: &str,
        sync_refs: &[SyncRef],
        force: bool,
    ) -> Result<PushResult, ProtocolError> {
        self.ensure_remote(remote)?;

        let mut result = PushResult {
            remote: remote.to_string(),
            refs: Vec::new(),
        };
        for sync_ref in sync_refs {
            let outcome = self.push_one(remote, sync_ref, force)?;
            tracing::debug!(reference = %sync_ref.name, ?outcome, "pushed");
            result.refs.push((sync_ref.name.clone(), outcome));
        }
        Ok(result)
    }

    /// Fetch each managed ref from `remote` and merge it into the
    /// local ref under the ref's policy.
    pub fn pull(&self, remote: &str, sync_refs: &[SyncRef]) -> Result<PullResult, ProtocolError> {
        self.ensure_remote(remote)?;

        let mut result = PullResult {
            remote: remote.to_string(),
            refs: Vec::new(),
        };
        for sync_ref in sync_refs {
            let outcome = self.pull_one(remote, sync_ref)?;
            tracing::debug!(reference = %sync_ref.name, ?outcome, "pulled");
            result.refs.push((sync_ref.name.clone(), outcome));
        }
        Ok(result)
    }

    /// Bidirectional sync pulls first, so the subsequent push is a
    /// fast-forward unless someone else raced in between.
    pub fn sync(
        &self,
        remote: &str,
        sync_refs: &[SyncRef],
        direction: SyncDirection,
    ) -> Result<SyncResult, ProtocolError> {
        let mut result = SyncResult::default();
        if matches!(direction, SyncDirection::Pull | SyncDirection::Both) {
            result.pulled = Some(self.pull(remote, sync_refs)?);
        }
        if matches!(direction, SyncDirection::Push | SyncDirection::Both) {
            result.pushed = Some(self.push(remote, sync_refs, false)?);
        }
        Ok(result)
    }

    fn push_one(
        &self,
        remote: &str,
        sync_ref: &SyncRef,
        force: bool,
    ) -> Result<PushOutcome, ProtocolError> {
        let name = sync_ref.name.as_str();
        let exists = self
            .git
            .check_allowing(&["rev-parse", "--verify", "--quiet", name], &[1])?
            .success();
        if !exists {
            return Ok(PushOutcome::LocalAbsent);
        }

        let spec = if force {
            format!("+{name}:{name}")
        } else {
            format!("{name}:{name}")
        };
        let out = self
            .git
            .invoke(&["push", remote, &spec], None, Some(self.timeout))?;
        if out.success() {
            return Ok(PushOutcome::Pushed);
        }
        if is_non_fast_forward(&out.stderr) {
            return Err(ProtocolError::Conflict {
                remote: remote.to_string(),
                reference: name.to_string(),
                detail: "remote rejected non-fast-forward update (pull first, or force)"
                    .to_string(),
            });
        }
        Err(ProtocolError::Core(CoreError::Process {
            command: format!("git push {remote} {spec}"),
            exit_code: out.exit_code,
            stderr: out.stderr.trim().to_string(),
        }))
    }

    fn pull_one(&self, remote: &str, sync_ref: &SyncRef) -> Result<PullOutcome, ProtocolError> {
        let name = sync_ref.name.as_str();
        let staging = staging_ref(name);

        let spec = format!("+{name}:{staging}");
        let out = self
            .git
            .invoke(&["fetch", "--no-tags", remote, &spec], None, Some(self.timeout))?;
        if !out.success() {
            if out.stderr.contains("couldn't find remote ref") {
                return Ok(PullOutcome::RemoteAbsent);
            }
            return Err(ProtocolError::Core(CoreError::Process {
                command: format!("git fetch {remote} {spec}"),
                exit_code: out.exit_code,
                stderr: out.stderr.trim().to_string(),
            }));
        }

        let merged = self.merge_fetched(sync_ref, &staging);
        refs::delete_ref(&self.git, &staging)?;
        merged
    }

    /// Merge the staged remote ref into the local one. The written
    /// commit descends from both histories so the follow-up push is a
    /// fast-forward, and where the merge adds nothing the remote
    /// commit is adopted outright instead of minting a new one.
    fn merge_fetched(
        &self,
        sync_ref: &SyncRef,
        staging: &str,
    ) -> Result<PullOutcome, ProtocolError> {
        let name = sync_ref.name.as_str();
        let Some(fetched) = refs::read_ref(&self.git, staging)? else {
            return Ok(PullOutcome::RemoteAbsent);
        };
        let local = refs::read_ref(&self.git, name)?;

        let merged = self.merge(
            sync_ref,
            local.as_ref().map(|s| s.data.as_slice()),
            &fetched.data,
        )?;

        let Some(snapshot) = local else {
            if merged == fetched.data {
                refs::point_ref(&self.git, name, &fetched.commit, None)?;
            } else {
                refs::write_ref_with_parents(&self.git, name, &merged, &[&fetched.commit], None)?;
            }
            return Ok(PullOutcome::Created);
        };

        let remote_seen = refs::is_ancestor(&self.git, &fetched.commit, &snapshot.commit)?;
        if remote_seen && snapshot.data == merged {
            return Ok(PullOutcome::Unchanged);
        }

        if merged == fetched.data
            && refs::is_ancestor(&self.git, &snapshot.commit, &fetched.commit)?
        {
            // Strictly behind the remote; fast-forward to its commit.
            refs::point_ref(&self.git, name, &fetched.commit, Some(&snapshot.commit))?;
            return Ok(PullOutcome::Updated);
        }

        let parents: Vec<&str> = if remote_seen {
            vec![snapshot.commit.as_str()]
        } else {
            vec![snapshot.commit.as_str(), fetched.commit.as_str()]
        };
        refs::write_ref_with_parents(&self.git, name, &merged, &parents, Some(&snapshot.commit))?;
        Ok(PullOutcome::Updated)
    }

    fn merge(
        &self,
        sync_ref: &SyncRef,
        local: Option<&[u8]>,
        remote: &[u8],
    ) -> Result<Vec<u8>, ProtocolError> {
        let merged = match sync_ref.content {
            RefContent::Records => sync_ref.policy.apply::<DecisionRecord>(local, remote),
            RefContent::Index => sync_ref.policy.apply::<IndexEntry>(local, remote),
        };
        merged.map_err(|e| match e {
            ProtocolError::Core(core) => ProtocolError::Core(core.in_reference(&sync_ref.name)),
            other => other,
        })
    }

    fn ensure_remote(&self, remote: &str) -> Result<(), ProtocolError> {
        let out = self
            .git
            .invoke(&["remote", "get-url", remote], None, None)?;
        if out.success() {
            Ok(())
        } else {
            Err(ProtocolError::RemoteNotFound(remote.to_string()))
        }
    }
}

fn staging_ref(name: &str) -> String {
    let leaf = name.rsplit('/').next().unwrap_or(name);
    format!("{STAGING_PREFIX}/{leaf}")
}

fn is_non_fast_forward(stderr: &str) -> bool {
    stderr.contains("non-fast-forward")
        || stderr.contains("[rejected]")
        || stderr.contains("fetch first")
        || stderr.contains("stale info")
}
