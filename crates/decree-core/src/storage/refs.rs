//! Annotation-ref plumbing.
//!
//! Each logical namespace (records, index, artifacts) is one ref whose
//! commit tree holds a single container blob under an entry named after
//! the anchor object. The anchor is git's well-known empty-tree oid:
//! content-independent, present in every repository, and untouched by
//! history rewrites, so the refs survive rebase and amend. The layout
//! is `git notes` compatible: `git notes --ref <ns> show <anchor>`
//! prints the container.

use crate::error::CoreError;
use crate::runner::GitRunner;

/// The empty-tree oid every git repository knows.
pub const ANCHOR_OBJECT: &str = "4b825dc642cb6eb9a060e54bf8d69288fbee4904";

/// The all-zero oid `update-ref` takes to assert a ref does not exist.
const ZERO_OID: &str = "0000000000000000000000000000000000000000";

/// A ref's value at one point in time. `commit` is the compare-and-swap
/// token a later write passes back as its expected prior.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefSnapshot {
    pub commit: String,
    pub data: Vec<u8>,
}

/// Read a ref's container blob, or `None` when the ref is absent.
pub fn read_ref(git: &GitRunner, name: &str) -> Result<Option<RefSnapshot>, CoreError> {
    let out = git.check_allowing(&["rev-parse", "--verify", "--quiet", name], &[1])?;
    if out.exit_code == 1 {
        return Ok(None);
    }
    let commit = out.line();

    let spec = format!("{commit}:{ANCHOR_OBJECT}");
    let blob = git.invoke(&["cat-file", "blob", &spec], None, None)?;
    if !blob.success() {
        // The ref exists but its tree carries no anchored container.
        return Err(CoreError::CorruptContainer {
            reference: name.to_string(),
            detail: format!("no container blob at anchor: {}", blob.stderr.trim()),
        });
    }
    Ok(Some(RefSnapshot {
        commit,
        data: blob.stdout,
    }))
}

/// Atomically point `name` at a new commit carrying `content`.
///
/// `expected_prior` is the commit hash from the snapshot this write was
/// computed against, or `None` to assert the ref does not exist yet.
/// If anyone moved the ref in between, git refuses the update and the
/// mismatch surfaces as [`CoreError::Conflict`]. Returns the new commit
/// hash.
pub fn write_ref(
    git: &GitRunner,
    name: &str,
    content: &[u8],
    expected_prior: Option<&str>,
) -> Result<String, CoreError> {
    let parents: Vec<&str> = expected_prior.into_iter().collect();
    write_ref_with_parents(git, name, content, &parents, expected_prior)
}

/// [`write_ref`] with explicit commit parents. Pull merges pass both
/// the local and the fetched commit so the result descends from the
/// remote's history and the follow-up push is a fast-forward.
pub fn write_ref_with_parents(
    git: &GitRunner,
    name: &str,
    content: &[u8],
    parents: &[&str],
    expected_prior: Option<&str>,
) -> Result<String, CoreError> {
    let blob = git
        .check_with_stdin(&["hash-object", "-w", "--stdin"], content)?
        .line();

    let tree_entry = format!("100644 blob {blob}\t{ANCHOR_OBJECT}\n");
    let tree = git
        .check_with_stdin(&["mktree"], tree_entry.as_bytes())?
        .line();

    let message = format!("decree: update {name}");
    let mut args = vec!["commit-tree", tree.as_str()];
    for parent in parents {
        args.push("-p");
        args.push(parent);
    }
    args.push("-m");
    args.push(&message);
    let commit = git.check(&args)?.line();

    update_ref_cas(git, name, &commit, expected_prior)?;
    Ok(commit)
}

/// Atomically point `name` at an existing commit (adopting a fetched
/// remote commit as-is).
pub fn point_ref(
    git: &GitRunner,
    name: &str,
    commit: &str,
    expected_prior: Option<&str>,
) -> Result<(), CoreError> {
    update_ref_cas(git, name, commit, expected_prior)
}

/// Whether `ancestor` is reachable from `descendant`.
pub fn is_ancestor(git: &GitRunner, ancestor: &str, descendant: &str) -> Result<bool, CoreError> {
    let out = git.check_allowing(
        &["merge-base", "--is-ancestor", ancestor, descendant],
        &[1],
    )?;
    Ok(out.success())
}

fn update_ref_cas(
    git: &GitRunner,
    name: &str,
    commit: &str,
    expected_prior: Option<&str>,
) -> Result<(), CoreError> {
    let old = expected_prior.unwrap_or(ZERO_OID);
    let out = git.invoke(&["update-ref", name, commit, old], None, None)?;
    if !out.success() {
        if is_cas_failure(&out.stderr) {
            return Err(CoreError::Conflict {
                reference: name.to_string(),
            });
        }
        return Err(CoreError::Process {
            command: format!("git update-ref {name}"),
            exit_code: out.exit_code,
            stderr: out.stderr.trim().to_string(),
        });
    }
    Ok(())
}

/// Delete a ref. Deleting an absent ref is not an error.
pub fn delete_ref(git: &GitRunner, name: &str) -> Result<(), CoreError> {
    let out = git.invoke(&["update-ref", "-d", name], None, None)?;
    if !out.success() && !out.stderr.contains("unable to resolve") {
        tracing::debug!(name, stderr = %out.stderr.trim(), "ref delete failed");
    }
    Ok(())
}

/// List full ref names under a prefix, e.g. `refs/notes/`.
pub fn list_refs(git: &GitRunner, prefix: &str) -> Result<Vec<String>, CoreError> {
    let out = git.check(&["for-each-ref", "--format=%(refname)", prefix])?;
    Ok(out
        .stdout_text()
        .lines()
        .map(str::to_string)
        .filter(|l| !l.is_empty())
        .collect())
}

/// update-ref reports a compare-and-swap mismatch in the lock message.
fn is_cas_failure(stderr: &str) -> bool {
    stderr.contains("cannot lock ref") || stderr.contains("but expected")
}
