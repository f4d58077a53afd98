//! Tool settings, backed by git config under the `decree.*` section.
//! Repository-local by default; users can promote any key to
//! `--global` themselves since this is plain git config.

use crate::error::CoreError;
use crate::runner::GitRunner;

/// Conflict-policy names accepted in config. The protocol layer parses
/// them into its policy enum; validation here keeps a typoed config
/// from surfacing only at sync time.
pub const VALID_POLICIES: [&str; 4] = ["union", "ours", "theirs", "sorted-unique"];

const INITIALIZED_KEY: &str = "decree.initialized";

#[derive(Debug, Clone)]
pub struct Settings {
    /// Base namespace for annotation refs (`refs/notes/<namespace>`).
    pub namespace: String,
    pub index_namespace: String,
    /// Reserved for binary artifacts; no core operation writes it yet.
    pub artifacts_namespace: String,
    pub id_prefix: String,
    pub remote: String,
    /// Explicitly configured sync timeout, if any. Interactive and
    /// hook paths apply different defaults when unset.
    pub sync_timeout: Option<u64>,
    pub auto_push: bool,
    pub hook_block_on_failure: bool,
    pub hook_skip: bool,
    pub records_policy: String,
    pub index_policy: String,
}

impl Settings {
    /// Read settings from the repo's git config, filling defaults.
    pub fn load(git: &GitRunner) -> Result<Self, CoreError> {
        let namespace = git
            .config_get("decree.namespace")?
            .unwrap_or_else(|| "decree".to_string());
        let index_namespace = git
            .config_get("decree.indexNamespace")?
            .unwrap_or_else(|| format!("{namespace}-index"));
        let artifacts_namespace = git
            .config_get("decree.artifactsNamespace")?
            .unwrap_or_else(|| format!("{namespace}-artifacts"));

        let sync_timeout = match git.config_get("decree.sync.timeout")? {
            Some(raw) => Some(raw.parse().map_err(|_| {
                CoreError::Config(format!("decree.sync.timeout is not a number: {raw}"))
            })?),
            None => None,
        };

        let settings = Self {
            namespace,
            index_namespace,
            artifacts_namespace,
            id_prefix: git
                .config_get("decree.idPrefix")?
                .unwrap_or_else(|| "DR-".to_string()),
            remote: git
                .config_get("decree.remote")?
                .unwrap_or_else(|| "origin".to_string()),
            sync_timeout,
            auto_push: bool_key(git, "decree.sync.autoPush", false)?,
            hook_block_on_failure: bool_key(git, "decree.hooks.blockOnFailure", false)?,
            hook_skip: bool_key(git, "decree.hooks.skip", false)?,
            records_policy: git
                .config_get("decree.policy.records")?
                .unwrap_or_else(|| "union".to_string()),
            index_policy: git
                .config_get("decree.policy.index")?
                .unwrap_or_else(|| "sorted-unique".to_string()),
        };

        for policy in [&settings.records_policy, &settings.index_policy] {
            if !VALID_POLICIES.contains(&policy.as_str()) {
                return Err(CoreError::Config(format!(
                    "unknown conflict policy {:?} (valid: {})",
                    policy,
                    VALID_POLICIES.join(", ")
                )));
            }
        }
        Ok(settings)
    }

    pub fn records_ref(&self) -> String {
        format!("refs/notes/{}", self.namespace)
    }

    pub fn index_ref(&self) -> String {
        format!("refs/notes/{}", self.index_namespace)
    }

    pub fn artifacts_ref(&self) -> String {
        format!("refs/notes/{}", self.artifacts_namespace)
    }

    /// Timeout for interactive push/pull/sync, in seconds.
    pub fn sync_timeout_secs(&self) -> u64 {
        self.sync_timeout.unwrap_or(60)
    }

    /// Timeout on the hook path. Much tighter when unconfigured: an
    /// unreachable remote must not stall every `git push`.
    pub fn hook_timeout_secs(&self) -> u64 {
        self.sync_timeout.unwrap_or(5)
    }
}

fn bool_key(git: &GitRunner, key: &str, default: bool) -> Result<bool, CoreError> {
    match git.config_get(key)? {
        None => Ok(default),
        Some(raw) => match raw.to_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Ok(true),
            "false" | "no" | "off" | "0" | "" => Ok(false),
            _ => Err(CoreError::Config(format!("{key} is not a boolean: {raw}"))),
        },
    }
}

/// Mark the repository as initialized and wire up ref distribution:
/// a fetch refspec per remote for the decree notes refs, and
/// `notes.rewriteRef` so rebase/amend copies notes forward. No push
/// refspecs; they would break a bare `git push` before the refs
/// exist.
pub fn initialize(git: &GitRunner) -> Result<(), CoreError> {
    let settings = Settings::load(git)?;
    let glob = format!("refs/notes/{}*", settings.namespace);

    let remotes = git.check(&["remote"])?;
    for remote in remotes.stdout_text().lines().filter(|l| !l.is_empty()) {
        configure_remote(git, remote, &glob)?;
    }

    let rewrite_key = "notes.rewriteRef";
    if !git.config_get_all(rewrite_key)?.iter().any(|v| v == &glob) {
        git.check(&["config", "--add", rewrite_key, &glob])?;
    }

    git.config_set(INITIALIZED_KEY, "true")?;
    Ok(())
}

/// Add the fetch refspec for one remote, once.
pub fn configure_remote(git: &GitRunner, remote: &str, glob: &str) -> Result<(), CoreError> {
    let key = format!("remote.{remote}.fetch");
    let spec = format!("+{glob}:{glob}");
    if !git.config_get_all(&key)?.iter().any(|v| v == &spec) {
        git.check(&["config", "--add", &key, &spec])?;
    }
    Ok(())
}

pub fn is_initialized(git: &GitRunner) -> Result<bool, CoreError> {
    bool_key(git, INITIALIZED_KEY, false)
}

pub fn ensure_initialized(git: &GitRunner) -> Result<(), CoreError> {
    if is_initialized(git)? {
        Ok(())
    } else {
        Err(CoreError::NotInitialized)
    }
}
