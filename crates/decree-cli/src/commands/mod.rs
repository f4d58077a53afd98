pub mod hook_handler;
pub mod hooks;
pub mod init;
pub mod list;
pub mod new;
pub mod pull;
pub mod push;
pub mod reindex;
pub mod rm;
pub mod search;
pub mod show;
pub mod sync;
pub mod version;

use anyhow::{Context, Result};
use clap::Subcommand;

use decree_core::config::{self, Settings};
use decree_core::runner::GitRunner;
use decree_core::storage::RecordStore;
use decree_protocol::{ConflictPolicy, SyncRef};
use decree_query::{IndexedStore, SearchEngine};

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize decree in the current Git repository
    Init(init::InitArgs),
    /// Create a new decision record
    New(new::NewArgs),
    /// Show a decision record
    Show(show::ShowArgs),
    /// List decision records
    List(list::ListArgs),
    /// Remove a decision record
    Rm(rm::RmArgs),
    /// Search decision records
    Search(search::SearchArgs),
    /// Rebuild the search index from the record store
    Reindex(reindex::ReindexArgs),
    /// Push decree refs to a remote
    Push(push::PushArgs),
    /// Pull decree refs from a remote and merge
    Pull(pull::PullArgs),
    /// Pull then push (keep a remote in step)
    Sync(sync::SyncArgs),
    /// Manage the pre-push hook
    Hooks(hooks::HooksArgs),
    /// Internal: handle git hook callbacks
    #[command(hide = true)]
    HookHandler(hook_handler::HookHandlerArgs),
    /// Print version information
    Version,
}

/// Open the enclosing repository and its settings.
pub(crate) fn open() -> Result<(GitRunner, Settings)> {
    let cwd = std::env::current_dir()?;
    let git = GitRunner::discover(cwd).context("Not inside a Git repository")?;
    let settings = Settings::load(&git)?;
    Ok((git, settings))
}

/// Same, but requires `decree init` to have been run.
pub(crate) fn open_initialized() -> Result<(GitRunner, Settings)> {
    let (git, settings) = open()?;
    config::ensure_initialized(&git)
        .context("Decree is not initialized. Run `decree init` first.")?;
    Ok((git, settings))
}

pub(crate) fn record_store(git: &GitRunner, settings: &Settings) -> RecordStore {
    RecordStore::new(git.clone(), settings.records_ref())
}

pub(crate) fn search_engine(git: &GitRunner, settings: &Settings) -> SearchEngine {
    SearchEngine::new(git.clone(), settings.index_ref())
}

pub(crate) fn indexed_store(git: &GitRunner, settings: &Settings) -> IndexedStore {
    IndexedStore::new(record_store(git, settings), search_engine(git, settings))
}

/// The managed refs with their configured conflict policies.
pub(crate) fn sync_refs(settings: &Settings) -> Result<Vec<SyncRef>> {
    let records: ConflictPolicy = settings.records_policy.parse()?;
    let index: ConflictPolicy = settings.index_policy.parse()?;
    Ok(vec![
        SyncRef::records(settings.records_ref(), records),
        SyncRef::index(settings.index_ref(), index),
    ])
}
