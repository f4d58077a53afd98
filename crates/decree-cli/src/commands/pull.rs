use std::time::Duration;

use anyhow::Result;
use clap::Args;

use decree_core::config::Settings;
use decree_core::runner::GitRunner;
use decree_protocol::{PullOutcome, PullResult, SyncEngine};

#[derive(Args)]
pub struct PullArgs {
    /// Remote name (default: configured decree.remote)
    pub remote: Option<String>,
}

pub fn run(args: &PullArgs) -> Result<()> {
    let (git, settings) = super::open_initialized()?;
    let remote = args.remote.clone().unwrap_or_else(|| settings.remote.clone());
    let refs = super::sync_refs(&settings)?;

    let engine = SyncEngine::new(
        git.clone(),
        Duration::from_secs(settings.sync_timeout_secs()),
    );
    let result = engine.pull(&remote, &refs)?;
    report(&result);
    reindex_if_changed(&git, &settings, &result)?;
    Ok(())
}

pub(crate) fn report(result: &PullResult) {
    let merged = result
        .refs
        .iter()
        .filter(|(_, outcome)| matches!(outcome, PullOutcome::Created | PullOutcome::Updated))
        .count();
    eprintln!("Merged {merged} ref(s) from {}", result.remote);
}

/// A merged record ref can leave the index behind (deletes do not
/// union back in), so rebuild it whenever the record ref moved.
pub(crate) fn reindex_if_changed(
    git: &GitRunner,
    settings: &Settings,
    result: &PullResult,
) -> Result<()> {
    let records_ref = settings.records_ref();
    let changed = result.refs.iter().any(|(name, outcome)| {
        *name == records_ref && matches!(outcome, PullOutcome::Created | PullOutcome::Updated)
    });
    if !changed {
        return Ok(());
    }
    let store = super::record_store(git, settings);
    let engine = super::search_engine(git, settings);
    let count = engine.rebuild(&store)?;
    eprintln!("Reindexed {count} record(s).");
    Ok(())
}
