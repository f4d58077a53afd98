use std::time::Duration;

use anyhow::Result;
use clap::Args;

use decree_protocol::{PushOutcome, PushResult, SyncEngine};

#[derive(Args)]
pub struct PushArgs {
    /// Remote name (default: configured decree.remote)
    pub remote: Option<String>,

    /// Force-update diverged remote refs
    #[arg(long)]
    pub force: bool,
}

pub fn run(args: &PushArgs) -> Result<()> {
    let (git, settings) = super::open_initialized()?;
    let remote = args.remote.clone().unwrap_or_else(|| settings.remote.clone());
    let refs = super::sync_refs(&settings)?;

    let engine = SyncEngine::new(
        git,
        Duration::from_secs(settings.sync_timeout_secs()),
    );
    let result = engine.push(&remote, &refs, args.force)?;
    report(&result);
    Ok(())
}

pub(crate) fn report(result: &PushResult) {
    let pushed = result
        .refs
        .iter()
        .filter(|(_, outcome)| *outcome == PushOutcome::Pushed)
        .count();
    eprintln!("Pushed {pushed} ref(s) to {}", result.remote);
}
